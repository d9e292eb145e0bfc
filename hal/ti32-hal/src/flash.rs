//! Provisioning partition access
//!
//! The bridge keeps at most two records in flash: the device configuration
//! as TOML text and the same configuration as a binary record. Chip HALs
//! map [`StorageKey`]s onto whatever key-value store backs the partition.

use core::future::Future;

/// Records kept in the provisioning partition
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum StorageKey {
    /// Versioned binary configuration record
    DeviceConfig = 0,
    /// Configuration as TOML text, takes precedence over the binary record
    DeviceConfigToml = 1,
}

impl StorageKey {
    pub const ALL: [StorageKey; 2] = [StorageKey::DeviceConfig, StorageKey::DeviceConfigToml];

    /// Key as stored on flash
    pub fn as_u8(self) -> u8 {
        self as u8
    }
}

/// Errors from the provisioning partition
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum FlashError {
    /// The flash device reported a failure
    Device,
    /// Nothing stored under the key
    NotFound,
    /// Stored value is larger than the caller's buffer
    BufferTooSmall,
    /// Stored value failed its integrity check
    Corrupted,
    /// No room left for the value
    Full,
}

impl core::fmt::Display for FlashError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(match self {
            FlashError::Device => "flash device error",
            FlashError::NotFound => "key not found",
            FlashError::BufferTooSmall => "buffer too small",
            FlashError::Corrupted => "stored data corrupted",
            FlashError::Full => "storage full",
        })
    }
}

/// Key-value access to the provisioning partition
///
/// A zero-length value means "absent": readers treat it exactly like
/// [`FlashError::NotFound`], and [`FlashStorage::remove`] relies on that to
/// retire a record without erasing the partition.
pub trait FlashStorage {
    /// Copy the value for `key` into `buffer` and return its length
    ///
    /// Returns [`FlashError::NotFound`] if the key was never written.
    fn read(
        &mut self,
        key: StorageKey,
        buffer: &mut [u8],
    ) -> impl Future<Output = Result<usize, FlashError>>;

    /// Replace the value for `key`
    fn write(&mut self, key: StorageKey, data: &[u8]) -> impl Future<Output = Result<(), FlashError>>;

    /// Whether anything, including an empty value, is stored under `key`
    fn exists(&mut self, key: StorageKey) -> impl Future<Output = bool>;

    /// Erase the whole partition (factory reset)
    fn erase_all(&mut self) -> impl Future<Output = Result<(), FlashError>>;

    /// Mark `key` absent by storing an empty value
    fn remove(&mut self, key: StorageKey) -> impl Future<Output = Result<(), FlashError>> {
        self.write(key, &[])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use embassy_futures::block_on;

    #[derive(Default)]
    struct RamStorage {
        values: [Option<std::vec::Vec<u8>>; StorageKey::ALL.len()],
    }

    impl FlashStorage for RamStorage {
        async fn read(&mut self, key: StorageKey, buffer: &mut [u8]) -> Result<usize, FlashError> {
            let value = self.values[key.as_u8() as usize]
                .as_ref()
                .ok_or(FlashError::NotFound)?;
            let dst = buffer.get_mut(..value.len()).ok_or(FlashError::BufferTooSmall)?;
            dst.copy_from_slice(value);
            Ok(value.len())
        }

        async fn write(&mut self, key: StorageKey, data: &[u8]) -> Result<(), FlashError> {
            self.values[key.as_u8() as usize] = Some(data.to_vec());
            Ok(())
        }

        async fn exists(&mut self, key: StorageKey) -> bool {
            self.values[key.as_u8() as usize].is_some()
        }

        async fn erase_all(&mut self) -> Result<(), FlashError> {
            self.values = Default::default();
            Ok(())
        }
    }

    #[test]
    fn test_keys_are_distinct() {
        assert_eq!(StorageKey::DeviceConfig.as_u8(), 0);
        assert_eq!(StorageKey::DeviceConfigToml.as_u8(), 1);
    }

    #[test]
    fn test_remove_leaves_empty_value() {
        let mut storage = RamStorage::default();
        let mut buf = [0u8; 16];
        block_on(storage.write(StorageKey::DeviceConfigToml, b"[wifi]")).unwrap();
        block_on(storage.remove(StorageKey::DeviceConfigToml)).unwrap();

        assert!(block_on(storage.exists(StorageKey::DeviceConfigToml)));
        assert_eq!(block_on(storage.read(StorageKey::DeviceConfigToml, &mut buf)), Ok(0));
        assert_eq!(
            block_on(storage.read(StorageKey::DeviceConfig, &mut buf)),
            Err(FlashError::NotFound)
        );
    }

    #[test]
    fn test_error_display() {
        assert_eq!(std::format!("{}", FlashError::Device), "flash device error");
    }
}
