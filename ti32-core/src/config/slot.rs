//! Boot-wide configuration slot
//!
//! Firmware tasks are spawned with `'static` arguments, so the store ends
//! up in a `static`. [`ConfigSlot`] is that static: written once by the
//! boot sequence, then read by any number of tasks without locking.
//!
//! ```ignore
//! static CONFIG: ConfigSlot = ConfigSlot::new();
//!
//! let config = CONFIG.load(EMBEDDED_CONFIG)?;
//! spawner.spawn(wifi_task(config))?;
//! ```

use embassy_sync::once_lock::OnceLock;

use super::error::ConfigError;
use super::store::ConfigStore;
use super::types::{DeviceConfig, RawConfigValues};

/// Write-once holder for the boot session's [`ConfigStore`]
pub struct ConfigSlot {
    store: OnceLock<ConfigStore>,
}

impl Default for ConfigSlot {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfigSlot {
    pub const fn new() -> Self {
        Self {
            store: OnceLock::new(),
        }
    }

    /// Publish a loaded store
    ///
    /// Installing a store equal to the one already present returns the
    /// existing configuration. A different store is
    /// [`ConfigError::AlreadyInitialized`].
    pub fn install(&self, store: ConfigStore) -> Result<&DeviceConfig, ConfigError> {
        match self.store.init(store) {
            Ok(()) => self.get(),
            Err(rejected) => {
                let current = self.store.try_get().ok_or(ConfigError::NotInitialized)?;
                if *current == rejected {
                    Ok(current.get())
                } else {
                    Err(ConfigError::AlreadyInitialized)
                }
            }
        }
    }

    /// Validate raw values and publish the result
    pub fn load(&self, raw: RawConfigValues<'_>) -> Result<&DeviceConfig, ConfigError> {
        self.install(ConfigStore::load(raw)?)
    }

    /// The published configuration
    ///
    /// [`ConfigError::NotInitialized`] here is a boot-order bug: something
    /// read the configuration before the boot sequence loaded it.
    pub fn get(&self) -> Result<&DeviceConfig, ConfigError> {
        self.store
            .try_get()
            .map(ConfigStore::get)
            .ok_or(ConfigError::NotInitialized)
    }

    pub fn is_initialized(&self) -> bool {
        self.store.try_get().is_some()
    }

    /// Wait until the boot sequence publishes the configuration
    pub async fn wait(&self) -> &DeviceConfig {
        self.store.get().await.get()
    }
}
