//! Configuration persistence
//!
//! Resolves the device configuration at boot. Sources, in order:
//!
//! 1. TOML text in the provisioning partition
//! 2. The binary [`ProvisionedRecord`] in the provisioning partition
//! 3. Values compiled into the firmware
//!
//! Only a missing source moves on to the next one. A source that is present
//! but unreadable or invalid is an error: the device must not silently join
//! a network with some other set of credentials.

use core::fmt;
use core::str;

use ti32_core::config::{
    ConfigError, ConfigSlot, ConfigStore, DeviceConfig, RawConfigValues,
    RECOMMENDED_CHAT_NAME_CHARS,
};
use ti32_hal::{FlashError, FlashStorage, StorageKey};

use crate::embedded::EMBEDDED_CONFIG;
use crate::record::{ProvisionedRecord, MAX_RECORD_SIZE};
use crate::toml::{parse_config, ParseError};

/// Maximum TOML config size
pub const MAX_TOML_SIZE: usize = 1024;

/// Configuration persistence errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum LoadError {
    /// Flash operation failed
    Flash(FlashError),
    /// Provisioned TOML is malformed
    Parse(ParseError),
    /// Values were read but failed validation
    Config(ConfigError),
    /// Binary record could not be decoded
    Deserialize,
    /// Binary record could not be encoded
    Serialize,
    /// Invalid UTF-8 in TOML data
    InvalidUtf8,
    /// Binary record was written by a different firmware layout
    VersionMismatch,
    /// Nothing provisioned and nothing compiled in
    NoSource,
}

impl From<FlashError> for LoadError {
    fn from(e: FlashError) -> Self {
        LoadError::Flash(e)
    }
}

impl From<ParseError> for LoadError {
    fn from(e: ParseError) -> Self {
        LoadError::Parse(e)
    }
}

impl From<ConfigError> for LoadError {
    fn from(e: ConfigError) -> Self {
        LoadError::Config(e)
    }
}

impl fmt::Display for LoadError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LoadError::Flash(e) => write!(f, "flash: {}", e),
            LoadError::Parse(e) => write!(f, "provisioned TOML: {}", e),
            LoadError::Config(e) => write!(f, "invalid configuration: {}", e),
            LoadError::Deserialize => f.write_str("provisioned record is corrupt"),
            LoadError::Serialize => f.write_str("configuration does not fit a record"),
            LoadError::InvalidUtf8 => f.write_str("provisioned TOML is not UTF-8"),
            LoadError::VersionMismatch => f.write_str("provisioned record version mismatch"),
            LoadError::NoSource => f.write_str("no configuration provisioned or compiled in"),
        }
    }
}

/// Configuration persistence manager
///
/// Loads the device configuration from flash, falling back to compiled-in
/// values, and writes new configuration during provisioning.
pub struct ConfigPersistence<S> {
    storage: S,
    fallback: Option<RawConfigValues<'static>>,
}

impl<S: FlashStorage> ConfigPersistence<S> {
    /// Create a persistence manager backed by the compiled-in configuration
    pub fn new(storage: S) -> Self {
        Self::with_fallback(storage, EMBEDDED_CONFIG)
    }

    /// Create a persistence manager with an explicit last-resort source
    pub fn with_fallback(storage: S, fallback: Option<RawConfigValues<'static>>) -> Self {
        Self { storage, fallback }
    }

    /// Consume this persistence manager and return the underlying storage
    pub fn into_storage(self) -> S {
        self.storage
    }

    /// Resolve and validate the configuration
    pub async fn load(&mut self) -> Result<ConfigStore, LoadError> {
        info!("Loading device configuration...");

        match self.load_toml().await {
            Ok(store) => {
                info!("Loaded configuration from provisioned TOML");
                log_config_summary(store.get());
                return Ok(store);
            }
            Err(LoadError::Flash(FlashError::NotFound)) => {
                debug!("No provisioned TOML, trying binary record");
            }
            Err(e) => {
                error!("Provisioned TOML rejected: {:?}", e);
                return Err(e);
            }
        }

        match self.load_binary().await {
            Ok(store) => {
                info!("Loaded configuration from provisioned record");
                log_config_summary(store.get());
                return Ok(store);
            }
            Err(LoadError::Flash(FlashError::NotFound)) => {
                debug!("No provisioned record, using compiled-in configuration");
            }
            Err(e) => {
                error!("Provisioned record rejected: {:?}", e);
                return Err(e);
            }
        }

        let raw = self.fallback.ok_or_else(|| {
            error!("No device configuration available");
            LoadError::NoSource
        })?;
        let store = ConfigStore::load(raw)?;
        info!("Loaded compiled-in configuration");
        log_config_summary(store.get());
        Ok(store)
    }

    /// Resolve the configuration and publish it for the rest of the firmware
    pub async fn load_into<'s>(&mut self, slot: &'s ConfigSlot) -> Result<&'s DeviceConfig, LoadError> {
        let store = self.load().await?;
        Ok(slot.install(store)?)
    }

    /// Validate `raw` and store it as the binary record
    ///
    /// Any provisioned TOML is cleared so the new record takes effect on
    /// the next boot.
    pub async fn provision(&mut self, raw: RawConfigValues<'_>) -> Result<ConfigStore, LoadError> {
        let store = ConfigStore::load(raw)?;
        let record = ProvisionedRecord::from_config(store.get())?;

        let mut buffer = [0u8; MAX_RECORD_SIZE];
        let bytes = record.encode(&mut buffer)?;
        self.storage.write(StorageKey::DeviceConfig, bytes).await?;
        debug!("Wrote {} byte config record", bytes.len());

        if self.storage.exists(StorageKey::DeviceConfigToml).await {
            self.storage.remove(StorageKey::DeviceConfigToml).await?;
            debug!("Cleared provisioned TOML");
        }

        info!("Device configuration provisioned");
        Ok(store)
    }

    /// Validate TOML text and store it verbatim
    pub async fn provision_toml(&mut self, text: &str) -> Result<ConfigStore, LoadError> {
        if text.len() > MAX_TOML_SIZE {
            return Err(LoadError::Flash(FlashError::BufferTooSmall));
        }
        let store = ConfigStore::load(parse_config(text)?)?;
        self.storage
            .write(StorageKey::DeviceConfigToml, text.as_bytes())
            .await?;

        info!("Device configuration provisioned from TOML");
        Ok(store)
    }

    /// Erase provisioned configuration
    ///
    /// The compiled-in configuration applies from the next boot.
    pub async fn clear(&mut self) -> Result<(), LoadError> {
        self.storage.erase_all().await?;
        warn!("Provisioned configuration erased");
        Ok(())
    }

    async fn load_toml(&mut self) -> Result<ConfigStore, LoadError> {
        let mut buffer = [0u8; MAX_TOML_SIZE];
        let len = self
            .storage
            .read(StorageKey::DeviceConfigToml, &mut buffer)
            .await?;
        if len == 0 {
            return Err(LoadError::Flash(FlashError::NotFound));
        }

        debug!("Read {} bytes of TOML from flash", len);

        let text = str::from_utf8(&buffer[..len]).map_err(|_| LoadError::InvalidUtf8)?;
        let raw = parse_config(text).map_err(|e| {
            warn!("TOML parse error: {:?}", e);
            LoadError::Parse(e)
        })?;
        Ok(ConfigStore::load(raw)?)
    }

    async fn load_binary(&mut self) -> Result<ConfigStore, LoadError> {
        let mut buffer = [0u8; MAX_RECORD_SIZE];
        let len = self
            .storage
            .read(StorageKey::DeviceConfig, &mut buffer)
            .await?;
        if len == 0 {
            return Err(LoadError::Flash(FlashError::NotFound));
        }

        debug!("Read {} bytes of binary config from flash", len);

        let record = ProvisionedRecord::decode(&buffer[..len])?;
        Ok(ConfigStore::load(record.as_raw())?)
    }
}

/// Log a summary of the loaded configuration (no secrets)
fn log_config_summary(config: &DeviceConfig) {
    debug!("  SSID: {}", config.wifi_ssid());
    debug!(
        "  security: {}",
        if config.is_open_network() { "open" } else { "WPA2" }
    );
    debug!("  server: {}", config.server_base_url());
    debug!(
        "  HTTP auth: {}",
        if config.http_auth().is_some() { "enabled" } else { "disabled" }
    );
    debug!("  chat name: {}", config.chat_display_name());

    if config.chat_name_exceeds_recommended() {
        warn!(
            "Chat name is longer than {} characters; the calculator will show {}",
            RECOMMENDED_CHAT_NAME_CHARS,
            config.chat_label()
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use embassy_futures::block_on;
    use ti32_core::config::{ConfigField, UrlError};

    /// In-memory stand-in for the provisioning partition
    #[derive(Default)]
    struct MemoryStorage {
        entries: [Option<std::vec::Vec<u8>>; StorageKey::ALL.len()],
        read_error: Option<FlashError>,
    }

    impl MemoryStorage {
        fn with(key: StorageKey, data: &[u8]) -> Self {
            let mut storage = Self::default();
            storage.entries[key.as_u8() as usize] = Some(data.to_vec());
            storage
        }

        fn get(&self, key: StorageKey) -> Option<&[u8]> {
            self.entries[key.as_u8() as usize].as_deref()
        }
    }

    impl FlashStorage for MemoryStorage {
        async fn read(&mut self, key: StorageKey, buffer: &mut [u8]) -> Result<usize, FlashError> {
            if let Some(e) = self.read_error {
                return Err(e);
            }
            let data = self.get(key).ok_or(FlashError::NotFound)?;
            if data.len() > buffer.len() {
                return Err(FlashError::BufferTooSmall);
            }
            buffer[..data.len()].copy_from_slice(data);
            Ok(data.len())
        }

        async fn write(&mut self, key: StorageKey, data: &[u8]) -> Result<(), FlashError> {
            self.entries[key.as_u8() as usize] = Some(data.to_vec());
            Ok(())
        }

        async fn exists(&mut self, key: StorageKey) -> bool {
            self.get(key).is_some()
        }

        async fn erase_all(&mut self) -> Result<(), FlashError> {
            self.entries = Default::default();
            Ok(())
        }
    }

    const COMPILED_IN: RawConfigValues<'static> = RawConfigValues {
        wifi_ssid: "HomeNet",
        wifi_passphrase: "supersecret",
        http_username: "",
        http_password: "",
        server_base_url: "http://192.168.1.100:8080",
        chat_display_name: "Bob",
    };

    const PROVISIONED: RawConfigValues<'static> = RawConfigValues {
        wifi_ssid: "OfficeNet",
        wifi_passphrase: "",
        http_username: "alice",
        http_password: "s3cret",
        server_base_url: "https://chat.lan/api",
        chat_display_name: "Amy",
    };

    const PROVISIONED_TOML: &str = r#"
[wifi]
ssid = "LabNet"
passphrase = "labpassword"

[server]
base_url = "http://10.0.0.5:8080"

[chat]
display_name = "Zed"
"#;

    fn record_bytes(raw: RawConfigValues<'_>) -> std::vec::Vec<u8> {
        let config = ConfigStore::load(raw).unwrap().into_inner();
        let record = ProvisionedRecord::from_config(&config).unwrap();
        let mut buffer = [0u8; MAX_RECORD_SIZE];
        record.encode(&mut buffer).unwrap().to_vec()
    }

    #[test]
    fn test_load_falls_back_to_compiled_in() {
        let mut persistence =
            ConfigPersistence::with_fallback(MemoryStorage::default(), Some(COMPILED_IN));
        let store = block_on(persistence.load()).unwrap();
        assert_eq!(store.get().as_raw(), COMPILED_IN);
    }

    #[test]
    fn test_new_uses_compiled_in_values() {
        let mut persistence = ConfigPersistence::new(MemoryStorage::default());
        let loaded = block_on(persistence.load());
        match EMBEDDED_CONFIG {
            Some(raw) => assert_eq!(loaded.unwrap().get().as_raw(), raw),
            None => assert_eq!(loaded, Err(LoadError::NoSource)),
        }
    }

    #[test]
    fn test_load_without_any_source() {
        let mut persistence = ConfigPersistence::with_fallback(MemoryStorage::default(), None);
        assert_eq!(block_on(persistence.load()), Err(LoadError::NoSource));
    }

    #[test]
    fn test_binary_record_wins_over_compiled_in() {
        let storage = MemoryStorage::with(StorageKey::DeviceConfig, &record_bytes(PROVISIONED));
        let mut persistence = ConfigPersistence::with_fallback(storage, Some(COMPILED_IN));
        let store = block_on(persistence.load()).unwrap();
        assert_eq!(store.get().as_raw(), PROVISIONED);
        assert!(store.get().http_auth().is_some());
    }

    #[test]
    fn test_toml_wins_over_binary_record() {
        let mut storage = MemoryStorage::with(StorageKey::DeviceConfig, &record_bytes(PROVISIONED));
        storage.entries[StorageKey::DeviceConfigToml.as_u8() as usize] =
            Some(PROVISIONED_TOML.as_bytes().to_vec());
        let mut persistence = ConfigPersistence::with_fallback(storage, Some(COMPILED_IN));

        let store = block_on(persistence.load()).unwrap();
        assert_eq!(store.get().wifi_ssid(), "LabNet");
        assert_eq!(store.get().server().port(), Some(8080));
    }

    #[test]
    fn test_empty_entries_count_as_missing() {
        let mut storage = MemoryStorage::with(StorageKey::DeviceConfigToml, b"");
        storage.entries[StorageKey::DeviceConfig.as_u8() as usize] = Some(std::vec::Vec::new());
        let mut persistence = ConfigPersistence::with_fallback(storage, Some(COMPILED_IN));
        let store = block_on(persistence.load()).unwrap();
        assert_eq!(store.get().as_raw(), COMPILED_IN);
    }

    #[test]
    fn test_malformed_toml_does_not_fall_back() {
        let storage = MemoryStorage::with(StorageKey::DeviceConfigToml, b"[wifi]\nssid = HomeNet\n");
        let mut persistence = ConfigPersistence::with_fallback(storage, Some(COMPILED_IN));
        assert_eq!(
            block_on(persistence.load()),
            Err(LoadError::Parse(ParseError::InvalidValue { line: 2 }))
        );
    }

    #[test]
    fn test_invalid_toml_values_rejected() {
        let text = PROVISIONED_TOML.replace("http://10.0.0.5:8080", "http://192.168.1.XXX:8080");
        let storage = MemoryStorage::with(StorageKey::DeviceConfigToml, text.as_bytes());
        let mut persistence = ConfigPersistence::with_fallback(storage, Some(COMPILED_IN));
        assert_eq!(
            block_on(persistence.load()),
            Err(LoadError::Config(ConfigError::PlaceholderValueDetected(
                ConfigField::ServerBaseUrl
            )))
        );
    }

    #[test]
    fn test_non_utf8_toml() {
        let storage = MemoryStorage::with(StorageKey::DeviceConfigToml, &[0xff, 0xfe, 0x00]);
        let mut persistence = ConfigPersistence::with_fallback(storage, Some(COMPILED_IN));
        assert_eq!(block_on(persistence.load()), Err(LoadError::InvalidUtf8));
    }

    #[test]
    fn test_record_version_mismatch() {
        let mut bytes = record_bytes(PROVISIONED);
        bytes[0] = 9;
        let storage = MemoryStorage::with(StorageKey::DeviceConfig, &bytes);
        let mut persistence = ConfigPersistence::with_fallback(storage, Some(COMPILED_IN));
        assert_eq!(block_on(persistence.load()), Err(LoadError::VersionMismatch));
    }

    #[test]
    fn test_flash_failure_is_reported() {
        let storage = MemoryStorage {
            read_error: Some(FlashError::Corrupted),
            ..Default::default()
        };
        let mut persistence = ConfigPersistence::with_fallback(storage, Some(COMPILED_IN));
        assert_eq!(
            block_on(persistence.load()),
            Err(LoadError::Flash(FlashError::Corrupted))
        );
    }

    #[test]
    fn test_provision_then_load() {
        let storage = MemoryStorage::with(StorageKey::DeviceConfigToml, PROVISIONED_TOML.as_bytes());
        let mut persistence = ConfigPersistence::with_fallback(storage, Some(COMPILED_IN));

        let stored = block_on(persistence.provision(PROVISIONED)).unwrap();
        assert_eq!(stored.get().as_raw(), PROVISIONED);

        let storage = persistence.into_storage();
        assert_eq!(storage.get(StorageKey::DeviceConfigToml), Some(&[][..]));

        let mut persistence = ConfigPersistence::with_fallback(storage, Some(COMPILED_IN));
        let loaded = block_on(persistence.load()).unwrap();
        assert_eq!(loaded, stored);
    }

    #[test]
    fn test_provision_rejects_invalid_values() {
        let mut persistence =
            ConfigPersistence::with_fallback(MemoryStorage::default(), Some(COMPILED_IN));
        let raw = RawConfigValues {
            server_base_url: "http://user:pw@10.0.0.5",
            ..PROVISIONED
        };
        assert_eq!(
            block_on(persistence.provision(raw)),
            Err(LoadError::Config(ConfigError::InvalidUrl(UrlError::UserInfo)))
        );
        assert!(persistence.into_storage().get(StorageKey::DeviceConfig).is_none());
    }

    #[test]
    fn test_provision_toml() {
        let mut persistence =
            ConfigPersistence::with_fallback(MemoryStorage::default(), Some(COMPILED_IN));
        block_on(persistence.provision_toml(PROVISIONED_TOML)).unwrap();
        let store = block_on(persistence.load()).unwrap();
        assert_eq!(store.get().chat_display_name(), "Zed");

        assert_eq!(
            block_on(persistence.provision_toml("[wifi]\nsid = \"x\"\n")),
            Err(LoadError::Parse(ParseError::UnknownKey { line: 2 }))
        );
        let oversized = "#".repeat(MAX_TOML_SIZE + 1);
        assert_eq!(
            block_on(persistence.provision_toml(&oversized)),
            Err(LoadError::Flash(FlashError::BufferTooSmall))
        );
    }

    #[test]
    fn test_clear_restores_compiled_in() {
        let storage = MemoryStorage::with(StorageKey::DeviceConfig, &record_bytes(PROVISIONED));
        let mut persistence = ConfigPersistence::with_fallback(storage, Some(COMPILED_IN));
        block_on(persistence.clear()).unwrap();
        let store = block_on(persistence.load()).unwrap();
        assert_eq!(store.get().as_raw(), COMPILED_IN);
    }

    #[test]
    fn test_load_into_slot() {
        let slot = ConfigSlot::new();
        let mut persistence =
            ConfigPersistence::with_fallback(MemoryStorage::default(), Some(COMPILED_IN));
        let config = block_on(persistence.load_into(&slot)).unwrap();
        assert_eq!(config.wifi_ssid(), "HomeNet");
        assert_eq!(slot.get().unwrap().chat_display_name(), "Bob");

        let storage = MemoryStorage::with(StorageKey::DeviceConfig, &record_bytes(PROVISIONED));
        let mut persistence = ConfigPersistence::with_fallback(storage, Some(COMPILED_IN));
        assert_eq!(
            block_on(persistence.load_into(&slot)),
            Err(LoadError::Config(ConfigError::AlreadyInitialized))
        );
    }

    #[test]
    fn test_error_display() {
        let e = LoadError::Config(ConfigError::MissingRequiredField(ConfigField::WifiSsid));
        assert!(std::format!("{}", e).starts_with("invalid configuration: "));
        assert_eq!(
            std::format!("{}", LoadError::Flash(FlashError::NotFound)),
            "flash: key not found"
        );
    }
}
