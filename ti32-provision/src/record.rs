//! Binary provisioning record
//!
//! The compact form written by the provisioning tool: a version byte followed
//! by the six fields, postcard-encoded. The version byte comes first so a
//! record from a newer layout is reported as a mismatch rather than as
//! garbage.

use core::fmt;

use heapless::String;
use serde::{Deserialize, Serialize};
use ti32_core::config::{
    DeviceConfig, RawConfigValues, MAX_CHAT_NAME_LEN, MAX_HTTP_PASSWORD_LEN,
    MAX_HTTP_USERNAME_LEN, MAX_PASSPHRASE_LEN, MAX_SERVER_URL_LEN, MAX_SSID_LEN,
};

use crate::loader::LoadError;

/// Layout version written by this firmware
pub const RECORD_VERSION: u8 = 1;

/// Upper bound on an encoded record
pub const MAX_RECORD_SIZE: usize = 1024;

/// Device configuration as stored in the provisioning partition
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProvisionedRecord {
    version: u8,
    wifi_ssid: String<MAX_SSID_LEN>,
    wifi_passphrase: String<MAX_PASSPHRASE_LEN>,
    http_username: String<MAX_HTTP_USERNAME_LEN>,
    http_password: String<MAX_HTTP_PASSWORD_LEN>,
    server_base_url: String<MAX_SERVER_URL_LEN>,
    chat_display_name: String<MAX_CHAT_NAME_LEN>,
}

impl ProvisionedRecord {
    /// Snapshot a validated configuration
    pub fn from_config(config: &DeviceConfig) -> Result<Self, LoadError> {
        let raw = config.as_raw();
        Ok(Self {
            version: RECORD_VERSION,
            wifi_ssid: copy(raw.wifi_ssid)?,
            wifi_passphrase: copy(raw.wifi_passphrase)?,
            http_username: copy(raw.http_username)?,
            http_password: copy(raw.http_password)?,
            server_base_url: copy(raw.server_base_url)?,
            chat_display_name: copy(raw.chat_display_name)?,
        })
    }

    /// Layout version the record was written with
    pub fn version(&self) -> u8 {
        self.version
    }

    /// Borrow the stored values for validation
    pub fn as_raw(&self) -> RawConfigValues<'_> {
        RawConfigValues {
            wifi_ssid: &self.wifi_ssid,
            wifi_passphrase: &self.wifi_passphrase,
            http_username: &self.http_username,
            http_password: &self.http_password,
            server_base_url: &self.server_base_url,
            chat_display_name: &self.chat_display_name,
        }
    }

    /// Serialize into `buf`, returning the used prefix
    pub fn encode<'b>(&self, buf: &'b mut [u8]) -> Result<&'b mut [u8], LoadError> {
        postcard::to_slice(self, buf).map_err(|_| LoadError::Serialize)
    }

    /// Deserialize a stored record
    pub fn decode(bytes: &[u8]) -> Result<Self, LoadError> {
        match bytes.first() {
            Some(&RECORD_VERSION) => {}
            Some(&found) => {
                warn!(
                    "Config record version mismatch: found {}, expected {}",
                    found, RECORD_VERSION
                );
                return Err(LoadError::VersionMismatch);
            }
            None => return Err(LoadError::Deserialize),
        }
        postcard::from_bytes(bytes).map_err(|_| LoadError::Deserialize)
    }
}

fn copy<const N: usize>(value: &str) -> Result<String<N>, LoadError> {
    String::try_from(value).map_err(|_| LoadError::Serialize)
}

impl fmt::Debug for ProvisionedRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProvisionedRecord")
            .field("version", &self.version)
            .field("values", &self.as_raw())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use ti32_core::config::ConfigStore;

    fn config() -> DeviceConfig {
        ConfigStore::load(RawConfigValues {
            wifi_ssid: "HomeNet",
            wifi_passphrase: "supersecret",
            http_username: "alice",
            http_password: "s3cret",
            server_base_url: "https://chat.lan:8443/api",
            chat_display_name: "Bob",
        })
        .unwrap()
        .into_inner()
    }

    #[test]
    fn test_encode_decode() {
        let record = ProvisionedRecord::from_config(&config()).unwrap();
        let mut buf = [0u8; MAX_RECORD_SIZE];
        let bytes = record.encode(&mut buf).unwrap();
        assert_eq!(bytes[0], RECORD_VERSION);
        assert_eq!(record.version(), RECORD_VERSION);

        let decoded = ProvisionedRecord::decode(bytes).unwrap();
        assert_eq!(decoded, record);
        assert_eq!(decoded.as_raw(), config().as_raw());
    }

    #[test]
    fn test_full_size_record_fits() {
        let ssid = "s".repeat(MAX_SSID_LEN);
        let pass = "p".repeat(MAX_PASSPHRASE_LEN);
        let user = "u".repeat(MAX_HTTP_USERNAME_LEN);
        let secret = "w".repeat(MAX_HTTP_PASSWORD_LEN);
        let url = std::format!("http://10.0.0.1/{}", "a".repeat(MAX_SERVER_URL_LEN - 16));
        let name = "n".repeat(MAX_CHAT_NAME_LEN);
        let config = ConfigStore::load(RawConfigValues {
            wifi_ssid: &ssid,
            wifi_passphrase: &pass,
            http_username: &user,
            http_password: &secret,
            server_base_url: &url,
            chat_display_name: &name,
        })
        .unwrap()
        .into_inner();

        let record = ProvisionedRecord::from_config(&config).unwrap();
        let mut buf = [0u8; MAX_RECORD_SIZE];
        assert!(record.encode(&mut buf).is_ok());
    }

    #[test]
    fn test_version_mismatch() {
        let record = ProvisionedRecord::from_config(&config()).unwrap();
        let mut buf = [0u8; MAX_RECORD_SIZE];
        let bytes = record.encode(&mut buf).unwrap();
        bytes[0] = 2;
        assert_eq!(ProvisionedRecord::decode(bytes), Err(LoadError::VersionMismatch));
    }

    #[test]
    fn test_truncated_record() {
        let record = ProvisionedRecord::from_config(&config()).unwrap();
        let mut buf = [0u8; MAX_RECORD_SIZE];
        let bytes = record.encode(&mut buf).unwrap();
        let short = &bytes[..bytes.len() / 2];
        assert_eq!(ProvisionedRecord::decode(short), Err(LoadError::Deserialize));
        assert_eq!(ProvisionedRecord::decode(&[]), Err(LoadError::Deserialize));
    }

    #[test]
    fn test_debug_hides_secrets() {
        let record = ProvisionedRecord::from_config(&config()).unwrap();
        let shown = std::format!("{:?}", record);
        assert!(shown.contains("HomeNet"));
        assert!(!shown.contains("supersecret"));
        assert!(!shown.contains("s3cret"));
    }

    proptest! {
        #[test]
        fn prop_record_preserves_values(
            ssid in "Lab[ -~]{0,29}",
            passphrase in prop_oneof![Just(std::string::String::new()), "pw[ -~]{6,61}"],
            user in "[a-z]{1,128}",
            pass in "[!-~]{1,128}",
            path in "[a-z0-9/]{0,200}",
            name in "[A-Za-z]{1,3}",
        ) {
            let url = std::format!("https://10.1.2.3:8443/{}", path);
            let raw = RawConfigValues {
                wifi_ssid: &ssid,
                wifi_passphrase: &passphrase,
                http_username: &user,
                http_password: &pass,
                server_base_url: &url,
                chat_display_name: &name,
            };
            let config = ConfigStore::load(raw).unwrap().into_inner();

            let record = ProvisionedRecord::from_config(&config).unwrap();
            let mut buf = [0u8; MAX_RECORD_SIZE];
            let bytes = record.encode(&mut buf).unwrap();
            let decoded = ProvisionedRecord::decode(bytes).unwrap();
            prop_assert_eq!(decoded.as_raw(), raw);
        }
    }
}
