//! Configuration validation
//!
//! Checks run in a fixed order and stop at the first failure, so the
//! reported error is the earliest one the user has to fix:
//!
//! 1. Required fields are present
//! 2. No field is an unedited template value
//! 3. The server base URL parses
//! 4. HTTP username and password are set together
//! 5. Field lengths are within limits

use super::error::{ConfigError, LengthConstraint};
use super::placeholder;
use super::types::{
    ConfigField, DeviceConfig, RawConfigValues, MAX_PASSPHRASE_LEN, MIN_PASSPHRASE_LEN,
};
use super::url::ServerUrl;

/// Validate raw values and copy them into a [`DeviceConfig`]
///
/// Pure: no I/O, and the same input always gives the same result.
pub fn validate(raw: &RawConfigValues<'_>) -> Result<DeviceConfig, ConfigError> {
    check_required(raw)?;
    check_placeholders(raw)?;
    let server = ServerUrl::parse(raw.server_base_url)?;
    check_credential_pairing(raw)?;
    check_lengths(raw)?;
    DeviceConfig::from_validated(raw, server.layout())
}

fn check_required(raw: &RawConfigValues<'_>) -> Result<(), ConfigError> {
    for field in ConfigField::ALL {
        if field.is_required() && raw.field(field).is_empty() {
            return Err(ConfigError::MissingRequiredField(field));
        }
    }
    Ok(())
}

fn check_placeholders(raw: &RawConfigValues<'_>) -> Result<(), ConfigError> {
    let checks: [(ConfigField, fn(&str) -> bool); 4] = [
        (ConfigField::WifiSsid, placeholder::is_placeholder_ssid),
        (ConfigField::WifiPassphrase, placeholder::is_placeholder_passphrase),
        (ConfigField::ServerBaseUrl, placeholder::is_placeholder_server_url),
        (ConfigField::ChatDisplayName, placeholder::is_placeholder_chat_name),
    ];
    for (field, is_placeholder) in checks {
        if is_placeholder(raw.field(field)) {
            return Err(ConfigError::PlaceholderValueDetected(field));
        }
    }
    Ok(())
}

fn check_credential_pairing(raw: &RawConfigValues<'_>) -> Result<(), ConfigError> {
    if raw.http_username.is_empty() != raw.http_password.is_empty() {
        return Err(ConfigError::InvalidCredentialPairing);
    }
    Ok(())
}

fn check_lengths(raw: &RawConfigValues<'_>) -> Result<(), ConfigError> {
    let passphrase = raw.wifi_passphrase.len();
    if passphrase != 0 && !(MIN_PASSPHRASE_LEN..=MAX_PASSPHRASE_LEN).contains(&passphrase) {
        return Err(ConfigError::FieldLengthViolation(
            ConfigField::WifiPassphrase,
            LengthConstraint::Between {
                min: MIN_PASSPHRASE_LEN,
                max: MAX_PASSPHRASE_LEN,
            },
        ));
    }

    for field in ConfigField::ALL {
        if raw.field(field).len() > field.capacity() {
            return Err(ConfigError::FieldLengthViolation(
                field,
                LengthConstraint::AtMost(field.capacity()),
            ));
        }
    }
    Ok(())
}
