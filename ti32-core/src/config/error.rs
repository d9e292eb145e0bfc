//! Configuration errors

use core::fmt;

use super::types::ConfigField;

/// Length rule a field broke
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum LengthConstraint {
    /// Length in bytes must be within `min..=max`
    Between { min: usize, max: usize },
    /// Length in bytes must not exceed the value
    AtMost(usize),
}

impl fmt::Display for LengthConstraint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LengthConstraint::Between { min, max } => write!(f, "{}-{} bytes", min, max),
            LengthConstraint::AtMost(max) => write!(f, "at most {} bytes", max),
        }
    }
}

/// Why the server base URL was rejected
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum UrlError {
    /// No `scheme://` prefix
    MissingScheme,
    /// Scheme other than http or https
    UnsupportedScheme,
    /// Nothing between `://` and the port or path
    EmptyHost,
    /// Host contains characters not allowed in a hostname or IP literal
    InvalidHost,
    /// Port is empty, not a number, or zero
    InvalidPort,
    /// Whitespace or control character in the URL
    InvalidCharacter,
    /// `user:pass@` in the URL; credentials belong in the HTTP fields
    UserInfo,
    /// Query or fragment on a base URL
    QueryOrFragment,
}

impl fmt::Display for UrlError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let msg = match self {
            UrlError::MissingScheme => "missing http:// or https:// prefix",
            UrlError::UnsupportedScheme => "scheme must be http or https",
            UrlError::EmptyHost => "host is empty",
            UrlError::InvalidHost => "host is not a valid name or address",
            UrlError::InvalidPort => "port must be a number between 1 and 65535",
            UrlError::InvalidCharacter => "contains whitespace or control characters",
            UrlError::UserInfo => "credentials in the URL; use HTTP_USERNAME/HTTP_PASSWORD",
            UrlError::QueryOrFragment => "base URL must not have a query or fragment",
        };
        f.write_str(msg)
    }
}

/// Configuration errors
///
/// Everything except [`ConfigError::NotInitialized`] and
/// [`ConfigError::AlreadyInitialized`] comes out of validation; those two
/// are misuse of [`ConfigSlot`](super::ConfigSlot).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ConfigError {
    /// A required value is empty
    MissingRequiredField(ConfigField),
    /// A value is still the unedited template text
    PlaceholderValueDetected(ConfigField),
    /// Server base URL is unusable
    InvalidUrl(UrlError),
    /// Exactly one of HTTP username/password is set
    InvalidCredentialPairing,
    /// A value is too short or too long
    FieldLengthViolation(ConfigField, LengthConstraint),
    /// Configuration read before it was loaded
    NotInitialized,
    /// A different configuration was already loaded this boot
    AlreadyInitialized,
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::MissingRequiredField(field) => write!(f, "{} is required", field),
            ConfigError::PlaceholderValueDetected(field) => {
                write!(f, "{} still holds the template placeholder", field)
            }
            ConfigError::InvalidUrl(reason) => write!(f, "SERVER is invalid: {}", reason),
            ConfigError::InvalidCredentialPairing => {
                f.write_str("HTTP_USERNAME and HTTP_PASSWORD must both be set or both be empty")
            }
            ConfigError::FieldLengthViolation(field, constraint) => {
                write!(f, "{} must be {}", field, constraint)
            }
            ConfigError::NotInitialized => f.write_str("configuration not loaded"),
            ConfigError::AlreadyInitialized => {
                f.write_str("a different configuration is already loaded")
            }
        }
    }
}

impl From<UrlError> for ConfigError {
    fn from(e: UrlError) -> Self {
        ConfigError::InvalidUrl(e)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_names_the_field() {
        let msg = std::format!(
            "{}",
            ConfigError::FieldLengthViolation(
                ConfigField::WifiPassphrase,
                LengthConstraint::Between { min: 8, max: 63 }
            )
        );
        assert_eq!(msg, "WIFI_PASS must be 8-63 bytes");

        let msg = std::format!("{}", ConfigError::MissingRequiredField(ConfigField::ChatDisplayName));
        assert_eq!(msg, "CHAT_NAME is required");
    }

    #[test]
    fn test_url_error_converts() {
        let e: ConfigError = UrlError::EmptyHost.into();
        assert_eq!(e, ConfigError::InvalidUrl(UrlError::EmptyHost));
    }
}
