//! Configuration type definitions
//!
//! [`RawConfigValues`] is the flat, unvalidated input mirroring the
//! firmware's original credential constants. [`DeviceConfig`] is the
//! validated result; its fields are private so it cannot change once built.

use core::fmt;

use data_encoding::BASE64;
use heapless::String;

use super::error::ConfigError;
use super::url::{ServerUrl, UrlLayout};

/// Maximum SSID length in bytes (802.11 limit)
pub const MAX_SSID_LEN: usize = 32;

/// Minimum WPA2 passphrase length in bytes
pub const MIN_PASSPHRASE_LEN: usize = 8;

/// Maximum WPA2 passphrase length in bytes
pub const MAX_PASSPHRASE_LEN: usize = 63;

// The limits below only size the owned storage. They sit well above
// anything a real server or name needs.

/// Maximum HTTP basic-auth username length
pub const MAX_HTTP_USERNAME_LEN: usize = 128;

/// Maximum HTTP basic-auth password length
pub const MAX_HTTP_PASSWORD_LEN: usize = 128;

/// Maximum server base URL length
pub const MAX_SERVER_URL_LEN: usize = 256;

/// Maximum chat display name length
pub const MAX_CHAT_NAME_LEN: usize = 64;

/// Display names longer than this are truncated on the calculator screen
pub const RECOMMENDED_CHAT_NAME_CHARS: usize = 3;

/// Longest `Authorization` header value [`HttpAuth::header_value`] produces
pub const BASIC_AUTH_HEADER_LEN: usize =
    BASIC_AUTH_PREFIX.len() + 4 * (MAX_HTTP_USERNAME_LEN + 1 + MAX_HTTP_PASSWORD_LEN).div_ceil(3);

const BASIC_AUTH_PREFIX: &str = "Basic ";

/// A single configuration field
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ConfigField {
    WifiSsid,
    WifiPassphrase,
    HttpUsername,
    HttpPassword,
    ServerBaseUrl,
    ChatDisplayName,
}

impl ConfigField {
    /// All fields, in declaration order
    pub const ALL: [ConfigField; 6] = [
        ConfigField::WifiSsid,
        ConfigField::WifiPassphrase,
        ConfigField::HttpUsername,
        ConfigField::HttpPassword,
        ConfigField::ServerBaseUrl,
        ConfigField::ChatDisplayName,
    ];

    /// Name of the constant this field was historically compiled in as.
    /// Also used as the environment override name at build time.
    pub const fn source_name(self) -> &'static str {
        match self {
            ConfigField::WifiSsid => "WIFI_SSID",
            ConfigField::WifiPassphrase => "WIFI_PASS",
            ConfigField::HttpUsername => "HTTP_USERNAME",
            ConfigField::HttpPassword => "HTTP_PASSWORD",
            ConfigField::ServerBaseUrl => "SERVER",
            ConfigField::ChatDisplayName => "CHAT_NAME",
        }
    }

    /// Table and key in the provisioning TOML
    pub const fn toml_key(self) -> (&'static str, &'static str) {
        match self {
            ConfigField::WifiSsid => ("wifi", "ssid"),
            ConfigField::WifiPassphrase => ("wifi", "passphrase"),
            ConfigField::HttpUsername => ("http", "username"),
            ConfigField::HttpPassword => ("http", "password"),
            ConfigField::ServerBaseUrl => ("server", "base_url"),
            ConfigField::ChatDisplayName => ("chat", "display_name"),
        }
    }

    /// Look a field up by its original constant name
    pub fn from_source_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|f| f.source_name() == name)
    }

    /// Look a field up by its TOML table and key
    pub fn from_toml_key(table: &str, key: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|f| f.toml_key() == (table, key))
    }

    /// Whether an empty value is rejected
    pub const fn is_required(self) -> bool {
        matches!(
            self,
            ConfigField::WifiSsid | ConfigField::ServerBaseUrl | ConfigField::ChatDisplayName
        )
    }

    /// Whether the value must be kept out of logs
    pub const fn is_secret(self) -> bool {
        matches!(self, ConfigField::WifiPassphrase | ConfigField::HttpPassword)
    }

    /// Storage capacity of the validated field, in bytes
    pub const fn capacity(self) -> usize {
        match self {
            ConfigField::WifiSsid => MAX_SSID_LEN,
            ConfigField::WifiPassphrase => MAX_PASSPHRASE_LEN,
            ConfigField::HttpUsername => MAX_HTTP_USERNAME_LEN,
            ConfigField::HttpPassword => MAX_HTTP_PASSWORD_LEN,
            ConfigField::ServerBaseUrl => MAX_SERVER_URL_LEN,
            ConfigField::ChatDisplayName => MAX_CHAT_NAME_LEN,
        }
    }
}

impl fmt::Display for ConfigField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.source_name())
    }
}

/// Unvalidated configuration values, as supplied by a source
///
/// Empty strings mean "not set". The same struct is filled from compiled-in
/// constants, from a provisioning TOML blob, or from a stored record.
#[derive(Clone, Copy, PartialEq, Eq, Default)]
pub struct RawConfigValues<'a> {
    pub wifi_ssid: &'a str,
    pub wifi_passphrase: &'a str,
    pub http_username: &'a str,
    pub http_password: &'a str,
    pub server_base_url: &'a str,
    pub chat_display_name: &'a str,
}

impl<'a> RawConfigValues<'a> {
    /// All fields unset
    pub const EMPTY: RawConfigValues<'static> = RawConfigValues {
        wifi_ssid: "",
        wifi_passphrase: "",
        http_username: "",
        http_password: "",
        server_base_url: "",
        chat_display_name: "",
    };

    /// Value of a single field
    pub fn field(&self, field: ConfigField) -> &'a str {
        match field {
            ConfigField::WifiSsid => self.wifi_ssid,
            ConfigField::WifiPassphrase => self.wifi_passphrase,
            ConfigField::HttpUsername => self.http_username,
            ConfigField::HttpPassword => self.http_password,
            ConfigField::ServerBaseUrl => self.server_base_url,
            ConfigField::ChatDisplayName => self.chat_display_name,
        }
    }

    /// Replace a single field
    pub fn set(&mut self, field: ConfigField, value: &'a str) {
        let slot = match field {
            ConfigField::WifiSsid => &mut self.wifi_ssid,
            ConfigField::WifiPassphrase => &mut self.wifi_passphrase,
            ConfigField::HttpUsername => &mut self.http_username,
            ConfigField::HttpPassword => &mut self.http_password,
            ConfigField::ServerBaseUrl => &mut self.server_base_url,
            ConfigField::ChatDisplayName => &mut self.chat_display_name,
        };
        *slot = value;
    }
}

impl fmt::Debug for RawConfigValues<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RawConfigValues")
            .field("wifi_ssid", &self.wifi_ssid)
            .field("wifi_passphrase", &Redacted(self.wifi_passphrase))
            .field("http_username", &self.http_username)
            .field("http_password", &Redacted(self.http_password))
            .field("server_base_url", &self.server_base_url)
            .field("chat_display_name", &self.chat_display_name)
            .finish()
    }
}

/// Validated device configuration for one boot session
///
/// Only [`validate`](super::validate) builds this, so holding one means
/// every invariant has been checked.
#[derive(Clone, PartialEq, Eq)]
pub struct DeviceConfig {
    wifi_ssid: String<MAX_SSID_LEN>,
    wifi_passphrase: String<MAX_PASSPHRASE_LEN>,
    http_username: String<MAX_HTTP_USERNAME_LEN>,
    http_password: String<MAX_HTTP_PASSWORD_LEN>,
    server_base_url: String<MAX_SERVER_URL_LEN>,
    chat_display_name: String<MAX_CHAT_NAME_LEN>,
    server_layout: UrlLayout,
}

impl DeviceConfig {
    /// Copy validated values into owned storage
    pub(crate) fn from_validated(
        raw: &RawConfigValues<'_>,
        server_layout: UrlLayout,
    ) -> Result<Self, ConfigError> {
        Ok(Self {
            wifi_ssid: owned(raw, ConfigField::WifiSsid)?,
            wifi_passphrase: owned(raw, ConfigField::WifiPassphrase)?,
            http_username: owned(raw, ConfigField::HttpUsername)?,
            http_password: owned(raw, ConfigField::HttpPassword)?,
            server_base_url: owned(raw, ConfigField::ServerBaseUrl)?,
            chat_display_name: owned(raw, ConfigField::ChatDisplayName)?,
            server_layout,
        })
    }

    pub fn wifi_ssid(&self) -> &str {
        &self.wifi_ssid
    }

    /// WPA2 passphrase; empty for an open network
    pub fn wifi_passphrase(&self) -> &str {
        &self.wifi_passphrase
    }

    pub fn http_username(&self) -> &str {
        &self.http_username
    }

    pub fn http_password(&self) -> &str {
        &self.http_password
    }

    pub fn server_base_url(&self) -> &str {
        &self.server_base_url
    }

    pub fn chat_display_name(&self) -> &str {
        &self.chat_display_name
    }

    /// True when no passphrase is configured
    pub fn is_open_network(&self) -> bool {
        self.wifi_passphrase.is_empty()
    }

    /// Basic-auth credentials, if the server requires them
    pub fn http_auth(&self) -> Option<HttpAuth<'_>> {
        if self.http_username.is_empty() {
            return None;
        }
        Some(HttpAuth {
            username: &self.http_username,
            password: &self.http_password,
        })
    }

    /// Parsed view of the server base URL
    pub fn server(&self) -> ServerUrl<'_> {
        ServerUrl::from_layout(&self.server_base_url, self.server_layout)
    }

    /// Full URL for a server route such as `/gpt/ask`
    ///
    /// Returns `None` if the result does not fit in `N` bytes.
    pub fn endpoint<const N: usize>(&self, route: &str) -> Option<String<N>> {
        self.server().endpoint(route)
    }

    /// Display name cut to what fits on the calculator screen
    pub fn chat_label(&self) -> &str {
        let name = self.chat_display_name.as_str();
        match name.char_indices().nth(RECOMMENDED_CHAT_NAME_CHARS) {
            Some((end, _)) => &name[..end],
            None => name,
        }
    }

    /// Whether the display name is longer than the screen layout allows
    pub fn chat_name_exceeds_recommended(&self) -> bool {
        self.chat_display_name.chars().count() > RECOMMENDED_CHAT_NAME_CHARS
    }

    /// Borrow the values back in raw form (for persisting them)
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
}

fn owned<const N: usize>(
    raw: &RawConfigValues<'_>,
    field: ConfigField,
) -> Result<String<N>, ConfigError> {
    String::try_from(raw.field(field)).map_err(|_| {
        ConfigError::FieldLengthViolation(field, super::error::LengthConstraint::AtMost(N))
    })
}

impl fmt::Debug for DeviceConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DeviceConfig")
            .field("wifi_ssid", &self.wifi_ssid.as_str())
            .field("wifi_passphrase", &Redacted(&self.wifi_passphrase))
            .field("http_username", &self.http_username.as_str())
            .field("http_password", &Redacted(&self.http_password))
            .field("server_base_url", &self.server_base_url.as_str())
            .field("chat_display_name", &self.chat_display_name.as_str())
            .finish()
    }
}

#[cfg(feature = "defmt")]
impl defmt::Format for DeviceConfig {
    fn format(&self, f: defmt::Formatter) {
        defmt::write!(
            f,
            "DeviceConfig {{ ssid={=str}, open={=bool}, server={=str}, auth={=bool}, chat={=str} }}",
            self.wifi_ssid.as_str(),
            self.is_open_network(),
            self.server_base_url.as_str(),
            !self.http_username.is_empty(),
            self.chat_display_name.as_str()
        );
    }
}

/// HTTP basic-auth credentials
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct HttpAuth<'a> {
    pub username: &'a str,
    pub password: &'a str,
}

impl HttpAuth<'_> {
    /// `Authorization` header value: `Basic <base64(username:password)>`
    ///
    /// Returns `None` only if the credentials are longer than the
    /// validated limits allow.
    pub fn header_value(&self) -> Option<String<BASIC_AUTH_HEADER_LEN>> {
        const CREDENTIALS_LEN: usize = MAX_HTTP_USERNAME_LEN + 1 + MAX_HTTP_PASSWORD_LEN;

        let user = self.username.as_bytes();
        let pass = self.password.as_bytes();
        let len = user.len() + 1 + pass.len();
        if len > CREDENTIALS_LEN {
            return None;
        }

        let mut credentials = [0u8; CREDENTIALS_LEN];
        credentials[..user.len()].copy_from_slice(user);
        credentials[user.len()] = b':';
        credentials[user.len() + 1..len].copy_from_slice(pass);

        let mut encoded = [0u8; BASIC_AUTH_HEADER_LEN];
        let encoded_len = BASE64.encode_len(len);
        BASE64.encode_mut(&credentials[..len], &mut encoded[..encoded_len]);
        let encoded = core::str::from_utf8(&encoded[..encoded_len]).ok()?;

        let mut header = String::new();
        header.push_str(BASIC_AUTH_PREFIX).ok()?;
        header.push_str(encoded).ok()?;
        Some(header)
    }
}

impl fmt::Debug for HttpAuth<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HttpAuth")
            .field("username", &self.username)
            .field("password", &Redacted(self.password))
            .finish()
    }
}

/// Debug stand-in for secret values
struct Redacted<'a>(&'a str);

impl fmt::Debug for Redacted<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.is_empty() {
            f.write_str("\"\"")
        } else {
            f.write_str("<redacted>")
        }
    }
}
