//! Unedited template detection
//!
//! Firmware ships with example credentials such as `"YourWiFiSSID"` and
//! `"http://192.168.1.XXX:8080"`. A device flashed with those values fails
//! to connect with no useful diagnostic, so they are rejected by name.
//!
//! Comparisons use a normalised form: ASCII alphanumerics only, lowercased.
//! `"YOUR_WIFI_SSID"`, `"Your WiFi SSID"` and `"YourWiFiSSID"` all match
//! the same token.

use heapless::String;

/// Example SSIDs from templates
const SSID_TOKENS: &[&str] = &[
    "yourwifissid",
    "yourssid",
    "wifissid",
    "ssid",
    "yournetwork",
    "yournetworkname",
    "networkname",
    "apname",
    "changeme",
];

/// Example passphrases from templates
const PASSPHRASE_TOKENS: &[&str] = &[
    "yourwifipassword",
    "yourwifipass",
    "yourpassword",
    "wifipassword",
    "password",
    "changeme",
];

/// Example chat names from templates
const CHAT_NAME_TOKENS: &[&str] = &["yourname", "name", "changeme"];

/// Fragments that mark a templated host
const HOST_FRAGMENTS: &[&str] = &["yourserver", "yourip", "yourcomputer", "yourhost"];

/// RFC 2606 documentation domains
const DOCUMENTATION_DOMAINS: &[&str] = &["example.com", "example.org", "example.net", "example"];

/// Longest normalised host that is searched for fragments
const MAX_HOST_LEN: usize = 253;

pub fn is_placeholder_ssid(value: &str) -> bool {
    matches_token(value, SSID_TOKENS)
}

pub fn is_placeholder_passphrase(value: &str) -> bool {
    matches_token(value, PASSPHRASE_TOKENS)
}

pub fn is_placeholder_chat_name(value: &str) -> bool {
    matches_token(value, CHAT_NAME_TOKENS)
}

/// Check a server URL for template markers
///
/// Runs before the URL is parsed, so the host is located leniently. A URL
/// that cannot be picked apart here is left for the parser to reject.
pub fn is_placeholder_server_url(url: &str) -> bool {
    if url.contains(['<', '>', '{', '}']) || has_punctuation_mask(url) {
        return true;
    }

    let host = lenient_host(url);
    if host.is_empty() {
        return false;
    }

    has_masked_octet(host) || has_host_fragment(host) || is_documentation_host(host)
}

fn normalized(value: &str) -> impl Iterator<Item = char> + '_ {
    value
        .chars()
        .filter(char::is_ascii_alphanumeric)
        .map(|c| c.to_ascii_lowercase())
}

fn matches_token(value: &str, tokens: &[&str]) -> bool {
    tokens.iter().any(|token| normalized(value).eq(token.chars()))
}

/// `scheme://[user@]host[:port]/...` → `host`
fn lenient_host(url: &str) -> &str {
    let rest = url.split_once("://").map_or(url, |(_, rest)| rest);
    let authority = rest.split(['/', '?', '#']).next().unwrap_or("");
    let host = authority.rsplit_once('@').map_or(authority, |(_, host)| host);
    if host.starts_with('[') {
        return host;
    }
    host.split(':').next().unwrap_or("")
}

/// `192.168.1.XXX`, `10.0.*.1`, `XXX.XXX.XXX.XXX`, `192.168.1.abc`
fn has_masked_octet(host: &str) -> bool {
    let is_mask = |label: &str| !label.is_empty() && label.chars().all(|c| "xX*".contains(c));
    let is_numeric = |label: &str| !label.is_empty() && label.bytes().all(|b| b.is_ascii_digit());

    let mut labels = 0;
    let mut masked = 0;
    let mut numeric = 0;
    for label in host.split('.') {
        labels += 1;
        if is_mask(label) {
            if label.contains('*') {
                return true;
            }
            masked += 1;
        } else if is_numeric(label) {
            numeric += 1;
        }
    }

    if masked == labels {
        return true;
    }
    if masked > 0 && numeric > 0 {
        return true;
    }
    // Dotted quad with a word where an octet belongs
    labels == 4 && numeric > 0 && numeric < labels
}

/// `192.168.1.???`: the lenient host stops at `?`, so look at the raw authority
fn has_punctuation_mask(url: &str) -> bool {
    let rest = url.split_once("://").map_or(url, |(_, rest)| rest);
    let authority = rest.split('/').next().unwrap_or("");
    let host = authority.rsplit_once('@').map_or(authority, |(_, host)| host);
    host.split('.').any(|label| {
        let label = label.split(':').next().unwrap_or("");
        !label.is_empty() && label.chars().all(|c| c == '?' || c == '#')
    })
}

fn has_host_fragment(host: &str) -> bool {
    let mut norm: String<MAX_HOST_LEN> = String::new();
    for c in normalized(host) {
        if norm.push(c).is_err() {
            break;
        }
    }
    HOST_FRAGMENTS.iter().any(|f| norm.contains(f))
}

fn is_documentation_host(host: &str) -> bool {
    let host = host.trim_end_matches('.');
    DOCUMENTATION_DOMAINS.iter().any(|domain| {
        if host.eq_ignore_ascii_case(domain) {
            return true;
        }
        host.len() > domain.len()
            && host.is_char_boundary(host.len() - domain.len() - 1)
            && host[host.len() - domain.len() - 1..].starts_with('.')
            && host[host.len() - domain.len()..].eq_ignore_ascii_case(domain)
    })
}
