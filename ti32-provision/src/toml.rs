//! Simple TOML parser for provisioned device configuration
//!
//! This is a minimal TOML parser that handles only the subset needed for
//! the provisioning blob. It does NOT support the full TOML spec.
//!
//! Supported features:
//! - `[wifi]`, `[http]`, `[server]` and `[chat]` section headers
//! - Key = value pairs with basic ("...") or literal ('...') strings
//! - The original constant names as root-level keys (`WIFI_SSID = "..."`)
//! - Comments (# ...), including after a value
//!
//! NOT supported:
//! - Escape sequences in basic strings (use a literal string instead)
//! - Multi-line strings
//! - Non-string values
//!
//! Values borrow from the input, so the returned [`RawConfigValues`] lives
//! as long as the text it was parsed from.

use ti32_core::config::{ConfigField, RawConfigValues};

/// Parse error, with the 1-based line it was found on
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ParseError {
    /// Unknown or malformed section header
    InvalidSection { line: usize },
    /// Line is neither a header, a comment, nor `key = value`
    InvalidLine { line: usize },
    /// Value is not a closed string, or has trailing text
    InvalidValue { line: usize },
    /// Backslash inside a basic string
    UnsupportedEscape { line: usize },
    /// Key does not name a configuration field in this section
    UnknownKey { line: usize },
    /// Field set twice
    DuplicateKey { line: usize },
}

impl ParseError {
    pub fn line(&self) -> usize {
        match *self {
            ParseError::InvalidSection { line }
            | ParseError::InvalidLine { line }
            | ParseError::InvalidValue { line }
            | ParseError::UnsupportedEscape { line }
            | ParseError::UnknownKey { line }
            | ParseError::DuplicateKey { line } => line,
        }
    }
}

impl core::fmt::Display for ParseError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let what = match self {
            ParseError::InvalidSection { .. } => "invalid section header",
            ParseError::InvalidLine { .. } => "expected `key = value`",
            ParseError::InvalidValue { .. } => "expected a quoted string",
            ParseError::UnsupportedEscape { .. } => "escape sequences are not supported",
            ParseError::UnknownKey { .. } => "unknown key",
            ParseError::DuplicateKey { .. } => "key set twice",
        };
        write!(f, "line {}: {}", self.line(), what)
    }
}

/// Current parsing context
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Section<'a> {
    Root,
    Table(&'a str),
}

/// Parse provisioning TOML into raw configuration values
///
/// Fields the text does not mention are left empty.
pub fn parse_config(input: &str) -> Result<RawConfigValues<'_>, ParseError> {
    let mut raw: RawConfigValues<'_> = RawConfigValues::EMPTY;
    let mut seen = [false; ConfigField::ALL.len()];
    let mut section = Section::Root;

    for (idx, line) in input.lines().enumerate() {
        let line_no = idx + 1;
        let line = line.trim();

        // Skip empty lines and comments
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        if line.starts_with('[') {
            section = parse_section_header(line).ok_or(ParseError::InvalidSection { line: line_no })?;
            continue;
        }

        let (key, value) = parse_key_value(line).ok_or(ParseError::InvalidLine { line: line_no })?;
        let field = lookup_field(section, key).ok_or(ParseError::UnknownKey { line: line_no })?;
        let value = parse_string(value, line_no)?;

        let slot = &mut seen[field as usize];
        if *slot {
            return Err(ParseError::DuplicateKey { line: line_no });
        }
        *slot = true;
        raw.set(field, value);
    }

    Ok(raw)
}

/// Parse a header like "[wifi]" (trailing comment allowed)
fn parse_section_header(line: &str) -> Option<Section<'_>> {
    let close = line.find(']')?;
    let after = line[close + 1..].trim();
    if !after.is_empty() && !after.starts_with('#') {
        return None;
    }

    let name = line[1..close].trim();
    if ConfigField::ALL.iter().any(|f| f.toml_key().0 == name) {
        Some(Section::Table(name))
    } else {
        None
    }
}

/// Split "key = value"
fn parse_key_value(line: &str) -> Option<(&str, &str)> {
    let (key, value) = line.split_once('=')?;
    let key = key.trim();
    let value = value.trim();
    if key.is_empty() || value.is_empty() {
        return None;
    }
    Some((key, value))
}

fn lookup_field(section: Section<'_>, key: &str) -> Option<ConfigField> {
    match section {
        Section::Root => ConfigField::from_source_name(key),
        Section::Table(table) => ConfigField::from_toml_key(table, key),
    }
}

/// Parse a quoted string, allowing a trailing comment
fn parse_string(value: &str, line: usize) -> Result<&str, ParseError> {
    let quote = match value.chars().next() {
        Some(q @ ('"' | '\'')) => q,
        _ => return Err(ParseError::InvalidValue { line }),
    };

    let body = &value[1..];
    let close = body.find(quote).ok_or(ParseError::InvalidValue { line })?;
    let content = &body[..close];

    let rest = body[close + 1..].trim();
    if !rest.is_empty() && !rest.starts_with('#') {
        return Err(ParseError::InvalidValue { line });
    }
    if quote == '"' && content.contains('\\') {
        return Err(ParseError::UnsupportedEscape { line });
    }

    Ok(content)
}
