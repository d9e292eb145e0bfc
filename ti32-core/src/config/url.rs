//! Server base URL parsing
//!
//! A minimal parser for the subset of absolute URLs the bridge needs:
//!
//! ```text
//! http[s]://host[:port][/base/path]
//! ```
//!
//! Host may be a DNS name, an IPv4 address, or a bracketed IPv6 literal.
//! User info, queries and fragments are rejected because the base URL is
//! joined with route paths at request time.

use heapless::String;

use super::error::UrlError;

/// Supported URL schemes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Scheme {
    Http,
    Https,
}

impl Scheme {
    /// Port used when the URL has none
    pub const fn default_port(self) -> u16 {
        match self {
            Scheme::Http => 80,
            Scheme::Https => 443,
        }
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Scheme::Http => "http",
            Scheme::Https => "https",
        }
    }

    fn parse(s: &str) -> Result<Self, UrlError> {
        if s.eq_ignore_ascii_case("http") {
            Ok(Scheme::Http)
        } else if s.eq_ignore_ascii_case("https") {
            Ok(Scheme::Https)
        } else {
            Err(UrlError::UnsupportedScheme)
        }
    }
}

/// Byte offsets of the URL components, kept alongside the owned string
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct UrlLayout {
    scheme: Scheme,
    host_start: usize,
    host_end: usize,
    port: Option<u16>,
    path_start: usize,
}

/// Parsed view of a server base URL
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ServerUrl<'a> {
    url: &'a str,
    layout: UrlLayout,
}

impl<'a> ServerUrl<'a> {
    /// Parse an absolute http or https URL
    pub fn parse(url: &'a str) -> Result<Self, UrlError> {
        if url.chars().any(|c| c.is_whitespace() || c.is_control()) {
            return Err(UrlError::InvalidCharacter);
        }

        let (scheme, rest) = url.split_once("://").ok_or(UrlError::MissingScheme)?;
        if scheme.is_empty() {
            return Err(UrlError::MissingScheme);
        }
        let scheme = Scheme::parse(scheme)?;
        let authority_start = url.len() - rest.len();

        let authority_len = rest.find(['/', '?', '#']).unwrap_or(rest.len());
        let authority = &rest[..authority_len];
        let path = &rest[authority_len..];

        if path.contains(['?', '#']) {
            return Err(UrlError::QueryOrFragment);
        }
        if authority.contains('@') {
            return Err(UrlError::UserInfo);
        }

        let (host, port) = split_host_port(authority)?;
        if host.is_empty() {
            return Err(UrlError::EmptyHost);
        }
        validate_host(host)?;
        let port = port.map(parse_port).transpose()?;

        Ok(Self {
            url,
            layout: UrlLayout {
                scheme,
                host_start: authority_start,
                host_end: authority_start + host.len(),
                port,
                path_start: authority_start + authority_len,
            },
        })
    }

    pub(crate) fn from_layout(url: &'a str, layout: UrlLayout) -> Self {
        Self { url, layout }
    }

    pub(crate) fn layout(&self) -> UrlLayout {
        self.layout
    }

    /// The URL exactly as configured
    pub fn as_str(&self) -> &'a str {
        self.url
    }

    pub fn scheme(&self) -> Scheme {
        self.layout.scheme
    }

    /// True for https
    pub fn is_secure(&self) -> bool {
        self.layout.scheme == Scheme::Https
    }

    /// Host as written (IPv6 literals keep their brackets)
    pub fn host(&self) -> &'a str {
        &self.url[self.layout.host_start..self.layout.host_end]
    }

    /// Explicit port, if the URL has one
    pub fn port(&self) -> Option<u16> {
        self.layout.port
    }

    /// Explicit port, or the scheme default
    pub fn port_or_default(&self) -> u16 {
        self.layout.port.unwrap_or(self.layout.scheme.default_port())
    }

    /// Base path, empty if none (e.g. `/api` for `http://host/api`)
    pub fn path(&self) -> &'a str {
        &self.url[self.layout.path_start..]
    }

    /// Join the base URL with a route such as `/gpt/ask?question=hi`
    ///
    /// Exactly one `/` separates base and route. Returns `None` if the
    /// result does not fit in `N` bytes.
    pub fn endpoint<const N: usize>(&self, route: &str) -> Option<String<N>> {
        let base = self.url.trim_end_matches('/');
        let route = route.trim_start_matches('/');

        let mut out = String::new();
        out.push_str(base).ok()?;
        out.push('/').ok()?;
        out.push_str(route).ok()?;
        Some(out)
    }
}

/// Split `host[:port]`, handling `[v6]:port`
fn split_host_port(authority: &str) -> Result<(&str, Option<&str>), UrlError> {
    if authority.starts_with('[') {
        let close = authority.find(']').ok_or(UrlError::InvalidHost)?;
        let host = &authority[..=close];
        let after = &authority[close + 1..];
        if after.is_empty() {
            return Ok((host, None));
        }
        return match after.strip_prefix(':') {
            Some(port) => Ok((host, Some(port))),
            None => Err(UrlError::InvalidHost),
        };
    }

    match authority.split_once(':') {
        Some((host, port)) => Ok((host, Some(port))),
        None => Ok((authority, None)),
    }
}

fn validate_host(host: &str) -> Result<(), UrlError> {
    if let Some(inner) = host.strip_prefix('[') {
        let inner = inner.strip_suffix(']').ok_or(UrlError::InvalidHost)?;
        let ok = !inner.is_empty()
            && inner.contains(':')
            && inner.chars().all(|c| c.is_ascii_hexdigit() || c == ':' || c == '.');
        return if ok { Ok(()) } else { Err(UrlError::InvalidHost) };
    }

    let ok = host
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '.' || c == '_')
        && !host.starts_with('.')
        && !host.contains("..");
    if ok {
        Ok(())
    } else {
        Err(UrlError::InvalidHost)
    }
}

fn parse_port(port: &str) -> Result<u16, UrlError> {
    if port.is_empty() || !port.bytes().all(|b| b.is_ascii_digit()) {
        return Err(UrlError::InvalidPort);
    }
    match port.parse::<u16>() {
        Ok(0) | Err(_) => Err(UrlError::InvalidPort),
        Ok(p) => Ok(p),
    }
}
