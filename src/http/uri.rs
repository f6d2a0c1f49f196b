//! Request-target splitting.
//!
//! # Responsibilities
//! - Strip an optional `scheme://` prefix
//! - Split the authority into hostname and optional numeric port
//! - Keep everything from the first `/` onward as the forwarded path
//!
//! Parsing is done by explicit tokenizing on delimiters with bounds-checked
//! slicing, so a target such as `example.com:8080` with nothing after the
//! port simply yields the default path.

use std::fmt;

/// Port used when the target does not name one.
pub const DEFAULT_PORT: u16 = 80;

/// Path used when the target does not name one.
pub const DEFAULT_PATH: &str = "/";

/// Origin coordinates derived from a request-target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedTarget {
    /// Host to connect to. Empty for origin-form targets such as `/index.html`;
    /// IPv6 literals keep their brackets.
    pub hostname: String,
    /// TCP port, never zero.
    pub port: u16,
    /// Path to request from the origin, always starting with `/`.
    pub path: String,
}

impl ParsedTarget {
    /// True when the target carried no host segment.
    pub fn is_relative(&self) -> bool {
        self.hostname.is_empty()
    }
}

/// Reasons a request-target is rejected.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UriError {
    /// The port digits do not fit a non-zero 16-bit port.
    InvalidPort(String),
    /// An authority was present but named no host, e.g. `http://:8080/`.
    EmptyHost,
    /// A `[` opened an IPv6 literal that never closed.
    UnclosedBracket,
}

impl fmt::Display for UriError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UriError::InvalidPort(digits) => write!(f, "invalid port '{}'", digits),
            UriError::EmptyHost => write!(f, "authority names no host"),
            UriError::UnclosedBracket => write!(f, "unterminated IPv6 literal"),
        }
    }
}

impl std::error::Error for UriError {}

/// Split a request-target into hostname, port and path.
///
/// Accepts absolute form (`http://host:port/path`), scheme-less authority
/// form (`host:port/path`, `host`) and origin form (`/path`, hostname left
/// empty).
pub fn parse_target(target: &str) -> Result<ParsedTarget, UriError> {
    let rest = strip_scheme(target);

    // Only a colon inside the authority introduces a port.
    let authority_end = rest.find('/').unwrap_or(rest.len());
    let (authority, path) = rest.split_at(authority_end);
    let path = if path.is_empty() { DEFAULT_PATH } else { path };

    let (hostname, port) = split_host_port(authority)?;
    if hostname.is_empty() && !authority.is_empty() {
        return Err(UriError::EmptyHost);
    }

    Ok(ParsedTarget {
        hostname: hostname.to_string(),
        port,
        path: path.to_string(),
    })
}

/// Split a `Host` header value into hostname and port.
pub fn parse_authority(value: &str) -> Result<(String, u16), UriError> {
    let (host, port) = split_host_port(value.trim())?;
    Ok((host.to_string(), port))
}

/// Split `host[:port]`. A bracketed IPv6 literal keeps its brackets and only
/// a colon after the closing `]` introduces the port.
fn split_host_port(authority: &str) -> Result<(&str, u16), UriError> {
    if authority.starts_with('[') {
        let close = authority.find(']').ok_or(UriError::UnclosedBracket)?;
        let (host, rest) = authority.split_at(close + 1);
        let port = match rest.strip_prefix(':') {
            Some(after_colon) => parse_port(after_colon)?,
            None => DEFAULT_PORT,
        };
        return Ok((host, port));
    }

    match authority.split_once(':') {
        Some((host, after_colon)) => Ok((host, parse_port(after_colon)?)),
        None => Ok((authority, DEFAULT_PORT)),
    }
}

fn strip_scheme(target: &str) -> &str {
    match target.find("//") {
        // `/a//b` is a path, not a scheme separator.
        Some(idx) if !target[..idx].contains('/') => &target[idx + 2..],
        _ => target,
    }
}

/// Reads the leading digit run after a colon. An empty run keeps the
/// default port; trailing non-digits are ignored.
fn parse_port(after_colon: &str) -> Result<u16, UriError> {
    let digits_end = after_colon
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(after_colon.len());
    let digits = &after_colon[..digits_end];
    if digits.is_empty() {
        return Ok(DEFAULT_PORT);
    }

    match digits.parse::<u16>() {
        Ok(port) if port > 0 => Ok(port),
        _ => Err(UriError::InvalidPort(digits.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parsed(target: &str) -> (String, u16, String) {
        let t = parse_target(target).unwrap();
        (t.hostname, t.port, t.path)
    }

    #[test]
    fn absolute_uri_with_port_and_path() {
        assert_eq!(
            parsed("http://example.com:8080/foo.html"),
            ("example.com".into(), 8080, "/foo.html".into())
        );
    }

    #[test]
    fn absolute_uri_defaults_port() {
        assert_eq!(
            parsed("http://example.com/a/b?q=1"),
            ("example.com".into(), 80, "/a/b?q=1".into())
        );
    }

    #[test]
    fn scheme_less_forms() {
        assert_eq!(parsed("example.com/path"), ("example.com".into(), 80, "/path".into()));
        assert_eq!(parsed("example.com:81/p"), ("example.com".into(), 81, "/p".into()));
        assert_eq!(parsed("example.com"), ("example.com".into(), 80, "/".into()));
    }

    #[test]
    fn port_without_path_defaults_path() {
        assert_eq!(parsed("example.com:8080"), ("example.com".into(), 8080, "/".into()));
        assert_eq!(parsed("http://localhost:3000"), ("localhost".into(), 3000, "/".into()));
    }

    #[test]
    fn origin_form_leaves_hostname_empty() {
        let target = parse_target("/foo.html").unwrap();
        assert!(target.is_relative());
        assert_eq!(target.port, 80);
        assert_eq!(target.path, "/foo.html");

        // A double slash inside the path is not a scheme separator.
        assert_eq!(parsed("/a//b"), ("".into(), 80, "/a//b".into()));
    }

    #[test]
    fn colon_after_slash_is_part_of_path() {
        assert_eq!(
            parsed("http://example.com/time:12:00"),
            ("example.com".into(), 80, "/time:12:00".into())
        );
    }

    #[test]
    fn empty_port_keeps_default() {
        assert_eq!(parsed("example.com:/x"), ("example.com".into(), 80, "/x".into()));
    }

    #[test]
    fn rejects_zero_and_overflowing_ports() {
        assert_eq!(
            parse_target("example.com:0/x"),
            Err(UriError::InvalidPort("0".into()))
        );
        assert_eq!(
            parse_target("example.com:70000"),
            Err(UriError::InvalidPort("70000".into()))
        );
    }

    #[test]
    fn path_always_starts_with_slash() {
        for target in ["h", "h:1", "http://h", "http://h:2/", "h:3abc/z", "/"] {
            assert!(parse_target(target).unwrap().path.starts_with('/'), "{target}");
        }
    }

    #[test]
    fn ipv6_literal_keeps_brackets_and_port() {
        assert_eq!(parsed("http://[::1]:8080/x"), ("[::1]".into(), 8080, "/x".into()));
        assert_eq!(parsed("[fe80::2]/"), ("[fe80::2]".into(), 80, "/".into()));
        assert_eq!(parse_target("http://[::1/x"), Err(UriError::UnclosedBracket));
        assert_eq!(parse_authority("[::1]:81").unwrap(), ("[::1]".into(), 81));
    }

    #[test]
    fn explicit_authority_without_host_is_rejected() {
        assert_eq!(parse_target("http://:8080/x"), Err(UriError::EmptyHost));
        assert_eq!(parse_target(":8080"), Err(UriError::EmptyHost));
    }

    #[test]
    fn authority_from_host_header() {
        assert_eq!(parse_authority(" localhost:8000 ").unwrap(), ("localhost".into(), 8000));
        assert_eq!(parse_authority("example.com").unwrap(), ("example.com".into(), 80));
    }
}
