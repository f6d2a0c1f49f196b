//! Request line parsing.
//!
//! # Responsibilities
//! - Split the first client line into method, target and version
//! - Decide whether the method is one the proxy forwards

/// The only method this proxy forwards.
pub const SUPPORTED_METHOD: &str = "GET";

/// First line of a client request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestLine {
    pub method: String,
    /// Request-target (absolute URI, authority or origin-form path).
    pub target: Option<String>,
    /// Protocol version as sent; the proxy always forwards as HTTP/1.0.
    pub version: Option<String>,
}

impl RequestLine {
    /// Tokenize a request line on ASCII whitespace.
    ///
    /// Returns `None` for a blank line. Missing target or version tokens are
    /// reported as `None` so the caller can still reject the method first.
    pub fn parse(line: &str) -> Option<Self> {
        let mut tokens = line.split_ascii_whitespace();
        let method = tokens.next()?.to_string();
        let target = tokens.next().map(str::to_string);
        let version = tokens.next().map(str::to_string);
        Some(Self {
            method,
            target,
            version,
        })
    }

    /// True for `GET` in any letter case.
    pub fn is_supported_method(&self) -> bool {
        self.method.eq_ignore_ascii_case(SUPPORTED_METHOD)
    }
}
