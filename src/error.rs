//! Errors produced while relaying a single client connection.

use std::time::Duration;

use thiserror::Error;

use crate::http::uri::UriError;

/// Errors that end one relay invocation.
///
/// None of these outlive the connection that produced them; the accept
/// loop logs them and moves on to the next client.
#[derive(Debug, Error)]
pub enum ProxyError {
    /// Reading from or writing to either socket failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The origin could not be reached.
    #[error("failed to connect to upstream {host}:{port}: {source}")]
    UpstreamConnect {
        host: String,
        port: u16,
        #[source]
        source: std::io::Error,
    },

    /// A configured connect or idle deadline elapsed.
    #[error("{operation} timed out after {after:?}")]
    Timeout {
        operation: &'static str,
        after: Duration,
    },

    /// The request-target could not be split into host, port and path.
    #[error("invalid request target: {0}")]
    InvalidTarget(#[from] UriError),

    /// The client's header block exceeded the configured bound.
    #[error("client headers exceed {limit} bytes")]
    HeadersTooLarge { limit: usize },

    /// Neither the request-target nor a Host header named an origin.
    #[error("request does not name an origin host")]
    MissingHost,
}

impl ProxyError {
    /// Short label used for metrics and log fields.
    pub fn kind(&self) -> &'static str {
        match self {
            ProxyError::Io(_) => "io",
            ProxyError::UpstreamConnect { .. } => "upstream_connect",
            ProxyError::Timeout { .. } => "timeout",
            ProxyError::InvalidTarget(_) => "invalid_target",
            ProxyError::HeadersTooLarge { .. } => "headers_too_large",
            ProxyError::MissingHost => "missing_host",
        }
    }
}
