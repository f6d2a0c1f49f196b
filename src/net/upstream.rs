//! Upstream connections.
//!
//! # Responsibilities
//! - Open a TCP connection to the origin named by the request
//! - Apply the optional connect deadline
//!
//! The relay engine talks to origins through the [`Connector`] trait so the
//! pipeline can run over any duplex stream.

use std::future::Future;
use std::time::Duration;

use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::TcpStream;

use crate::error::ProxyError;
use crate::resilience::timeouts::with_deadline;

/// Opens a byte stream to an origin server.
pub trait Connector: Send + Sync {
    type Stream: AsyncRead + AsyncWrite + Unpin + Send;

    /// Connect to `host:port`. No retries are attempted.
    fn connect(
        &self,
        host: &str,
        port: u16,
    ) -> impl Future<Output = Result<Self::Stream, ProxyError>> + Send;
}

/// Plain TCP connector.
#[derive(Debug, Clone, Default)]
pub struct TcpConnector {
    connect_timeout: Option<Duration>,
}

impl TcpConnector {
    pub fn new(connect_timeout: Option<Duration>) -> Self {
        Self { connect_timeout }
    }
}

impl Connector for TcpConnector {
    type Stream = TcpStream;

    async fn connect(&self, host: &str, port: u16) -> Result<TcpStream, ProxyError> {
        let attempt = async {
            TcpStream::connect((socket_host(host), port))
                .await
                .map_err(|source| ProxyError::UpstreamConnect {
                    host: host.to_string(),
                    port,
                    source,
                })
        };
        let stream = with_deadline(self.connect_timeout, "upstream connect", attempt).await?;

        if let Err(e) = stream.set_nodelay(true) {
            tracing::debug!(error = %e, "Failed to set TCP_NODELAY on upstream socket");
        }
        tracing::debug!(host = %host, port, "Upstream connected");
        Ok(stream)
    }
}

/// Hostname as the resolver expects it: `[::1]` becomes `::1`.
fn socket_host(host: &str) -> &str {
    host.strip_prefix('[')
        .and_then(|inner| inner.strip_suffix(']'))
        .unwrap_or(host)
}
