//! Outbound header block construction.
//!
//! # Responsibilities
//! - Drain the client's header lines up to the blank-line sentinel
//! - Drop client headers the proxy overrides (Host, User-Agent, Connection,
//!   Proxy-Connection) and keep every other line verbatim and in order
//! - Render the canonical HTTP/1.0 request block sent upstream
//!
//! The block is always laid out as: request line, Host, User-Agent,
//! Connection, Proxy-Connection, passthrough lines, blank line.

use tokio::io::AsyncBufRead;

use crate::config::HeaderConfig;
use crate::error::ProxyError;
use crate::net::line::LineReader;

/// Header names the proxy always writes itself.
const OVERRIDDEN: [&[u8]; 4] = [b"Host", b"User-Agent", b"Connection", b"Proxy-Connection"];

/// Values of the headers injected into every forwarded request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InjectedHeaders {
    pub user_agent: String,
    pub connection: String,
    pub proxy_connection: String,
}

impl Default for InjectedHeaders {
    fn default() -> Self {
        Self::from(&HeaderConfig::default())
    }
}

impl From<&HeaderConfig> for InjectedHeaders {
    fn from(config: &HeaderConfig) -> Self {
        Self {
            user_agent: config.user_agent.clone(),
            connection: config.connection.clone(),
            proxy_connection: config.proxy_connection.clone(),
        }
    }
}

/// Header lines read from the client, already filtered.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClientHeaders {
    passthrough: Vec<u8>,
    host: Option<String>,
    terminated: bool,
}

impl ClientHeaders {
    /// Kept header lines, byte-for-byte as received.
    pub fn passthrough(&self) -> &[u8] {
        &self.passthrough
    }

    /// Value of the first `Host` header the client sent, if any.
    pub fn host(&self) -> Option<&str> {
        self.host.as_deref()
    }

    /// True if the client sent the blank-line sentinel before closing.
    pub fn terminated(&self) -> bool {
        self.terminated
    }
}

/// Builds the outbound request block from the parsed target and the
/// client's remaining header lines.
#[derive(Debug, Clone)]
pub struct HeaderRewriter {
    injected: InjectedHeaders,
    max_header_bytes: usize,
}

impl HeaderRewriter {
    pub fn new(injected: InjectedHeaders, max_header_bytes: usize) -> Self {
        Self {
            injected,
            max_header_bytes,
        }
    }

    /// Drain the client headers and render the outbound block in one step.
    ///
    /// Consumes the header section of `lines`; call it once per connection.
    pub async fn rewrite<R>(
        &self,
        path: &str,
        hostname: &str,
        lines: &mut LineReader<R>,
    ) -> Result<Vec<u8>, ProxyError>
    where
        R: AsyncBufRead + Unpin,
    {
        let client = self.read_client_headers(lines).await?;
        Ok(self.render(path, hostname, &client))
    }

    /// Read header lines until `\r\n` (or a bare `\n`) or end of stream.
    pub async fn read_client_headers<R>(
        &self,
        lines: &mut LineReader<R>,
    ) -> Result<ClientHeaders, ProxyError>
    where
        R: AsyncBufRead + Unpin,
    {
        let mut headers = ClientHeaders::default();
        let mut buf = Vec::with_capacity(256);
        let mut consumed = 0usize;
        // Set while the pieces of an over-long line are still arriving.
        let mut continuation: Option<bool> = None;

        loop {
            let n = lines.read_line(&mut buf).await?;
            if n == 0 {
                break;
            }

            let keep = match continuation {
                Some(keep) => keep,
                None => {
                    if buf == b"\r\n" || buf == b"\n" {
                        headers.terminated = true;
                        break;
                    }
                    self.classify(&buf, &mut headers)
                }
            };

            consumed += n;
            if consumed > self.max_header_bytes {
                return Err(ProxyError::HeadersTooLarge {
                    limit: self.max_header_bytes,
                });
            }

            if keep {
                headers.passthrough.extend_from_slice(&buf);
            }
            continuation = if buf.ends_with(b"\n") { None } else { Some(keep) };
        }

        Ok(headers)
    }

    /// Render the outbound block. Never emits more than one of each
    /// overridden header.
    pub fn render(&self, path: &str, hostname: &str, client: &ClientHeaders) -> Vec<u8> {
        let head = format!(
            "GET {} HTTP/1.0\r\nHost: {}\r\nUser-Agent: {}\r\nConnection: {}\r\nProxy-Connection: {}\r\n",
            path,
            hostname,
            self.injected.user_agent,
            self.injected.connection,
            self.injected.proxy_connection,
        );

        let mut block = Vec::with_capacity(head.len() + client.passthrough.len() + 4);
        block.extend_from_slice(head.as_bytes());
        block.extend_from_slice(&client.passthrough);
        if !client.passthrough.is_empty() && !client.passthrough.ends_with(b"\n") {
            block.extend_from_slice(b"\r\n");
        }
        block.extend_from_slice(b"\r\n");
        block
    }

    /// Returns whether the line is passed through; records a client Host.
    fn classify(&self, line: &[u8], headers: &mut ClientHeaders) -> bool {
        let Some(colon) = line.iter().position(|&b| b == b':') else {
            return true;
        };
        let name = line[..colon].trim_ascii();

        if name.eq_ignore_ascii_case(b"Host") && headers.host.is_none() {
            let value = String::from_utf8_lossy(&line[colon + 1..]).trim().to_string();
            if !value.is_empty() {
                headers.host = Some(value);
            }
        }

        !OVERRIDDEN
            .iter()
            .any(|&overridden| name.eq_ignore_ascii_case(overridden))
    }
}

impl Default for HeaderRewriter {
    fn default() -> Self {
        Self::new(
            InjectedHeaders::default(),
            crate::config::LimitsConfig::default().max_header_bytes,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::BufReader;

    const PREFIX: &str = "GET /foo.html HTTP/1.0\r\n\
        Host: example.com\r\n\
        User-Agent: Mozilla/5.0 (X11; Linux x86_64; rv:10.0.3) Gecko/20120305 Firefox/10.0.3\r\n\
        Connection: close\r\n\
        Proxy-Connection: close\r\n";

    async fn rewrite(client: &[u8]) -> String {
        let mut lines = LineReader::new(BufReader::new(client), 8192);
        let block = HeaderRewriter::default()
            .rewrite("/foo.html", "example.com", &mut lines)
            .await
            .unwrap();
        String::from_utf8(block).unwrap()
    }

    fn count(block: &str, name: &str) -> usize {
        block
            .lines()
            .filter(|line| {
                line.split_once(':')
                    .map(|(n, _)| n.trim().eq_ignore_ascii_case(name))
                    .unwrap_or(false)
            })
            .count()
    }

    #[tokio::test]
    async fn bare_sentinel_yields_only_injected_headers() {
        assert_eq!(rewrite(b"\r\n").await, format!("{PREFIX}\r\n"));
    }

    #[tokio::test]
    async fn passthrough_keeps_order_and_drops_overridden() {
        let client = b"Accept: */*\r\n\
            user-agent: curl/8.0\r\n\
            X-Trace: 1\r\n\
            CONNECTION: keep-alive\r\n\
            Proxy-Connection: keep-alive\r\n\
            Host: other.example\r\n\
            Connection-Id: 42\r\n\
            \r\n";
        let block = rewrite(client).await;
        assert_eq!(
            block,
            format!("{PREFIX}Accept: */*\r\nX-Trace: 1\r\nConnection-Id: 42\r\n\r\n")
        );
    }

    #[tokio::test]
    async fn rewriting_a_rewritten_block_never_duplicates() {
        let first = rewrite(b"Accept: text/html\r\nCookie: a=b\r\n\r\n").await;
        // Feed everything after the request line back in as client headers.
        let (_, headers) = first.split_once("\r\n").unwrap();
        let second = rewrite(headers.as_bytes()).await;

        assert_eq!(first, second);
        for name in ["Host", "User-Agent", "Connection", "Proxy-Connection"] {
            assert_eq!(count(&second, name), 1, "{name}");
        }
    }

    #[tokio::test]
    async fn stream_end_without_sentinel_still_terminates_block() {
        let block = rewrite(b"Accept: */*\r\nX-Partial: yes").await;
        assert_eq!(
            block,
            format!("{PREFIX}Accept: */*\r\nX-Partial: yes\r\n\r\n")
        );
    }

    #[tokio::test]
    async fn stops_at_sentinel_and_leaves_the_rest_unread() {
        let mut lines = LineReader::new(BufReader::new(&b"A: 1\r\n\r\nbody"[..]), 8192);
        let rewriter = HeaderRewriter::default();
        let headers = rewriter.read_client_headers(&mut lines).await.unwrap();
        assert!(headers.terminated());
        assert_eq!(headers.passthrough(), b"A: 1\r\n");

        let mut rest = Vec::new();
        lines.read_line(&mut rest).await.unwrap();
        assert_eq!(rest, b"body");
    }

    #[tokio::test]
    async fn records_first_client_host() {
        let mut lines = LineReader::new(
            BufReader::new(&b"Host:  localhost:8000 \r\nHost: second\r\n\r\n"[..]),
            8192,
        );
        let headers = HeaderRewriter::default()
            .read_client_headers(&mut lines)
            .await
            .unwrap();
        assert_eq!(headers.host(), Some("localhost:8000"));
        assert!(headers.passthrough().is_empty());
    }

    #[tokio::test]
    async fn long_overridden_header_is_dropped_in_every_piece() {
        let long_agent = format!("User-Agent: {}\r\n", "x".repeat(40));
        let client = format!("{long_agent}Accept: */*\r\n\r\n");
        let mut lines = LineReader::new(BufReader::new(client.as_bytes()), 16);
        let headers = HeaderRewriter::default()
            .read_client_headers(&mut lines)
            .await
            .unwrap();
        assert_eq!(headers.passthrough(), b"Accept: */*\r\n");
    }

    #[tokio::test]
    async fn oversized_header_section_is_rejected() {
        let rewriter = HeaderRewriter::new(InjectedHeaders::default(), 32);
        let client = b"X-One: aaaaaaaaaaaa\r\nX-Two: bbbbbbbbbbbb\r\n\r\n";
        let mut lines = LineReader::new(BufReader::new(&client[..]), 8192);
        let err = rewriter.read_client_headers(&mut lines).await.unwrap_err();
        assert!(matches!(err, ProxyError::HeadersTooLarge { limit: 32 }));
    }

    #[test]
    fn custom_injected_values_are_rendered() {
        let rewriter = HeaderRewriter::new(
            InjectedHeaders {
                user_agent: "probe/1.0".into(),
                connection: "close".into(),
                proxy_connection: "close".into(),
            },
            1024,
        );
        let block = rewriter.render("/", "h", &ClientHeaders::default());
        assert_eq!(
            block,
            b"GET / HTTP/1.0\r\nHost: h\r\nUser-Agent: probe/1.0\r\nConnection: close\r\nProxy-Connection: close\r\n\r\n"
        );
    }
}
