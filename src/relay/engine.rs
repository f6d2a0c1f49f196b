//! One request, start to finish.
//!
//! # Responsibilities
//! - Read and validate the request line
//! - Resolve the origin from the target (or the client's Host header)
//! - Send the rewritten request upstream in a single write
//! - Stream the origin's response back line by line until EOF
//!
//! The pipeline is strictly sequential and owns both streams; they are
//! closed when [`handle`] returns, on every path.

use std::time::Duration;

use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt, BufReader};

use crate::config::ProxyConfig;
use crate::error::ProxyError;
use crate::http::headers::{ClientHeaders, HeaderRewriter, InjectedHeaders};
use crate::http::request::RequestLine;
use crate::http::response::{respond_error, ErrorStatus};
use crate::http::uri::{parse_authority, parse_target, ParsedTarget};
use crate::net::line::LineReader;
use crate::net::upstream::Connector;

/// Per-process settings shared by every relay invocation.
#[derive(Debug, Clone)]
pub struct RelayContext {
    rewriter: HeaderRewriter,
    max_line: usize,
    idle_timeout: Option<Duration>,
}

impl RelayContext {
    pub fn new(rewriter: HeaderRewriter, max_line: usize, idle_timeout: Option<Duration>) -> Self {
        Self {
            rewriter,
            max_line,
            idle_timeout,
        }
    }

    pub fn from_config(config: &ProxyConfig) -> Self {
        Self::new(
            HeaderRewriter::new(
                InjectedHeaders::from(&config.headers),
                config.limits.max_header_bytes,
            ),
            config.limits.max_line_bytes,
            config.timeouts.idle(),
        )
    }
}

impl Default for RelayContext {
    fn default() -> Self {
        Self::from_config(&ProxyConfig::default())
    }
}

/// What a relay invocation did with its connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelayOutcome {
    /// The origin's response was relayed; `bytes` were sent to the client.
    Relayed { bytes: u64 },
    /// The proxy answered with its own error page.
    Rejected { status: u16 },
    /// No usable request line arrived; nothing was sent.
    Aborted,
}

impl RelayOutcome {
    pub fn label(&self) -> &'static str {
        match self {
            RelayOutcome::Relayed { .. } => "relayed",
            RelayOutcome::Rejected { .. } => "rejected",
            RelayOutcome::Aborted => "aborted",
        }
    }

    /// Status the proxy itself answered with, 0 when it answered nothing.
    pub fn status(&self) -> u16 {
        match self {
            RelayOutcome::Rejected { status } => *status,
            _ => 0,
        }
    }
}

/// Relay a single client request to its origin.
///
/// Upstream connect failures are answered with `502 Bad Gateway` and then
/// returned as errors; there are no retries.
pub async fn handle<C, K>(
    client: C,
    connector: &K,
    ctx: &RelayContext,
) -> Result<RelayOutcome, ProxyError>
where
    C: AsyncRead + AsyncWrite + Unpin,
    K: Connector,
{
    let mut client =
        LineReader::new(BufReader::new(client), ctx.max_line).with_idle_timeout(ctx.idle_timeout);
    let mut line = Vec::with_capacity(256);

    let n = client.read_line(&mut line).await?;
    if n == client.max_line() && !line.ends_with(b"\n") {
        let method = line.split(u8::is_ascii_whitespace).next().unwrap_or_default();
        let method = String::from_utf8_lossy(method).into_owned();
        tracing::info!(limit = n, "Request line too long");
        return reject(
            &mut client,
            &method,
            ErrorStatus::URI_TOO_LONG,
            "Request line exceeds the proxy limit",
        )
        .await;
    }
    if n == 0 || !line.ends_with(b"\n") {
        tracing::debug!(bytes = n, "Client closed before a complete request line");
        return Ok(RelayOutcome::Aborted);
    }

    let text = match std::str::from_utf8(&line) {
        Ok(text) => text.to_string(),
        Err(e) => {
            tracing::info!(error = %e, "Request line is not valid UTF-8");
            return reject(
                &mut client,
                "request line",
                ErrorStatus::BAD_REQUEST,
                "Request line is not valid UTF-8",
            )
            .await;
        }
    };
    let Some(request) = RequestLine::parse(&text) else {
        tracing::debug!("Blank request line");
        return Ok(RelayOutcome::Aborted);
    };
    tracing::debug!(request_line = %text.trim_end(), "Request received");

    if !request.is_supported_method() {
        tracing::info!(method = %request.method, "Unsupported method");
        return reject(
            &mut client,
            &request.method,
            ErrorStatus::NOT_IMPLEMENTED,
            "Proxy does not implement this method",
        )
        .await;
    }

    let Some(target) = request.target.as_deref() else {
        tracing::debug!("Request line has no target");
        return Ok(RelayOutcome::Aborted);
    };

    let parsed = match parse_target(target) {
        Ok(parsed) => parsed,
        Err(e) => {
            tracing::info!(target = %target, error = %e, "Unusable request target");
            return reject(
                &mut client,
                target,
                ErrorStatus::BAD_REQUEST,
                "Proxy could not parse the request target",
            )
            .await;
        }
    };

    let headers = match ctx.rewriter.read_client_headers(&mut client).await {
        Ok(headers) => headers,
        Err(ProxyError::HeadersTooLarge { limit }) => {
            tracing::info!(limit, "Client headers too large");
            return reject(
                &mut client,
                target,
                ErrorStatus::HEADERS_TOO_LARGE,
                "Request headers exceed the proxy limit",
            )
            .await;
        }
        Err(e) => return Err(e),
    };

    let (hostname, port) = match resolve_origin(&parsed, &headers) {
        Ok(origin) => origin,
        Err(e) => {
            tracing::info!(target = %target, error = %e, "No origin host in request");
            return reject(
                &mut client,
                target,
                ErrorStatus::BAD_REQUEST,
                "Request does not name an origin host",
            )
            .await;
        }
    };
    tracing::debug!(hostname = %hostname, port, path = %parsed.path, "Parsed request target");

    let block = ctx.rewriter.render(&parsed.path, &hostname, &headers);

    let upstream = match connector.connect(&hostname, port).await {
        Ok(stream) => stream,
        Err(e) => {
            tracing::warn!(hostname = %hostname, port, error = %e, "Upstream connect failed");
            let cause = format!("{}:{}", hostname, port);
            if let Err(write_err) = respond_error(
                client.get_mut(),
                &cause,
                ErrorStatus::BAD_GATEWAY,
                "Proxy could not reach the origin server",
            )
            .await
            {
                tracing::debug!(error = %write_err, "Failed to send 502 to client");
            }
            return Err(e);
        }
    };

    let mut upstream =
        LineReader::new(BufReader::new(upstream), ctx.max_line).with_idle_timeout(ctx.idle_timeout);
    upstream.get_mut().write_all(&block).await?;
    upstream.get_mut().flush().await?;
    tracing::trace!(bytes = block.len(), "Request forwarded");

    let mut relayed = 0u64;
    loop {
        let n = upstream.read_line(&mut line).await?;
        if n == 0 {
            break;
        }
        client.get_mut().write_all(&line).await?;
        relayed += n as u64;
        tracing::trace!(bytes = n, "Relayed response chunk");
    }
    client.get_mut().flush().await?;

    Ok(RelayOutcome::Relayed { bytes: relayed })
}

/// Pick the origin: the target's host, or the client's Host header for
/// origin-form targets.
fn resolve_origin(
    parsed: &ParsedTarget,
    headers: &ClientHeaders,
) -> Result<(String, u16), ProxyError> {
    if !parsed.is_relative() {
        return Ok((parsed.hostname.clone(), parsed.port));
    }

    let host = headers.host().ok_or(ProxyError::MissingHost)?;
    let (hostname, port) = parse_authority(host)?;
    if hostname.is_empty() {
        return Err(ProxyError::MissingHost);
    }
    Ok((hostname, port))
}

async fn reject<R>(
    client: &mut LineReader<R>,
    cause: &str,
    status: ErrorStatus,
    long_message: &str,
) -> Result<RelayOutcome, ProxyError>
where
    R: tokio::io::AsyncBufRead + AsyncWrite + Unpin,
{
    respond_error(client.get_mut(), cause, status, long_message).await?;
    Ok(RelayOutcome::Rejected {
        status: status.code,
    })
}
