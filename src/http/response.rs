//! Proxy-generated error responses.
//!
//! # Responsibilities
//! - Render the small HTML error page sent when the proxy refuses a request
//! - Write the status line, Content-type and Content-length, then the body
//!
//! Only requests the proxy itself cannot serve end up here (unsupported
//! method, unusable target, oversized request line or headers, unreachable
//! origin). Responses from the origin are relayed untouched and never pass
//! through this module.

use tokio::io::{AsyncWrite, AsyncWriteExt};

/// An HTTP status the proxy answers with on its own behalf.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ErrorStatus {
    pub code: u16,
    pub reason: &'static str,
}

impl ErrorStatus {
    pub const BAD_REQUEST: Self = Self {
        code: 400,
        reason: "Bad Request",
    };
    pub const URI_TOO_LONG: Self = Self {
        code: 414,
        reason: "URI Too Long",
    };
    pub const HEADERS_TOO_LARGE: Self = Self {
        code: 431,
        reason: "Request Header Fields Too Large",
    };
    pub const NOT_IMPLEMENTED: Self = Self {
        code: 501,
        reason: "Not Implemented",
    };
    pub const BAD_GATEWAY: Self = Self {
        code: 502,
        reason: "Bad Gateway",
    };
}

/// Build the HTML body. `cause` is client-controlled and escaped.
pub fn error_body(cause: &str, status: ErrorStatus, long_message: &str) -> String {
    format!(
        "<html><title>Proxy Error</title><body bgcolor=\"ffffff\">\r\n\
         {}: {}\r\n\
         <p>{}: {}\r\n\
         <hr><em>The forward proxy</em>\r\n",
        status.code,
        status.reason,
        html_escape::encode_text(long_message),
        html_escape::encode_text(cause),
    )
}

/// Write a complete error response to `conn`.
///
/// The three header lines go out before the body, followed by a flush so
/// the client sees the page before the connection is closed.
pub async fn respond_error<W>(
    conn: &mut W,
    cause: &str,
    status: ErrorStatus,
    long_message: &str,
) -> std::io::Result<()>
where
    W: AsyncWrite + Unpin,
{
    let body = error_body(cause, status, long_message);
    let head = format!(
        "HTTP/1.0 {} {}\r\nContent-type: text/html\r\nContent-length: {}\r\n\r\n",
        status.code,
        status.reason,
        body.len()
    );

    conn.write_all(head.as_bytes()).await?;
    conn.write_all(body.as_bytes()).await?;
    conn.flush().await
}
