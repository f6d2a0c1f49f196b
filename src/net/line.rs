//! Bounded line reading.
//!
//! # Responsibilities
//! - Read one `\n`-terminated line into a reusable buffer
//! - Never buffer more than the configured line bound per call
//! - Apply the optional idle deadline to each read
//!
//! A line longer than the bound is returned in bound-sized pieces, in
//! order, so byte-exact relaying still holds; only the first piece of such a
//! line lacks its terminator.

use std::time::Duration;

use tokio::io::{AsyncBufRead, AsyncBufReadExt};

use crate::error::ProxyError;
use crate::resilience::timeouts::with_deadline;

/// Default line bound, matching the classic `MAXLINE` of 8 KiB.
pub const DEFAULT_MAX_LINE: usize = 8192;

/// Reads lines from a buffered stream without unbounded growth.
#[derive(Debug)]
pub struct LineReader<R> {
    inner: R,
    max_line: usize,
    idle_timeout: Option<Duration>,
}

impl<R> LineReader<R>
where
    R: AsyncBufRead + Unpin,
{
    /// Wrap `inner`, returning at most `max_line` bytes per read.
    pub fn new(inner: R, max_line: usize) -> Self {
        Self {
            inner,
            max_line: max_line.max(1),
            idle_timeout: None,
        }
    }

    /// Fail a read that makes no progress within `timeout`.
    pub fn with_idle_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.idle_timeout = timeout;
        self
    }

    /// Read the next line (terminator included) into `buf`, replacing its
    /// contents. Returns the number of bytes read; zero means end of stream.
    pub async fn read_line(&mut self, buf: &mut Vec<u8>) -> Result<usize, ProxyError> {
        buf.clear();
        let max_line = self.max_line;
        let inner = &mut self.inner;
        with_deadline(
            self.idle_timeout,
            "line read",
            read_bounded(inner, buf, max_line),
        )
        .await
    }

    /// Configured line bound.
    pub fn max_line(&self) -> usize {
        self.max_line
    }

    /// Access the wrapped stream, e.g. to write a response on a duplex socket.
    pub fn get_mut(&mut self) -> &mut R {
        &mut self.inner
    }

    /// Unwrap the stream.
    pub fn into_inner(self) -> R {
        self.inner
    }
}

async fn read_bounded<R>(reader: &mut R, buf: &mut Vec<u8>, max_line: usize) -> std::io::Result<usize>
where
    R: AsyncBufRead + Unpin,
{
    while buf.len() < max_line {
        let (used, complete) = {
            let available = reader.fill_buf().await?;
            if available.is_empty() {
                break;
            }
            let room = max_line - buf.len();
            let window = &available[..available.len().min(room)];
            match window.iter().position(|&b| b == b'\n') {
                Some(idx) => {
                    buf.extend_from_slice(&window[..=idx]);
                    (idx + 1, true)
                }
                None => {
                    buf.extend_from_slice(window);
                    (window.len(), false)
                }
            }
        };
        reader.consume(used);
        if complete {
            break;
        }
    }
    Ok(buf.len())
}
