//! Optional deadlines around blocking socket operations.
//!
//! # Responsibilities
//! - Wrap upstream connects and individual line reads with a deadline
//! - Leave the operation unbounded when no deadline is configured
//!
//! Without configuration the relay blocks indefinitely on a stalled peer,
//! matching the one-shot blocking pipeline.

use std::future::Future;
use std::time::Duration;

use crate::error::ProxyError;

/// Run `fut`, failing with [`ProxyError::Timeout`] if `deadline` elapses first.
pub async fn with_deadline<F, T, E>(
    deadline: Option<Duration>,
    operation: &'static str,
    fut: F,
) -> Result<T, ProxyError>
where
    F: Future<Output = Result<T, E>>,
    E: Into<ProxyError>,
{
    match deadline {
        Some(after) => match tokio::time::timeout(after, fut).await {
            Ok(result) => result.map_err(Into::into),
            Err(_) => Err(ProxyError::Timeout { operation, after }),
        },
        None => fut.await.map_err(Into::into),
    }
}
