//! Resilience subsystem.
//!
//! # Data Flow
//! ```text
//! Upstream connect / each line read:
//!     → timeouts.rs (optional deadline)
//!     → on expiry: ProxyError::Timeout, connection closed
//! ```
//!
//! There are no retries: a GET is forwarded to its origin exactly once.

pub mod timeouts;
