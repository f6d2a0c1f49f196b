//! Relay subsystem.
//!
//! # Data Flow
//! ```text
//! server.rs (accept loop, one task per client)
//!     → engine.rs
//!         read request line → reject non-GET (501)
//!         → parse target → drain & rewrite headers
//!         → connect upstream (502 on failure)
//!         → write request block → relay response lines until EOF
//!     → both sockets closed, outcome logged and counted
//! ```

pub mod engine;
pub mod server;

pub use engine::{handle, RelayContext, RelayOutcome};
pub use server::ProxyServer;
