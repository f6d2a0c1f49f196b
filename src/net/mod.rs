//! Network layer subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming TCP connection
//!     → listener.rs (accept loop, connection limits)
//!     → connection.rs (connection id, live-connection tracking)
//!     → Hand off to the relay engine
//!
//! Relay engine
//!     → line.rs (bounded line reads on both sockets)
//!     → upstream.rs (connect to origin)
//! ```

pub mod connection;
pub mod line;
pub mod listener;
pub mod upstream;

pub use line::LineReader;
pub use upstream::{Connector, TcpConnector};
