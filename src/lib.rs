//! HTTP/1.0 forwarding proxy library.

pub mod config;
pub mod error;
pub mod http;
pub mod lifecycle;
pub mod net;
pub mod observability;
pub mod relay;
pub mod resilience;

pub use config::schema::ProxyConfig;
pub use error::ProxyError;
pub use lifecycle::Shutdown;
pub use relay::{ProxyServer, RelayOutcome};
