//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! relay tasks, accept loop, startup
//!     → logging.rs (tracing events, one span per connection)
//!     → metrics.rs (counters, gauges, histograms)
//!
//! Consumers:
//!     → stdout (fmt layer)
//!     → Prometheus scrape (optional)
//! ```

pub mod logging;
pub mod metrics;
