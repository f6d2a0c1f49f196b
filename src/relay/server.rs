//! Accept loop.
//!
//! # Responsibilities
//! - Accept clients from the bounded listener
//! - Run one relay task per connection with its own tracing span
//! - Record per-connection metrics
//! - Stop accepting on shutdown and drain live connections

use std::sync::Arc;
use std::time::Instant;

use tokio::sync::broadcast;
use tracing::Instrument;

use crate::config::ProxyConfig;
use crate::net::connection::ConnectionTracker;
use crate::net::listener::{Accepted, Listener, ListenerError};
use crate::net::upstream::{Connector, TcpConnector};
use crate::observability::metrics;
use crate::relay::engine::{self, RelayContext, RelayOutcome};

/// The forward proxy server.
pub struct ProxyServer<K = TcpConnector> {
    config: ProxyConfig,
    context: Arc<RelayContext>,
    connector: Arc<K>,
    tracker: ConnectionTracker,
}

impl ProxyServer<TcpConnector> {
    /// Create a server that connects to origins over plain TCP.
    pub fn new(config: ProxyConfig) -> Self {
        let connector = TcpConnector::new(config.timeouts.connect());
        Self::with_connector(config, connector)
    }
}

impl<K> ProxyServer<K>
where
    K: Connector + 'static,
{
    /// Create a server with a custom upstream connector.
    pub fn with_connector(config: ProxyConfig, connector: K) -> Self {
        Self {
            context: Arc::new(RelayContext::from_config(&config)),
            connector: Arc::new(connector),
            tracker: ConnectionTracker::new(),
            config,
        }
    }

    /// Live connection counter, shared with the relay tasks.
    pub fn tracker(&self) -> &ConnectionTracker {
        &self.tracker
    }

    /// Accept connections until `shutdown` fires, then wait up to the
    /// configured grace period for in-flight relays.
    pub async fn run(
        self,
        listener: Listener,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), ListenerError> {
        let addr = listener.local_addr().map_err(ListenerError::Bind)?;
        tracing::info!(address = %addr, "Proxy server accepting connections");

        loop {
            tokio::select! {
                accepted = listener.accept() => match accepted {
                    Ok(client) => self.spawn_relay(client),
                    Err(ListenerError::Accept(e)) => {
                        tracing::warn!(error = %e, "Accept failed");
                    }
                    Err(e) => return Err(e),
                },
                _ = shutdown.recv() => {
                    tracing::info!("Shutdown signal received, no longer accepting");
                    break;
                }
            }
        }

        let grace = self.config.timeouts.shutdown_grace();
        let remaining = self.tracker.active_count();
        if remaining > 0 {
            tracing::info!(connections = remaining, grace = ?grace, "Draining connections");
        }
        if !self.tracker.wait_for_idle(grace).await {
            tracing::warn!(
                connections = self.tracker.active_count(),
                "Grace period elapsed with connections still open"
            );
        }

        tracing::info!("Proxy server stopped");
        Ok(())
    }

    fn spawn_relay(&self, client: Accepted) {
        let Accepted { stream, peer, slot } = client;
        let guard = self.tracker.track();
        let span = tracing::info_span!("connection", id = %guard.id(), peer = %peer);
        let context = Arc::clone(&self.context);
        let connector = Arc::clone(&self.connector);

        let relay = async move {
            let _slot = slot;
            let _guard = guard;
            let started = Instant::now();
            metrics::record_connection_opened();
            tracing::info!("Accepted connection");

            match engine::handle(stream, connector.as_ref(), &context).await {
                Ok(outcome) => {
                    if let RelayOutcome::Relayed { bytes } = outcome {
                        metrics::record_relayed_bytes(bytes);
                        tracing::info!(bytes, "Response relayed");
                    } else {
                        tracing::info!(outcome = outcome.label(), status = outcome.status(), "Connection finished");
                    }
                    metrics::record_request(outcome.label(), outcome.status(), started);
                }
                Err(e) => {
                    tracing::warn!(error = %e, kind = e.kind(), "Relay failed");
                    metrics::record_error(e.kind());
                    metrics::record_request("error", 0, started);
                }
            }

            metrics::record_connection_closed();
        };

        tokio::spawn(relay.instrument(span));
    }
}
