//! Client-facing socket.
//!
//! # Responsibilities
//! - Bind the configured interface and port
//! - Accept clients, at most `max_connections` being served at once
//!
//! A slot is taken before `accept` is called, so once the limit is reached
//! new clients wait in the kernel backlog until a relay finishes.

use std::fmt;
use std::net::SocketAddr;
use std::sync::Arc;

use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{OwnedSemaphorePermit, Semaphore};

use crate::config::ListenerConfig;

#[derive(Debug)]
pub enum ListenerError {
    /// The listening socket could not be set up.
    Bind(std::io::Error),
    /// A single `accept` failed; the listener itself is still usable.
    Accept(std::io::Error),
    /// The slot semaphore was closed.
    Closed,
}

impl fmt::Display for ListenerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ListenerError::Bind(e) => write!(f, "Failed to bind listener: {}", e),
            ListenerError::Accept(e) => write!(f, "Failed to accept client: {}", e),
            ListenerError::Closed => write!(f, "Client slots closed"),
        }
    }
}

impl std::error::Error for ListenerError {}

/// One accepted client and the slot it occupies.
#[derive(Debug)]
pub struct Accepted {
    pub stream: TcpStream,
    pub peer: SocketAddr,
    pub slot: ClientSlot,
}

/// Listener that serves a bounded number of clients at a time.
pub struct Listener {
    socket: TcpListener,
    slots: Arc<Semaphore>,
    max_connections: usize,
}

impl Listener {
    /// Bind `bind_host:port` from the configuration.
    pub async fn bind(config: &ListenerConfig) -> Result<Self, ListenerError> {
        let socket = TcpListener::bind(config.bind_address())
            .await
            .map_err(ListenerError::Bind)?;
        Self::from_tcp(socket, config.max_connections)
    }

    /// Use an already bound socket, e.g. one on an ephemeral port.
    pub fn from_tcp(socket: TcpListener, max_connections: usize) -> Result<Self, ListenerError> {
        let local = socket.local_addr().map_err(ListenerError::Bind)?;
        tracing::info!(address = %local, max_connections, "Listening for clients");

        Ok(Self {
            socket,
            slots: Arc::new(Semaphore::new(max_connections)),
            max_connections,
        })
    }

    /// Wait for a free slot, then for the next client.
    pub async fn accept(&self) -> Result<Accepted, ListenerError> {
        let permit = Arc::clone(&self.slots)
            .acquire_owned()
            .await
            .map_err(|_| ListenerError::Closed)?;

        let (stream, peer) = self.socket.accept().await.map_err(ListenerError::Accept)?;
        tracing::debug!(
            peer = %peer,
            free_slots = self.slots.available_permits(),
            "Client accepted"
        );

        Ok(Accepted {
            stream,
            peer,
            slot: ClientSlot { _permit: permit },
        })
    }

    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.socket.local_addr()
    }

    pub fn free_slots(&self) -> usize {
        self.slots.available_permits()
    }

    pub fn max_connections(&self) -> usize {
        self.max_connections
    }
}

/// Keeps one of the listener's slots busy until dropped, including when
/// the relay task panics.
#[derive(Debug)]
pub struct ClientSlot {
    _permit: OwnedSemaphorePermit,
}
