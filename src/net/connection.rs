//! Per-client bookkeeping.
//!
//! # Responsibilities
//! - Hand out a process-unique id for each accepted client (log correlation)
//! - Count relay tasks still running so shutdown can drain them

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Notify;

static NEXT_CLIENT_ID: AtomicU64 = AtomicU64::new(1);

/// Identifier attached to every log line of one client connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConnectionId(u64);

impl ConnectionId {
    pub fn next() -> Self {
        Self(NEXT_CLIENT_ID.fetch_add(1, Ordering::Relaxed))
    }

    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "conn-{}", self.0)
    }
}

#[derive(Debug, Default)]
struct Live {
    count: AtomicU64,
    idle: Notify,
}

/// Counts relay tasks in flight. Clones share the same count.
#[derive(Debug, Clone, Default)]
pub struct ConnectionTracker {
    live: Arc<Live>,
}

impl ConnectionTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a relay task; it stays counted until the guard drops.
    pub fn track(&self) -> ConnectionGuard {
        self.live.count.fetch_add(1, Ordering::SeqCst);
        ConnectionGuard {
            live: Arc::clone(&self.live),
            id: ConnectionId::next(),
        }
    }

    pub fn active_count(&self) -> u64 {
        self.live.count.load(Ordering::SeqCst)
    }

    /// Wait for the count to reach zero, giving up after `grace`.
    ///
    /// Returns false if relays were still running when the grace period ran out.
    pub async fn wait_for_idle(&self, grace: Duration) -> bool {
        let drained = async {
            loop {
                let notified = self.live.idle.notified();
                if self.active_count() == 0 {
                    return;
                }
                notified.await;
            }
        };
        tokio::time::timeout(grace, drained).await.is_ok()
    }
}

/// Held by a relay task for as long as its client is connected.
#[derive(Debug)]
pub struct ConnectionGuard {
    live: Arc<Live>,
    id: ConnectionId,
}

impl ConnectionGuard {
    pub fn id(&self) -> ConnectionId {
        self.id
    }
}

impl Drop for ConnectionGuard {
    fn drop(&mut self) {
        if self.live.count.fetch_sub(1, Ordering::SeqCst) == 1 {
            self.live.idle.notify_waiters();
        }
        tracing::trace!(connection_id = %self.id, "Client released");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_are_unique_and_labelled() {
        let a = ConnectionId::next();
        let b = ConnectionId::next();
        assert_ne!(a, b);
        assert!(b.as_u64() > a.as_u64());
        assert_eq!(a.to_string(), format!("conn-{}", a.as_u64()));
    }

    #[test]
    fn guards_drive_the_count() {
        let tracker = ConnectionTracker::new();
        let first = tracker.track();
        let second = tracker.clone().track();
        assert_eq!(tracker.active_count(), 2);

        drop(first);
        assert_eq!(tracker.active_count(), 1);
        drop(second);
        assert_eq!(tracker.active_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn wait_for_idle_respects_grace() {
        let tracker = ConnectionTracker::new();
        let guard = tracker.track();
        assert!(!tracker.wait_for_idle(Duration::from_millis(200)).await);

        let waiter = tracker.clone();
        let wait = tokio::spawn(async move { waiter.wait_for_idle(Duration::from_secs(5)).await });
        tokio::task::yield_now().await;
        drop(guard);
        assert!(wait.await.unwrap());
    }
}
