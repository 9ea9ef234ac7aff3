//! Per-connection state for a live WebSocket client.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use expo_core::channel::Channel;
use expo_core::errors::RealtimeError;
use expo_core::ids::{ConnectionId, TenantId};
use parking_lot::Mutex;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tokio_util::sync::CancellationToken;

/// A connected client.
///
/// Exclusively owned by its session task; the registry holds `Arc`
/// references that never outlive the session's cleanup. All outgoing
/// traffic — broadcasts, pongs, heartbeats — funnels through the bounded
/// send queue so exactly one task (the session's writer) touches the
/// underlying socket.
pub struct ClientConnection {
    /// Process-unique connection ID.
    pub id: ConnectionId,
    /// Tenant this connection is scoped to.
    pub tenant: TenantId,
    /// Functional channel kind.
    pub channel: Channel,
    /// Station (kitchen-display) or location (table-view) qualifier.
    pub scope: Option<String>,
    /// Send queue feeding the session's writer task.
    tx: mpsc::Sender<Arc<String>>,
    /// When this connection was established.
    pub connected_at: Instant,
    /// Count of frames dropped due to a full or closed queue.
    dropped_messages: AtomicU64,
    /// Set when the registry evicts the connection; the session exits on it.
    evicted: CancellationToken,
    /// Event kinds the client declared interest in. Recorded but never
    /// used to narrow delivery.
    subscriptions: Mutex<Vec<String>>,
}

impl ClientConnection {
    /// Create a new connection.
    #[must_use]
    pub fn new(
        id: ConnectionId,
        tenant: TenantId,
        channel: Channel,
        scope: Option<String>,
        tx: mpsc::Sender<Arc<String>>,
    ) -> Self {
        Self {
            id,
            tenant,
            channel,
            scope,
            tx,
            connected_at: Instant::now(),
            dropped_messages: AtomicU64::new(0),
            evicted: CancellationToken::new(),
            subscriptions: Mutex::new(Vec::new()),
        }
    }

    /// Enqueue a serialized frame for delivery.
    ///
    /// Reports whether the queue was full or closed and increments the
    /// dropped-frame counter on failure. Never blocks.
    pub fn send(&self, frame: Arc<String>) -> Result<(), RealtimeError> {
        match self.tx.try_send(frame) {
            Ok(()) => Ok(()),
            Err(error) => {
                let _ = self.dropped_messages.fetch_add(1, Ordering::Relaxed);
                Err(match error {
                    TrySendError::Full(_) => RealtimeError::QueueFull {
                        connection_id: self.id.to_string(),
                    },
                    TrySendError::Closed(_) => RealtimeError::QueueClosed {
                        connection_id: self.id.to_string(),
                    },
                })
            }
        }
    }

    /// Total frames dropped for this connection.
    #[must_use]
    pub fn drop_count(&self) -> u64 {
        self.dropped_messages.load(Ordering::Relaxed)
    }

    /// Mark the connection as evicted by the registry.
    ///
    /// Idempotent. The session task observes this and tears down.
    pub fn evict(&self) {
        self.evicted.cancel();
    }

    /// Whether the registry has evicted this connection.
    #[must_use]
    pub fn is_evicted(&self) -> bool {
        self.evicted.is_cancelled()
    }

    /// Token the session selects on to observe eviction.
    #[must_use]
    pub fn eviction_token(&self) -> CancellationToken {
        self.evicted.clone()
    }

    /// Record the client's declared event interests.
    pub fn set_subscriptions(&self, events: Vec<String>) {
        *self.subscriptions.lock() = events;
    }

    /// Event kinds the client declared interest in.
    #[must_use]
    pub fn subscriptions(&self) -> Vec<String> {
        self.subscriptions.lock().clone()
    }

    /// Connection age.
    #[must_use]
    pub fn age(&self) -> Duration {
        self.connected_at.elapsed()
    }
}
