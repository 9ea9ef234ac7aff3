//! Error hierarchy for the realtime layer.
//!
//! Built on [`thiserror`]. Nothing here is fatal to the server process:
//! every failure is scoped to a single connection or a single tenant's
//! cache entry.

use thiserror::Error;

/// Failure computing an aggregated metrics snapshot.
///
/// Raised by the external aggregation collaborator. The cache degrades to
/// stale-or-zeroed data instead of surfacing this to connecting clients.
#[derive(Debug, Error)]
pub enum SnapshotError {
    /// The aggregation query itself failed.
    #[error("aggregation query failed: {message}")]
    Query {
        /// Human-readable failure description.
        message: String,
        /// Underlying error, when available.
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },
    /// The backing store could not be reached.
    #[error("aggregation backend unavailable: {0}")]
    Unavailable(String),
}

impl SnapshotError {
    /// Create a query error from a message.
    #[must_use]
    pub fn query(message: impl Into<String>) -> Self {
        Self::Query {
            message: message.into(),
            source: None,
        }
    }
}

/// Failure on the event delivery path.
///
/// These are recovered locally: a send failure evicts the one affected
/// connection and is never propagated to producers or other connections.
#[derive(Debug, Error)]
pub enum RealtimeError {
    /// Event could not be serialized for the wire.
    #[error("event serialization failed: {0}")]
    Serialize(#[from] serde_json::Error),
    /// The connection's send queue is full.
    #[error("send queue full for connection {connection_id}")]
    QueueFull {
        /// The affected connection.
        connection_id: String,
    },
    /// The connection's send queue is closed (peer gone).
    #[error("send queue closed for connection {connection_id}")]
    QueueClosed {
        /// The affected connection.
        connection_id: String,
    },
}
