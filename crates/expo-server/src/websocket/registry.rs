//! Authoritative bookkeeping of live connections per partition.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use dashmap::DashMap;
use expo_core::channel::Channel;
use expo_core::errors::RealtimeError;
use expo_core::events::EventFrame;
use expo_core::ids::{ConnectionId, TenantId};
use metrics::counter;
use tracing::{debug, warn};

use super::connection::ClientConnection;
use crate::metrics::WS_BROADCAST_DROPS_TOTAL;

/// The (tenant, channel[, scope]) grouping used for broadcast fan-out.
///
/// `scope` is the station qualifier for kitchen-display connections and the
/// location qualifier for table-view connections. Connections in the same
/// partition receive identical broadcast traffic.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct PartitionKey {
    /// Tenant boundary.
    pub tenant: TenantId,
    /// Functional channel.
    pub channel: Channel,
    /// Optional sub-key (station / location).
    pub scope: Option<String>,
}

impl PartitionKey {
    /// An unscoped partition for a (tenant, channel) pair.
    #[must_use]
    pub fn new(tenant: TenantId, channel: Channel) -> Self {
        Self {
            tenant,
            channel,
            scope: None,
        }
    }

    /// A partition with an optional station/location qualifier.
    #[must_use]
    pub fn scoped(tenant: TenantId, channel: Channel, scope: Option<String>) -> Self {
        Self {
            tenant,
            channel,
            scope,
        }
    }
}

/// Process-wide registry of live connections, partitioned per tenant and
/// channel.
///
/// Partitions are created lazily on first registration and torn down when
/// their last connection leaves — partition count stays proportional to
/// active tenants, which is an invariant, not an optimization. The
/// `DashMap` shards give per-partition locking: mutations on one partition
/// never serialize against unrelated partitions.
pub struct ConnectionRegistry {
    /// Live connections keyed by partition.
    partitions: DashMap<PartitionKey, HashMap<ConnectionId, Arc<ClientConnection>>>,
    /// Total registered connections (avoids locking for count queries).
    active_count: AtomicUsize,
}

impl ConnectionRegistry {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self {
            partitions: DashMap::new(),
            active_count: AtomicUsize::new(0),
        }
    }

    /// Add a connection to a partition, creating the partition if absent.
    ///
    /// Registering the same connection ID twice is a no-op — the first
    /// registration wins and the count is unchanged.
    pub fn register(&self, key: &PartitionKey, connection: Arc<ClientConnection>) {
        let mut partition = self.partitions.entry(key.clone()).or_default();
        if !partition.contains_key(&connection.id) {
            let _ = partition.insert(connection.id.clone(), connection);
            let _ = self.active_count.fetch_add(1, Ordering::Relaxed);
        }
    }

    /// Remove a connection from a partition.
    ///
    /// Safe to call for a connection that was never registered (no-op), so
    /// cleanup paths may race with registration failures. Removes the
    /// partition entry itself when it becomes empty.
    pub fn deregister(&self, key: &PartitionKey, connection_id: &ConnectionId) {
        let removed = {
            match self.partitions.get_mut(key) {
                Some(mut partition) => partition.remove(connection_id).is_some(),
                None => false,
            }
        };
        if removed {
            let _ = self.active_count.fetch_sub(1, Ordering::Relaxed);
        }
        // Tear down the partition if it is now empty; remove_if re-checks
        // under the shard lock so a concurrent register is not lost.
        let _ = self.partitions.remove_if(key, |_, partition| partition.is_empty());
    }

    /// Broadcast a frame to every connection currently in the partition.
    ///
    /// Returns the number of connections the send was attempted for. An
    /// unknown partition is a zero-recipient no-op. A failed enqueue never
    /// aborts delivery to the rest of the partition; failed connections are
    /// evicted and deregistered after the pass completes.
    pub fn broadcast(&self, key: &PartitionKey, frame: &EventFrame) -> usize {
        let json = match Self::serialize(frame) {
            Ok(json) => json,
            Err(error) => {
                warn!(kind = frame.kind(), %error, "dropping undeliverable frame");
                return 0;
            }
        };
        self.broadcast_serialized(key, &json)
    }

    /// Broadcast a frame to every partition of a (tenant, channel) pair,
    /// regardless of scope.
    ///
    /// Kitchen-display and table-view clients register under their
    /// station/location-qualified partitions; publishers deliver to all of
    /// them. Qualifiers group connections, they do not narrow delivery.
    pub fn broadcast_channel(
        &self,
        tenant: &TenantId,
        channel: Channel,
        frame: &EventFrame,
    ) -> usize {
        let json = match Self::serialize(frame) {
            Ok(json) => json,
            Err(error) => {
                warn!(kind = frame.kind(), %error, "dropping undeliverable frame");
                return 0;
            }
        };
        let keys: Vec<PartitionKey> = self
            .partitions
            .iter()
            .filter(|entry| entry.key().tenant == *tenant && entry.key().channel == channel)
            .map(|entry| entry.key().clone())
            .collect();
        keys.iter()
            .map(|key| self.broadcast_serialized(key, &json))
            .sum()
    }

    /// Number of connections currently registered in a partition.
    #[must_use]
    pub fn count(&self, key: &PartitionKey) -> usize {
        self.partitions.get(key).map_or(0, |p| p.len())
    }

    /// Total registered connections across all partitions.
    #[must_use]
    pub fn connection_count(&self) -> usize {
        self.active_count.load(Ordering::Relaxed)
    }

    /// Number of live (non-empty) partitions.
    #[must_use]
    pub fn partition_count(&self) -> usize {
        self.partitions.len()
    }

    /// Serialize a frame once for the whole fan-out pass.
    fn serialize(frame: &EventFrame) -> Result<Arc<String>, RealtimeError> {
        Ok(Arc::new(serde_json::to_string(frame)?))
    }

    /// Fan a pre-serialized frame out to one partition.
    fn broadcast_serialized(&self, key: &PartitionKey, json: &Arc<String>) -> usize {
        // Snapshot the recipient set so eviction never mutates while
        // iterating the live map.
        let recipients: Vec<Arc<ClientConnection>> = match self.partitions.get(key) {
            Some(partition) => partition.values().cloned().collect(),
            None => return 0,
        };

        let mut failed: Vec<Arc<ClientConnection>> = Vec::new();
        for connection in &recipients {
            if let Err(error) = connection.send(Arc::clone(json)) {
                counter!(WS_BROADCAST_DROPS_TOTAL).increment(1);
                debug!(%error, "failed to enqueue broadcast frame");
                failed.push(Arc::clone(connection));
            }
        }
        debug!(
            tenant = %key.tenant,
            channel = %key.channel,
            recipients = recipients.len(),
            failed = failed.len(),
            "broadcast frame"
        );

        for connection in failed {
            warn!(
                connection_id = %connection.id,
                tenant = %connection.tenant,
                "evicting connection after failed send"
            );
            connection.evict();
            self.deregister(key, &connection.id);
        }
        recipients.len()
    }
}

impl Default for ConnectionRegistry {
    fn default() -> Self {
        Self::new()
    }
}
