//! Per-tenant cache of aggregated dashboard snapshots.
//!
//! Connect-time snapshots would otherwise hit the aggregation backend once
//! per connection; a short TTL keeps a reconnect storm at one backend query
//! per tenant per window. Staleness within the TTL is acceptable because
//! every subsequent change arrives as its own event.

use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use dashmap::DashMap;
use expo_core::errors::SnapshotError;
use expo_core::ids::TenantId;
use expo_core::snapshot::MetricsSnapshot;
use metrics::counter;
use tokio::sync::Mutex;
use tracing::{debug, warn};

use crate::metrics::{
    SNAPSHOT_CACHE_HITS_TOTAL, SNAPSHOT_CACHE_MISSES_TOTAL, SNAPSHOT_FETCH_ERRORS_TOTAL,
};

/// Default freshness window for cached snapshots.
pub const DEFAULT_SNAPSHOT_TTL: Duration = Duration::from_secs(5);

/// Computes a tenant's aggregated snapshot from the backing store.
///
/// The cache is the only caller; implementations may be arbitrarily slow or
/// flaky and the realtime layer degrades instead of failing.
#[async_trait]
pub trait SnapshotSource: Send + Sync {
    /// Compute the current snapshot for a tenant.
    async fn fetch(&self, tenant: &TenantId) -> Result<MetricsSnapshot, SnapshotError>;
}

/// Source that always reports a zeroed snapshot.
///
/// Stands in until a real aggregation backend is wired up; clients still
/// get a well-formed `connected` frame.
pub struct ZeroSnapshotSource;

#[async_trait]
impl SnapshotSource for ZeroSnapshotSource {
    async fn fetch(&self, _tenant: &TenantId) -> Result<MetricsSnapshot, SnapshotError> {
        Ok(MetricsSnapshot::default())
    }
}

struct CacheEntry {
    snapshot: MetricsSnapshot,
    fetched_at: Instant,
}

/// TTL cache over a [`SnapshotSource`], one entry per tenant.
///
/// Concurrent misses for the same tenant are collapsed into a single source
/// fetch; other tenants' fetches proceed in parallel. Source failures are
/// never cached — the next request retries. Expired entries are kept past
/// the TTL so a later source failure can degrade to the last known
/// snapshot; [`MetricsCache::invalidate`] is the only removal path, so the
/// entry map is bounded by tenant cardinality. Flight locks are removed
/// once their fetch completes and no other task holds them.
pub struct MetricsCache {
    source: Arc<dyn SnapshotSource>,
    ttl: Duration,
    entries: DashMap<TenantId, CacheEntry>,
    /// Per-tenant fetch locks for single-flight misses.
    flights: DashMap<TenantId, Arc<Mutex<()>>>,
}

impl MetricsCache {
    /// Create a cache with the given freshness window.
    #[must_use]
    pub fn new(source: Arc<dyn SnapshotSource>, ttl: Duration) -> Self {
        Self {
            source,
            ttl,
            entries: DashMap::new(),
            flights: DashMap::new(),
        }
    }

    /// Get the tenant's snapshot, fetching from the source if the cached
    /// entry is missing or older than the TTL.
    ///
    /// Never fails: on a source error this returns the stale cached
    /// snapshot when one exists, otherwise a zeroed snapshot. The failure
    /// itself is not cached.
    pub async fn get(&self, tenant: &TenantId) -> MetricsSnapshot {
        if let Some(snapshot) = self.fresh(tenant) {
            counter!(SNAPSHOT_CACHE_HITS_TOTAL).increment(1);
            return snapshot;
        }

        // Clone the flight lock out before awaiting so no shard guard is
        // held across the await point.
        let flight = {
            self.flights
                .entry(tenant.clone())
                .or_insert_with(|| Arc::new(Mutex::new(())))
                .clone()
        };

        let snapshot = {
            let _guard = flight.lock().await;

            // A concurrent fetch may have landed while we waited.
            if let Some(snapshot) = self.fresh(tenant) {
                counter!(SNAPSHOT_CACHE_HITS_TOTAL).increment(1);
                snapshot
            } else {
                counter!(SNAPSHOT_CACHE_MISSES_TOTAL).increment(1);
                match self.source.fetch(tenant).await {
                    Ok(snapshot) => {
                        debug!(%tenant, "refreshed metrics snapshot");
                        let _ = self.entries.insert(
                            tenant.clone(),
                            CacheEntry {
                                snapshot,
                                fetched_at: Instant::now(),
                            },
                        );
                        snapshot
                    }
                    Err(error) => {
                        counter!(SNAPSHOT_FETCH_ERRORS_TOTAL).increment(1);
                        warn!(%tenant, %error, "snapshot fetch failed, serving degraded data");
                        self.entries
                            .get(tenant)
                            .map_or_else(MetricsSnapshot::default, |entry| entry.snapshot)
                    }
                }
            }
        };

        drop(flight);
        // Tear the flight lock down unless another task is still using it;
        // remove_if re-checks under the shard lock, and new clones are only
        // taken under that same lock, so the count cannot race upward.
        let _ = self
            .flights
            .remove_if(tenant, |_, lock| Arc::strong_count(lock) == 1);
        snapshot
    }

    /// Drop the tenant's cached entry so the next request refetches.
    pub fn invalidate(&self, tenant: &TenantId) {
        let _ = self.entries.remove(tenant);
    }

    /// Number of tenants with a cached entry (fresh or stale).
    #[must_use]
    pub fn cached_tenants(&self) -> usize {
        self.entries.len()
    }

    /// Number of tenants with a live flight lock (fetch in progress or
    /// about to be cleaned up).
    #[must_use]
    pub fn inflight_tenants(&self) -> usize {
        self.flights.len()
    }

    fn fresh(&self, tenant: &TenantId) -> Option<MetricsSnapshot> {
        self.entries.get(tenant).and_then(|entry| {
            (entry.fetched_at.elapsed() < self.ttl).then_some(entry.snapshot)
        })
    }
}
