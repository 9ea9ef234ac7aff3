//! Prometheus metrics recorder and `/metrics` endpoint handler.

use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use tracing::info;

/// Install the Prometheus metrics recorder (global).
///
/// Returns the `PrometheusHandle` used to render the `/metrics` endpoint.
/// Must be called once at server startup before any metrics are recorded.
pub fn install_recorder() -> PrometheusHandle {
    let builder = PrometheusBuilder::new();
    let handle = builder
        .install_recorder()
        .expect("failed to install metrics recorder");
    info!("prometheus metrics recorder installed");
    handle
}

/// Render Prometheus text format from the installed recorder.
#[must_use]
pub fn render(handle: &PrometheusHandle) -> String {
    handle.render()
}

// Metric name constants to avoid typos across modules.

/// WebSocket connections opened total (counter).
pub const WS_CONNECTIONS_TOTAL: &str = "ws_connections_total";
/// WebSocket disconnections total (counter).
pub const WS_DISCONNECTIONS_TOTAL: &str = "ws_disconnections_total";
/// Active WebSocket connections (gauge).
pub const WS_CONNECTIONS_ACTIVE: &str = "ws_connections_active";
/// Connection lifetime seconds (histogram).
pub const WS_CONNECTION_DURATION_SECONDS: &str = "ws_connection_duration_seconds";
/// Frames dropped during broadcast fan-out (counter).
pub const WS_BROADCAST_DROPS_TOTAL: &str = "ws_broadcast_drops_total";
/// Domain events published (counter, labels: kind).
pub const EVENTS_PUBLISHED_TOTAL: &str = "events_published_total";
/// Snapshot cache hits (counter).
pub const SNAPSHOT_CACHE_HITS_TOTAL: &str = "snapshot_cache_hits_total";
/// Snapshot cache misses (counter).
pub const SNAPSHOT_CACHE_MISSES_TOTAL: &str = "snapshot_cache_misses_total";
/// Snapshot source failures (counter).
pub const SNAPSHOT_FETCH_ERRORS_TOTAL: &str = "snapshot_fetch_errors_total";
