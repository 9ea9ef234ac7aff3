//! `ExpoServer` — Axum HTTP + WebSocket server.

use std::sync::Arc;
use std::time::Instant;

use axum::Router;
use axum::extract::ws::WebSocketUpgrade;
use axum::extract::{Path, Query, State};
use axum::response::{IntoResponse, Json};
use axum::routing::get;
use expo_core::channel::Channel;
use expo_core::ids::{LocationId, StationId, TenantId};
use metrics_exporter_prometheus::PrometheusHandle;
use serde::Deserialize;
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::config::ServerConfig;
use crate::health::{self, HealthResponse};
use crate::shutdown::ShutdownCoordinator;
use crate::websocket::metrics_cache::{MetricsCache, SnapshotSource};
use crate::websocket::publisher::EventPublisher;
use crate::websocket::registry::ConnectionRegistry;
use crate::websocket::session::{SessionSettings, run_ws_session};

/// Shared state accessible from Axum handlers.
#[derive(Clone)]
pub struct AppState {
    /// Connection registry for fan-out and counts.
    pub registry: Arc<ConnectionRegistry>,
    /// Snapshot cache consulted on connect.
    pub snapshots: Arc<MetricsCache>,
    /// Per-session tunables.
    pub settings: SessionSettings,
    /// Shutdown coordinator.
    pub shutdown: Arc<ShutdownCoordinator>,
    /// When the server started.
    pub start_time: Instant,
    /// Prometheus render handle, when the recorder is installed.
    pub metrics_handle: Option<PrometheusHandle>,
}

/// The realtime dashboard server.
pub struct ExpoServer {
    config: ServerConfig,
    registry: Arc<ConnectionRegistry>,
    publisher: EventPublisher,
    snapshots: Arc<MetricsCache>,
    shutdown: Arc<ShutdownCoordinator>,
    metrics_handle: Option<PrometheusHandle>,
    start_time: Instant,
}

impl ExpoServer {
    /// Create a new server over a snapshot source.
    #[must_use]
    pub fn new(config: ServerConfig, source: Arc<dyn SnapshotSource>) -> Self {
        let registry = Arc::new(ConnectionRegistry::new());
        let snapshots = Arc::new(MetricsCache::new(source, config.snapshot_ttl()));
        Self {
            publisher: EventPublisher::new(Arc::clone(&registry)),
            registry,
            snapshots,
            shutdown: Arc::new(ShutdownCoordinator::new()),
            metrics_handle: None,
            start_time: Instant::now(),
            config,
        }
    }

    /// Attach the Prometheus handle backing `/metrics`.
    #[must_use]
    pub fn with_metrics_handle(mut self, handle: PrometheusHandle) -> Self {
        self.metrics_handle = Some(handle);
        self
    }

    /// Build the Axum router with all routes.
    pub fn router(&self) -> Router {
        let state = AppState {
            registry: Arc::clone(&self.registry),
            snapshots: Arc::clone(&self.snapshots),
            settings: self.config.session_settings(),
            shutdown: Arc::clone(&self.shutdown),
            start_time: self.start_time,
            metrics_handle: self.metrics_handle.clone(),
        };

        Router::new()
            .route("/api/v1/ws/dashboard/{tenant}", get(ws_dashboard))
            .route("/api/v1/ws/kds/{tenant}", get(ws_kds))
            .route("/api/v1/ws/tables/{tenant}", get(ws_tables))
            .route("/health", get(health_handler))
            .route("/metrics", get(metrics_handler))
            .layer(TraceLayer::new_for_http())
            .with_state(state)
    }

    /// Bind and serve until shutdown is signalled.
    pub async fn serve(&self) -> anyhow::Result<()> {
        let listener =
            tokio::net::TcpListener::bind((self.config.host.as_str(), self.config.port)).await?;
        let addr = listener.local_addr()?;
        info!(%addr, "listening");

        let token = self.shutdown.token();
        axum::serve(listener, self.router())
            .with_graceful_shutdown(async move { token.cancelled().await })
            .await?;
        Ok(())
    }

    /// Publisher handle for event producers.
    #[must_use]
    pub fn publisher(&self) -> EventPublisher {
        self.publisher.clone()
    }

    /// Get the connection registry.
    #[must_use]
    pub fn registry(&self) -> &Arc<ConnectionRegistry> {
        &self.registry
    }

    /// Get the shutdown coordinator.
    #[must_use]
    pub fn shutdown(&self) -> &Arc<ShutdownCoordinator> {
        &self.shutdown
    }

    /// Get the server configuration.
    #[must_use]
    pub fn config(&self) -> &ServerConfig {
        &self.config
    }
}

/// Query parameters for the kitchen-display endpoint.
#[derive(Debug, Deserialize)]
struct KdsQuery {
    /// Optional station the display is mounted at.
    station: Option<StationId>,
}

/// Query parameters for the table-view endpoint.
#[derive(Debug, Deserialize)]
struct TablesQuery {
    /// Optional dining location (patio, main floor, ...).
    location: Option<LocationId>,
}

/// GET /api/v1/ws/dashboard/{tenant}
async fn ws_dashboard(
    State(state): State<AppState>,
    Path(tenant): Path<String>,
    ws: WebSocketUpgrade,
) -> impl IntoResponse {
    upgrade(state, ws, TenantId::from(tenant), Channel::Dashboard, None)
}

/// GET /api/v1/ws/kds/{tenant}?station=...
async fn ws_kds(
    State(state): State<AppState>,
    Path(tenant): Path<String>,
    Query(query): Query<KdsQuery>,
    ws: WebSocketUpgrade,
) -> impl IntoResponse {
    upgrade(
        state,
        ws,
        TenantId::from(tenant),
        Channel::KitchenDisplay,
        query.station.map(StationId::into_inner),
    )
}

/// GET /api/v1/ws/tables/{tenant}?location=...
async fn ws_tables(
    State(state): State<AppState>,
    Path(tenant): Path<String>,
    Query(query): Query<TablesQuery>,
    ws: WebSocketUpgrade,
) -> impl IntoResponse {
    upgrade(
        state,
        ws,
        TenantId::from(tenant),
        Channel::TableView,
        query.location.map(LocationId::into_inner),
    )
}

fn upgrade(
    state: AppState,
    ws: WebSocketUpgrade,
    tenant: TenantId,
    channel: Channel,
    scope: Option<String>,
) -> axum::response::Response {
    ws.on_upgrade(move |socket| {
        run_ws_session(
            socket,
            tenant,
            channel,
            scope,
            state.registry,
            state.snapshots,
            state.settings,
            state.shutdown.token(),
        )
    })
}

/// GET /health
async fn health_handler(State(state): State<AppState>) -> Json<HealthResponse> {
    let resp = health::health_check(
        state.start_time,
        state.registry.connection_count(),
        state.registry.partition_count(),
    );
    Json(resp)
}

/// GET /metrics
async fn metrics_handler(State(state): State<AppState>) -> String {
    state
        .metrics_handle
        .as_ref()
        .map(crate::metrics::render)
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::websocket::metrics_cache::ZeroSnapshotSource;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use tower::ServiceExt;

    fn make_server() -> ExpoServer {
        ExpoServer::new(ServerConfig::default(), Arc::new(ZeroSnapshotSource))
    }

    #[tokio::test]
    async fn server_with_default_config() {
        let server = make_server();
        assert_eq!(server.config().host, "127.0.0.1");
        assert_eq!(server.config().port, 0);
    }

    #[test]
    fn registry_starts_empty() {
        let server = make_server();
        assert_eq!(server.registry().connection_count(), 0);
        assert_eq!(server.registry().partition_count(), 0);
    }

    #[test]
    fn shutdown_coordinator_accessible() {
        let server = make_server();
        assert!(!server.shutdown().is_shutting_down());
        server.shutdown().shutdown();
        assert!(server.shutdown().is_shutting_down());
    }

    #[tokio::test]
    async fn health_endpoint_returns_ok() {
        let app = make_server().router();
        let req = Request::builder()
            .uri("/health")
            .body(Body::empty())
            .unwrap();

        let resp = app.oneshot(req).await.unwrap();
        assert_eq!(resp.status(), StatusCode::OK);

        let body = axum::body::to_bytes(resp.into_body(), 10_000).await.unwrap();
        let parsed: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(parsed["status"], "ok");
        assert_eq!(parsed["connections"], 0);
        assert_eq!(parsed["partitions"], 0);
        assert!(parsed["uptime_secs"].is_number());
    }

    #[tokio::test]
    async fn metrics_endpoint_renders_without_recorder() {
        let app = make_server().router();
        let req = Request::builder()
            .uri("/metrics")
            .body(Body::empty())
            .unwrap();

        let resp = app.oneshot(req).await.unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn metrics_endpoint_renders_with_handle() {
        let handle = metrics_exporter_prometheus::PrometheusBuilder::new()
            .build_recorder()
            .handle();
        let app = make_server().with_metrics_handle(handle).router();
        let req = Request::builder()
            .uri("/metrics")
            .body(Body::empty())
            .unwrap();

        let resp = app.oneshot(req).await.unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn ws_route_rejects_plain_get() {
        let app = make_server().router();
        let req = Request::builder()
            .uri("/api/v1/ws/dashboard/biz_1")
            .body(Body::empty())
            .unwrap();

        let resp = app.oneshot(req).await.unwrap();
        // No upgrade headers: the handshake is rejected with a client error.
        assert!(resp.status().is_client_error());
    }

    #[tokio::test]
    async fn unknown_route_returns_404() {
        let app = make_server().router();
        let req = Request::builder()
            .uri("/api/v1/ws/bar/biz_1")
            .body(Body::empty())
            .unwrap();

        let resp = app.oneshot(req).await.unwrap();
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    }
}
