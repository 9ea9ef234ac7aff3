//! WebSocket session lifecycle — handles a single connected client from
//! upgrade through disconnect.

use std::sync::Arc;
use std::time::Duration;

use axum::extract::ws::{Message, WebSocket};
use expo_core::channel::Channel;
use expo_core::events::{DomainEvent, EventFrame, ProtocolFrame};
use expo_core::ids::{ConnectionId, TenantId};
use futures::{SinkExt, StreamExt};
use metrics::{counter, gauge, histogram};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

use super::connection::ClientConnection;
use super::handler::handle_client_frame;
use super::metrics_cache::MetricsCache;
use super::registry::{ConnectionRegistry, PartitionKey};
use crate::metrics::{
    WS_CONNECTION_DURATION_SECONDS, WS_CONNECTIONS_ACTIVE, WS_CONNECTIONS_TOTAL,
    WS_DISCONNECTIONS_TOTAL,
};

/// Per-session tunables, taken from the server config at upgrade time.
#[derive(Clone, Copy, Debug)]
pub struct SessionSettings {
    /// Idle window after which a heartbeat probe is sent.
    pub idle_timeout: Duration,
    /// Bound of the per-connection send queue.
    pub send_queue_capacity: usize,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            idle_timeout: Duration::from_secs(30),
            send_queue_capacity: 64,
        }
    }
}

/// Run a WebSocket session for a connected client.
///
/// 1. Registers the connection in its partition
/// 2. Sends the `connected` frame with the tenant's metrics snapshot
/// 3. Dispatches incoming frames (ping, subscribe) and probes idle clients
/// 4. Forwards queued broadcasts via the single writer task
/// 5. Deregisters on every exit path
#[instrument(skip_all, fields(tenant = %tenant, channel = %channel))]
pub async fn run_ws_session(
    ws: WebSocket,
    tenant: TenantId,
    channel: Channel,
    scope: Option<String>,
    registry: Arc<ConnectionRegistry>,
    snapshots: Arc<MetricsCache>,
    settings: SessionSettings,
    shutdown: CancellationToken,
) {
    let (mut ws_tx, mut ws_rx) = ws.split();

    let connection_id = ConnectionId::new();
    let (send_tx, mut send_rx) = mpsc::channel::<Arc<String>>(settings.send_queue_capacity);
    let connection = Arc::new(ClientConnection::new(
        connection_id.clone(),
        tenant.clone(),
        channel,
        scope.clone(),
        send_tx,
    ));
    let key = PartitionKey::scoped(tenant.clone(), channel, scope);

    info!(connection_id = %connection_id, "client connected");
    counter!(WS_CONNECTIONS_TOTAL).increment(1);
    gauge!(WS_CONNECTIONS_ACTIVE).increment(1.0);

    registry.register(&key, Arc::clone(&connection));

    // The connected frame goes out before the writer task starts, so it is
    // always the first frame the client sees.
    let snapshot = snapshots.get(&tenant).await;
    let connected = EventFrame::now(DomainEvent::Connected(snapshot));
    match serde_json::to_string(&connected) {
        Ok(json) => {
            if ws_tx.send(Message::Text(json.into())).await.is_err() {
                registry.deregister(&key, &connection_id);
                counter!(WS_DISCONNECTIONS_TOTAL).increment(1);
                gauge!(WS_CONNECTIONS_ACTIVE).decrement(1.0);
                return;
            }
        }
        Err(error) => warn!(%error, "failed to serialize connected frame"),
    }

    // Single writer: everything queued for this connection crosses the
    // socket here and nowhere else.
    let writer = tokio::spawn(async move {
        while let Some(frame) = send_rx.recv().await {
            if ws_tx
                .send(Message::Text(frame.as_str().to_owned().into()))
                .await
                .is_err()
            {
                break;
            }
        }
    });

    let evicted = connection.eviction_token();
    loop {
        tokio::select! {
            () = evicted.cancelled() => {
                info!(connection_id = %connection_id, "connection evicted");
                break;
            }
            () = shutdown.cancelled() => {
                debug!(connection_id = %connection_id, "shutting down session");
                break;
            }
            received = tokio::time::timeout(settings.idle_timeout, ws_rx.next()) => {
                match received {
                    // Idle window elapsed with no traffic: probe liveness.
                    Err(_) => {
                        let heartbeat = match serde_json::to_string(&ProtocolFrame::heartbeat_now()) {
                            Ok(json) => json,
                            Err(_) => break,
                        };
                        if let Err(error) = connection.send(Arc::new(heartbeat)) {
                            info!(connection_id = %connection_id, %error, "heartbeat undeliverable, closing");
                            break;
                        }
                    }
                    Ok(Some(Ok(message))) => {
                        let text = match message {
                            Message::Text(ref t) => Some(t.to_string()),
                            Message::Binary(ref data) => match std::str::from_utf8(data) {
                                Ok(s) => Some(s.to_owned()),
                                Err(_) => {
                                    debug!(
                                        connection_id = %connection_id,
                                        len = data.len(),
                                        "ignoring non-UTF8 binary frame"
                                    );
                                    None
                                }
                            },
                            Message::Close(_) => {
                                info!(connection_id = %connection_id, "client sent close frame");
                                break;
                            }
                            // axum answers protocol pings itself.
                            Message::Ping(_) | Message::Pong(_) => None,
                        };
                        if let Some(text) = text {
                            let _ = handle_client_frame(&text, &connection);
                        }
                    }
                    // Socket error or peer gone.
                    Ok(Some(Err(_)) | None) => break,
                }
            }
        }
    }

    info!(
        connection_id = %connection_id,
        dropped = connection.drop_count(),
        "client disconnected"
    );
    counter!(WS_DISCONNECTIONS_TOTAL).increment(1);
    gauge!(WS_CONNECTIONS_ACTIVE).decrement(1.0);
    histogram!(WS_CONNECTION_DURATION_SECONDS).record(connection.age().as_secs_f64());
    writer.abort();
    registry.deregister(&key, &connection_id);
}

#[cfg(test)]
mod tests {
    // Session behavior over a real socket (connected frame first, heartbeat
    // after idle, pong replies, cleanup on disconnect) is covered by
    // tests/integration.rs. Unit tests here pin down the settings and the
    // frames the session emits.

    use super::*;

    #[test]
    fn default_settings() {
        let settings = SessionSettings::default();
        assert_eq!(settings.idle_timeout, Duration::from_secs(30));
        assert_eq!(settings.send_queue_capacity, 64);
    }

    #[test]
    fn connected_frame_shape() {
        let frame = EventFrame::now(DomainEvent::Connected(
            expo_core::snapshot::MetricsSnapshot::default(),
        ));
        let json = serde_json::to_value(&frame).unwrap();
        assert_eq!(json["event"], "connected");
        assert!(json["timestamp"].is_string());
        assert!(json["data"]["orders"].is_object());
        assert!(json["data"]["revenue"].is_object());
        assert!(json["data"]["tables"].is_object());
        assert!(json["data"]["staff"].is_object());
    }

    #[test]
    fn heartbeat_frame_shape() {
        let json = serde_json::to_value(ProtocolFrame::heartbeat_now()).unwrap();
        assert_eq!(json["type"], "heartbeat");
        assert!(json["timestamp"].is_string());
    }
}
