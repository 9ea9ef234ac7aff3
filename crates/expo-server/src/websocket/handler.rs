//! Inbound client frame dispatch.
//!
//! Clients speak a deliberately tiny protocol: ping and subscribe. Anything
//! else — unknown types, malformed JSON, stray text — is logged and ignored
//! so a buggy dashboard build can never take its own connection down.

use std::sync::Arc;

use expo_core::events::{ClientFrame, ProtocolFrame};
use tracing::debug;

use super::connection::ClientConnection;

/// What a received text frame resolved to.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum FrameDisposition {
    /// Ping answered with a pong.
    PongSent,
    /// Ping received but the pong could not be enqueued.
    PongDropped,
    /// Subscribe recorded; carries the number of declared kinds.
    SubscriptionRecorded(usize),
    /// Frame was not a recognized client message.
    Ignored,
}

/// Dispatch one inbound text frame for a connection.
///
/// Replies go through the connection's send queue, never directly to the
/// socket, so the session's writer stays the only socket writer.
pub fn handle_client_frame(text: &str, connection: &ClientConnection) -> FrameDisposition {
    let frame: ClientFrame = match serde_json::from_str(text) {
        Ok(frame) => frame,
        Err(error) => {
            debug!(
                connection_id = %connection.id,
                %error,
                len = text.len(),
                "ignoring unrecognized client frame"
            );
            return FrameDisposition::Ignored;
        }
    };

    match frame {
        ClientFrame::Ping => match serde_json::to_string(&ProtocolFrame::pong_now()) {
            Ok(json) => match connection.send(Arc::new(json)) {
                Ok(()) => FrameDisposition::PongSent,
                Err(error) => {
                    debug!(connection_id = %connection.id, %error, "failed to enqueue pong");
                    FrameDisposition::PongDropped
                }
            },
            Err(_) => FrameDisposition::PongDropped,
        },
        ClientFrame::Subscribe { events } => {
            let count = events.len();
            debug!(
                connection_id = %connection.id,
                kinds = ?events,
                "recorded subscription interests"
            );
            connection.set_subscriptions(events);
            FrameDisposition::SubscriptionRecorded(count)
        }
    }
}
