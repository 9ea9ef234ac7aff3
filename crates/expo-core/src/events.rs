//! Domain events and wire frames.
//!
//! Three frame families cross the WebSocket:
//!
//! - **[`EventFrame`]**: server → client domain events —
//!   `{"event": <kind>, "timestamp": <RFC-3339>, "data": <payload>}`.
//! - **[`ProtocolFrame`]**: server → client keepalive frames —
//!   `{"type": "pong"|"heartbeat", "timestamp": ...}`.
//! - **[`ClientFrame`]**: client → server messages —
//!   `{"type": "ping"}` and `{"type": "subscribe", "events": [...]}`.
//!
//! [`DomainEvent`] is a closed tagged union with a typed payload per kind,
//! so publishers get compile-time exhaustiveness instead of the free-form
//! maps the dashboard clients historically tolerated. Events are transient:
//! constructed, broadcast, and discarded — never persisted or replayed.

use serde::{Deserialize, Serialize};

use crate::snapshot::MetricsSnapshot;

// ─────────────────────────────────────────────────────────────────────────────
// Payloads
// ─────────────────────────────────────────────────────────────────────────────

/// Order lifecycle status.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    /// Placed, not yet acknowledged.
    Pending,
    /// In the kitchen.
    Preparing,
    /// Ready for pickup / service.
    Ready,
    /// Delivered to the table.
    Served,
    /// Closed and paid.
    Completed,
    /// Cancelled.
    Cancelled,
}

/// Payload for an `order_update` event.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct OrderPayload {
    /// Order identifier.
    pub order_id: String,
    /// Current status.
    pub status: OrderStatus,
    /// Table the order belongs to, if dine-in.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub table_number: Option<u32>,
    /// Order total.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total: Option<f64>,
}

/// Table occupancy status.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TableStatus {
    /// Free to seat.
    Available,
    /// Currently seated.
    Occupied,
    /// Held for a reservation.
    Reserved,
    /// Being turned over.
    Cleaning,
}

/// Payload for a `table_update` event.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TablePayload {
    /// Table identifier.
    pub table_id: String,
    /// New status.
    pub status: TableStatus,
    /// Seated party size, when occupied.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub party_size: Option<u32>,
}

/// Kitchen ticket status.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TicketStatus {
    /// Waiting to be picked up by a station.
    Queued,
    /// Being prepared.
    Preparing,
    /// Ready to expedite.
    Ready,
    /// Bumped off the display.
    Bumped,
}

/// One line item on a kitchen ticket.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TicketItem {
    /// Menu item name.
    pub name: String,
    /// Quantity ordered.
    pub quantity: u32,
    /// Preparation notes (allergies, modifications).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

/// Payload for a `kds_update` event.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct KdsTicketPayload {
    /// Ticket identifier.
    pub ticket_id: String,
    /// Order this ticket belongs to.
    pub order_id: String,
    /// Ticket status.
    pub status: TicketStatus,
    /// Station the ticket is routed to, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub station: Option<String>,
    /// Line items.
    #[serde(default)]
    pub items: Vec<TicketItem>,
}

/// Inventory alert severity.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertSeverity {
    /// Stock below the reorder threshold.
    Low,
    /// Stock effectively exhausted.
    Critical,
}

/// Payload for an `inventory_alert` event.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct InventoryAlertPayload {
    /// Inventory item identifier.
    pub item_id: String,
    /// Item name.
    pub name: String,
    /// Remaining quantity in stock units.
    pub quantity_remaining: f64,
    /// Reorder threshold.
    pub threshold: f64,
    /// Severity of the alert.
    pub severity: AlertSeverity,
}

/// Staff clock action.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StaffAction {
    /// Shift started.
    ClockIn,
    /// Shift ended.
    ClockOut,
    /// Break started.
    BreakStart,
    /// Break ended.
    BreakEnd,
}

/// Payload for a `staff_update` event.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct StaffPayload {
    /// Staff member identifier.
    pub staff_id: String,
    /// The clock action that occurred.
    pub action: StaffAction,
    /// Display name, when available.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

/// Payload for a `revenue_update` event.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct RevenuePayload {
    /// Revenue since midnight.
    pub today: f64,
    /// Revenue in the current hour.
    pub this_hour: f64,
    /// Orders contributing to today's figure, when known.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub order_count: Option<u64>,
}

// ─────────────────────────────────────────────────────────────────────────────
// DomainEvent / EventFrame — server → client domain traffic
// ─────────────────────────────────────────────────────────────────────────────

/// A domain change broadcast to connected clients.
///
/// Serializes adjacently tagged so the wire carries
/// `{"event": <kind>, "data": <payload>}`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "snake_case")]
pub enum DomainEvent {
    /// New order or order status change.
    OrderUpdate(OrderPayload),
    /// Table status change.
    TableUpdate(TablePayload),
    /// Kitchen ticket change.
    KdsUpdate(KdsTicketPayload),
    /// Low-stock alert.
    InventoryAlert(InventoryAlertPayload),
    /// Staff clock in/out.
    StaffUpdate(StaffPayload),
    /// Real-time revenue change.
    RevenueUpdate(RevenuePayload),
    /// Initial snapshot delivered on connect.
    Connected(MetricsSnapshot),
}

impl DomainEvent {
    /// Wire kind string for this event.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::OrderUpdate(_) => "order_update",
            Self::TableUpdate(_) => "table_update",
            Self::KdsUpdate(_) => "kds_update",
            Self::InventoryAlert(_) => "inventory_alert",
            Self::StaffUpdate(_) => "staff_update",
            Self::RevenueUpdate(_) => "revenue_update",
            Self::Connected(_) => "connected",
        }
    }
}

/// A timestamped domain event as sent on the wire.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct EventFrame {
    /// The event kind and payload (flattened into the frame).
    #[serde(flatten)]
    pub event: DomainEvent,
    /// RFC-3339 generation timestamp.
    pub timestamp: String,
}

impl EventFrame {
    /// Wrap an event with the current UTC timestamp.
    #[must_use]
    pub fn now(event: DomainEvent) -> Self {
        Self {
            event,
            timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }

    /// Wire kind string for the wrapped event.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        self.event.kind()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// ProtocolFrame — server → client keepalive
// ─────────────────────────────────────────────────────────────────────────────

/// Protocol-internal frames (never carry domain data).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ProtocolFrame {
    /// Reply to a client ping.
    Pong {
        /// RFC-3339 reply timestamp.
        timestamp: String,
    },
    /// Liveness probe sent after an idle period.
    Heartbeat {
        /// RFC-3339 probe timestamp.
        timestamp: String,
    },
}

impl ProtocolFrame {
    /// A pong stamped with the current UTC time.
    #[must_use]
    pub fn pong_now() -> Self {
        Self::Pong {
            timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }

    /// A heartbeat stamped with the current UTC time.
    #[must_use]
    pub fn heartbeat_now() -> Self {
        Self::Heartbeat {
            timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// ClientFrame — client → server
// ─────────────────────────────────────────────────────────────────────────────

/// Messages a client may send over an established connection.
///
/// Anything that fails to parse as one of these is ignored by the session
/// (fail-soft, not fail-closed).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientFrame {
    /// Keepalive ping; answered with a pong.
    Ping,
    /// Declared interest in a subset of event kinds. Accepted and recorded
    /// but delivery is not narrowed by it.
    Subscribe {
        /// Event kind strings the client wants.
        #[serde(default)]
        events: Vec<String>,
    },
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
