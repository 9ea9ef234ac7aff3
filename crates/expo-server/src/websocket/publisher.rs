//! Typed publish surface for domain events.
//!
//! Producers (order flow, floor management, inventory, staffing, revenue
//! rollups) call one method per event family; routing to the right
//! partitions lives here so callers never deal with partition keys.

use std::sync::Arc;

use expo_core::channel::Channel;
use expo_core::events::{
    DomainEvent, EventFrame, InventoryAlertPayload, KdsTicketPayload, OrderPayload, RevenuePayload,
    StaffPayload, TablePayload,
};
use expo_core::ids::TenantId;
use metrics::counter;
use tracing::debug;

use super::registry::{ConnectionRegistry, PartitionKey};
use crate::metrics::EVENTS_PUBLISHED_TOTAL;

/// Publishes domain events into the registry's fan-out.
///
/// Cheap to clone; all clones share the same registry.
#[derive(Clone)]
pub struct EventPublisher {
    registry: Arc<ConnectionRegistry>,
}

impl EventPublisher {
    /// Create a publisher over a registry.
    #[must_use]
    pub fn new(registry: Arc<ConnectionRegistry>) -> Self {
        Self { registry }
    }

    /// Order lifecycle change. Delivered to the tenant's dashboard.
    pub fn publish_order_update(&self, tenant: &TenantId, payload: OrderPayload) -> usize {
        self.to_dashboard(tenant, DomainEvent::OrderUpdate(payload))
    }

    /// Table state change. Delivered to the tenant's dashboard and to every
    /// table-view partition, whatever location they are scoped to.
    pub fn publish_table_update(&self, tenant: &TenantId, payload: TablePayload) -> usize {
        let frame = EventFrame::now(DomainEvent::TableUpdate(payload));
        counter!(EVENTS_PUBLISHED_TOTAL, "kind" => frame.kind()).increment(1);
        let dashboard = self
            .registry
            .broadcast(&PartitionKey::new(tenant.clone(), Channel::Dashboard), &frame);
        let tables = self
            .registry
            .broadcast_channel(tenant, Channel::TableView, &frame);
        debug!(%tenant, kind = frame.kind(), dashboard, tables, "published table update");
        dashboard + tables
    }

    /// Kitchen ticket change. Delivered to every kitchen-display partition
    /// of the tenant — station scopes are registration qualifiers, not
    /// delivery filters.
    pub fn publish_kds_update(&self, tenant: &TenantId, payload: KdsTicketPayload) -> usize {
        let frame = EventFrame::now(DomainEvent::KdsUpdate(payload));
        counter!(EVENTS_PUBLISHED_TOTAL, "kind" => frame.kind()).increment(1);
        let delivered = self
            .registry
            .broadcast_channel(tenant, Channel::KitchenDisplay, &frame);
        debug!(%tenant, kind = frame.kind(), delivered, "published kds update");
        delivered
    }

    /// Stock threshold crossing. Delivered to the tenant's dashboard.
    pub fn publish_inventory_alert(&self, tenant: &TenantId, payload: InventoryAlertPayload) -> usize {
        self.to_dashboard(tenant, DomainEvent::InventoryAlert(payload))
    }

    /// Staffing change. Delivered to the tenant's dashboard.
    pub fn publish_staff_update(&self, tenant: &TenantId, payload: StaffPayload) -> usize {
        self.to_dashboard(tenant, DomainEvent::StaffUpdate(payload))
    }

    /// Revenue rollup change. Delivered to the tenant's dashboard.
    pub fn publish_revenue_update(&self, tenant: &TenantId, payload: RevenuePayload) -> usize {
        self.to_dashboard(tenant, DomainEvent::RevenueUpdate(payload))
    }

    fn to_dashboard(&self, tenant: &TenantId, event: DomainEvent) -> usize {
        let frame = EventFrame::now(event);
        counter!(EVENTS_PUBLISHED_TOTAL, "kind" => frame.kind()).increment(1);
        let delivered = self
            .registry
            .broadcast(&PartitionKey::new(tenant.clone(), Channel::Dashboard), &frame);
        debug!(%tenant, kind = frame.kind(), delivered, "published dashboard event");
        delivered
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::websocket::connection::ClientConnection;
    use expo_core::events::{OrderStatus, TableStatus, TicketStatus};
    use expo_core::ids::ConnectionId;
    use tokio::sync::mpsc;

    fn attach(
        registry: &ConnectionRegistry,
        id: &str,
        tenant: &str,
        channel: Channel,
        scope: Option<&str>,
    ) -> mpsc::Receiver<Arc<String>> {
        let (tx, rx) = mpsc::channel(16);
        let conn = Arc::new(ClientConnection::new(
            ConnectionId::from(id),
            TenantId::from(tenant),
            channel,
            scope.map(str::to_owned),
            tx,
        ));
        let key = PartitionKey::scoped(
            TenantId::from(tenant),
            channel,
            scope.map(str::to_owned),
        );
        registry.register(&key, conn);
        rx
    }

    fn order_payload() -> OrderPayload {
        OrderPayload {
            order_id: "ord_42".into(),
            status: OrderStatus::Preparing,
            table_number: Some(7),
            total: Some(63.50),
        }
    }

    fn recv_json(rx: &mut mpsc::Receiver<Arc<String>>) -> serde_json::Value {
        let frame = rx.try_recv().expect("expected a frame");
        serde_json::from_str(&frame).expect("frame must be valid JSON")
    }

    #[tokio::test]
    async fn order_update_reaches_dashboard_only() {
        let registry = Arc::new(ConnectionRegistry::new());
        let publisher = EventPublisher::new(Arc::clone(&registry));
        let mut dash = attach(&registry, "d", "t1", Channel::Dashboard, None);
        let mut kds = attach(&registry, "k", "t1", Channel::KitchenDisplay, None);

        let delivered = publisher.publish_order_update(&TenantId::from("t1"), order_payload());
        assert_eq!(delivered, 1);

        let json = recv_json(&mut dash);
        assert_eq!(json["event"], "order_update");
        assert_eq!(json["data"]["order_id"], "ord_42");
        assert_eq!(json["data"]["status"], "preparing");
        assert!(json["timestamp"].is_string());
        assert!(kds.try_recv().is_err());
    }

    #[tokio::test]
    async fn table_update_reaches_dashboard_and_table_views() {
        let registry = Arc::new(ConnectionRegistry::new());
        let publisher = EventPublisher::new(Arc::clone(&registry));
        let mut dash = attach(&registry, "d", "t1", Channel::Dashboard, None);
        let mut floor = attach(&registry, "f", "t1", Channel::TableView, None);
        let mut patio = attach(&registry, "p", "t1", Channel::TableView, Some("patio"));

        let delivered = publisher.publish_table_update(
            &TenantId::from("t1"),
            TablePayload {
                table_id: "tbl_3".into(),
                status: TableStatus::Occupied,
                party_size: Some(4),
            },
        );
        assert_eq!(delivered, 3);
        assert_eq!(recv_json(&mut dash)["event"], "table_update");
        assert_eq!(recv_json(&mut floor)["event"], "table_update");
        assert_eq!(recv_json(&mut patio)["event"], "table_update");
    }

    #[tokio::test]
    async fn kds_update_fans_to_all_stations() {
        let registry = Arc::new(ConnectionRegistry::new());
        let publisher = EventPublisher::new(Arc::clone(&registry));
        let mut grill = attach(&registry, "g", "t1", Channel::KitchenDisplay, Some("grill"));
        let mut fry = attach(&registry, "f", "t1", Channel::KitchenDisplay, Some("fry"));
        let mut dash = attach(&registry, "d", "t1", Channel::Dashboard, None);

        let delivered = publisher.publish_kds_update(
            &TenantId::from("t1"),
            KdsTicketPayload {
                ticket_id: "tkt_9".into(),
                order_id: "ord_42".into(),
                status: TicketStatus::Ready,
                station: Some("grill".into()),
                items: Vec::new(),
            },
        );
        assert_eq!(delivered, 2);
        assert_eq!(recv_json(&mut grill)["event"], "kds_update");
        assert_eq!(recv_json(&mut fry)["event"], "kds_update");
        assert!(dash.try_recv().is_err());
    }

    #[tokio::test]
    async fn publish_respects_tenant_boundary() {
        let registry = Arc::new(ConnectionRegistry::new());
        let publisher = EventPublisher::new(Arc::clone(&registry));
        let mut t1 = attach(&registry, "a", "t1", Channel::Dashboard, None);
        let mut t2 = attach(&registry, "b", "t2", Channel::Dashboard, None);

        let _ = publisher.publish_order_update(&TenantId::from("t1"), order_payload());
        assert!(t1.try_recv().is_ok());
        assert!(t2.try_recv().is_err());
    }

    #[tokio::test]
    async fn publish_to_empty_tenant_returns_zero() {
        let registry = Arc::new(ConnectionRegistry::new());
        let publisher = EventPublisher::new(registry);
        assert_eq!(
            publisher.publish_order_update(&TenantId::from("nobody"), order_payload()),
            0
        );
    }

    #[tokio::test]
    async fn dashboard_event_families_share_routing() {
        let registry = Arc::new(ConnectionRegistry::new());
        let publisher = EventPublisher::new(Arc::clone(&registry));
        let mut dash = attach(&registry, "d", "t1", Channel::Dashboard, None);
        let tenant = TenantId::from("t1");

        let _ = publisher.publish_inventory_alert(
            &tenant,
            InventoryAlertPayload {
                item_id: "inv_7".into(),
                name: "ribeye".into(),
                quantity_remaining: 3.0,
                threshold: 10.0,
                severity: expo_core::events::AlertSeverity::Low,
            },
        );
        let _ = publisher.publish_staff_update(
            &tenant,
            StaffPayload {
                staff_id: "stf_1".into(),
                action: expo_core::events::StaffAction::ClockIn,
                name: Some("Sam".into()),
            },
        );
        let _ = publisher.publish_revenue_update(
            &tenant,
            RevenuePayload {
                today: 1200.0,
                this_hour: 85.0,
                order_count: Some(42),
            },
        );

        assert_eq!(recv_json(&mut dash)["event"], "inventory_alert");
        assert_eq!(recv_json(&mut dash)["event"], "staff_update");
        assert_eq!(recv_json(&mut dash)["event"], "revenue_update");
    }
}
