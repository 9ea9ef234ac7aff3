//! Aggregated per-tenant operational metrics served on connect.

use serde::{Deserialize, Serialize};

/// Order counters for a tenant.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderCounts {
    /// Orders currently open.
    pub active: u64,
    /// Orders completed since midnight.
    pub completed_today: u64,
    /// Orders waiting on the kitchen.
    pub pending_kitchen: u64,
}

/// Revenue figures for a tenant.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct RevenueSummary {
    /// Revenue since midnight.
    pub today: f64,
    /// Revenue in the current hour.
    pub this_hour: f64,
}

/// Table occupancy breakdown for a tenant.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableOccupancy {
    /// Tables free to seat.
    pub available: u64,
    /// Tables currently seated.
    pub occupied: u64,
    /// Tables held for reservations.
    pub reserved: u64,
}

/// Staff presence counters for a tenant.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StaffCounts {
    /// Staff currently clocked in.
    pub clocked_in: u64,
    /// Staff currently on break.
    pub on_break: u64,
}

/// Aggregated operational summary for one tenant.
///
/// Computed by the external aggregation collaborator and cached with a short
/// TTL so that bursts of connects do not stampede the backing store. The
/// [`Default`] value is the documented zeroed snapshot, served when no
/// aggregation data has ever been computed for the tenant.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct MetricsSnapshot {
    /// Order counters.
    pub orders: OrderCounts,
    /// Revenue figures.
    pub revenue: RevenueSummary,
    /// Table occupancy.
    pub tables: TableOccupancy,
    /// Staff presence.
    pub staff: StaffCounts,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_is_zeroed() {
        let s = MetricsSnapshot::default();
        assert_eq!(s.orders.active, 0);
        assert_eq!(s.orders.completed_today, 0);
        assert_eq!(s.orders.pending_kitchen, 0);
        assert_eq!(s.revenue.today, 0.0);
        assert_eq!(s.tables.occupied, 0);
        assert_eq!(s.staff.clocked_in, 0);
    }

    #[test]
    fn serializes_with_nested_sections() {
        let s = MetricsSnapshot {
            orders: OrderCounts {
                active: 4,
                completed_today: 31,
                pending_kitchen: 2,
            },
            revenue: RevenueSummary {
                today: 1842.50,
                this_hour: 112.0,
            },
            tables: TableOccupancy {
                available: 6,
                occupied: 9,
                reserved: 3,
            },
            staff: StaffCounts {
                clocked_in: 7,
                on_break: 1,
            },
        };
        let json = serde_json::to_value(s).unwrap();
        assert_eq!(json["orders"]["active"], 4);
        assert_eq!(json["revenue"]["today"], 1842.50);
        assert_eq!(json["tables"]["reserved"], 3);
        assert_eq!(json["staff"]["clocked_in"], 7);
    }

    #[test]
    fn round_trip() {
        let s = MetricsSnapshot {
            orders: OrderCounts {
                active: 1,
                ..OrderCounts::default()
            },
            ..MetricsSnapshot::default()
        };
        let json = serde_json::to_string(&s).unwrap();
        let back: MetricsSnapshot = serde_json::from_str(&json).unwrap();
        assert_eq!(back, s);
    }
}
