//! Functional connection channels.

use serde::{Deserialize, Serialize};
use std::fmt;

/// The functional category of a client connection.
///
/// Each channel has its own WebSocket endpoint and receives a distinct
/// subset of domain events.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Channel {
    /// Main operations dashboard — receives order, table, inventory, staff,
    /// and revenue events.
    Dashboard,
    /// Kitchen display system — receives kitchen-ticket events, optionally
    /// qualified by a station.
    KitchenDisplay,
    /// Table management view — receives table status events, optionally
    /// qualified by a location.
    TableView,
}

impl Channel {
    /// Wire/endpoint name for this channel.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Dashboard => "dashboard",
            Self::KitchenDisplay => "kitchen-display",
            Self::TableView => "table-view",
        }
    }
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wire_names() {
        assert_eq!(Channel::Dashboard.as_str(), "dashboard");
        assert_eq!(Channel::KitchenDisplay.as_str(), "kitchen-display");
        assert_eq!(Channel::TableView.as_str(), "table-view");
    }

    #[test]
    fn serde_uses_kebab_case() {
        let json = serde_json::to_string(&Channel::KitchenDisplay).unwrap();
        assert_eq!(json, "\"kitchen-display\"");
        let back: Channel = serde_json::from_str(&json).unwrap();
        assert_eq!(back, Channel::KitchenDisplay);
    }

    #[test]
    fn display_matches_as_str() {
        for c in [Channel::Dashboard, Channel::KitchenDisplay, Channel::TableView] {
            assert_eq!(c.to_string(), c.as_str());
        }
    }

    #[test]
    fn channels_are_hashable_and_distinct() {
        let set: std::collections::HashSet<Channel> =
            [Channel::Dashboard, Channel::KitchenDisplay, Channel::TableView]
                .into_iter()
                .collect();
        assert_eq!(set.len(), 3);
    }
}
