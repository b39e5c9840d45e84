//! Order status state machine.

use serde::{Deserialize, Serialize};

/// The status of an order in its lifecycle.
///
/// Transitions:
/// ```text
/// pendente ──► confirmado ──► preparando ──► entregue
///     │             │              │
///     └─────────────┴──────────────┴──► cancelado
/// ```
///
/// The wire and database representation uses the Portuguese names the
/// marketplace exposes to its users.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum OrderStatus {
    /// Order was just created by checkout, awaiting vendor confirmation.
    #[default]
    #[serde(rename = "pendente")]
    Pending,

    /// Vendor accepted the order.
    #[serde(rename = "confirmado")]
    Confirmed,

    /// Vendor is assembling the order.
    #[serde(rename = "preparando")]
    Preparing,

    /// Order was delivered (terminal).
    #[serde(rename = "entregue")]
    Delivered,

    /// Order was cancelled and its stock restored (terminal).
    #[serde(rename = "cancelado")]
    Cancelled,
}

impl OrderStatus {
    /// All statuses this one may legally move to.
    pub fn allowed_next(&self) -> &'static [OrderStatus] {
        match self {
            OrderStatus::Pending => &[OrderStatus::Confirmed, OrderStatus::Cancelled],
            OrderStatus::Confirmed => &[OrderStatus::Preparing, OrderStatus::Cancelled],
            OrderStatus::Preparing => &[OrderStatus::Delivered, OrderStatus::Cancelled],
            OrderStatus::Delivered | OrderStatus::Cancelled => &[],
        }
    }

    /// Returns true if moving to `target` is legal from this status.
    pub fn can_transition_to(&self, target: OrderStatus) -> bool {
        self.allowed_next().contains(&target)
    }

    /// Returns true if this is a terminal status.
    pub fn is_terminal(&self) -> bool {
        matches!(self, OrderStatus::Delivered | OrderStatus::Cancelled)
    }

    /// The database/wire representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Pending => "pendente",
            OrderStatus::Confirmed => "confirmado",
            OrderStatus::Preparing => "preparando",
            OrderStatus::Delivered => "entregue",
            OrderStatus::Cancelled => "cancelado",
        }
    }

    /// Parses the database/wire representation.
    pub fn parse(s: &str) -> Option<OrderStatus> {
        match s {
            "pendente" => Some(OrderStatus::Pending),
            "confirmado" => Some(OrderStatus::Confirmed),
            "preparando" => Some(OrderStatus::Preparing),
            "entregue" => Some(OrderStatus::Delivered),
            "cancelado" => Some(OrderStatus::Cancelled),
            _ => None,
        }
    }
}

impl std::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn initial_status_is_pending() {
        assert_eq!(OrderStatus::default(), OrderStatus::Pending);
    }

    #[test]
    fn forward_path_is_linear() {
        assert!(OrderStatus::Pending.can_transition_to(OrderStatus::Confirmed));
        assert!(OrderStatus::Confirmed.can_transition_to(OrderStatus::Preparing));
        assert!(OrderStatus::Preparing.can_transition_to(OrderStatus::Delivered));

        assert!(!OrderStatus::Pending.can_transition_to(OrderStatus::Preparing));
        assert!(!OrderStatus::Pending.can_transition_to(OrderStatus::Delivered));
        assert!(!OrderStatus::Confirmed.can_transition_to(OrderStatus::Delivered));
    }

    #[test]
    fn cancel_allowed_from_all_non_terminal_statuses() {
        assert!(OrderStatus::Pending.can_transition_to(OrderStatus::Cancelled));
        assert!(OrderStatus::Confirmed.can_transition_to(OrderStatus::Cancelled));
        assert!(OrderStatus::Preparing.can_transition_to(OrderStatus::Cancelled));
        assert!(!OrderStatus::Delivered.can_transition_to(OrderStatus::Cancelled));
    }

    #[test]
    fn terminal_statuses_allow_nothing() {
        assert!(OrderStatus::Delivered.allowed_next().is_empty());
        assert!(OrderStatus::Cancelled.allowed_next().is_empty());
        assert!(!OrderStatus::Cancelled.can_transition_to(OrderStatus::Cancelled));
        assert!(!OrderStatus::Cancelled.can_transition_to(OrderStatus::Delivered));
    }

    #[test]
    fn no_backward_transitions() {
        assert!(!OrderStatus::Confirmed.can_transition_to(OrderStatus::Pending));
        assert!(!OrderStatus::Preparing.can_transition_to(OrderStatus::Confirmed));
        assert!(!OrderStatus::Delivered.can_transition_to(OrderStatus::Preparing));
    }

    #[test]
    fn parse_roundtrips_as_str() {
        for status in [
            OrderStatus::Pending,
            OrderStatus::Confirmed,
            OrderStatus::Preparing,
            OrderStatus::Delivered,
            OrderStatus::Cancelled,
        ] {
            assert_eq!(OrderStatus::parse(status.as_str()), Some(status));
        }
        assert_eq!(OrderStatus::parse("enviado"), None);
    }

    #[test]
    fn serde_uses_wire_names() {
        let json = serde_json::to_string(&OrderStatus::Pending).unwrap();
        assert_eq!(json, "\"pendente\"");
        let back: OrderStatus = serde_json::from_str("\"entregue\"").unwrap();
        assert_eq!(back, OrderStatus::Delivered);
    }
}
