//! Order fulfillment state machine.

use serde::{Deserialize, Serialize};

/// The fulfillment status of an order.
///
/// Transition table:
/// ```text
/// Placed ──┬──► Accepted ──► Packing ──► Dispatched ──► Delivered ──► Completed
///          ├──► Rejected
///          └──► Cancelled
/// ```
/// Nothing loops back; `Rejected`, `Cancelled`, and `Completed` are
/// terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum OrderStatus {
    /// Checkout succeeded; stock is reserved, awaiting wholesaler action.
    #[default]
    Placed,

    /// Wholesaler accepted; reservations converted to committed sales.
    Accepted,

    /// Order is being packed.
    Packing,

    /// Order has left the wholesaler.
    Dispatched,

    /// Order reached the retailer.
    Delivered,

    /// Closed out (terminal state).
    Completed,

    /// Wholesaler rejected the order (terminal state).
    Rejected,

    /// Cancelled before acceptance (terminal state).
    Cancelled,
}

impl OrderStatus {
    /// Returns true if the transition to `target` is in the table.
    pub fn can_transition(self, target: OrderStatus) -> bool {
        use OrderStatus::*;
        matches!(
            (self, target),
            (Placed, Accepted | Rejected | Cancelled)
                | (Accepted, Packing)
                | (Packing, Dispatched)
                | (Dispatched, Delivered)
                | (Delivered, Completed)
        )
    }

    /// Returns true if no further transitions are possible.
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            OrderStatus::Completed | OrderStatus::Rejected | OrderStatus::Cancelled
        )
    }

    /// Returns the status name as stored in the database.
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Placed => "PLACED",
            OrderStatus::Accepted => "ACCEPTED",
            OrderStatus::Packing => "PACKING",
            OrderStatus::Dispatched => "DISPATCHED",
            OrderStatus::Delivered => "DELIVERED",
            OrderStatus::Completed => "COMPLETED",
            OrderStatus::Rejected => "REJECTED",
            OrderStatus::Cancelled => "CANCELLED",
        }
    }
}

impl std::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for OrderStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "PLACED" => Ok(OrderStatus::Placed),
            "ACCEPTED" => Ok(OrderStatus::Accepted),
            "PACKING" => Ok(OrderStatus::Packing),
            "DISPATCHED" => Ok(OrderStatus::Dispatched),
            "DELIVERED" => Ok(OrderStatus::Delivered),
            "COMPLETED" => Ok(OrderStatus::Completed),
            "REJECTED" => Ok(OrderStatus::Rejected),
            "CANCELLED" => Ok(OrderStatus::Cancelled),
            other => Err(format!("unknown order status: {other}")),
        }
    }
}
