//! Order model and status lifecycle

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Order status lifecycle.
///
/// The happy path is `Pending -> InProcess -> Assembling -> Ready`; both
/// cancelled variants are terminal and reachable from any non-terminal
/// state. The serialized forms are the Russian strings the storefront
/// already speaks, so they are part of the wire format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OrderStatus {
    #[serde(rename = "Ожидание")]
    Pending,
    #[serde(rename = "В обработке")]
    InProcess,
    #[serde(rename = "Собирается")]
    Assembling,
    #[serde(rename = "Готов к выдаче")]
    Ready,
    #[serde(rename = "Отменен")]
    Cancelled,
    #[serde(rename = "Отменен администратором")]
    CancelledByAdmin,
}

impl OrderStatus {
    /// Wire string stored in the `order_status` column.
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Pending => "Ожидание",
            OrderStatus::InProcess => "В обработке",
            OrderStatus::Assembling => "Собирается",
            OrderStatus::Ready => "Готов к выдаче",
            OrderStatus::Cancelled => "Отменен",
            OrderStatus::CancelledByAdmin => "Отменен администратором",
        }
    }

    /// True for both cancelled variants. The delayed auto-advance must not
    /// fire once an order reaches either of them.
    pub fn is_cancelled(&self) -> bool {
        matches!(self, OrderStatus::Cancelled | OrderStatus::CancelledByAdmin)
    }

    /// True for states that accept no further transitions.
    pub fn is_terminal(&self) -> bool {
        matches!(self, OrderStatus::Ready) || self.is_cancelled()
    }
}

impl std::str::FromStr for OrderStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Ожидание" => Ok(OrderStatus::Pending),
            "В обработке" => Ok(OrderStatus::InProcess),
            "Собирается" => Ok(OrderStatus::Assembling),
            "Готов к выдаче" => Ok(OrderStatus::Ready),
            "Отменен" => Ok(OrderStatus::Cancelled),
            "Отменен администратором" => Ok(OrderStatus::CancelledByAdmin),
            other => Err(format!("Unknown order status: {}", other)),
        }
    }
}

impl std::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Order entity
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Order {
    pub order_id: Uuid,
    pub user_id: Uuid,
    /// Opaque line-item payload as submitted at checkout.
    pub order_info: serde_json::Value,
    pub order_name: String,
    pub order_status: OrderStatus,
    pub seen: bool,
    pub created_at: DateTime<Utc>,
}

/// New order creation payload
#[derive(Debug, Clone)]
pub struct NewOrder {
    pub order_id: Uuid,
    pub user_id: Uuid,
    pub order_info: serde_json::Value,
    pub order_name: String,
    pub order_status: OrderStatus,
}

/// Order row joined with its owner, for the admin listing.
#[derive(Debug, Clone, Serialize)]
pub struct OrderWithOwner {
    #[serde(flatten)]
    pub order: Order,
    pub login: String,
    pub email: String,
}

/// A single line item of an order as passed to the assembly transition.
///
/// `quantity` is the stock level the client observed, `c_quantity` the
/// amount ordered; the inventory update stores `quantity - c_quantity`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderLineItem {
    pub product_id: Uuid,
    pub quantity: i32,
    pub c_quantity: i32,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn test_status_wire_strings_round_trip() {
        for status in [
            OrderStatus::Pending,
            OrderStatus::InProcess,
            OrderStatus::Assembling,
            OrderStatus::Ready,
            OrderStatus::Cancelled,
            OrderStatus::CancelledByAdmin,
        ] {
            let parsed = OrderStatus::from_str(status.as_str()).unwrap();
            assert_eq!(parsed, status);
        }
    }

    #[test]
    fn test_status_serde_uses_wire_strings() {
        let json = serde_json::to_string(&OrderStatus::Assembling).unwrap();
        assert_eq!(json, "\"Собирается\"");

        let status: OrderStatus = serde_json::from_str("\"Готов к выдаче\"").unwrap();
        assert_eq!(status, OrderStatus::Ready);
    }

    #[test]
    fn test_unknown_status_is_rejected() {
        assert!(OrderStatus::from_str("Shipped").is_err());
        assert!(serde_json::from_str::<OrderStatus>("\"Shipped\"").is_err());
    }

    #[test]
    fn test_cancelled_variants() {
        assert!(OrderStatus::Cancelled.is_cancelled());
        assert!(OrderStatus::CancelledByAdmin.is_cancelled());
        assert!(!OrderStatus::Ready.is_cancelled());
        assert!(!OrderStatus::Assembling.is_cancelled());
    }

    #[test]
    fn test_terminal_states() {
        assert!(OrderStatus::Ready.is_terminal());
        assert!(OrderStatus::Cancelled.is_terminal());
        assert!(OrderStatus::CancelledByAdmin.is_terminal());
        assert!(!OrderStatus::Pending.is_terminal());
        assert!(!OrderStatus::InProcess.is_terminal());
        assert!(!OrderStatus::Assembling.is_terminal());
    }

    #[test]
    fn test_line_item_deserialization() {
        let items: Vec<OrderLineItem> = serde_json::from_str(
            r#"[{"product_id":"8c3a52de-25a3-4d25-9abe-6a5b0b8a3a3e","quantity":10,"c_quantity":3}]"#,
        )
        .unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].quantity, 10);
        assert_eq!(items[0].c_quantity, 3);
    }
}
