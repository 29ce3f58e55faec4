//! Product orders and their fulfillment history

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::PaymentStatus;

/// Fulfillment status, mirrored from the latest tracking update
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    Pending,
    Processing,
    Shipped,
    OutForDelivery,
    Delivered,
    Cancelled,
}

impl OrderStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Pending => "pending",
            OrderStatus::Processing => "processing",
            OrderStatus::Shipped => "shipped",
            OrderStatus::OutForDelivery => "out_for_delivery",
            OrderStatus::Delivered => "delivered",
            OrderStatus::Cancelled => "cancelled",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(OrderStatus::Pending),
            "processing" => Some(OrderStatus::Processing),
            "shipped" => Some(OrderStatus::Shipped),
            "out_for_delivery" => Some(OrderStatus::OutForDelivery),
            "delivered" => Some(OrderStatus::Delivered),
            "cancelled" => Some(OrderStatus::Cancelled),
            _ => None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, OrderStatus::Delivered | OrderStatus::Cancelled)
    }

    /// Forward-only progression; `cancelled` is reachable from any
    /// non-terminal status
    pub fn can_follow(&self, previous: OrderStatus) -> bool {
        if previous.is_terminal() {
            return false;
        }
        match self {
            OrderStatus::Cancelled => true,
            next => *next > previous,
        }
    }
}

impl std::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A line item, with name and price captured at checkout
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderItem {
    pub product_id: Uuid,
    pub name: String,
    pub quantity: u32,
    pub price: i64,
}

/// One immutable entry in an order's status history
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrackingUpdate {
    pub status: OrderStatus,
    pub location: String,
    pub description: String,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    pub id: Uuid,
    pub customer_id: Uuid,
    pub branch_id: Uuid,
    pub items: Vec<OrderItem>,
    pub total_amount: i64,
    pub payment_status: PaymentStatus,
    pub order_status: OrderStatus,
    pub tracking_number: String,
    /// Oldest first
    pub tracking_updates: Vec<TrackingUpdate>,
    pub created_at: DateTime<Utc>,
}

/// Requested quantity of one product at checkout
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct OrderLine {
    pub product_id: Uuid,
    pub quantity: u32,
}

#[derive(Debug, Clone)]
pub struct NewOrder {
    pub customer_id: Uuid,
    pub branch_id: Uuid,
    pub items: Vec<OrderLine>,
    pub payment_status: PaymentStatus,
}
