//! Order model and status state machine

use super::actor::Actor;
use super::address::Address;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Order status
///
/// Forward flow is `Pending → Processing → Shipped → Delivered`.
/// `Cancelled` is reachable while the order has not shipped and admits
/// an admin reopen back to `Processing`. `Refunded` is reachable from
/// every status except `Cancelled` and `Refunded` themselves.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderStatus {
    #[default]
    Pending,
    Processing,
    Shipped,
    Delivered,
    Cancelled,
    Refunded,
}

impl OrderStatus {
    /// Whether the state machine admits a transition to `next`.
    ///
    /// Authorization and side effects (stock adjustment, history) are
    /// enforced by the order service, not here.
    pub fn can_transition_to(&self, next: OrderStatus) -> bool {
        use OrderStatus::*;
        matches!(
            (self, next),
            (Pending, Processing)
                | (Pending, Shipped)
                | (Pending, Cancelled)
                | (Pending, Refunded)
                | (Processing, Shipped)
                | (Processing, Cancelled)
                | (Processing, Refunded)
                | (Shipped, Delivered)
                | (Shipped, Refunded)
                | (Delivered, Refunded)
                | (Cancelled, Processing) // admin reopen
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "PENDING",
            Self::Processing => "PROCESSING",
            Self::Shipped => "SHIPPED",
            Self::Delivered => "DELIVERED",
            Self::Cancelled => "CANCELLED",
            Self::Refunded => "REFUNDED",
        }
    }
}

/// Immutable status history entry; the history is append-only.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusEntry {
    pub status: OrderStatus,
    pub timestamp: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
    /// Actor who performed the transition (user id)
    pub actor_id: String,
    /// Actor display name snapshot
    pub actor_name: String,
}

impl StatusEntry {
    pub fn new(status: OrderStatus, actor: &Actor, note: Option<String>) -> Self {
        Self {
            status,
            timestamp: crate::util::now_millis(),
            note,
            actor_id: actor.id.clone(),
            actor_name: actor.name.clone(),
        }
    }
}

/// One order line, snapshotted from the cart at placement
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderLine {
    /// Product reference (String ID)
    pub product_id: String,
    /// Product name snapshot
    pub name: String,
    /// Unit price snapshot at placement
    pub unit_price: Decimal,
    pub quantity: i64,
    /// unit_price × quantity, rounded to 2 decimal places
    pub line_subtotal: Decimal,
}

/// Shipment tracking info, attached when the order ships
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrackingInfo {
    pub carrier: String,
    pub tracking_number: String,
}

/// Refund record, attached when the order is refunded
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RefundRecord {
    pub amount: Decimal,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    pub refunded_at: i64,
    /// Whether line stock was returned (full refund only)
    pub restocked: bool,
}

/// Order entity
///
/// Orders are append-mostly after creation: fields are added, never
/// retracted, except `status` which transitions per [`OrderStatus`].
/// Invariant: `total = subtotal + shipping_cost + tax_amount` and the
/// last `status_history` entry's status equals `status`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Order {
    pub id: String,
    /// Human-facing order number (snowflake)
    pub order_number: i64,
    pub user_id: String,
    pub items: Vec<OrderLine>,
    pub subtotal: Decimal,
    pub shipping_cost: Decimal,
    pub tax_amount: Decimal,
    pub total: Decimal,
    pub status: OrderStatus,
    /// Append-only; never rewritten
    pub status_history: Vec<StatusEntry>,
    /// Shipping method id (from configuration)
    pub shipping_method: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub shipping_address: Option<Address>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tracking: Option<TrackingInfo>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub delivered_at: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub refund: Option<RefundRecord>,
    pub created_at: i64,
    pub updated_at: i64,
}
