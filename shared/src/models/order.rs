//! Order Model

use serde::{Deserialize, Serialize};

/// Kitchen-facing order status
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[cfg_attr(feature = "db", derive(sqlx::Type))]
#[cfg_attr(feature = "db", sqlx(rename_all = "SCREAMING_SNAKE_CASE"))]
pub enum OrderStatus {
    #[default]
    Pending,
    InProgress,
    Ready,
    PickedUp,
    Cancelled,
}

impl OrderStatus {
    /// String form as stored in the database / JSON
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "PENDING",
            Self::InProgress => "IN_PROGRESS",
            Self::Ready => "READY",
            Self::PickedUp => "PICKED_UP",
            Self::Cancelled => "CANCELLED",
        }
    }
}

/// Payment status of an order
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[cfg_attr(feature = "db", derive(sqlx::Type))]
#[cfg_attr(feature = "db", sqlx(rename_all = "SCREAMING_SNAKE_CASE"))]
pub enum PaymentStatus {
    #[default]
    Unpaid,
    Paid,
    Refunded,
}

impl PaymentStatus {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Unpaid => "UNPAID",
            Self::Paid => "PAID",
            Self::Refunded => "REFUNDED",
        }
    }
}

/// Order entity
///
/// Amounts are integer minor units. `total = subtotal - discount` always.
/// Orders are never deleted; cancellation is a status transition.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "db", derive(sqlx::FromRow))]
pub struct Order {
    pub id: i64,
    pub user_id: i64,
    pub subtotal: i64,
    pub discount: i64,
    pub total: i64,
    pub status: OrderStatus,
    pub payment_status: PaymentStatus,
    pub payment_method: String,
    pub payment_ref: Option<String>,
    pub voucher_code: Option<String>,
    pub eta_minutes: i64,
    pub note: Option<String>,
    pub created_at: i64,
    pub paid_at: Option<i64>,
}

/// Order line (price captured at creation, never re-derived)
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "db", derive(sqlx::FromRow))]
pub struct OrderLine {
    pub id: i64,
    pub order_id: i64,
    pub item_id: i64,
    pub name: String,
    pub unit_price: i64,
    pub quantity: i64,
    pub note: Option<String>,
}

/// Single line of a create-order request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderLineInput {
    pub item_id: i64,
    pub quantity: i64,
    pub note: Option<String>,
}

/// Create order payload
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderCreate {
    pub lines: Vec<OrderLineInput>,
    pub payment_method: Option<String>,
    pub voucher_code: Option<String>,
    pub eta_minutes: Option<i64>,
    pub note: Option<String>,
}

/// Order summary returned after mutations and in lists
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "db", derive(sqlx::FromRow))]
pub struct OrderSummary {
    pub id: i64,
    pub subtotal: i64,
    pub discount: i64,
    pub total: i64,
    pub status: OrderStatus,
    pub payment_status: PaymentStatus,
    pub payment_method: String,
    pub created_at: i64,
}

/// Full order with lines (detail view)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderDetail {
    #[serde(flatten)]
    pub order: Order,
    pub lines: Vec<OrderLine>,
}

/// Kitchen display ticket (KDS queue view)
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "db", derive(sqlx::FromRow))]
pub struct KdsTicket {
    pub id: i64,
    pub status: OrderStatus,
    pub payment_status: PaymentStatus,
    pub total: i64,
    pub created_at: i64,
}

/// Kitchen status update payload
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KitchenStatusUpdate {
    pub status: OrderStatus,
    pub note: Option<String>,
}
