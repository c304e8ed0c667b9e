//! User Notification Model
//!
//! In-app notification rows written by the server (order status changes,
//! payment confirmations, points credits). Delivery and read-state APIs
//! live outside this service.

use serde::{Deserialize, Serialize};

/// Notification kind constants
pub const NOTIFY_ORDER_STATUS: &str = "ORDER_STATUS";
pub const NOTIFY_PAYMENT: &str = "PAYMENT";
pub const NOTIFY_POINTS: &str = "POINTS";

/// User notification row
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "db", derive(sqlx::FromRow))]
pub struct UserNotification {
    pub id: i64,
    pub user_id: i64,
    pub title: String,
    pub body: String,
    pub kind: String,
    pub reference_id: Option<i64>,
    pub is_read: bool,
    pub created_at: i64,
}
