//! Payment Transaction Model
//!
//! The payment transaction table is the reconciliation trail for money and
//! discounts. Rows are append-only with one exception: a VOUCHER_APPLY row
//! flips PENDING to SUCCESS at capture, or is deleted when the order is
//! cancelled before capture.

use serde::{Deserialize, Serialize};

/// Transaction action
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[cfg_attr(feature = "db", derive(sqlx::Type))]
#[cfg_attr(feature = "db", sqlx(rename_all = "SCREAMING_SNAKE_CASE"))]
pub enum PaymentAction {
    Intent,
    Capture,
    Refund,
    VoucherApply,
}

/// Transaction status
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[cfg_attr(feature = "db", derive(sqlx::Type))]
#[cfg_attr(feature = "db", sqlx(rename_all = "SCREAMING_SNAKE_CASE"))]
pub enum PaymentTxnStatus {
    Pending,
    Success,
}

/// Payment transaction ledger entry
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "db", derive(sqlx::FromRow))]
pub struct PaymentTransaction {
    pub id: i64,
    pub order_id: i64,
    pub method: String,
    pub action: PaymentAction,
    pub status: PaymentTxnStatus,
    pub ref_code: String,
    /// Amount in minor units
    pub amount: i64,
    pub actor_id: Option<i64>,
    pub created_at: i64,
}

/// Payment intent request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IntentRequest {
    pub order_id: i64,
    pub method: Option<String>,
}

/// Payment intent receipt (QR payload for client display)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IntentReceipt {
    pub order_id: i64,
    pub qr_payload: String,
    pub ref_code: String,
    /// Unix millis when the payload stops being displayable
    pub expires_at: i64,
}

/// Payment capture request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CaptureRequest {
    pub order_id: i64,
    pub ref_code: Option<String>,
    pub note: Option<String>,
}

/// Payment capture receipt
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CaptureReceipt {
    pub order_id: i64,
    pub total: i64,
    pub points_earned: i64,
    pub paid_at: i64,
}

/// Refund request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RefundRequest {
    pub order_id: i64,
    pub reason: Option<String>,
}
