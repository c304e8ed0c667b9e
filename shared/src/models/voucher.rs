//! Voucher Model

use serde::{Deserialize, Serialize};

/// Voucher kind enum
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[cfg_attr(feature = "db", derive(sqlx::Type))]
#[cfg_attr(feature = "db", sqlx(rename_all = "SCREAMING_SNAKE_CASE"))]
pub enum VoucherKind {
    /// Fixed discount; `value` is minor units
    Amount,
    /// Percentage discount; `value` is a whole percent (10 = 10%)
    Percent,
}

/// Voucher entity
///
/// `quota = 0` means unlimited. `used` is incremented only when a
/// redemption commits at payment capture, never at reservation.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "db", derive(sqlx::FromRow))]
pub struct Voucher {
    pub id: i64,
    /// Normalized code (trimmed, uppercase)
    pub code: String,
    pub kind: VoucherKind,
    pub value: i64,
    /// Validity window start (Unix millis), open if absent
    pub start_at: Option<i64>,
    /// Validity window end (Unix millis), open if absent
    pub end_at: Option<i64>,
    pub quota: i64,
    pub used: i64,
    pub created_at: i64,
}

/// Create voucher payload (seeding and fixtures)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VoucherCreate {
    pub code: String,
    pub kind: VoucherKind,
    pub value: i64,
    pub start_at: Option<i64>,
    pub end_at: Option<i64>,
    /// 0 = unlimited
    pub quota: i64,
}

/// Voucher preview request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VoucherPreviewRequest {
    pub code: String,
    /// Subtotal in minor units
    pub subtotal: i64,
}

/// Voucher preview result (soft, never an error for an invalid code)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VoucherPreview {
    pub valid: bool,
    pub discount: i64,
    /// Why the voucher did not apply: unknown / not_started / expired / exhausted
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}
