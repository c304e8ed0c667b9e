//! Loyalty Points Model
//!
//! Append-only ledger; a user's balance is the sum of all deltas.

use serde::{Deserialize, Serialize};

/// Points ledger entry
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "db", derive(sqlx::FromRow))]
pub struct PointsLedgerEntry {
    pub id: i64,
    pub user_id: i64,
    pub order_id: Option<i64>,
    pub delta: i64,
    pub reason: String,
    pub created_at: i64,
}

/// Points balance with paged ledger history
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PointsSummary {
    pub balance: i64,
    pub entries: Vec<PointsLedgerEntry>,
    pub page: i64,
    pub page_size: i64,
}
