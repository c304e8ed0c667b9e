//! Catalog Item Model
//!
//! The core only reads items (price snapshot at order creation).
//! Item administration lives outside this service.

use serde::{Deserialize, Serialize};

/// Catalog item
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "db", derive(sqlx::FromRow))]
pub struct Item {
    pub id: i64,
    pub name: String,
    /// Price in minor units
    pub price: i64,
    pub is_active: bool,
    pub created_at: i64,
}

/// Create item payload (seeding and fixtures)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ItemCreate {
    pub name: String,
    pub price: i64,
}
