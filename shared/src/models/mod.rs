//! Data models
//!
//! Shared between canteen-server and frontend (via API).
//! DB row types use `#[cfg_attr(feature = "db", derive(sqlx::FromRow))]`.
//! All IDs are `i64`, timestamps are Unix millis, money is integer minor units.

pub mod item;
pub mod notification;
pub mod order;
pub mod payment;
pub mod points;
pub mod voucher;

// Re-exports
pub use item::*;
pub use notification::*;
pub use order::*;
pub use payment::*;
pub use points::*;
pub use voucher::*;
