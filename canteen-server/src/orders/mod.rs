//! Order Domain
//!
//! # 生命周期
//!
//! ```text
//! 厨房状态:  PENDING → IN_PROGRESS → READY → PICKED_UP
//!                └────────── cancel（仅 PENDING）──→ CANCELLED
//! 支付状态:  UNPAID → PAID → REFUNDED
//! ```
//!
//! 两条状态机互相独立：PENDING 的订单可以已付款（取消时自动退款），
//! PICKED_UP 的订单也可能事后退款。金额不变式 `total = subtotal - discount`
//! 在创建时一次算定，行价格为下单时快照。

pub mod lifecycle;
pub mod reclaimer;

pub use reclaimer::StaleOrderReclaimer;
