//! Voucher Redemption
//!
//! 两阶段兑换：下单时 `reserve`（校验 + 算折扣，不动配额），支付成交时
//! `commit`（条件 UPDATE 递增 `used`），取消/回收时 `release`。
//! 配额竞争在 commit 阶段裁决：落败方折扣照常生效，但会留下
//! `VoucherOversold` 审计记录供人工复核。

pub mod redemption;

pub use redemption::{CommitOutcome, Reservation};
