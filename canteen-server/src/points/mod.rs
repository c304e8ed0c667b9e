//! Loyalty Points Accrual
//!
//! 每 10000 最小货币单位（100.00）累 1 分，向下取整；0 分不写行。
//! 每单至多一条累积记录，由 capture 的条件翻转保证，这里不再加锁。

use shared::models::{Order, PointsLedgerEntry};

use crate::db::repository::{RepoResult, points};

/// 每累 1 积分需要的最小货币单位数
pub const MINOR_UNITS_PER_POINT: i64 = 10_000;

/// 成交累积的流水原因标签
pub const REASON_PAYMENT_CAPTURE: &str = "PAYMENT_CAPTURE";

/// Whole points earned by a paid total.
pub fn points_for_total(total: i64) -> i64 {
    if total <= 0 {
        return 0;
    }
    total / MINOR_UNITS_PER_POINT
}

/// 在 capture 事务内累积积分；返回累积点数（0 = 未写行）
pub async fn accrue(
    tx: &mut sqlx::Transaction<'_, sqlx::Sqlite>,
    order: &Order,
    now: i64,
) -> RepoResult<i64> {
    let earned = points_for_total(order.total);
    if earned == 0 {
        return Ok(0);
    }

    let entry = PointsLedgerEntry {
        id: shared::util::snowflake_id(),
        user_id: order.user_id,
        order_id: Some(order.id),
        delta: earned,
        reason: REASON_PAYMENT_CAPTURE.to_string(),
        created_at: now,
    };
    points::insert(tx, &entry).await?;
    Ok(earned)
}
