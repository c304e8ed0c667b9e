//! 代金券兑换引擎
//!
//! reserve 阶段只做乐观校验，真正的配额裁决由 commit 阶段的条件
//! UPDATE 完成，两个并发订单不会把 `used` 推过 `quota`。

use rust_decimal::prelude::*;
use shared::AppError;
use shared::models::{Voucher, VoucherKind, VoucherPreview};
use sqlx::SqlitePool;

use crate::db::repository::{RepoResult, payment, voucher};

/// 通过校验的预留：下单时应用的折扣额
#[derive(Debug, Clone)]
pub struct Reservation {
    /// Normalized voucher code
    pub code: String,
    /// Discount in minor units, already clamped to [0, subtotal]
    pub discount: i64,
}

/// commit 的裁决结果
#[derive(Debug, Clone, Default)]
pub struct CommitOutcome {
    /// Codes whose quota increment succeeded
    pub committed: Vec<String>,
    /// Codes that lost the quota race; the discount stands anyway
    pub oversold: Vec<String>,
}

/// Normalize a user-supplied code: trim + uppercase.
pub fn normalize(code: &str) -> String {
    code.trim().to_uppercase()
}

/// 校验有效期与配额；返回机器可读的拒绝原因
fn check(voucher: &Voucher, now: i64) -> Result<(), &'static str> {
    if let Some(start) = voucher.start_at
        && now < start
    {
        return Err("not_started");
    }
    if let Some(end) = voucher.end_at
        && now > end
    {
        return Err("expired");
    }
    if voucher.quota > 0 && voucher.used >= voucher.quota {
        return Err("exhausted");
    }
    Ok(())
}

/// Discount for a voucher against a subtotal, in minor units.
///
/// PERCENT rounds half away from zero to whole minor units; the result is
/// clamped to [0, subtotal] so `total` can never go negative.
pub fn compute_discount(kind: VoucherKind, value: i64, subtotal: i64) -> i64 {
    let raw = match kind {
        VoucherKind::Percent => {
            let pct = value.clamp(0, 100);
            (Decimal::from(subtotal) * Decimal::from(pct) / Decimal::from(100))
                .round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero)
                .to_i64()
                .unwrap_or(0)
        }
        VoucherKind::Amount => value,
    };
    raw.clamp(0, subtotal)
}

/// 预留代金券：校验 + 折扣计算，不写任何东西
///
/// `used` 在这里不会递增；调用方负责把 PENDING 的 VOUCHER_APPLY
/// 流水写进自己的事务。
pub async fn reserve(
    pool: &SqlitePool,
    code: &str,
    subtotal: i64,
    now: i64,
) -> Result<Reservation, AppError> {
    let normalized = normalize(code);
    let voucher = voucher::find_by_code(pool, &normalized)
        .await?
        .ok_or_else(|| AppError::voucher_invalid("unknown"))?;
    check(&voucher, now).map_err(AppError::voucher_invalid)?;

    Ok(Reservation {
        code: normalized,
        discount: compute_discount(voucher.kind, voucher.value, subtotal),
    })
}

/// 支付成交时裁决该订单的全部 PENDING 预留
///
/// 每一行：条件递增配额，成功则改 SUCCESS；配额竞争落败时折扣照常
/// 生效，行同样改 SUCCESS，代码记入 `oversold` 由调用方发审计。
pub async fn commit(
    tx: &mut sqlx::Transaction<'_, sqlx::Sqlite>,
    order_id: i64,
) -> RepoResult<CommitOutcome> {
    let pending = payment::find_pending_voucher_apply(tx, order_id).await?;

    let mut outcome = CommitOutcome::default();
    for txn in pending {
        let code = txn.ref_code.clone();
        if voucher::increment_used(tx, &code).await? {
            outcome.committed.push(code);
        } else {
            outcome.oversold.push(code);
        }
        payment::mark_voucher_apply_success(tx, txn.id).await?;
    }
    Ok(outcome)
}

/// 释放预留（取消/回收）：删 PENDING 行即可，配额从未动过
pub async fn release(
    tx: &mut sqlx::Transaction<'_, sqlx::Sqlite>,
    order_id: i64,
) -> RepoResult<u64> {
    payment::delete_pending_voucher_apply(tx, order_id).await
}

/// 试算代金券（软结果，永不因无效代码报错）
pub async fn preview(
    pool: &SqlitePool,
    code: &str,
    subtotal: i64,
    now: i64,
) -> RepoResult<VoucherPreview> {
    let normalized = normalize(code);
    let Some(voucher) = voucher::find_by_code(pool, &normalized).await? else {
        return Ok(VoucherPreview {
            valid: false,
            discount: 0,
            reason: Some("unknown".into()),
        });
    };

    if let Err(reason) = check(&voucher, now) {
        return Ok(VoucherPreview {
            valid: false,
            discount: 0,
            reason: Some(reason.into()),
        });
    }

    Ok(VoucherPreview {
        valid: true,
        discount: compute_discount(voucher.kind, voucher.value, subtotal),
        reason: None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::DbService;
    use shared::models::VoucherCreate;

    #[test]
    fn test_percent_discount_rounds_half_away_from_zero() {
        // 10% of 50000 = 5000, exact
        assert_eq!(compute_discount(VoucherKind::Percent, 10, 50000), 5000);
        // 10% of 125 = 12.5 → 13
        assert_eq!(compute_discount(VoucherKind::Percent, 10, 125), 13);
        // 10% of 124 = 12.4 → 12
        assert_eq!(compute_discount(VoucherKind::Percent, 10, 124), 12);
        // 33% of 100 = 33
        assert_eq!(compute_discount(VoucherKind::Percent, 33, 100), 33);
    }

    #[test]
    fn test_percent_value_clamped_to_0_100() {
        assert_eq!(compute_discount(VoucherKind::Percent, 150, 1000), 1000);
        assert_eq!(compute_discount(VoucherKind::Percent, -5, 1000), 0);
    }

    #[test]
    fn test_amount_discount_clamped_to_subtotal() {
        assert_eq!(compute_discount(VoucherKind::Amount, 3000, 10000), 3000);
        assert_eq!(compute_discount(VoucherKind::Amount, 30000, 10000), 10000);
        assert_eq!(compute_discount(VoucherKind::Amount, -100, 10000), 0);
    }

    #[test]
    fn test_normalize_trims_and_uppercases() {
        assert_eq!(normalize("  sale10 "), "SALE10");
        assert_eq!(normalize("SALE10"), "SALE10");
    }

    async fn seed_voucher(pool: &SqlitePool, data: VoucherCreate) {
        crate::db::repository::voucher::create(pool, data)
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_preview_unknown_code() {
        let db = DbService::new_in_memory().await.unwrap();
        let preview = preview(&db.pool, "NOPE", 10000, 0).await.unwrap();
        assert!(!preview.valid);
        assert_eq!(preview.discount, 0);
        assert_eq!(preview.reason.as_deref(), Some("unknown"));
    }

    #[tokio::test]
    async fn test_preview_validity_window() {
        let db = DbService::new_in_memory().await.unwrap();
        seed_voucher(
            &db.pool,
            VoucherCreate {
                code: "WINDOW".into(),
                kind: VoucherKind::Amount,
                value: 500,
                start_at: Some(1000),
                end_at: Some(2000),
                quota: 0,
            },
        )
        .await;

        let before = preview(&db.pool, "WINDOW", 10000, 999).await.unwrap();
        assert_eq!(before.reason.as_deref(), Some("not_started"));

        let inside = preview(&db.pool, "WINDOW", 10000, 1500).await.unwrap();
        assert!(inside.valid);
        assert_eq!(inside.discount, 500);

        let after = preview(&db.pool, "WINDOW", 10000, 2001).await.unwrap();
        assert_eq!(after.reason.as_deref(), Some("expired"));
    }

    #[tokio::test]
    async fn test_reserve_normalizes_and_computes() {
        let db = DbService::new_in_memory().await.unwrap();
        seed_voucher(
            &db.pool,
            VoucherCreate {
                code: "SALE10".into(),
                kind: VoucherKind::Percent,
                value: 10,
                start_at: None,
                end_at: None,
                quota: 0,
            },
        )
        .await;

        let reservation = reserve(&db.pool, "  sale10 ", 50000, 0).await.unwrap();
        assert_eq!(reservation.code, "SALE10");
        assert_eq!(reservation.discount, 5000);
    }

    #[tokio::test]
    async fn test_reserve_rejects_exhausted_quota() {
        let db = DbService::new_in_memory().await.unwrap();
        seed_voucher(
            &db.pool,
            VoucherCreate {
                code: "ONCE".into(),
                kind: VoucherKind::Amount,
                value: 100,
                start_at: None,
                end_at: None,
                quota: 1,
            },
        )
        .await;

        let mut tx = db.pool.begin().await.unwrap();
        assert!(
            crate::db::repository::voucher::increment_used(&mut tx, "ONCE")
                .await
                .unwrap()
        );
        tx.commit().await.unwrap();

        let err = reserve(&db.pool, "ONCE", 10000, 0).await.unwrap_err();
        assert_eq!(err.code, shared::ErrorCode::VoucherInvalid);
    }
}
