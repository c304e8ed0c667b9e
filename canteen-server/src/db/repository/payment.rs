//! Payment Transaction Repository
//!
//! 流水表追加写；仅 VOUCHER_APPLY 行允许改状态或删除（见模型说明）。

use super::RepoResult;
use shared::models::{PaymentAction, PaymentTransaction, PaymentTxnStatus};
use sqlx::SqlitePool;

const SELECT_TXN: &str = "SELECT id, order_id, method, action, status, ref_code, amount, actor_id, created_at FROM payment_transaction";

pub async fn insert(
    tx: &mut sqlx::Transaction<'_, sqlx::Sqlite>,
    txn: &PaymentTransaction,
) -> RepoResult<()> {
    sqlx::query(
        "INSERT INTO payment_transaction (id, order_id, method, action, status, ref_code, amount, actor_id, created_at) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
    )
    .bind(txn.id)
    .bind(txn.order_id)
    .bind(&txn.method)
    .bind(txn.action)
    .bind(txn.status)
    .bind(&txn.ref_code)
    .bind(txn.amount)
    .bind(txn.actor_id)
    .bind(txn.created_at)
    .execute(&mut **tx)
    .await?;
    Ok(())
}

/// Full reconciliation trail of an order, oldest first.
pub async fn find_by_order(
    pool: &SqlitePool,
    order_id: i64,
) -> RepoResult<Vec<PaymentTransaction>> {
    let txns = sqlx::query_as::<_, PaymentTransaction>(&format!(
        "{SELECT_TXN} WHERE order_id = ? ORDER BY created_at ASC, id ASC"
    ))
    .bind(order_id)
    .fetch_all(pool)
    .await?;
    Ok(txns)
}

/// PENDING voucher reservations of an order (commit walks these).
pub async fn find_pending_voucher_apply(
    tx: &mut sqlx::Transaction<'_, sqlx::Sqlite>,
    order_id: i64,
) -> RepoResult<Vec<PaymentTransaction>> {
    let txns = sqlx::query_as::<_, PaymentTransaction>(&format!(
        "{SELECT_TXN} WHERE order_id = ?1 AND action = ?2 AND status = ?3 ORDER BY id"
    ))
    .bind(order_id)
    .bind(PaymentAction::VoucherApply)
    .bind(PaymentTxnStatus::Pending)
    .fetch_all(&mut **tx)
    .await?;
    Ok(txns)
}

/// Flip one reservation row PENDING→SUCCESS at capture.
pub async fn mark_voucher_apply_success(
    tx: &mut sqlx::Transaction<'_, sqlx::Sqlite>,
    txn_id: i64,
) -> RepoResult<()> {
    sqlx::query("UPDATE payment_transaction SET status = ?1 WHERE id = ?2 AND status = ?3")
        .bind(PaymentTxnStatus::Success)
        .bind(txn_id)
        .bind(PaymentTxnStatus::Pending)
        .execute(&mut **tx)
        .await?;
    Ok(())
}

/// Drop PENDING reservations on cancel/reclaim; `used` was never touched.
pub async fn delete_pending_voucher_apply(
    tx: &mut sqlx::Transaction<'_, sqlx::Sqlite>,
    order_id: i64,
) -> RepoResult<u64> {
    let rows = sqlx::query(
        "DELETE FROM payment_transaction WHERE order_id = ?1 AND action = ?2 AND status = ?3",
    )
    .bind(order_id)
    .bind(PaymentAction::VoucherApply)
    .bind(PaymentTxnStatus::Pending)
    .execute(&mut **tx)
    .await?;
    Ok(rows.rows_affected())
}
