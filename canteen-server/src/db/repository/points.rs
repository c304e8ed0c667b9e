//! Points Ledger Repository
//!
//! 只追加；余额 = SUM(delta)。

use super::RepoResult;
use shared::models::PointsLedgerEntry;
use sqlx::SqlitePool;

const SELECT_ENTRY: &str =
    "SELECT id, user_id, order_id, delta, reason, created_at FROM points_ledger";

pub async fn insert(
    tx: &mut sqlx::Transaction<'_, sqlx::Sqlite>,
    entry: &PointsLedgerEntry,
) -> RepoResult<()> {
    sqlx::query(
        "INSERT INTO points_ledger (id, user_id, order_id, delta, reason, created_at) VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
    )
    .bind(entry.id)
    .bind(entry.user_id)
    .bind(entry.order_id)
    .bind(entry.delta)
    .bind(&entry.reason)
    .bind(entry.created_at)
    .execute(&mut **tx)
    .await?;
    Ok(())
}

pub async fn balance(pool: &SqlitePool, user_id: i64) -> RepoResult<i64> {
    let balance = sqlx::query_scalar::<_, i64>(
        "SELECT COALESCE(SUM(delta), 0) FROM points_ledger WHERE user_id = ?",
    )
    .bind(user_id)
    .fetch_one(pool)
    .await?;
    Ok(balance)
}

pub async fn find_by_user(
    pool: &SqlitePool,
    user_id: i64,
    limit: i64,
    offset: i64,
) -> RepoResult<Vec<PointsLedgerEntry>> {
    let entries = sqlx::query_as::<_, PointsLedgerEntry>(&format!(
        "{SELECT_ENTRY} WHERE user_id = ? ORDER BY created_at DESC, id DESC LIMIT ? OFFSET ?"
    ))
    .bind(user_id)
    .bind(limit)
    .bind(offset)
    .fetch_all(pool)
    .await?;
    Ok(entries)
}

/// Accrual rows tied to one order (the at-most-once assertion reads this).
pub async fn find_by_order(pool: &SqlitePool, order_id: i64) -> RepoResult<Vec<PointsLedgerEntry>> {
    let entries = sqlx::query_as::<_, PointsLedgerEntry>(&format!(
        "{SELECT_ENTRY} WHERE order_id = ? ORDER BY id"
    ))
    .bind(order_id)
    .fetch_all(pool)
    .await?;
    Ok(entries)
}
