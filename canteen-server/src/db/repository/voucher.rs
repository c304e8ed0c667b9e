//! Voucher Repository
//!
//! `used` 只允许 commit 阶段通过条件 UPDATE 递增，其他代码不得改写。

use super::{RepoError, RepoResult};
use shared::models::{Voucher, VoucherCreate};
use sqlx::SqlitePool;

const SELECT_VOUCHER: &str =
    "SELECT id, code, kind, value, start_at, end_at, quota, used, created_at FROM voucher";

pub async fn create(pool: &SqlitePool, data: VoucherCreate) -> RepoResult<Voucher> {
    let id = shared::util::snowflake_id();
    let now = shared::util::now_millis();
    let code = data.code.trim().to_uppercase();
    sqlx::query(
        "INSERT INTO voucher (id, code, kind, value, start_at, end_at, quota, used, created_at) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, 0, ?8)",
    )
    .bind(id)
    .bind(&code)
    .bind(data.kind)
    .bind(data.value)
    .bind(data.start_at)
    .bind(data.end_at)
    .bind(data.quota)
    .bind(now)
    .execute(pool)
    .await?;

    find_by_code(pool, &code)
        .await?
        .ok_or_else(|| RepoError::Database("Failed to create voucher".into()))
}

/// Lookup by normalized code (caller normalizes).
pub async fn find_by_code(pool: &SqlitePool, code: &str) -> RepoResult<Option<Voucher>> {
    let voucher = sqlx::query_as::<_, Voucher>(&format!("{SELECT_VOUCHER} WHERE code = ?"))
        .bind(code)
        .fetch_optional(pool)
        .await?;
    Ok(voucher)
}

/// Atomic conditional increment of `used`.
///
/// Returns false when the quota is already exhausted — the losing side of
/// the reserve/commit race.
pub async fn increment_used(
    tx: &mut sqlx::Transaction<'_, sqlx::Sqlite>,
    code: &str,
) -> RepoResult<bool> {
    let rows = sqlx::query(
        "UPDATE voucher SET used = used + 1 WHERE code = ? AND (quota = 0 OR used < quota)",
    )
    .bind(code)
    .execute(&mut **tx)
    .await?;
    Ok(rows.rows_affected() > 0)
}
