//! Item Repository
//!
//! 菜单目录的只读入口（价格快照）；管理端维护不在本服务内。

use super::RepoResult;
use shared::models::{Item, ItemCreate};
use sqlx::SqlitePool;

const SELECT_ITEM: &str = "SELECT id, name, price, is_active, created_at FROM item";

pub async fn create(pool: &SqlitePool, data: ItemCreate) -> RepoResult<Item> {
    let id = shared::util::snowflake_id();
    let now = shared::util::now_millis();
    sqlx::query("INSERT INTO item (id, name, price, is_active, created_at) VALUES (?1, ?2, ?3, 1, ?4)")
        .bind(id)
        .bind(&data.name)
        .bind(data.price)
        .bind(now)
        .execute(pool)
        .await?;

    Ok(Item {
        id,
        name: data.name,
        price: data.price,
        is_active: true,
        created_at: now,
    })
}

/// Fetch the active items among `ids` (order creation price snapshot).
///
/// Missing or inactive ids are simply absent from the result; the caller
/// decides whether that is an error.
pub async fn find_active_by_ids(pool: &SqlitePool, ids: &[i64]) -> RepoResult<Vec<Item>> {
    if ids.is_empty() {
        return Ok(Vec::new());
    }

    let placeholders = vec!["?"; ids.len()].join(", ");
    let sql = format!("{SELECT_ITEM} WHERE is_active = 1 AND id IN ({placeholders})");

    let mut query = sqlx::query_as::<_, Item>(&sql);
    for id in ids {
        query = query.bind(id);
    }
    let items = query.fetch_all(pool).await?;
    Ok(items)
}
