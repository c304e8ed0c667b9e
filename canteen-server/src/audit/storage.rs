//! 审计日志 SQLite 存储
//!
//! 只追加：没有更新/删除接口。detail 以 JSON 文本落库。

use sqlx::SqlitePool;

use super::types::{AuditAction, AuditEntry};
use crate::db::repository::RepoResult;

const SELECT_ENTRY: &str = "SELECT id, action, entity_type, entity_id, actor_id, actor_name, detail, created_at FROM audit_log";

/// 审计日志存储
#[derive(Clone)]
pub struct AuditStorage {
    pool: SqlitePool,
}

impl AuditStorage {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// 追加一条审计记录
    pub async fn append(
        &self,
        action: AuditAction,
        entity_type: String,
        entity_id: String,
        actor_id: Option<i64>,
        actor_name: Option<String>,
        detail: serde_json::Value,
    ) -> RepoResult<AuditEntry> {
        let id = shared::util::snowflake_id();
        let created_at = shared::util::now_millis();
        sqlx::query(
            "INSERT INTO audit_log (id, action, entity_type, entity_id, actor_id, actor_name, detail, created_at) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
        )
        .bind(id)
        .bind(action)
        .bind(&entity_type)
        .bind(&entity_id)
        .bind(actor_id)
        .bind(&actor_name)
        .bind(&detail)
        .bind(created_at)
        .execute(&self.pool)
        .await?;

        Ok(AuditEntry {
            id,
            action,
            entity_type,
            entity_id,
            actor_id,
            actor_name,
            detail,
            created_at,
        })
    }

    /// 按实体查询（人工复核入口）
    pub async fn find_by_entity(
        &self,
        entity_type: &str,
        entity_id: &str,
    ) -> RepoResult<Vec<AuditEntry>> {
        let entries = sqlx::query_as::<_, AuditEntry>(&format!(
            "{SELECT_ENTRY} WHERE entity_type = ?1 AND entity_id = ?2 ORDER BY created_at ASC, id ASC"
        ))
        .bind(entity_type)
        .bind(entity_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(entries)
    }
}
