//! 站内通知
//!
//! 订单状态变化、支付结果、积分到账时为用户写入一条通知行。
//! 尽力而为：写入失败只记日志，绝不影响业务事务。
//! 拉取与已读接口由外部通知服务提供。

use shared::models::UserNotification;
use sqlx::SqlitePool;

use crate::db::repository::notification;

/// 通知写入口
#[derive(Clone, Debug)]
pub struct Notifier {
    pool: SqlitePool,
}

impl Notifier {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// 写入一条通知（best-effort，失败只记日志）
    pub async fn enqueue(
        &self,
        user_id: i64,
        title: impl Into<String>,
        body: impl Into<String>,
        kind: &str,
        reference_id: Option<i64>,
    ) {
        let notification = UserNotification {
            id: shared::util::snowflake_id(),
            user_id,
            title: title.into(),
            body: body.into(),
            kind: kind.to_string(),
            reference_id,
            is_read: false,
            created_at: shared::util::now_millis(),
        };

        if let Err(e) = notification::insert(&self.pool, &notification).await {
            tracing::warn!(user_id, kind, "Failed to enqueue notification: {e}");
        }
    }
}
