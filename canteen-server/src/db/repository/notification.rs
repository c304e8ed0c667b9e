//! User Notification Repository
//!
//! 服务端只写入；读取与已读状态由外部 API 负责。

use super::RepoResult;
use shared::models::UserNotification;
use sqlx::SqlitePool;

const SELECT_NOTIFICATION: &str = "SELECT id, user_id, title, body, kind, reference_id, is_read, created_at FROM user_notification";

pub async fn insert(pool: &SqlitePool, notification: &UserNotification) -> RepoResult<()> {
    sqlx::query(
        "INSERT INTO user_notification (id, user_id, title, body, kind, reference_id, is_read, created_at) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
    )
    .bind(notification.id)
    .bind(notification.user_id)
    .bind(&notification.title)
    .bind(&notification.body)
    .bind(&notification.kind)
    .bind(notification.reference_id)
    .bind(notification.is_read)
    .bind(notification.created_at)
    .execute(pool)
    .await?;
    Ok(())
}

pub async fn find_by_user(pool: &SqlitePool, user_id: i64) -> RepoResult<Vec<UserNotification>> {
    let notifications = sqlx::query_as::<_, UserNotification>(&format!(
        "{SELECT_NOTIFICATION} WHERE user_id = ? ORDER BY created_at DESC, id DESC"
    ))
    .bind(user_id)
    .fetch_all(pool)
    .await?;
    Ok(notifications)
}
