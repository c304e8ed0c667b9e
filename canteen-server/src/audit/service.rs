//! 审计日志服务
//!
//! `AuditService` 是审计日志的写入口：请求通过 mpsc 通道异步
//! 交给后台 worker 落库，调用方永远不会因为审计失败而出错。

use std::sync::Arc;
use tokio::sync::mpsc;

use super::types::AuditAction;

/// 发送到 AuditService 的日志请求
pub struct AuditLogRequest {
    pub action: AuditAction,
    pub entity_type: String,
    pub entity_id: String,
    pub actor_id: Option<i64>,
    pub actor_name: Option<String>,
    pub detail: serde_json::Value,
}

/// 审计日志服务
///
/// 通过 mpsc 通道接收日志请求，由 [`super::AuditWorker`] 异步写入。
pub struct AuditService {
    tx: mpsc::Sender<AuditLogRequest>,
}

impl std::fmt::Debug for AuditService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuditService").finish_non_exhaustive()
    }
}

impl AuditService {
    /// 创建审计服务，返回 (服务, worker 的接收端)
    pub fn new(buffer_size: usize) -> (Arc<Self>, mpsc::Receiver<AuditLogRequest>) {
        let (tx, rx) = mpsc::channel(buffer_size);
        (Arc::new(Self { tx }), rx)
    }

    /// 异步记录审计日志（非阻塞）
    ///
    /// 通过 mpsc 通道发送到后台 worker。
    /// 如果通道满，阻塞等待（审计日志不允许丢失）。
    pub async fn log(
        &self,
        action: AuditAction,
        entity_type: impl Into<String>,
        entity_id: impl Into<String>,
        actor_id: Option<i64>,
        actor_name: Option<String>,
        detail: serde_json::Value,
    ) {
        let req = AuditLogRequest {
            action,
            entity_type: entity_type.into(),
            entity_id: entity_id.into(),
            actor_id,
            actor_name,
            detail,
        };

        // 阻塞发送 — 审计日志不允许丢失
        if self.tx.send(req).await.is_err() {
            tracing::error!("Audit log channel closed — audit entry lost!");
        }
    }
}
