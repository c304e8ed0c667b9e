use std::sync::{Arc, Mutex};

use sqlx::SqlitePool;
use tokio::sync::mpsc;

use crate::audit::{AuditLogRequest, AuditService, AuditStorage, AuditWorker};
use crate::core::tasks::{BackgroundTasks, TaskKind};
use crate::core::Config;
use crate::db::DbService;
use crate::notify::Notifier;
use crate::orders::StaleOrderReclaimer;
use crate::utils::AppError;

/// 审计通道缓冲大小
const AUDIT_CHANNEL_BUFFER: usize = 256;

/// 服务器状态 - 持有所有服务的共享引用
///
/// # 组件
///
/// | 字段 | 类型 | 说明 |
/// |------|------|------|
/// | config | Config | 配置项 (不可变) |
/// | pool | SqlitePool | SQLite 连接池 |
/// | audit | Arc<AuditService> | 审计日志写入口 |
/// | notifier | Notifier | 站内通知写入口 |
///
/// Clone 为浅拷贝（Arc / 池句柄），可安全放入 axum State。
#[derive(Clone, Debug)]
pub struct ServerState {
    /// 服务器配置
    pub config: Config,
    /// SQLite 连接池
    pub pool: SqlitePool,
    /// 审计日志服务
    pub audit: Arc<AuditService>,
    /// 站内通知服务
    pub notifier: Notifier,
    /// 审计 worker 的接收端，start_background_tasks 取走后置 None
    audit_rx: Arc<Mutex<Option<mpsc::Receiver<AuditLogRequest>>>>,
}

impl ServerState {
    /// 初始化服务器状态：打开数据库、跑迁移、装配各服务
    pub async fn initialize(config: &Config) -> Result<Self, AppError> {
        let db = DbService::new(&config.db_path()).await?;
        Ok(Self::with_db(config.clone(), db))
    }

    /// 使用现成的数据库装配状态（测试用内存库走这里）
    pub fn with_db(config: Config, db: DbService) -> Self {
        let (audit, audit_rx) = AuditService::new(AUDIT_CHANNEL_BUFFER);
        let notifier = Notifier::new(db.pool.clone());
        Self {
            config,
            pool: db.pool,
            audit,
            notifier,
            audit_rx: Arc::new(Mutex::new(Some(audit_rx))),
        }
    }

    /// 注册后台任务：审计落库 worker + 超时订单回收
    ///
    /// 只应调用一次；重复调用时审计接收端已被取走，直接跳过。
    pub fn start_background_tasks(&self, tasks: &mut BackgroundTasks) {
        let audit_rx = self.audit_rx.lock().ok().and_then(|mut rx| rx.take());
        match audit_rx {
            Some(rx) => {
                let worker = AuditWorker::new(AuditStorage::new(self.pool.clone()));
                tasks.spawn("audit_worker", TaskKind::Worker, worker.run(rx));
            }
            None => {
                tracing::warn!("Audit worker already started, skipping");
            }
        }

        let reclaimer = StaleOrderReclaimer::new(
            self.pool.clone(),
            self.notifier.clone(),
            self.audit.clone(),
            self.config.order_cancel_after_minutes,
            self.config.reclaim_interval_secs,
        );
        let token = tasks.shutdown_token();
        tasks.spawn(
            "stale_order_reclaimer",
            TaskKind::Periodic,
            reclaimer.run(token),
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_background_tasks_register_once() {
        let db = DbService::new_in_memory().await.unwrap();
        let state = ServerState::with_db(Config::with_overrides("/tmp/canteen-test", 0), db);

        let mut tasks = BackgroundTasks::new();
        state.start_background_tasks(&mut tasks);
        assert_eq!(tasks.len(), 2);

        // second call only re-registers the reclaimer, never a second audit worker
        state.start_background_tasks(&mut tasks);
        assert_eq!(tasks.len(), 3);

        tasks.shutdown().await;
    }
}
