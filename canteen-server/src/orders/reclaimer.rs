//! 超时订单回收任务
//!
//! 定期扫描 PENDING + UNPAID 且超过时限的订单，自动取消并释放
//! 代金券预留。整批在一个事务内落库；失败只记日志，下个 tick 重扫
//! 同一批，任务本身永不退出（除非收到 shutdown 信号）。

use std::sync::Arc;
use std::time::Duration;

use serde_json::json;
use sqlx::SqlitePool;
use tokio_util::sync::CancellationToken;

use shared::models::{NOTIFY_ORDER_STATUS, Order, OrderStatus};

use crate::audit::{AuditAction, AuditService};
use crate::db::repository::order;
use crate::notify::Notifier;
use crate::utils::AppError;
use crate::vouchers::redemption;

/// 回收任务
///
/// `now` 通过参数传入 [`sweep`](Self::sweep)，超时边界可在测试中
/// 精确钉死：`created_at ≤ now − cancel_after` 的订单被取消，刚好
/// 等于阈值的订单也在取消之列。
pub struct StaleOrderReclaimer {
    pool: SqlitePool,
    notifier: Notifier,
    audit: Arc<AuditService>,
    cancel_after_minutes: i64,
    interval_secs: u64,
}

impl StaleOrderReclaimer {
    pub fn new(
        pool: SqlitePool,
        notifier: Notifier,
        audit: Arc<AuditService>,
        cancel_after_minutes: i64,
        interval_secs: u64,
    ) -> Self {
        Self {
            pool,
            notifier,
            audit,
            cancel_after_minutes,
            interval_secs,
        }
    }

    /// 运行回收循环，直到 shutdown 信号
    pub async fn run(self, shutdown: CancellationToken) {
        tracing::info!(
            cancel_after_minutes = self.cancel_after_minutes,
            interval_secs = self.interval_secs,
            "Stale order reclaimer started"
        );

        let mut ticker = tokio::time::interval(Duration::from_secs(self.interval_secs));
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
        // 第一个 tick 立即完成，跳过以免启动即扫描
        ticker.tick().await;

        loop {
            tokio::select! {
                _ = shutdown.cancelled() => {
                    tracing::info!("Stale order reclaimer stopping");
                    break;
                }
                _ = ticker.tick() => {
                    match self.sweep(shared::util::now_millis()).await {
                        Ok(0) => {}
                        Ok(count) => {
                            tracing::info!(count, "Auto-cancelled stale unpaid orders");
                        }
                        Err(e) => {
                            // 下个 tick 重试同一批
                            tracing::error!("Stale order sweep failed, will retry: {e}");
                        }
                    }
                }
            }
        }
    }

    /// 执行一次扫描，返回取消的订单数
    ///
    /// 整批状态翻转和预留释放在一个事务内；通知和审计在提交后
    /// 逐单补发（尽力而为）。
    pub async fn sweep(&self, now: i64) -> Result<usize, AppError> {
        let cutoff = now - self.cancel_after_minutes * 60_000;

        let mut tx = self.pool.begin().await?;
        let stale = order::find_reclaimable(&mut tx, cutoff).await?;
        if stale.is_empty() {
            return Ok(0);
        }

        for order in &stale {
            // 条件翻转：被并发支付/取消抢先的订单自然落空
            order::transition_status(&mut tx, order.id, OrderStatus::Pending, OrderStatus::Cancelled)
                .await?;
            redemption::release(&mut tx, order.id).await?;
        }
        tx.commit().await?;

        for order in &stale {
            self.notify_cancelled(order).await;
            self.audit
                .log(
                    AuditAction::OrderAutoCancelled,
                    "order",
                    order.id.to_string(),
                    None,
                    None,
                    json!({
                        "user_id": order.user_id,
                        "total": order.total,
                        "created_at": order.created_at,
                        "age_minutes": (now - order.created_at) / 60_000,
                    }),
                )
                .await;
        }

        Ok(stale.len())
    }

    async fn notify_cancelled(&self, order: &Order) {
        self.notifier
            .enqueue(
                order.user_id,
                "Order cancelled",
                format!(
                    "Order {} was cancelled automatically because it was not paid within {} minutes",
                    order.id, self.cancel_after_minutes
                ),
                NOTIFY_ORDER_STATUS,
                Some(order.id),
            )
            .await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audit::{AuditStorage, AuditWorker};
    use crate::db::DbService;
    use crate::db::repository::{item, notification, payment, voucher};
    use crate::orders::lifecycle;
    use shared::models::{
        ItemCreate, OrderCreate, OrderLineInput, PaymentStatus, VoucherCreate, VoucherKind,
    };

    const MINUTE: i64 = 60_000;

    fn reclaimer(db: &DbService) -> (StaleOrderReclaimer, Arc<AuditService>) {
        let (audit, rx) = AuditService::new(16);
        tokio::spawn(AuditWorker::new(AuditStorage::new(db.pool.clone())).run(rx));
        let reclaimer = StaleOrderReclaimer::new(
            db.pool.clone(),
            Notifier::new(db.pool.clone()),
            audit.clone(),
            15,
            60,
        );
        (reclaimer, audit)
    }

    async fn seed_order(db: &DbService, user_id: i64, created_at: i64) -> Order {
        let item = item::create(
            &db.pool,
            ItemCreate {
                name: "Rice".into(),
                price: 3000,
            },
        )
        .await
        .unwrap();
        lifecycle::create_order(
            &db.pool,
            user_id,
            OrderCreate {
                lines: vec![OrderLineInput {
                    item_id: item.id,
                    quantity: 1,
                    note: None,
                }],
                payment_method: None,
                voucher_code: None,
                eta_minutes: None,
                note: None,
            },
            created_at,
        )
        .await
        .unwrap()
        .order
    }

    #[tokio::test]
    async fn test_sweep_respects_the_deadline() {
        let db = DbService::new_in_memory().await.unwrap();
        let (reclaimer, _audit) = reclaimer(&db);
        let order = seed_order(&db, 7, 0).await;

        // 14 minutes in: still pending
        assert_eq!(reclaimer.sweep(14 * MINUTE).await.unwrap(), 0);
        let stored = order::find_by_id(&db.pool, order.id).await.unwrap().unwrap();
        assert_eq!(stored.status, OrderStatus::Pending);

        // 16 minutes in: cancelled, one notification
        assert_eq!(reclaimer.sweep(16 * MINUTE).await.unwrap(), 1);
        let stored = order::find_by_id(&db.pool, order.id).await.unwrap().unwrap();
        assert_eq!(stored.status, OrderStatus::Cancelled);

        let notes = notification::find_by_user(&db.pool, 7).await.unwrap();
        assert_eq!(notes.len(), 1);

        // a later sweep leaves the cancelled order alone
        assert_eq!(reclaimer.sweep(30 * MINUTE).await.unwrap(), 0);
        let notes = notification::find_by_user(&db.pool, 7).await.unwrap();
        assert_eq!(notes.len(), 1);
    }

    #[tokio::test]
    async fn test_boundary_age_is_swept() {
        let db = DbService::new_in_memory().await.unwrap();
        let (reclaimer, _audit) = reclaimer(&db);
        let order = seed_order(&db, 7, 0).await;

        // created_at == now - threshold: cancelled (<= comparison)
        assert_eq!(reclaimer.sweep(15 * MINUTE).await.unwrap(), 1);
        let stored = order::find_by_id(&db.pool, order.id).await.unwrap().unwrap();
        assert_eq!(stored.status, OrderStatus::Cancelled);
    }

    #[tokio::test]
    async fn test_sweep_releases_voucher_reservation() {
        let db = DbService::new_in_memory().await.unwrap();
        let (reclaimer, _audit) = reclaimer(&db);
        voucher::create(
            &db.pool,
            VoucherCreate {
                code: "SALE10".into(),
                kind: VoucherKind::Percent,
                value: 10,
                start_at: None,
                end_at: None,
                quota: 5,
            },
        )
        .await
        .unwrap();

        let item = item::create(
            &db.pool,
            ItemCreate {
                name: "Set meal".into(),
                price: 50000,
            },
        )
        .await
        .unwrap();
        let detail = lifecycle::create_order(
            &db.pool,
            7,
            OrderCreate {
                lines: vec![OrderLineInput {
                    item_id: item.id,
                    quantity: 1,
                    note: None,
                }],
                payment_method: None,
                voucher_code: Some("SALE10".into()),
                eta_minutes: None,
                note: None,
            },
            0,
        )
        .await
        .unwrap();

        reclaimer.sweep(20 * MINUTE).await.unwrap();

        // pending reservation gone, quota never consumed
        let txns = payment::find_by_order(&db.pool, detail.order.id).await.unwrap();
        assert!(txns.is_empty());
        let voucher = voucher::find_by_code(&db.pool, "SALE10").await.unwrap().unwrap();
        assert_eq!(voucher.used, 0);
    }

    #[tokio::test]
    async fn test_paid_orders_are_never_swept() {
        let db = DbService::new_in_memory().await.unwrap();
        let (reclaimer, _audit) = reclaimer(&db);
        let order = seed_order(&db, 7, 0).await;

        // mark paid outside the sweep
        let mut tx = db.pool.begin().await.unwrap();
        assert!(order::flip_paid(&mut tx, order.id, None, MINUTE).await.unwrap());
        tx.commit().await.unwrap();

        assert_eq!(reclaimer.sweep(60 * MINUTE).await.unwrap(), 0);
        let stored = order::find_by_id(&db.pool, order.id).await.unwrap().unwrap();
        assert_eq!(stored.status, OrderStatus::Pending);
        assert_eq!(stored.payment_status, PaymentStatus::Paid);
    }

    #[tokio::test]
    async fn test_swept_order_cannot_be_captured() {
        use crate::auth::{CurrentUser, Role};
        use crate::db::repository::points;
        use crate::payments::gateway;
        use shared::ErrorCode;
        use shared::models::CaptureRequest;

        let db = DbService::new_in_memory().await.unwrap();
        let (reclaimer, _audit) = reclaimer(&db);
        let order = seed_order(&db, 7, 0).await;

        assert_eq!(reclaimer.sweep(16 * MINUTE).await.unwrap(), 1);

        // a stale QR scanned after the sweep must not charge the customer
        let err = gateway::capture(
            &db.pool,
            &Notifier::new(db.pool.clone()),
            CaptureRequest {
                order_id: order.id,
                ref_code: None,
                note: None,
            },
            &CurrentUser {
                id: 7,
                name: "user-7".into(),
                roles: vec![Role::User],
            },
            17 * MINUTE,
        )
        .await
        .unwrap_err();
        assert_eq!(err.code, ErrorCode::OrderInvalidTransition);

        let stored = order::find_by_id(&db.pool, order.id).await.unwrap().unwrap();
        assert_eq!(stored.status, OrderStatus::Cancelled);
        assert_eq!(stored.payment_status, PaymentStatus::Unpaid);
        assert_eq!(points::balance(&db.pool, 7).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_sweep_writes_audit_trail() {
        let db = DbService::new_in_memory().await.unwrap();
        let (reclaimer, _audit) = reclaimer(&db);
        let order = seed_order(&db, 7, 0).await;

        reclaimer.sweep(20 * MINUTE).await.unwrap();

        // the audit write is asynchronous; give the worker a moment
        let storage = AuditStorage::new(db.pool.clone());
        let mut entries = Vec::new();
        for _ in 0..20 {
            entries = storage
                .find_by_entity("order", &order.id.to_string())
                .await
                .unwrap();
            if !entries.is_empty() {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].action, AuditAction::OrderAutoCancelled);
        assert!(entries[0].actor_id.is_none());
    }
}
