//! 订单生命周期：创建、取消、后厨状态推进
//!
//! 所有多表写操作都在单个事务内完成；状态检查在事务内完成后再写，
//! 并发方通过条件 UPDATE 的 rows_affected 裁决。

use std::collections::HashMap;

use shared::AppError;
use shared::models::{
    NOTIFY_ORDER_STATUS, Order, OrderCreate, OrderDetail, OrderLine, OrderStatus, PaymentAction,
    PaymentStatus, PaymentTransaction, PaymentTxnStatus,
};
use sqlx::SqlitePool;

use crate::db::repository::{item, order, payment};
use crate::notify::Notifier;
use crate::payments::gateway::refund_ref_code;
use crate::utils::validation::{MAX_NOTE_LEN, validate_optional_text};
use crate::vouchers::redemption;

/// 取餐预估的默认分钟数（客户端提示值）
pub const DEFAULT_ETA_MINUTES: i64 = 10;

/// 未指定支付方式时记账用的占位方式
pub const DEFAULT_PAYMENT_METHOD: &str = "MOCK";

/// 单行最大数量
pub const MAX_LINE_QUANTITY: i64 = 999;

/// 后厨状态机：只允许单向推进
fn kitchen_transition_allowed(from: OrderStatus, to: OrderStatus) -> bool {
    matches!(
        (from, to),
        (OrderStatus::Pending, OrderStatus::InProgress)
            | (OrderStatus::InProgress, OrderStatus::Ready)
            | (OrderStatus::Ready, OrderStatus::PickedUp)
    )
}

/// 创建订单
///
/// 校验 → 目录快照取价 → 可选代金券预留 → 单事务落库
/// （订单 + 行 + PENDING 的 VOUCHER_APPLY 流水）。
/// 任一菜品缺失或券无效则整单失败，不产生半成品。
pub async fn create_order(
    pool: &SqlitePool,
    user_id: i64,
    data: OrderCreate,
    now: i64,
) -> Result<OrderDetail, AppError> {
    if data.lines.is_empty() {
        return Err(AppError::empty_order());
    }
    for line in &data.lines {
        if line.quantity <= 0 || line.quantity > MAX_LINE_QUANTITY {
            return Err(AppError::validation(format!(
                "quantity must be between 1 and {MAX_LINE_QUANTITY}, got {}",
                line.quantity
            )));
        }
        validate_optional_text(&line.note, "line note", MAX_NOTE_LEN)?;
    }
    validate_optional_text(&data.note, "note", MAX_NOTE_LEN)?;

    // 目录快照：一次取回所有在售菜品，缺谁报谁
    let ids: Vec<i64> = data.lines.iter().map(|l| l.item_id).collect();
    let items = item::find_active_by_ids(pool, &ids).await?;
    let by_id: HashMap<i64, &shared::models::Item> = items.iter().map(|i| (i.id, i)).collect();
    for line in &data.lines {
        if !by_id.contains_key(&line.item_id) {
            return Err(AppError::item_not_found(line.item_id));
        }
    }

    let subtotal: i64 = data
        .lines
        .iter()
        .map(|l| by_id[&l.item_id].price * l.quantity)
        .sum();

    // 代金券预留：只校验和算折扣，PENDING 流水在下面的事务里写
    let reservation = match data.voucher_code.as_deref() {
        Some(code) if !code.trim().is_empty() => {
            Some(redemption::reserve(pool, code, subtotal, now).await?)
        }
        _ => None,
    };
    let discount = reservation.as_ref().map_or(0, |r| r.discount);

    let order = Order {
        id: shared::util::snowflake_id(),
        user_id,
        subtotal,
        discount,
        total: subtotal - discount,
        status: OrderStatus::Pending,
        payment_status: PaymentStatus::Unpaid,
        payment_method: data
            .payment_method
            .unwrap_or_else(|| DEFAULT_PAYMENT_METHOD.to_string()),
        payment_ref: None,
        voucher_code: reservation.as_ref().map(|r| r.code.clone()),
        eta_minutes: data.eta_minutes.unwrap_or(DEFAULT_ETA_MINUTES),
        note: data.note,
        created_at: now,
        paid_at: None,
    };

    let lines: Vec<OrderLine> = data
        .lines
        .iter()
        .map(|l| OrderLine {
            id: shared::util::snowflake_id(),
            order_id: order.id,
            item_id: l.item_id,
            name: by_id[&l.item_id].name.clone(),
            unit_price: by_id[&l.item_id].price,
            quantity: l.quantity,
            note: l.note.clone(),
        })
        .collect();

    let mut tx = pool.begin().await?;
    order::insert(&mut tx, &order).await?;
    order::insert_lines(&mut tx, &lines).await?;
    if let Some(reservation) = &reservation {
        payment::insert(
            &mut tx,
            &PaymentTransaction {
                id: shared::util::snowflake_id(),
                order_id: order.id,
                method: order.payment_method.clone(),
                action: PaymentAction::VoucherApply,
                status: PaymentTxnStatus::Pending,
                ref_code: reservation.code.clone(),
                amount: reservation.discount,
                actor_id: Some(user_id),
                created_at: now,
            },
        )
        .await?;
    }
    tx.commit().await?;

    Ok(OrderDetail { order, lines })
}

/// 取消订单（仅 PENDING 可取消）
///
/// 事务内：释放券预留（PENDING 流水直接删，配额从未动过）；
/// 已付款的订单同时翻转 REFUNDED 并补一条 REFUND 流水；最后置 CANCELLED。
pub async fn cancel_order(
    pool: &SqlitePool,
    order_id: i64,
    actor_id: i64,
    now: i64,
) -> Result<Order, AppError> {
    let mut tx = pool.begin().await?;
    let order = order::find_by_id_tx(&mut tx, order_id)
        .await?
        .ok_or_else(|| AppError::order_not_found(order_id))?;

    if order.status != OrderStatus::Pending {
        return Err(AppError::invalid_transition(
            order.status.as_str(),
            OrderStatus::Cancelled.as_str(),
        ));
    }

    redemption::release(&mut tx, order_id).await?;

    let mut payment_status = order.payment_status;
    if order.payment_status == PaymentStatus::Paid {
        order::mark_refunded(&mut tx, order_id).await?;
        payment::insert(
            &mut tx,
            &PaymentTransaction {
                id: shared::util::snowflake_id(),
                order_id,
                method: order.payment_method.clone(),
                action: PaymentAction::Refund,
                status: PaymentTxnStatus::Success,
                ref_code: refund_ref_code(order_id, now),
                amount: order.total,
                actor_id: Some(actor_id),
                created_at: now,
            },
        )
        .await?;
        payment_status = PaymentStatus::Refunded;
    }

    if !order::transition_status(&mut tx, order_id, OrderStatus::Pending, OrderStatus::Cancelled)
        .await?
    {
        return Err(AppError::invalid_transition(
            order.status.as_str(),
            OrderStatus::Cancelled.as_str(),
        ));
    }
    tx.commit().await?;

    Ok(Order {
        status: OrderStatus::Cancelled,
        payment_status,
        ..order
    })
}

/// 后厨状态推进（KDS 操作）
///
/// 进入 READY / PICKED_UP 时通知下单人；通知在事务提交后发出。
pub async fn advance_kitchen_status(
    pool: &SqlitePool,
    notifier: &Notifier,
    order_id: i64,
    to: OrderStatus,
) -> Result<Order, AppError> {
    let mut tx = pool.begin().await?;
    let order = order::find_by_id_tx(&mut tx, order_id)
        .await?
        .ok_or_else(|| AppError::order_not_found(order_id))?;

    if !kitchen_transition_allowed(order.status, to)
        || !order::transition_status(&mut tx, order_id, order.status, to).await?
    {
        return Err(AppError::invalid_transition(
            order.status.as_str(),
            to.as_str(),
        ));
    }
    tx.commit().await?;

    match to {
        OrderStatus::Ready => {
            notifier
                .enqueue(
                    order.user_id,
                    "Order ready",
                    format!("Order {} is ready for pickup", order.id),
                    NOTIFY_ORDER_STATUS,
                    Some(order.id),
                )
                .await;
        }
        OrderStatus::PickedUp => {
            notifier
                .enqueue(
                    order.user_id,
                    "Order picked up",
                    format!("Order {} has been picked up, enjoy!", order.id),
                    NOTIFY_ORDER_STATUS,
                    Some(order.id),
                )
                .await;
        }
        _ => {}
    }

    Ok(Order { status: to, ..order })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::DbService;
    use shared::ErrorCode;
    use shared::models::{ItemCreate, OrderLineInput, VoucherCreate, VoucherKind};

    async fn setup() -> (DbService, Notifier) {
        let db = DbService::new_in_memory().await.unwrap();
        let notifier = Notifier::new(db.pool.clone());
        (db, notifier)
    }

    async fn seed_item(pool: &SqlitePool, name: &str, price: i64) -> i64 {
        item::create(
            pool,
            ItemCreate {
                name: name.into(),
                price,
            },
        )
        .await
        .unwrap()
        .id
    }

    fn one_line(item_id: i64, quantity: i64) -> OrderCreate {
        OrderCreate {
            lines: vec![OrderLineInput {
                item_id,
                quantity,
                note: None,
            }],
            payment_method: None,
            voucher_code: None,
            eta_minutes: None,
            note: None,
        }
    }

    #[tokio::test]
    async fn test_create_order_snapshots_price_and_totals() {
        let (db, _) = setup().await;
        let noodles = seed_item(&db.pool, "Beef noodles", 12000).await;
        let tea = seed_item(&db.pool, "Milk tea", 4500).await;

        let detail = create_order(
            &db.pool,
            7,
            OrderCreate {
                lines: vec![
                    OrderLineInput {
                        item_id: noodles,
                        quantity: 2,
                        note: Some("less spicy".into()),
                    },
                    OrderLineInput {
                        item_id: tea,
                        quantity: 1,
                        note: None,
                    },
                ],
                payment_method: Some("CARD".into()),
                voucher_code: None,
                eta_minutes: Some(15),
                note: None,
            },
            1_000,
        )
        .await
        .unwrap();

        assert_eq!(detail.order.subtotal, 28500);
        assert_eq!(detail.order.discount, 0);
        assert_eq!(detail.order.total, 28500);
        assert_eq!(detail.order.status, OrderStatus::Pending);
        assert_eq!(detail.order.payment_status, PaymentStatus::Unpaid);
        assert_eq!(detail.order.eta_minutes, 15);
        assert_eq!(detail.lines.len(), 2);
        assert_eq!(detail.lines[0].unit_price, 12000);

        // persisted rows match the receipt
        let stored = order::find_by_id(&db.pool, detail.order.id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(stored.total, 28500);
        let stored_lines = order::find_lines(&db.pool, detail.order.id).await.unwrap();
        assert_eq!(stored_lines.len(), 2);
    }

    #[tokio::test]
    async fn test_create_order_rejects_empty_and_bad_quantity() {
        let (db, _) = setup().await;
        let item_id = seed_item(&db.pool, "Rice", 3000).await;

        let err = create_order(
            &db.pool,
            7,
            OrderCreate {
                lines: vec![],
                payment_method: None,
                voucher_code: None,
                eta_minutes: None,
                note: None,
            },
            0,
        )
        .await
        .unwrap_err();
        assert_eq!(err.code, ErrorCode::OrderEmpty);

        let err = create_order(&db.pool, 7, one_line(item_id, 0), 0)
            .await
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::ValidationFailed);
    }

    #[tokio::test]
    async fn test_create_order_unknown_item_is_atomic() {
        let (db, _) = setup().await;
        let item_id = seed_item(&db.pool, "Rice", 3000).await;

        let err = create_order(
            &db.pool,
            7,
            OrderCreate {
                lines: vec![
                    OrderLineInput {
                        item_id,
                        quantity: 1,
                        note: None,
                    },
                    OrderLineInput {
                        item_id: 999_999,
                        quantity: 1,
                        note: None,
                    },
                ],
                payment_method: None,
                voucher_code: None,
                eta_minutes: None,
                note: None,
            },
            0,
        )
        .await
        .unwrap_err();
        assert_eq!(err.code, ErrorCode::ItemNotFound);

        // nothing was written
        let orders = order::find_by_user(&db.pool, 7, 10, 0).await.unwrap();
        assert!(orders.is_empty());
    }

    #[tokio::test]
    async fn test_create_order_with_voucher_records_pending_reservation() {
        let (db, _) = setup().await;
        let item_id = seed_item(&db.pool, "Set meal", 50000).await;
        crate::db::repository::voucher::create(
            &db.pool,
            VoucherCreate {
                code: "SALE10".into(),
                kind: VoucherKind::Percent,
                value: 10,
                start_at: None,
                end_at: None,
                quota: 0,
            },
        )
        .await
        .unwrap();

        let mut data = one_line(item_id, 1);
        data.voucher_code = Some("sale10".into());
        let detail = create_order(&db.pool, 7, data, 1_000).await.unwrap();

        assert_eq!(detail.order.subtotal, 50000);
        assert_eq!(detail.order.discount, 5000);
        assert_eq!(detail.order.total, 45000);
        assert_eq!(detail.order.voucher_code.as_deref(), Some("SALE10"));

        let txns = payment::find_by_order(&db.pool, detail.order.id)
            .await
            .unwrap();
        assert_eq!(txns.len(), 1);
        assert_eq!(txns[0].action, PaymentAction::VoucherApply);
        assert_eq!(txns[0].status, PaymentTxnStatus::Pending);
        assert_eq!(txns[0].amount, 5000);
        assert_eq!(txns[0].ref_code, "SALE10");

        // reservation must not touch the quota counter
        let voucher = crate::db::repository::voucher::find_by_code(&db.pool, "SALE10")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(voucher.used, 0);
    }

    #[tokio::test]
    async fn test_create_order_invalid_voucher_fails_whole_creation() {
        let (db, _) = setup().await;
        let item_id = seed_item(&db.pool, "Rice", 3000).await;

        let mut data = one_line(item_id, 1);
        data.voucher_code = Some("GHOST".into());
        let err = create_order(&db.pool, 7, data, 0).await.unwrap_err();
        assert_eq!(err.code, ErrorCode::VoucherInvalid);

        let orders = order::find_by_user(&db.pool, 7, 10, 0).await.unwrap();
        assert!(orders.is_empty());
    }

    #[tokio::test]
    async fn test_cancel_releases_pending_reservation() {
        let (db, _) = setup().await;
        let item_id = seed_item(&db.pool, "Set meal", 50000).await;
        crate::db::repository::voucher::create(
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

        let mut data = one_line(item_id, 1);
        data.voucher_code = Some("SALE10".into());
        let detail = create_order(&db.pool, 7, data, 1_000).await.unwrap();

        let cancelled = cancel_order(&db.pool, detail.order.id, 7, 2_000)
            .await
            .unwrap();
        assert_eq!(cancelled.status, OrderStatus::Cancelled);

        // reservation deleted, quota untouched
        let txns = payment::find_by_order(&db.pool, detail.order.id)
            .await
            .unwrap();
        assert!(txns.is_empty());
        let voucher = crate::db::repository::voucher::find_by_code(&db.pool, "SALE10")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(voucher.used, 0);
    }

    #[tokio::test]
    async fn test_cancel_rejects_non_pending() {
        let (db, notifier) = setup().await;
        let item_id = seed_item(&db.pool, "Rice", 3000).await;
        let detail = create_order(&db.pool, 7, one_line(item_id, 1), 0)
            .await
            .unwrap();

        advance_kitchen_status(&db.pool, &notifier, detail.order.id, OrderStatus::InProgress)
            .await
            .unwrap();

        let err = cancel_order(&db.pool, detail.order.id, 7, 100)
            .await
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::OrderInvalidTransition);
    }

    #[tokio::test]
    async fn test_kitchen_transitions_follow_the_chain() {
        let (db, notifier) = setup().await;
        let item_id = seed_item(&db.pool, "Rice", 3000).await;
        let detail = create_order(&db.pool, 7, one_line(item_id, 1), 0)
            .await
            .unwrap();
        let id = detail.order.id;

        // skipping a step is rejected
        let err = advance_kitchen_status(&db.pool, &notifier, id, OrderStatus::Ready)
            .await
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::OrderInvalidTransition);

        advance_kitchen_status(&db.pool, &notifier, id, OrderStatus::InProgress)
            .await
            .unwrap();
        advance_kitchen_status(&db.pool, &notifier, id, OrderStatus::Ready)
            .await
            .unwrap();
        let done = advance_kitchen_status(&db.pool, &notifier, id, OrderStatus::PickedUp)
            .await
            .unwrap();
        assert_eq!(done.status, OrderStatus::PickedUp);

        // READY and PICKED_UP each notified the owner
        let notifications = crate::db::repository::notification::find_by_user(&db.pool, 7)
            .await
            .unwrap();
        assert_eq!(notifications.len(), 2);
        assert!(notifications.iter().all(|n| n.kind == NOTIFY_ORDER_STATUS));
    }

    #[tokio::test]
    async fn test_moving_backwards_is_rejected() {
        let (db, notifier) = setup().await;
        let item_id = seed_item(&db.pool, "Rice", 3000).await;
        let detail = create_order(&db.pool, 7, one_line(item_id, 1), 0)
            .await
            .unwrap();
        let id = detail.order.id;

        advance_kitchen_status(&db.pool, &notifier, id, OrderStatus::InProgress)
            .await
            .unwrap();
        let err = advance_kitchen_status(&db.pool, &notifier, id, OrderStatus::Pending)
            .await
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::OrderInvalidTransition);
    }
}
