//! 支付流程：intent / capture / refund
//!
//! QR 载荷格式：`CAN_TIN|ORDER:{id}|AMT:{total}|TS:{ts}|SIG:{sig}`，
//! ts 为 Unix 秒，sig 为 `"{order_id}|{total}|{ts}"` 的 HMAC-SHA256 十六进制。
//! 参考号：INT-{order_id}-{ts} / RF-{order_id}-{ts}。

use hmac::{Hmac, Mac};
use sha2::Sha256;
use sqlx::SqlitePool;

use shared::AppError;
use shared::models::{
    CaptureReceipt, CaptureRequest, IntentReceipt, IntentRequest, NOTIFY_PAYMENT, NOTIFY_POINTS,
    Order, OrderStatus, PaymentAction, PaymentStatus, PaymentTransaction, PaymentTxnStatus,
};

use crate::auth::CurrentUser;
use crate::db::repository::{order, payment};
use crate::notify::Notifier;
use crate::points;
use crate::vouchers::redemption::{self, CommitOutcome};

type HmacSha256 = Hmac<Sha256>;

/// QR 载荷前缀
pub const QR_SCHEME: &str = "CAN_TIN";

/// intent 展示有效期
pub const INTENT_TTL_MILLIS: i64 = 5 * 60 * 1000;

pub fn intent_ref_code(order_id: i64, now_millis: i64) -> String {
    format!("INT-{order_id}-{}", now_millis / 1000)
}

pub fn refund_ref_code(order_id: i64, now_millis: i64) -> String {
    format!("RF-{order_id}-{}", now_millis / 1000)
}

/// `"{order_id}|{total}|{ts}"` 的 HMAC-SHA256 签名（hex）
pub fn sign_payload(secret: &str, order_id: i64, total: i64, ts_secs: i64) -> Result<String, AppError> {
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .map_err(|_| AppError::internal("HMAC key error"))?;
    mac.update(format!("{order_id}|{total}|{ts_secs}").as_bytes());
    Ok(hex::encode(mac.finalize().into_bytes()))
}

fn build_qr_payload(secret: &str, order_id: i64, total: i64, ts_secs: i64) -> Result<String, AppError> {
    let sig = sign_payload(secret, order_id, total, ts_secs)?;
    Ok(format!(
        "{QR_SCHEME}|ORDER:{order_id}|AMT:{total}|TS:{ts_secs}|SIG:{sig}"
    ))
}

/// 创建支付意向
///
/// 不改支付状态：补支付方式（如果给了）、写一条 PENDING 的 INTENT
/// 流水、返回签名载荷。已支付的订单拒绝。意向不校验归属 —— 扫码
/// 代付是合法场景。
pub async fn create_intent(
    pool: &SqlitePool,
    secret: &str,
    req: IntentRequest,
    actor_id: i64,
    now: i64,
) -> Result<IntentReceipt, AppError> {
    let mut tx = pool.begin().await?;
    let order = order::find_by_id_tx(&mut tx, req.order_id)
        .await?
        .ok_or_else(|| AppError::order_not_found(req.order_id))?;

    if order.payment_status == PaymentStatus::Paid {
        return Err(AppError::already_paid(order.id));
    }

    let method = match req.method.as_deref().map(str::trim) {
        Some(m) if !m.is_empty() => {
            order::set_payment_method(&mut tx, order.id, m).await?;
            m.to_string()
        }
        _ => order.payment_method.clone(),
    };

    let ref_code = intent_ref_code(order.id, now);
    payment::insert(
        &mut tx,
        &PaymentTransaction {
            id: shared::util::snowflake_id(),
            order_id: order.id,
            method,
            action: PaymentAction::Intent,
            status: PaymentTxnStatus::Pending,
            ref_code: ref_code.clone(),
            amount: order.total,
            actor_id: Some(actor_id),
            created_at: now,
        },
    )
    .await?;
    tx.commit().await?;

    Ok(IntentReceipt {
        order_id: order.id,
        qr_payload: build_qr_payload(secret, order.id, order.total, now / 1000)?,
        ref_code,
        expires_at: now + INTENT_TTL_MILLIS,
    })
}

/// 支付成交
///
/// 本人或特权角色可操作。事务内：条件翻转 PAID（竞争输家直接
/// AlreadyPaid）→ CAPTURE 流水 → 券核销 → 积分累积。提交后通知
/// 付款结果和积分到账。
pub async fn capture(
    pool: &SqlitePool,
    notifier: &Notifier,
    req: CaptureRequest,
    caller: &CurrentUser,
    now: i64,
) -> Result<(CaptureReceipt, CommitOutcome), AppError> {
    let mut tx = pool.begin().await?;
    let order = order::find_by_id_tx(&mut tx, req.order_id)
        .await?
        .ok_or_else(|| AppError::order_not_found(req.order_id))?;

    if !caller.can_access_order(order.user_id) {
        return Err(AppError::permission_denied("Not your order"));
    }
    if order.payment_status == PaymentStatus::Paid {
        return Err(AppError::already_paid(order.id));
    }
    // 已取消的订单不再收款（过期二维码、回收任务已清理）
    if order.status == OrderStatus::Cancelled {
        return Err(AppError::invalid_transition(
            order.status.as_str(),
            PaymentStatus::Paid.as_str(),
        ));
    }

    // 竞争裁决点：翻转失败说明另一个 capture 已经赢了，或者
    // 回收任务在本次读取之后取消了订单
    if !order::flip_paid(&mut tx, order.id, req.ref_code.as_deref(), now).await? {
        return Err(AppError::already_paid(order.id));
    }

    let ref_code = req
        .ref_code
        .unwrap_or_else(|| intent_ref_code(order.id, now));
    payment::insert(
        &mut tx,
        &PaymentTransaction {
            id: shared::util::snowflake_id(),
            order_id: order.id,
            method: order.payment_method.clone(),
            action: PaymentAction::Capture,
            status: PaymentTxnStatus::Success,
            ref_code,
            amount: order.total,
            actor_id: Some(caller.id),
            created_at: now,
        },
    )
    .await?;

    let outcome = redemption::commit(&mut tx, order.id).await?;
    let points_earned = points::accrue(&mut tx, &order, now).await?;
    tx.commit().await?;

    notifier
        .enqueue(
            order.user_id,
            "Payment received",
            format!("Payment of {} for order {} confirmed", order.total, order.id),
            NOTIFY_PAYMENT,
            Some(order.id),
        )
        .await;
    if points_earned > 0 {
        notifier
            .enqueue(
                order.user_id,
                "Points credited",
                format!("You earned {points_earned} points on order {}", order.id),
                NOTIFY_POINTS,
                Some(order.id),
            )
            .await;
    }

    Ok((
        CaptureReceipt {
            order_id: order.id,
            total: order.total,
            points_earned,
            paid_at: now,
        },
        outcome,
    ))
}

/// 退款
///
/// 唯一的门槛是"已退过不能再退"；不回收积分、不回退券核销
/// （运营层面人工处理）。
pub async fn refund(
    pool: &SqlitePool,
    order_id: i64,
    actor_id: i64,
    now: i64,
) -> Result<Order, AppError> {
    let mut tx = pool.begin().await?;
    let order = order::find_by_id_tx(&mut tx, order_id)
        .await?
        .ok_or_else(|| AppError::order_not_found(order_id))?;

    if order.payment_status == PaymentStatus::Refunded
        || !order::mark_refunded(&mut tx, order_id).await?
    {
        return Err(AppError::already_refunded(order_id));
    }

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
    tx.commit().await?;

    Ok(Order {
        payment_status: PaymentStatus::Refunded,
        ..order
    })
}
