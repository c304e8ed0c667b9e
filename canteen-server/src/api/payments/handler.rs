//! Payment API Handlers
//!
//! 金额相关的三个入口；每个成功的变更都留审计，capture 时的配额
//! 超卖单独以 VOUCHER_OVERSOLD 留痕供人工复核。

use axum::{
    Json,
    extract::{Extension, State},
};
use serde_json::json;

use crate::audit::AuditAction;
use crate::audit_log;
use crate::auth::CurrentUser;
use crate::core::ServerState;
use crate::payments::gateway;
use crate::utils::AppResult;
use crate::utils::validation::{MAX_NOTE_LEN, MAX_SHORT_TEXT_LEN, validate_optional_text};
use shared::models::{CaptureReceipt, CaptureRequest, IntentReceipt, IntentRequest, RefundRequest};

const RESOURCE: &str = "order";

/// POST /api/payments/intent - 创建支付意向
///
/// 不校验归属：扫码代付是合法场景。
pub async fn create_intent(
    State(state): State<ServerState>,
    Extension(current_user): Extension<CurrentUser>,
    Json(payload): Json<IntentRequest>,
) -> AppResult<Json<IntentReceipt>> {
    validate_optional_text(&payload.method, "method", MAX_SHORT_TEXT_LEN)?;
    let receipt = gateway::create_intent(
        &state.pool,
        &state.config.qr_secret,
        payload,
        current_user.id,
        shared::util::now_millis(),
    )
    .await?;

    let id = receipt.order_id.to_string();
    audit_log!(
        state.audit,
        AuditAction::PaymentIntentCreated,
        RESOURCE,
        &id,
        actor_id = Some(current_user.id),
        actor_name = Some(current_user.name.clone()),
        details = json!({ "ref_code": receipt.ref_code, "expires_at": receipt.expires_at })
    );

    Ok(Json(receipt))
}

/// POST /api/payments/capture - 支付成交（本人或员工）
pub async fn capture(
    State(state): State<ServerState>,
    Extension(current_user): Extension<CurrentUser>,
    Json(payload): Json<CaptureRequest>,
) -> AppResult<Json<CaptureReceipt>> {
    validate_optional_text(&payload.note, "note", MAX_NOTE_LEN)?;

    let (receipt, outcome) = gateway::capture(
        &state.pool,
        &state.notifier,
        payload,
        &current_user,
        shared::util::now_millis(),
    )
    .await?;

    let id = receipt.order_id.to_string();
    audit_log!(
        state.audit,
        AuditAction::PaymentCaptured,
        RESOURCE,
        &id,
        actor_id = Some(current_user.id),
        actor_name = Some(current_user.name.clone()),
        details = json!({
            "total": receipt.total,
            "points_earned": receipt.points_earned,
            "committed_vouchers": outcome.committed,
        })
    );

    // 配额竞争落败：折扣已兑现，留痕供运营复核
    for code in &outcome.oversold {
        audit_log!(
            state.audit,
            AuditAction::VoucherOversold,
            "voucher",
            code,
            actor_id = Some(current_user.id),
            actor_name = Some(current_user.name.clone()),
            details = json!({ "order_id": receipt.order_id })
        );
    }

    Ok(Json(receipt))
}

/// POST /api/payments/refund - 退款（仅员工）
pub async fn refund(
    State(state): State<ServerState>,
    Extension(current_user): Extension<CurrentUser>,
    Json(payload): Json<RefundRequest>,
) -> AppResult<Json<shared::models::Order>> {
    validate_optional_text(&payload.reason, "reason", MAX_NOTE_LEN)?;

    let order = gateway::refund(
        &state.pool,
        payload.order_id,
        current_user.id,
        shared::util::now_millis(),
    )
    .await?;

    let id = order.id.to_string();
    audit_log!(
        state.audit,
        AuditAction::PaymentRefunded,
        RESOURCE,
        &id,
        actor_id = Some(current_user.id),
        actor_name = Some(current_user.name.clone()),
        details = json!({ "amount": order.total, "reason": payload.reason })
    );

    Ok(Json(order))
}
