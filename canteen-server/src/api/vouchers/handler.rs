//! Voucher API Handlers

use axum::{Json, extract::State};

use crate::core::ServerState;
use crate::utils::AppResult;
use crate::utils::validation::{MAX_SHORT_TEXT_LEN, validate_required_text};
use crate::vouchers::redemption;
use shared::models::{VoucherPreview, VoucherPreviewRequest};

/// POST /api/vouchers/preview - 下单前试算折扣
///
/// 软结果：无效代码返回 `{valid: false, reason}` 而非错误。
pub async fn preview(
    State(state): State<ServerState>,
    Json(payload): Json<VoucherPreviewRequest>,
) -> AppResult<Json<VoucherPreview>> {
    validate_required_text(&payload.code, "code", MAX_SHORT_TEXT_LEN)?;
    let preview = redemption::preview(
        &state.pool,
        &payload.code,
        payload.subtotal,
        shared::util::now_millis(),
    )
    .await?;
    Ok(Json(preview))
}
