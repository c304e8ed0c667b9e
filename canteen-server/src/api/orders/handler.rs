//! Order API Handlers

use axum::{
    Json,
    extract::{Extension, Path, Query, State},
};

use crate::audit::{AuditAction, create_snapshot};
use crate::audit_log;
use crate::auth::CurrentUser;
use crate::core::ServerState;
use crate::db::repository::order;
use crate::orders::lifecycle;
use crate::utils::{AppError, AppResult};
use shared::models::{OrderCreate, OrderDetail, OrderSummary};

const RESOURCE: &str = "order";

/// 列表分页参数
#[derive(serde::Deserialize)]
pub struct PageQuery {
    pub page: Option<i64>,
    pub page_size: Option<i64>,
}

impl PageQuery {
    /// (limit, offset)，page 从 1 开始，页大小钳制到 [1, 100]
    pub fn bounds(&self) -> (i64, i64) {
        let page = self.page.unwrap_or(1).max(1);
        let page_size = self.page_size.unwrap_or(20).clamp(1, 100);
        (page_size, (page - 1) * page_size)
    }
}

/// POST /api/orders - 下单
pub async fn create(
    State(state): State<ServerState>,
    Extension(current_user): Extension<CurrentUser>,
    Json(payload): Json<OrderCreate>,
) -> AppResult<Json<OrderDetail>> {
    let detail = lifecycle::create_order(
        &state.pool,
        current_user.id,
        payload,
        shared::util::now_millis(),
    )
    .await?;

    let id = detail.order.id.to_string();
    audit_log!(
        state.audit,
        AuditAction::OrderCreated,
        RESOURCE,
        &id,
        actor_id = Some(current_user.id),
        actor_name = Some(current_user.name.clone()),
        details = create_snapshot(&detail.order, "order")
    );

    Ok(Json(detail))
}

/// GET /api/orders/me - 当前用户的订单历史
pub async fn list_mine(
    State(state): State<ServerState>,
    Extension(current_user): Extension<CurrentUser>,
    Query(query): Query<PageQuery>,
) -> AppResult<Json<Vec<OrderSummary>>> {
    let (limit, offset) = query.bounds();
    let orders = order::find_by_user(&state.pool, current_user.id, limit, offset).await?;
    Ok(Json(orders))
}

/// GET /api/orders/:id - 订单详情（本人或员工）
pub async fn get_by_id(
    State(state): State<ServerState>,
    Extension(current_user): Extension<CurrentUser>,
    Path(id): Path<i64>,
) -> AppResult<Json<OrderDetail>> {
    let order = order::find_by_id(&state.pool, id)
        .await?
        .ok_or_else(|| AppError::order_not_found(id))?;

    if !current_user.can_access_order(order.user_id) {
        return Err(AppError::permission_denied("Not your order"));
    }

    let lines = order::find_lines(&state.pool, id).await?;
    Ok(Json(OrderDetail { order, lines }))
}

/// POST /api/orders/:id/cancel - 取消订单（本人或员工，仅 PENDING）
pub async fn cancel(
    State(state): State<ServerState>,
    Extension(current_user): Extension<CurrentUser>,
    Path(id): Path<i64>,
) -> AppResult<Json<OrderDetail>> {
    let order = order::find_by_id(&state.pool, id)
        .await?
        .ok_or_else(|| AppError::order_not_found(id))?;
    if !current_user.can_access_order(order.user_id) {
        return Err(AppError::permission_denied("Not your order"));
    }

    let cancelled =
        lifecycle::cancel_order(&state.pool, id, current_user.id, shared::util::now_millis())
            .await?;

    let id_str = id.to_string();
    audit_log!(
        state.audit,
        AuditAction::OrderCancelled,
        RESOURCE,
        &id_str,
        actor_id = Some(current_user.id),
        actor_name = Some(current_user.name.clone()),
        details = create_snapshot(&cancelled, "order")
    );

    let lines = order::find_lines(&state.pool, id).await?;
    Ok(Json(OrderDetail {
        order: cancelled,
        lines,
    }))
}
