//! KDS API Handlers

use axum::{
    Json,
    extract::{Extension, Path, Query, State},
};
use serde_json::json;

use crate::audit::{AuditAction, create_diff};
use crate::audit_log;
use crate::auth::CurrentUser;
use crate::core::ServerState;
use crate::db::repository::order;
use crate::orders::lifecycle;
use crate::utils::{AppError, AppResult};
use crate::utils::validation::{MAX_NOTE_LEN, validate_optional_text};
use shared::models::{KdsTicket, KitchenStatusUpdate, Order, OrderStatus};

const RESOURCE: &str = "order";

#[derive(serde::Deserialize)]
pub struct TicketQuery {
    pub status: Option<OrderStatus>,
}

/// GET /api/kds/tickets?status= - 后厨队列（最早的在前）
pub async fn list_tickets(
    State(state): State<ServerState>,
    Query(query): Query<TicketQuery>,
) -> AppResult<Json<Vec<KdsTicket>>> {
    let tickets = order::find_kitchen_queue(&state.pool, query.status).await?;
    Ok(Json(tickets))
}

/// 目标状态对应的审计动作；只有后厨链路上的三个状态可达
fn audit_action_for(to: OrderStatus) -> Result<AuditAction, AppError> {
    match to {
        OrderStatus::InProgress => Ok(AuditAction::OrderStarted),
        OrderStatus::Ready => Ok(AuditAction::OrderReady),
        OrderStatus::PickedUp => Ok(AuditAction::OrderPickedUp),
        other => Err(AppError::invalid_transition("?", other.as_str())),
    }
}

/// PATCH /api/kds/tickets/:id/status - 后厨状态推进
pub async fn update_status(
    State(state): State<ServerState>,
    Extension(current_user): Extension<CurrentUser>,
    Path(id): Path<i64>,
    Json(payload): Json<KitchenStatusUpdate>,
) -> AppResult<Json<Order>> {
    validate_optional_text(&payload.note, "note", MAX_NOTE_LEN)?;
    let action = audit_action_for(payload.status)?;

    let before = order::find_by_id(&state.pool, id)
        .await?
        .ok_or_else(|| AppError::order_not_found(id))?;
    let order =
        lifecycle::advance_kitchen_status(&state.pool, &state.notifier, id, payload.status).await?;

    let mut detail = create_diff(&before, &order, "order");
    if let Some(note) = &payload.note {
        detail["note"] = json!(note);
    }

    let id_str = id.to_string();
    audit_log!(
        state.audit,
        action,
        RESOURCE,
        &id_str,
        actor_id = Some(current_user.id),
        actor_name = Some(current_user.name.clone()),
        details = detail
    );

    Ok(Json(order))
}
