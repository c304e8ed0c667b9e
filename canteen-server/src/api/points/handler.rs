//! Points API Handlers

use axum::{
    Json,
    extract::{Extension, Query, State},
};

use crate::api::orders::handler::PageQuery;
use crate::auth::CurrentUser;
use crate::core::ServerState;
use crate::db::repository::points;
use crate::utils::AppResult;
use shared::models::PointsSummary;

/// GET /api/points/me - 当前用户的积分余额 + 分页流水
pub async fn me(
    State(state): State<ServerState>,
    Extension(current_user): Extension<CurrentUser>,
    Query(query): Query<PageQuery>,
) -> AppResult<Json<PointsSummary>> {
    let (limit, offset) = query.bounds();
    let balance = points::balance(&state.pool, current_user.id).await?;
    let entries = points::find_by_user(&state.pool, current_user.id, limit, offset).await?;

    Ok(Json(PointsSummary {
        balance,
        entries,
        page: offset / limit + 1,
        page_size: limit,
    }))
}
