//! KDS (Kitchen Display System) API 模块
//!
//! 后厨队列与状态推进，整组路由要求 STAFF / ADMIN。

mod handler;

use axum::{
    Router, middleware,
    routing::{get, patch},
};

use crate::auth::require_staff;
use crate::core::ServerState;

pub fn router() -> Router<ServerState> {
    Router::new().nest("/api/kds", routes())
}

fn routes() -> Router<ServerState> {
    Router::new()
        .route("/tickets", get(handler::list_tickets))
        .route("/tickets/{id}/status", patch(handler::update_status))
        .layer(middleware::from_fn(require_staff))
}
