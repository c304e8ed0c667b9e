//! Payment API 模块
//!
//! intent / capture 对用户开放（capture 内部校验本人或员工）；
//! refund 仅员工可用。

mod handler;

use axum::{Router, middleware, routing::post};

use crate::auth::require_staff;
use crate::core::ServerState;

pub fn router() -> Router<ServerState> {
    Router::new().nest("/api/payments", routes())
}

fn routes() -> Router<ServerState> {
    let user_routes = Router::new()
        .route("/intent", post(handler::create_intent))
        .route("/capture", post(handler::capture));

    let staff_routes = Router::new()
        .route("/refund", post(handler::refund))
        .layer(middleware::from_fn(require_staff));

    user_routes.merge(staff_routes)
}
