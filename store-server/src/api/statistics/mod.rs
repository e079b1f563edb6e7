//! Statistics API 模块
//!
//! 销售统计，要求 admin 或 staff 角色

mod handler;

use axum::{Router, middleware, routing::get};

use crate::auth::require_admin_or_staff;
use crate::core::ServerState;

pub fn router() -> Router<ServerState> {
    Router::new()
        .route("/api/statistics", get(handler::overview))
        .route_layer(middleware::from_fn(require_admin_or_staff))
}
