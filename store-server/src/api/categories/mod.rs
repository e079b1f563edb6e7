//! Category API 模块
//!
//! 读接口公开，写接口按角色分层：
//! 创建/更新要求 admin 或 staff，删除仅 admin。

mod handler;

use axum::{
    Router, middleware,
    routing::{delete, get, post, put},
};

use crate::auth::{require_admin, require_admin_or_staff};
use crate::core::ServerState;

pub fn router() -> Router<ServerState> {
    Router::new().nest("/api/categories", routes())
}

fn routes() -> Router<ServerState> {
    let public = Router::new()
        .route("/", get(handler::list))
        .route("/{id}", get(handler::get_by_id));

    let staff = Router::new()
        .route("/", post(handler::create))
        .route("/{id}", put(handler::update))
        .route_layer(middleware::from_fn(require_admin_or_staff));

    let admin = Router::new()
        .route("/{id}", delete(handler::delete))
        .route_layer(middleware::from_fn(require_admin));

    public.merge(staff).merge(admin)
}
