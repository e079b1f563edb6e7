//! Product API 模块
//!
//! 读接口和评分公开；创建/更新要求 admin 或 staff，
//! 删除和隐藏切换仅 admin。

mod handler;

use axum::{
    Router, middleware,
    routing::{delete, get, post, put},
};

use crate::auth::{require_admin, require_admin_or_staff};
use crate::core::ServerState;

pub fn router() -> Router<ServerState> {
    Router::new().nest("/api/products", routes())
}

fn routes() -> Router<ServerState> {
    let public = Router::new()
        .route("/", get(handler::list))
        .route("/specs", get(handler::specification_index))
        .route("/best-seller", get(handler::best_sellers))
        .route("/search/suggest", get(handler::suggest))
        .route("/{identity}", get(handler::get_by_identity))
        .route("/{identity}/rate", put(handler::rate));

    let staff = Router::new()
        .route("/all", get(handler::list_all))
        .route("/", post(handler::create))
        .route("/{identity}", put(handler::update))
        .route("/{identity}/variants", post(handler::add_variant))
        .route("/{identity}/variants/{sku}", put(handler::update_variant))
        .route_layer(middleware::from_fn(require_admin_or_staff));

    let admin = Router::new()
        .route("/{identity}", delete(handler::delete))
        .route("/{identity}/toggle-hide", put(handler::toggle_hide))
        .route(
            "/{identity}/variants/{sku}",
            delete(handler::delete_variant),
        )
        .route_layer(middleware::from_fn(require_admin));

    public.merge(staff).merge(admin)
}
