//! Upload Routes
//!
//! 两段式上传：先把图片 POST 到 /api/upload/{resource} 换取
//! 存储路径，再在后续的 JSON 创建/更新请求里引用这些路径。

mod handler;

use axum::{
    Router, middleware,
    body::Bytes,
    extract::{DefaultBodyLimit, Path, State},
    response::IntoResponse,
    routing::{get, post},
};
use http::header;

use crate::auth::require_admin_or_staff;
use crate::core::ServerState;

/// 请求体上限：1 缩略图 + 20 图片，外加 multipart 边界开销
const MAX_UPLOAD_BODY_SIZE: usize = (handler::MAX_PICTURES + 2) * handler::MAX_FILE_SIZE;

/// Serve file response
enum ImageResponse {
    Ok(Bytes, String),
    NotFound,
    BadRequest(&'static str),
}

impl IntoResponse for ImageResponse {
    fn into_response(self) -> axum::response::Response {
        match self {
            ImageResponse::Ok(content, content_type) => (
                http::StatusCode::OK,
                [(header::CONTENT_TYPE, content_type)],
                content,
            )
                .into_response(),
            ImageResponse::NotFound => {
                (http::StatusCode::NOT_FOUND, "File not found").into_response()
            }
            ImageResponse::BadRequest(msg) => {
                (http::StatusCode::BAD_REQUEST, msg).into_response()
            }
        }
    }
}

/// 非法路径片段判定 (防目录穿越)
fn is_unsafe_segment(segment: &str) -> bool {
    segment.is_empty()
        || segment.contains("..")
        || segment.contains('/')
        || segment.contains('\\')
}

/// GET /api/image/{resource}/{filename} - 读取已上传的图片
async fn serve_image(
    State(state): State<ServerState>,
    Path((resource, filename)): Path<(String, String)>,
) -> ImageResponse {
    if is_unsafe_segment(&resource) || is_unsafe_segment(&filename) {
        return ImageResponse::BadRequest("Invalid path");
    }

    let file_path = state.uploads_dir().join(&resource).join(&filename);

    match tokio::fs::read(&file_path).await {
        Ok(content) => {
            let content_type = mime_guess::from_path(&filename)
                .first_or_octet_stream()
                .to_string();
            ImageResponse::Ok(content.into(), content_type)
        }
        Err(_) => ImageResponse::NotFound,
    }
}

/// Build upload router
pub fn router() -> Router<ServerState> {
    let upload = Router::new()
        .route("/api/upload/{resource}", post(handler::upload))
        .route_layer(middleware::from_fn(require_admin_or_staff))
        // axum 默认 2MB 请求体上限容不下满配的一次上传
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_BODY_SIZE));

    let serve = Router::new().route("/api/image/{resource}/{filename}", get(serve_image));

    upload.merge(serve)
}
