//! 图片上传链路测试
//!
//! 覆盖 multipart 上传、内容去重、图片读取和路径防护。

use axum::Router;
use axum::body::Body;
use http::{Method, Request, StatusCode, header};
use http_body_util::BodyExt;
use serde::Deserialize;
use serde_json::json;
use std::io::Cursor;
use tower::ServiceExt;

use shared::ApiResponse;
use store_server::core::{Config, ServerState, build_router};

const BOUNDARY: &str = "test-boundary-7d93b2";

/// 上传接口返回的 data 字段
#[derive(Debug, Deserialize)]
struct StagedPaths {
    thumbnail: Option<String>,
    pictures: Vec<String>,
}

async fn setup() -> (Router, tempfile::TempDir) {
    let work_dir = tempfile::tempdir().expect("Failed to create temp work dir");
    let config = Config::with_overrides(work_dir.path().to_string_lossy(), 0);
    let state = ServerState::initialize(&config).await;
    (build_router(state), work_dir)
}

async fn admin_token(app: &Router) -> String {
    let request = Request::builder()
        .method(Method::POST)
        .uri("/api/auth/login")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(
            json!({"username": "admin", "password": "admin123"}).to_string(),
        ))
        .expect("Failed to build login request");
    let response = app.clone().oneshot(request).await.expect("Login failed");
    assert_eq!(response.status(), StatusCode::OK);
    let bytes = response
        .into_body()
        .collect()
        .await
        .expect("Failed to read body")
        .to_bytes();
    let value: serde_json::Value = serde_json::from_slice(&bytes).expect("Invalid login body");
    value["token"].as_str().expect("token missing").to_string()
}

/// 生成一张 1x1 PNG
fn tiny_png() -> Vec<u8> {
    let img = image::RgbImage::from_pixel(1, 1, image::Rgb([120, 40, 200]));
    let mut buffer = Vec::new();
    image::DynamicImage::ImageRgb8(img)
        .write_to(&mut Cursor::new(&mut buffer), image::ImageFormat::Png)
        .expect("Failed to encode test PNG");
    buffer
}

fn multipart_part(name: &str, filename: &str, content_type: &str, data: &[u8]) -> Vec<u8> {
    let mut part = Vec::new();
    part.extend_from_slice(format!("--{BOUNDARY}\r\n").as_bytes());
    part.extend_from_slice(
        format!("Content-Disposition: form-data; name=\"{name}\"; filename=\"{filename}\"\r\n")
            .as_bytes(),
    );
    part.extend_from_slice(format!("Content-Type: {content_type}\r\n\r\n").as_bytes());
    part.extend_from_slice(data);
    part.extend_from_slice(b"\r\n");
    part
}

fn multipart_body(parts: Vec<Vec<u8>>) -> Vec<u8> {
    let mut body = Vec::new();
    for part in parts {
        body.extend_from_slice(&part);
    }
    body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());
    body
}

async fn upload(
    app: &Router,
    token: &str,
    resource: &str,
    body: Vec<u8>,
) -> (StatusCode, serde_json::Value) {
    let request = Request::builder()
        .method(Method::POST)
        .uri(format!("/api/upload/{resource}"))
        .header(header::AUTHORIZATION, format!("Bearer {token}"))
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={BOUNDARY}"),
        )
        .body(Body::from(body))
        .expect("Failed to build upload request");
    let response = app.clone().oneshot(request).await.expect("Upload failed");
    let status = response.status();
    let bytes = response
        .into_body()
        .collect()
        .await
        .expect("Failed to read body")
        .to_bytes();
    let value = serde_json::from_slice(&bytes).unwrap_or(serde_json::Value::Null);
    (status, value)
}

#[tokio::test]
async fn test_upload_stage_and_serve() {
    let (app, _work_dir) = setup().await;
    let token = admin_token(&app).await;

    let png = tiny_png();
    let body = multipart_body(vec![
        multipart_part("thumbnail", "main.png", "image/png", &png),
        multipart_part("pictures", "extra.png", "image/png", &png),
    ]);

    let (status, value) = upload(&app, &token, "products", body).await;
    assert_eq!(status, StatusCode::OK, "{value}");

    let envelope: ApiResponse<StagedPaths> =
        serde_json::from_value(value).expect("Invalid upload envelope");
    assert!(envelope.is_success());
    let staged = envelope.data.expect("data missing");

    let thumbnail = staged.thumbnail.expect("thumbnail missing");
    assert!(thumbnail.starts_with("products/"));
    assert!(thumbnail.ends_with(".jpg"));

    // 相同内容被去重，pictures 复用 thumbnail 的文件
    assert_eq!(staged.pictures, vec![thumbnail.clone()]);

    // 读取回来应当是 JPEG
    let request = Request::builder()
        .method(Method::GET)
        .uri(format!("/api/image/{thumbnail}"))
        .body(Body::empty())
        .expect("Failed to build image request");
    let response = app.clone().oneshot(request).await.expect("Serve failed");
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok()),
        Some("image/jpeg")
    );
    let bytes = response
        .into_body()
        .collect()
        .await
        .expect("Failed to read image body")
        .to_bytes();
    assert!(!bytes.is_empty());
}

#[tokio::test]
async fn test_upload_rejects_bad_input() {
    let (app, _work_dir) = setup().await;
    let token = admin_token(&app).await;
    let png = tiny_png();

    // 匿名上传被拒绝
    let request = Request::builder()
        .method(Method::POST)
        .uri("/api/upload/products")
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={BOUNDARY}"),
        )
        .body(Body::from(multipart_body(vec![multipart_part(
            "thumbnail",
            "main.png",
            "image/png",
            &png,
        )])))
        .expect("Failed to build request");
    let response = app.clone().oneshot(request).await.expect("Request failed");
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    // 资源类型不在白名单
    let body = multipart_body(vec![multipart_part(
        "thumbnail",
        "main.png",
        "image/png",
        &png,
    )]);
    let (status, value) = upload(&app, &token, "banners", body).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(value["code"], "E0002");

    // MIME 不在白名单
    let body = multipart_body(vec![multipart_part(
        "thumbnail",
        "notes.txt",
        "text/plain",
        b"hello",
    )]);
    let (status, value) = upload(&app, &token, "products", body).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(value["code"], "E0002");

    // 未知字段名
    let body = multipart_body(vec![multipart_part(
        "avatar",
        "main.png",
        "image/png",
        &png,
    )]);
    let (status, value) = upload(&app, &token, "products", body).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(value["code"], "E0002");
}

#[tokio::test]
async fn test_upload_file_size_limit() {
    let (app, _work_dir) = setup().await;
    let token = admin_token(&app).await;

    // 超过 5MB 单文件上限但在请求体上限之内，
    // 应命中大小校验 (400) 而不是被请求体上限拦成 413
    let junk = vec![0u8; 6 * 1024 * 1024];
    let body = multipart_body(vec![multipart_part("thumbnail", "big.png", "image/png", &junk)]);
    let (status, value) = upload(&app, &token, "products", body).await;
    assert_eq!(status, StatusCode::BAD_REQUEST, "{value}");
    assert_eq!(value["code"], "E0002");
    assert!(
        value["message"]
            .as_str()
            .unwrap_or_default()
            .contains("too large")
    );
}

#[tokio::test]
async fn test_image_path_traversal_guard() {
    let (app, _work_dir) = setup().await;

    let request = Request::builder()
        .method(Method::GET)
        .uri("/api/image/products/..")
        .body(Body::empty())
        .expect("Failed to build request");
    let response = app.clone().oneshot(request).await.expect("Request failed");
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    // 不存在的文件返回 404
    let request = Request::builder()
        .method(Method::GET)
        .uri("/api/image/products/missing.jpg")
        .body(Body::empty())
        .expect("Failed to build request");
    let response = app.clone().oneshot(request).await.expect("Request failed");
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}
