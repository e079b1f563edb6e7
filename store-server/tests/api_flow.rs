//! 端到端 API 测试
//!
//! 使用 ServerState::initialize 完整初始化 (临时工作目录)，
//! 通过 tower 的 oneshot 直接驱动路由，不占用端口。

use axum::Router;
use axum::body::Body;
use http::{Method, Request, StatusCode, header};
use http_body_util::BodyExt;
use serde_json::{Value, json};
use tower::ServiceExt;

use store_server::auth::Role;
use store_server::core::{Config, ServerState, build_router};
use store_server::db::repository::AccountRepository;

/// 测试环境：路由 + 工作目录守卫
struct TestEnv {
    app: Router,
    _work_dir: tempfile::TempDir,
}

async fn setup() -> TestEnv {
    let work_dir = tempfile::tempdir().expect("Failed to create temp work dir");
    let config = Config::with_overrides(work_dir.path().to_string_lossy(), 0);
    let state = ServerState::initialize(&config).await;

    // 测试用 staff 账号 (admin 账号由 initialize 播种)
    let accounts = AccountRepository::new(state.db.clone());
    accounts
        .create_account("clerk", "Clerk", "clerk-pass-1", Role::Staff)
        .await
        .expect("Failed to create staff account");

    let app = build_router(state);
    TestEnv {
        app,
        _work_dir: work_dir,
    }
}

async fn request(
    app: &Router,
    method: Method,
    uri: &str,
    token: Option<&str>,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }
    let request = match body {
        Some(value) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(value.to_string())),
        None => builder.body(Body::empty()),
    }
    .expect("Failed to build request");

    let response = app
        .clone()
        .oneshot(request)
        .await
        .expect("Request failed");
    let status = response.status();
    let bytes = response
        .into_body()
        .collect()
        .await
        .expect("Failed to read body")
        .to_bytes();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or(Value::Null)
    };
    (status, value)
}

async fn login(app: &Router, username: &str, password: &str) -> String {
    let (status, body) = request(
        app,
        Method::POST,
        "/api/auth/login",
        None,
        Some(json!({"username": username, "password": password})),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "login failed: {body}");
    body["token"].as_str().expect("token missing").to_string()
}

#[tokio::test]
async fn test_health_is_public() {
    let env = setup().await;
    let (status, body) = request(&env.app, Method::GET, "/api/health", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
}

#[tokio::test]
async fn test_login_and_me() {
    let env = setup().await;

    // Wrong password: unified message, 400
    let (status, body) = request(
        &env.app,
        Method::POST,
        "/api/auth/login",
        None,
        Some(json!({"username": "admin", "password": "wrong"})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "E0006");

    // Unknown user gets the same message
    let (status2, body2) = request(
        &env.app,
        Method::POST,
        "/api/auth/login",
        None,
        Some(json!({"username": "ghost", "password": "wrong"})),
    )
    .await;
    assert_eq!(status2, status);
    assert_eq!(body2["message"], body["message"]);

    let token = login(&env.app, "admin", "admin123").await;
    let (status, body) = request(&env.app, Method::GET, "/api/auth/me", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["username"], "admin");
    assert_eq!(body["role"], "admin");
}

#[tokio::test]
async fn test_me_requires_token() {
    let env = setup().await;
    let (status, body) = request(&env.app, Method::GET, "/api/auth/me", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["code"], "E3001");

    let (status, body) = request(
        &env.app,
        Method::GET,
        "/api/auth/me",
        Some("not-a-token"),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["code"], "E3002");
}

#[tokio::test]
async fn test_category_crud_and_visibility() {
    let env = setup().await;
    let staff = login(&env.app, "clerk", "clerk-pass-1").await;
    let admin = login(&env.app, "admin", "admin123").await;

    // Anonymous create denied
    let (status, _) = request(
        &env.app,
        Method::POST,
        "/api/categories",
        None,
        Some(json!({"name": "Laptops etc"})),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    // Name outside the 6-25 window
    let (status, body) = request(
        &env.app,
        Method::POST,
        "/api/categories",
        Some(&staff),
        Some(json!({"name": "Audio"})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "E0002");

    // Staff creates a visible and a hidden category
    let (status, visible) = request(
        &env.app,
        Method::POST,
        "/api/categories",
        Some(&staff),
        Some(json!({"name": "Laptops & Desktops", "display_order": 1})),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{visible}");

    let (status, _hidden) = request(
        &env.app,
        Method::POST,
        "/api/categories",
        Some(&staff),
        Some(json!({"name": "Archived gadgets", "is_hidden": true})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    // Duplicate display_order among visible categories is rejected
    let (status, body) = request(
        &env.app,
        Method::POST,
        "/api/categories",
        Some(&staff),
        Some(json!({"name": "Phones & Tablets", "display_order": 1})),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["code"], "E0004");

    // Anonymous listing hides the hidden category
    let (_, listing) = request(&env.app, Method::GET, "/api/categories", None, None).await;
    let names: Vec<&str> = listing
        .as_array()
        .expect("array")
        .iter()
        .filter_map(|c| c["name"].as_str())
        .collect();
    assert!(names.contains(&"Laptops & Desktops"));
    assert!(!names.contains(&"Archived gadgets"));

    // Staff listing includes it
    let (_, listing) = request(&env.app, Method::GET, "/api/categories", Some(&staff), None).await;
    assert_eq!(listing.as_array().expect("array").len(), 2);

    // Delete is admin-only
    let id = visible["id"].as_str().expect("id");
    let (status, body) = request(
        &env.app,
        Method::DELETE,
        &format!("/api/categories/{id}"),
        Some(&staff),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["code"], "E2001");

    let (status, _) = request(
        &env.app,
        Method::DELETE,
        &format!("/api/categories/{id}"),
        Some(&admin),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_category_delete_blocked_by_products() {
    let env = setup().await;
    let staff = login(&env.app, "clerk", "clerk-pass-1").await;
    let admin = login(&env.app, "admin", "admin123").await;

    let (_, category) = request(
        &env.app,
        Method::POST,
        "/api/categories",
        Some(&staff),
        Some(json!({"name": "Gaming Consoles"})),
    )
    .await;
    let category_id = category["id"].as_str().expect("id");

    let (status, _) = request(
        &env.app,
        Method::POST,
        "/api/products",
        Some(&staff),
        Some(json!({
            "name": "Handheld X",
            "category": category_id,
            "variants": [{"sku": "HX-1", "variant_name": "Base", "price": "299.99"}]
        })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = request(
        &env.app,
        Method::DELETE,
        &format!("/api/categories/{category_id}"),
        Some(&admin),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["code"], "E0005");
}

#[tokio::test]
async fn test_category_delete_blocked_by_children() {
    let env = setup().await;
    let staff = login(&env.app, "clerk", "clerk-pass-1").await;
    let admin = login(&env.app, "admin", "admin123").await;

    let (_, parent) = request(
        &env.app,
        Method::POST,
        "/api/categories",
        Some(&staff),
        Some(json!({"name": "Audio & Video"})),
    )
    .await;
    let parent_id = parent["id"].as_str().expect("id");

    let (status, child) = request(
        &env.app,
        Method::POST,
        "/api/categories",
        Some(&staff),
        Some(json!({"name": "Noise Cancelling", "parent": parent_id})),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{child}");
    let child_id = child["id"].as_str().expect("id");

    // Parent cannot go while the child points at it
    let (status, body) = request(
        &env.app,
        Method::DELETE,
        &format!("/api/categories/{parent_id}"),
        Some(&admin),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["code"], "E0005");

    // Child first, then the parent
    let (status, _) = request(
        &env.app,
        Method::DELETE,
        &format!("/api/categories/{child_id}"),
        Some(&admin),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = request(
        &env.app,
        Method::DELETE,
        &format!("/api/categories/{parent_id}"),
        Some(&admin),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_display_order_rules_on_update() {
    let env = setup().await;
    let staff = login(&env.app, "clerk", "clerk-pass-1").await;

    let (_, _first) = request(
        &env.app,
        Method::POST,
        "/api/categories",
        Some(&staff),
        Some(json!({"name": "Home Appliances", "display_order": 1})),
    )
    .await;
    let (_, second) = request(
        &env.app,
        Method::POST,
        "/api/categories",
        Some(&staff),
        Some(json!({"name": "Office Chairs", "display_order": 2})),
    )
    .await;
    let second_id = second["id"].as_str().expect("id");

    // Moving onto an occupied slot is rejected
    let (status, body) = request(
        &env.app,
        Method::PUT,
        &format!("/api/categories/{second_id}"),
        Some(&staff),
        Some(json!({"display_order": 1})),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["code"], "E0004");

    // A hidden category may share the slot of a visible one
    let (status, hidden) = request(
        &env.app,
        Method::POST,
        "/api/categories",
        Some(&staff),
        Some(json!({"name": "Seasonal Deals", "display_order": 1, "is_hidden": true})),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{hidden}");
    let hidden_id = hidden["id"].as_str().expect("id");

    // Unhiding re-checks the slot
    let (status, body) = request(
        &env.app,
        Method::PUT,
        &format!("/api/categories/{hidden_id}"),
        Some(&staff),
        Some(json!({"is_hidden": false})),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["code"], "E0004");

    // Unhiding onto a free slot works
    let (status, unhidden) = request(
        &env.app,
        Method::PUT,
        &format!("/api/categories/{hidden_id}"),
        Some(&staff),
        Some(json!({"is_hidden": false, "display_order": 3})),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{unhidden}");
    assert_eq!(unhidden["is_hidden"], false);
    assert_eq!(unhidden["display_order"], 3);
}

#[tokio::test]
async fn test_product_lifecycle() {
    let env = setup().await;
    let staff = login(&env.app, "clerk", "clerk-pass-1").await;
    let admin = login(&env.app, "admin", "admin123").await;

    let (status, product) = request(
        &env.app,
        Method::POST,
        "/api/products",
        Some(&staff),
        Some(json!({
            "name": "Galaxy S24 Ultra",
            "specifications": {"brand": "Samsung", "display": "6.8\""},
            "variants": [
                {"sku": "S24U-256", "variant_name": "256GB", "price": "1199.99", "quantity": 10},
                {"sku": "S24U-512", "variant_name": "512GB", "price": "1399.99", "quantity": 5}
            ]
        })),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{product}");
    assert_eq!(product["slug"], "galaxy-s24-ultra");

    // Fetch by slug without a token
    let (status, fetched) = request(
        &env.app,
        Method::GET,
        "/api/products/galaxy-s24-ultra",
        None,
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(fetched["name"], "Galaxy S24 Ultra");

    // Views were bumped by the fetch above
    let (_, fetched_again) = request(
        &env.app,
        Method::GET,
        "/api/products/galaxy-s24-ultra",
        None,
        None,
    )
    .await;
    assert!(fetched_again["views"].as_i64().expect("views") >= 1);

    // Anonymous rating
    let (status, rated) = request(
        &env.app,
        Method::PUT,
        "/api/products/galaxy-s24-ultra/rate",
        None,
        Some(json!({"rating": 5})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(rated["rating_count"], 1);
    assert_eq!(rated["rating_average"], 5.0);

    let (status, body) = request(
        &env.app,
        Method::PUT,
        "/api/products/galaxy-s24-ultra/rate",
        None,
        Some(json!({"rating": 9})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "E0002");

    // toggle-hide is admin-only
    let (status, _) = request(
        &env.app,
        Method::PUT,
        "/api/products/galaxy-s24-ultra/toggle-hide",
        Some(&staff),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, hidden) = request(
        &env.app,
        Method::PUT,
        "/api/products/galaxy-s24-ultra/toggle-hide",
        Some(&admin),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(hidden["is_hidden"], true);

    // Hidden products drop out of the public listing and detail
    let (_, listing) = request(&env.app, Method::GET, "/api/products", None, None).await;
    assert!(listing.as_array().expect("array").is_empty());

    let (status, _) = request(
        &env.app,
        Method::GET,
        "/api/products/galaxy-s24-ultra",
        None,
        None,
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    // Staff still sees it via /all
    let (status, listing) = request(&env.app, Method::GET, "/api/products/all", Some(&staff), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(listing.as_array().expect("array").len(), 1);

    // /all requires a role
    let (status, _) = request(&env.app, Method::GET, "/api/products/all", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_variant_rules() {
    let env = setup().await;
    let staff = login(&env.app, "clerk", "clerk-pass-1").await;
    let admin = login(&env.app, "admin", "admin123").await;

    let (_, product) = request(
        &env.app,
        Method::POST,
        "/api/products",
        Some(&staff),
        Some(json!({
            "name": "Mechanical Keyboard",
            "variants": [{"sku": "MK-RED", "variant_name": "Red switches", "price": "89.00"}]
        })),
    )
    .await;
    let id = product["id"].as_str().expect("id");

    // Duplicate SKU rejected
    let (status, body) = request(
        &env.app,
        Method::POST,
        &format!("/api/products/{id}/variants"),
        Some(&staff),
        Some(json!({"sku": "MK-RED", "variant_name": "Red again", "price": "89.00"})),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["code"], "E0004");

    // Add a second variant, then update it
    let (status, _) = request(
        &env.app,
        Method::POST,
        &format!("/api/products/{id}/variants"),
        Some(&staff),
        Some(json!({"sku": "MK-BLUE", "variant_name": "Blue switches", "price": "92.00"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, updated) = request(
        &env.app,
        Method::PUT,
        &format!("/api/products/{id}/variants/MK-BLUE"),
        Some(&staff),
        Some(json!({"sku": "MK-BLUE", "variant_name": "Blue switches", "price": "95.00", "quantity": 3})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let blue = updated["variants"]
        .as_array()
        .expect("variants")
        .iter()
        .find(|v| v["sku"] == "MK-BLUE")
        .expect("blue variant");
    assert_eq!(blue["quantity"], 3);

    // Variant delete is admin-only
    let (status, _) = request(
        &env.app,
        Method::DELETE,
        &format!("/api/products/{id}/variants/MK-BLUE"),
        Some(&staff),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = request(
        &env.app,
        Method::DELETE,
        &format!("/api/products/{id}/variants/MK-BLUE"),
        Some(&admin),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    // Last variant cannot be removed
    let (status, body) = request(
        &env.app,
        Method::DELETE,
        &format!("/api/products/{id}/variants/MK-RED"),
        Some(&admin),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["code"], "E0005");
}

#[tokio::test]
async fn test_best_sellers_and_spec_index() {
    let env = setup().await;
    let staff = login(&env.app, "clerk", "clerk-pass-1").await;

    for (name, sku, brand) in [
        ("Pixel Tablet", "PT-1", "Google"),
        ("Surface Go", "SG-1", "Microsoft"),
    ] {
        let (status, _) = request(
            &env.app,
            Method::POST,
            "/api/products",
            Some(&staff),
            Some(json!({
                "name": name,
                "specifications": {"brand": brand, "form_factor": "tablet"},
                "variants": [{"sku": sku, "variant_name": "Base", "price": "499.00", "quantity": 50}]
            })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
    }

    // 确认发票累计销量：Surface Go 5 台，Pixel Tablet 2 台
    for (sku, quantity) in [("SG-1", 5), ("PT-1", 2)] {
        let (_, invoice) = request(
            &env.app,
            Method::POST,
            "/api/invoices",
            Some(&staff),
            Some(json!({
                "customer_name": "Dana",
                "items": [{"sku": sku, "quantity": quantity}]
            })),
        )
        .await;
        let id = invoice["id"].as_str().expect("id");
        let (status, _) = request(
            &env.app,
            Method::PUT,
            &format!("/api/invoices/{id}/status"),
            Some(&staff),
            Some(json!({"status": "confirmed"})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
    }

    let (status, listing) = request(
        &env.app,
        Method::GET,
        "/api/products/best-seller",
        None,
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{listing}");
    let names: Vec<&str> = listing
        .as_array()
        .expect("array")
        .iter()
        .filter_map(|p| p["name"].as_str())
        .collect();
    assert_eq!(names[0], "Surface Go");
    assert_eq!(names[1], "Pixel Tablet");

    let (status, specs) = request(&env.app, Method::GET, "/api/products/specs", None, None).await;
    assert_eq!(status, StatusCode::OK, "{specs}");
    let brands: Vec<&str> = specs["brand"]
        .as_array()
        .expect("brand values")
        .iter()
        .filter_map(|v| v.as_str())
        .collect();
    assert!(brands.contains(&"Google"));
    assert!(brands.contains(&"Microsoft"));
    assert_eq!(specs["form_factor"], json!(["tablet"]));
}

#[tokio::test]
async fn test_invoice_flow_and_statistics() {
    let env = setup().await;
    let staff = login(&env.app, "clerk", "clerk-pass-1").await;

    let (_, _product) = request(
        &env.app,
        Method::POST,
        "/api/products",
        Some(&staff),
        Some(json!({
            "name": "USB-C Dock",
            "variants": [{"sku": "DOCK-1", "variant_name": "11-in-1", "price": "65.50", "quantity": 100}]
        })),
    )
    .await;

    // Invoices are staff-only
    let (status, _) = request(&env.app, Method::GET, "/api/invoices", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    // Totals are computed server-side: 3 * 65.50 - 10 + 5 = 191.50
    let (status, invoice) = request(
        &env.app,
        Method::POST,
        "/api/invoices",
        Some(&staff),
        Some(json!({
            "customer_name": "Dana",
            "items": [{"sku": "DOCK-1", "quantity": 3}],
            "discount": "10",
            "shipping_fee": "5"
        })),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{invoice}");
    assert_eq!(invoice["subtotal"], "196.50");
    assert_eq!(invoice["total"], "191.50");
    assert_eq!(invoice["status"], "pending");
    assert_eq!(invoice["items"][0]["product_name"], "USB-C Dock");

    let id = invoice["id"].as_str().expect("id");

    // pending -> shipped is not a legal transition
    let (status, body) = request(
        &env.app,
        Method::PUT,
        &format!("/api/invoices/{id}/status"),
        Some(&staff),
        Some(json!({"status": "shipped"})),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["code"], "E0005");

    // pending -> confirmed bumps the sold counter
    let (status, confirmed) = request(
        &env.app,
        Method::PUT,
        &format!("/api/invoices/{id}/status"),
        Some(&staff),
        Some(json!({"status": "confirmed"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(confirmed["status"], "confirmed");

    let (_, product) = request(&env.app, Method::GET, "/api/products/usb-c-dock", None, None).await;
    assert_eq!(product["variants"][0]["sold"], 3);

    // Statistics cover the confirmed invoice
    let (status, stats) = request(
        &env.app,
        Method::GET,
        "/api/statistics?timeRange=today",
        Some(&staff),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{stats}");
    assert_eq!(stats["summary"]["invoice_count"], 1);
    assert_eq!(stats["summary"]["units_sold"], 3);
    assert_eq!(stats["summary"]["revenue"], "191.50");
    assert_eq!(stats["top_products"][0]["product_name"], "USB-C Dock");
}

#[tokio::test]
async fn test_unknown_sku_rejected_on_invoice() {
    let env = setup().await;
    let staff = login(&env.app, "clerk", "clerk-pass-1").await;

    let (status, body) = request(
        &env.app,
        Method::POST,
        "/api/invoices",
        Some(&staff),
        Some(json!({
            "customer_name": "Dana",
            "items": [{"sku": "NOPE-404", "quantity": 1}]
        })),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["code"], "E0003");
}
