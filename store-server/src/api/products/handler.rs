//! Product API Handlers

use std::collections::BTreeMap;

use axum::{
    Json,
    extract::{Path, Query, State},
};
use serde::Deserialize;

use crate::auth::MaybeUser;
use crate::core::ServerState;
use crate::db::models::{ProductCreate, ProductUpdate, ProductVariant};
use crate::db::repository::{ProductRepository, product::ProductSuggestion};
use crate::utils::validation::{
    MAX_NAME_LEN, validate_rating, validate_required_text,
};
use crate::utils::{AppError, AppResult};
use shared::models::Product as SharedProduct;

/// 畅销榜和搜索建议的默认条数
const DEFAULT_LIST_LIMIT: usize = 10;

/// GET /api/products - 可见商品列表
pub async fn list(State(state): State<ServerState>) -> AppResult<Json<Vec<SharedProduct>>> {
    let repo = ProductRepository::new(state.db.clone());
    let products = repo.find_all(false).await?;
    Ok(Json(products.into_iter().map(Into::into).collect()))
}

/// GET /api/products/all - 全部商品 (含隐藏)
pub async fn list_all(State(state): State<ServerState>) -> AppResult<Json<Vec<SharedProduct>>> {
    let repo = ProductRepository::new(state.db.clone());
    let products = repo.find_all(true).await?;
    Ok(Json(products.into_iter().map(Into::into).collect()))
}

/// GET /api/products/specs - 规格筛选索引
pub async fn specification_index(
    State(state): State<ServerState>,
) -> AppResult<Json<BTreeMap<String, Vec<String>>>> {
    let repo = ProductRepository::new(state.db.clone());
    let index = repo.specification_index().await?;
    Ok(Json(index))
}

/// GET /api/products/best-seller - 按销量排序的可见商品
pub async fn best_sellers(State(state): State<ServerState>) -> AppResult<Json<Vec<SharedProduct>>> {
    let repo = ProductRepository::new(state.db.clone());
    let products = repo.best_sellers(DEFAULT_LIST_LIMIT).await?;
    Ok(Json(products.into_iter().map(Into::into).collect()))
}

#[derive(Debug, Deserialize)]
pub struct SuggestQuery {
    #[serde(default)]
    pub q: String,
}

/// GET /api/products/search/suggest?q= - 搜索建议
pub async fn suggest(
    State(state): State<ServerState>,
    Query(query): Query<SuggestQuery>,
) -> AppResult<Json<Vec<ProductSuggestion>>> {
    let term = query.q.trim();
    if term.is_empty() {
        return Ok(Json(Vec::new()));
    }

    let repo = ProductRepository::new(state.db.clone());
    let suggestions = repo.suggest(term, DEFAULT_LIST_LIMIT).await?;
    Ok(Json(suggestions))
}

/// GET /api/products/{identity} - 商品详情 (record id 或 slug)
///
/// 每次访问递增浏览计数；隐藏商品仅 admin/staff 可见
pub async fn get_by_identity(
    State(state): State<ServerState>,
    MaybeUser(user): MaybeUser,
    Path(identity): Path<String>,
) -> AppResult<Json<SharedProduct>> {
    let repo = ProductRepository::new(state.db.clone());
    let product = repo
        .find_by_identity(&identity)
        .await?
        .ok_or_else(|| AppError::not_found(format!("Product {} not found", identity)))?;

    let can_see_hidden = user.map(|u| u.is_admin_or_staff()).unwrap_or(false);
    if product.is_hidden && !can_see_hidden {
        return Err(AppError::not_found(format!(
            "Product {} not found",
            identity
        )));
    }

    if let Some(ref id) = product.id {
        repo.bump_views(id).await?;
    }

    Ok(Json(product.into()))
}

/// POST /api/products - 创建商品
pub async fn create(
    State(state): State<ServerState>,
    Json(payload): Json<ProductCreate>,
) -> AppResult<Json<SharedProduct>> {
    validate_required_text(&payload.name, "product name", MAX_NAME_LEN)?;
    for variant in &payload.variants {
        validate_variant(variant)?;
    }

    let repo = ProductRepository::new(state.db.clone());
    let product = repo.create(payload).await?;
    Ok(Json(product.into()))
}

/// PUT /api/products/{identity} - 更新商品
pub async fn update(
    State(state): State<ServerState>,
    Path(identity): Path<String>,
    Json(payload): Json<ProductUpdate>,
) -> AppResult<Json<SharedProduct>> {
    if let Some(ref name) = payload.name {
        validate_required_text(name, "product name", MAX_NAME_LEN)?;
    }
    if let Some(ref variants) = payload.variants {
        for variant in variants {
            validate_variant(variant)?;
        }
    }

    let repo = ProductRepository::new(state.db.clone());
    let product = repo.update(&identity, payload).await?;
    Ok(Json(product.into()))
}

/// DELETE /api/products/{identity} - 删除商品
pub async fn delete(
    State(state): State<ServerState>,
    Path(identity): Path<String>,
) -> AppResult<Json<bool>> {
    let repo = ProductRepository::new(state.db.clone());
    let result = repo.delete(&identity).await?;
    Ok(Json(result))
}

/// PUT /api/products/{identity}/toggle-hide - 切换隐藏状态
pub async fn toggle_hide(
    State(state): State<ServerState>,
    Path(identity): Path<String>,
) -> AppResult<Json<SharedProduct>> {
    let repo = ProductRepository::new(state.db.clone());
    let product = repo.toggle_hide(&identity).await?;
    Ok(Json(product.into()))
}

#[derive(Debug, Deserialize)]
pub struct RatingRequest {
    pub rating: i32,
}

/// PUT /api/products/{identity}/rate - 提交评分 (任意用户)
pub async fn rate(
    State(state): State<ServerState>,
    Path(identity): Path<String>,
    Json(payload): Json<RatingRequest>,
) -> AppResult<Json<SharedProduct>> {
    validate_rating(payload.rating)?;

    let repo = ProductRepository::new(state.db.clone());
    let product = repo.rate(&identity, payload.rating as i64).await?;
    Ok(Json(product.into()))
}

/// POST /api/products/{identity}/variants - 新增变体
pub async fn add_variant(
    State(state): State<ServerState>,
    Path(identity): Path<String>,
    Json(payload): Json<ProductVariant>,
) -> AppResult<Json<SharedProduct>> {
    validate_variant(&payload)?;

    let repo = ProductRepository::new(state.db.clone());
    let product = repo.add_variant(&identity, payload).await?;
    Ok(Json(product.into()))
}

/// PUT /api/products/{identity}/variants/{sku} - 更新变体
pub async fn update_variant(
    State(state): State<ServerState>,
    Path((identity, sku)): Path<(String, String)>,
    Json(payload): Json<ProductVariant>,
) -> AppResult<Json<SharedProduct>> {
    validate_variant(&payload)?;

    let repo = ProductRepository::new(state.db.clone());
    let product = repo.update_variant(&identity, &sku, payload).await?;
    Ok(Json(product.into()))
}

/// DELETE /api/products/{identity}/variants/{sku} - 删除变体
pub async fn delete_variant(
    State(state): State<ServerState>,
    Path((identity, sku)): Path<(String, String)>,
) -> AppResult<Json<SharedProduct>> {
    let repo = ProductRepository::new(state.db.clone());
    let product = repo.delete_variant(&identity, &sku).await?;
    Ok(Json(product.into()))
}

fn validate_variant(variant: &ProductVariant) -> Result<(), AppError> {
    use crate::utils::validation::MAX_SHORT_TEXT_LEN;
    use rust_decimal::Decimal;

    validate_required_text(&variant.sku, "sku", MAX_SHORT_TEXT_LEN)?;
    validate_required_text(&variant.variant_name, "variant name", MAX_NAME_LEN)?;
    if variant.price < Decimal::ZERO {
        return Err(AppError::validation("price cannot be negative"));
    }
    if variant.quantity < 0 {
        return Err(AppError::validation("quantity cannot be negative"));
    }
    if variant.pictures.len() > 20 {
        return Err(AppError::validation(
            "a variant can hold at most 20 pictures",
        ));
    }
    Ok(())
}
