//! Category API Handlers

use axum::{
    Json,
    extract::{Path, State},
};

use crate::auth::MaybeUser;
use crate::core::ServerState;
use crate::db::models::{CategoryCreate, CategoryUpdate};
use crate::db::repository::CategoryRepository;
use crate::utils::validation::validate_category_name;
use crate::utils::{AppError, AppResult};
use shared::models::Category as SharedCategory;

/// GET /api/categories - 获取分类列表
///
/// 匿名调用者只看到可见分类，admin/staff 看到全部
pub async fn list(
    State(state): State<ServerState>,
    MaybeUser(user): MaybeUser,
) -> AppResult<Json<Vec<SharedCategory>>> {
    let include_hidden = user.map(|u| u.is_admin_or_staff()).unwrap_or(false);
    let repo = CategoryRepository::new(state.db.clone());
    let categories = repo.find_all(include_hidden).await?;
    Ok(Json(categories.into_iter().map(Into::into).collect()))
}

/// GET /api/categories/{id} - 获取单个分类
pub async fn get_by_id(
    State(state): State<ServerState>,
    Path(id): Path<String>,
) -> AppResult<Json<SharedCategory>> {
    let repo = CategoryRepository::new(state.db.clone());
    let category = repo
        .find_by_id(&id)
        .await?
        .ok_or_else(|| AppError::not_found(format!("Category {} not found", id)))?;
    Ok(Json(category.into()))
}

/// POST /api/categories - 创建分类
pub async fn create(
    State(state): State<ServerState>,
    Json(payload): Json<CategoryCreate>,
) -> AppResult<Json<SharedCategory>> {
    validate_category_name(&payload.name)?;

    let repo = CategoryRepository::new(state.db.clone());
    let category = repo.create(payload).await?;
    Ok(Json(category.into()))
}

/// PUT /api/categories/{id} - 更新分类
pub async fn update(
    State(state): State<ServerState>,
    Path(id): Path<String>,
    Json(payload): Json<CategoryUpdate>,
) -> AppResult<Json<SharedCategory>> {
    if let Some(ref name) = payload.name {
        validate_category_name(name)?;
    }

    let repo = CategoryRepository::new(state.db.clone());
    let category = repo.update(&id, payload).await?;
    Ok(Json(category.into()))
}

/// DELETE /api/categories/{id} - 删除分类
pub async fn delete(
    State(state): State<ServerState>,
    Path(id): Path<String>,
) -> AppResult<Json<bool>> {
    let repo = CategoryRepository::new(state.db.clone());
    let result = repo.delete(&id).await?;
    Ok(Json(result))
}
