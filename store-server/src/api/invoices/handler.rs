//! Invoice API Handlers

use axum::{
    Json,
    extract::{Path, State},
};

use crate::core::ServerState;
use crate::db::models::{InvoiceCreate, InvoiceStatusUpdate};
use crate::db::repository::InvoiceRepository;
use crate::utils::validation::{
    MAX_ADDRESS_LEN, MAX_NAME_LEN, MAX_NOTE_LEN, MAX_SHORT_TEXT_LEN, validate_optional_text,
    validate_required_text,
};
use crate::utils::{AppError, AppResult};
use shared::models::Invoice as SharedInvoice;

/// GET /api/invoices - 发票列表 (新的在前)
pub async fn list(State(state): State<ServerState>) -> AppResult<Json<Vec<SharedInvoice>>> {
    let repo = InvoiceRepository::new(state.db.clone());
    let invoices = repo.find_all().await?;
    Ok(Json(invoices.into_iter().map(Into::into).collect()))
}

/// GET /api/invoices/{id} - 发票详情
pub async fn get_by_id(
    State(state): State<ServerState>,
    Path(id): Path<String>,
) -> AppResult<Json<SharedInvoice>> {
    let repo = InvoiceRepository::new(state.db.clone());
    let invoice = repo
        .find_by_id(&id)
        .await?
        .ok_or_else(|| AppError::not_found(format!("Invoice {} not found", id)))?;
    Ok(Json(invoice.into()))
}

/// POST /api/invoices - 创建发票
///
/// 金额由服务端根据订单行计算
pub async fn create(
    State(state): State<ServerState>,
    Json(payload): Json<InvoiceCreate>,
) -> AppResult<Json<SharedInvoice>> {
    validate_required_text(&payload.customer_name, "customer name", MAX_NAME_LEN)?;
    validate_optional_text(&payload.phone, "phone", MAX_SHORT_TEXT_LEN)?;
    validate_optional_text(&payload.address, "address", MAX_ADDRESS_LEN)?;
    validate_optional_text(&payload.note, "note", MAX_NOTE_LEN)?;

    let repo = InvoiceRepository::new(state.db.clone());
    let invoice = repo.create(payload).await?;
    Ok(Json(invoice.into()))
}

/// PUT /api/invoices/{id}/status - 状态流转
pub async fn update_status(
    State(state): State<ServerState>,
    Path(id): Path<String>,
    Json(payload): Json<InvoiceStatusUpdate>,
) -> AppResult<Json<SharedInvoice>> {
    let repo = InvoiceRepository::new(state.db.clone());
    let invoice = repo.update_status(&id, payload.status).await?;
    Ok(Json(invoice.into()))
}
