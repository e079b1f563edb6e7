//! Invoice Model
//!
//! 发票记录：客户信息、订单行、金额和状态。
//! 状态流转规则定义在 `shared::models::InvoiceStatus`。

use super::serde_helpers;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use shared::models::InvoiceStatus;
use surrealdb::RecordId;

pub type InvoiceId = RecordId;

/// One line of an invoice, denormalized from the product at creation time
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InvoiceItem {
    pub product_name: String,
    pub variant_name: String,
    pub sku: String,
    pub quantity: i32,
    pub price_per_unit: Decimal,
}

impl InvoiceItem {
    pub fn line_total(&self) -> Decimal {
        self.price_per_unit * Decimal::from(self.quantity)
    }
}

/// Invoice model
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Invoice {
    #[serde(default, with = "serde_helpers::option_record_id")]
    pub id: Option<InvoiceId>,
    pub status: InvoiceStatus,
    pub customer_name: String,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub address: Option<String>,
    pub items: Vec<InvoiceItem>,
    /// Sum of line totals, computed server-side
    pub subtotal: Decimal,
    #[serde(default)]
    pub discount: Decimal,
    #[serde(default)]
    pub shipping_fee: Decimal,
    /// subtotal - discount + shipping_fee, floored at zero
    pub total: Decimal,
    #[serde(default)]
    pub note: Option<String>,
    pub created_at: String,
}

/// 创建发票时的单行输入 (按 SKU 引用商品)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InvoiceItemCreate {
    pub sku: String,
    pub quantity: i32,
}

/// Create invoice payload
///
/// 金额字段 subtotal/total 不接受客户端输入，由服务端计算
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InvoiceCreate {
    pub customer_name: String,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub address: Option<String>,
    pub items: Vec<InvoiceItemCreate>,
    #[serde(default)]
    pub discount: Option<Decimal>,
    #[serde(default)]
    pub shipping_fee: Option<Decimal>,
    #[serde(default)]
    pub note: Option<String>,
}

/// Status change payload
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InvoiceStatusUpdate {
    pub status: InvoiceStatus,
}
