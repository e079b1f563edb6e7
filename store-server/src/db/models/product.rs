//! Product Model
//!
//! 商品与嵌入式变体 (SKU) 的表结构。
//! 变体作为数组内嵌在商品记录中，不单独建表。

use super::serde_helpers;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use surrealdb::RecordId;

pub type ProductId = RecordId;

/// Embedded product variant (one purchasable SKU)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProductVariant {
    /// Unique within the product
    pub sku: String,
    pub variant_name: String,
    pub price: Decimal,
    /// Strike-through reference price (optional)
    #[serde(default)]
    pub market_price: Option<Decimal>,
    /// Units in stock
    #[serde(default)]
    pub quantity: i32,
    #[serde(default)]
    pub thumbnail: Option<String>,
    #[serde(default)]
    pub pictures: Vec<String>,
    /// Units sold across confirmed invoices
    #[serde(default)]
    pub sold: i64,
}

/// Product model
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Product {
    #[serde(default, with = "serde_helpers::option_record_id")]
    pub id: Option<ProductId>,
    pub name: String,
    /// URL-safe identifier derived from the name, unique
    pub slug: String,
    #[serde(default, with = "serde_helpers::option_record_link")]
    pub category: Option<RecordId>,
    /// Free-form key/value specification sheet
    #[serde(default)]
    pub specifications: serde_json::Value,
    #[serde(default)]
    pub variants: Vec<ProductVariant>,
    /// Sum of all submitted ratings (1-5 each)
    #[serde(default)]
    pub rating_sum: i64,
    #[serde(default)]
    pub rating_count: i64,
    /// Detail page view counter
    #[serde(default)]
    pub views: i64,
    #[serde(default, deserialize_with = "serde_helpers::bool_false")]
    pub is_hidden: bool,
    #[serde(default)]
    pub created_at: Option<String>,
}

impl Product {
    /// Average rating, None until the first rating arrives
    pub fn rating_average(&self) -> Option<f64> {
        if self.rating_count > 0 {
            Some(self.rating_sum as f64 / self.rating_count as f64)
        } else {
            None
        }
    }

    /// Find an embedded variant by SKU
    pub fn variant(&self, sku: &str) -> Option<&ProductVariant> {
        self.variants.iter().find(|v| v.sku == sku)
    }
}

/// Create product payload
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProductCreate {
    pub name: String,
    /// Explicit slug; generated from the name when omitted
    #[serde(default)]
    pub slug: Option<String>,
    /// Category ID ("category:xxx")
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub specifications: Option<serde_json::Value>,
    pub variants: Vec<ProductVariant>,
    #[serde(default)]
    pub is_hidden: Option<bool>,
}

/// Update product payload
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProductUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub slug: Option<String>,
    /// Category ID; `Some(None)` clears the category
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<Option<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub specifications: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub variants: Option<Vec<ProductVariant>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_hidden: Option<bool>,
}
