//! Product Model

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Product entity
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Product {
    pub id: Option<String>,
    pub name: String,
    /// URL-safe identity derived from the name, unique across products
    pub slug: String,
    /// Category reference
    pub category: Option<String>,
    /// Free-form specification map (brand, display, cpu, ...)
    #[serde(default)]
    pub specifications: serde_json::Value,
    /// Purchasable variants, at least one per product
    #[serde(default)]
    pub variants: Vec<ProductVariant>,
    /// Average star rating, `None` until first rating arrives
    pub rating_average: Option<f64>,
    #[serde(default)]
    pub rating_count: i64,
    #[serde(default)]
    pub views: i64,
    #[serde(default)]
    pub is_hidden: bool,
}

/// Product variant (embedded sub-document)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProductVariant {
    /// Stock-keeping unit, unique within the product
    pub sku: String,
    pub variant_name: String,
    pub price: Decimal,
    /// Pre-discount list price shown struck through in the storefront
    pub market_price: Option<Decimal>,
    #[serde(default)]
    pub quantity: i32,
    #[serde(default)]
    pub thumbnail: String,
    #[serde(default)]
    pub pictures: Vec<String>,
    /// Units sold, maintained by confirmed invoices
    #[serde(default)]
    pub sold: i64,
}
