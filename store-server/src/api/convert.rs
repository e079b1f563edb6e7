//! 类型转换模块
//!
//! 将数据库模型 (db::models) 转换为 API 响应模型 (shared::models)

use chrono::{DateTime, Utc};

use crate::db::models as db;
use shared::models as api;

// ============ Helper ============

pub fn record_id_to_string(id: &surrealdb::RecordId) -> String {
    id.to_string()
}

pub fn option_record_id_to_string(id: &Option<surrealdb::RecordId>) -> Option<String> {
    id.as_ref().map(record_id_to_string)
}

/// RFC3339 字符串转 DateTime，解析失败回退到纪元零点
pub fn parse_timestamp(value: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(value)
        .map(|d| d.with_timezone(&Utc))
        .unwrap_or(DateTime::<Utc>::MIN_UTC)
}

// ============ Category ============

impl From<db::Category> for api::Category {
    fn from(c: db::Category) -> Self {
        Self {
            id: option_record_id_to_string(&c.id),
            name: c.name,
            description: c.description,
            is_hidden: c.is_hidden,
            parent: option_record_id_to_string(&c.parent),
            display_order: c.display_order,
            image: c.image.unwrap_or_default(),
        }
    }
}

// ============ Product ============

impl From<db::ProductVariant> for api::ProductVariant {
    fn from(v: db::ProductVariant) -> Self {
        Self {
            sku: v.sku,
            variant_name: v.variant_name,
            price: v.price,
            market_price: v.market_price,
            quantity: v.quantity,
            thumbnail: v.thumbnail.unwrap_or_default(),
            pictures: v.pictures,
            sold: v.sold,
        }
    }
}

impl From<db::Product> for api::Product {
    fn from(p: db::Product) -> Self {
        let rating_average = p.rating_average();
        Self {
            id: option_record_id_to_string(&p.id),
            name: p.name,
            slug: p.slug,
            category: option_record_id_to_string(&p.category),
            specifications: p.specifications,
            variants: p.variants.into_iter().map(Into::into).collect(),
            rating_average,
            rating_count: p.rating_count,
            views: p.views,
            is_hidden: p.is_hidden,
        }
    }
}

// ============ Invoice ============

impl From<db::InvoiceItem> for api::InvoiceItem {
    fn from(i: db::InvoiceItem) -> Self {
        Self {
            product_name: i.product_name,
            variant_name: i.variant_name,
            sku: i.sku,
            quantity: i.quantity,
            price_per_unit: i.price_per_unit,
        }
    }
}

impl From<db::Invoice> for api::Invoice {
    fn from(inv: db::Invoice) -> Self {
        let created_at = parse_timestamp(&inv.created_at);
        Self {
            id: option_record_id_to_string(&inv.id),
            status: inv.status,
            customer_name: inv.customer_name,
            phone: inv.phone.unwrap_or_default(),
            address: inv.address.unwrap_or_default(),
            items: inv.items.into_iter().map(Into::into).collect(),
            subtotal: inv.subtotal,
            discount: inv.discount,
            shipping_fee: inv.shipping_fee,
            total: inv.total,
            note: inv.note.unwrap_or_default(),
            created_at,
        }
    }
}
