//! Invoice Repository
//!
//! 发票创建时把商品名称和单价反范式化进订单行，
//! 之后商品变动不影响历史发票。

use rust_decimal::Decimal;
use shared::models::InvoiceStatus;
use surrealdb::engine::local::Db;
use surrealdb::{RecordId, Surreal};

use super::{BaseRepository, ProductRepository, RepoError, RepoResult};
use crate::db::models::{Invoice, InvoiceCreate, InvoiceItem};

const TABLE: &str = "invoice";

#[derive(Clone)]
pub struct InvoiceRepository {
    base: BaseRepository,
}

impl InvoiceRepository {
    pub fn new(db: Surreal<Db>) -> Self {
        Self {
            base: BaseRepository::new(db),
        }
    }

    /// Find all invoices, newest first
    pub async fn find_all(&self) -> RepoResult<Vec<Invoice>> {
        let invoices: Vec<Invoice> = self
            .base
            .db()
            .query("SELECT * FROM invoice ORDER BY created_at DESC")
            .await?
            .take(0)?;
        Ok(invoices)
    }

    /// Find invoice by id ("invoice:xxx")
    pub async fn find_by_id(&self, id: &str) -> RepoResult<Option<Invoice>> {
        let thing = parse_id(id)?;
        let invoice: Option<Invoice> = self.base.db().select(thing).await?;
        Ok(invoice)
    }

    /// Non-cancelled invoices created inside [start, end]
    ///
    /// Timestamps are RFC3339 UTC strings, so string comparison preserves
    /// chronological order.
    pub async fn find_in_range(&self, start: &str, end: &str) -> RepoResult<Vec<Invoice>> {
        let invoices: Vec<Invoice> = self
            .base
            .db()
            .query(
                r#"SELECT * FROM invoice
                    WHERE status != 'cancelled'
                    AND created_at >= $start
                    AND created_at <= $end
                    ORDER BY created_at"#,
            )
            .bind(("start", start.to_string()))
            .bind(("end", end.to_string()))
            .await?
            .take(0)?;
        Ok(invoices)
    }

    /// Create a new invoice
    ///
    /// Line items reference variants by SKU; names and unit prices are
    /// copied from the catalog at this moment. All money fields are
    /// computed server-side, client-supplied totals are never trusted.
    pub async fn create(&self, data: InvoiceCreate) -> RepoResult<Invoice> {
        if data.items.is_empty() {
            return Err(RepoError::Validation(
                "Invoice needs at least one item".to_string(),
            ));
        }

        let discount = data.discount.unwrap_or_default();
        let shipping_fee = data.shipping_fee.unwrap_or_default();
        if discount < Decimal::ZERO || shipping_fee < Decimal::ZERO {
            return Err(RepoError::Validation(
                "Discount and shipping fee cannot be negative".to_string(),
            ));
        }

        let mut items = Vec::with_capacity(data.items.len());
        for line in &data.items {
            if line.quantity < 1 {
                return Err(RepoError::Validation(format!(
                    "Quantity for SKU '{}' must be at least 1",
                    line.sku
                )));
            }

            let mut result = self
                .base
                .db()
                .query("SELECT * FROM product WHERE $sku IN variants.sku LIMIT 1")
                .bind(("sku", line.sku.clone()))
                .await?;
            let found: Vec<crate::db::models::Product> = result.take(0)?;
            let product = found
                .into_iter()
                .next()
                .ok_or_else(|| RepoError::NotFound(format!("SKU '{}' not found", line.sku)))?;
            let variant = product
                .variant(&line.sku)
                .ok_or_else(|| RepoError::NotFound(format!("SKU '{}' not found", line.sku)))?;

            items.push(InvoiceItem {
                product_name: product.name.clone(),
                variant_name: variant.variant_name.clone(),
                sku: variant.sku.clone(),
                quantity: line.quantity,
                price_per_unit: variant.price,
            });
        }

        let subtotal: Decimal = items.iter().map(|i| i.line_total()).sum();
        let total = (subtotal - discount + shipping_fee).max(Decimal::ZERO);

        let invoice = Invoice {
            id: None,
            status: InvoiceStatus::Pending,
            customer_name: data.customer_name,
            phone: data.phone,
            address: data.address,
            items,
            subtotal,
            discount,
            shipping_fee,
            total,
            note: data.note,
            created_at: chrono::Utc::now().to_rfc3339(),
        };

        let created: Option<Invoice> = self.base.db().create(TABLE).content(invoice).await?;
        created.ok_or_else(|| RepoError::Database("Failed to create invoice".to_string()))
    }

    /// Apply a status transition
    ///
    /// Moving into `confirmed` bumps the sold counters of every
    /// referenced variant.
    pub async fn update_status(&self, id: &str, next: InvoiceStatus) -> RepoResult<Invoice> {
        let thing = parse_id(id)?;
        let existing = self
            .find_by_id(id)
            .await?
            .ok_or_else(|| RepoError::NotFound(format!("Invoice {} not found", id)))?;

        if !existing.status.can_transition_to(next) {
            return Err(RepoError::Rule(format!(
                "Cannot move invoice from '{}' to '{}'",
                existing.status, next
            )));
        }

        self.base
            .db()
            .query("UPDATE $thing SET status = $status")
            .bind(("thing", thing.clone()))
            .bind(("status", next))
            .await?;

        if next == InvoiceStatus::Confirmed {
            let products = ProductRepository::new(self.base.db().clone());
            for item in &existing.items {
                products
                    .increment_sold(&item.sku, item.quantity as i64)
                    .await?;
            }
        }

        let updated: Option<Invoice> = self.base.db().select(thing).await?;
        updated.ok_or_else(|| RepoError::NotFound(format!("Invoice {} not found", id)))
    }
}

fn parse_id(id: &str) -> RepoResult<RecordId> {
    if let Ok(thing) = id.parse::<RecordId>()
        && thing.table() == TABLE
    {
        return Ok(thing);
    }
    if !id.contains(':') {
        return Ok(RecordId::from_table_key(TABLE, id));
    }
    Err(RepoError::Validation(format!("Invalid invoice ID: {}", id)))
}
