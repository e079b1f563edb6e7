//! Product Repository
//!
//! 商品主表加内嵌变体的读写。变体修改走 read-modify-write：
//! 取出整条记录，在内存中改 variants 数组，再 MERGE 回去。

use std::collections::BTreeMap;
use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use surrealdb::engine::local::Db;
use surrealdb::{RecordId, Surreal};

use super::{BaseRepository, RepoError, RepoResult};
use crate::db::models::{Product, ProductCreate, ProductUpdate, ProductVariant};
use crate::utils::validation::slugify;

const TABLE: &str = "product";

/// Name/slug pair returned by search suggestions
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProductSuggestion {
    pub name: String,
    pub slug: String,
}

#[derive(Clone)]
pub struct ProductRepository {
    base: BaseRepository,
}

impl ProductRepository {
    pub fn new(db: Surreal<Db>) -> Self {
        Self {
            base: BaseRepository::new(db),
        }
    }

    /// Find products, newest first
    pub async fn find_all(&self, include_hidden: bool) -> RepoResult<Vec<Product>> {
        let query = if include_hidden {
            "SELECT * FROM product ORDER BY created_at DESC"
        } else {
            "SELECT * FROM product WHERE is_hidden = false ORDER BY created_at DESC"
        };
        let products: Vec<Product> = self.base.db().query(query).await?.take(0)?;
        Ok(products)
    }

    /// Resolve `identity` as a record id first, then as a slug
    pub async fn find_by_identity(&self, identity: &str) -> RepoResult<Option<Product>> {
        if let Ok(thing) = identity.parse::<RecordId>()
            && thing.table() == TABLE
        {
            let product: Option<Product> = self.base.db().select(thing).await?;
            return Ok(product);
        }
        self.find_by_slug(identity).await
    }

    /// Find product by slug
    pub async fn find_by_slug(&self, slug: &str) -> RepoResult<Option<Product>> {
        let slug_owned = slug.to_string();
        let mut result = self
            .base
            .db()
            .query("SELECT * FROM product WHERE slug = $slug LIMIT 1")
            .bind(("slug", slug_owned))
            .await?;
        let products: Vec<Product> = result.take(0)?;
        Ok(products.into_iter().next())
    }

    /// Increment the detail page view counter
    pub async fn bump_views(&self, id: &RecordId) -> RepoResult<()> {
        self.base
            .db()
            .query("UPDATE $thing SET views += 1")
            .bind(("thing", id.clone()))
            .await?;
        Ok(())
    }

    /// Create a new product
    pub async fn create(&self, data: ProductCreate) -> RepoResult<Product> {
        if data.variants.is_empty() {
            return Err(RepoError::Validation(
                "Product needs at least one variant".to_string(),
            ));
        }
        assert_unique_skus(&data.variants)?;

        let slug = match data.slug {
            Some(s) if !s.trim().is_empty() => s,
            _ => slugify(&data.name),
        };
        if self.find_by_slug(&slug).await?.is_some() {
            return Err(RepoError::Duplicate(format!(
                "Slug '{}' already exists",
                slug
            )));
        }

        let category = match data.category {
            Some(ref cid) => Some(parse_category_id(cid)?),
            None => None,
        };

        let product = Product {
            id: None,
            name: data.name,
            slug,
            category,
            specifications: data
                .specifications
                .unwrap_or(serde_json::Value::Object(Default::default())),
            variants: data.variants,
            rating_sum: 0,
            rating_count: 0,
            views: 0,
            is_hidden: data.is_hidden.unwrap_or(false),
            created_at: Some(chrono::Utc::now().to_rfc3339()),
        };

        let created: Option<Product> = self.base.db().create(TABLE).content(product).await?;
        created.ok_or_else(|| RepoError::Database("Failed to create product".to_string()))
    }

    /// Update a product
    pub async fn update(&self, identity: &str, data: ProductUpdate) -> RepoResult<Product> {
        let existing = self
            .find_by_identity(identity)
            .await?
            .ok_or_else(|| RepoError::NotFound(format!("Product {} not found", identity)))?;
        let thing = record_id_of(&existing)?;

        if let Some(ref new_slug) = data.slug
            && new_slug != &existing.slug
            && self.find_by_slug(new_slug).await?.is_some()
        {
            return Err(RepoError::Duplicate(format!(
                "Slug '{}' already exists",
                new_slug
            )));
        }

        if let Some(ref variants) = data.variants {
            if variants.is_empty() {
                return Err(RepoError::Validation(
                    "Product needs at least one variant".to_string(),
                ));
            }
            assert_unique_skus(variants)?;
        }

        let category = match data.category {
            Some(Some(ref cid)) => Some(Some(parse_category_id(cid)?)),
            Some(None) => Some(None),
            None => None,
        };

        #[derive(Serialize)]
        struct ProductUpdateDb {
            #[serde(skip_serializing_if = "Option::is_none")]
            name: Option<String>,
            #[serde(skip_serializing_if = "Option::is_none")]
            slug: Option<String>,
            #[serde(skip_serializing_if = "Option::is_none")]
            category: Option<Option<RecordId>>,
            #[serde(skip_serializing_if = "Option::is_none")]
            specifications: Option<serde_json::Value>,
            #[serde(skip_serializing_if = "Option::is_none")]
            variants: Option<Vec<ProductVariant>>,
            #[serde(skip_serializing_if = "Option::is_none")]
            is_hidden: Option<bool>,
        }

        let update_data = ProductUpdateDb {
            name: data.name,
            slug: data.slug,
            category,
            specifications: data.specifications,
            variants: data.variants,
            is_hidden: data.is_hidden,
        };

        self.base
            .db()
            .query("UPDATE $thing MERGE $data")
            .bind(("thing", thing.clone()))
            .bind(("data", update_data))
            .await?;

        let updated: Option<Product> = self.base.db().select(thing).await?;
        updated.ok_or_else(|| RepoError::NotFound(format!("Product {} not found", identity)))
    }

    /// Hard delete a product
    pub async fn delete(&self, identity: &str) -> RepoResult<bool> {
        let existing = self
            .find_by_identity(identity)
            .await?
            .ok_or_else(|| RepoError::NotFound(format!("Product {} not found", identity)))?;
        let thing = record_id_of(&existing)?;

        self.base
            .db()
            .query("DELETE $thing")
            .bind(("thing", thing))
            .await?;
        Ok(true)
    }

    /// Flip the hidden flag, returns the updated product
    pub async fn toggle_hide(&self, identity: &str) -> RepoResult<Product> {
        let existing = self
            .find_by_identity(identity)
            .await?
            .ok_or_else(|| RepoError::NotFound(format!("Product {} not found", identity)))?;
        let thing = record_id_of(&existing)?;

        self.base
            .db()
            .query("UPDATE $thing SET is_hidden = $hidden")
            .bind(("thing", thing.clone()))
            .bind(("hidden", !existing.is_hidden))
            .await?;

        let updated: Option<Product> = self.base.db().select(thing).await?;
        updated.ok_or_else(|| RepoError::NotFound(format!("Product {} not found", identity)))
    }

    /// Record a rating (caller validates the 1-5 range)
    pub async fn rate(&self, identity: &str, rating: i64) -> RepoResult<Product> {
        let existing = self
            .find_by_identity(identity)
            .await?
            .ok_or_else(|| RepoError::NotFound(format!("Product {} not found", identity)))?;
        let thing = record_id_of(&existing)?;

        self.base
            .db()
            .query("UPDATE $thing SET rating_sum += $rating, rating_count += 1")
            .bind(("thing", thing.clone()))
            .bind(("rating", rating))
            .await?;

        let updated: Option<Product> = self.base.db().select(thing).await?;
        updated.ok_or_else(|| RepoError::NotFound(format!("Product {} not found", identity)))
    }

    /// Top visible products by total units sold
    ///
    /// ORDER BY 只接受字段名，销量合计先投影成别名再排序
    pub async fn best_sellers(&self, limit: usize) -> RepoResult<Vec<Product>> {
        let products: Vec<Product> = self
            .base
            .db()
            .query(
                r#"SELECT *, math::sum(variants.sold) AS total_sold FROM product
                    WHERE is_hidden = false
                    ORDER BY total_sold DESC
                    LIMIT $limit"#,
            )
            .bind(("limit", limit))
            .await?
            .take(0)?;
        Ok(products)
    }

    /// Case-insensitive name substring suggestions
    pub async fn suggest(&self, term: &str, limit: usize) -> RepoResult<Vec<ProductSuggestion>> {
        let term_owned = term.to_lowercase();
        let mut result = self
            .base
            .db()
            .query(
                r#"SELECT name, slug FROM product
                    WHERE is_hidden = false
                    AND string::contains(string::lowercase(name), $term)
                    LIMIT $limit"#,
            )
            .bind(("term", term_owned))
            .bind(("limit", limit))
            .await?;
        let suggestions: Vec<ProductSuggestion> = result.take(0)?;
        Ok(suggestions)
    }

    /// Distinct specification keys with their observed values
    ///
    /// 前端用它渲染筛选面板，数据量小，直接在内存聚合
    pub async fn specification_index(&self) -> RepoResult<BTreeMap<String, Vec<String>>> {
        #[derive(Deserialize)]
        struct SpecRow {
            #[serde(default)]
            specifications: serde_json::Value,
        }

        let mut result = self
            .base
            .db()
            .query("SELECT specifications FROM product WHERE is_hidden = false")
            .await?;
        let rows: Vec<SpecRow> = result.take(0)?;

        let mut index: BTreeMap<String, BTreeSet<String>> = BTreeMap::new();
        for row in rows {
            if let serde_json::Value::Object(map) = row.specifications {
                for (key, value) in map {
                    let rendered = match value {
                        serde_json::Value::String(s) => s,
                        other => other.to_string(),
                    };
                    index.entry(key).or_default().insert(rendered);
                }
            }
        }

        Ok(index
            .into_iter()
            .map(|(k, v)| (k, v.into_iter().collect()))
            .collect())
    }

    /// Add a variant to a product
    pub async fn add_variant(&self, identity: &str, variant: ProductVariant) -> RepoResult<Product> {
        let mut existing = self
            .find_by_identity(identity)
            .await?
            .ok_or_else(|| RepoError::NotFound(format!("Product {} not found", identity)))?;

        if existing.variant(&variant.sku).is_some() {
            return Err(RepoError::Duplicate(format!(
                "SKU '{}' already exists on this product",
                variant.sku
            )));
        }

        existing.variants.push(variant);
        self.store_variants(&existing).await
    }

    /// Replace a variant identified by SKU
    pub async fn update_variant(
        &self,
        identity: &str,
        sku: &str,
        variant: ProductVariant,
    ) -> RepoResult<Product> {
        let mut existing = self
            .find_by_identity(identity)
            .await?
            .ok_or_else(|| RepoError::NotFound(format!("Product {} not found", identity)))?;

        let pos = existing
            .variants
            .iter()
            .position(|v| v.sku == sku)
            .ok_or_else(|| RepoError::NotFound(format!("Variant '{}' not found", sku)))?;

        // Renaming the SKU must not collide with another variant
        if variant.sku != sku && existing.variant(&variant.sku).is_some() {
            return Err(RepoError::Duplicate(format!(
                "SKU '{}' already exists on this product",
                variant.sku
            )));
        }

        existing.variants[pos] = variant;
        self.store_variants(&existing).await
    }

    /// Remove a variant; the last one cannot be removed
    pub async fn delete_variant(&self, identity: &str, sku: &str) -> RepoResult<Product> {
        let mut existing = self
            .find_by_identity(identity)
            .await?
            .ok_or_else(|| RepoError::NotFound(format!("Product {} not found", identity)))?;

        let pos = existing
            .variants
            .iter()
            .position(|v| v.sku == sku)
            .ok_or_else(|| RepoError::NotFound(format!("Variant '{}' not found", sku)))?;

        if existing.variants.len() == 1 {
            return Err(RepoError::Rule(
                "Cannot remove the last variant of a product".to_string(),
            ));
        }

        existing.variants.remove(pos);
        self.store_variants(&existing).await
    }

    /// Increase the sold counter of the variant holding `sku`
    ///
    /// 发票确认时由 InvoiceRepository 调用
    pub async fn increment_sold(&self, sku: &str, quantity: i64) -> RepoResult<()> {
        let sku_owned = sku.to_string();
        let mut result = self
            .base
            .db()
            .query("SELECT * FROM product WHERE $sku IN variants.sku LIMIT 1")
            .bind(("sku", sku_owned))
            .await?;
        let products: Vec<Product> = result.take(0)?;

        let Some(mut product) = products.into_iter().next() else {
            // Product may have been deleted since the invoice was written
            return Ok(());
        };

        for variant in &mut product.variants {
            if variant.sku == sku {
                variant.sold += quantity;
            }
        }
        self.store_variants(&product).await?;
        Ok(())
    }

    /// Write back the variants array of a loaded product
    async fn store_variants(&self, product: &Product) -> RepoResult<Product> {
        let thing = record_id_of(product)?;

        #[derive(Serialize)]
        struct VariantsPatch {
            variants: Vec<ProductVariant>,
        }

        self.base
            .db()
            .query("UPDATE $thing MERGE $data")
            .bind(("thing", thing.clone()))
            .bind((
                "data",
                VariantsPatch {
                    variants: product.variants.clone(),
                },
            ))
            .await?;

        let updated: Option<Product> = self.base.db().select(thing).await?;
        updated.ok_or_else(|| RepoError::Database("Failed to update variants".to_string()))
    }
}

fn record_id_of(product: &Product) -> RepoResult<RecordId> {
    product
        .id
        .clone()
        .ok_or_else(|| RepoError::Database("Product record has no ID".to_string()))
}

fn parse_category_id(id: &str) -> RepoResult<RecordId> {
    if let Ok(thing) = id.parse::<RecordId>()
        && thing.table() == "category"
    {
        return Ok(thing);
    }
    if !id.contains(':') {
        return Ok(RecordId::from_table_key("category", id));
    }
    Err(RepoError::Validation(format!("Invalid category ID: {}", id)))
}

fn assert_unique_skus(variants: &[ProductVariant]) -> RepoResult<()> {
    let mut seen = BTreeSet::new();
    for variant in variants {
        if !seen.insert(variant.sku.as_str()) {
            return Err(RepoError::Duplicate(format!(
                "Duplicate SKU '{}' in variants",
                variant.sku
            )));
        }
    }
    Ok(())
}
