//! Category Repository

use super::{BaseRepository, RepoError, RepoResult};
use crate::db::models::{Category, CategoryCreate, CategoryUpdate};
use serde::Serialize;
use surrealdb::{RecordId, Surreal};
use surrealdb::engine::local::Db;

const TABLE: &str = "category";

#[derive(Clone)]
pub struct CategoryRepository {
    base: BaseRepository,
}

impl CategoryRepository {
    pub fn new(db: Surreal<Db>) -> Self {
        Self {
            base: BaseRepository::new(db),
        }
    }

    /// Find categories ordered by display_order
    ///
    /// Hidden categories are excluded unless `include_hidden` is set
    /// (admin/staff listings pass true).
    pub async fn find_all(&self, include_hidden: bool) -> RepoResult<Vec<Category>> {
        let query = if include_hidden {
            "SELECT * FROM category ORDER BY display_order"
        } else {
            "SELECT * FROM category WHERE is_hidden = false ORDER BY display_order"
        };
        let categories: Vec<Category> = self.base.db().query(query).await?.take(0)?;
        Ok(categories)
    }

    /// Find category by id ("category:xxx")
    pub async fn find_by_id(&self, id: &str) -> RepoResult<Option<Category>> {
        let thing = parse_id(id)?;
        let category: Option<Category> = self.base.db().select(thing).await?;
        Ok(category)
    }

    /// Find category by name
    pub async fn find_by_name(&self, name: &str) -> RepoResult<Option<Category>> {
        let name_owned = name.to_string();
        let mut result = self
            .base
            .db()
            .query("SELECT * FROM category WHERE name = $name LIMIT 1")
            .bind(("name", name_owned))
            .await?;
        let categories: Vec<Category> = result.take(0)?;
        Ok(categories.into_iter().next())
    }

    /// display_order 在可见分类中必须唯一
    ///
    /// `exclude` 为更新时的自身 ID
    async fn assert_order_available(
        &self,
        display_order: i32,
        exclude: Option<&RecordId>,
    ) -> RepoResult<()> {
        let mut result = self
            .base
            .db()
            .query(
                r#"SELECT count() FROM category
                    WHERE display_order = $display_order
                    AND is_hidden = false
                    AND ($exclude IS NONE OR id != $exclude)
                    GROUP ALL"#,
            )
            .bind(("display_order", display_order))
            .bind(("exclude", exclude.cloned()))
            .await?;
        let count: Option<i64> = result.take((0, "count"))?;

        if count.unwrap_or(0) > 0 {
            return Err(RepoError::Duplicate(format!(
                "Display order {} is already taken by a visible category",
                display_order
            )));
        }
        Ok(())
    }

    /// Create a new category
    pub async fn create(&self, data: CategoryCreate) -> RepoResult<Category> {
        // Check duplicate name
        if self.find_by_name(&data.name).await?.is_some() {
            return Err(RepoError::Duplicate(format!(
                "Category '{}' already exists",
                data.name
            )));
        }

        let is_hidden = data.is_hidden.unwrap_or(false);

        // Order uniqueness only applies to visible categories
        if let Some(order) = data.display_order
            && !is_hidden
        {
            self.assert_order_available(order, None).await?;
        }

        // Parent must exist
        let parent = match data.parent {
            Some(ref pid) => {
                let parent_id = parse_id(pid)?;
                self.find_by_id(pid)
                    .await?
                    .ok_or_else(|| RepoError::Validation(format!("Parent category {} not found", pid)))?;
                Some(parent_id)
            }
            None => None,
        };

        let category = Category {
            id: None,
            name: data.name,
            description: data.description.unwrap_or_default(),
            parent,
            display_order: data.display_order,
            image: data.image,
            is_hidden,
            created_at: Some(chrono::Utc::now().to_rfc3339()),
        };

        let created: Option<Category> = self.base.db().create(TABLE).content(category).await?;
        created.ok_or_else(|| RepoError::Database("Failed to create category".to_string()))
    }

    /// Update a category
    pub async fn update(&self, id: &str, data: CategoryUpdate) -> RepoResult<Category> {
        let thing = parse_id(id)?;
        let existing = self
            .find_by_id(id)
            .await?
            .ok_or_else(|| RepoError::NotFound(format!("Category {} not found", id)))?;

        // Check duplicate name if changing
        if let Some(ref new_name) = data.name
            && new_name != &existing.name
            && self.find_by_name(new_name).await?.is_some()
        {
            return Err(RepoError::Duplicate(format!(
                "Category '{}' already exists",
                new_name
            )));
        }

        // Re-check order uniqueness when the order changes or the category
        // becomes visible again
        let next_hidden = data.is_hidden.unwrap_or(existing.is_hidden);
        let next_order = data.display_order.or(existing.display_order);
        if let Some(order) = next_order
            && !next_hidden
            && (data.display_order.is_some() || (existing.is_hidden && !next_hidden))
        {
            self.assert_order_available(order, Some(&thing)).await?;
        }

        // Parent must exist and must not be the category itself
        let parent = match data.parent {
            Some(Some(ref pid)) => {
                let parent_id = parse_id(pid)?;
                if parent_id == thing {
                    return Err(RepoError::Validation(
                        "Category cannot be its own parent".to_string(),
                    ));
                }
                self.find_by_id(pid)
                    .await?
                    .ok_or_else(|| RepoError::Validation(format!("Parent category {} not found", pid)))?;
                Some(Some(parent_id))
            }
            Some(None) => Some(None),
            None => None,
        };

        #[derive(Serialize)]
        struct CategoryUpdateDb {
            #[serde(skip_serializing_if = "Option::is_none")]
            name: Option<String>,
            #[serde(skip_serializing_if = "Option::is_none")]
            description: Option<String>,
            #[serde(skip_serializing_if = "Option::is_none")]
            parent: Option<Option<RecordId>>,
            #[serde(skip_serializing_if = "Option::is_none")]
            display_order: Option<i32>,
            #[serde(skip_serializing_if = "Option::is_none")]
            image: Option<String>,
            #[serde(skip_serializing_if = "Option::is_none")]
            is_hidden: Option<bool>,
        }

        let update_data = CategoryUpdateDb {
            name: data.name,
            description: data.description,
            parent,
            display_order: data.display_order,
            image: data.image,
            is_hidden: data.is_hidden,
        };

        // Update using raw query to avoid deserialization issues with null fields
        self.base
            .db()
            .query("UPDATE $thing MERGE $data")
            .bind(("thing", thing))
            .bind(("data", update_data))
            .await?;

        // Fetch the updated record
        self.find_by_id(id)
            .await?
            .ok_or_else(|| RepoError::NotFound(format!("Category {} not found", id)))
    }

    /// Hard delete a category
    ///
    /// Refuses when products still reference the category or when
    /// child categories exist.
    pub async fn delete(&self, id: &str) -> RepoResult<bool> {
        let thing = parse_id(id)?;

        self.find_by_id(id)
            .await?
            .ok_or_else(|| RepoError::NotFound(format!("Category {} not found", id)))?;

        let mut result = self
            .base
            .db()
            .query("SELECT count() FROM product WHERE category = $cat GROUP ALL")
            .bind(("cat", thing.clone()))
            .await?;
        let product_count: Option<i64> = result.take((0, "count"))?;
        if product_count.unwrap_or(0) > 0 {
            return Err(RepoError::Rule(
                "Cannot delete category with products".to_string(),
            ));
        }

        let mut result = self
            .base
            .db()
            .query("SELECT count() FROM category WHERE parent = $cat GROUP ALL")
            .bind(("cat", thing.clone()))
            .await?;
        let child_count: Option<i64> = result.take((0, "count"))?;
        if child_count.unwrap_or(0) > 0 {
            return Err(RepoError::Rule(
                "Cannot delete category with child categories".to_string(),
            ));
        }

        self.base
            .db()
            .query("DELETE $thing")
            .bind(("thing", thing))
            .await?;

        Ok(true)
    }
}

fn parse_id(id: &str) -> RepoResult<RecordId> {
    if let Ok(thing) = id.parse::<RecordId>()
        && thing.table() == TABLE
    {
        return Ok(thing);
    }
    // Bare key without table prefix
    if !id.contains(':') {
        return Ok(RecordId::from_table_key(TABLE, id));
    }
    Err(RepoError::Validation(format!("Invalid category ID: {}", id)))
}
