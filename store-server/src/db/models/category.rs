//! Category Model

use super::serde_helpers;
use serde::{Deserialize, Serialize};
use surrealdb::RecordId;

pub type CategoryId = RecordId;

/// Category model
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Category {
    #[serde(default, with = "serde_helpers::option_record_id")]
    pub id: Option<CategoryId>,
    pub name: String,
    #[serde(default)]
    pub description: String,
    /// Parent category reference (None for top-level categories)
    #[serde(default, with = "serde_helpers::option_record_link")]
    pub parent: Option<CategoryId>,
    /// Position in storefront menus; unique among visible categories
    #[serde(default)]
    pub display_order: Option<i32>,
    /// Uploaded image path (relative to uploads dir)
    #[serde(default)]
    pub image: Option<String>,
    #[serde(default, deserialize_with = "serde_helpers::bool_false")]
    pub is_hidden: bool,
    #[serde(default)]
    pub created_at: Option<String>,
}

/// Create category payload
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CategoryCreate {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    /// Parent category ID ("category:xxx")
    #[serde(default)]
    pub parent: Option<String>,
    #[serde(default)]
    pub display_order: Option<i32>,
    #[serde(default)]
    pub image: Option<String>,
    #[serde(default)]
    pub is_hidden: Option<bool>,
}

/// Update category payload
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CategoryUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Parent category ID; `Some(None)` clears the parent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent: Option<Option<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub display_order: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_hidden: Option<bool>,
}
