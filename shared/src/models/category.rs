//! Category Model

use serde::{Deserialize, Serialize};

/// Category entity
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Category {
    pub id: Option<String>,
    pub name: String,
    #[serde(default)]
    pub description: String,
    /// Hidden categories are excluded from public listings
    #[serde(default)]
    pub is_hidden: bool,
    /// Parent category reference, `None` for top-level categories
    pub parent: Option<String>,
    /// Display position; unique among non-hidden categories when present
    pub display_order: Option<i32>,
    /// Staged image path (see `/api/upload`)
    #[serde(default)]
    pub image: String,
}
