use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub user_id: String,
    pub password: String,
    pub name: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Category {
    pub id: i64,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Image {
    pub image_id: i64,
    pub user_id: String,
    pub category_id: i64,
    pub image_url: String,
}

/// One image of a user, flattened with the name of the category it is filed under.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryImage {
    pub category: String,
    pub image_url: String,
}

/// Image joined with its category, in gallery order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GalleryRow {
    pub image_id: i64,
    pub image_url: String,
    pub category_id: i64,
    pub category_name: String,
}

/// What happens to the shared category row when one user removes it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CategoryDeletePolicy {
    /// Remove the link and the category row, whoever else is linked to it.
    #[default]
    Always,
    /// Remove the link; remove the category row once no links remain.
    WhenUnreferenced,
    /// Remove the link only.
    UnlinkOnly,
}

/// Outcome of removing a category from a user.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CategoryRemoval {
    pub link_removed: bool,
    pub category_deleted: bool,
    /// Locators of images that went away with the category row.
    pub removed_locators: Vec<String>,
}
