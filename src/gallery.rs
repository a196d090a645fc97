//! Read-side view of a user's images grouped by category.

use std::collections::HashMap;

use serde::Serialize;

use crate::blob::LocatorRenderer;
use crate::error::{Error, Result};
use crate::store::Store;
use crate::types::GalleryRow;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Gallery {
    pub name: String,
    pub categories: Vec<GalleryCategory>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GalleryCategory {
    pub category_id: i64,
    pub category_name: String,
    pub images: Vec<GalleryImage>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GalleryImage {
    pub image_id: i64,
    pub image_url: String,
}

/// Builds the nested user → categories → images view.
pub fn assemble_gallery(
    store: &dyn Store,
    renderer: &LocatorRenderer,
    user_id: &str,
) -> Result<Gallery> {
    let user = store.get_user(user_id)?.ok_or(Error::NotFound)?;
    let rows = store.list_gallery_rows(user_id)?;

    Ok(Gallery {
        name: user.name,
        categories: group_rows(rows, renderer),
    })
}

/// Buckets rows by category, keeping the order in which categories first appear.
#[must_use]
pub fn group_rows(rows: Vec<GalleryRow>, renderer: &LocatorRenderer) -> Vec<GalleryCategory> {
    let mut categories: Vec<GalleryCategory> = Vec::new();
    let mut positions: HashMap<i64, usize> = HashMap::new();

    for row in rows {
        let index = *positions.entry(row.category_id).or_insert_with(|| {
            categories.push(GalleryCategory {
                category_id: row.category_id,
                category_name: row.category_name.clone(),
                images: Vec::new(),
            });
            categories.len() - 1
        });

        categories[index].images.push(GalleryImage {
            image_id: row.image_id,
            image_url: renderer.render(&row.image_url),
        });
    }

    categories
}

/// Rendered URLs of all of a user's images, oldest upload first.
#[must_use]
pub fn rendered_urls(mut rows: Vec<GalleryRow>, renderer: &LocatorRenderer) -> Vec<String> {
    rows.sort_by_key(|row| row.image_id);
    rows.iter().map(|row| renderer.render(&row.image_url)).collect()
}
