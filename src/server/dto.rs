use serde::{Deserialize, Serialize};

use crate::types::{Category, User};

#[derive(Debug, Deserialize)]
pub struct AddUserRequest {
    #[serde(rename = "userID", default)]
    pub user_id: String,
    #[serde(default)]
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct UserIdRequest {
    #[serde(rename = "userID", default)]
    pub user_id: String,
}

#[derive(Debug, Deserialize)]
pub struct ValidateRequest {
    #[serde(rename = "userID", default)]
    pub user_id: String,
    #[serde(default)]
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct UpdateNameRequest {
    #[serde(rename = "userID", default)]
    pub user_id: String,
    #[serde(default)]
    pub name: String,
}

#[derive(Debug, Deserialize)]
pub struct AddCategoryRequest {
    #[serde(rename = "userID", default)]
    pub user_id: String,
    #[serde(default)]
    pub category: String,
}

/// Admin pages send the category id either as a number or as a numeric string.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum CategoryIdField {
    Number(i64),
    Text(String),
}

impl CategoryIdField {
    #[must_use]
    pub fn parse(&self) -> Option<i64> {
        match self {
            Self::Number(id) => Some(*id),
            Self::Text(text) => text.trim().parse().ok(),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct DeleteCategoryRequest {
    #[serde(rename = "categoryID", default)]
    pub category_id: Option<CategoryIdField>,
    #[serde(rename = "userID", default)]
    pub user_id: String,
}

#[derive(Debug, Deserialize)]
pub struct DeleteImageRequest {
    #[serde(rename = "imageUrl", default)]
    pub image_url: String,
}

#[derive(Debug, Serialize)]
pub struct GeneratedUserResponse {
    #[serde(rename = "userID")]
    pub user_id: String,
    pub password: String,
    pub name: String,
}

#[derive(Debug, Serialize)]
pub struct UpdateNameResponse {
    pub message: String,
    pub user: User,
}

#[derive(Debug, Serialize)]
pub struct UpdatedUserResponse {
    pub success: bool,
    #[serde(rename = "updatedUser")]
    pub updated_user: User,
}

#[derive(Debug, Serialize)]
pub struct ValidateResponse {
    pub success: bool,
    pub images: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct ViewerImage {
    pub image_url: String,
}

#[derive(Debug, Serialize)]
pub struct ViewerImagesResponse {
    pub name: String,
    pub images: Vec<ViewerImage>,
}

#[derive(Debug, Serialize)]
pub struct UploadResponse {
    pub success: bool,
    pub message: String,
    #[serde(rename = "imageURL")]
    pub image_url: String,
}

#[derive(Debug, Serialize)]
pub struct CategoryNameResponse {
    pub name: String,
}

#[derive(Debug, Serialize)]
pub struct UserCategoriesResponse {
    pub categories: Vec<Category>,
}

#[derive(Debug, Serialize)]
pub struct AddCategoryResponse {
    pub success: bool,
    pub category: Category,
}
