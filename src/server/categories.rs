use std::sync::Arc;

use axum::{
    Json,
    extract::{Path, State},
    response::IntoResponse,
};

use crate::server::AppState;
use crate::server::dto::{
    AddCategoryRequest, AddCategoryResponse, CategoryNameResponse, DeleteCategoryRequest,
    UserCategoriesResponse,
};
use crate::server::response::{ApiError, StoreResultExt, SuccessResponse};
use crate::store::retry_read;

pub async fn list_category_names(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let names: Vec<CategoryNameResponse> = retry_read(|| state.store.list_category_names())
        .await?
        .into_iter()
        .map(|name| CategoryNameResponse { name })
        .collect();

    Ok::<_, ApiError>(Json(names))
}

pub async fn list_user_categories(
    State(state): State<Arc<AppState>>,
    Path(user_id): Path<String>,
) -> impl IntoResponse {
    let categories = retry_read(|| state.store.list_user_categories(&user_id)).await?;
    Ok::<_, ApiError>(Json(UserCategoriesResponse { categories }))
}

pub async fn add_category(
    State(state): State<Arc<AppState>>,
    Json(req): Json<AddCategoryRequest>,
) -> impl IntoResponse {
    let name = req.category.trim();
    if req.user_id.trim().is_empty() || name.is_empty() {
        return Err(ApiError::bad_request("User ID and category are required"));
    }

    let category = state
        .store
        .add_user_category(&req.user_id, name, state.config.link_creates_user)
        .or_not_found("User not found")?;
    tracing::info!(
        "Linked category {} ({}) to user {}",
        category.name,
        category.id,
        req.user_id
    );

    Ok(Json(AddCategoryResponse {
        success: true,
        category,
    }))
}

pub async fn delete_category(
    State(state): State<Arc<AppState>>,
    Json(req): Json<DeleteCategoryRequest>,
) -> impl IntoResponse {
    let category_id = req.category_id.as_ref().and_then(|id| id.parse());
    let (Some(category_id), false) = (category_id, req.user_id.trim().is_empty()) else {
        return Err(ApiError::bad_request("Missing categoryID or userID"));
    };

    let removal =
        state
            .store
            .remove_user_category(category_id, &req.user_id, state.config.category_delete)?;
    tracing::info!(
        "Removed category {} from user {} (link removed: {}, category deleted: {}, images removed: {})",
        category_id,
        req.user_id,
        removal.link_removed,
        removal.category_deleted,
        removal.removed_locators.len()
    );

    state.discard_blobs(&removal.removed_locators).await;

    Ok(Json(SuccessResponse::ok()))
}
