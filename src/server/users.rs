use std::sync::Arc;

use axum::{
    Json,
    extract::{Path, State},
    response::IntoResponse,
};

use crate::auth::{self, CredentialGenerator};
use crate::gallery::rendered_urls;
use crate::server::AppState;
use crate::server::dto::{
    AddUserRequest, GeneratedUserResponse, UpdateNameRequest, UpdateNameResponse,
    UpdatedUserResponse, UserIdRequest, ValidateRequest, ValidateResponse, ViewerImage,
    ViewerImagesResponse,
};
use crate::server::response::{
    ApiError, MessageResponse, StoreOptionExt, StoreResultExt, SuccessResponse,
};
use crate::store::retry_read;
use crate::types::{CategoryImage, User};

pub async fn generate_user(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let user = auth::provision_user(state.store.as_ref(), &CredentialGenerator::new())?;
    tracing::info!("Generated user {}", user.user_id);

    Ok::<_, ApiError>(Json(GeneratedUserResponse {
        user_id: user.user_id,
        password: user.password,
        name: user.name,
    }))
}

pub async fn list_users(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let users = retry_read(|| state.store.list_users()).await?;
    Ok::<_, ApiError>(Json(users))
}

pub async fn add_user(
    State(state): State<Arc<AppState>>,
    Json(req): Json<AddUserRequest>,
) -> impl IntoResponse {
    let user = auth::add_user(state.store.as_ref(), &req.user_id, &req.password)
        .or_conflict("User ID already exists")?;
    tracing::info!("Added user {}", user.user_id);

    Ok::<_, ApiError>(Json(MessageResponse::new("User added successfully")))
}

async fn require_user(state: &AppState, user_id: &str) -> Result<User, ApiError> {
    retry_read(|| state.store.get_user(user_id))
        .await?
        .or_not_found("User not found")
}

/// GET /users/{user_id} - Flat list of a user's images with their category names
pub async fn list_user_images(
    State(state): State<Arc<AppState>>,
    Path(user_id): Path<String>,
) -> impl IntoResponse {
    require_user(&state, &user_id).await?;

    let images: Vec<CategoryImage> = retry_read(|| state.store.list_user_images(&user_id))
        .await?
        .into_iter()
        .map(|image| CategoryImage {
            image_url: state.renderer.render(&image.image_url),
            category: image.category,
        })
        .collect();

    Ok::<_, ApiError>(Json(images))
}

pub async fn delete_user(
    State(state): State<Arc<AppState>>,
    Path(user_id): Path<String>,
) -> impl IntoResponse {
    let locators = state
        .store
        .delete_user(&user_id)
        .or_not_found("User not found")?;
    tracing::info!("Deleted user {} with {} images", user_id, locators.len());

    state.discard_blobs(&locators).await;

    Ok::<_, ApiError>(Json(MessageResponse::new("User deleted successfully")))
}

/// POST /delete-user - Drops a freshly generated user the admin decided not to keep
pub async fn cancel_user(
    State(state): State<Arc<AppState>>,
    Json(req): Json<UserIdRequest>,
) -> impl IntoResponse {
    if req.user_id.trim().is_empty() {
        return Err(ApiError::bad_request("User ID is required"));
    }

    let locators = state
        .store
        .delete_user(&req.user_id)
        .map_err(|e| match e {
            crate::error::Error::NotFound => ApiError::bad_request("User not found"),
            e => ApiError::from(e),
        })?;
    tracing::info!("Cancelled user {}", req.user_id);

    state.discard_blobs(&locators).await;

    Ok(Json(SuccessResponse::ok()))
}

/// GET /users/{user_id}/images - Viewer listing, oldest upload first
pub async fn viewer_images(
    State(state): State<Arc<AppState>>,
    Path(user_id): Path<String>,
) -> impl IntoResponse {
    let user = require_user(&state, &user_id).await?;
    let rows = retry_read(|| state.store.list_gallery_rows(&user_id)).await?;

    let images = rendered_urls(rows, &state.renderer)
        .into_iter()
        .map(|image_url| ViewerImage { image_url })
        .collect();

    Ok::<_, ApiError>(Json(ViewerImagesResponse {
        name: user.name,
        images,
    }))
}

fn rename(state: &AppState, req: &UpdateNameRequest) -> Result<User, ApiError> {
    if req.user_id.trim().is_empty() || req.name.trim().is_empty() {
        return Err(ApiError::bad_request("User ID and Name are required"));
    }

    let user = state
        .store
        .set_user_name(&req.user_id, req.name.trim())
        .or_not_found("User not found")?;
    tracing::info!("Renamed user {}", user.user_id);
    Ok(user)
}

pub async fn update_name(
    State(state): State<Arc<AppState>>,
    Json(req): Json<UpdateNameRequest>,
) -> impl IntoResponse {
    let user = rename(&state, &req)?;

    Ok::<_, ApiError>(Json(UpdateNameResponse {
        message: "Name updated successfully".to_string(),
        user,
    }))
}

pub async fn update_user_name(
    State(state): State<Arc<AppState>>,
    Json(req): Json<UpdateNameRequest>,
) -> impl IntoResponse {
    let updated_user = rename(&state, &req)?;

    Ok::<_, ApiError>(Json(UpdatedUserResponse {
        success: true,
        updated_user,
    }))
}

pub async fn validate(
    State(state): State<Arc<AppState>>,
    Json(req): Json<ValidateRequest>,
) -> impl IntoResponse {
    let user = retry_read(|| auth::authenticate(state.store.as_ref(), &req.user_id, &req.password))
        .await?;
    let rows = retry_read(|| state.store.list_gallery_rows(&user.user_id)).await?;

    Ok::<_, ApiError>(Json(ValidateResponse {
        success: true,
        images: rendered_urls(rows, &state.renderer),
    }))
}
