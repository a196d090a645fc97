use std::sync::Arc;

use axum::{
    Json,
    extract::{Multipart, State},
    response::IntoResponse,
};
use bytes::Bytes;

use crate::error::Error;
use crate::server::AppState;
use crate::server::dto::{DeleteImageRequest, UploadResponse};
use crate::server::response::{ApiError, StoreResultExt, SuccessResponse};

struct ImageUpload {
    user_id: String,
    category_id: i64,
    file_name: String,
    data: Bytes,
}

async fn read_text(field: axum::extract::multipart::Field<'_>) -> Result<String, ApiError> {
    field
        .text()
        .await
        .map(|text| text.trim().to_string())
        .map_err(|e| ApiError::bad_request(format!("Failed to read multipart: {e}")))
}

async fn parse_image_upload(
    multipart: &mut Multipart,
    max_upload_bytes: usize,
) -> Result<ImageUpload, ApiError> {
    let mut user_id: Option<String> = None;
    let mut category: Option<String> = None;
    let mut image: Option<(String, Bytes)> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::bad_request(format!("Failed to read multipart: {e}")))?
    {
        match field.name() {
            Some("userID") => user_id = Some(read_text(field).await?),
            Some("category") => category = Some(read_text(field).await?),
            Some("image") => {
                let file_name = field.file_name().unwrap_or_default().to_string();
                let data = field
                    .bytes()
                    .await
                    .map_err(|e| ApiError::bad_request(format!("Failed to read image: {e}")))?;
                if data.len() > max_upload_bytes {
                    return Err(ApiError::payload_too_large(format!(
                        "Image size ({} bytes) exceeds maximum allowed size ({max_upload_bytes} bytes)",
                        data.len()
                    )));
                }
                image = Some((file_name, data));
            }
            _ => {}
        }
    }

    let category_id = category.as_deref().and_then(|c| c.parse::<i64>().ok());
    match (user_id, category_id, image) {
        (Some(user_id), Some(category_id), Some((file_name, data)))
            if !user_id.is_empty() && !data.is_empty() =>
        {
            Ok(ImageUpload {
                user_id,
                category_id,
                file_name,
                data,
            })
        }
        _ => {
            tracing::warn!("Upload rejected: invalid or missing fields");
            Err(ApiError::bad_request("Invalid or missing required fields"))
        }
    }
}

/// POST /upload-image - Stores the bytes, then records the image row
pub async fn upload_image(
    State(state): State<Arc<AppState>>,
    mut multipart: Multipart,
) -> impl IntoResponse {
    let upload = parse_image_upload(&mut multipart, state.config.max_upload_bytes).await?;

    let locator = state
        .blob_op(state.blobs.put(&upload.file_name, &upload.data))
        .await
        .map_err(Error::from)?;

    let image = match state
        .store
        .record_upload(&upload.user_id, upload.category_id, &locator)
    {
        Ok(image) => image,
        Err(e) => {
            state.discard_blobs(std::slice::from_ref(&locator)).await;
            return Err(ApiError::from(e));
        }
    };
    tracing::info!(
        "Stored image {} for user {} in category {} via {}",
        image.image_id,
        image.user_id,
        image.category_id,
        state.blobs.backend()
    );

    Ok(Json(UploadResponse {
        success: true,
        message: "Image uploaded successfully!".to_string(),
        image_url: state.renderer.render(&image.image_url),
    }))
}

/// DELETE /delete-image - Accepts a stored locator or any URL rendered from one
pub async fn delete_image(
    State(state): State<Arc<AppState>>,
    Json(req): Json<DeleteImageRequest>,
) -> impl IntoResponse {
    if req.image_url.trim().is_empty() {
        return Err(ApiError::bad_request("Missing image URL"));
    }

    let candidates = state.renderer.delete_candidates(&req.image_url);
    let removed = state
        .store
        .delete_image(&candidates)
        .or_not_found("Image not found")?;

    let locators: Vec<String> = removed.into_iter().map(|image| image.image_url).collect();
    tracing::info!("Deleted {} image row(s) for {}", locators.len(), candidates[0]);

    state.discard_blobs(&locators).await;

    Ok(Json(SuccessResponse::ok()))
}
