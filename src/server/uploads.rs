use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::{HeaderValue, StatusCode, header},
    response::{IntoResponse, Response},
};

use crate::blob::{BlobError, UPLOADS_PREFIX};
use crate::server::AppState;
use crate::server::response::ApiError;

/// GET /uploads/{*path} - Bytes of a locally stored image
pub async fn serve_upload(
    State(state): State<Arc<AppState>>,
    Path(path): Path<String>,
) -> Result<Response, ApiError> {
    if state.blobs.backend() != "local" {
        return Err(ApiError::not_found("Image not found"));
    }

    let locator = format!("{UPLOADS_PREFIX}/{path}");
    let data = match state.blob_op(state.blobs.get(&locator)).await {
        Ok(data) => data,
        Err(BlobError::NotFound | BlobError::InvalidLocator(_)) => {
            return Err(ApiError::not_found("Image not found"));
        }
        Err(e) => {
            tracing::error!("Failed to read {}: {}", locator, e);
            return Err(ApiError::internal());
        }
    };

    let content_type = mime_guess::from_path(&path).first_or_octet_stream();

    Ok((
        StatusCode::OK,
        [
            (
                header::CONTENT_TYPE,
                HeaderValue::from_str(content_type.as_ref())
                    .unwrap_or(HeaderValue::from_static("application/octet-stream")),
            ),
            (header::X_CONTENT_TYPE_OPTIONS, HeaderValue::from_static("nosniff")),
        ],
        data,
    )
        .into_response())
}
