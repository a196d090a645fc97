use std::sync::Arc;

use axum::{
    Json,
    extract::{Path, State},
    response::IntoResponse,
};

use crate::gallery::assemble_gallery;
use crate::server::AppState;
use crate::server::response::{ApiError, StoreResultExt};
use crate::store::retry_read;

/// GET /get-user-images/{user_id} - Images grouped by category
pub async fn get_gallery(
    State(state): State<Arc<AppState>>,
    Path(user_id): Path<String>,
) -> impl IntoResponse {
    let gallery = retry_read(|| assemble_gallery(state.store.as_ref(), &state.renderer, &user_id))
        .await
        .or_not_found("User not found")?;

    Ok::<_, ApiError>(Json(gallery))
}
