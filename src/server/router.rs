use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::extract::{DefaultBodyLimit, Request, State};
use axum::http::HeaderMap;
use axum::middleware::{self, Next};
use axum::response::{IntoResponse, Response};
use axum::{
    Router,
    routing::{delete, get, post, put},
};

use super::response::ApiError;
use super::{categories, gallery, images, uploads, users};
use crate::blob::{BlobError, BlobStore, LocatorRenderer};
use crate::config::ServerConfig;
use crate::store::Store;

/// Header through which a caller may shorten or extend its request deadline, in seconds.
pub const REQUEST_TIMEOUT_HEADER: &str = "x-request-timeout";

// Multipart framing on top of the file itself.
const MULTIPART_OVERHEAD: usize = 64 * 1024;

pub struct AppState {
    pub store: Arc<dyn Store>,
    pub blobs: Arc<dyn BlobStore>,
    pub renderer: LocatorRenderer,
    pub config: ServerConfig,
}

impl AppState {
    #[must_use]
    pub fn new(store: Arc<dyn Store>, blobs: Arc<dyn BlobStore>, config: ServerConfig) -> Self {
        Self {
            store,
            blobs,
            renderer: LocatorRenderer::from_config(&config),
            config,
        }
    }

    /// Runs a blob operation under the request deadline.
    pub async fn blob_op<T, F>(&self, op: F) -> Result<T, BlobError>
    where
        F: Future<Output = Result<T, BlobError>>,
    {
        tokio::time::timeout(self.config.request_timeout(), op)
            .await
            .map_err(|_| BlobError::TimedOut)?
    }

    /// Deletes the bytes behind locators whose rows are already gone.
    ///
    /// Failures are logged and otherwise ignored.
    pub async fn discard_blobs(&self, locators: &[String]) {
        for locator in locators {
            let canonical = self.renderer.canonical(locator);
            match self.blob_op(self.blobs.delete(&canonical)).await {
                Ok(true) => tracing::debug!("Deleted blob {}", canonical),
                Ok(false) => tracing::warn!("Blob {} was already gone", canonical),
                Err(e) => tracing::warn!("Failed to delete blob {}: {}", canonical, e),
            }
        }
    }
}

async fn health() -> &'static str {
    "OK"
}

async fn log_request(request: Request, next: Next) -> Response {
    let method = request.method().clone();
    let uri = request.uri().clone();
    let start = Instant::now();

    let response = next.run(request).await;

    let latency = start.elapsed();
    let status = response.status();

    tracing::info!(
        "{} {} {} {}ms",
        method,
        uri.path(),
        status.as_u16(),
        latency.as_millis()
    );

    response
}

fn request_deadline(config: &ServerConfig, headers: &HeaderMap) -> Duration {
    headers
        .get(REQUEST_TIMEOUT_HEADER)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.trim().parse::<u64>().ok())
        .filter(|secs| *secs > 0)
        .map(Duration::from_secs)
        .map_or_else(
            || config.request_timeout(),
            |requested| requested.min(config.max_request_timeout()),
        )
}

async fn enforce_deadline(
    State(state): State<Arc<AppState>>,
    request: Request,
    next: Next,
) -> Response {
    let deadline = request_deadline(&state.config, request.headers());
    let path = request.uri().path().to_string();

    match tokio::time::timeout(deadline, next.run(request)).await {
        Ok(response) => response,
        Err(_) => {
            tracing::warn!("{} exceeded its {}s deadline", path, deadline.as_secs());
            ApiError::timed_out().into_response()
        }
    }
}

pub fn create_router(state: Arc<AppState>) -> Router {
    let body_limit = state.config.max_upload_bytes + MULTIPART_OVERHEAD;

    Router::new()
        .route("/health", get(health))
        // Identity routes
        .route("/generate-user", post(users::generate_user))
        .route("/users", get(users::list_users))
        .route("/users", post(users::add_user))
        .route("/get-users", get(users::list_users))
        .route("/users/{user_id}", get(users::list_user_images))
        .route("/users/{user_id}", delete(users::delete_user))
        .route("/users/{user_id}/images", get(users::viewer_images))
        .route("/delete-user", post(users::cancel_user))
        .route("/update-name", put(users::update_name))
        .route("/update-user-name", post(users::update_user_name))
        .route("/validate", post(users::validate))
        // Category routes
        .route("/categories", get(categories::list_category_names))
        .route(
            "/get-categories/{user_id}",
            get(categories::list_user_categories),
        )
        .route("/add-category", post(categories::add_category))
        .route("/delete-category", delete(categories::delete_category))
        // Image routes
        .route("/upload-image", post(images::upload_image))
        .route("/delete-image", delete(images::delete_image))
        .route("/get-user-images/{user_id}", get(gallery::get_gallery))
        .route("/uploads/{*path}", get(uploads::serve_upload))
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            enforce_deadline,
        ))
        .layer(middleware::from_fn(log_request))
        .with_state(state)
}
