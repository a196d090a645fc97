#![allow(dead_code)]

use std::sync::Arc;

use axum::Router;
use axum::body::{Body, to_bytes};
use axum::http::{Request, StatusCode, header};
use serde_json::Value;
use tempfile::TempDir;
use tower::ServiceExt;

use vitrine::blob::{self, BlobStore};
use vitrine::config::ServerConfig;
use vitrine::server::{AppState, create_router};
use vitrine::store::{SqliteStore, Store};

const BOUNDARY: &str = "vitrine-test-boundary";

/// The real router over a throwaway data directory, driven in-process.
pub struct TestApp {
    pub temp_dir: TempDir,
    pub store: Arc<SqliteStore>,
    router: Router,
}

pub struct TestResponse {
    pub status: StatusCode,
    pub content_type: Option<String>,
    pub body: Vec<u8>,
}

impl TestResponse {
    pub fn json(&self) -> Value {
        serde_json::from_slice(&self.body).expect("response body is JSON")
    }
}

impl TestApp {
    pub async fn new() -> Self {
        Self::with_config(|_| {}).await
    }

    pub async fn with_config(configure: impl FnOnce(&mut ServerConfig)) -> Self {
        let temp_dir = TempDir::new().expect("create temp dir");
        let config = Self::config_in(&temp_dir, configure);
        let blobs = blob::from_config(&config).await.expect("blob store");
        Self::build(temp_dir, config, blobs)
    }

    /// The router over a caller-supplied blob backend.
    pub fn with_blobs(blobs: Arc<dyn BlobStore>) -> Self {
        let temp_dir = TempDir::new().expect("create temp dir");
        let config = Self::config_in(&temp_dir, |_| {});
        Self::build(temp_dir, config, blobs)
    }

    fn config_in(temp_dir: &TempDir, configure: impl FnOnce(&mut ServerConfig)) -> ServerConfig {
        let mut config = ServerConfig {
            data_dir: temp_dir.path().to_path_buf(),
            ..ServerConfig::default()
        };
        configure(&mut config);
        config
    }

    fn build(temp_dir: TempDir, config: ServerConfig, blobs: Arc<dyn BlobStore>) -> Self {
        let store = Arc::new(SqliteStore::new(config.db_path()).expect("open store"));
        store.initialize().expect("initialize store");

        let state = Arc::new(AppState::new(store.clone(), blobs, config));
        Self {
            temp_dir,
            store,
            router: create_router(state),
        }
    }

    pub async fn send(&self, request: Request<Body>) -> TestResponse {
        let response = self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("router is infallible");

        let status = response.status();
        let content_type = response
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let body = to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("read body")
            .to_vec();

        TestResponse {
            status,
            content_type,
            body,
        }
    }

    pub async fn get(&self, uri: &str) -> TestResponse {
        let request = Request::builder()
            .uri(uri)
            .body(Body::empty())
            .expect("build request");
        self.send(request).await
    }

    pub async fn json(&self, method: &str, uri: &str, body: Value) -> TestResponse {
        let request = Request::builder()
            .method(method)
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .expect("build request");
        self.send(request).await
    }

    pub async fn upload(
        &self,
        user_id: &str,
        category: &str,
        file_name: &str,
        data: &[u8],
    ) -> TestResponse {
        self.send(upload_request(user_id, category, file_name, data)).await
    }

    /// Generates a user and returns (user_id, password).
    pub async fn generate_user(&self) -> (String, String) {
        let response = self.json("POST", "/generate-user", Value::Null).await;
        assert_eq!(response.status, StatusCode::OK);
        let body = response.json();
        (
            body["userID"].as_str().expect("userID").to_string(),
            body["password"].as_str().expect("password").to_string(),
        )
    }

    /// Links a category to a user and returns its id.
    pub async fn add_category(&self, user_id: &str, name: &str) -> i64 {
        let response = self
            .json(
                "POST",
                "/add-category",
                serde_json::json!({ "userID": user_id, "category": name }),
            )
            .await;
        assert_eq!(response.status, StatusCode::OK);
        response.json()["category"]["id"].as_i64().expect("category id")
    }
}

/// A multipart `/upload-image` request.
pub fn upload_request(user_id: &str, category: &str, file_name: &str, data: &[u8]) -> Request<Body> {
    let mut body = Vec::new();
    for (name, value) in [("userID", user_id), ("category", category)] {
        body.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{name}\"\r\n\r\n{value}\r\n"
            )
            .as_bytes(),
        );
    }
    body.extend_from_slice(
        format!(
            "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"image\"; filename=\"{file_name}\"\r\nContent-Type: application/octet-stream\r\n\r\n"
        )
        .as_bytes(),
    );
    body.extend_from_slice(data);
    body.extend_from_slice(format!("\r\n--{BOUNDARY}--\r\n").as_bytes());

    Request::builder()
        .method("POST")
        .uri("/upload-image")
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={BOUNDARY}"),
        )
        .body(Body::from(body))
        .expect("build request")
}
