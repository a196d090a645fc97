use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode, header::CONTENT_TYPE};

use super::{BlobError, BlobStore, stored_name};

/// Forwards uploads to an HTTP object store.
///
/// Objects are written with `PUT <endpoint>/<key>` and read back from
/// `<public_url>/<key>`, which is also the locator recorded for the image.
pub struct RemoteBlobStore {
    client: Client,
    endpoint: String,
    public_url: String,
    auth_token: Option<String>,
}

impl RemoteBlobStore {
    pub fn new(
        endpoint: &str,
        public_url: &str,
        auth_token: Option<String>,
        timeout: Duration,
    ) -> Result<Self, BlobError> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            endpoint: endpoint.trim_end_matches('/').to_string(),
            public_url: public_url.trim_end_matches('/').to_string(),
            auth_token,
        })
    }

    fn key<'a>(&self, locator: &'a str) -> Result<&'a str, BlobError> {
        let key = locator
            .trim()
            .strip_prefix(self.public_url.as_str())
            .and_then(|rest| rest.strip_prefix('/'))
            .ok_or_else(|| {
                BlobError::InvalidLocator(format!("'{locator}' is not served by this object store"))
            })?;

        if key.is_empty() || key.split('/').any(|s| s.is_empty() || s == "..") {
            return Err(BlobError::InvalidLocator(format!("bad object key in '{locator}'")));
        }
        Ok(key)
    }

    fn object_url(&self, key: &str) -> String {
        format!("{}/{key}", self.endpoint)
    }

    fn authorize(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.auth_token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }
}

#[async_trait]
impl BlobStore for RemoteBlobStore {
    async fn put(&self, filename: &str, data: &[u8]) -> Result<String, BlobError> {
        let key = stored_name(filename);
        let content_type = mime_guess::from_path(&key).first_or_octet_stream();

        let response = self
            .authorize(self.client.put(self.object_url(&key)))
            .header(CONTENT_TYPE, content_type.as_ref())
            .body(bytes::Bytes::copy_from_slice(data))
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(BlobError::Remote(format!(
                "upload of '{key}' rejected with status {}",
                response.status()
            )));
        }

        Ok(format!("{}/{key}", self.public_url))
    }

    async fn get(&self, locator: &str) -> Result<Vec<u8>, BlobError> {
        let key = self.key(locator)?;
        let response = self
            .client
            .get(format!("{}/{key}", self.public_url))
            .send()
            .await?;

        match response.status() {
            StatusCode::NOT_FOUND => Err(BlobError::NotFound),
            status if status.is_success() => Ok(response.bytes().await?.to_vec()),
            status => Err(BlobError::Remote(format!(
                "read of '{key}' failed with status {status}"
            ))),
        }
    }

    async fn delete(&self, locator: &str) -> Result<bool, BlobError> {
        let key = self.key(locator)?;
        let response = self
            .authorize(self.client.delete(self.object_url(key)))
            .send()
            .await?;

        match response.status() {
            StatusCode::NOT_FOUND => Ok(false),
            status if status.is_success() => Ok(true),
            status => Err(BlobError::Remote(format!(
                "delete of '{key}' failed with status {status}"
            ))),
        }
    }

    fn backend(&self) -> &'static str {
        "remote"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::SocketAddr;
    use std::sync::{Arc, Mutex};

    use axum::Router;
    use axum::extract::{Request, State};
    use axum::http::Method;

    struct SeenRequest {
        method: Method,
        path: String,
        authorization: Option<String>,
        content_type: Option<String>,
        body: Vec<u8>,
    }

    type Seen = Arc<Mutex<Vec<SeenRequest>>>;

    async fn object_store(State(seen): State<Seen>, request: Request) -> StatusCode {
        let (parts, body) = request.into_parts();
        let body = axum::body::to_bytes(body, usize::MAX).await.unwrap().to_vec();
        let path = parts.uri.path().to_string();

        let status = if path.contains("missing") {
            StatusCode::NOT_FOUND
        } else if path.contains("reject") {
            StatusCode::INTERNAL_SERVER_ERROR
        } else if parts.method == Method::PUT {
            StatusCode::CREATED
        } else {
            StatusCode::NO_CONTENT
        };

        let header = |name: reqwest::header::HeaderName| {
            parts
                .headers
                .get(name)
                .and_then(|v| v.to_str().ok())
                .map(str::to_string)
        };
        seen.lock().unwrap().push(SeenRequest {
            method: parts.method.clone(),
            path,
            authorization: header(reqwest::header::AUTHORIZATION),
            content_type: header(CONTENT_TYPE),
            body,
        });
        status
    }

    async fn spawn_object_store() -> (SocketAddr, Seen) {
        let seen = Seen::default();
        let app = Router::new()
            .fallback(object_store)
            .with_state(seen.clone());

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        (addr, seen)
    }

    fn store() -> RemoteBlobStore {
        RemoteBlobStore::new(
            "https://storage.example.net/bucket/",
            "https://cdn.example.net/",
            None,
            Duration::from_secs(5),
        )
        .unwrap()
    }

    #[test]
    fn test_key_from_locator() {
        let store = store();
        assert_eq!(
            store.key("https://cdn.example.net/1700000000000-a.jpg").unwrap(),
            "1700000000000-a.jpg"
        );
        assert_eq!(
            store.object_url("1700000000000-a.jpg"),
            "https://storage.example.net/bucket/1700000000000-a.jpg"
        );
    }

    #[test]
    fn test_key_rejects_foreign_locators() {
        let store = store();
        assert!(matches!(
            store.key("uploads/1-a.jpg"),
            Err(BlobError::InvalidLocator(_))
        ));
        assert!(matches!(
            store.key("https://elsewhere.example.org/1-a.jpg"),
            Err(BlobError::InvalidLocator(_))
        ));
        assert!(matches!(
            store.key("https://cdn.example.net/../x"),
            Err(BlobError::InvalidLocator(_))
        ));
        assert!(matches!(
            store.key("https://cdn.example.net/"),
            Err(BlobError::InvalidLocator(_))
        ));
    }

    #[tokio::test]
    async fn test_put_and_delete_against_object_store() {
        let (addr, seen) = spawn_object_store().await;
        let store = RemoteBlobStore::new(
            &format!("http://{addr}/bucket"),
            "https://cdn.example.net",
            Some("s3cret".to_string()),
            Duration::from_secs(5),
        )
        .unwrap();

        let locator = store.put("lamp.png", b"png").await.unwrap();
        assert!(locator.starts_with("https://cdn.example.net/"));
        assert!(locator.ends_with("-lamp.png"));
        let key = store.key(&locator).unwrap().to_string();

        assert!(store.delete(&locator).await.unwrap());
        assert!(
            !store
                .delete("https://cdn.example.net/missing.png")
                .await
                .unwrap()
        );
        assert!(matches!(
            store.put("reject.png", b"png").await,
            Err(BlobError::Remote(_))
        ));

        let seen = seen.lock().unwrap();
        assert_eq!(seen.len(), 4);

        assert_eq!(seen[0].method, Method::PUT);
        assert_eq!(seen[0].path, format!("/bucket/{key}"));
        assert_eq!(seen[0].authorization.as_deref(), Some("Bearer s3cret"));
        assert_eq!(seen[0].content_type.as_deref(), Some("image/png"));
        assert_eq!(seen[0].body, b"png");

        assert_eq!(seen[1].method, Method::DELETE);
        assert_eq!(seen[1].path, format!("/bucket/{key}"));
        assert_eq!(seen[1].authorization.as_deref(), Some("Bearer s3cret"));

        assert_eq!(seen[2].path, "/bucket/missing.png");
    }
}
