//! Where uploaded image bytes live.
//!
//! A [`BlobStore`] persists the bytes of an upload and hands back the locator
//! that is recorded in the image row. Two backends exist: [`LocalBlobStore`]
//! writes under a content directory served at `/uploads`, [`RemoteBlobStore`]
//! forwards to an HTTP object store. [`LocatorRenderer`] turns any stored
//! locator, from either backend or from older deployments, into a URL a client
//! can fetch.

mod local;
mod remote;
mod url;

pub use local::LocalBlobStore;
pub use remote::RemoteBlobStore;
pub use url::{LocatorRenderer, UPLOADS_PREFIX};

use std::io::ErrorKind;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use thiserror::Error;

use crate::config::{BlobConfig, ServerConfig};

const MAX_NAME_LEN: usize = 200;
const FALLBACK_NAME: &str = "image";

#[derive(Debug, Error)]
pub enum BlobError {
    #[error("blob not found")]
    NotFound,
    #[error("invalid locator: {0}")]
    InvalidLocator(String),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("object storage error: {0}")]
    Remote(String),
    #[error("blob operation timed out")]
    TimedOut,
}

impl BlobError {
    fn from_io(e: std::io::Error) -> Self {
        if e.kind() == ErrorKind::NotFound {
            Self::NotFound
        } else {
            Self::Io(e)
        }
    }
}

impl From<BlobError> for crate::error::Error {
    fn from(e: BlobError) -> Self {
        crate::error::Error::UploadFailed(e.to_string())
    }
}

impl From<reqwest::Error> for BlobError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            Self::TimedOut
        } else {
            Self::Remote(e.to_string())
        }
    }
}

#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Stores an upload and returns its canonical locator.
    async fn put(&self, filename: &str, data: &[u8]) -> Result<String, BlobError>;

    /// Reads the bytes stored under a locator.
    async fn get(&self, locator: &str) -> Result<Vec<u8>, BlobError>;

    /// Returns `true` if the blob was deleted, `false` if it did not exist.
    async fn delete(&self, locator: &str) -> Result<bool, BlobError>;

    fn backend(&self) -> &'static str;
}

/// Builds the backend selected by configuration.
pub async fn from_config(config: &ServerConfig) -> Result<Arc<dyn BlobStore>, BlobError> {
    match &config.blob {
        BlobConfig::Local { .. } => {
            let store = LocalBlobStore::new(config.content_dir()).await?;
            Ok(Arc::new(store))
        }
        BlobConfig::Remote {
            endpoint,
            public_url,
            auth_token,
            ..
        } => {
            let store = RemoteBlobStore::new(
                endpoint,
                public_url,
                auth_token.clone(),
                config.request_timeout(),
            )?;
            Ok(Arc::new(store))
        }
    }
}

/// Collision-resistant stored name: `<unix millis>-<sanitized original name>`.
#[must_use]
pub fn stored_name(original: &str) -> String {
    format!(
        "{}-{}",
        Utc::now().timestamp_millis(),
        sanitize_filename(original)
    )
}

fn sanitize_filename(original: &str) -> String {
    let base = original
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or(original)
        .trim();

    let cleaned: String = base
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_') {
                c
            } else {
                '_'
            }
        })
        .take(MAX_NAME_LEN)
        .collect();

    let cleaned = cleaned.trim_start_matches('.');
    if cleaned.is_empty() {
        FALLBACK_NAME.to_string()
    } else {
        cleaned.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sanitize_filename() {
        assert_eq!(sanitize_filename("photo.jpg"), "photo.jpg");
        assert_eq!(sanitize_filename("my photo (1).png"), "my_photo__1_.png");
        assert_eq!(sanitize_filename("../../etc/passwd"), "passwd");
        assert_eq!(sanitize_filename("C:\\Users\\me\\cat.gif"), "cat.gif");
        assert_eq!(sanitize_filename(".hidden"), "hidden");
        assert_eq!(sanitize_filename(""), "image");
        assert_eq!(sanitize_filename("dir/"), "image");
    }

    #[test]
    fn test_stored_name_has_timestamp_prefix() {
        let name = stored_name("captured.png");
        let (millis, rest) = name.split_once('-').unwrap();
        assert!(millis.parse::<i64>().is_ok());
        assert_eq!(rest, "captured.png");
    }
}
