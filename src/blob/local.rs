use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::fs::{self, File};
use tokio::io::AsyncWriteExt;
use uuid::Uuid;

use super::{BlobError, BlobStore, UPLOADS_PREFIX, stored_name};

/// Stores uploads as flat files in a content directory.
///
/// Locators are relative paths of the form `uploads/<stored name>`.
pub struct LocalBlobStore {
    content_dir: PathBuf,
}

impl LocalBlobStore {
    pub async fn new(content_dir: PathBuf) -> Result<Self, BlobError> {
        fs::create_dir_all(&content_dir).await?;
        fs::create_dir_all(content_dir.join(".tmp")).await?;
        Ok(Self { content_dir })
    }

    #[must_use]
    pub fn content_dir(&self) -> &Path {
        &self.content_dir
    }

    fn temp_path(&self) -> PathBuf {
        self.content_dir
            .join(".tmp")
            .join(Uuid::new_v4().to_string())
    }

    fn file_path(&self, locator: &str) -> Result<PathBuf, BlobError> {
        let name = file_name(locator)?;
        Ok(self.content_dir.join(name))
    }
}

/// Extracts the stored file name from a local locator.
fn file_name(locator: &str) -> Result<&str, BlobError> {
    let locator = locator.trim().trim_start_matches('/');
    let name = locator
        .strip_prefix(UPLOADS_PREFIX)
        .and_then(|rest| rest.strip_prefix('/'))
        .unwrap_or(locator);

    validate_name(name)?;
    Ok(name)
}

fn validate_name(name: &str) -> Result<(), BlobError> {
    if name.is_empty() {
        return Err(BlobError::InvalidLocator("empty file name".to_string()));
    }

    if name.len() > 255 {
        return Err(BlobError::InvalidLocator(
            "file name cannot exceed 255 characters".to_string(),
        ));
    }

    const INVALID_CHARS: &[char] = &['\0', '\n', '\r', '/', '\\'];
    if name.chars().any(|c| INVALID_CHARS.contains(&c)) || name.starts_with('.') {
        return Err(BlobError::InvalidLocator(format!(
            "'{name}' is not a stored file name"
        )));
    }

    Ok(())
}

#[async_trait]
impl BlobStore for LocalBlobStore {
    async fn put(&self, filename: &str, data: &[u8]) -> Result<String, BlobError> {
        let mut name = stored_name(filename);
        if fs::try_exists(self.content_dir.join(&name)).await? {
            name = format!("{}-{name}", &Uuid::new_v4().simple().to_string()[..8]);
        }

        let temp_path = self.temp_path();
        let mut temp_file = File::create(&temp_path).await?;
        if let Err(e) = temp_file.write_all(data).await {
            drop(temp_file);
            let _ = fs::remove_file(&temp_path).await;
            return Err(e.into());
        }
        temp_file.sync_all().await?;
        drop(temp_file);

        if let Err(e) = fs::rename(&temp_path, self.content_dir.join(&name)).await {
            let _ = fs::remove_file(&temp_path).await;
            return Err(e.into());
        }

        Ok(format!("{UPLOADS_PREFIX}/{name}"))
    }

    async fn get(&self, locator: &str) -> Result<Vec<u8>, BlobError> {
        let path = self.file_path(locator)?;
        fs::read(&path).await.map_err(BlobError::from_io)
    }

    async fn delete(&self, locator: &str) -> Result<bool, BlobError> {
        let path = self.file_path(locator)?;

        match fs::remove_file(&path).await {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(BlobError::Io(e)),
        }
    }

    fn backend(&self) -> &'static str {
        "local"
    }
}
