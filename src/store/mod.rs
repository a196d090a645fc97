mod schema;
mod sqlite;

pub use sqlite::SqliteStore;

use std::time::Duration;

use crate::error::Result;
use crate::types::*;

const READ_ATTEMPTS: u32 = 3;
const READ_BACKOFF: Duration = Duration::from_millis(25);

/// Store defines the database interface.
///
/// Every method is one atomic unit: multi-statement operations run inside a
/// single transaction.
pub trait Store: Send + Sync {
    fn initialize(&self) -> Result<()>;

    // User operations
    fn create_user(&self, user: &User) -> Result<()>;
    fn get_user(&self, user_id: &str) -> Result<Option<User>>;
    /// Oldest first.
    fn list_users(&self) -> Result<Vec<User>>;
    fn set_user_name(&self, user_id: &str, name: &str) -> Result<User>;
    /// Removes the user with its links and images. Returns the removed image locators.
    fn delete_user(&self, user_id: &str) -> Result<Vec<String>>;

    // Category operations
    /// Create-or-fetch by unique name in a single upsert.
    fn ensure_category(&self, name: &str) -> Result<i64>;
    fn get_category(&self, id: i64) -> Result<Option<Category>>;
    fn link_user_category(&self, user_id: &str, category_id: i64, create_user: bool)
    -> Result<()>;
    /// `ensure_category` followed by `link_user_category`, in one transaction.
    fn add_user_category(&self, user_id: &str, name: &str, create_user: bool) -> Result<Category>;
    fn list_category_names(&self) -> Result<Vec<String>>;
    fn list_user_categories(&self, user_id: &str) -> Result<Vec<Category>>;
    fn remove_user_category(
        &self,
        category_id: i64,
        user_id: &str,
        policy: CategoryDeletePolicy,
    ) -> Result<CategoryRemoval>;

    // Image operations
    fn record_upload(&self, user_id: &str, category_id: i64, locator: &str) -> Result<Image>;
    fn list_user_images(&self, user_id: &str) -> Result<Vec<CategoryImage>>;
    fn list_gallery_rows(&self, user_id: &str) -> Result<Vec<GalleryRow>>;
    /// Deletes the rows stored under the first candidate locator that matches any.
    fn delete_image(&self, candidates: &[String]) -> Result<Vec<Image>>;
}

/// Runs an idempotent read, retrying while the store reports a transient failure.
pub async fn retry_read<T, F>(mut read: F) -> Result<T>
where
    F: FnMut() -> Result<T>,
{
    let mut attempt = 1;
    loop {
        match read() {
            Err(e) if e.is_transient() && attempt < READ_ATTEMPTS => {
                tracing::warn!("Transient store error on read (attempt {attempt}): {e}");
                tokio::time::sleep(READ_BACKOFF * attempt).await;
                attempt += 1;
            }
            result => return result,
        }
    }
}
