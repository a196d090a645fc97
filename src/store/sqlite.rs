use std::path::Path;
use std::sync::Mutex;
use std::time::Duration;

use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::{Connection, OptionalExtension, Transaction, params};

use super::Store;
use super::schema::SCHEMA;
use crate::error::{Error, Result};
use crate::types::*;

const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    pub fn new<P: AsRef<Path>>(db_path: P) -> Result<Self> {
        let conn = Connection::open(db_path)?;

        conn.pragma_update(None, "foreign_keys", "ON")?;
        conn.pragma_update(None, "journal_mode", "WAL")?;
        conn.busy_timeout(BUSY_TIMEOUT)?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn conn(&self) -> std::sync::MutexGuard<'_, Connection> {
        self.conn.lock().unwrap_or_else(|e| e.into_inner())
    }
}

fn parse_datetime(s: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .or_else(|_| {
            // Handle SQLite's default datetime format: "YYYY-MM-DD HH:MM:SS"
            chrono::NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S").map(|ndt| ndt.and_utc())
        })
        .unwrap_or_else(|e| {
            tracing::error!("Invalid datetime in database: '{}' - {}", s, e);
            Utc::now()
        })
}

// Fixed width so that lexical order in SQL matches chronological order.
fn format_datetime(dt: &DateTime<Utc>) -> String {
    dt.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn user_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<User> {
    Ok(User {
        user_id: row.get(0)?,
        password: row.get(1)?,
        name: row.get(2)?,
        created_at: parse_datetime(&row.get::<_, String>(3)?),
    })
}

fn user_exists(tx: &Transaction<'_>, user_id: &str) -> Result<bool> {
    let found: Option<i32> = tx
        .query_row(
            "SELECT 1 FROM users WHERE user_id = ?1",
            params![user_id],
            |row| row.get(0),
        )
        .optional()?;
    Ok(found.is_some())
}

/// Makes sure `user_id` exists, inserting a bare row if `create_user` allows it.
fn require_user(tx: &Transaction<'_>, user_id: &str, create_user: bool) -> Result<()> {
    if user_exists(tx, user_id)? {
        return Ok(());
    }
    if !create_user {
        return Err(Error::NotFound);
    }

    tracing::warn!("Creating stub user '{}' while linking a category", user_id);
    tx.execute(
        "INSERT INTO users (user_id, password, name, created_at) VALUES (?1, '', '', ?2)",
        params![user_id, format_datetime(&Utc::now())],
    )?;
    Ok(())
}

fn upsert_category(tx: &Transaction<'_>, name: &str) -> Result<i64> {
    // The no-op update makes RETURNING yield the id on conflict too.
    let id = tx.query_row(
        "INSERT INTO categories (name) VALUES (?1)
         ON CONFLICT(name) DO UPDATE SET name = excluded.name
         RETURNING id",
        params![name],
        |row| row.get(0),
    )?;
    Ok(id)
}

fn insert_link(tx: &Transaction<'_>, user_id: &str, category_id: i64) -> Result<()> {
    tx.execute(
        "INSERT OR IGNORE INTO user_categories (user_id, category_id) VALUES (?1, ?2)",
        params![user_id, category_id],
    )?;
    Ok(())
}

fn collect_locators<P: rusqlite::Params>(
    tx: &Transaction<'_>,
    sql: &str,
    params: P,
) -> Result<Vec<String>> {
    let mut stmt = tx.prepare(sql)?;
    let rows = stmt.query_map(params, |row| row.get(0))?;
    rows.collect::<std::result::Result<Vec<_>, _>>()
        .map_err(Error::from)
}

impl Store for SqliteStore {
    fn initialize(&self) -> Result<()> {
        self.conn().execute_batch(SCHEMA)?;
        Ok(())
    }

    // User operations

    fn create_user(&self, user: &User) -> Result<()> {
        let result = self.conn().execute(
            "INSERT INTO users (user_id, password, name, created_at) VALUES (?1, ?2, ?3, ?4)",
            params![
                user.user_id,
                user.password,
                user.name,
                format_datetime(&user.created_at),
            ],
        );

        match result {
            Ok(_) => Ok(()),
            Err(rusqlite::Error::SqliteFailure(err, _))
                if err.code == rusqlite::ErrorCode::ConstraintViolation =>
            {
                Err(Error::AlreadyExists)
            }
            Err(e) => Err(Error::from(e)),
        }
    }

    fn get_user(&self, user_id: &str) -> Result<Option<User>> {
        let conn = self.conn();
        conn.query_row(
            "SELECT user_id, password, name, created_at FROM users WHERE user_id = ?1",
            params![user_id],
            user_from_row,
        )
        .optional()
        .map_err(Error::from)
    }

    fn list_users(&self) -> Result<Vec<User>> {
        let conn = self.conn();
        let mut stmt = conn.prepare(
            "SELECT user_id, password, name, created_at
             FROM users ORDER BY created_at ASC, rowid ASC",
        )?;

        let rows = stmt.query_map([], user_from_row)?;

        rows.collect::<std::result::Result<Vec<_>, _>>()
            .map_err(Error::from)
    }

    fn set_user_name(&self, user_id: &str, name: &str) -> Result<User> {
        if name.trim().is_empty() {
            return Err(Error::InvalidArgument("Name cannot be empty".to_string()));
        }

        let conn = self.conn();
        conn.query_row(
            "UPDATE users SET name = ?1 WHERE user_id = ?2
             RETURNING user_id, password, name, created_at",
            params![name, user_id],
            user_from_row,
        )
        .optional()?
        .ok_or(Error::NotFound)
    }

    fn delete_user(&self, user_id: &str) -> Result<Vec<String>> {
        let mut conn = self.conn();
        let tx = conn.transaction()?;

        if !user_exists(&tx, user_id)? {
            return Err(Error::NotFound);
        }

        let locators = collect_locators(
            &tx,
            "SELECT image_url FROM images WHERE user_id = ?1 ORDER BY image_id",
            params![user_id],
        )?;

        tx.execute("DELETE FROM images WHERE user_id = ?1", params![user_id])?;
        tx.execute(
            "DELETE FROM user_categories WHERE user_id = ?1",
            params![user_id],
        )?;
        tx.execute("DELETE FROM users WHERE user_id = ?1", params![user_id])?;

        tx.commit()?;
        Ok(locators)
    }

    // Category operations

    fn ensure_category(&self, name: &str) -> Result<i64> {
        let mut conn = self.conn();
        let tx = conn.transaction()?;
        let id = upsert_category(&tx, name)?;
        tx.commit()?;
        Ok(id)
    }

    fn get_category(&self, id: i64) -> Result<Option<Category>> {
        let conn = self.conn();
        conn.query_row(
            "SELECT id, name FROM categories WHERE id = ?1",
            params![id],
            |row| {
                Ok(Category {
                    id: row.get(0)?,
                    name: row.get(1)?,
                })
            },
        )
        .optional()
        .map_err(Error::from)
    }

    fn link_user_category(
        &self,
        user_id: &str,
        category_id: i64,
        create_user: bool,
    ) -> Result<()> {
        let mut conn = self.conn();
        let tx = conn.transaction()?;

        let category: Option<i64> = tx
            .query_row(
                "SELECT id FROM categories WHERE id = ?1",
                params![category_id],
                |row| row.get(0),
            )
            .optional()?;
        if category.is_none() {
            return Err(Error::NotFound);
        }

        require_user(&tx, user_id, create_user)?;
        insert_link(&tx, user_id, category_id)?;

        tx.commit()?;
        Ok(())
    }

    fn add_user_category(&self, user_id: &str, name: &str, create_user: bool) -> Result<Category> {
        let mut conn = self.conn();
        let tx = conn.transaction()?;

        require_user(&tx, user_id, create_user)?;
        let id = upsert_category(&tx, name)?;
        insert_link(&tx, user_id, id)?;

        tx.commit()?;
        Ok(Category {
            id,
            name: name.to_string(),
        })
    }

    fn list_category_names(&self) -> Result<Vec<String>> {
        let conn = self.conn();
        let mut stmt = conn.prepare("SELECT name FROM categories")?;
        let rows = stmt.query_map([], |row| row.get(0))?;

        rows.collect::<std::result::Result<Vec<_>, _>>()
            .map_err(Error::from)
    }

    fn list_user_categories(&self, user_id: &str) -> Result<Vec<Category>> {
        let conn = self.conn();
        let mut stmt = conn.prepare(
            "SELECT c.id, c.name
             FROM categories c
             JOIN user_categories uc ON c.id = uc.category_id
             WHERE uc.user_id = ?1
             ORDER BY c.id ASC",
        )?;

        let rows = stmt.query_map(params![user_id], |row| {
            Ok(Category {
                id: row.get(0)?,
                name: row.get(1)?,
            })
        })?;

        rows.collect::<std::result::Result<Vec<_>, _>>()
            .map_err(Error::from)
    }

    fn remove_user_category(
        &self,
        category_id: i64,
        user_id: &str,
        policy: CategoryDeletePolicy,
    ) -> Result<CategoryRemoval> {
        let mut conn = self.conn();
        let tx = conn.transaction()?;

        let link_removed = tx.execute(
            "DELETE FROM user_categories WHERE category_id = ?1 AND user_id = ?2",
            params![category_id, user_id],
        )? > 0;

        let delete_row = match policy {
            CategoryDeletePolicy::Always => true,
            CategoryDeletePolicy::WhenUnreferenced => {
                let remaining: i64 = tx.query_row(
                    "SELECT COUNT(*) FROM user_categories WHERE category_id = ?1",
                    params![category_id],
                    |row| row.get(0),
                )?;
                remaining == 0
            }
            CategoryDeletePolicy::UnlinkOnly => false,
        };

        let mut removal = CategoryRemoval {
            link_removed,
            ..CategoryRemoval::default()
        };

        if delete_row {
            removal.removed_locators = collect_locators(
                &tx,
                "SELECT image_url FROM images WHERE category_id = ?1 ORDER BY image_id",
                params![category_id],
            )?;
            tx.execute(
                "DELETE FROM images WHERE category_id = ?1",
                params![category_id],
            )?;
            tx.execute(
                "DELETE FROM user_categories WHERE category_id = ?1",
                params![category_id],
            )?;
            removal.category_deleted =
                tx.execute("DELETE FROM categories WHERE id = ?1", params![category_id])? > 0;
        }

        tx.commit()?;
        Ok(removal)
    }

    // Image operations

    fn record_upload(&self, user_id: &str, category_id: i64, locator: &str) -> Result<Image> {
        let mut conn = self.conn();
        let tx = conn.transaction()?;

        let category: Option<i64> = tx
            .query_row(
                "SELECT id FROM categories WHERE id = ?1",
                params![category_id],
                |row| row.get(0),
            )
            .optional()?;
        if category.is_none() {
            return Err(Error::InvalidArgument("Invalid category ID".to_string()));
        }

        let linked: Option<i32> = tx
            .query_row(
                "SELECT 1 FROM user_categories WHERE user_id = ?1 AND category_id = ?2",
                params![user_id, category_id],
                |row| row.get(0),
            )
            .optional()?;
        if linked.is_none() {
            return Err(Error::NotLinked);
        }

        tx.execute(
            "INSERT INTO images (user_id, category_id, image_url) VALUES (?1, ?2, ?3)",
            params![user_id, category_id, locator],
        )?;
        let image_id = tx.last_insert_rowid();

        tx.commit()?;
        Ok(Image {
            image_id,
            user_id: user_id.to_string(),
            category_id,
            image_url: locator.to_string(),
        })
    }

    fn list_user_images(&self, user_id: &str) -> Result<Vec<CategoryImage>> {
        let conn = self.conn();
        let mut stmt = conn.prepare(
            "SELECT c.name, i.image_url
             FROM images i
             JOIN categories c ON i.category_id = c.id
             WHERE i.user_id = ?1
             ORDER BY c.id ASC, i.image_id ASC",
        )?;

        let rows = stmt.query_map(params![user_id], |row| {
            Ok(CategoryImage {
                category: row.get(0)?,
                image_url: row.get(1)?,
            })
        })?;

        rows.collect::<std::result::Result<Vec<_>, _>>()
            .map_err(Error::from)
    }

    fn list_gallery_rows(&self, user_id: &str) -> Result<Vec<GalleryRow>> {
        let conn = self.conn();
        let mut stmt = conn.prepare(
            "SELECT i.image_id, i.image_url, c.id, c.name
             FROM images i
             JOIN categories c ON i.category_id = c.id
             WHERE i.user_id = ?1
             ORDER BY c.id ASC, i.image_id ASC",
        )?;

        let rows = stmt.query_map(params![user_id], |row| {
            Ok(GalleryRow {
                image_id: row.get(0)?,
                image_url: row.get(1)?,
                category_id: row.get(2)?,
                category_name: row.get(3)?,
            })
        })?;

        rows.collect::<std::result::Result<Vec<_>, _>>()
            .map_err(Error::from)
    }

    fn delete_image(&self, candidates: &[String]) -> Result<Vec<Image>> {
        let mut conn = self.conn();
        let tx = conn.transaction()?;

        let mut deleted = Vec::new();
        for candidate in candidates {
            let mut stmt = tx.prepare(
                "DELETE FROM images WHERE image_url = ?1
                 RETURNING image_id, user_id, category_id, image_url",
            )?;
            let rows = stmt.query_map(params![candidate], |row| {
                Ok(Image {
                    image_id: row.get(0)?,
                    user_id: row.get(1)?,
                    category_id: row.get(2)?,
                    image_url: row.get(3)?,
                })
            })?;
            deleted = rows.collect::<std::result::Result<Vec<_>, _>>()?;
            if !deleted.is_empty() {
                break;
            }
        }

        if deleted.is_empty() {
            return Err(Error::NotFound);
        }

        tx.commit()?;
        Ok(deleted)
    }
}
