//! Local, file-backed [`ObjectStore`] — SQLite for object metadata and the
//! filesystem for payloads.
//!
//! Lets the sweep run end-to-end without cloud SDKs: metadata rows carry the
//! native storage-class string, listing uses keyset pagination over the
//! `objects` table, and payloads live beneath `base_path/{key}`.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures::StreamExt;
use md5::Context;
use sqlx::{FromRow, SqlitePool};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::fs::{self, File};
use tokio::io::AsyncWriteExt;
use tracing::debug;
use uuid::Uuid;

use super::{ByteStream, NativeObject, ObjectPage, ObjectStore, StoreError, StoreResult};

const MAX_OBJECT_KEY_LEN: usize = 1024;
const DEFAULT_PAGE_SIZE: usize = 1000;

#[derive(FromRow)]
struct ObjectRow {
    key: String,
    size: i64,
    storage_class: String,
    last_modified: DateTime<Utc>,
}

impl From<ObjectRow> for NativeObject {
    fn from(row: ObjectRow) -> Self {
        NativeObject {
            key: row.key,
            size: Some(row.size),
            last_modified: row.last_modified,
            storage_class: row.storage_class,
        }
    }
}

/// SQLite + disk implementation of the backend capability.
pub struct LocalStore {
    db: Arc<SqlitePool>,
    base_path: PathBuf,
    page_size: usize,
    default_class: String,
}

impl LocalStore {
    /// Open the store, creating its schema and payload directory if needed.
    ///
    /// New uploads are stored under `default_class` (the native class string
    /// of the backend this store stands in for).
    pub async fn init(
        db: Arc<SqlitePool>,
        base_path: impl Into<PathBuf>,
        default_class: impl Into<String>,
    ) -> StoreResult<Self> {
        let base_path = base_path.into();
        fs::create_dir_all(&base_path).await?;
        sqlx::query(
            "CREATE TABLE IF NOT EXISTS objects (
                key TEXT PRIMARY KEY,
                size INTEGER NOT NULL,
                etag TEXT,
                storage_class TEXT NOT NULL,
                last_modified TEXT NOT NULL
            )",
        )
        .execute(&*db)
        .await?;
        Ok(Self {
            db,
            base_path,
            page_size: DEFAULT_PAGE_SIZE,
            default_class: default_class.into(),
        })
    }

    /// Override the listing page size (mainly for tests).
    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size.max(1);
        self
    }

    /// Basic key validation to avoid trivial path traversal vectors.
    ///
    /// Rejects keys that begin with `/` or contain `..`.
    fn ensure_key_safe(&self, key: &str) -> StoreResult<()> {
        if key.is_empty() || key.len() > MAX_OBJECT_KEY_LEN {
            return Err(StoreError::InvalidObjectKey);
        }
        if key.starts_with('/') || key.contains("..") {
            return Err(StoreError::InvalidObjectKey);
        }
        if key
            .bytes()
            .any(|b| b.is_ascii_control() || b == b'\\' || b == b'\0')
        {
            return Err(StoreError::InvalidObjectKey);
        }
        Ok(())
    }

    fn object_path(&self, key: &str) -> PathBuf {
        self.base_path.join(key)
    }

    /// Recursively remove empty directories up to the payload root.
    async fn prune_empty_dirs(&self, start: &Path) {
        let mut current = start.to_path_buf();
        while current.starts_with(&self.base_path) && current != self.base_path {
            match fs::remove_dir(&current).await {
                Ok(_) => {
                    if let Some(parent) = current.parent() {
                        current = parent.to_path_buf();
                    } else {
                        break;
                    }
                }
                Err(err) if err.kind() == ErrorKind::NotFound => break,
                Err(err) if err.kind() == ErrorKind::DirectoryNotEmpty => break,
                Err(err) => {
                    debug!("failed to prune directory {}: {}", current.display(), err);
                    break;
                }
            }
        }
    }
}

#[async_trait]
impl ObjectStore for LocalStore {
    /// Keyset-paginated listing ordered by key.
    async fn list_page(&self, token: Option<String>) -> StoreResult<ObjectPage> {
        let fetch_limit = self.page_size + 1;
        let mut rows: Vec<ObjectRow> = match &token {
            Some(after) => {
                sqlx::query_as(
                    "SELECT key, size, storage_class, last_modified
                     FROM objects WHERE key > ? ORDER BY key ASC LIMIT ?",
                )
                .bind(after)
                .bind(fetch_limit as i64)
                .fetch_all(&*self.db)
                .await?
            }
            None => {
                sqlx::query_as(
                    "SELECT key, size, storage_class, last_modified
                     FROM objects ORDER BY key ASC LIMIT ?",
                )
                .bind(fetch_limit as i64)
                .fetch_all(&*self.db)
                .await?
            }
        };

        let mut next_token = None;
        if rows.len() == fetch_limit {
            rows.pop();
            next_token = rows.last().map(|row| row.key.clone());
        }

        Ok(ObjectPage {
            entries: rows.into_iter().map(NativeObject::from).collect(),
            next_token,
        })
    }

    async fn set_storage_class(&self, key: &str, native_class: &str) -> StoreResult<()> {
        self.ensure_key_safe(key)?;
        let result = sqlx::query("UPDATE objects SET storage_class = ? WHERE key = ?")
            .bind(native_class)
            .bind(key)
            .execute(&*self.db)
            .await?;
        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound(key.to_string()));
        }
        Ok(())
    }

    /// Remove the metadata row and the payload file.
    ///
    /// The payload removal is best-effort: a missing file is logged, not an
    /// error, since the row is the authoritative record.
    async fn delete(&self, key: &str) -> StoreResult<()> {
        self.ensure_key_safe(key)?;
        let result = sqlx::query("DELETE FROM objects WHERE key = ?")
            .bind(key)
            .execute(&*self.db)
            .await?;
        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound(key.to_string()));
        }

        let file_path = self.object_path(key);
        match fs::remove_file(&file_path).await {
            Ok(_) => debug!("removed payload {}", file_path.display()),
            Err(err) if err.kind() == ErrorKind::NotFound => {
                debug!("payload {} already missing", file_path.display());
            }
            Err(err) => return Err(StoreError::Io(err)),
        }
        if let Some(parent) = file_path.parent() {
            self.prune_empty_dirs(parent).await;
        }
        Ok(())
    }

    /// Stream the payload to a temp file, fsync, rename into place, and
    /// upsert the metadata row. Temp files are cleaned up on error.
    async fn put(&self, key: &str, mut data: ByteStream) -> StoreResult<NativeObject> {
        self.ensure_key_safe(key)?;
        let file_path = self.object_path(key);
        let parent = file_path
            .parent()
            .map(Path::to_path_buf)
            .ok_or_else(|| StoreError::Backend("object path missing parent directory".into()))?;
        fs::create_dir_all(&parent).await?;
        let tmp_path = parent.join(format!(".tmp-{}", Uuid::new_v4()));
        let mut file = File::create(&tmp_path).await?;

        let mut size: i64 = 0;
        let mut digest = Context::new();
        while let Some(chunk_res) = data.next().await {
            let chunk = match chunk_res {
                Ok(chunk) => chunk,
                Err(err) => {
                    let _ = fs::remove_file(&tmp_path).await;
                    return Err(StoreError::Io(err));
                }
            };
            size += chunk.len() as i64;
            digest.consume(&chunk);
            if let Err(err) = file.write_all(&chunk).await {
                let _ = fs::remove_file(&tmp_path).await;
                return Err(StoreError::Io(err));
            }
        }
        if let Err(err) = file.flush().await {
            let _ = fs::remove_file(&tmp_path).await;
            return Err(StoreError::Io(err));
        }
        if let Err(err) = file.sync_all().await {
            let _ = fs::remove_file(&tmp_path).await;
            return Err(StoreError::Io(err));
        }

        if let Err(err) = fs::rename(&tmp_path, &file_path).await {
            if err.kind() == ErrorKind::AlreadyExists {
                fs::remove_file(&file_path).await?;
                fs::rename(&tmp_path, &file_path).await?;
            } else {
                let _ = fs::remove_file(&tmp_path).await;
                return Err(StoreError::Io(err));
            }
        }

        let last_modified = Utc::now();
        let etag = format!("{:x}", digest.compute());
        debug!("stored {} ({} bytes, etag {})", key, size, etag);

        let insert_result = sqlx::query(
            "INSERT INTO objects (key, size, etag, storage_class, last_modified)
             VALUES (?, ?, ?, ?, ?)
             ON CONFLICT(key) DO UPDATE SET
                size = excluded.size,
                etag = excluded.etag,
                storage_class = excluded.storage_class,
                last_modified = excluded.last_modified",
        )
        .bind(key)
        .bind(size)
        .bind(&etag)
        .bind(&self.default_class)
        .bind(last_modified)
        .execute(&*self.db)
        .await;

        match insert_result {
            Ok(_) => Ok(NativeObject {
                key: key.to_string(),
                size: Some(size),
                last_modified,
                storage_class: self.default_class.clone(),
            }),
            Err(err) => {
                let _ = fs::remove_file(&file_path).await;
                Err(StoreError::Sqlx(err))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::stream;
    use sqlx::sqlite::SqlitePoolOptions;
    use tempfile::TempDir;

    async fn open_store(dir: &TempDir) -> LocalStore {
        let db = Arc::new(
            SqlitePoolOptions::new()
                .max_connections(1)
                .connect("sqlite::memory:")
                .await
                .expect("open sqlite"),
        );
        LocalStore::init(db, dir.path().join("objects"), "STANDARD")
            .await
            .expect("init store")
    }

    fn payload(bytes: &'static [u8]) -> ByteStream {
        Box::pin(stream::iter(vec![Ok(bytes::Bytes::from_static(bytes))]))
    }

    #[tokio::test]
    async fn put_list_retier_delete_round_trip() {
        let dir = TempDir::new().expect("tempdir");
        let store = open_store(&dir).await;

        store.put("logs/2020/app.log", payload(b"x")).await.expect("put");
        store.put("logs/2021/app.log", payload(b"yy")).await.expect("put");

        let page = store.list_page(None).await.expect("list");
        assert_eq!(page.entries.len(), 2);
        assert!(page.next_token.is_none());
        assert_eq!(page.entries[0].storage_class, "STANDARD");

        store
            .set_storage_class("logs/2020/app.log", "GLACIER")
            .await
            .expect("retier");
        let page = store.list_page(None).await.expect("list");
        assert_eq!(page.entries[0].storage_class, "GLACIER");

        store.delete("logs/2020/app.log").await.expect("delete");
        let page = store.list_page(None).await.expect("list");
        assert_eq!(page.entries.len(), 1);
        assert!(!dir.path().join("objects/logs/2020/app.log").exists());
    }

    #[tokio::test]
    async fn listing_pages_through_many_objects() {
        let dir = TempDir::new().expect("tempdir");
        let store = open_store(&dir).await.with_page_size(2);
        for key in ["a", "b", "c", "d", "e"] {
            store.put(key, payload(b"data")).await.expect("put");
        }

        let mut seen = Vec::new();
        let mut token = None;
        loop {
            let page = store.list_page(token).await.expect("list");
            seen.extend(page.entries.into_iter().map(|o| o.key));
            match page.next_token {
                Some(next) => token = Some(next),
                None => break,
            }
        }
        assert_eq!(seen, vec!["a", "b", "c", "d", "e"]);
    }

    #[tokio::test]
    async fn mutating_a_missing_object_reports_not_found() {
        let dir = TempDir::new().expect("tempdir");
        let store = open_store(&dir).await;
        assert!(matches!(
            store.delete("ghost").await,
            Err(StoreError::NotFound(_))
        ));
        assert!(matches!(
            store.set_storage_class("ghost", "GLACIER").await,
            Err(StoreError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn traversal_keys_are_rejected() {
        let dir = TempDir::new().expect("tempdir");
        let store = open_store(&dir).await;
        assert!(matches!(
            store.delete("../escape").await,
            Err(StoreError::InvalidObjectKey)
        ));
        assert!(matches!(
            store.put("/absolute", payload(b"x")).await,
            Err(StoreError::InvalidObjectKey)
        ));
    }
}
