//! S3-like backend adapter.
//!
//! Normalizes the S3 storage-class vocabulary (`STANDARD`, `STANDARD_IA`,
//! `GLACIER`, ...) into the four-tier model and maps retention bands back to
//! the class names used for retiering.

use async_trait::async_trait;
use futures::StreamExt;
use std::path::Path;
use std::sync::Arc;
use tokio::fs::File;
use tokio_util::io::ReaderStream;
use tracing::debug;

use super::{ObjectStoreAdapter, drain_listing};
use crate::models::object::{ObjectRecord, StorageTier};
use crate::policy::RetentionTier;
use crate::secrets::AwsCredentials;
use crate::store::{ObjectStore, StoreError, StoreResult};

/// Normalize an S3 storage-class string.
fn normalize_class(class: &str) -> StorageTier {
    match class.to_ascii_uppercase().as_str() {
        "STANDARD" => StorageTier::Hot,
        "STANDARD_IA" | "ONEZONE_IA" | "INTELLIGENT_TIERING" => StorageTier::Cool,
        "GLACIER" | "GLACIER_IR" | "DEEP_ARCHIVE" => StorageTier::Cold,
        _ => StorageTier::Unknown,
    }
}

/// S3 class for a retention band. `Expired` objects are deleted, never
/// retiered, so they have no class.
fn native_class(target: RetentionTier) -> StoreResult<&'static str> {
    match target {
        RetentionTier::RealTime => Ok("STANDARD"),
        RetentionTier::Reference => Ok("STANDARD_IA"),
        RetentionTier::Archival => Ok("GLACIER"),
        RetentionTier::Expired => Err(StoreError::Backend(
            "expired band has no storage class".into(),
        )),
    }
}

/// Adapter for S3-like backends.
pub struct S3Adapter {
    store: Arc<dyn ObjectStore>,
    bucket_name: String,
}

impl S3Adapter {
    pub fn new(store: Arc<dyn ObjectStore>, credentials: AwsCredentials) -> Self {
        Self {
            store,
            bucket_name: credentials.bucket_name,
        }
    }
}

#[async_trait]
impl ObjectStoreAdapter for S3Adapter {
    fn service_name(&self) -> &'static str {
        "AWS"
    }

    async fn list_objects(&self) -> StoreResult<Vec<ObjectRecord>> {
        let entries = drain_listing(self.store.as_ref()).await?;
        debug!(
            "listed {} objects in bucket `{}`",
            entries.len(),
            self.bucket_name
        );
        Ok(entries
            .into_iter()
            .map(|native| ObjectRecord {
                tier: normalize_class(&native.storage_class),
                key: native.key,
                size: native.size,
                last_modified: native.last_modified,
                native_class: native.storage_class,
            })
            .collect())
    }

    async fn retier(&self, key: &str, target: RetentionTier) -> StoreResult<()> {
        let class = native_class(target)?;
        debug!(
            "moving `{}` in bucket `{}` to {}",
            key, self.bucket_name, class
        );
        self.store.set_storage_class(key, class).await
    }

    async fn delete(&self, key: &str) -> StoreResult<()> {
        debug!("deleting `{}` from bucket `{}`", key, self.bucket_name);
        self.store.delete(key).await
    }

    async fn upload(&self, local_path: &Path, key: &str) -> StoreResult<()> {
        let file = File::open(local_path).await?;
        let stream = ReaderStream::new(file).boxed();
        let stored = self.store.put(key, stream).await?;
        debug!(
            "uploaded {} to `{}` in bucket `{}` ({:?} bytes)",
            local_path.display(),
            key,
            self.bucket_name,
            stored.size
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::memory::MemoryStore;
    use chrono::Utc;

    fn adapter_over(store: Arc<MemoryStore>) -> S3Adapter {
        S3Adapter::new(
            store,
            AwsCredentials {
                aws_access_key_id: "AKIA".into(),
                aws_secret_access_key: "secret".into(),
                bucket_name: "data".into(),
            },
        )
    }

    #[test]
    fn storage_classes_normalize_case_insensitively() {
        assert_eq!(normalize_class("STANDARD"), StorageTier::Hot);
        assert_eq!(normalize_class("standard_ia"), StorageTier::Cool);
        assert_eq!(normalize_class("ONEZONE_IA"), StorageTier::Cool);
        assert_eq!(normalize_class("Glacier"), StorageTier::Cold);
        assert_eq!(normalize_class("DEEP_ARCHIVE"), StorageTier::Cold);
        assert_eq!(normalize_class("REDUCED_REDUNDANCY"), StorageTier::Unknown);
    }

    #[tokio::test]
    async fn listing_drains_pagination_and_normalizes() {
        let store = Arc::new(MemoryStore::new(2, "STANDARD"));
        store.insert("a", 1, Utc::now(), "STANDARD");
        store.insert("b", 1, Utc::now(), "STANDARD_IA");
        store.insert("c", 1, Utc::now(), "GLACIER");
        store.insert("d", 1, Utc::now(), "MYSTERY_CLASS");
        store.insert("e", 1, Utc::now(), "STANDARD");

        let adapter = adapter_over(store);
        let records = adapter.list_objects().await.expect("list");
        assert_eq!(records.len(), 5);
        assert_eq!(records[0].tier, StorageTier::Hot);
        assert_eq!(records[1].tier, StorageTier::Cool);
        assert_eq!(records[2].tier, StorageTier::Cold);
        assert_eq!(records[3].tier, StorageTier::Unknown);
        assert_eq!(records[3].native_class, "MYSTERY_CLASS");
    }

    #[tokio::test]
    async fn retier_uses_the_s3_vocabulary() {
        let store = Arc::new(MemoryStore::new(10, "STANDARD"));
        store.insert("obj", 1, Utc::now(), "STANDARD");
        let adapter = adapter_over(Arc::clone(&store));

        adapter
            .retier("obj", RetentionTier::Reference)
            .await
            .expect("retier");
        assert_eq!(store.class_of("obj").as_deref(), Some("STANDARD_IA"));

        adapter
            .retier("obj", RetentionTier::Archival)
            .await
            .expect("retier");
        assert_eq!(store.class_of("obj").as_deref(), Some("GLACIER"));
    }

    #[tokio::test]
    async fn retier_to_expired_is_refused() {
        let store = Arc::new(MemoryStore::new(10, "STANDARD"));
        store.insert("obj", 1, Utc::now(), "STANDARD");
        let adapter = adapter_over(store);
        assert!(adapter.retier("obj", RetentionTier::Expired).await.is_err());
    }

    #[tokio::test]
    async fn upload_streams_a_local_file() {
        let dir = tempfile::TempDir::new().expect("tempdir");
        let local = dir.path().join("report.csv");
        std::fs::write(&local, b"a,b,c\n1,2,3\n").expect("write file");

        let store = Arc::new(MemoryStore::new(10, "STANDARD"));
        let adapter = adapter_over(Arc::clone(&store));
        adapter
            .upload(&local, "reports/report.csv")
            .await
            .expect("upload");
        assert!(store.contains("reports/report.csv"));
        assert_eq!(
            store.class_of("reports/report.csv").as_deref(),
            Some("STANDARD")
        );
    }
}
