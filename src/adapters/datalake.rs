//! DataLake-like backend adapter.
//!
//! Same capability set as the S3 variant, but speaking the blob access-tier
//! vocabulary (`Hot`, `Cool`, `Archive`).

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
use crate::secrets::AzureCredentials;
use crate::store::{ObjectStore, StoreError, StoreResult};

/// Normalize a blob access-tier string.
fn normalize_class(class: &str) -> StorageTier {
    match class.to_ascii_lowercase().as_str() {
        "hot" => StorageTier::Hot,
        "cool" => StorageTier::Cool,
        "archive" | "cold" => StorageTier::Cold,
        _ => StorageTier::Unknown,
    }
}

/// Access tier for a retention band.
fn native_class(target: RetentionTier) -> StoreResult<&'static str> {
    match target {
        RetentionTier::RealTime => Ok("Hot"),
        RetentionTier::Reference => Ok("Cool"),
        RetentionTier::Archival => Ok("Archive"),
        RetentionTier::Expired => Err(StoreError::Backend(
            "expired band has no access tier".into(),
        )),
    }
}

/// Adapter for DataLake-like backends.
pub struct DataLakeAdapter {
    store: Arc<dyn ObjectStore>,
    file_system_name: String,
}

impl DataLakeAdapter {
    pub fn new(store: Arc<dyn ObjectStore>, credentials: AzureCredentials) -> Self {
        Self {
            store,
            file_system_name: credentials.file_system_name,
        }
    }
}

#[async_trait]
impl ObjectStoreAdapter for DataLakeAdapter {
    fn service_name(&self) -> &'static str {
        "Azure"
    }

    async fn list_objects(&self) -> StoreResult<Vec<ObjectRecord>> {
        let entries = drain_listing(self.store.as_ref()).await?;
        debug!(
            "listed {} paths in file system `{}`",
            entries.len(),
            self.file_system_name
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
        let tier = native_class(target)?;
        debug!(
            "setting access tier of `{}` in `{}` to {}",
            key, self.file_system_name, tier
        );
        self.store.set_storage_class(key, tier).await
    }

    async fn delete(&self, key: &str) -> StoreResult<()> {
        debug!("deleting `{}` from `{}`", key, self.file_system_name);
        self.store.delete(key).await
    }

    async fn upload(&self, local_path: &Path, key: &str) -> StoreResult<()> {
        let file = File::open(local_path).await?;
        let stream = ReaderStream::new(file).boxed();
        let stored = self.store.put(key, stream).await?;
        debug!(
            "uploaded {} to `{}` in `{}` ({:?} bytes)",
            local_path.display(),
            key,
            self.file_system_name,
            stored.size
        );
        Ok(())
    }
}
