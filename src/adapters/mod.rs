//! Backend adapters: the capability set the orchestrator drives.
//!
//! One concrete variant per backend, selected by [`BackendKind`] at
//! construction. Each variant wraps the opaque [`ObjectStore`] capability
//! and owns the translation between its backend's storage-class vocabulary
//! and the normalized tier model; nothing above this layer ever sees a
//! native class string.

pub mod datalake;
pub mod s3;

use async_trait::async_trait;
use std::path::Path;
use std::sync::Arc;

use crate::models::object::ObjectRecord;
use crate::policy::RetentionTier;
use crate::secrets::{BackendCredentials, CredentialError};
use crate::store::{NativeObject, ObjectStore, StoreResult};

/// Supported storage backends.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BackendKind {
    Aws,
    Azure,
}

impl BackendKind {
    /// Service name recorded in ledger rows.
    pub fn service_name(self) -> &'static str {
        match self {
            BackendKind::Aws => "AWS",
            BackendKind::Azure => "Azure",
        }
    }
}

/// Capability set exposed to the orchestrator.
///
/// All side effects are remote and irreversible once committed; rollback is
/// the backend's versioning concern, not this crate's.
#[async_trait]
pub trait ObjectStoreAdapter: Send + Sync {
    /// Service name for ledger rows and logs.
    fn service_name(&self) -> &'static str;

    /// Full listing snapshot. Pagination is drained internally; callers
    /// never see continuation tokens.
    async fn list_objects(&self) -> StoreResult<Vec<ObjectRecord>>;

    /// Move an object into the storage class of the given band.
    async fn retier(&self, key: &str, target: RetentionTier) -> StoreResult<()>;

    /// Remove an object.
    async fn delete(&self, key: &str) -> StoreResult<()>;

    /// Upload a local file under `key`.
    async fn upload(&self, local_path: &Path, key: &str) -> StoreResult<()>;
}

/// Construct the adapter variant matching `kind`.
///
/// Fails when the resolved credentials are shaped for the other backend.
pub fn build_adapter(
    kind: BackendKind,
    credentials: BackendCredentials,
    store: Arc<dyn ObjectStore>,
) -> Result<Box<dyn ObjectStoreAdapter>, CredentialError> {
    match (kind, credentials) {
        (BackendKind::Aws, BackendCredentials::Aws(creds)) => {
            Ok(Box::new(s3::S3Adapter::new(store, creds)))
        }
        (BackendKind::Azure, BackendCredentials::Azure(creds)) => {
            Ok(Box::new(datalake::DataLakeAdapter::new(store, creds)))
        }
        (kind, _) => Err(CredentialError::Mismatch(
            kind.service_name().to_string(),
        )),
    }
}

/// Drain every listing page from the store.
pub(crate) async fn drain_listing(store: &dyn ObjectStore) -> StoreResult<Vec<NativeObject>> {
    let mut entries = Vec::new();
    let mut token = None;
    loop {
        let page = store.list_page(token).await?;
        entries.extend(page.entries);
        match page.next_token {
            Some(next) => token = Some(next),
            None => break,
        }
    }
    Ok(entries)
}
