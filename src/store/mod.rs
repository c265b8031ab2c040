//! The opaque backend storage capability.
//!
//! `ObjectStore` models the raw cloud storage API in backend-native terms:
//! paginated listing, native storage-class strings, irreversible mutations.
//! Adapters sit on top of it and translate between this vocabulary and the
//! normalized tier model. Two implementations ship with the crate:
//!
//! - [`memory::MemoryStore`] — in-memory map with fault injection, for tests
//!   and simulation.
//! - [`local::LocalStore`] — SQLite metadata plus on-disk payloads, so the
//!   CLI runs end-to-end without cloud SDKs.

pub mod local;
pub mod memory;

use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use futures::stream::BoxStream;
use std::io;
use thiserror::Error;

/// Payload stream handed to [`ObjectStore::put`].
pub type ByteStream = BoxStream<'static, io::Result<Bytes>>;

/// One object as the backend reports it, storage class untranslated.
#[derive(Clone, Debug)]
pub struct NativeObject {
    pub key: String,
    pub size: Option<i64>,
    pub last_modified: DateTime<Utc>,
    /// Backend-native class string (e.g. `STANDARD_IA`, `Cool`).
    pub storage_class: String,
}

/// One page of a backend listing.
#[derive(Debug)]
pub struct ObjectPage {
    pub entries: Vec<NativeObject>,
    /// Opaque continuation token; `None` on the last page.
    pub next_token: Option<String>,
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("object `{0}` not found")]
    NotFound(String),
    #[error("access denied: {0}")]
    PermissionDenied(String),
    #[error("invalid object key")]
    InvalidObjectKey,
    #[error("backend error: {0}")]
    Backend(String),
    #[error(transparent)]
    Sqlx(#[from] sqlx::Error),
    #[error(transparent)]
    Io(#[from] io::Error),
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Raw storage backend operations.
///
/// All mutations are remote and irreversible once committed; a retier or
/// delete cannot be rolled back by this crate. Implementations must be
/// `Send + Sync` for use across async tasks.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Fetch one listing page, starting after `token` when given.
    async fn list_page(&self, token: Option<String>) -> StoreResult<ObjectPage>;

    /// Change an object's storage class, using the backend's own vocabulary.
    async fn set_storage_class(&self, key: &str, native_class: &str) -> StoreResult<()>;

    /// Remove an object.
    async fn delete(&self, key: &str) -> StoreResult<()>;

    /// Write an object from a byte stream, returning its stored metadata.
    async fn put(&self, key: &str, data: ByteStream) -> StoreResult<NativeObject>;
}
