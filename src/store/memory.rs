//! In-memory backend simulation.
//!
//! Backs unit tests and local experiments: a sorted map of objects with
//! configurable page size and per-key fault injection, so listing-failure
//! and per-object-failure paths can be exercised deterministically.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures::StreamExt;
use std::collections::{BTreeMap, HashSet};
use std::ops::Bound;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};

use super::{ByteStream, NativeObject, ObjectPage, ObjectStore, StoreError, StoreResult};

#[derive(Clone, Debug)]
struct StoredObject {
    size: i64,
    last_modified: DateTime<Utc>,
    storage_class: String,
}

/// Map-backed [`ObjectStore`] with fault injection.
pub struct MemoryStore {
    objects: Mutex<BTreeMap<String, StoredObject>>,
    /// Keys whose mutations fail with a permission error.
    fail_keys: Mutex<HashSet<String>>,
    fail_listing: AtomicBool,
    page_size: usize,
    default_class: String,
}

impl MemoryStore {
    /// Create an empty store that lists `page_size` entries per page and
    /// stores new uploads under `default_class`.
    pub fn new(page_size: usize, default_class: impl Into<String>) -> Self {
        Self {
            objects: Mutex::new(BTreeMap::new()),
            fail_keys: Mutex::new(HashSet::new()),
            fail_listing: AtomicBool::new(false),
            page_size: page_size.max(1),
            default_class: default_class.into(),
        }
    }

    /// Seed an object directly, bypassing `put`.
    pub fn insert(&self, key: &str, size: i64, last_modified: DateTime<Utc>, class: &str) {
        self.objects.lock().expect("objects lock").insert(
            key.to_string(),
            StoredObject {
                size,
                last_modified,
                storage_class: class.to_string(),
            },
        );
    }

    /// Make every mutation of `key` fail with a permission error.
    pub fn fail_key(&self, key: &str) {
        self.fail_keys
            .lock()
            .expect("fail_keys lock")
            .insert(key.to_string());
    }

    /// Make every listing call fail.
    pub fn fail_listing(&self) {
        self.fail_listing.store(true, Ordering::SeqCst);
    }

    /// Current storage class of `key`, if present.
    pub fn class_of(&self, key: &str) -> Option<String> {
        self.objects
            .lock()
            .expect("objects lock")
            .get(key)
            .map(|o| o.storage_class.clone())
    }

    pub fn contains(&self, key: &str) -> bool {
        self.objects.lock().expect("objects lock").contains_key(key)
    }

    fn check_faults(&self, key: &str) -> StoreResult<()> {
        if self.fail_keys.lock().expect("fail_keys lock").contains(key) {
            return Err(StoreError::PermissionDenied(format!(
                "injected fault for `{}`",
                key
            )));
        }
        Ok(())
    }
}

#[async_trait]
impl ObjectStore for MemoryStore {
    async fn list_page(&self, token: Option<String>) -> StoreResult<ObjectPage> {
        if self.fail_listing.load(Ordering::SeqCst) {
            return Err(StoreError::Backend("injected listing fault".into()));
        }
        let objects = self.objects.lock().expect("objects lock");
        let lower = match &token {
            Some(key) => Bound::Excluded(key.clone()),
            None => Bound::Unbounded,
        };
        let entries: Vec<NativeObject> = objects
            .range((lower, Bound::Unbounded))
            .take(self.page_size)
            .map(|(key, obj)| NativeObject {
                key: key.clone(),
                size: Some(obj.size),
                last_modified: obj.last_modified,
                storage_class: obj.storage_class.clone(),
            })
            .collect();
        // A token is only needed when a full page was returned and entries
        // remain past it.
        let next_token = if entries.len() == self.page_size {
            entries.last().and_then(|tail| {
                objects
                    .range((Bound::Excluded(tail.key.clone()), Bound::Unbounded))
                    .next()
                    .map(|_| tail.key.clone())
            })
        } else {
            None
        };
        Ok(ObjectPage {
            entries,
            next_token,
        })
    }

    async fn set_storage_class(&self, key: &str, native_class: &str) -> StoreResult<()> {
        self.check_faults(key)?;
        let mut objects = self.objects.lock().expect("objects lock");
        match objects.get_mut(key) {
            Some(obj) => {
                obj.storage_class = native_class.to_string();
                Ok(())
            }
            None => Err(StoreError::NotFound(key.to_string())),
        }
    }

    async fn delete(&self, key: &str) -> StoreResult<()> {
        self.check_faults(key)?;
        let mut objects = self.objects.lock().expect("objects lock");
        match objects.remove(key) {
            Some(_) => Ok(()),
            None => Err(StoreError::NotFound(key.to_string())),
        }
    }

    async fn put(&self, key: &str, mut data: ByteStream) -> StoreResult<NativeObject> {
        self.check_faults(key)?;
        let mut size: i64 = 0;
        while let Some(chunk) = data.next().await {
            size += chunk?.len() as i64;
        }
        let stored = StoredObject {
            size,
            last_modified: Utc::now(),
            storage_class: self.default_class.clone(),
        };
        let native = NativeObject {
            key: key.to_string(),
            size: Some(stored.size),
            last_modified: stored.last_modified,
            storage_class: stored.storage_class.clone(),
        };
        self.objects
            .lock()
            .expect("objects lock")
            .insert(key.to_string(), stored);
        Ok(native)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::stream;

    #[tokio::test]
    async fn listing_paginates_and_terminates() {
        let store = MemoryStore::new(2, "STANDARD");
        for key in ["a", "b", "c", "d", "e"] {
            store.insert(key, 1, Utc::now(), "STANDARD");
        }

        let mut seen = Vec::new();
        let mut token = None;
        loop {
            let page = store.list_page(token).await.expect("list page");
            seen.extend(page.entries.into_iter().map(|o| o.key));
            match page.next_token {
                Some(next) => token = Some(next),
                None => break,
            }
        }
        assert_eq!(seen, vec!["a", "b", "c", "d", "e"]);
    }

    #[tokio::test]
    async fn put_collects_the_stream() {
        let store = MemoryStore::new(10, "STANDARD");
        let data = stream::iter(vec![Ok(bytes::Bytes::from_static(b"hello")), Ok(bytes::Bytes::from_static(b" world"))]);
        let native = store.put("greeting", Box::pin(data)).await.expect("put");
        assert_eq!(native.size, Some(11));
        assert_eq!(store.class_of("greeting").as_deref(), Some("STANDARD"));
    }

    #[tokio::test]
    async fn faulted_key_rejects_mutations() {
        let store = MemoryStore::new(10, "STANDARD");
        store.insert("locked", 1, Utc::now(), "STANDARD");
        store.fail_key("locked");
        let err = store.delete("locked").await.expect_err("should fail");
        assert!(matches!(err, StoreError::PermissionDenied(_)));
        assert!(store.contains("locked"));
    }
}
