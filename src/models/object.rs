//! Represents an object as observed in a backend listing.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Normalized storage class of an object.
///
/// Every backend names its classes differently (S3: `STANDARD`,
/// `STANDARD_IA`, `GLACIER`; DataLake: `Hot`, `Cool`, `Archive`). Adapters
/// fold that vocabulary into this four-value model so the policy never sees
/// backend-native strings.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum StorageTier {
    /// Frequently accessed, lowest latency (S3 STANDARD, DataLake Hot).
    Hot,
    /// Infrequent access (S3 STANDARD_IA, DataLake Cool).
    Cool,
    /// Archive class (S3 GLACIER / DEEP_ARCHIVE, DataLake Archive).
    Cold,
    /// Class string the adapter did not recognize.
    Unknown,
}

impl fmt::Display for StorageTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            StorageTier::Hot => "hot",
            StorageTier::Cool => "cool",
            StorageTier::Cold => "cold",
            StorageTier::Unknown => "unknown",
        };
        write!(f, "{}", name)
    }
}

/// Immutable snapshot of one stored object, taken at list time.
///
/// The snapshot may be stale by the time an action executes; the backend is
/// eventually consistent and the sweep treats a vanished object as a
/// per-object failure, not a crash.
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct ObjectRecord {
    /// Opaque key or path identifying the object within its container.
    pub key: String,

    /// Size in bytes, when the backend reports one.
    pub size: Option<i64>,

    /// Timestamp when the object was last modified (UTC).
    pub last_modified: DateTime<Utc>,

    /// Current storage class, normalized.
    pub tier: StorageTier,

    /// Backend-native class string, kept for diagnostics.
    pub native_class: String,
}
