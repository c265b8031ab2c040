//! Represents one row of the traceable-movement ledger.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Outcome of a single lifecycle mutation attempt.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum MovementStatus {
    Success,
    Failure,
}

impl fmt::Display for MovementStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MovementStatus::Success => write!(f, "success"),
            MovementStatus::Failure => write!(f, "failure"),
        }
    }
}

/// One audit entry, created exactly once per attempted object-level
/// operation (plus the run-level placeholder when a sweep matched nothing).
///
/// Immutable once written; the ledger is append-only. Field order matches
/// the persisted CSV header:
/// `timestamp,service,action,file_path,tier,status,error_message`.
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct MovementRecord {
    /// When the attempt happened (UTC, serialized as ISO-8601).
    pub timestamp: DateTime<Utc>,

    /// Backend the action ran against ("AWS" or "Azure").
    pub service: String,

    /// Action performed (archive, restore, delete, move, upload).
    pub action: String,

    /// Key or path of the object involved.
    pub file_path: String,

    /// Target or requested tier, when applicable.
    pub tier: Option<String>,

    /// Whether the backend mutation succeeded.
    pub status: MovementStatus,

    /// Error detail on failure, or a data-quality note.
    pub error_message: Option<String>,
}

impl MovementRecord {
    /// Build a success entry stamped now.
    pub fn success(
        service: impl Into<String>,
        action: impl Into<String>,
        file_path: impl Into<String>,
        tier: Option<String>,
    ) -> Self {
        Self {
            timestamp: Utc::now(),
            service: service.into(),
            action: action.into(),
            file_path: file_path.into(),
            tier,
            status: MovementStatus::Success,
            error_message: None,
        }
    }

    /// Build a failure entry stamped now.
    pub fn failure(
        service: impl Into<String>,
        action: impl Into<String>,
        file_path: impl Into<String>,
        tier: Option<String>,
        error_message: impl Into<String>,
    ) -> Self {
        Self {
            timestamp: Utc::now(),
            service: service.into(),
            action: action.into(),
            file_path: file_path.into(),
            tier,
            status: MovementStatus::Failure,
            error_message: Some(error_message.into()),
        }
    }

    /// Attach a data-quality note without changing the status.
    pub fn with_note(mut self, note: impl Into<String>) -> Self {
        let note = note.into();
        self.error_message = Some(match self.error_message.take() {
            Some(existing) => format!("{}; {}", existing, note),
            None => note,
        });
        self
    }
}
