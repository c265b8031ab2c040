//! Traceable-movement ledger: append-only CSV audit trail.
//!
//! One row per attempted lifecycle mutation, header
//! `timestamp,service,action,file_path,tier,status,error_message`. Appends
//! never fail the caller — persistence problems are logged operationally and
//! swallowed, because traceability is best-effort and must never block or
//! mask the backend mutation it describes.

use std::fs::OpenOptions;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tokio::sync::Mutex;
use tracing::{debug, error};

use crate::models::movement::MovementRecord;

const HEADER: [&str; 7] = [
    "timestamp",
    "service",
    "action",
    "file_path",
    "tier",
    "status",
    "error_message",
];

#[derive(Debug, Error)]
pub enum LedgerError {
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Csv(#[from] csv::Error),
}

/// Append-only movement ledger persisted as a CSV file.
///
/// Appends are serialized behind a mutex so concurrent object operations
/// cannot interleave partial rows.
pub struct TraceLedger {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl TraceLedger {
    /// Open the ledger, writing the header if the file does not exist yet.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, LedgerError> {
        let path = path.into();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        if !path.exists() {
            let file = OpenOptions::new().create(true).write(true).open(&path)?;
            let mut writer = csv::Writer::from_writer(file);
            writer.write_record(HEADER)?;
            writer.flush()?;
            debug!("initialized ledger at {}", path.display());
        }
        Ok(Self {
            path,
            write_lock: Mutex::new(()),
        })
    }

    /// Path of the backing file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append one movement record.
    ///
    /// Never propagates an error: a failed write is logged to the
    /// operational log and dropped. The mutation the record describes has
    /// already been attempted independently of this call. The csv crate is
    /// synchronous, so the write runs on the blocking pool; the mutex is
    /// held across it to keep rows from interleaving.
    pub async fn append(&self, record: &MovementRecord) {
        let _guard = self.write_lock.lock().await;
        let path = self.path.clone();
        let record = record.clone();
        let outcome =
            tokio::task::spawn_blocking(move || (append_record(&path, &record), record)).await;
        match outcome {
            Ok((Ok(()), _)) => {}
            Ok((Err(err), record)) => error!(
                "ledger append failed for `{}` ({} {}): {}",
                record.file_path, record.service, record.action, err
            ),
            Err(err) => error!("ledger append task failed: {}", err),
        }
    }

    /// Read back every record, in file order, for audit and reconciliation.
    pub async fn query_all(&self) -> Result<Vec<MovementRecord>, LedgerError> {
        let _guard = self.write_lock.lock().await;
        let path = self.path.clone();
        tokio::task::spawn_blocking(move || {
            let mut reader = csv::ReaderBuilder::new().has_headers(true).from_path(&path)?;
            let mut records = Vec::new();
            for row in reader.deserialize() {
                records.push(row?);
            }
            Ok(records)
        })
        .await
        .map_err(|err| LedgerError::Io(std::io::Error::other(err)))?
    }
}

/// Serialize one record onto the end of the file.
fn append_record(path: &Path, record: &MovementRecord) -> Result<(), LedgerError> {
    let file = OpenOptions::new().append(true).open(path)?;
    let mut writer = csv::WriterBuilder::new()
        .has_headers(false)
        .from_writer(file);
    writer.serialize(record)?;
    writer.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::movement::MovementStatus;
    use std::sync::Arc;
    use tempfile::TempDir;

    fn ledger_in(dir: &TempDir) -> TraceLedger {
        TraceLedger::open(dir.path().join("tracker.csv")).expect("open ledger")
    }

    #[tokio::test]
    async fn round_trips_success_and_failure_rows() {
        let dir = TempDir::new().expect("tempdir");
        let ledger = ledger_in(&dir);

        ledger
            .append(&MovementRecord::success(
                "AWS",
                "archive",
                "logs/app.log",
                Some("reference".into()),
            ))
            .await;
        ledger
            .append(&MovementRecord::failure(
                "Azure",
                "delete",
                "data, with commas.csv",
                None,
                "throttled: retry later",
            ))
            .await;

        let records = ledger.query_all().await.expect("query");
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].status, MovementStatus::Success);
        assert_eq!(records[0].tier.as_deref(), Some("reference"));
        assert!(records[0].error_message.is_none());
        assert_eq!(records[1].file_path, "data, with commas.csv");
        assert_eq!(
            records[1].error_message.as_deref(),
            Some("throttled: retry later")
        );
    }

    #[tokio::test]
    async fn reopening_appends_instead_of_rewriting() {
        let dir = TempDir::new().expect("tempdir");
        {
            let ledger = ledger_in(&dir);
            ledger
                .append(&MovementRecord::success("AWS", "archive", "a", None))
                .await;
        }
        let ledger = ledger_in(&dir);
        ledger
            .append(&MovementRecord::success("AWS", "archive", "b", None))
            .await;

        let records = ledger.query_all().await.expect("query");
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].file_path, "a");
        assert_eq!(records[1].file_path, "b");
    }

    #[tokio::test]
    async fn a_broken_backing_file_never_fails_the_caller() {
        let dir = TempDir::new().expect("tempdir");
        let ledger = ledger_in(&dir);

        // Yank the file out from under the ledger; the append must swallow
        // the write error instead of surfacing it.
        std::fs::remove_file(ledger.path()).expect("remove ledger file");
        ledger
            .append(&MovementRecord::success("AWS", "archive", "a", None))
            .await;
    }

    #[tokio::test]
    async fn concurrent_appends_stay_well_formed() {
        let dir = TempDir::new().expect("tempdir");
        let ledger = Arc::new(ledger_in(&dir));

        let mut handles = Vec::new();
        for i in 0..32 {
            let ledger = Arc::clone(&ledger);
            handles.push(tokio::spawn(async move {
                ledger
                    .append(&MovementRecord::success(
                        "AWS",
                        "archive",
                        format!("object-{i}"),
                        Some("reference".into()),
                    ))
                    .await;
            }));
        }
        for handle in handles {
            handle.await.expect("appender task");
        }

        let records = ledger.query_all().await.expect("query");
        assert_eq!(records.len(), 32);
        for record in records {
            assert_eq!(record.service, "AWS");
            assert_eq!(record.status, MovementStatus::Success);
            assert!(record.file_path.starts_with("object-"));
        }
    }
}
