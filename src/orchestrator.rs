//! Archival orchestrator: drives one full sweep over a backend.
//!
//! Per run: list, evaluate the policy per object, effect the change through
//! the adapter, record every attempted mutation in the ledger, aggregate a
//! summary. The sweep is sequential and cooperatively interruptible between
//! objects via a cancellation token.

use chrono::Utc;
use serde::Serialize;
use std::path::Path;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::adapters::{BackendKind, ObjectStoreAdapter, build_adapter};
use crate::errors::ArchivalError;
use crate::ledger::TraceLedger;
use crate::models::movement::MovementRecord;
use crate::policy::{Action, Decision, RetentionTier, decide_action};
use crate::secrets::SecretsProvider;
use crate::store::{ObjectStore, StoreResult};

/// Identifier recorded for run-level ledger rows (empty sweeps, listing
/// failures) that have no object of their own.
pub const PLACEHOLDER_PATH: &str = "path_placeholder";

const SKEW_NOTE: &str = "negative object age clamped to 0 (clock skew)";

/// Aggregated outcome of one sweep.
///
/// `total` counts attempted mutations only; policy no-ops are not attempts.
/// A listing failure reports zero attempted, one failure.
#[derive(Debug, Default, Serialize)]
pub struct RunSummary {
    pub total: usize,
    pub succeeded: usize,
    pub failed: usize,
    /// (object identifier, error message) per failure.
    pub errors: Vec<(String, String)>,
}

/// Drives sweeps against one backend and records outcomes.
pub struct ArchivalOrchestrator {
    adapter: Box<dyn ObjectStoreAdapter>,
    ledger: Arc<TraceLedger>,
    cancel: CancellationToken,
}

impl ArchivalOrchestrator {
    /// Resolve credentials and construct the adapter for `kind`.
    ///
    /// Credential failures are fatal here and never retried; they abort
    /// construction, not individual object operations.
    pub async fn new(
        kind: BackendKind,
        secrets: &dyn SecretsProvider,
        secret_name: &str,
        location_hint: &str,
        store: Arc<dyn ObjectStore>,
        ledger: Arc<TraceLedger>,
    ) -> Result<Self, ArchivalError> {
        let credentials = secrets
            .get_credentials(kind, secret_name, location_hint)
            .await?;
        let adapter = build_adapter(kind, credentials, store)?;
        Ok(Self::with_adapter(adapter, ledger))
    }

    /// Construct around an already-built adapter.
    pub fn with_adapter(adapter: Box<dyn ObjectStoreAdapter>, ledger: Arc<TraceLedger>) -> Self {
        Self {
            adapter,
            ledger,
            cancel: CancellationToken::new(),
        }
    }

    /// Token callers can use to stop the sweep between objects.
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Run one sweep under `action` for the requested retention band.
    pub async fn run(&self, action: Action, requested: RetentionTier) -> RunSummary {
        let service = self.adapter.service_name();
        info!(
            "starting {} sweep on {} (requested tier: {})",
            action.as_str(),
            service,
            requested
        );

        let objects = match self.adapter.list_objects().await {
            Ok(objects) => objects,
            Err(err) => {
                let err = ArchivalError::Listing(err);
                warn!("{} sweep aborted: {}", service, err);
                self.ledger
                    .append(&MovementRecord::failure(
                        service,
                        action.as_str(),
                        PLACEHOLDER_PATH,
                        Some(requested.to_string()),
                        err.to_string(),
                    ))
                    .await;
                return RunSummary {
                    total: 0,
                    succeeded: 0,
                    failed: 1,
                    errors: vec![(PLACEHOLDER_PATH.to_string(), err.to_string())],
                };
            }
        };

        if objects.is_empty() {
            info!("{} listing is empty; recording placeholder entry", service);
            self.ledger
                .append(&MovementRecord::success(
                    service,
                    action.as_str(),
                    PLACEHOLDER_PATH,
                    Some(requested.to_string()),
                ))
                .await;
            return RunSummary::default();
        }

        let now = Utc::now();
        let mut summary = RunSummary::default();
        for object in &objects {
            if self.cancel.is_cancelled() {
                info!(
                    "{} sweep cancelled after {} attempted operations",
                    service, summary.total
                );
                break;
            }

            let raw_age = (now - object.last_modified).num_days();
            let (age_days, skew) = if raw_age < 0 {
                warn!(
                    "object `{}` is modified in the future ({}); treating as age 0",
                    object.key, object.last_modified
                );
                (0, true)
            } else {
                (raw_age as u64, false)
            };

            let decision = decide_action(action, requested, age_days, object.tier);
            let (outcome, tier_label) = match decision {
                Decision::NoOp => {
                    if skew {
                        // Data-quality note still reaches the ledger even
                        // when nothing was moved.
                        let record = MovementRecord::success(
                            service,
                            action.as_str(),
                            &object.key,
                            Some(requested.to_string()),
                        )
                        .with_note(SKEW_NOTE);
                        self.ledger.append(&record).await;
                    }
                    continue;
                }
                Decision::Retier(target) => (
                    self.adapter.retier(&object.key, target).await,
                    Some(target.to_string()),
                ),
                Decision::Delete => {
                    let label = match action {
                        // Exhaustive archive deletes objects past the
                        // maximum retention period.
                        Action::Archive => RetentionTier::Expired.to_string(),
                        _ => requested.to_string(),
                    };
                    (self.adapter.delete(&object.key).await, Some(label))
                }
            };

            summary.total += 1;
            match self
                .record_outcome(action.as_str(), &object.key, tier_label, outcome, skew)
                .await
            {
                Ok(()) => summary.succeeded += 1,
                Err(err) => {
                    summary.failed += 1;
                    summary.errors.push((object.key.clone(), err.to_string()));
                }
            }
        }

        info!(
            "{} sweep finished: {} attempted, {} succeeded, {} failed",
            service, summary.total, summary.succeeded, summary.failed
        );
        summary
    }

    /// Upload one local file and record the attempt.
    pub async fn upload_file(&self, local_path: &Path, key: &str) -> RunSummary {
        let service = self.adapter.service_name();
        info!("uploading {} as `{}` to {}", local_path.display(), key, service);

        let mut summary = RunSummary {
            total: 1,
            ..RunSummary::default()
        };
        let outcome = self.adapter.upload(local_path, key).await;
        match self.record_outcome("upload", key, None, outcome, false).await {
            Ok(()) => summary.succeeded += 1,
            Err(err) => {
                summary.failed += 1;
                summary.errors.push((key.to_string(), err.to_string()));
            }
        }
        summary
    }

    /// Ledger one attempted mutation and fold the result for the summary.
    async fn record_outcome(
        &self,
        action_name: &str,
        key: &str,
        tier: Option<String>,
        outcome: StoreResult<()>,
        skew: bool,
    ) -> Result<(), ArchivalError> {
        let service = self.adapter.service_name();
        match outcome {
            Ok(()) => {
                let mut record = MovementRecord::success(service, action_name, key, tier);
                if skew {
                    record = record.with_note(SKEW_NOTE);
                }
                self.ledger.append(&record).await;
                Ok(())
            }
            Err(source) => {
                let err = ArchivalError::ObjectOperation {
                    key: key.to_string(),
                    source,
                };
                warn!("{}", err);
                let mut record =
                    MovementRecord::failure(service, action_name, key, tier, err.to_string());
                if skew {
                    record = record.with_note(SKEW_NOTE);
                }
                self.ledger.append(&record).await;
                Err(err)
            }
        }
    }
}
