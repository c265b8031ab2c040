//! Run-level error taxonomy.
//!
//! Propagation policy: a credential failure aborts orchestrator
//! construction; a listing failure aborts the run after one ledger row; a
//! per-object failure is recovered and the sweep continues; a ledger write
//! failure only reaches the operational log. A single object can never stop
//! the sweep, and a failed audit write can never mask or block the backend
//! mutation it describes.

use thiserror::Error;

use crate::secrets::CredentialError;
use crate::store::StoreError;

#[derive(Debug, Error)]
pub enum ArchivalError {
    /// Fatal to orchestrator construction; never retried.
    #[error(transparent)]
    Credential(#[from] CredentialError),

    /// Fatal to the run; recorded once in the ledger.
    #[error("listing failed: {0}")]
    Listing(#[source] StoreError),

    /// Per-object; recovered, recorded, and the sweep continues.
    #[error("operation on `{key}` failed: {source}")]
    ObjectOperation {
        key: String,
        #[source]
        source: StoreError,
    },
}
