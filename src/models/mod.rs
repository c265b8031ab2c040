//! Core data models for the retention tiering engine.
//!
//! These entities describe objects as seen at listing time and the audit
//! records kept for every attempted lifecycle mutation. They serialize
//! naturally via `serde`; the ledger row format relies on it.

pub mod movement;
pub mod object;
