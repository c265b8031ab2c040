//! Retention policy: the pure decision engine.
//!
//! Maps object age to a retention tier and (age, current class, requested
//! action) to a concrete decision. No I/O, no clock reads — the caller
//! computes ages, the policy only classifies them.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::models::object::StorageTier;

/// Upper age bound (inclusive) of the real-time band, in days.
pub const REAL_TIME_MAX_AGE_DAYS: u64 = 90;
/// Upper age bound (inclusive) of the reference band, in days (4 years).
pub const REFERENCE_MAX_AGE_DAYS: u64 = 1460;
/// Upper age bound (inclusive) of the archival band, in days (10 years).
pub const ARCHIVAL_MAX_AGE_DAYS: u64 = 3650;

/// Named retention band derived from object age.
///
/// Exactly one tier applies to any age; boundaries are inclusive of the
/// lower (cheaper-to-access) tier, so age 90 is still `RealTime`.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum RetentionTier {
    RealTime,
    Reference,
    Archival,
    /// Past the maximum retention period; eligible for deletion.
    Expired,
}

impl RetentionTier {
    /// Storage class objects in this band should live in.
    ///
    /// `Expired` has no storage class — expired objects are deleted, not
    /// retiered.
    pub fn storage_tier(self) -> Option<StorageTier> {
        match self {
            RetentionTier::RealTime => Some(StorageTier::Hot),
            RetentionTier::Reference => Some(StorageTier::Cool),
            RetentionTier::Archival => Some(StorageTier::Cold),
            RetentionTier::Expired => None,
        }
    }
}

impl fmt::Display for RetentionTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            RetentionTier::RealTime => "real_time",
            RetentionTier::Reference => "reference",
            RetentionTier::Archival => "archival",
            RetentionTier::Expired => "expired",
        };
        write!(f, "{}", name)
    }
}

/// Lifecycle action a sweep runs under.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Action {
    /// Evaluate every object's age and move it to its band's storage class;
    /// delete objects past the maximum retention period.
    Archive,
    /// Bring every object back to hot storage regardless of age.
    Restore,
    /// Delete only objects whose age falls in the requested band.
    Delete,
}

impl Action {
    /// Name used in ledger rows and logs.
    pub fn as_str(self) -> &'static str {
        match self {
            Action::Archive => "archive",
            Action::Restore => "restore",
            Action::Delete => "delete",
        }
    }
}

/// What the orchestrator should do with one object.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Decision {
    /// Move the object to the storage class of the given band.
    Retier(RetentionTier),
    /// Remove the object from the backend.
    Delete,
    /// Leave the object alone; no backend call, no ledger row.
    NoOp,
}

/// Classify an age in days into its retention band.
///
/// Pure and total: every non-negative age maps to exactly one tier.
pub fn decide_tier(age_days: u64) -> RetentionTier {
    if age_days <= REAL_TIME_MAX_AGE_DAYS {
        RetentionTier::RealTime
    } else if age_days <= REFERENCE_MAX_AGE_DAYS {
        RetentionTier::Reference
    } else if age_days <= ARCHIVAL_MAX_AGE_DAYS {
        RetentionTier::Archival
    } else {
        RetentionTier::Expired
    }
}

/// Decide what to do with one object under the given action.
///
/// - `Archive` is exhaustive: it ignores `requested` and evaluates every
///   object. Expired objects are deleted; objects already sitting in their
///   band's storage class are left alone; everything else is retiered.
/// - `Restore` forces every object back to `RealTime` independent of age.
/// - `Delete` is tier-scoped: it deletes only objects whose age falls in the
///   `requested` band. Deleting with `requested = RealTime` removes only
///   objects at most 90 days old — this is selective deletion, not blanket
///   cleanup.
pub fn decide_action(
    action: Action,
    requested: RetentionTier,
    age_days: u64,
    current: StorageTier,
) -> Decision {
    match action {
        Action::Archive => {
            let computed = decide_tier(age_days);
            match computed.storage_tier() {
                None => Decision::Delete,
                Some(target) if target == current => Decision::NoOp,
                Some(_) => Decision::Retier(computed),
            }
        }
        Action::Restore => Decision::Retier(RetentionTier::RealTime),
        Action::Delete => {
            if decide_tier(age_days) == requested {
                Decision::Delete
            } else {
                Decision::NoOp
            }
        }
    }
}
