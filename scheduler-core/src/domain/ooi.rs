//! Objects Of Interest: entities under observation by the inventory service.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Per-OOI intrusiveness budget, gating which boefjes may run against it.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ScanLevel(pub u8);

impl ScanLevel {
    pub const MIN: ScanLevel = ScanLevel(0);
    pub const MAX: ScanLevel = ScanLevel(4);

    pub fn new(level: u8) -> Self {
        Self(level.min(4))
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ScanProfile {
    pub level: ScanLevel,
}

/// A discovered entity under observation, as reported by the inventory.
///
/// Treated as immutable per fetch: the scheduler never mutates an `Ooi`,
/// only re-fetches it.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Ooi {
    pub primary_key: String,
    pub ooi_type: String,
    pub scan_profile: ScanProfile,
    #[serde(default)]
    pub modified_at: Option<DateTime<Utc>>,
}

impl Ooi {
    /// Days since this OOI was last modified, clamped to non-negative.
    pub fn age_in_days(&self, now: DateTime<Utc>) -> i64 {
        match self.modified_at {
            Some(modified) => (now - modified).num_days().max(0),
            None => 0,
        }
    }
}
