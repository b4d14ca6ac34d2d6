//! Tenancy boundary: every scheduler, queue, and cache entry is scoped to one.

use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Organisation {
    pub id: String,
    pub name: String,
}

impl Organisation {
    /// Scheduler identity convention: `{kind}-{organisation_id}`.
    pub fn scheduler_id(&self, kind: &str) -> String {
        format!("{kind}-{}", self.id)
    }
}
