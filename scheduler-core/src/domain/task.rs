//! Work units handed off to the external worker fabric.
//!
//! The source carries arbitrary task payloads typed at runtime; here each
//! scheduler flavour owns a concrete, statically-typed task struct and the
//! queue is generic over `T: HasIdentity` rather than a dynamically
//! dispatched payload.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::plugin::Plugin;

/// Derived identity used by the priority queue for dedup (I1/I5): stable
/// across re-fetches of the same logical object.
pub trait HasIdentity {
    fn identity(&self) -> String;
}

/// What the dispatcher needs to address a task at the remote worker fabric.
pub trait DispatchTask: HasIdentity {
    fn task_id(&self) -> &str;
    fn handler_name(&self) -> &'static str;
    fn queue_name(&self) -> &'static str;
}

/// The work unit for a boefje: run plugin `boefje` against `input_ooi`.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct BoefjeTask {
    pub id: String,
    pub boefje: Plugin,
    pub input_ooi: String,
    pub organization: String,
}

impl BoefjeTask {
    pub fn new(boefje: Plugin, input_ooi: impl Into<String>, organization: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4().simple().to_string(),
            boefje,
            input_ooi: input_ooi.into(),
            organization: organization.into(),
        }
    }
}

impl HasIdentity for BoefjeTask {
    /// Identity = (boefje.id, input_ooi, organization).
    fn identity(&self) -> String {
        format!("{}:{}:{}", self.boefje.id, self.input_ooi, self.organization)
    }
}

impl DispatchTask for BoefjeTask {
    fn task_id(&self) -> &str {
        &self.id
    }

    fn handler_name(&self) -> &'static str {
        "tasks.handle_boefje"
    }

    fn queue_name(&self) -> &'static str {
        "boefjes"
    }
}

/// A pointer to a raw-data blob plus the mime-types it was tagged with,
/// as reported by the raw-data-ready event.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RawDataRef {
    pub id: String,
    pub mime_types: Vec<String>,
}

/// The work unit for a normalizer: run plugin `normalizer` against `raw_data`.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct NormalizerTask {
    pub id: String,
    pub normalizer: Plugin,
    pub raw_data: RawDataRef,
    pub organization: String,
}

impl NormalizerTask {
    pub fn new(normalizer: Plugin, raw_data: RawDataRef, organization: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4().simple().to_string(),
            normalizer,
            raw_data,
            organization: organization.into(),
        }
    }
}

impl HasIdentity for NormalizerTask {
    /// Identity = (normalizer.id, raw_data.id).
    fn identity(&self) -> String {
        format!("{}:{}", self.normalizer.id, self.raw_data.id)
    }
}

impl DispatchTask for NormalizerTask {
    fn task_id(&self) -> &str {
        &self.id
    }

    fn handler_name(&self) -> &'static str {
        "tasks.handle_ooi"
    }

    fn queue_name(&self) -> &'static str {
        "normalizer"
    }
}
