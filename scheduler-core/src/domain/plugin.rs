//! Plugin catalogue entities: boefjes and normalizers as seen by the scheduler.

use serde::{Deserialize, Serialize};

use super::ooi::ScanLevel;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PluginType {
    Boefje,
    Normalizer,
}

/// What a plugin consumes: a single OOI type for boefjes, or a set of
/// raw-data mime-types for normalizers. The catalogue serialises both
/// shapes under the same field, so this is untagged.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Consumes {
    OoiType(String),
    MimeTypes(Vec<String>),
}

impl Consumes {
    pub fn matches(&self, candidate: &str) -> bool {
        match self {
            Consumes::OoiType(ty) => ty == candidate,
            Consumes::MimeTypes(types) => types.iter().any(|t| t == candidate),
        }
    }
}

/// A capability descriptor owned by the catalogue service and cached
/// locally with a TTL.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Plugin {
    pub id: String,
    #[serde(rename = "type")]
    pub plugin_type: PluginType,
    pub enabled: bool,
    #[serde(default)]
    pub scan_level: ScanLevel,
    pub consumes: Consumes,
}
