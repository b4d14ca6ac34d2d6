//! Core domain entities shared across the scheduling engine.

mod ooi;
mod organisation;
mod plugin;
mod task;

pub use ooi::{Ooi, ScanLevel, ScanProfile};
pub use organisation::Organisation;
pub use plugin::{Consumes, Plugin, PluginType};
pub use task::{BoefjeTask, DispatchTask, HasIdentity, NormalizerTask, RawDataRef};
