//! Adapters to the external collaborators: plugin catalogue, inventory,
//! raw-data store, and the remote worker broker.

mod broker;
mod cache;
mod catalogue;
mod error;
mod health;
mod http;
mod inventory;
mod rawdata;

pub use broker::{Broker, DispatchMessage, HttpBroker, RecordingBroker};
pub use cache::TtlCache;
pub use catalogue::CatalogueClient;
pub use error::{CacheLookup, ServiceError};
pub use http::{HttpClient, MockHttpClient, ReqwestClient};
pub use inventory::InventoryClient;
pub use rawdata::{BoefjeMeta, RawDataClient};
