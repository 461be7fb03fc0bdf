//! Core library for the `sanctl` storage management tool.
//!
//! The crate wraps a cloud provider's iSCSI storage ordering API behind a
//! typed [`StorageApi`] boundary and layers two thin components on top: an
//! order builder that selects price candidates out of the product catalog,
//! and a resource manager exposing the volume and snapshot operations the
//! CLI is built from.

pub mod api;
pub mod config;
pub mod manager;
pub mod order;
pub mod rest;
pub mod test_support;

pub use api::{
    ApiError, ApiFuture, BillingItem, Datacenter, ItemPrice, Partnership, PriceReference,
    StorageApi, StorageOrder, Volume,
};
pub use config::{ApiConfig, ConfigError};
pub use manager::{
    DEFAULT_CANCEL_REASON, DEFAULT_SNAPSHOT_NOTES, DEFAULT_VOLUME_MASK, ManagerError,
    SnapshotSummary, StorageManager,
};
pub use order::{OrderError, STORAGE_PACKAGE_ID};
pub use rest::RestClient;
