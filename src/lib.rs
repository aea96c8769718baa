//! skuwatch - retail stock monitor
//!
//! Polls a vendor catalog, keeps a persistent product identity mapping in step
//! with the vendor's SKU and naming drift, and notifies configured sinks when a
//! tracked product comes back into stock.

pub mod catalog;
pub mod config;
pub mod error;
pub mod monitor;
pub mod notify;
pub mod persistence;
pub mod reconcile;
pub mod status;
pub mod tracker;
pub mod types;

pub use catalog::{Catalog, CatalogClient, HttpCatalogClient};
pub use config::{CliArgs, Config};
pub use monitor::{Monitor, MonitorSettings};
pub use notify::{Alert, Dispatcher, NotificationSink};
pub use persistence::ProductStore;
pub use types::{CatalogEntry, NotificationEvent, Product};
