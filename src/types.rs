//! Core data model shared by every stage of a poll cycle

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A product the operator asked to watch.
///
/// `watch` is the name from the operator's configuration and never changes.
/// `identifier` (the vendor SKU) is filled in the first time the product is
/// found in the catalog; `display_name` follows the vendor's naming.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
    pub watch: String,
    pub identifier: Option<String>,
    pub display_name: String,
    pub locale: String,
}

impl Product {
    /// Unresolved product straight from configuration.
    pub fn new(watch: &str, locale: &str) -> Self {
        Self {
            watch: watch.to_string(),
            identifier: None,
            display_name: watch.to_string(),
            locale: locale.to_string(),
        }
    }

    /// Whether a vendor display name refers to this product.
    ///
    /// Exact (case-insensitive) match on the last known name, or the watched
    /// name contained in the vendor name.
    pub fn matches_name(&self, vendor_name: &str) -> bool {
        let vendor = vendor_name.to_lowercase();
        vendor == self.display_name.to_lowercase() || vendor.contains(&self.watch.to_lowercase())
    }

    /// Label used in logs and notifications.
    pub fn label(&self) -> String {
        match &self.identifier {
            Some(sku) => format!("{} ({})", self.display_name, sku),
            None => self.display_name.clone(),
        }
    }
}

/// One row of the catalog, rebuilt every poll and never persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogEntry {
    pub identifier: String,
    pub display_name: String,
    pub in_stock: bool,
    /// Price exactly as the vendor formats it for the locale.
    pub price: String,
    pub url: String,
}

/// A notify-worthy availability transition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotificationEvent {
    pub product: Product,
    pub in_stock: bool,
    pub price: String,
    pub url: String,
    pub timestamp: DateTime<Utc>,
}
