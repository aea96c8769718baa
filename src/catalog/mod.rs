//! Catalog access
//!
//! [`Catalog`] wraps a [`CatalogClient`] with the slow-moving SKU listing cache
//! and turns listing + inventory into the per-poll [`CatalogEntry`] snapshot.

pub mod client;
pub mod wire;

pub use client::{CatalogClient, HttpCatalogClient};
pub use wire::{InventoryRow, ListedProduct};

use crate::error::CatalogError;
use crate::types::{CatalogEntry, Product};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;

pub struct Catalog {
    client: Arc<dyn CatalogClient>,
    refresh_interval: Duration,
    listing: Vec<ListedProduct>,
    listing_fetched_at: Option<Instant>,
}

impl Catalog {
    pub fn new(client: Arc<dyn CatalogClient>, refresh_interval: Duration) -> Self {
        Self {
            client,
            refresh_interval,
            listing: Vec::new(),
            listing_fetched_at: None,
        }
    }

    /// Cached listing from the last successful refresh.
    pub fn listing(&self) -> &[ListedProduct] {
        &self.listing
    }

    /// Refresh the listing if it has never been fetched or has expired.
    ///
    /// A failed refresh keeps the previous listing when there is one.
    pub async fn refresh_listing(&mut self, locale: &str) -> Result<(), CatalogError> {
        let due = match self.listing_fetched_at {
            None => true,
            Some(at) => at.elapsed() >= self.refresh_interval,
        };
        if !due {
            return Ok(());
        }

        log::info!("ℹ️  Refreshing product listing for {}...", locale);
        match self.client.fetch_listing(locale).await {
            Ok(listing) => {
                let names: Vec<String> = listing
                    .iter()
                    .map(|p| format!("{} ({})", p.name, p.sku))
                    .collect();
                log::info!("📋 Products listed by vendor: {}", names.join(", "));

                self.listing = listing;
                self.listing_fetched_at = Some(Instant::now());
                Ok(())
            }
            Err(e) if !self.listing.is_empty() => {
                log::warn!("⚠️  Listing refresh failed, keeping cached listing: {}", e);
                Ok(())
            }
            Err(e) => Err(e),
        }
    }

    /// Poll availability for everything relevant to `products`.
    ///
    /// Relevant SKUs are the listed SKUs matching a product by identifier or
    /// by name, so identity drift is visible to the reconciler. Products the
    /// listing no longer carries get no entry. Entries come back in listing
    /// order.
    pub async fn snapshot(
        &mut self,
        locale: &str,
        products: &[Product],
    ) -> Result<Vec<CatalogEntry>, CatalogError> {
        self.refresh_listing(locale).await?;

        let skus = relevant_skus(&self.listing, products);
        if skus.is_empty() {
            log::debug!("No listed SKU matches a tracked product");
            return Ok(Vec::new());
        }

        log::debug!("Checking stock for {} SKUs: {}", skus.len(), skus.join(","));
        let rows = self.client.fetch_inventory(locale, &skus).await?;
        Ok(build_entries(&skus, &self.listing, rows))
    }
}

/// Listed SKUs that a tracked product may own, by identifier or by name.
///
/// The listing decides what exists: a known identifier the vendor no longer
/// lists is not polled, so the product's replacement SKU can be matched by
/// name instead.
fn relevant_skus(listing: &[ListedProduct], products: &[Product]) -> Vec<String> {
    listing
        .iter()
        .filter(|listed| {
            products.iter().any(|p| {
                p.identifier.as_deref() == Some(listed.sku.as_str()) || p.matches_name(&listed.name)
            })
        })
        .map(|listed| listed.sku.clone())
        .collect()
}

/// Join inventory rows with listing names, ordered like `skus`.
///
/// Rows for SKUs that were not asked for are dropped.
fn build_entries(skus: &[String], listing: &[ListedProduct], rows: Vec<InventoryRow>) -> Vec<CatalogEntry> {
    let listed_names: HashMap<&str, &str> = listing
        .iter()
        .map(|l| (l.sku.as_str(), l.name.as_str()))
        .collect();

    let mut entries: Vec<CatalogEntry> = rows
        .into_iter()
        .filter_map(|row| {
            if !skus.contains(&row.sku) {
                log::debug!("Ignoring inventory row for unlisted SKU {}", row.sku);
                return None;
            }
            let display_name = listed_names.get(row.sku.as_str())?.to_string();

            Some(CatalogEntry {
                identifier: row.sku,
                display_name,
                in_stock: row.in_stock,
                price: row.price,
                url: row.url,
            })
        })
        .collect();

    entries.sort_by_key(|e| skus.iter().position(|s| *s == e.identifier).unwrap_or(usize::MAX));
    entries
}
