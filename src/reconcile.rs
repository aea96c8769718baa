//! Identity reconciliation
//!
//! Matches the catalog snapshot against the tracked products. Identifier
//! matches are taken first for every product; only then are the remaining
//! products matched by name, so a product's own SKU can never be claimed by an
//! earlier product's name match. A catalog row is claimed by at most one
//! product, first in configured order.

use crate::types::{CatalogEntry, Product};
use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IdentityChange {
    /// First time the product was found; it had no identifier yet.
    Resolved { identifier: String },
    /// Same product (by name) now listed under a different identifier.
    IdentifierChanged { from: String, to: String },
    /// Same identifier, different display name.
    Renamed { from: String, to: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProductIdentityChanged {
    /// The operator's name for the product.
    pub watch: String,
    pub change: IdentityChange,
}

impl fmt::Display for ProductIdentityChanged {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.change {
            IdentityChange::Resolved { identifier } => {
                write!(f, "{} resolved to SKU {}", self.watch, identifier)
            }
            IdentityChange::IdentifierChanged { from, to } => {
                write!(f, "{} changed SKU {} -> {}", self.watch, from, to)
            }
            IdentityChange::Renamed { from, to } => {
                write!(f, "{} renamed '{}' -> '{}'", self.watch, from, to)
            }
        }
    }
}

/// A tracked product paired with its catalog row for this cycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Match {
    /// Index into the product list given to [`reconcile`].
    pub product_index: usize,
    pub entry: CatalogEntry,
    /// The product's identity changed in this cycle.
    pub drifted: bool,
}

#[derive(Debug, Clone, Default)]
pub struct Reconciliation {
    /// Updated mapping, same order and length as the input.
    pub products: Vec<Product>,
    pub changes: Vec<ProductIdentityChanged>,
    pub matches: Vec<Match>,
    /// Indices of products matched on neither axis: not currently listed.
    pub unlisted: Vec<usize>,
}

impl Reconciliation {
    pub fn has_drift(&self) -> bool {
        !self.changes.is_empty()
    }
}

pub fn reconcile(products: &[Product], entries: &[CatalogEntry]) -> Reconciliation {
    let mut updated = products.to_vec();
    let mut claimed = vec![false; entries.len()];
    let mut matched: Vec<Option<(usize, bool)>> = vec![None; products.len()];
    let mut changes = Vec::new();

    // Pass 1: identifier
    for (i, product) in products.iter().enumerate() {
        let Some(sku) = product.identifier.as_deref() else {
            continue;
        };
        let Some(pos) = entries
            .iter()
            .enumerate()
            .position(|(j, e)| !claimed[j] && e.identifier == sku)
        else {
            continue;
        };

        claimed[pos] = true;
        let entry = &entries[pos];
        let mut drifted = false;

        if entry.display_name != product.display_name {
            changes.push(ProductIdentityChanged {
                watch: product.watch.clone(),
                change: IdentityChange::Renamed {
                    from: product.display_name.clone(),
                    to: entry.display_name.clone(),
                },
            });
            updated[i].display_name = entry.display_name.clone();
            drifted = true;
        }

        matched[i] = Some((pos, drifted));
    }

    // Pass 2: name, for products without an identifier match
    for (i, product) in products.iter().enumerate() {
        if matched[i].is_some() {
            continue;
        }
        let Some(pos) = entries
            .iter()
            .enumerate()
            .position(|(j, e)| !claimed[j] && product.matches_name(&e.display_name))
        else {
            continue;
        };

        claimed[pos] = true;
        let entry = &entries[pos];

        let change = match &product.identifier {
            None => IdentityChange::Resolved {
                identifier: entry.identifier.clone(),
            },
            Some(old) => IdentityChange::IdentifierChanged {
                from: old.clone(),
                to: entry.identifier.clone(),
            },
        };
        changes.push(ProductIdentityChanged {
            watch: product.watch.clone(),
            change,
        });

        updated[i].identifier = Some(entry.identifier.clone());
        updated[i].display_name = entry.display_name.clone();
        matched[i] = Some((pos, true));
    }

    let mut matches = Vec::new();
    let mut unlisted = Vec::new();
    for (i, slot) in matched.into_iter().enumerate() {
        match slot {
            Some((pos, drifted)) => matches.push(Match {
                product_index: i,
                entry: entries[pos].clone(),
                drifted,
            }),
            None => unlisted.push(i),
        }
    }

    Reconciliation {
        products: updated,
        changes,
        matches,
        unlisted,
    }
}
