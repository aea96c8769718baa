//! Vendor JSON wire format
//!
//! Listing endpoint:
//! `{"searchedProducts": {"productDetails": [{"productSKU": .., "displayName": ..}]}}`
//!
//! Inventory endpoint:
//! `{"listMap": [{"fe_sku": .., "is_active": "true", "price": .., "product_url": ..}]}`

use crate::error::CatalogError;
use serde::Deserialize;
use serde_json::Value;

/// SKU and name pair from the listing endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListedProduct {
    pub sku: String,
    pub name: String,
}

/// Availability row from the inventory endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InventoryRow {
    pub sku: String,
    pub in_stock: bool,
    pub price: String,
    pub url: String,
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(rename = "searchedProducts")]
    searched_products: SearchedProducts,
}

#[derive(Debug, Deserialize)]
struct SearchedProducts {
    #[serde(rename = "productDetails", default)]
    product_details: Vec<ProductDetail>,
}

#[derive(Debug, Deserialize)]
struct ProductDetail {
    #[serde(rename = "productSKU")]
    product_sku: Option<String>,
    #[serde(rename = "displayName")]
    display_name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct InventoryResponse {
    #[serde(rename = "listMap")]
    list_map: Vec<InventoryItem>,
}

#[derive(Debug, Deserialize)]
struct InventoryItem {
    fe_sku: Option<String>,
    #[serde(default)]
    is_active: Value,
    #[serde(default)]
    price: Value,
    product_url: Option<String>,
}

/// Parse a listing body. Rows missing a SKU or a name are skipped.
pub fn parse_listing(body: &[u8]) -> Result<Vec<ListedProduct>, CatalogError> {
    let response: SearchResponse = serde_json::from_slice(body)
        .map_err(|e| CatalogError::MalformedResponse(format!("product listing: {}", e)))?;

    Ok(response
        .searched_products
        .product_details
        .into_iter()
        .filter_map(|detail| match (detail.product_sku, detail.display_name) {
            (Some(sku), Some(name)) if !sku.is_empty() => Some(ListedProduct { sku, name }),
            _ => None,
        })
        .collect())
}

/// Parse an inventory body.
///
/// `fallback_url` is used for rows without a product URL.
pub fn parse_inventory(body: &[u8], fallback_url: &str) -> Result<Vec<InventoryRow>, CatalogError> {
    let response: InventoryResponse = serde_json::from_slice(body)
        .map_err(|e| CatalogError::MalformedResponse(format!("inventory: {}", e)))?;

    let mut rows = Vec::with_capacity(response.list_map.len());
    for item in response.list_map {
        let Some(sku) = item.fe_sku.filter(|s| !s.is_empty()) else {
            log::debug!("Skipping inventory row without fe_sku");
            continue;
        };

        rows.push(InventoryRow {
            sku,
            in_stock: flag(&item.is_active),
            price: price(&item.price),
            url: item
                .product_url
                .filter(|u| !u.is_empty())
                .unwrap_or_else(|| fallback_url.to_string()),
        });
    }

    Ok(rows)
}

/// The vendor sends `"true"`/`"false"` strings; plain booleans are accepted too.
fn flag(value: &Value) -> bool {
    match value {
        Value::Bool(b) => *b,
        Value::String(s) => s.eq_ignore_ascii_case("true"),
        _ => false,
    }
}

fn price(value: &Value) -> String {
    match value {
        Value::String(s) if !s.is_empty() => s.clone(),
        Value::Number(n) => n.to_string(),
        _ => "Unknown Price".to_string(),
    }
}
