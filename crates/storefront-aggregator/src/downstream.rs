//! Wire types of the three downstream services and their fallback answers.
//!
//! JSON field names are camelCase on the wire.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Placeholder image served when merchandise data is unavailable.
pub const PLACEHOLDER_IMAGE_URL: &str = "https://via.placeholder.com/300x300?text=No+Image";

/// Inventory quantity meaning "unknown, treat as backordered".
pub const BACKORDERED: i64 = -1;

/// Stock keeping unit: the product identifier every downstream call is keyed by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Sku(pub u64);

impl fmt::Display for Sku {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for Sku {
    fn from(sku: u64) -> Self {
        Sku(sku)
    }
}

/// `GET /merchandise/{sku}`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct MerchandiseRequest {
    pub sku: Sku,
}

/// `POST /price` with body `{"sku": ...}`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PriceRequest {
    pub sku: Sku,
}

/// `POST /inventory` with body `{"sku": ...}`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct InventoryRequest {
    pub sku: Sku,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MerchandiseResponse {
    pub name: String,
    pub description: String,
    pub image_url: String,
    pub category: String,
}

impl MerchandiseResponse {
    pub fn fallback() -> Self {
        Self {
            name: "Unknown Product".to_string(),
            description: "Description unavailable".to_string(),
            image_url: PLACEHOLDER_IMAGE_URL.to_string(),
            category: "Unknown".to_string(),
        }
    }
}

/// Prices are decimal strings, passed through untouched.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PriceResponse {
    pub price: String,
    pub original_price: String,
    pub currency: String,
}

impl PriceResponse {
    pub fn fallback() -> Self {
        Self {
            price: "0.00".to_string(),
            original_price: "0.00".to_string(),
            currency: "USD".to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InventoryResponse {
    pub available_quantity: i64,
}

impl InventoryResponse {
    pub fn fallback() -> Self {
        Self {
            available_quantity: BACKORDERED,
        }
    }

    pub fn is_backordered(&self) -> bool {
        self.available_quantity < 0
    }
}
