//! # Boundary Payloads
//!
//! Strongly-typed request bodies for the recorders and catalogs.
//!
//! ## Parsing Once at the Edge
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Admin form posts multipart data; `items` arrives as encoded text:      │
//! │                                                                         │
//! │    items = "[{\"product_id\":\"..\",\"rate\":\"12.50\", ...}]"          │
//! │                                                                         │
//! │  POS posts JSON; `items` arrives as a real array:                       │
//! │                                                                         │
//! │    "items": [{"product_id": "..", "rate": "12.50", ...}]                │
//! │                                                                         │
//! │  Both decode into Vec<NewPurchaseItem> here. Recorders never see the   │
//! │  loosely-typed form.                                                    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::de::{DeserializeOwned, Deserializer};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::error::ValidationError;
use crate::types::PaymentMode;

/// Accepts either a JSON array or a string holding a JSON array.
fn array_or_json_text<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum ArrayOrText {
        Text(String),
        Array(Vec<serde_json::Value>),
    }

    let values = match ArrayOrText::deserialize(deserializer)? {
        ArrayOrText::Text(text) => {
            serde_json::from_str::<Vec<serde_json::Value>>(&text).map_err(serde::de::Error::custom)?
        }
        ArrayOrText::Array(values) => values,
    };

    values
        .into_iter()
        .map(|v| serde_json::from_value(v).map_err(serde::de::Error::custom))
        .collect()
}

/// Parses a request body, reporting failures as a validation error on `body`.
pub fn parse_json<T: DeserializeOwned>(body: &str) -> Result<T, ValidationError> {
    serde_json::from_str(body).map_err(|e| ValidationError::invalid_format("body", e.to_string()))
}

// =============================================================================
// Catalog Payloads
// =============================================================================

/// Product creation request.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct NewProduct {
    /// Client-chosen id; generated when absent.
    #[serde(default)]
    pub id: Option<String>,
    /// Client-chosen barcode; generated when absent.
    #[serde(default)]
    pub barcode: Option<String>,
    #[serde(alias = "item_name")]
    pub name: String,
    #[serde(default)]
    pub brand: String,
    #[serde(default)]
    pub serial_number: String,
    #[serde(default, alias = "variants")]
    pub variant: String,
    #[ts(as = "String")]
    pub rate: Decimal,
    #[serde(default)]
    #[ts(as = "String")]
    pub minimum_profit: Decimal,
    #[serde(default)]
    #[ts(as = "Option<String>")]
    pub selling_price: Option<Decimal>,
    #[serde(default = "default_true")]
    pub active: bool,
}

/// Full replacement of a product's editable fields.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct ProductUpdate {
    #[serde(alias = "item_name")]
    pub name: String,
    #[serde(default)]
    pub brand: String,
    #[serde(default)]
    pub serial_number: String,
    #[serde(default, alias = "variants")]
    pub variant: String,
    #[ts(as = "String")]
    pub rate: Decimal,
    #[serde(default)]
    #[ts(as = "String")]
    pub minimum_profit: Decimal,
    #[serde(default)]
    #[ts(as = "Option<String>")]
    pub selling_price: Option<Decimal>,
    #[serde(default = "default_true")]
    pub active: bool,
}

fn default_true() -> bool {
    true
}

/// One `(product, price)` pair of a bulk price update.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct SectionPriceInput {
    #[serde(alias = "product")]
    pub product_id: String,
    #[ts(as = "String")]
    pub price: Decimal,
}

/// Outcome of `bulk_set`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct BulkSetOutcome {
    pub created: u64,
    pub updated: u64,
}

/// How a price lookup identifies the product.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum ProductRef {
    Id(String),
    Barcode(String),
}

// =============================================================================
// Purchase Payloads
// =============================================================================

/// Quantity received at one location.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct NewItemLocation {
    #[serde(alias = "location")]
    pub location_id: String,
    pub quantity: i64,
}

/// One purchase line.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct NewPurchaseItem {
    #[serde(alias = "product")]
    pub product_id: String,
    #[ts(as = "String")]
    pub rate: Decimal,
    #[serde(alias = "item_locations")]
    pub locations: Vec<NewItemLocation>,
}

/// Purchase create/update request. On update the item list replaces the
/// previous one.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct NewPurchase {
    pub supplier_name: String,
    #[serde(default, alias = "invoice_number")]
    pub supplier_invoice_number: Option<String>,
    #[ts(as = "String")]
    pub purchase_date: NaiveDate,
    #[serde(default)]
    #[ts(as = "String")]
    pub discount: Decimal,
    #[serde(deserialize_with = "array_or_json_text")]
    pub items: Vec<NewPurchaseItem>,
}

// =============================================================================
// Sale Payloads
// =============================================================================

/// One sale line as sent by the register.
///
/// Either `product_id` resolves to a catalog product, or `product_name`
/// carries enough to keep the line readable on its own.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct NewSaleItem {
    #[serde(default, alias = "product")]
    pub product_id: Option<String>,
    #[serde(default)]
    pub product_name: Option<String>,
    #[serde(default)]
    pub product_barcode: Option<String>,
    #[serde(default)]
    pub product_brand: Option<String>,
    #[serde(default)]
    pub product_variant: Option<String>,
    #[serde(default)]
    pub serial_number: Option<String>,
    #[ts(as = "String")]
    pub price: Decimal,
    pub quantity: i64,
    #[ts(as = "String")]
    pub total: Decimal,
}

/// Sale create request.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct NewSale {
    #[serde(alias = "channel")]
    pub channel_id: String,
    #[serde(alias = "section")]
    pub section_id: String,
    /// Defaults to the time of recording.
    #[serde(default)]
    #[ts(as = "Option<String>")]
    pub sale_datetime: Option<DateTime<Utc>>,
    #[serde(default)]
    pub customer_name: Option<String>,
    #[serde(default)]
    pub customer_mobile: Option<String>,
    #[serde(default)]
    pub payment_mode: PaymentMode,
    #[serde(default)]
    #[ts(as = "String")]
    pub discount: Decimal,
    #[serde(alias = "items_write", deserialize_with = "array_or_json_text")]
    pub items: Vec<NewSaleItem>,
}

/// Filters for listing sales.
#[derive(Debug, Clone, Default, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct SaleFilter {
    pub channel_id: Option<String>,
    pub section_id: Option<String>,
    /// Inclusive.
    #[ts(as = "Option<String>")]
    pub from_date: Option<NaiveDate>,
    /// Inclusive.
    #[ts(as = "Option<String>")]
    pub to_date: Option<NaiveDate>,
    pub limit: Option<u32>,
}

// =============================================================================
// Unit Tests
// =============================================================================
