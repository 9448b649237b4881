//! # Domain Types
//!
//! Persisted entities of the stock ledger and the two transaction kinds.
//!
//! ## Type Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Domain Types                                    │
//! │                                                                         │
//! │  ┌──────────────┐    ┌──────────────┐    ┌──────────────────────┐      │
//! │  │   Product    │    │   Location   │    │     StockEntry       │      │
//! │  │  id, barcode │    │  id, name    │◄───│ (product, location)  │      │
//! │  │  rate_cents  │◄───┼──────────────┼────│  quantity            │      │
//! │  └──────────────┘    └──────▲───────┘    └──────────────────────┘      │
//! │                             │                                           │
//! │  ┌──────────────┐    ┌──────┴───────┐    ┌──────────────────────┐      │
//! │  │ SalesChannel │◄───│ SalesSection │◄───│ SectionProductPrice  │      │
//! │  └──────────────┘    │  location_id │    │  price_cents         │      │
//! │                      └──────────────┘    └──────────────────────┘      │
//! │                                                                         │
//! │  Purchase ─┬─► PurchaseItem (snapshot) ─┬─► PurchaseItemLocation       │
//! │            └─► ...                      └─► ...                        │
//! │                                                                         │
//! │  Sale ─────┬─► SaleItem (snapshot, location_id)                        │
//! │            └─► ...                                                      │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Snapshot Pattern
//! Purchase and sale lines copy the product's display fields at write time.
//! The copied columns stay valid after the product is edited or deleted; the
//! `product_id` on the line is then cleared by the database.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use ts_rs::TS;

use crate::error::ValidationError;
use crate::money::Money;

// =============================================================================
// Stock Policy
// =============================================================================

/// What the ledger does when an adjustment would leave a row below zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum StockPolicy {
    /// Reject with `InsufficientStock`; nothing is written.
    #[default]
    Enforce,
    /// Apply the adjustment and log a warning.
    AllowNegative,
}

impl StockPolicy {
    /// Returns true if negative results must be rejected.
    pub fn is_enforcing(&self) -> bool {
        matches!(self, StockPolicy::Enforce)
    }
}

impl fmt::Display for StockPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StockPolicy::Enforce => write!(f, "enforce"),
            StockPolicy::AllowNegative => write!(f, "allow_negative"),
        }
    }
}

impl FromStr for StockPolicy {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "enforce" | "strict" => Ok(StockPolicy::Enforce),
            "allow_negative" | "allow-negative" | "warn" => Ok(StockPolicy::AllowNegative),
            other => Err(ValidationError::invalid_format(
                "stock_policy",
                format!("unknown policy '{}', expected enforce or allow_negative", other),
            )),
        }
    }
}

// =============================================================================
// Product
// =============================================================================

/// A catalog product. Only the fields that take part in stock or money
/// calculations, plus the display fields copied into snapshots.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Product {
    /// Unique identifier (UUID v4 unless supplied by the client).
    pub id: String,

    /// 12-character uppercase alphanumeric code printed on labels.
    pub barcode: String,

    pub name: String,
    pub brand: String,
    pub serial_number: String,
    pub variant: String,

    /// Cost rate in cents.
    pub rate_cents: i64,

    /// Minimum margin over `rate` that `selling_price` must keep.
    pub minimum_profit_cents: i64,

    /// Optional list selling price in cents.
    pub selling_price_cents: Option<i64>,

    /// Soft-delete flag.
    pub active: bool,

    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,

    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

impl Product {
    #[inline]
    pub fn rate(&self) -> Money {
        Money::from_cents(self.rate_cents)
    }

    #[inline]
    pub fn minimum_profit(&self) -> Money {
        Money::from_cents(self.minimum_profit_cents)
    }

    #[inline]
    pub fn selling_price(&self) -> Option<Money> {
        self.selling_price_cents.map(Money::from_cents)
    }

    /// Copies the display fields for a purchase or sale line.
    pub fn snapshot(&self) -> ProductSnapshot {
        ProductSnapshot {
            name: self.name.clone(),
            barcode: Some(self.barcode.clone()),
            brand: self.brand.clone(),
            variant: self.variant.clone(),
            serial_number: self.serial_number.clone(),
        }
    }
}

/// Display fields frozen onto a transaction line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct ProductSnapshot {
    pub name: String,
    pub barcode: Option<String>,
    pub brand: String,
    pub variant: String,
    pub serial_number: String,
}

// =============================================================================
// Locations & Stock
// =============================================================================

/// A physical or logical stock point (store, warehouse).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Location {
    pub id: String,
    pub name: String,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

/// The ledger row: quantity of one product at one location.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct StockEntry {
    pub product_id: String,
    pub location_id: String,
    pub quantity: i64,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

/// One row of a product's per-location stock breakdown.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct StockLevel {
    pub location_id: String,
    pub location_name: String,
    pub quantity: i64,
}

// =============================================================================
// Purchases
// =============================================================================

/// Purchase header.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Purchase {
    pub id: String,
    pub supplier_name: String,
    /// The supplier's own invoice reference, if any.
    pub supplier_invoice_number: Option<String>,
    #[ts(as = "String")]
    pub purchase_date: NaiveDate,
    pub discount_cents: i64,
    /// Σ(rate × Σ location quantities) − discount.
    pub total_amount_cents: i64,
    pub created_by: String,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

impl Purchase {
    #[inline]
    pub fn total_amount(&self) -> Money {
        Money::from_cents(self.total_amount_cents)
    }
}

/// A purchase line with its product snapshot.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct PurchaseItem {
    pub id: String,
    pub purchase_id: String,
    /// Cleared if the product is later deleted.
    pub product_id: Option<String>,
    pub rate_cents: i64,
    pub product_name: String,
    pub product_barcode: Option<String>,
    pub product_brand: String,
    pub product_variant: String,
    pub serial_number: String,
    /// Order within the purchase.
    pub position: i64,
}

/// Quantity of one purchase line received at one location.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct PurchaseItemLocation {
    pub id: String,
    pub purchase_item_id: String,
    pub location_id: String,
    pub quantity: i64,
}

/// A purchase line together with its receipts.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct PurchaseItemDetail {
    pub item: PurchaseItem,
    pub locations: Vec<PurchaseItemLocation>,
}

impl PurchaseItemDetail {
    /// Total units received across all locations.
    pub fn total_quantity(&self) -> i64 {
        self.locations.iter().map(|l| l.quantity).sum()
    }
}

/// Header plus all lines, as returned to callers.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct PurchaseDetail {
    pub purchase: Purchase,
    pub items: Vec<PurchaseItemDetail>,
}

// =============================================================================
// Sales Channels, Sections, Prices
// =============================================================================

/// Top-level sales channel, e.g. "Online" or "Offline".
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct SalesChannel {
    pub id: String,
    pub name: String,
}

/// A channel subdivision bound to the location stock is deducted from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct SalesSection {
    pub id: String,
    pub channel_id: String,
    pub name: String,
    pub location_id: String,
}

/// Per-section price override for one product.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct SectionProductPrice {
    pub id: String,
    pub section_id: String,
    pub product_id: String,
    pub price_cents: i64,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

impl SectionProductPrice {
    #[inline]
    pub fn price(&self) -> Money {
        Money::from_cents(self.price_cents)
    }
}

// =============================================================================
// Sales
// =============================================================================

/// How a sale was paid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMode {
    #[default]
    #[serde(alias = "Cash")]
    Cash,
    #[serde(alias = "Credit")]
    Credit,
    /// Card gateways and other online payments.
    #[serde(alias = "Online")]
    Online,
}

/// Sale header.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Sale {
    pub id: String,
    pub channel_id: String,
    pub section_id: String,
    #[ts(as = "String")]
    pub sale_datetime: DateTime<Utc>,
    /// Calendar date the invoice sequence is counted on.
    #[ts(as = "String")]
    pub sale_date: NaiveDate,
    /// `<PFX><YYMMDD><NNN>`, unique.
    pub invoice_number: String,
    pub customer_name: Option<String>,
    pub customer_mobile: Option<String>,
    pub payment_mode: PaymentMode,
    pub discount_cents: i64,
    pub subtotal_cents: i64,
    pub total_amount_cents: i64,
    pub created_by: String,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

impl Sale {
    #[inline]
    pub fn total_amount(&self) -> Money {
        Money::from_cents(self.total_amount_cents)
    }
}

/// A sale line. Self-contained: readable without the product row.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct SaleItem {
    pub id: String,
    pub sale_id: String,
    pub product_id: Option<String>,
    pub product_name: String,
    pub product_barcode: Option<String>,
    pub product_brand: String,
    pub product_variant: String,
    pub serial_number: String,
    pub price_cents: i64,
    pub quantity: i64,
    pub total_cents: i64,
    /// Where the stock was taken from (the section's location at sale time).
    pub location_id: String,
    pub position: i64,
}

/// Header plus lines.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct SaleDetail {
    pub sale: Sale,
    pub items: Vec<SaleItem>,
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn product() -> Product {
        let now = Utc::now();
        Product {
            id: "p-1".to_string(),
            barcode: "ABCDEF123456".to_string(),
            name: "Galaxy Buds".to_string(),
            brand: "Samsung".to_string(),
            serial_number: "SN-1".to_string(),
            variant: "Black".to_string(),
            rate_cents: 1000,
            minimum_profit_cents: 200,
            selling_price_cents: Some(1500),
            active: true,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_stock_policy_parsing() {
        assert_eq!("enforce".parse::<StockPolicy>().unwrap(), StockPolicy::Enforce);
        assert_eq!(
            "Allow_Negative".parse::<StockPolicy>().unwrap(),
            StockPolicy::AllowNegative
        );
        assert!("sometimes".parse::<StockPolicy>().is_err());
        assert_eq!(StockPolicy::default(), StockPolicy::Enforce);
    }

    #[test]
    fn test_product_snapshot_copies_display_fields() {
        let snap = product().snapshot();
        assert_eq!(snap.name, "Galaxy Buds");
        assert_eq!(snap.barcode.as_deref(), Some("ABCDEF123456"));
        assert_eq!(snap.variant, "Black");
    }

    #[test]
    fn test_payment_mode_accepts_capitalised_names() {
        let mode: PaymentMode = serde_json::from_str("\"Credit\"").unwrap();
        assert_eq!(mode, PaymentMode::Credit);
        assert_eq!(serde_json::to_string(&PaymentMode::Online).unwrap(), "\"online\"");
    }
}
