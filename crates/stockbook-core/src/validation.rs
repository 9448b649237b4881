//! # Validation Module
//!
//! The shared invariant checks used by the recorders and the catalogs.
//!
//! ## Where Each Rule Runs
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Rule                        Product  Purchase  Sale   Section price   │
//! │  ──────────────────────────  ───────  ────────  ─────  ─────────────   │
//! │  pricing floor                  ✓      ✓ (rate                          │
//! │                                          sync)                          │
//! │  no duplicate location                  ✓                               │
//! │  item total = price × qty                         ✓                     │
//! │  barcode format                 ✓                          ✓ (lookup)   │
//! │  non-negative money             ✓      ✓         ✓         ✓            │
//! │  positive quantities                    ✓         ✓                     │
//! │                                                                         │
//! │  Non-negative stock lives in `ledger` (needs the current quantity).    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Payload validators return a *plan*: the same request with every decimal
//! converted to `Money` and derived totals computed, ready for a recorder to
//! write without further checks.

use rust_decimal::Decimal;
use std::collections::HashSet;

use crate::error::ValidationError;
use crate::money::{quantize, Money};
use crate::payload::{NewProduct, NewPurchase, NewSale, ProductUpdate};

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

/// Length of every product barcode.
pub const BARCODE_LEN: usize = 12;

/// Longest accepted display name.
pub const MAX_NAME_LEN: usize = 200;

const OUT_OF_RANGE: &str = "amount is out of range";

// =============================================================================
// Field Validators
// =============================================================================

/// Validates a required display name (product, location, section...).
pub fn validate_name(field: &str, name: &str) -> ValidationResult<()> {
    let name = name.trim();

    if name.is_empty() {
        return Err(ValidationError::required(field));
    }

    if name.chars().count() > MAX_NAME_LEN {
        return Err(ValidationError::TooLong {
            field: field.to_string(),
            max: MAX_NAME_LEN,
        });
    }

    Ok(())
}

/// Validates a barcode: exactly 12 characters, `A-Z` and `0-9`.
///
/// ## Example
/// ```rust
/// use stockbook_core::validation::validate_barcode;
///
/// assert!(validate_barcode("3F9A0C21B7DE").is_ok());
/// assert!(validate_barcode("3f9a0c21b7de").is_err());
/// assert!(validate_barcode("SHORT").is_err());
/// ```
pub fn validate_barcode(barcode: &str) -> ValidationResult<()> {
    if barcode.len() != BARCODE_LEN {
        return Err(ValidationError::invalid_format(
            "barcode",
            format!("must be exactly {} characters", BARCODE_LEN),
        ));
    }

    if !barcode
        .chars()
        .all(|c| c.is_ascii_uppercase() || c.is_ascii_digit())
    {
        return Err(ValidationError::invalid_format(
            "barcode",
            "must contain only uppercase letters and digits",
        ));
    }

    Ok(())
}

/// Generates a fresh barcode from a random UUID.
pub fn generate_barcode() -> String {
    uuid::Uuid::new_v4()
        .simple()
        .to_string()
        .chars()
        .take(BARCODE_LEN)
        .collect::<String>()
        .to_uppercase()
}

/// Converts a client amount to `Money`, rejecting negatives and overflow.
pub fn non_negative_money(field: &str, value: Decimal) -> ValidationResult<Money> {
    if value.is_sign_negative() && !value.is_zero() {
        return Err(ValidationError::MustNotBeNegative {
            field: field.to_string(),
        });
    }

    Money::from_decimal(value).ok_or_else(|| ValidationError::invalid_format(field, OUT_OF_RANGE))
}

/// Validates a line quantity (strictly positive).
pub fn validate_quantity(field: &str, qty: i64) -> ValidationResult<()> {
    if qty <= 0 {
        return Err(ValidationError::MustBePositive {
            field: field.to_string(),
        });
    }

    Ok(())
}

/// Pricing floor: `selling_price ≥ rate + minimum_profit` when a selling
/// price is set. The boundary is inclusive.
///
/// ## Example
/// ```rust
/// use stockbook_core::money::Money;
/// use stockbook_core::validation::validate_pricing_floor;
///
/// let rate = Money::from_cents(1000);
/// let profit = Money::from_cents(200);
///
/// assert!(validate_pricing_floor("selling_price", rate, profit, Some(Money::from_cents(1200))).is_ok());
/// assert!(validate_pricing_floor("selling_price", rate, profit, Some(Money::from_cents(1199))).is_err());
/// assert!(validate_pricing_floor("selling_price", rate, profit, None).is_ok());
/// ```
pub fn validate_pricing_floor(
    field: &str,
    rate: Money,
    minimum_profit: Money,
    selling_price: Option<Money>,
) -> ValidationResult<()> {
    let Some(selling_price) = selling_price else {
        return Ok(());
    };

    let floor = rate
        .checked_add(minimum_profit)
        .ok_or_else(|| ValidationError::invalid_format(field, OUT_OF_RANGE))?;
    if selling_price < floor {
        return Err(ValidationError::PricingFloor {
            field: field.to_string(),
            selling_price: selling_price.to_string(),
            floor: floor.to_string(),
        });
    }

    Ok(())
}

/// Rejects a location list that names the same location twice.
pub fn validate_unique_locations<'a>(
    field: &str,
    locations: impl IntoIterator<Item = &'a str>,
) -> ValidationResult<()> {
    let mut seen = HashSet::new();
    for location_id in locations {
        if !seen.insert(location_id) {
            return Err(ValidationError::DuplicateLocation {
                field: field.to_string(),
                location_id: location_id.to_string(),
            });
        }
    }

    Ok(())
}

/// Checks `quantize(price × quantity) == quantize(total)` on the raw
/// decimals and returns the stored `(price, total)` pair.
///
/// ## Example
/// ```rust
/// use rust_decimal::Decimal;
/// use stockbook_core::validation::validate_item_total;
///
/// let price = Decimal::new(10005, 3); // 10.005
/// assert!(validate_item_total("items[0]", price, 2, Decimal::new(2001, 2)).is_ok());
/// assert!(validate_item_total("items[0]", price, 2, Decimal::new(2002, 2)).is_err());
/// ```
pub fn validate_item_total(
    field: &str,
    price: Decimal,
    quantity: i64,
    total: Decimal,
) -> ValidationResult<(Money, Money)> {
    let expected = price
        .checked_mul(Decimal::from(quantity))
        .map(quantize)
        .ok_or_else(|| ValidationError::invalid_format(format!("{}.total", field), OUT_OF_RANGE))?;
    let supplied = quantize(total);

    if expected != supplied {
        return Err(ValidationError::ItemTotalMismatch {
            field: format!("{}.total", field),
            expected: expected.to_string(),
            supplied: supplied.to_string(),
        });
    }

    let price = non_negative_money(&format!("{}.price", field), price)?;
    let total = non_negative_money(&format!("{}.total", field), supplied)?;
    Ok((price, total))
}

fn checked_subtotal(amounts: impl Iterator<Item = Money>) -> ValidationResult<Money> {
    let mut subtotal = Money::zero();
    for amount in amounts {
        subtotal = subtotal
            .checked_add(amount)
            .ok_or_else(|| ValidationError::invalid_format("items", OUT_OF_RANGE))?;
    }
    Ok(subtotal)
}

/// Applies a discount, refusing one larger than the subtotal.
fn apply_discount(subtotal: Money, discount: Money) -> ValidationResult<Money> {
    if discount > subtotal {
        return Err(ValidationError::DiscountExceedsSubtotal {
            field: "discount".to_string(),
            discount: discount.to_string(),
            subtotal: subtotal.to_string(),
        });
    }

    Ok(subtotal - discount)
}

// =============================================================================
// Product Plans
// =============================================================================

/// Money fields of a product after validation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProductPricing {
    pub rate: Money,
    pub minimum_profit: Money,
    pub selling_price: Option<Money>,
}

fn validate_pricing(
    rate: Decimal,
    minimum_profit: Decimal,
    selling_price: Option<Decimal>,
) -> ValidationResult<ProductPricing> {
    let rate = non_negative_money("rate", rate)?;
    let minimum_profit = non_negative_money("minimum_profit", minimum_profit)?;
    let selling_price = selling_price
        .map(|p| non_negative_money("selling_price", p))
        .transpose()?;

    validate_pricing_floor("selling_price", rate, minimum_profit, selling_price)?;

    Ok(ProductPricing {
        rate,
        minimum_profit,
        selling_price,
    })
}

/// Validates a product creation request.
pub fn validate_new_product(product: &NewProduct) -> ValidationResult<ProductPricing> {
    validate_name("name", &product.name)?;

    if let Some(ref id) = product.id {
        if id.trim().is_empty() {
            return Err(ValidationError::required("id"));
        }
    }

    if let Some(ref barcode) = product.barcode {
        validate_barcode(barcode)?;
    }

    validate_pricing(product.rate, product.minimum_profit, product.selling_price)
}

/// Validates a product update request.
pub fn validate_product_update(update: &ProductUpdate) -> ValidationResult<ProductPricing> {
    validate_name("name", &update.name)?;
    validate_pricing(update.rate, update.minimum_profit, update.selling_price)
}

// =============================================================================
// Purchase Plans
// =============================================================================

/// A validated purchase line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PurchaseLinePlan {
    pub product_id: String,
    pub rate: Money,
    /// `(location_id, quantity)`, locations unique within the line.
    pub receipts: Vec<(String, i64)>,
    /// Σ receipt quantities.
    pub quantity: i64,
    /// `rate × quantity`.
    pub amount: Money,
}

/// A validated purchase with its derived total.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PurchasePlan {
    pub lines: Vec<PurchaseLinePlan>,
    pub discount: Money,
    pub subtotal: Money,
    /// `Σ(rate × Σ quantities) − discount`.
    pub total_amount: Money,
}

/// Validates a purchase request and computes its total.
pub fn validate_purchase(purchase: &NewPurchase) -> ValidationResult<PurchasePlan> {
    validate_name("supplier_name", &purchase.supplier_name)?;

    if purchase.items.is_empty() {
        return Err(ValidationError::required("items"));
    }

    let discount = non_negative_money("discount", purchase.discount)?;

    let mut lines = Vec::with_capacity(purchase.items.len());
    for (idx, item) in purchase.items.iter().enumerate() {
        let field = format!("items[{}]", idx);

        if item.product_id.trim().is_empty() {
            return Err(ValidationError::required(format!("{}.product_id", field)));
        }

        let rate = non_negative_money(&format!("{}.rate", field), item.rate)?;

        if item.locations.is_empty() {
            return Err(ValidationError::required(format!("{}.locations", field)));
        }

        validate_unique_locations(
            &format!("{}.locations", field),
            item.locations.iter().map(|l| l.location_id.as_str()),
        )?;

        let mut receipts = Vec::with_capacity(item.locations.len());
        for (loc_idx, loc) in item.locations.iter().enumerate() {
            if loc.location_id.trim().is_empty() {
                return Err(ValidationError::required(format!(
                    "{}.locations[{}].location_id",
                    field, loc_idx
                )));
            }
            validate_quantity(
                &format!("{}.locations[{}].quantity", field, loc_idx),
                loc.quantity,
            )?;
            receipts.push((loc.location_id.clone(), loc.quantity));
        }

        let quantity = receipts
            .iter()
            .try_fold(0i64, |acc, (_, q)| acc.checked_add(*q))
            .ok_or_else(|| {
                ValidationError::invalid_format(format!("{}.locations", field), OUT_OF_RANGE)
            })?;
        let amount = rate
            .checked_multiply_quantity(quantity)
            .ok_or_else(|| ValidationError::invalid_format(format!("{}.rate", field), OUT_OF_RANGE))?;

        lines.push(PurchaseLinePlan {
            product_id: item.product_id.clone(),
            rate,
            receipts,
            quantity,
            amount,
        });
    }

    let subtotal = checked_subtotal(lines.iter().map(|l| l.amount))?;
    let total_amount = apply_discount(subtotal, discount)?;

    Ok(PurchasePlan {
        lines,
        discount,
        subtotal,
        total_amount,
    })
}

// =============================================================================
// Sale Plans
// =============================================================================

/// A validated sale line. Snapshot fields are what the client sent; the
/// recorder fills gaps from the resolved product.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SaleLinePlan {
    pub product_id: Option<String>,
    pub product_name: Option<String>,
    pub product_barcode: Option<String>,
    pub product_brand: Option<String>,
    pub product_variant: Option<String>,
    pub serial_number: Option<String>,
    pub price: Money,
    pub quantity: i64,
    pub total: Money,
}

/// A validated sale with its derived totals.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SalePlan {
    pub lines: Vec<SaleLinePlan>,
    pub discount: Money,
    /// Σ line totals.
    pub subtotal: Money,
    /// `subtotal − discount`.
    pub total_amount: Money,
}

fn non_blank(value: &Option<String>) -> Option<String> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

/// Validates a sale request: shape, per-line arithmetic, discount.
pub fn validate_sale(sale: &NewSale) -> ValidationResult<SalePlan> {
    if sale.channel_id.trim().is_empty() {
        return Err(ValidationError::required("channel_id"));
    }
    if sale.section_id.trim().is_empty() {
        return Err(ValidationError::required("section_id"));
    }
    if sale.items.is_empty() {
        return Err(ValidationError::required("items"));
    }

    let discount = non_negative_money("discount", sale.discount)?;

    let mut lines = Vec::with_capacity(sale.items.len());
    for (idx, item) in sale.items.iter().enumerate() {
        let field = format!("items[{}]", idx);

        let product_id = non_blank(&item.product_id);
        let product_name = non_blank(&item.product_name);
        if product_id.is_none() && product_name.is_none() {
            return Err(ValidationError::required(format!("{}.product_name", field)));
        }

        validate_quantity(&format!("{}.quantity", field), item.quantity)?;
        let (price, total) = validate_item_total(&field, item.price, item.quantity, item.total)?;

        lines.push(SaleLinePlan {
            product_id,
            product_name,
            product_barcode: non_blank(&item.product_barcode),
            product_brand: non_blank(&item.product_brand),
            product_variant: non_blank(&item.product_variant),
            serial_number: non_blank(&item.serial_number),
            price,
            quantity: item.quantity,
            total,
        });
    }

    let subtotal = checked_subtotal(lines.iter().map(|l| l.total))?;
    let total_amount = apply_discount(subtotal, discount)?;

    Ok(SalePlan {
        lines,
        discount,
        subtotal,
        total_amount,
    })
}

// =============================================================================
// Unit Tests
// =============================================================================
