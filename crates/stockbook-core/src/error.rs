//! # Error Types
//!
//! Domain-specific error types for stockbook-core.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Error Types                                     │
//! │                                                                         │
//! │  stockbook-core errors (this file)                                     │
//! │  ├── CoreError        - Business rule failures (stock, missing product)│
//! │  └── ValidationError  - Malformed payloads, invariant violations       │
//! │                                                                         │
//! │  stockbook-db errors (separate crate)                                  │
//! │  └── DbError          - Storage failures + wraps CoreError             │
//! │                         DbError::kind() → ErrorKind for callers        │
//! │                                                                         │
//! │  Flow: ValidationError → CoreError → DbError → caller                  │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Design Principles
//! 1. Use `thiserror` for derive macros (not manual impl)
//! 2. Include context in error messages (field, item index, product, location)
//! 3. Errors are enum variants, never String

use thiserror::Error;

// =============================================================================
// Core Error
// =============================================================================

/// Core business logic errors.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Product cannot be found where one is required.
    #[error("Product not found: {0}")]
    ProductNotFound(String),

    /// A ledger row would go negative under the enforcing stock policy.
    ///
    /// ## User Workflow
    /// ```text
    /// Sale: 5 × product P through section "Snoonu" (→ Main Store)
    ///      │
    ///      ▼
    /// StockRow(P, Main Store): available = 3
    ///      │
    ///      ▼
    /// InsufficientStock { product_id: P, location_id: Main, available: 3, requested: 5 }
    ///      │
    ///      ▼
    /// Whole sale rolled back; header, items and other deductions discarded
    /// ```
    #[error(
        "Insufficient stock for product {product_id} at location {location_id}: available {available}, requested {requested}"
    )]
    InsufficientStock {
        product_id: String,
        location_id: String,
        available: i64,
        requested: i64,
    },

    /// Validation error (wraps ValidationError).
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),
}

// =============================================================================
// Validation Error
// =============================================================================

/// Input validation errors.
///
/// Raised before any write happens, or inside a transaction which is then
/// rolled back. Every variant names the offending field.
#[derive(Debug, Error)]
pub enum ValidationError {
    /// A required field is missing or empty.
    #[error("{field} is required")]
    Required { field: String },

    /// Field value is too long.
    #[error("{field} must be at most {max} characters")]
    TooLong { field: String, max: usize },

    /// Value must be positive.
    #[error("{field} must be positive")]
    MustBePositive { field: String },

    /// Value must not be negative.
    #[error("{field} must not be negative")]
    MustNotBeNegative { field: String },

    /// Invalid format (barcode, JSON item list, amount overflow).
    #[error("{field} has invalid format: {reason}")]
    InvalidFormat { field: String, reason: String },

    /// The same location appears twice within one location list.
    #[error("{field}: location {location_id} appears more than once")]
    DuplicateLocation { field: String, location_id: String },

    /// `quantize(price × quantity) != quantize(total)` on a sale line.
    #[error("{field}: total {supplied} does not equal price × quantity ({expected})")]
    ItemTotalMismatch {
        field: String,
        expected: String,
        supplied: String,
    },

    /// `selling_price < rate + minimum_profit`.
    #[error("{field}: selling price {selling_price} is below rate + minimum profit ({floor})")]
    PricingFloor {
        field: String,
        selling_price: String,
        floor: String,
    },

    /// The section does not belong to the channel on the sale header.
    #[error("section {section_id} does not belong to channel {channel_id}")]
    ChannelMismatch {
        section_id: String,
        channel_id: String,
    },

    /// Discount larger than the amount it is taken from.
    #[error("{field} {discount} exceeds subtotal {subtotal}")]
    DiscountExceedsSubtotal {
        field: String,
        discount: String,
        subtotal: String,
    },
}

impl ValidationError {
    /// Shorthand for `Required`.
    pub fn required(field: impl Into<String>) -> Self {
        ValidationError::Required {
            field: field.into(),
        }
    }

    /// Shorthand for `InvalidFormat`.
    pub fn invalid_format(field: impl Into<String>, reason: impl Into<String>) -> Self {
        ValidationError::InvalidFormat {
            field: field.into(),
            reason: reason.into(),
        }
    }

    /// The field path this error refers to, e.g. `items[2].total`.
    pub fn field(&self) -> &str {
        match self {
            ValidationError::Required { field }
            | ValidationError::TooLong { field, .. }
            | ValidationError::MustBePositive { field }
            | ValidationError::MustNotBeNegative { field }
            | ValidationError::InvalidFormat { field, .. }
            | ValidationError::DuplicateLocation { field, .. }
            | ValidationError::ItemTotalMismatch { field, .. }
            | ValidationError::PricingFloor { field, .. }
            | ValidationError::DiscountExceedsSubtotal { field, .. } => field,
            ValidationError::ChannelMismatch { .. } => "section",
        }
    }
}

// =============================================================================
// Result Type Alias
// =============================================================================

/// Convenience type alias for Results with CoreError.
pub type CoreResult<T> = Result<T, CoreError>;

// =============================================================================
// Unit Tests
// =============================================================================
