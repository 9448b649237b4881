//! # stockbook-core: Pure Domain Logic for Stockbook
//!
//! Types, money arithmetic and invariant checks for a stock ledger fed by
//! purchases and drained by sales. Nothing in this crate touches storage.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Stockbook Architecture                           │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │          Callers (admin purchase form, POS register)            │   │
//! │  │      JSON / multipart bodies ──► payload::parse_json            │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │             ★ stockbook-core (THIS CRATE) ★                     │   │
//! │  │                                                                 │   │
//! │  │   ┌─────────┐ ┌─────────┐ ┌────────────┐ ┌────────┐ ┌───────┐  │   │
//! │  │   │  types  │ │  money  │ │ validation │ │ ledger │ │invoice│  │   │
//! │  │   │ Product │ │  Money  │ │   plans    │ │ deltas │ │ SNO.. │  │   │
//! │  │   │  Sale   │ │quantize │ │   floors   │ │ policy │ │       │  │   │
//! │  │   └─────────┘ └─────────┘ └────────────┘ └────────┘ └───────┘  │   │
//! │  │                                                                 │   │
//! │  │   NO I/O • NO DATABASE • DETERMINISTIC                          │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │                  stockbook-db (Storage Layer)                   │   │
//! │  │      SQLite, migrations, row locks, catalogs, recorders         │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`types`] - Persisted entities (Product, Purchase, Sale, ...)
//! - [`money`] - Integer-cent `Money` and half-up `quantize`
//! - [`payload`] - Request bodies accepted by the recorders and catalogs
//! - [`validation`] - Invariant checks; turns payloads into write plans
//! - [`ledger`] - Net-delta computation and the stock policy check
//! - [`invoice`] - Invoice number formatting
//! - [`error`] - Domain error types
//!
//! ## Example Usage
//!
//! ```rust
//! use stockbook_core::payload::{parse_json, NewPurchase};
//! use stockbook_core::validation::validate_purchase;
//!
//! let body = r#"{
//!     "supplier_name": "Acme",
//!     "purchase_date": "2025-03-04",
//!     "discount": "10.00",
//!     "items": [{"product_id": "p1", "rate": "12.50",
//!                "locations": [{"location_id": "l1", "quantity": 5},
//!                              {"location_id": "l2", "quantity": 3}]}]
//! }"#;
//!
//! let purchase: NewPurchase = parse_json(body).unwrap();
//! let plan = validate_purchase(&purchase).unwrap();
//! assert_eq!(plan.total_amount.to_string(), "90.00");
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod invoice;
pub mod ledger;
pub mod money;
pub mod payload;
pub mod types;
pub mod validation;

// =============================================================================
// Re-exports for Convenience
// =============================================================================

pub use error::{CoreError, CoreResult, ValidationError};
pub use money::Money;
pub use types::*;

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// Recorded as `created_by` when the caller does not identify a user.
pub const SYSTEM_USER: &str = "system";
