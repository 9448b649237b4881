//! # Repository Module
//!
//! Catalog tables: single-table reads and writes that never touch stock.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  db.products()   ProductRepository      create / update / soft+hard     │
//! │                                         delete, barcode lookup          │
//! │  db.locations()  LocationRepository     create / get / list             │
//! │  db.sections()   SectionRepository      channels, sections, location    │
//! │                                         binding, offline provisioning   │
//! │  db.prices()     SectionPriceRepository bulk_set / lookup               │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Stock quantities live in [`crate::ledger`]; purchases and sales in
//! [`crate::recorder`].

pub mod location;
pub mod pricing;
pub mod product;
pub mod section;
