//! # stockbook-db: Storage for Stockbook
//!
//! SQLite persistence for the catalog, the stock ledger, purchases and
//! sales, built on sqlx.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Stockbook Data Flow                              │
//! │                                                                         │
//! │  HTTP / admin handler (outside this workspace)                         │
//! │       │  parse_json::<NewSale>(body)                                    │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                   stockbook-db (THIS CRATE)                     │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────────┐   ┌────────────────┐   ┌───────────────┐   │   │
//! │  │   │   Database    │   │   Recorders    │   │ Repositories  │   │   │
//! │  │   │   (pool.rs)   │   │ purchase, sale │   │ product, loc, │   │   │
//! │  │   │               │   │       │        │   │ section, price│   │   │
//! │  │   │ SqlitePool    │◄──│       ▼        │   └───────────────┘   │   │
//! │  │   │ LockManager   │   │ StockLedger    │                       │   │
//! │  │   └───────────────┘   └────────────────┘   Migrations          │   │
//! │  │                                            (embedded)          │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  SQLite (WAL) at StockbookConfig.database.path                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Organization
//!
//! - [`config`] - TOML + environment configuration
//! - [`pool`] - Connection pool, `Database` handle
//! - [`locks`] - Ordered in-process row locks
//! - [`ledger`] - Per-(product, location) quantities
//! - [`recorder`] - Purchase and sale recording
//! - [`repository`] - Catalog tables
//! - [`migrations`] - Embedded schema migrations
//! - [`error`] - Database error types
//!
//! ## Usage
//!
//! ```rust,ignore
//! use stockbook_db::{Database, StockbookConfig};
//!
//! let config = StockbookConfig::load(None)?;
//! let db = Database::new(config.db_config()).await?;
//!
//! let sale = db.sales().create(&new_sale, "cashier-1").await?;
//! println!("{}", sale.sale.invoice_number);
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod config;
pub mod error;
pub mod ledger;
pub mod locks;
pub mod migrations;
pub mod pool;
pub mod recorder;
pub mod repository;

#[cfg(test)]
pub(crate) mod test_support;

// =============================================================================
// Re-exports
// =============================================================================

pub use config::StockbookConfig;
pub use error::{DbError, DbResult, ErrorKind};
pub use ledger::StockLedger;
pub use locks::{LockKey, LockManager, LockSet};
pub use pool::{Database, DbConfig};

pub use recorder::purchase::PurchaseRecorder;
pub use recorder::sale::SaleRecorder;
pub use repository::location::LocationRepository;
pub use repository::pricing::SectionPriceRepository;
pub use repository::product::ProductRepository;
pub use repository::section::SectionRepository;
