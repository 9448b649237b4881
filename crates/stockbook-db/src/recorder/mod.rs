//! # Recorders
//!
//! Multi-table writes that move stock. Each call is one transaction that
//! either lands completely or not at all.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  PurchaseRecorder              SaleRecorder                            │
//! │  ├── create  (+qty per row)    ├── create  (-qty at section location)  │
//! │  ├── update  (net delta)       ├── get / get_by_invoice                │
//! │  ├── delete  (-receipts)       └── list(SaleFilter)                    │
//! │  └── get / list                                                         │
//! │            │                              │                             │
//! │            └──────────┬───────────────────┘                             │
//! │                       ▼                                                 │
//! │       LockManager (ordered keys) ──► ledger::apply_delta                │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Locks are taken before the transaction begins and the first statement
//! of every transaction is a write.

pub mod purchase;
pub mod sale;
