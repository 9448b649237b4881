//! # Stock Ledger
//!
//! The `stock_entries` table: quantity of each product at each location.
//! Nothing else writes to it.
//!
//! ## One Adjustment
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  adjust(P, L, -3)                                                       │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  LockManager: StockRow(P, L)          (held until commit/rollback)     │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  INSERT (P, L, -3) ON CONFLICT DO UPDATE SET quantity = quantity - 3   │
//! │  RETURNING quantity                    (row created at 0 if missing)   │
//! │       │                                                                 │
//! │       ├── result ≥ 0            → keep                                  │
//! │       ├── < 0, allow_negative  → keep, warn!                           │
//! │       └── < 0, enforce         → InsufficientStock, transaction dropped │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Recorders call [`apply_delta`] on their own transaction after taking the
//! row locks; [`StockLedger::adjust`] wraps the same step for standalone use.

use chrono::Utc;
use sqlx::{SqliteConnection, SqlitePool};
use std::sync::Arc;
use stockbook_core::ledger::check_adjustment;
use stockbook_core::{StockEntry, StockLevel, StockPolicy};
use tracing::{debug, warn};

use crate::error::{DbError, DbResult};
use crate::locks::{LockKey, LockManager};
use crate::repository::location::ensure_location;
use crate::repository::product::fetch_product;

/// Adds `delta` to one ledger row inside the caller's transaction and
/// returns the new quantity.
///
/// The caller must hold `LockKey::StockRow(product_id, location_id)`.
pub(crate) async fn apply_delta(
    conn: &mut SqliteConnection,
    policy: StockPolicy,
    product_id: &str,
    location_id: &str,
    delta: i64,
) -> DbResult<i64> {
    let now = Utc::now();

    let new_quantity: i64 = sqlx::query_scalar(
        r#"
        INSERT INTO stock_entries (product_id, location_id, quantity, updated_at)
        VALUES (?1, ?2, ?3, ?4)
        ON CONFLICT (product_id, location_id) DO UPDATE SET
            quantity = quantity + excluded.quantity,
            updated_at = excluded.updated_at
        RETURNING quantity
        "#,
    )
    .bind(product_id)
    .bind(location_id)
    .bind(delta)
    .bind(now)
    .fetch_one(&mut *conn)
    .await?;

    let went_negative = check_adjustment(policy, product_id, location_id, new_quantity, delta)?;
    if went_negative {
        warn!(
            product_id = %product_id,
            location_id = %location_id,
            delta,
            new_quantity,
            "Stock row below zero (allow_negative policy)"
        );
    } else {
        debug!(product_id = %product_id, location_id = %location_id, delta, new_quantity, "Stock adjusted");
    }

    Ok(new_quantity)
}

/// Reads one row's quantity on the caller's connection; 0 when absent.
pub(crate) async fn quantity_on(
    conn: &mut SqliteConnection,
    product_id: &str,
    location_id: &str,
) -> DbResult<i64> {
    let quantity: Option<i64> = sqlx::query_scalar(
        "SELECT quantity FROM stock_entries WHERE product_id = ?1 AND location_id = ?2",
    )
    .bind(product_id)
    .bind(location_id)
    .fetch_optional(&mut *conn)
    .await?;

    Ok(quantity.unwrap_or(0))
}

/// Ledger access for callers outside the recorders.
#[derive(Debug, Clone)]
pub struct StockLedger {
    pool: SqlitePool,
    locks: Arc<LockManager>,
    policy: StockPolicy,
}

impl StockLedger {
    pub fn new(pool: SqlitePool, locks: Arc<LockManager>, policy: StockPolicy) -> Self {
        StockLedger {
            pool,
            locks,
            policy,
        }
    }

    /// Quantity of a product at a location, 0 if it never moved there.
    pub async fn get_quantity(&self, product_id: &str, location_id: &str) -> DbResult<i64> {
        let mut conn = self.pool.acquire().await?;
        quantity_on(&mut conn, product_id, location_id).await
    }

    /// Applies a signed adjustment in its own transaction and returns the
    /// new quantity.
    ///
    /// ## Errors
    /// - `InsufficientStock` when the result would be negative under the
    ///   enforcing policy (nothing is written)
    /// - `NotFound` for an unknown product or location
    pub async fn adjust(&self, product_id: &str, location_id: &str, delta: i64) -> DbResult<i64> {
        let _held = self
            .locks
            .acquire([LockKey::stock_row(product_id, location_id)])
            .await;

        {
            let mut conn = self.pool.acquire().await?;
            if fetch_product(&mut conn, product_id).await?.is_none() {
                return Err(DbError::not_found("Product", product_id));
            }
            ensure_location(&mut conn, location_id).await?;
        }

        let mut tx = self.pool.begin().await?;
        let new_quantity = apply_delta(&mut tx, self.policy, product_id, location_id, delta).await?;
        tx.commit().await?;

        Ok(new_quantity)
    }

    /// Per-location breakdown for one product, by location name.
    pub async fn levels_for_product(&self, product_id: &str) -> DbResult<Vec<StockLevel>> {
        let levels = sqlx::query_as::<_, StockLevel>(
            r#"
            SELECT s.location_id, l.name AS location_name, s.quantity
            FROM stock_entries s
            INNER JOIN locations l ON l.id = s.location_id
            WHERE s.product_id = ?1
            ORDER BY l.name
            "#,
        )
        .bind(product_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(levels)
    }

    /// Sum over all locations.
    pub async fn total_quantity(&self, product_id: &str) -> DbResult<i64> {
        let total: i64 = sqlx::query_scalar(
            "SELECT COALESCE(SUM(quantity), 0) FROM stock_entries WHERE product_id = ?1",
        )
        .bind(product_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(total)
    }

    /// All rows at one location.
    pub async fn entries_at_location(&self, location_id: &str) -> DbResult<Vec<StockEntry>> {
        let entries = sqlx::query_as::<_, StockEntry>(
            r#"
            SELECT product_id, location_id, quantity, updated_at
            FROM stock_entries
            WHERE location_id = ?1
            ORDER BY product_id
            "#,
        )
        .bind(location_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(entries)
    }
}
