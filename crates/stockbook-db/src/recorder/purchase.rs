//! # Purchase Recorder
//!
//! Records a purchase header, its lines and per-location receipts, and
//! raises the ledger by what was received. One transaction per call.
//!
//! ## Create / Update / Delete
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  validate_purchase(payload) ──► PurchasePlan (Money, totals)            │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  [update/delete] lock Purchase(id), read current receipts               │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  lock StockRow(p, l) for every old and new receipt (ordered)           │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  BEGIN                                                                  │
//! │   1. write header (insert, or update with the new total)               │
//! │   2. re-read current receipts inside the transaction                   │
//! │   3. drop old lines; insert new lines with product snapshots,          │
//! │      syncing product rate when the line rate differs                   │
//! │   4. net_deltas(old, new) ──► apply_delta per row, in key order        │
//! │  COMMIT                                                                 │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! An update only moves the difference: {(L1, 5)} → {(L1, 2)} is one
//! adjustment of -3 on (P, L1). Delete is the same walk with an empty
//! new set, followed by removing the header.

use chrono::Utc;
use sqlx::{SqliteConnection, SqlitePool};
use std::collections::HashMap;
use std::sync::Arc;
use stockbook_core::ledger::{net_deltas, StockKey};
use stockbook_core::payload::NewPurchase;
use stockbook_core::validation::{validate_purchase, PurchasePlan};
use stockbook_core::{
    CoreError, Purchase, PurchaseDetail, PurchaseItem, PurchaseItemDetail, PurchaseItemLocation,
    StockPolicy,
};
use tracing::{debug, info};
use uuid::Uuid;

use crate::error::{DbError, DbResult};
use crate::ledger::apply_delta;
use crate::locks::{LockKey, LockManager, LockSet};
use crate::repository::location::ensure_location;
use crate::repository::product::{fetch_product, sync_rate};

type Receipt = (String, String, i64);

/// Records purchases.
#[derive(Debug, Clone)]
pub struct PurchaseRecorder {
    pool: SqlitePool,
    locks: Arc<LockManager>,
    policy: StockPolicy,
}

impl PurchaseRecorder {
    pub fn new(pool: SqlitePool, locks: Arc<LockManager>, policy: StockPolicy) -> Self {
        PurchaseRecorder {
            pool,
            locks,
            policy,
        }
    }

    /// Records a new purchase.
    ///
    /// ## Returns
    /// * `Ok(PurchaseDetail)` - header with `total_amount`, lines, receipts
    /// * `Err(Validation)` - bad payload, or a rate that breaks a product's
    ///   pricing floor
    /// * `Err(NotFound)` - unknown product or location
    pub async fn create(&self, purchase: &NewPurchase, created_by: &str) -> DbResult<PurchaseDetail> {
        let plan = validate_purchase(purchase)?;
        let purchase_id = Uuid::new_v4().to_string();

        let held = self.locks.acquire(stock_keys(plan_receipts(&plan))).await;

        let mut tx = self.pool.begin().await?;
        let now = Utc::now();

        sqlx::query(
            r#"
            INSERT INTO purchases (
                id, supplier_name, supplier_invoice_number, purchase_date,
                discount_cents, total_amount_cents, created_by, created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
            "#,
        )
        .bind(&purchase_id)
        .bind(purchase.supplier_name.trim())
        .bind(trimmed(&purchase.supplier_invoice_number))
        .bind(purchase.purchase_date)
        .bind(plan.discount.cents())
        .bind(plan.total_amount.cents())
        .bind(created_by)
        .bind(now)
        .bind(now)
        .execute(&mut *tx)
        .await?;

        let new_receipts = insert_lines(&mut tx, &purchase_id, &plan).await?;
        self.apply_deltas(&mut tx, &held, net_deltas(Vec::new(), new_receipts))
            .await?;

        tx.commit().await?;
        drop(held);

        info!(
            purchase_id = %purchase_id,
            supplier = %purchase.supplier_name,
            items = plan.lines.len(),
            total = %plan.total_amount,
            "Purchase recorded"
        );

        self.require(&purchase_id).await
    }

    /// Replaces a purchase's header fields and item set.
    ///
    /// The ledger ends up exactly where it would be had the purchase been
    /// recorded with the new items from the start. Lowering a receipt below
    /// what has since been sold fails with `InsufficientStock` under the
    /// enforcing policy.
    pub async fn update(&self, purchase_id: &str, purchase: &NewPurchase) -> DbResult<PurchaseDetail> {
        let plan = validate_purchase(purchase)?;

        let mut held = self
            .locks
            .acquire([LockKey::Purchase(purchase_id.to_string())])
            .await;

        let old = {
            let mut conn = self.pool.acquire().await?;
            self.ensure_exists(&mut conn, purchase_id).await?;
            current_receipts(&mut conn, purchase_id).await?
        };
        let keys = stock_keys(old.iter().cloned().chain(plan_receipts(&plan)));
        held.extend(self.locks.acquire(keys).await);

        let mut tx = self.pool.begin().await?;

        let result = sqlx::query(
            r#"
            UPDATE purchases SET
                supplier_name = ?2,
                supplier_invoice_number = ?3,
                purchase_date = ?4,
                discount_cents = ?5,
                total_amount_cents = ?6,
                updated_at = ?7
            WHERE id = ?1
            "#,
        )
        .bind(purchase_id)
        .bind(purchase.supplier_name.trim())
        .bind(trimmed(&purchase.supplier_invoice_number))
        .bind(purchase.purchase_date)
        .bind(plan.discount.cents())
        .bind(plan.total_amount.cents())
        .bind(Utc::now())
        .execute(&mut *tx)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Purchase", purchase_id));
        }

        let old = current_receipts(&mut tx, purchase_id).await?;

        sqlx::query("DELETE FROM purchase_items WHERE purchase_id = ?1")
            .bind(purchase_id)
            .execute(&mut *tx)
            .await?;

        let new_receipts = insert_lines(&mut tx, purchase_id, &plan).await?;
        self.apply_deltas(&mut tx, &held, net_deltas(old, new_receipts))
            .await?;

        tx.commit().await?;
        drop(held);

        info!(
            purchase_id = %purchase_id,
            items = plan.lines.len(),
            total = %plan.total_amount,
            "Purchase updated"
        );

        self.require(purchase_id).await
    }

    /// Deletes a purchase and takes its receipts back out of the ledger.
    pub async fn delete(&self, purchase_id: &str) -> DbResult<()> {
        let mut held = self
            .locks
            .acquire([LockKey::Purchase(purchase_id.to_string())])
            .await;

        let old = {
            let mut conn = self.pool.acquire().await?;
            self.ensure_exists(&mut conn, purchase_id).await?;
            current_receipts(&mut conn, purchase_id).await?
        };
        held.extend(self.locks.acquire(stock_keys(old)).await);

        let mut tx = self.pool.begin().await?;

        // Claims the writer lock before the reads below.
        let touched = sqlx::query("UPDATE purchases SET updated_at = ?2 WHERE id = ?1")
            .bind(purchase_id)
            .bind(Utc::now())
            .execute(&mut *tx)
            .await?;
        if touched.rows_affected() == 0 {
            return Err(DbError::not_found("Purchase", purchase_id));
        }

        let old = current_receipts(&mut tx, purchase_id).await?;
        self.apply_deltas(&mut tx, &held, net_deltas(old, Vec::new()))
            .await?;

        sqlx::query("DELETE FROM purchases WHERE id = ?1")
            .bind(purchase_id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        info!(purchase_id = %purchase_id, "Purchase deleted");
        Ok(())
    }

    /// Header, lines and receipts of one purchase.
    pub async fn get(&self, purchase_id: &str) -> DbResult<Option<PurchaseDetail>> {
        let purchase = sqlx::query_as::<_, Purchase>(
            r#"
            SELECT id, supplier_name, supplier_invoice_number, purchase_date,
                   discount_cents, total_amount_cents, created_by, created_at, updated_at
            FROM purchases
            WHERE id = ?1
            "#,
        )
        .bind(purchase_id)
        .fetch_optional(&self.pool)
        .await?;

        let Some(purchase) = purchase else {
            return Ok(None);
        };

        let items = sqlx::query_as::<_, PurchaseItem>(
            r#"
            SELECT id, purchase_id, product_id, rate_cents, product_name, product_barcode,
                   product_brand, product_variant, serial_number, position
            FROM purchase_items
            WHERE purchase_id = ?1
            ORDER BY position
            "#,
        )
        .bind(purchase_id)
        .fetch_all(&self.pool)
        .await?;

        let receipts = sqlx::query_as::<_, PurchaseItemLocation>(
            r#"
            SELECT pil.id, pil.purchase_item_id, pil.location_id, pil.quantity
            FROM purchase_item_locations pil
            INNER JOIN purchase_items pi ON pi.id = pil.purchase_item_id
            WHERE pi.purchase_id = ?1
            ORDER BY pi.position, pil.rowid
            "#,
        )
        .bind(purchase_id)
        .fetch_all(&self.pool)
        .await?;

        let mut by_item: HashMap<String, Vec<PurchaseItemLocation>> = HashMap::new();
        for receipt in receipts {
            by_item
                .entry(receipt.purchase_item_id.clone())
                .or_default()
                .push(receipt);
        }

        let items = items
            .into_iter()
            .map(|item| {
                let locations = by_item.remove(&item.id).unwrap_or_default();
                PurchaseItemDetail { item, locations }
            })
            .collect();

        Ok(Some(PurchaseDetail { purchase, items }))
    }

    /// Purchase headers, newest first.
    pub async fn list(&self, limit: u32) -> DbResult<Vec<Purchase>> {
        let purchases = sqlx::query_as::<_, Purchase>(
            r#"
            SELECT id, supplier_name, supplier_invoice_number, purchase_date,
                   discount_cents, total_amount_cents, created_by, created_at, updated_at
            FROM purchases
            ORDER BY purchase_date DESC, created_at DESC
            LIMIT ?1
            "#,
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(purchases)
    }

    async fn require(&self, purchase_id: &str) -> DbResult<PurchaseDetail> {
        self.get(purchase_id)
            .await?
            .ok_or_else(|| DbError::not_found("Purchase", purchase_id))
    }

    async fn ensure_exists(&self, conn: &mut SqliteConnection, purchase_id: &str) -> DbResult<()> {
        let exists: Option<i64> = sqlx::query_scalar("SELECT 1 FROM purchases WHERE id = ?1")
            .bind(purchase_id)
            .fetch_optional(&mut *conn)
            .await?;

        exists
            .map(|_| ())
            .ok_or_else(|| DbError::not_found("Purchase", purchase_id))
    }

    /// Applies per-row deltas in key order. Every row must already be locked.
    async fn apply_deltas(
        &self,
        conn: &mut SqliteConnection,
        held: &LockSet,
        deltas: std::collections::BTreeMap<StockKey, i64>,
    ) -> DbResult<()> {
        for ((product_id, location_id), delta) in deltas {
            let key = LockKey::stock_row(product_id.as_str(), location_id.as_str());
            if !held.holds(&key) {
                return Err(DbError::Internal(format!(
                    "stock row ({}, {}) modified without its lock",
                    product_id, location_id
                )));
            }
            apply_delta(conn, self.policy, &product_id, &location_id, delta).await?;
        }
        Ok(())
    }
}

/// Inserts lines and receipts for a plan and returns the receipts.
async fn insert_lines(
    conn: &mut SqliteConnection,
    purchase_id: &str,
    plan: &PurchasePlan,
) -> DbResult<Vec<Receipt>> {
    let mut receipts = Vec::new();

    for (position, line) in plan.lines.iter().enumerate() {
        let field = format!("items[{}]", position);

        let product = fetch_product(conn, &line.product_id)
            .await?
            .ok_or_else(|| CoreError::ProductNotFound(line.product_id.clone()))?;

        // Later lines for the same product see the rate set by earlier ones.
        sync_rate(conn, &product, line.rate, &format!("{}.rate", field)).await?;

        let snapshot = product.snapshot();
        let item_id = Uuid::new_v4().to_string();

        sqlx::query(
            r#"
            INSERT INTO purchase_items (
                id, purchase_id, product_id, rate_cents, product_name, product_barcode,
                product_brand, product_variant, serial_number, position
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
            "#,
        )
        .bind(&item_id)
        .bind(purchase_id)
        .bind(&product.id)
        .bind(line.rate.cents())
        .bind(&snapshot.name)
        .bind(&snapshot.barcode)
        .bind(&snapshot.brand)
        .bind(&snapshot.variant)
        .bind(&snapshot.serial_number)
        .bind(position as i64)
        .execute(&mut *conn)
        .await?;

        for (location_id, quantity) in &line.receipts {
            ensure_location(conn, location_id).await?;

            sqlx::query(
                r#"
                INSERT INTO purchase_item_locations (id, purchase_item_id, location_id, quantity)
                VALUES (?1, ?2, ?3, ?4)
                "#,
            )
            .bind(Uuid::new_v4().to_string())
            .bind(&item_id)
            .bind(location_id)
            .bind(quantity)
            .execute(&mut *conn)
            .await?;

            receipts.push((product.id.clone(), location_id.clone(), *quantity));
        }

        debug!(purchase_id, product_id = %product.id, rate = %line.rate, "Purchase line written");
    }

    Ok(receipts)
}

/// Receipts currently on file for a purchase. Lines whose product has been
/// deleted are skipped: their ledger rows went with the product.
async fn current_receipts(conn: &mut SqliteConnection, purchase_id: &str) -> DbResult<Vec<Receipt>> {
    let rows: Vec<(String, String, i64)> = sqlx::query_as(
        r#"
        SELECT pi.product_id, pil.location_id, pil.quantity
        FROM purchase_item_locations pil
        INNER JOIN purchase_items pi ON pi.id = pil.purchase_item_id
        WHERE pi.purchase_id = ?1 AND pi.product_id IS NOT NULL
        "#,
    )
    .bind(purchase_id)
    .fetch_all(&mut *conn)
    .await?;

    Ok(rows)
}

fn plan_receipts(plan: &PurchasePlan) -> impl Iterator<Item = Receipt> + '_ {
    plan.lines.iter().flat_map(|line| {
        line.receipts
            .iter()
            .map(move |(location_id, qty)| (line.product_id.clone(), location_id.clone(), *qty))
    })
}

fn stock_keys<I>(receipts: I) -> Vec<LockKey>
where
    I: IntoIterator<Item = Receipt>,
{
    receipts
        .into_iter()
        .map(|(product_id, location_id, _)| LockKey::stock_row(product_id, location_id))
        .collect()
}

fn trimmed(value: &Option<String>) -> Option<String> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::test_support::{dec, location, memory_db, new_product, product, purchase_of, sale_of, section};
    use stockbook_core::payload::{NewItemLocation, NewPurchaseItem};

    #[tokio::test]
    async fn test_create_raises_each_location_and_totals() {
        let db = memory_db().await;
        let p = product(&db, "Galaxy Buds", "12.50").await;
        let l1 = location(&db, "Main Store").await;
        let l2 = location(&db, "Warehouse").await;

        let mut payload = purchase_of(&p.id, "12.50", &[(&l1.id, 5), (&l2.id, 3)]);
        payload.discount = dec("10.00");
        let detail = db.purchases().create(&payload, "admin").await.unwrap();

        assert_eq!(db.ledger().get_quantity(&p.id, &l1.id).await.unwrap(), 5);
        assert_eq!(db.ledger().get_quantity(&p.id, &l2.id).await.unwrap(), 3);
        // 12.50 × 8 − 10.00
        assert_eq!(detail.purchase.total_amount_cents, 9000);
        assert_eq!(detail.purchase.created_by, "admin");
        assert_eq!(detail.items.len(), 1);
        assert_eq!(detail.items[0].total_quantity(), 8);
        assert_eq!(detail.items[0].item.product_name, "Galaxy Buds");
        assert_eq!(detail.items[0].item.product_barcode.as_deref(), Some(p.barcode.as_str()));
    }

    #[tokio::test]
    async fn test_duplicate_location_in_item_is_rejected() {
        let db = memory_db().await;
        let p = product(&db, "Cable", "1.00").await;
        let l1 = location(&db, "Main Store").await;

        let payload = purchase_of(&p.id, "1.00", &[(&l1.id, 5), (&l1.id, 3)]);
        let err = db.purchases().create(&payload, "admin").await.unwrap_err();

        assert_eq!(err.kind(), ErrorKind::Validation);
        assert_eq!(db.ledger().get_quantity(&p.id, &l1.id).await.unwrap(), 0);
        assert!(db.purchases().list(10).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_rate_sync_last_line_wins() {
        let db = memory_db().await;
        let p = product(&db, "Cable", "1.00").await;
        let l1 = location(&db, "Main Store").await;

        let mut payload = purchase_of(&p.id, "1.50", &[(&l1.id, 1)]);
        payload.items.push(NewPurchaseItem {
            product_id: p.id.clone(),
            rate: dec("1.75"),
            locations: vec![NewItemLocation {
                location_id: l1.id.clone(),
                quantity: 2,
            }],
        });
        let detail = db.purchases().create(&payload, "admin").await.unwrap();

        let reloaded = db.products().get_by_id(&p.id).await.unwrap().unwrap();
        assert_eq!(reloaded.rate_cents, 175);
        assert_eq!(db.ledger().get_quantity(&p.id, &l1.id).await.unwrap(), 3);
        // 1.50 × 1 + 1.75 × 2
        assert_eq!(detail.purchase.total_amount_cents, 500);
    }

    #[tokio::test]
    async fn test_rate_breaking_floor_rolls_back_everything() {
        let db = memory_db().await;
        let mut new = new_product("Buds", "10.00");
        new.minimum_profit = dec("2.00");
        new.selling_price = Some(dec("12.00"));
        let p = db.products().create(&new).await.unwrap();
        let l1 = location(&db, "Main Store").await;

        let payload = purchase_of(&p.id, "10.01", &[(&l1.id, 4)]);
        let err = db.purchases().create(&payload, "admin").await.unwrap_err();

        assert_eq!(err.kind(), ErrorKind::Validation);
        assert_eq!(db.ledger().get_quantity(&p.id, &l1.id).await.unwrap(), 0);
        assert!(db.purchases().list(10).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_unknown_location_rolls_back() {
        let db = memory_db().await;
        let p = product(&db, "Cable", "1.00").await;
        let l1 = location(&db, "Main Store").await;

        let payload = purchase_of(&p.id, "1.00", &[(&l1.id, 5), ("nowhere", 1)]);
        let err = db.purchases().create(&payload, "admin").await.unwrap_err();

        assert_eq!(err.kind(), ErrorKind::NotFound);
        assert_eq!(db.ledger().get_quantity(&p.id, &l1.id).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_unknown_product_is_not_found() {
        let db = memory_db().await;
        let l1 = location(&db, "Main Store").await;

        let payload = purchase_of("missing", "1.00", &[(&l1.id, 5)]);
        let err = db.purchases().create(&payload, "admin").await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }

    #[tokio::test]
    async fn test_update_moves_only_the_difference() {
        let db = memory_db().await;
        let p = product(&db, "Cable", "2.00").await;
        let l1 = location(&db, "Main Store").await;

        // other stock on the same row, not from this purchase
        db.ledger().adjust(&p.id, &l1.id, 7).await.unwrap();

        let created = db
            .purchases()
            .create(&purchase_of(&p.id, "2.00", &[(&l1.id, 5)]), "admin")
            .await
            .unwrap();
        assert_eq!(db.ledger().get_quantity(&p.id, &l1.id).await.unwrap(), 12);

        let updated = db
            .purchases()
            .update(&created.purchase.id, &purchase_of(&p.id, "2.00", &[(&l1.id, 2)]))
            .await
            .unwrap();

        assert_eq!(db.ledger().get_quantity(&p.id, &l1.id).await.unwrap(), 9);
        assert_eq!(updated.purchase.total_amount_cents, 400);
        assert_eq!(updated.items[0].total_quantity(), 2);
        assert_eq!(updated.purchase.created_by, "admin");
    }

    #[tokio::test]
    async fn test_update_equals_fresh_recording() {
        let db = memory_db().await;
        let a = product(&db, "A", "1.00").await;
        let b = product(&db, "B", "1.00").await;
        let l1 = location(&db, "Main Store").await;
        let l2 = location(&db, "Warehouse").await;

        let created = db
            .purchases()
            .create(&purchase_of(&a.id, "1.00", &[(&l1.id, 4), (&l2.id, 6)]), "admin")
            .await
            .unwrap();

        // move A entirely to L2 and add B at L1
        let mut next = purchase_of(&a.id, "1.00", &[(&l2.id, 3)]);
        next.items.push(NewPurchaseItem {
            product_id: b.id.clone(),
            rate: dec("1.00"),
            locations: vec![NewItemLocation {
                location_id: l1.id.clone(),
                quantity: 9,
            }],
        });
        db.purchases().update(&created.purchase.id, &next).await.unwrap();

        let ledger = db.ledger();
        assert_eq!(ledger.get_quantity(&a.id, &l1.id).await.unwrap(), 0);
        assert_eq!(ledger.get_quantity(&a.id, &l2.id).await.unwrap(), 3);
        assert_eq!(ledger.get_quantity(&b.id, &l1.id).await.unwrap(), 9);
    }

    #[tokio::test]
    async fn test_update_below_sold_quantity_fails() {
        let db = memory_db().await;
        let p = product(&db, "Cable", "1.00").await;
        let (snoonu, main) = section(&db, "Snoonu", "Main Store").await;

        let created = db
            .purchases()
            .create(&purchase_of(&p.id, "1.00", &[(&main.id, 5)]), "admin")
            .await
            .unwrap();
        db.sales()
            .create(&sale_of(&snoonu, &p.id, "3.00", 4), "cashier")
            .await
            .unwrap();

        // receipt 5 → 2 needs -3, but only 1 is left
        let err = db
            .purchases()
            .update(&created.purchase.id, &purchase_of(&p.id, "1.00", &[(&main.id, 2)]))
            .await
            .unwrap_err();

        assert_eq!(err.kind(), ErrorKind::InsufficientStock);
        assert_eq!(db.ledger().get_quantity(&p.id, &main.id).await.unwrap(), 1);
        let unchanged = db.purchases().get(&created.purchase.id).await.unwrap().unwrap();
        assert_eq!(unchanged.items[0].total_quantity(), 5);
    }

    #[tokio::test]
    async fn test_delete_reverses_receipts() {
        let db = memory_db().await;
        let p = product(&db, "Cable", "1.00").await;
        let l1 = location(&db, "Main Store").await;
        db.ledger().adjust(&p.id, &l1.id, 2).await.unwrap();

        let created = db
            .purchases()
            .create(&purchase_of(&p.id, "1.00", &[(&l1.id, 5)]), "admin")
            .await
            .unwrap();
        db.purchases().delete(&created.purchase.id).await.unwrap();

        assert_eq!(db.ledger().get_quantity(&p.id, &l1.id).await.unwrap(), 2);
        assert!(db.purchases().get(&created.purchase.id).await.unwrap().is_none());

        let err = db.purchases().delete(&created.purchase.id).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }

    #[tokio::test]
    async fn test_snapshot_survives_product_delete() {
        let db = memory_db().await;
        let p = product(&db, "Galaxy Buds", "1.00").await;
        let l1 = location(&db, "Main Store").await;

        let created = db
            .purchases()
            .create(&purchase_of(&p.id, "1.00", &[(&l1.id, 5)]), "admin")
            .await
            .unwrap();
        db.products().hard_delete(&p.id).await.unwrap();

        let detail = db.purchases().get(&created.purchase.id).await.unwrap().unwrap();
        assert!(detail.items[0].item.product_id.is_none());
        assert_eq!(detail.items[0].item.product_name, "Galaxy Buds");

        // nothing left to reverse; the stock rows went with the product
        db.purchases().delete(&created.purchase.id).await.unwrap();
    }
}
