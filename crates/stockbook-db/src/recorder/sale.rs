//! # Sale Recorder
//!
//! Records a sale: header with a fresh invoice number, self-contained
//! lines, and one ledger deduction per resolved line at the section's
//! location.
//!
//! ## Recording Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  validate_sale ──► SalePlan (prices, totals, discount)                 │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  section lookup ── channel check ── resolve products (best effort)     │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  lock InvoiceSeries(section, date) + StockRow(p, section.location)     │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  BEGIN                                                                  │
//! │   1. bump invoice_sequences(section, date) ──► SNO250304 + 007         │
//! │   2. insert header                                                      │
//! │   3. insert lines (client snapshot, gaps filled from the product)      │
//! │   4. apply_delta(p, location, -qty) per resolved line                  │
//! │  COMMIT                                                                 │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! A line whose product id does not resolve is kept for the record with
//! `product_id = NULL` and deducts nothing.
//!
//! ## Invoice Counter
//! The first sale of a `(section, date)` seeds the counter from the sales
//! already on file for that pair, so a counter table added to an existing
//! database continues the sequence instead of restarting it.

use chrono::{NaiveDate, Utc};
use sqlx::{QueryBuilder, Sqlite, SqliteConnection, SqlitePool};
use std::collections::HashSet;
use std::sync::Arc;
use stockbook_core::invoice::format_invoice_number;
use stockbook_core::payload::{NewSale, SaleFilter};
use stockbook_core::validation::validate_sale;
use stockbook_core::{Sale, SaleDetail, SaleItem, StockPolicy, ValidationError};
use tracing::{debug, info};
use uuid::Uuid;

use crate::error::{DbError, DbResult};
use crate::ledger::apply_delta;
use crate::locks::{LockKey, LockManager};
use crate::repository::product::fetch_product;
use crate::repository::section::fetch_section;

const DEFAULT_LIST_LIMIT: u32 = 100;

const SALE_COLUMNS: &str = r#"
    id, channel_id, section_id, sale_datetime, sale_date, invoice_number,
    customer_name, customer_mobile, payment_mode, discount_cents, subtotal_cents,
    total_amount_cents, created_by, created_at
"#;

/// Records and reads sales.
#[derive(Debug, Clone)]
pub struct SaleRecorder {
    pool: SqlitePool,
    locks: Arc<LockManager>,
    policy: StockPolicy,
}

impl SaleRecorder {
    pub fn new(pool: SqlitePool, locks: Arc<LockManager>, policy: StockPolicy) -> Self {
        SaleRecorder {
            pool,
            locks,
            policy,
        }
    }

    /// Records a sale and deducts its stock.
    ///
    /// The invoice date and its sequence follow the UTC calendar date of
    /// `sale_datetime`, not the register's local date.
    ///
    /// ## Returns
    /// * `Ok(SaleDetail)` - with the assigned `invoice_number`
    /// * `Err(Validation)` - bad payload, or a section outside the channel
    /// * `Err(NotFound)` - unknown section
    /// * `Err(InsufficientStock)` - a line exceeds what its row holds; nothing
    ///   is written
    pub async fn create(&self, sale: &NewSale, created_by: &str) -> DbResult<SaleDetail> {
        let plan = validate_sale(sale)?;

        let sale_datetime = sale.sale_datetime.unwrap_or_else(Utc::now);
        let sale_date = sale_datetime.date_naive();

        let (section, resolved) = {
            let mut conn = self.pool.acquire().await?;

            let section = fetch_section(&mut conn, &sale.section_id)
                .await?
                .ok_or_else(|| DbError::not_found("Section", &sale.section_id))?;
            if section.channel_id != sale.channel_id {
                return Err(ValidationError::ChannelMismatch {
                    section_id: section.id.clone(),
                    channel_id: sale.channel_id.clone(),
                }
                .into());
            }

            let mut resolved = HashSet::new();
            for product_id in plan.lines.iter().filter_map(|l| l.product_id.as_deref()) {
                if fetch_product(&mut conn, product_id).await?.is_some() {
                    resolved.insert(product_id.to_string());
                }
            }
            (section, resolved)
        };

        let mut keys = vec![LockKey::InvoiceSeries {
            section_id: section.id.clone(),
            sale_date,
        }];
        keys.extend(
            resolved
                .iter()
                .map(|p| LockKey::stock_row(p.as_str(), section.location_id.as_str())),
        );
        let held = self.locks.acquire(keys).await;

        let mut tx = self.pool.begin().await?;

        let sequence = next_invoice_sequence(&mut tx, &section.id, sale_date).await?;
        let invoice_number = format_invoice_number(&section.name, sale_date, sequence);
        let sale_id = Uuid::new_v4().to_string();

        sqlx::query(
            r#"
            INSERT INTO sales (
                id, channel_id, section_id, sale_datetime, sale_date, invoice_number,
                customer_name, customer_mobile, payment_mode, discount_cents, subtotal_cents,
                total_amount_cents, created_by, created_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14)
            "#,
        )
        .bind(&sale_id)
        .bind(&section.channel_id)
        .bind(&section.id)
        .bind(sale_datetime)
        .bind(sale_date)
        .bind(&invoice_number)
        .bind(trimmed(&sale.customer_name))
        .bind(trimmed(&sale.customer_mobile))
        .bind(sale.payment_mode)
        .bind(plan.discount.cents())
        .bind(plan.subtotal.cents())
        .bind(plan.total_amount.cents())
        .bind(created_by)
        .bind(Utc::now())
        .execute(&mut *tx)
        .await?;

        let mut deductions: Vec<(String, i64)> = Vec::new();

        for (position, line) in plan.lines.iter().enumerate() {
            let product = match line.product_id.as_deref() {
                Some(id) if resolved.contains(id) => fetch_product(&mut tx, id).await?,
                _ => None,
            };
            let snapshot = product.as_ref().map(|p| p.snapshot());

            let product_name = line
                .product_name
                .clone()
                .or_else(|| snapshot.as_ref().map(|s| s.name.clone()))
                .ok_or_else(|| {
                    ValidationError::required(format!("items[{}].product_name", position))
                })?;
            let product_barcode = line
                .product_barcode
                .clone()
                .or_else(|| snapshot.as_ref().and_then(|s| s.barcode.clone()));
            let product_brand = line
                .product_brand
                .clone()
                .or_else(|| snapshot.as_ref().map(|s| s.brand.clone()))
                .unwrap_or_default();
            let product_variant = line
                .product_variant
                .clone()
                .or_else(|| snapshot.as_ref().map(|s| s.variant.clone()))
                .unwrap_or_default();
            let serial_number = line
                .serial_number
                .clone()
                .or_else(|| snapshot.as_ref().map(|s| s.serial_number.clone()))
                .unwrap_or_default();

            let product_id = product.as_ref().map(|p| p.id.clone());

            sqlx::query(
                r#"
                INSERT INTO sale_items (
                    id, sale_id, product_id, product_name, product_barcode, product_brand,
                    product_variant, serial_number, price_cents, quantity, total_cents,
                    location_id, position
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)
                "#,
            )
            .bind(Uuid::new_v4().to_string())
            .bind(&sale_id)
            .bind(&product_id)
            .bind(&product_name)
            .bind(&product_barcode)
            .bind(&product_brand)
            .bind(&product_variant)
            .bind(&serial_number)
            .bind(line.price.cents())
            .bind(line.quantity)
            .bind(line.total.cents())
            .bind(&section.location_id)
            .bind(position as i64)
            .execute(&mut *tx)
            .await?;

            match product_id {
                Some(id) => deductions.push((id, line.quantity)),
                None => debug!(sale_id = %sale_id, product_name = %product_name, "Unresolved line, no deduction"),
            }
        }

        for (product_id, quantity) in &deductions {
            let key = LockKey::stock_row(product_id.as_str(), section.location_id.as_str());
            if !held.holds(&key) {
                return Err(DbError::Internal(format!(
                    "stock row ({}, {}) modified without its lock",
                    product_id, section.location_id
                )));
            }
            apply_delta(&mut tx, self.policy, product_id, &section.location_id, -quantity).await?;
        }

        tx.commit().await?;
        drop(held);

        info!(
            sale_id = %sale_id,
            invoice_number = %invoice_number,
            section = %section.name,
            items = plan.lines.len(),
            total = %plan.total_amount,
            "Sale recorded"
        );

        self.get(&sale_id)
            .await?
            .ok_or_else(|| DbError::not_found("Sale", &sale_id))
    }

    /// Header and lines of one sale.
    pub async fn get(&self, sale_id: &str) -> DbResult<Option<SaleDetail>> {
        let sql = format!("SELECT {} FROM sales WHERE id = ?1", SALE_COLUMNS);
        let sale = sqlx::query_as::<_, Sale>(&sql)
            .bind(sale_id)
            .fetch_optional(&self.pool)
            .await?;

        match sale {
            Some(sale) => Ok(Some(self.with_items(sale).await?)),
            None => Ok(None),
        }
    }

    /// Looks a sale up by its printed invoice number.
    pub async fn get_by_invoice(&self, invoice_number: &str) -> DbResult<Option<SaleDetail>> {
        let sql = format!("SELECT {} FROM sales WHERE invoice_number = ?1", SALE_COLUMNS);
        let sale = sqlx::query_as::<_, Sale>(&sql)
            .bind(invoice_number)
            .fetch_optional(&self.pool)
            .await?;

        match sale {
            Some(sale) => Ok(Some(self.with_items(sale).await?)),
            None => Ok(None),
        }
    }

    /// Sale headers matching the filter, newest first.
    pub async fn list(&self, filter: &SaleFilter) -> DbResult<Vec<Sale>> {
        let mut query: QueryBuilder<Sqlite> =
            QueryBuilder::new(format!("SELECT {} FROM sales WHERE 1 = 1", SALE_COLUMNS));

        if let Some(channel_id) = &filter.channel_id {
            query.push(" AND channel_id = ").push_bind(channel_id);
        }
        if let Some(section_id) = &filter.section_id {
            query.push(" AND section_id = ").push_bind(section_id);
        }
        if let Some(from) = filter.from_date {
            query.push(" AND sale_date >= ").push_bind(from);
        }
        if let Some(to) = filter.to_date {
            query.push(" AND sale_date <= ").push_bind(to);
        }
        query
            .push(" ORDER BY sale_datetime DESC, invoice_number DESC LIMIT ")
            .push_bind(filter.limit.unwrap_or(DEFAULT_LIST_LIMIT));

        let sales = query.build_query_as::<Sale>().fetch_all(&self.pool).await?;
        Ok(sales)
    }

    async fn with_items(&self, sale: Sale) -> DbResult<SaleDetail> {
        let items = sqlx::query_as::<_, SaleItem>(
            r#"
            SELECT id, sale_id, product_id, product_name, product_barcode, product_brand,
                   product_variant, serial_number, price_cents, quantity, total_cents,
                   location_id, position
            FROM sale_items
            WHERE sale_id = ?1
            ORDER BY position
            "#,
        )
        .bind(&sale.id)
        .fetch_all(&self.pool)
        .await?;

        Ok(SaleDetail { sale, items })
    }
}

/// Claims the next invoice sequence for `(section, date)`.
///
/// Caller holds `LockKey::InvoiceSeries` for the pair and is inside the
/// transaction that will insert the sale.
async fn next_invoice_sequence(
    conn: &mut SqliteConnection,
    section_id: &str,
    sale_date: NaiveDate,
) -> DbResult<i64> {
    let sequence: i64 = sqlx::query_scalar(
        r#"
        INSERT INTO invoice_sequences (section_id, sale_date, last_value)
        VALUES (
            ?1, ?2,
            (SELECT COUNT(*) FROM sales WHERE section_id = ?1 AND sale_date = ?2) + 1
        )
        ON CONFLICT (section_id, sale_date) DO UPDATE SET
            last_value = last_value + 1
        RETURNING last_value
        "#,
    )
    .bind(section_id)
    .bind(sale_date)
    .fetch_one(&mut *conn)
    .await?;

    Ok(sequence)
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
    use crate::test_support::{
        dec, file_db, memory_db, memory_db_with, product, purchase_of, sale_of, section, stock,
    };
    use chrono::TimeZone;
    use stockbook_core::PaymentMode;

    #[tokio::test]
    async fn test_sale_deducts_from_section_location() {
        let db = memory_db().await;
        let p = product(&db, "Galaxy Buds", "10.00").await;
        let (snoonu, main) = section(&db, "Snoonu", "Main Store").await;
        db.purchases()
            .create(&purchase_of(&p.id, "10.00", &[(&main.id, 8)]), "admin")
            .await
            .unwrap();

        let detail = db
            .sales()
            .create(&sale_of(&snoonu, &p.id, "15.00", 4), "cashier")
            .await
            .unwrap();

        assert_eq!(db.ledger().get_quantity(&p.id, &main.id).await.unwrap(), 4);
        assert_eq!(detail.sale.total_amount_cents, 6000);
        assert_eq!(detail.sale.created_by, "cashier");
        assert_eq!(detail.items[0].location_id, main.id);
        assert_eq!(detail.items[0].product_name, "Galaxy Buds");
        assert_eq!(detail.items[0].product_barcode.as_deref(), Some(p.barcode.as_str()));

        let err = db
            .sales()
            .create(&sale_of(&snoonu, &p.id, "15.00", 5), "cashier")
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InsufficientStock);
        assert!(matches!(
            err,
            DbError::Core(stockbook_core::CoreError::InsufficientStock {
                available: 4,
                requested: 5,
                ..
            })
        ));

        // the failed sale left nothing behind
        assert_eq!(db.ledger().get_quantity(&p.id, &main.id).await.unwrap(), 4);
        let sales = db.sales().list(&SaleFilter::default()).await.unwrap();
        assert_eq!(sales.len(), 1);
    }

    #[tokio::test]
    async fn test_invoice_numbers_follow_section_and_date() {
        let db = memory_db().await;
        let p = product(&db, "Cable", "1.00").await;
        let (snoonu, main) = section(&db, "Snoonu", "Main Store").await;
        let (talabat, _) = section(&db, "Talabat", "Main Store").await;
        stock(&db, &p.id, &main.id, 50).await;

        let day = Utc.with_ymd_and_hms(2025, 3, 4, 10, 0, 0).unwrap();
        let next_day = Utc.with_ymd_and_hms(2025, 3, 5, 9, 0, 0).unwrap();

        let mut invoices = Vec::new();
        for (sec, at) in [(&snoonu, day), (&snoonu, day), (&talabat, day), (&snoonu, next_day)] {
            let mut sale = sale_of(sec, &p.id, "2.00", 1);
            sale.sale_datetime = Some(at);
            let detail = db.sales().create(&sale, "cashier").await.unwrap();
            invoices.push(detail.sale.invoice_number);
        }

        assert_eq!(
            invoices,
            vec!["SNO250304001", "SNO250304002", "TAL250304001", "SNO250305001"]
        );

        let found = db.sales().get_by_invoice("SNO250304002").await.unwrap().unwrap();
        assert_eq!(found.sale.sale_date, NaiveDate::from_ymd_opt(2025, 3, 4).unwrap());
    }

    #[tokio::test]
    async fn test_invoice_date_is_utc_calendar_date() {
        let db = memory_db().await;
        let p = product(&db, "Cable", "1.00").await;
        let (snoonu, main) = section(&db, "Snoonu", "Main Store").await;
        stock(&db, &p.id, &main.id, 5).await;

        // 01:30 on the 5th at UTC+3
        let late = Utc.with_ymd_and_hms(2025, 3, 4, 22, 30, 0).unwrap();
        let mut sale = sale_of(&snoonu, &p.id, "2.00", 1);
        sale.sale_datetime = Some(late);
        let detail = db.sales().create(&sale, "cashier").await.unwrap();

        assert_eq!(detail.sale.invoice_number, "SNO250304001");
        assert_eq!(detail.sale.sale_date, NaiveDate::from_ymd_opt(2025, 3, 4).unwrap());
    }

    #[tokio::test]
    async fn test_counter_continues_from_existing_sales() {
        let db = memory_db().await;
        let p = product(&db, "Cable", "1.00").await;
        let (snoonu, main) = section(&db, "Snoonu", "Main Store").await;
        stock(&db, &p.id, &main.id, 10).await;

        let day = Utc.with_ymd_and_hms(2025, 3, 4, 10, 0, 0).unwrap();
        for _ in 0..2 {
            let mut sale = sale_of(&snoonu, &p.id, "2.00", 1);
            sale.sale_datetime = Some(day);
            db.sales().create(&sale, "cashier").await.unwrap();
        }

        // a database whose counter rows were never written
        sqlx::query("DELETE FROM invoice_sequences")
            .execute(db.pool())
            .await
            .unwrap();

        let mut sale = sale_of(&snoonu, &p.id, "2.00", 1);
        sale.sale_datetime = Some(day);
        let detail = db.sales().create(&sale, "cashier").await.unwrap();
        assert_eq!(detail.sale.invoice_number, "SNO250304003");
    }

    #[tokio::test]
    async fn test_line_total_rounds_half_up() {
        let db = memory_db().await;
        let p = product(&db, "Cable", "1.00").await;
        let (snoonu, main) = section(&db, "Snoonu", "Main Store").await;
        stock(&db, &p.id, &main.id, 10).await;

        let mut sale = sale_of(&snoonu, &p.id, "0", 2);
        sale.items[0].price = dec("10.005");
        sale.items[0].total = dec("20.01");
        let detail = db.sales().create(&sale, "cashier").await.unwrap();

        assert_eq!(detail.items[0].price_cents, 1001);
        assert_eq!(detail.items[0].total_cents, 2001);
        assert_eq!(detail.sale.subtotal_cents, 2001);

        let mut wrong = sale_of(&snoonu, &p.id, "0", 2);
        wrong.items[0].price = dec("10.005");
        wrong.items[0].total = dec("20.02");
        let err = db.sales().create(&wrong, "cashier").await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);
        assert_eq!(db.ledger().get_quantity(&p.id, &main.id).await.unwrap(), 8);
    }

    #[tokio::test]
    async fn test_discount_is_taken_from_subtotal() {
        let db = memory_db().await;
        let p = product(&db, "Cable", "1.00").await;
        let (snoonu, main) = section(&db, "Snoonu", "Main Store").await;
        stock(&db, &p.id, &main.id, 10).await;

        let mut sale = sale_of(&snoonu, &p.id, "5.00", 2);
        sale.discount = dec("1.50");
        sale.payment_mode = PaymentMode::Online;
        let detail = db.sales().create(&sale, "cashier").await.unwrap();
        assert_eq!(detail.sale.subtotal_cents, 1000);
        assert_eq!(detail.sale.total_amount_cents, 850);
        assert_eq!(detail.sale.payment_mode, PaymentMode::Online);

        sale.discount = dec("10.01");
        let err = db.sales().create(&sale, "cashier").await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);
    }

    #[tokio::test]
    async fn test_section_outside_channel_is_rejected() {
        let db = memory_db().await;
        let p = product(&db, "Cable", "1.00").await;
        let (snoonu, main) = section(&db, "Snoonu", "Main Store").await;
        stock(&db, &p.id, &main.id, 10).await;
        let offline = db
            .sections()
            .get_channel_by_name("Offline")
            .await
            .unwrap()
            .unwrap();

        let mut sale = sale_of(&snoonu, &p.id, "2.00", 1);
        sale.channel_id = offline.id;
        let err = db.sales().create(&sale, "cashier").await.unwrap_err();

        assert_eq!(err.kind(), ErrorKind::Validation);
        assert_eq!(db.ledger().get_quantity(&p.id, &main.id).await.unwrap(), 10);
    }

    #[tokio::test]
    async fn test_unknown_section_is_not_found() {
        let db = memory_db().await;
        let p = product(&db, "Cable", "1.00").await;
        let (mut snoonu, _) = section(&db, "Snoonu", "Main Store").await;
        snoonu.id = "missing".to_string();

        let err = db
            .sales()
            .create(&sale_of(&snoonu, &p.id, "2.00", 1), "cashier")
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }

    #[tokio::test]
    async fn test_unresolved_line_is_kept_without_deduction() {
        let db = memory_db().await;
        let (snoonu, _) = section(&db, "Snoonu", "Main Store").await;

        let mut sale = sale_of(&snoonu, "gone", "3.00", 2);
        sale.items[0].product_name = Some("Old Charger".to_string());
        let detail = db.sales().create(&sale, "cashier").await.unwrap();

        assert!(detail.items[0].product_id.is_none());
        assert_eq!(detail.items[0].product_name, "Old Charger");

        // no name to fall back on
        let err = db
            .sales()
            .create(&sale_of(&snoonu, "gone", "3.00", 2), "cashier")
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);
    }

    #[tokio::test]
    async fn test_client_snapshot_wins_over_product() {
        let db = memory_db().await;
        let p = product(&db, "Galaxy Buds", "1.00").await;
        let (snoonu, main) = section(&db, "Snoonu", "Main Store").await;
        stock(&db, &p.id, &main.id, 3).await;

        let mut sale = sale_of(&snoonu, &p.id, "2.00", 1);
        sale.items[0].product_name = Some("Buds (open box)".to_string());
        sale.items[0].serial_number = Some("SN-0042".to_string());
        let detail = db.sales().create(&sale, "cashier").await.unwrap();

        assert_eq!(detail.items[0].product_name, "Buds (open box)");
        assert_eq!(detail.items[0].serial_number, "SN-0042");
        assert_eq!(detail.items[0].product_id.as_deref(), Some(p.id.as_str()));
    }

    #[tokio::test]
    async fn test_list_filters() {
        let db = memory_db().await;
        let p = product(&db, "Cable", "1.00").await;
        let (snoonu, main) = section(&db, "Snoonu", "Main Store").await;
        let (talabat, _) = section(&db, "Talabat", "Main Store").await;
        stock(&db, &p.id, &main.id, 10).await;

        let day = Utc.with_ymd_and_hms(2025, 3, 4, 10, 0, 0).unwrap();
        let later = Utc.with_ymd_and_hms(2025, 3, 9, 10, 0, 0).unwrap();
        for (sec, at) in [(&snoonu, day), (&talabat, day), (&snoonu, later)] {
            let mut sale = sale_of(sec, &p.id, "2.00", 1);
            sale.sale_datetime = Some(at);
            db.sales().create(&sale, "cashier").await.unwrap();
        }

        let by_section = db
            .sales()
            .list(&SaleFilter {
                section_id: Some(snoonu.id.clone()),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(by_section.len(), 2);
        assert_eq!(by_section[0].invoice_number, "SNO250309001");

        let early = db
            .sales()
            .list(&SaleFilter {
                to_date: NaiveDate::from_ymd_opt(2025, 3, 5),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(early.len(), 2);

        let limited = db
            .sales()
            .list(&SaleFilter {
                limit: Some(1),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(limited.len(), 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_sales_never_oversell() {
        let temp = file_db().await;
        let db = temp.db.clone();
        let p = product(&db, "Cable", "1.00").await;
        let (snoonu, main) = section(&db, "Snoonu", "Main Store").await;
        stock(&db, &p.id, &main.id, 5).await;

        let mut handles = Vec::new();
        for _ in 0..2 {
            let db = db.clone();
            let sale = sale_of(&snoonu, &p.id, "2.00", 3);
            handles.push(tokio::spawn(async move { db.sales().create(&sale, "cashier").await }));
        }

        let mut ok = 0;
        let mut short = 0;
        for handle in handles {
            match handle.await.unwrap() {
                Ok(_) => ok += 1,
                Err(e) => {
                    assert_eq!(e.kind(), ErrorKind::InsufficientStock);
                    short += 1;
                }
            }
        }

        assert_eq!((ok, short), (1, 1));
        assert_eq!(db.ledger().get_quantity(&p.id, &main.id).await.unwrap(), 2);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_sales_get_distinct_invoices() {
        let temp = file_db().await;
        let db = temp.db.clone();
        let p = product(&db, "Cable", "1.00").await;
        let (snoonu, main) = section(&db, "Snoonu", "Main Store").await;
        stock(&db, &p.id, &main.id, 100).await;

        let day = Utc.with_ymd_and_hms(2025, 3, 4, 10, 0, 0).unwrap();
        let mut handles = Vec::new();
        for _ in 0..10 {
            let db = db.clone();
            let mut sale = sale_of(&snoonu, &p.id, "2.00", 1);
            sale.sale_datetime = Some(day);
            handles.push(tokio::spawn(async move { db.sales().create(&sale, "cashier").await }));
        }

        let mut invoices = Vec::new();
        for handle in handles {
            invoices.push(handle.await.unwrap().unwrap().sale.invoice_number);
        }
        invoices.sort();

        let expected: Vec<String> = (1..=10).map(|n| format!("SNO250304{:03}", n)).collect();
        assert_eq!(invoices, expected);
        assert_eq!(db.ledger().get_quantity(&p.id, &main.id).await.unwrap(), 90);
    }

    #[tokio::test]
    async fn test_allow_negative_policy_records_oversell() {
        let db = memory_db_with(StockPolicy::AllowNegative).await;
        let p = product(&db, "Cable", "1.00").await;
        let (snoonu, main) = section(&db, "Snoonu", "Main Store").await;
        stock(&db, &p.id, &main.id, 1).await;

        db.sales()
            .create(&sale_of(&snoonu, &p.id, "2.00", 3), "cashier")
            .await
            .unwrap();
        assert_eq!(db.ledger().get_quantity(&p.id, &main.id).await.unwrap(), -2);
    }
}
