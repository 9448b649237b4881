//! # Section Price Repository
//!
//! Per-section price overrides: `(section, product) → price`.
//!
//! ## Bulk Set
//! ```text
//! bulk_set(Snoonu, [(P1, 12.00), (P2, 8.50)])
//!      │
//!      ├── validate every price first (nothing written on a bad one)
//!      │
//!      └── one atomic upsert per pair:
//!            INSERT .. ON CONFLICT (section_id, product_id)
//!            DO UPDATE SET price_cents = excluded.price_cents
//!            RETURNING id      ← our fresh id back means "created"
//! ```
//! Two concurrent bulk sets of the same pair never lose an update: the last
//! statement to run wins, and each pair is exactly one row.

use chrono::Utc;
use sqlx::SqlitePool;
use stockbook_core::payload::{BulkSetOutcome, ProductRef, SectionPriceInput};
use stockbook_core::validation::{non_negative_money, validate_barcode};
use stockbook_core::{Money, SectionProductPrice};
use tracing::{debug, info};
use uuid::Uuid;

use crate::error::{DbError, DbResult};

/// Repository for section price overrides.
#[derive(Debug, Clone)]
pub struct SectionPriceRepository {
    pool: SqlitePool,
}

impl SectionPriceRepository {
    pub fn new(pool: SqlitePool) -> Self {
        SectionPriceRepository { pool }
    }

    /// Creates or overwrites each `(section, product)` price.
    ///
    /// ## Returns
    /// * `Ok(BulkSetOutcome)` - how many rows were created vs updated
    /// * `Err(Validation)` - a negative or unparseable price (nothing written)
    /// * `Err(NotFound)` - unknown section, or a product that does not exist
    ///   (pairs before it are kept)
    pub async fn bulk_set(
        &self,
        section_id: &str,
        prices: &[SectionPriceInput],
    ) -> DbResult<BulkSetOutcome> {
        let exists: Option<i64> = sqlx::query_scalar("SELECT 1 FROM sales_sections WHERE id = ?1")
            .bind(section_id)
            .fetch_optional(&self.pool)
            .await?;
        if exists.is_none() {
            return Err(DbError::not_found("Section", section_id));
        }

        let mut validated: Vec<(&str, Money)> = Vec::with_capacity(prices.len());
        for (idx, input) in prices.iter().enumerate() {
            let price = non_negative_money(&format!("prices[{}].price", idx), input.price)?;
            validated.push((input.product_id.as_str(), price));
        }

        let mut outcome = BulkSetOutcome::default();
        for (product_id, price) in validated {
            let new_id = Uuid::new_v4().to_string();

            let row_id: String = sqlx::query_scalar(
                r#"
                INSERT INTO section_product_prices (id, section_id, product_id, price_cents, updated_at)
                VALUES (?1, ?2, ?3, ?4, ?5)
                ON CONFLICT (section_id, product_id) DO UPDATE SET
                    price_cents = excluded.price_cents,
                    updated_at = excluded.updated_at
                RETURNING id
                "#,
            )
            .bind(&new_id)
            .bind(section_id)
            .bind(product_id)
            .bind(price.cents())
            .bind(Utc::now())
            .fetch_one(&self.pool)
            .await
            .map_err(|e| match DbError::from(e) {
                DbError::ForeignKeyViolation { .. } => DbError::not_found("Product", product_id),
                other => other,
            })?;

            if row_id == new_id {
                outcome.created += 1;
            } else {
                outcome.updated += 1;
            }
            debug!(section_id, product_id, price = %price, "Section price set");
        }

        info!(
            section_id,
            created = outcome.created,
            updated = outcome.updated,
            "Section prices saved"
        );
        Ok(outcome)
    }

    /// Section price for a product given by id or barcode.
    ///
    /// ## Returns
    /// * `Err(NotFound)` - no product with that barcode, or no override for
    ///   the pair
    pub async fn lookup(
        &self,
        section_id: &str,
        product: &ProductRef,
    ) -> DbResult<SectionProductPrice> {
        let product_id = match product {
            ProductRef::Id(id) => id.clone(),
            ProductRef::Barcode(code) => {
                validate_barcode(code)?;
                let id: Option<String> =
                    sqlx::query_scalar("SELECT id FROM products WHERE barcode = ?1")
                        .bind(code)
                        .fetch_optional(&self.pool)
                        .await?;
                id.ok_or_else(|| DbError::not_found("Product", code))?
            }
        };

        let price = sqlx::query_as::<_, SectionProductPrice>(
            r#"
            SELECT id, section_id, product_id, price_cents, updated_at
            FROM section_product_prices
            WHERE section_id = ?1 AND product_id = ?2
            "#,
        )
        .bind(section_id)
        .bind(&product_id)
        .fetch_optional(&self.pool)
        .await?;

        price.ok_or_else(|| {
            DbError::not_found("SectionProductPrice", format!("{}/{}", section_id, product_id))
        })
    }

    /// Every override of one section.
    pub async fn list_for_section(&self, section_id: &str) -> DbResult<Vec<SectionProductPrice>> {
        let prices = sqlx::query_as::<_, SectionProductPrice>(
            r#"
            SELECT id, section_id, product_id, price_cents, updated_at
            FROM section_product_prices
            WHERE section_id = ?1
            ORDER BY product_id
            "#,
        )
        .bind(section_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(prices)
    }
}
