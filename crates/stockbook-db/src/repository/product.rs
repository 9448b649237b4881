//! # Product Repository
//!
//! The product catalog: rate and pricing inputs, display fields copied into
//! transaction snapshots, and the active flag.
//!
//! ## Who Writes What
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  create / update            ← catalog edits (pricing floor checked)    │
//! │  soft_delete / hard_delete  ← catalog edits                            │
//! │  rate only                  ← Purchase Recorder rate sync, inside its  │
//! │                               transaction (sync_rate below)            │
//! │                                                                         │
//! │  hard_delete:  stock_entries, section prices ── CASCADE                │
//! │                purchase_items, sale_items ─────── product_id SET NULL   │
//! │                (snapshot columns keep the line readable)               │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::Utc;
use sqlx::{SqliteConnection, SqlitePool};
use stockbook_core::payload::{NewProduct, ProductUpdate};
use stockbook_core::validation::{
    generate_barcode, validate_barcode, validate_new_product, validate_pricing_floor,
    validate_product_update,
};
use stockbook_core::{Money, Product};
use tracing::{debug, info};
use uuid::Uuid;

use crate::error::{DbError, DbResult};

const PRODUCT_COLUMNS: &str = r#"
    id, barcode, name, brand, serial_number, variant,
    rate_cents, minimum_profit_cents, selling_price_cents,
    active, created_at, updated_at
"#;

/// Repository for product database operations.
///
/// ## Usage
/// ```rust,ignore
/// let repo = db.products();
/// let product = repo.create(&new_product).await?;
/// let same = repo.get_by_barcode(&product.barcode).await?;
/// ```
#[derive(Debug, Clone)]
pub struct ProductRepository {
    pool: SqlitePool,
}

impl ProductRepository {
    /// Creates a new ProductRepository.
    pub fn new(pool: SqlitePool) -> Self {
        ProductRepository { pool }
    }

    /// Creates a product.
    ///
    /// The id and barcode are generated when the request leaves them out.
    ///
    /// ## Returns
    /// * `Err(Validation)` - bad name/barcode, pricing floor broken
    /// * `Err(UniqueViolation)` - id or barcode already taken
    pub async fn create(&self, new: &NewProduct) -> DbResult<Product> {
        let pricing = validate_new_product(new)?;

        let now = Utc::now();
        let product = Product {
            id: new.id.clone().unwrap_or_else(generate_product_id),
            barcode: new.barcode.clone().unwrap_or_else(generate_barcode),
            name: new.name.trim().to_string(),
            brand: new.brand.trim().to_string(),
            serial_number: new.serial_number.trim().to_string(),
            variant: new.variant.trim().to_string(),
            rate_cents: pricing.rate.cents(),
            minimum_profit_cents: pricing.minimum_profit.cents(),
            selling_price_cents: pricing.selling_price.map(|p| p.cents()),
            active: new.active,
            created_at: now,
            updated_at: now,
        };

        debug!(id = %product.id, barcode = %product.barcode, "Inserting product");

        sqlx::query(
            r#"
            INSERT INTO products (
                id, barcode, name, brand, serial_number, variant,
                rate_cents, minimum_profit_cents, selling_price_cents,
                active, created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)
            "#,
        )
        .bind(&product.id)
        .bind(&product.barcode)
        .bind(&product.name)
        .bind(&product.brand)
        .bind(&product.serial_number)
        .bind(&product.variant)
        .bind(product.rate_cents)
        .bind(product.minimum_profit_cents)
        .bind(product.selling_price_cents)
        .bind(product.active)
        .bind(product.created_at)
        .bind(product.updated_at)
        .execute(&self.pool)
        .await
        .map_err(|e| match DbError::from(e) {
            DbError::UniqueViolation { field, .. } if field.contains("barcode") => {
                DbError::duplicate("barcode", &product.barcode)
            }
            DbError::UniqueViolation { field, .. } if field.contains("id") => {
                DbError::duplicate("id", &product.id)
            }
            other => other,
        })?;

        info!(id = %product.id, name = %product.name, "Product created");
        Ok(product)
    }

    /// Gets a product by its ID.
    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Product>> {
        let mut conn = self.pool.acquire().await?;
        fetch_product(&mut conn, id).await
    }

    /// Gets a product by its 12-character barcode.
    pub async fn get_by_barcode(&self, barcode: &str) -> DbResult<Option<Product>> {
        validate_barcode(barcode)?;

        let sql = format!("SELECT {} FROM products WHERE barcode = ?1", PRODUCT_COLUMNS);
        let product = sqlx::query_as::<_, Product>(&sql)
            .bind(barcode)
            .fetch_optional(&self.pool)
            .await?;

        Ok(product)
    }

    /// Lists active products by name.
    pub async fn list_active(&self, limit: u32) -> DbResult<Vec<Product>> {
        let sql = format!(
            "SELECT {} FROM products WHERE active = 1 ORDER BY name, id LIMIT ?1",
            PRODUCT_COLUMNS
        );
        let products = sqlx::query_as::<_, Product>(&sql)
            .bind(limit)
            .fetch_all(&self.pool)
            .await?;

        Ok(products)
    }

    /// Replaces the editable fields of a product.
    pub async fn update(&self, id: &str, update: &ProductUpdate) -> DbResult<Product> {
        let pricing = validate_product_update(update)?;

        debug!(id = %id, "Updating product");

        let result = sqlx::query(
            r#"
            UPDATE products SET
                name = ?2,
                brand = ?3,
                serial_number = ?4,
                variant = ?5,
                rate_cents = ?6,
                minimum_profit_cents = ?7,
                selling_price_cents = ?8,
                active = ?9,
                updated_at = ?10
            WHERE id = ?1
            "#,
        )
        .bind(id)
        .bind(update.name.trim())
        .bind(update.brand.trim())
        .bind(update.serial_number.trim())
        .bind(update.variant.trim())
        .bind(pricing.rate.cents())
        .bind(pricing.minimum_profit.cents())
        .bind(pricing.selling_price.map(|p| p.cents()))
        .bind(update.active)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Product", id));
        }

        self.get_by_id(id)
            .await?
            .ok_or_else(|| DbError::not_found("Product", id))
    }

    /// Soft-deletes a product by setting active = false.
    ///
    /// The product keeps its stock rows and can still be bought and sold by
    /// id; it just drops out of `list_active`.
    pub async fn soft_delete(&self, id: &str) -> DbResult<()> {
        debug!(id = %id, "Soft-deleting product");

        let result = sqlx::query("UPDATE products SET active = 0, updated_at = ?2 WHERE id = ?1")
            .bind(id)
            .bind(Utc::now())
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Product", id));
        }

        Ok(())
    }

    /// Removes a product row. Ledger rows and section prices go with it;
    /// transaction lines keep their snapshots with `product_id` cleared.
    pub async fn hard_delete(&self, id: &str) -> DbResult<()> {
        debug!(id = %id, "Deleting product");

        let result = sqlx::query("DELETE FROM products WHERE id = ?1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Product", id));
        }

        info!(id = %id, "Product deleted");
        Ok(())
    }

    /// Counts active products (for diagnostics).
    pub async fn count(&self) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM products WHERE active = 1")
            .fetch_one(&self.pool)
            .await?;

        Ok(count)
    }
}

/// Loads a product on the caller's connection or transaction.
pub(crate) async fn fetch_product(
    conn: &mut SqliteConnection,
    id: &str,
) -> DbResult<Option<Product>> {
    let sql = format!("SELECT {} FROM products WHERE id = ?1", PRODUCT_COLUMNS);
    let product = sqlx::query_as::<_, Product>(&sql)
        .bind(id)
        .fetch_optional(&mut *conn)
        .await?;

    Ok(product)
}

/// Sets a product's rate from a transaction line, re-checking the pricing
/// floor against the product's current selling price and minimum profit.
///
/// No-op when the rate is unchanged.
pub(crate) async fn sync_rate(
    conn: &mut SqliteConnection,
    product: &Product,
    new_rate: Money,
    field: &str,
) -> DbResult<()> {
    if product.rate() == new_rate {
        return Ok(());
    }

    validate_pricing_floor(
        field,
        new_rate,
        product.minimum_profit(),
        product.selling_price(),
    )?;

    sqlx::query("UPDATE products SET rate_cents = ?2, updated_at = ?3 WHERE id = ?1")
        .bind(&product.id)
        .bind(new_rate.cents())
        .bind(Utc::now())
        .execute(&mut *conn)
        .await?;

    debug!(
        product_id = %product.id,
        old_rate = %product.rate(),
        new_rate = %new_rate,
        "Product rate synced"
    );
    Ok(())
}

/// Helper to generate a new product ID.
pub fn generate_product_id() -> String {
    Uuid::new_v4().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::test_support::{dec, location, memory_db, new_product};

    #[tokio::test]
    async fn test_create_generates_id_and_barcode() {
        let db = memory_db().await;
        let product = db.products().create(&new_product("Galaxy Buds", "10.00")).await.unwrap();

        assert!(!product.id.is_empty());
        assert!(validate_barcode(&product.barcode).is_ok());
        assert_eq!(product.rate_cents, 1000);

        let by_code = db.products().get_by_barcode(&product.barcode).await.unwrap().unwrap();
        assert_eq!(by_code.id, product.id);
    }

    #[tokio::test]
    async fn test_client_barcode_must_be_uppercase() {
        let db = memory_db().await;
        let mut new = new_product("Galaxy Buds", "10.00");
        new.barcode = Some("abcdef123456".to_string());

        let err = db.products().create(&new).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);
    }

    #[tokio::test]
    async fn test_duplicate_barcode_is_conflict() {
        let db = memory_db().await;
        let mut new = new_product("Galaxy Buds", "10.00");
        new.barcode = Some("ABCDEF123456".to_string());
        db.products().create(&new).await.unwrap();

        let err = db.products().create(&new).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Conflict);
    }

    #[tokio::test]
    async fn test_pricing_floor_boundary() {
        let db = memory_db().await;

        let mut at_floor = new_product("At Floor", "10.00");
        at_floor.minimum_profit = dec("2.50");
        at_floor.selling_price = Some(dec("12.50"));
        assert!(db.products().create(&at_floor).await.is_ok());

        let mut below = new_product("Below Floor", "10.00");
        below.minimum_profit = dec("2.50");
        below.selling_price = Some(dec("12.49"));
        let err = db.products().create(&below).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);
    }

    #[tokio::test]
    async fn test_update_rechecks_floor() {
        let db = memory_db().await;
        let product = db.products().create(&new_product("Buds", "10.00")).await.unwrap();

        let mut update = ProductUpdate {
            name: "Buds Pro".to_string(),
            brand: String::new(),
            serial_number: String::new(),
            variant: String::new(),
            rate: dec("10.00"),
            minimum_profit: dec("1.00"),
            selling_price: Some(dec("10.99")),
            active: true,
        };
        let err = db.products().update(&product.id, &update).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);

        update.selling_price = Some(dec("11.00"));
        let updated = db.products().update(&product.id, &update).await.unwrap();
        assert_eq!(updated.name, "Buds Pro");
        assert_eq!(updated.selling_price_cents, Some(1100));
    }

    #[tokio::test]
    async fn test_soft_delete_hides_from_list() {
        let db = memory_db().await;
        let a = db.products().create(&new_product("A", "1.00")).await.unwrap();
        db.products().create(&new_product("B", "1.00")).await.unwrap();

        db.products().soft_delete(&a.id).await.unwrap();

        let active = db.products().list_active(50).await.unwrap();
        assert_eq!(active.len(), 1);
        assert_eq!(active[0].name, "B");
        assert!(db.products().get_by_id(&a.id).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_hard_delete_cascades_stock() {
        let db = memory_db().await;
        let product = db.products().create(&new_product("A", "1.00")).await.unwrap();
        let main = location(&db, "Main Store").await;
        db.ledger().adjust(&product.id, &main.id, 5).await.unwrap();

        db.products().hard_delete(&product.id).await.unwrap();

        assert_eq!(db.ledger().get_quantity(&product.id, &main.id).await.unwrap(), 0);
        let err = db.products().hard_delete(&product.id).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }

    #[tokio::test]
    async fn test_sync_rate_checks_floor() {
        let db = memory_db().await;
        let mut new = new_product("Buds", "10.00");
        new.minimum_profit = dec("2.00");
        new.selling_price = Some(dec("15.00"));
        let product = db.products().create(&new).await.unwrap();

        let mut conn = db.pool().acquire().await.unwrap();
        let err = sync_rate(&mut conn, &product, Money::from_cents(1301), "items[0].rate")
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);

        sync_rate(&mut conn, &product, Money::from_cents(1300), "items[0].rate")
            .await
            .unwrap();
        drop(conn);

        let reloaded = db.products().get_by_id(&product.id).await.unwrap().unwrap();
        assert_eq!(reloaded.rate_cents, 1300);
    }
}
