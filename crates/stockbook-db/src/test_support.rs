//! Fixtures shared by the unit tests of this crate.

use rust_decimal::Decimal;
use std::str::FromStr;
use stockbook_core::payload::{
    NewItemLocation, NewProduct, NewPurchase, NewPurchaseItem, NewSale, NewSaleItem,
};
use stockbook_core::{Location, PaymentMode, Product, SalesSection, StockPolicy};
use tempfile::TempDir;

use crate::pool::{Database, DbConfig};
use crate::repository::section::ONLINE_CHANNEL;

pub(crate) async fn memory_db() -> Database {
    memory_db_with(StockPolicy::Enforce).await
}

pub(crate) async fn memory_db_with(policy: StockPolicy) -> Database {
    Database::new(DbConfig::in_memory().stock_policy(policy))
        .await
        .unwrap()
}

/// A file-backed database with a real pool, for concurrency tests. The
/// database and its WAL files go away with the directory.
pub(crate) struct TempDb {
    pub db: Database,
    dir: TempDir,
}

pub(crate) async fn file_db() -> TempDb {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("stockbook.db");
    let db = Database::new(DbConfig::new(&path).max_connections(8))
        .await
        .unwrap();
    TempDb { db, dir }
}

pub(crate) fn dec(value: &str) -> Decimal {
    Decimal::from_str(value).unwrap()
}

pub(crate) fn new_product(name: &str, rate: &str) -> NewProduct {
    NewProduct {
        id: None,
        barcode: None,
        name: name.to_string(),
        brand: "Acme".to_string(),
        serial_number: String::new(),
        variant: String::new(),
        rate: dec(rate),
        minimum_profit: Decimal::ZERO,
        selling_price: None,
        active: true,
    }
}

pub(crate) async fn product(db: &Database, name: &str, rate: &str) -> Product {
    db.products().create(&new_product(name, rate)).await.unwrap()
}

/// Returns the named location, creating it on first use.
pub(crate) async fn location(db: &Database, name: &str) -> Location {
    match db.locations().get_by_name(name).await.unwrap() {
        Some(existing) => existing,
        None => db.locations().create(name).await.unwrap(),
    }
}

/// An online section drawing from `location_name`.
pub(crate) async fn section(
    db: &Database,
    section_name: &str,
    location_name: &str,
) -> (SalesSection, Location) {
    let channels = db.sections().ensure_default_channels().await.unwrap();
    let online = channels
        .iter()
        .find(|c| c.name == ONLINE_CHANNEL)
        .unwrap();
    let loc = location(db, location_name).await;
    let section = db
        .sections()
        .create_section(&online.id, section_name, &loc.id)
        .await
        .unwrap();
    (section, loc)
}

/// Puts `quantity` on a ledger row directly.
pub(crate) async fn stock(db: &Database, product_id: &str, location_id: &str, quantity: i64) {
    db.ledger().adjust(product_id, location_id, quantity).await.unwrap();
}

pub(crate) fn purchase_of(product_id: &str, rate: &str, receipts: &[(&str, i64)]) -> NewPurchase {
    NewPurchase {
        supplier_name: "Acme Trading".to_string(),
        supplier_invoice_number: Some("INV-1".to_string()),
        purchase_date: chrono::NaiveDate::from_ymd_opt(2025, 3, 4).unwrap(),
        discount: Decimal::ZERO,
        items: vec![NewPurchaseItem {
            product_id: product_id.to_string(),
            rate: dec(rate),
            locations: receipts
                .iter()
                .map(|(location_id, quantity)| NewItemLocation {
                    location_id: location_id.to_string(),
                    quantity: *quantity,
                })
                .collect(),
        }],
    }
}

/// One-line sale through `section`; the line total is `price × quantity`.
pub(crate) fn sale_of(section: &SalesSection, product_id: &str, price: &str, quantity: i64) -> NewSale {
    let price = dec(price);
    NewSale {
        channel_id: section.channel_id.clone(),
        section_id: section.id.clone(),
        sale_datetime: None,
        customer_name: Some("Walk-in".to_string()),
        customer_mobile: None,
        payment_mode: PaymentMode::Cash,
        discount: Decimal::ZERO,
        items: vec![NewSaleItem {
            product_id: Some(product_id.to_string()),
            product_name: None,
            product_barcode: None,
            product_brand: None,
            product_variant: None,
            serial_number: None,
            price,
            quantity,
            total: price * Decimal::from(quantity),
        }],
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_file_db_is_removed_on_drop() {
        let temp = file_db().await;
        let dir = temp.dir.path().to_path_buf();
        location(&temp.db, "Main Store").await;
        assert!(dir.join("stockbook.db").exists());

        temp.db.close().await;
        drop(temp);
        assert!(!dir.exists());
    }
}
