//! # Seed Data Generator
//!
//! Populates a database with channels, sections, locations and a stocked
//! demo catalog for development.
//!
//! ## Usage
//! ```bash
//! # Seed the database named by stockbook.toml / STOCKBOOK_DB_PATH
//! cargo run -p stockbook-db --bin seed
//!
//! # Explicit path and catalog size
//! cargo run -p stockbook-db --bin seed -- --db ./data/stockbook.db --count 60
//!
//! # Verbose logging
//! RUST_LOG=stockbook_db=debug cargo run -p stockbook-db --bin seed
//! ```
//!
//! ## What Gets Created
//! - Channels `Online` and `Offline`
//! - Locations `Main Store` and `Warehouse`, one offline section per location
//! - Online sections `Snoonu`, `Talabat`, `Rafeeq`, all drawing from `Main Store`
//! - `--count` products, received through one purchase split across both
//!   locations
//!
//! Re-running is safe: channels, locations and sections are looked up
//! before being created, and products are skipped once any exist.

use chrono::Utc;
use rust_decimal::Decimal;
use std::env;
use stockbook_core::payload::{NewItemLocation, NewProduct, NewPurchase, NewPurchaseItem};
use stockbook_core::{Location, SYSTEM_USER};
use stockbook_db::repository::section::{OFFLINE_CHANNEL, ONLINE_CHANNEL};
use stockbook_db::{Database, DbConfig, StockbookConfig};
use tracing::info;
use tracing_subscriber::EnvFilter;

/// (brand, model, base rate in cents)
const CATALOG: &[(&str, &str, i64)] = &[
    ("Samsung", "Galaxy Buds FE", 21_000),
    ("Samsung", "25W Travel Adapter", 4_500),
    ("Apple", "USB-C to Lightning Cable", 6_900),
    ("Apple", "20W USB-C Power Adapter", 7_500),
    ("Anker", "PowerCore 10000", 9_900),
    ("Anker", "Nano Charger 30W", 8_500),
    ("Baseus", "Car Phone Holder", 3_500),
    ("Baseus", "Type-C Hub 6-in-1", 12_000),
    ("JBL", "Go 3 Speaker", 14_000),
    ("JBL", "Tune 520BT", 17_500),
    ("Xiaomi", "Redmi Buds 4", 9_000),
    ("Xiaomi", "Mi Band 8", 13_500),
];

const VARIANTS: &[&str] = &["Black", "White", "Blue", "Grey", "Red"];

const MAIN_STORE: &str = "Main Store";
const WAREHOUSE: &str = "Warehouse";
const ONLINE_SECTIONS: &[&str] = &["Snoonu", "Talabat", "Rafeeq"];

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args: Vec<String> = env::args().collect();

    let mut count: usize = 40;
    let mut db_path: Option<String> = None;

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--count" | "-c" => {
                if i + 1 < args.len() {
                    count = args[i + 1].parse().unwrap_or(40);
                    i += 1;
                }
            }
            "--db" | "-d" => {
                if i + 1 < args.len() {
                    db_path = Some(args[i + 1].clone());
                    i += 1;
                }
            }
            "--help" | "-h" => {
                println!("Stockbook Seed Data Generator");
                println!();
                println!("Usage: seed [OPTIONS]");
                println!();
                println!("Options:");
                println!("  -c, --count <N>    Number of products to generate (default: 40)");
                println!("  -d, --db <PATH>    Database file path (default: from config)");
                println!("  -h, --help         Show this help message");
                return Ok(());
            }
            _ => {}
        }
        i += 1;
    }

    let config = StockbookConfig::load(None)?;
    let db_config = match &db_path {
        Some(path) => DbConfig::new(path).stock_policy(config.ledger.stock_policy),
        None => config.db_config(),
    };

    println!("🌱 Stockbook Seed Data Generator");
    println!("================================");
    println!("Database: {}", db_config.database_path.display());
    println!("Products: {}", count);
    println!();

    let db = Database::new(db_config).await?;
    println!("✓ Connected to database, migrations applied");

    // Channels, locations, sections
    let channels = db.sections().ensure_default_channels().await?;
    let online = channels
        .iter()
        .find(|c| c.name == ONLINE_CHANNEL)
        .ok_or("online channel missing after provisioning")?;

    let main_store = get_or_create_location(&db, MAIN_STORE).await?;
    let warehouse = get_or_create_location(&db, WAREHOUSE).await?;

    let offline_created = db.sections().ensure_offline_sections().await?;
    println!(
        "✓ Channels ready, {} new {} section(s)",
        offline_created, OFFLINE_CHANNEL
    );

    let existing_online = db.sections().list_by_channel(&online.id).await?;
    for name in ONLINE_SECTIONS {
        if existing_online.iter().any(|s| s.name == *name) {
            continue;
        }
        db.sections()
            .create_section(&online.id, name, &main_store.id)
            .await?;
        println!("  + {} section {} → {}", ONLINE_CHANNEL, name, MAIN_STORE);
    }

    // Catalog
    let existing = db.products().count().await?;
    if existing > 0 {
        println!("⚠ Database already has {} products", existing);
        println!("  Skipping catalog to avoid duplicates.");
        println!("  Delete the database file to regenerate.");
        return Ok(());
    }

    println!();
    println!("Generating products...");
    let start = std::time::Instant::now();

    let mut items = Vec::with_capacity(count);
    for seed in 0..count {
        let (brand, model, base_rate) = CATALOG[seed % CATALOG.len()];
        let variant = VARIANTS[(seed / CATALOG.len()) % VARIANTS.len()];

        let product = db.products().create(&demo_product(brand, model, variant, base_rate)).await?;

        items.push(NewPurchaseItem {
            product_id: product.id,
            rate: product_rate(base_rate),
            locations: vec![
                NewItemLocation {
                    location_id: main_store.id.clone(),
                    quantity: 5 + (seed % 11) as i64,
                },
                NewItemLocation {
                    location_id: warehouse.id.clone(),
                    quantity: 20 + (seed % 31) as i64,
                },
            ],
        });
    }

    println!("✓ Generated {} products in {:?}", items.len(), start.elapsed());

    if !items.is_empty() {
        let purchase = NewPurchase {
            supplier_name: "Demo Distribution W.L.L.".to_string(),
            supplier_invoice_number: Some("SEED-0001".to_string()),
            purchase_date: Utc::now().date_naive(),
            discount: Decimal::ZERO,
            items,
        };
        let recorded = db.purchases().create(&purchase, SYSTEM_USER).await?;

        info!(purchase_id = %recorded.purchase.id, "Opening stock recorded");
        println!(
            "✓ Opening stock purchase recorded, total {}",
            recorded.purchase.total_amount()
        );
    }

    let main_units = db.ledger().entries_at_location(&main_store.id).await?;
    let warehouse_units = db.ledger().entries_at_location(&warehouse.id).await?;
    println!(
        "  {}: {} units, {}: {} units",
        MAIN_STORE,
        main_units.iter().map(|e| e.quantity).sum::<i64>(),
        WAREHOUSE,
        warehouse_units.iter().map(|e| e.quantity).sum::<i64>()
    );

    println!();
    println!("✓ Seed complete!");

    Ok(())
}

async fn get_or_create_location(db: &Database, name: &str) -> Result<Location, Box<dyn std::error::Error>> {
    match db.locations().get_by_name(name).await? {
        Some(location) => Ok(location),
        None => Ok(db.locations().create(name).await?),
    }
}

/// Rate in cents → decimal.
fn product_rate(base_rate: i64) -> Decimal {
    Decimal::new(base_rate, 2)
}

/// Selling price keeps a 15% margin over rate; minimum profit is 10%.
fn demo_product(brand: &str, model: &str, variant: &str, base_rate: i64) -> NewProduct {
    let minimum_profit = base_rate / 10;
    let selling_price = base_rate + base_rate * 15 / 100;

    NewProduct {
        id: None,
        barcode: None,
        name: format!("{} {}", brand, model),
        brand: brand.to_string(),
        serial_number: String::new(),
        variant: variant.to_string(),
        rate: product_rate(base_rate),
        minimum_profit: Decimal::new(minimum_profit, 2),
        selling_price: Some(Decimal::new(selling_price, 2)),
        active: true,
    }
}
