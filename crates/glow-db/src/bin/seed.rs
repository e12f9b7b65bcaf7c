//! # Seed Data Generator
//!
//! Populates a GLOW database with a small, consistent dataset for
//! development: users, a product catalog, customers, sales with partial
//! payments, follow-up payments, daily assignments and expenses.
//!
//! All ledger data goes through the real ledger operations, so the seeded
//! database satisfies the stock and balance invariants.
//!
//! ## Usage
//! ```bash
//! # Seed the configured database (glow.toml / GLOW_DB_PATH)
//! cargo run -p glow-db --bin seed
//!
//! # Explicit database and sale count
//! cargo run -p glow-db --bin seed -- --db ./glow_dev.db --sales 200
//!
//! # More logging
//! RUST_LOG=glow_db=debug cargo run -p glow-db --bin seed
//! ```

use std::env;
use std::path::PathBuf;

use chrono::{Duration, NaiveDate, Utc};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use glow_core::{
    AppUser, DraftLineItem, DraftSale, ExpenseCategory, NewAssignment, NewCustomer, NewExpense,
    NewProduct, NewWorkerTask, Role,
};
use glow_db::{Database, LedgerConfig};

/// (name, sku, unit, cost, price, opening stock)
const CATALOG: &[(&str, &str, &str, i64, i64, i64)] = &[
    ("Glow Soap 100g", "SOAP-100", "pcs", 6_500, 9_000, 400),
    ("Glow Soap 150g", "SOAP-150", "pcs", 9_000, 12_500, 300),
    ("Herbal Shampoo 200ml", "SHMP-200", "bottle", 24_000, 32_000, 150),
    ("Herbal Shampoo 400ml", "SHMP-400", "bottle", 42_000, 55_000, 90),
    ("Washing Powder 1kg", "WASH-1K", "pack", 28_000, 36_000, 200),
    ("Washing Powder 500g", "WASH-500", "pack", 15_000, 19_500, 260),
    ("Dish Bar", "DISH-BAR", "pcs", 4_000, 6_000, 500),
    ("Hand Wash Refill", "HW-REFILL", "pouch", 18_000, 24_000, 120),
    ("Toothpaste 100g", "TP-100", "tube", 16_000, 21_000, 180),
    ("Petroleum Jelly 50ml", "PJ-50", "jar", 7_000, 10_000, 220),
];

const SHOPS: &[(&str, &str, &str)] = &[
    ("Bilal General Store", "0300-1234567", "Anarkali Bazaar"),
    ("Madina Kiryana", "0301-7654321", "Ichhra Main Road"),
    ("Al-Habib Mart", "0321-5550101", "Model Town Link Rd"),
    ("Shah Traders", "0333-2224488", "Township Sector B"),
    ("Noor Super Store", "0345-8881212", "Gulberg III"),
    ("City Cash & Carry", "0302-9090909", "Johar Town"),
];

const LOCATIONS: &[&str] = &["Anarkali", "Ichhra", "Model Town", "Township", "Gulberg", "Johar Town"];

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,glow_db=debug,sqlx=warn")),
        )
        .init();

    let args: Vec<String> = env::args().collect();

    let mut sale_count: usize = 60;
    let mut db_path: Option<PathBuf> = None;

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--sales" | "-s" => {
                if i + 1 < args.len() {
                    sale_count = args[i + 1].parse().unwrap_or(60);
                    i += 1;
                }
            }
            "--db" | "-d" => {
                if i + 1 < args.len() {
                    db_path = Some(PathBuf::from(&args[i + 1]));
                    i += 1;
                }
            }
            "--help" | "-h" => {
                println!("GLOW Seed Data Generator");
                println!();
                println!("Usage: seed [OPTIONS]");
                println!();
                println!("Options:");
                println!("  -s, --sales <N>    Number of sales to record (default: 60)");
                println!("  -d, --db <PATH>    Database file path (default: from glow.toml)");
                println!("  -h, --help         Show this help message");
                return Ok(());
            }
            _ => {}
        }
        i += 1;
    }

    let mut config = LedgerConfig::load(None)?;
    if let Some(path) = db_path {
        config.database.path = path;
    }
    if let Some(parent) = config.database.path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    info!(path = %config.database.path.display(), sales = sale_count, "Seeding GLOW database");

    let db = Database::new(config.db_config())
        .await?
        .with_retry_policy(config.retry_policy());

    if db.products().count().await? > 0 {
        warn!("Database already has products, skipping seed. Delete the file to regenerate.");
        return Ok(());
    }

    let start = std::time::Instant::now();

    // Users
    let now = Utc::now();
    let staff = [
        ("admin-1", "Ayesha Khan", Role::Admin),
        ("manager-1", "Usman Tariq", Role::Manager),
        ("salesman-1", "Ali Raza", Role::Salesman),
        ("salesman-2", "Hamza Iqbal", Role::Salesman),
        ("worker-1", "Bano Bibi", Role::Worker),
    ];
    for (uid, name, role) in staff {
        db.users()
            .upsert(&AppUser {
                uid: uid.to_string(),
                email: Some(format!("{}@glow.local", uid)),
                name: name.to_string(),
                role: Some(role),
                created_at: now,
            })
            .await?;
    }
    let salesmen = ["salesman-1", "salesman-2"];

    // Catalog
    let mut products = Vec::with_capacity(CATALOG.len());
    for &(name, sku, unit, cost, price, stock) in CATALOG {
        let product = db
            .products()
            .insert(&NewProduct {
                name: name.to_string(),
                sku: sku.to_string(),
                unit: unit.to_string(),
                cost_price_cents: cost,
                sale_price_cents: price,
                stock: Some(stock),
                reorder_level: stock / 10,
                expiry_date: None,
            })
            .await?;
        products.push(product);
    }
    info!(count = products.len(), "Products created");

    // Customers, alternating between salesmen
    let mut customers = Vec::with_capacity(SHOPS.len());
    for (idx, &(name, phone, address)) in SHOPS.iter().enumerate() {
        let customer = db
            .customers()
            .insert(&NewCustomer {
                name: name.to_string(),
                phone: phone.to_string(),
                address: address.to_string(),
                salesman_id: salesmen[idx % salesmen.len()].to_string(),
            })
            .await?;
        customers.push(customer);
    }
    info!(count = customers.len(), "Customers created");

    // Sales over the last 30 days; every third one is paid in full,
    // the rest are partly on credit.
    let today = now.date_naive();
    let mut sale_ids = Vec::with_capacity(sale_count);
    for n in 0..sale_count {
        let customer = &customers[n % customers.len()];
        let first = &products[n % products.len()];
        let second = &products[(n * 7 + 3) % products.len()];

        let mut items = vec![DraftLineItem::new(&first.id, 1 + (n % 5) as i64, first.sale_price_cents)];
        if second.id != first.id {
            items.push(DraftLineItem::new(&second.id, 1 + (n % 3) as i64, second.sale_price_cents));
        }

        let mut draft = DraftSale {
            customer_id: customer.id.clone(),
            date: days_ago(today, (n % 30) as i64),
            items,
            discount_cents: if n % 4 == 0 { 500 } else { 0 },
            amount_paid_cents: 0,
            photo_ref: None,
        };
        let total = draft.total().cents();
        draft.amount_paid_cents = if n % 3 == 0 { total } else { total / 2 };

        let sale_id = db.sales().record_sale(&draft, &customer.salesman_id).await?;
        sale_ids.push(sale_id);
    }
    info!(count = sale_ids.len(), "Sales recorded");

    // Follow-up payments on some open sales
    let mut payments = 0;
    for sale_id in sale_ids.iter().step_by(4) {
        let Some(sale) = db.sales().get(sale_id).await? else {
            continue;
        };
        let outstanding = sale.outstanding().cents();
        if outstanding > 0 {
            db.payments()
                .record_payment(sale_id, outstanding / 2 + 1, "manager-1")
                .await?;
            payments += 1;
        }
    }
    info!(count = payments, "Follow-up payments recorded");

    // Today's plans, rotated once so each salesman has history
    for (round, location_offset) in [(0, 0), (1, 2)] {
        for (idx, salesman) in salesmen.iter().enumerate() {
            let location = LOCATIONS[(idx + location_offset) % LOCATIONS.len()];
            db.assignments()
                .assign(&NewAssignment {
                    salesman_id: salesman.to_string(),
                    location: location.to_string(),
                    items_to_take: Some(format!("Round {}: soap, shampoo, washing powder", round + 1)),
                    assigned_by_id: "manager-1".to_string(),
                })
                .await?;
        }
    }

    db.worker_tasks()
        .insert(&NewWorkerTask {
            worker_id: "worker-1".to_string(),
            task_description: "Pack 40 cartons for tomorrow's routes".to_string(),
        })
        .await?;

    for (day, category, amount) in [
        (1, ExpenseCategory::Fuel, 450_000),
        (3, ExpenseCategory::Packing, 120_000),
        (7, ExpenseCategory::Rent, 8_000_000),
    ] {
        db.expenses()
            .insert(&NewExpense {
                date: days_ago(today, day),
                category,
                amount_cents: amount,
                notes: None,
            })
            .await?;
    }

    // Balance check: every customer's running due must match its sales.
    for customer in db.customers().list().await? {
        let from_sales = db.customers().outstanding_from_sales(&customer.id).await?;
        if from_sales != customer.total_due_cents {
            warn!(
                customer_id = %customer.id,
                total_due_cents = customer.total_due_cents,
                from_sales,
                "Customer balance does not match sales"
            );
        }
    }

    info!(elapsed = ?start.elapsed(), "Seed complete");
    db.close().await;
    Ok(())
}

fn days_ago(today: NaiveDate, days: i64) -> NaiveDate {
    today - Duration::days(days)
}
