//! # Seed Data Generator
//!
//! Populates the database with development data: categories, users,
//! products, customers, and a spread of sales for the analytics views.
//!
//! ## Usage
//! ```bash
//! # Default database path (./atlas_dev.db)
//! cargo run -p atlas-db --bin seed
//!
//! # Custom path and product count
//! cargo run -p atlas-db --bin seed -- --db ./data/atlas.db --count 500
//! ```

use std::env;

use atlas_core::{Caller, NewSaleLine, Role};
use atlas_db::repository::customer::NewCustomer;
use atlas_db::repository::product::NewProduct;
use atlas_db::repository::user::NewUser;
use atlas_db::{Database, DbConfig};

/// Product names per category for realistic test data.
const CATEGORIES: &[(&str, &[&str])] = &[
    (
        "Beverages",
        &[
            "Cola 1.5L", "Cola 500ml", "Orange Soda 1.5L", "Lemon Soda 500ml",
            "Mineral Water 1.5L", "Mineral Water 500ml", "Apple Juice 1L",
            "Mango Juice 1L", "Iced Tea 500ml", "Energy Drink 250ml",
        ],
    ),
    (
        "Grocery",
        &[
            "Sugar 1kg", "Sugar 5kg", "Rice Basmati 5kg", "Flour 10kg",
            "Cooking Oil 1L", "Cooking Oil 5L", "Tea 500g", "Salt 800g",
            "Red Lentils 1kg", "Chickpeas 1kg",
        ],
    ),
    (
        "Snacks",
        &[
            "Potato Chips Large", "Potato Chips Small", "Salted Peanuts 200g",
            "Chocolate Bar", "Biscuits Family Pack", "Crackers 300g",
            "Instant Noodles", "Popcorn 100g", "Dates 500g", "Mixed Nuts 250g",
        ],
    ),
    (
        "Household",
        &[
            "Dish Soap 500ml", "Laundry Powder 1kg", "Bleach 1L",
            "Matches 10-Pack", "Candles 6-Pack", "Trash Bags 30-Pack",
            "Toilet Paper 4-Roll", "Hand Soap 250ml", "Sponges 5-Pack",
            "Air Freshener",
        ],
    ),
];

const CUSTOMERS: &[(&str, i64)] = &[
    ("Karim Traders", 12_500_000),
    ("Hassan & Sons", 8_200_000),
    ("City Mart Wholesale", 5_600_000),
    ("Noor General Store", 2_400_000),
    ("Ayesha Retail", 90_000),
    ("Corner Kiosk", 0),
];

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    // Parse command line arguments
    let args: Vec<String> = env::args().collect();

    let mut count: usize = 200;
    let mut db_path = String::from("./atlas_dev.db");

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--count" | "-c" => {
                if i + 1 < args.len() {
                    count = args[i + 1].parse().unwrap_or(200);
                    i += 1;
                }
            }
            "--db" | "-d" => {
                if i + 1 < args.len() {
                    db_path = args[i + 1].clone();
                    i += 1;
                }
            }
            "--help" | "-h" => {
                println!("Atlas POS Seed Data Generator");
                println!();
                println!("Usage: seed [OPTIONS]");
                println!();
                println!("Options:");
                println!("  -c, --count <N>    Number of products to generate (default: 200)");
                println!("  -d, --db <PATH>    Database file path (default: ./atlas_dev.db)");
                println!("  -h, --help         Show this help message");
                return Ok(());
            }
            _ => {}
        }
        i += 1;
    }

    println!("Atlas POS Seed Data Generator");
    println!("=============================");
    println!("Database: {}", db_path);
    println!("Products: {}", count);
    println!();

    let db = Database::new(DbConfig::new(&db_path)).await?;
    println!("✓ Connected, migrations applied");

    let existing = db.products().count().await?;
    if existing > 0 {
        println!("⚠ Database already has {} products", existing);
        println!("  Skipping seed to avoid duplicates.");
        println!("  Delete the database file to regenerate.");
        return Ok(());
    }

    // Users
    let admin = db
        .users()
        .insert(NewUser {
            name: "Amir".to_string(),
            email: "amir@example.com".to_string(),
            role: Role::Admin,
        })
        .await?;
    let cashier_user = db
        .users()
        .insert(NewUser {
            name: "Sana".to_string(),
            email: "sana@example.com".to_string(),
            role: Role::Cashier,
        })
        .await?;
    db.users().record_login(&admin.id).await?;
    println!("✓ Users created");

    // Categories + products
    let product_ids = seed_products(&db, count).await?;
    println!("✓ {} products created", product_ids.len());

    // Customers across all balance segments
    for (name, balance) in CUSTOMERS {
        db.customers()
            .insert(NewCustomer {
                name: name.to_string(),
                phone: None,
                email: None,
                address: None,
                credit_limit_cents: balance + 5_000_000,
                outstanding_balance_cents: *balance,
                is_active: true,
            })
            .await?;
    }
    println!("✓ {} customers created", CUSTOMERS.len());

    // A handful of sales so the dashboard isn't empty
    let caller = Caller {
        user_id: cashier_user.id.clone(),
        name: cashier_user.name.clone(),
        role: Role::Cashier,
    };
    let mut sales = 0;
    for (idx, product_id) in product_ids.iter().take(20).enumerate() {
        let product = db.products().get(product_id).await?;
        let quantity = (idx % 3 + 1) as i64;
        if product.stock_quantity < quantity {
            continue;
        }
        db.sales()
            .create(
                &caller,
                vec![NewSaleLine {
                    product_id: product.id.clone(),
                    product_name: product.name.clone(),
                    unit_price_cents: product.price_cents,
                    quantity,
                }],
            )
            .await?;
        sales += 1;
    }
    println!("✓ {} sales created", sales);

    println!();
    println!("✓ Seed complete!");

    Ok(())
}

/// Creates categories and products, cycling through name lists until `count`
/// products exist. Returns the created product ids.
async fn seed_products(
    db: &Database,
    count: usize,
) -> Result<Vec<String>, Box<dyn std::error::Error>> {
    let mut category_ids = Vec::new();
    for (name, _) in CATEGORIES {
        category_ids.push(db.categories().insert(name).await?.id);
    }

    let mut product_ids = Vec::new();
    let mut seq = 0usize;

    'outer: loop {
        for (cat_idx, (_, names)) in CATEGORIES.iter().enumerate() {
            for name in names.iter() {
                if product_ids.len() >= count {
                    break 'outer;
                }

                // Deterministic pseudo-variation keyed on the sequence number.
                let price_cents = 99 + ((seq * 37) % 2_000) as i64;
                let stock = (seq * 13 % 60) as i64;
                let min_level = (seq % 8) as i64;

                let suffix = seq / (CATEGORIES.len() * names.len()).max(1);
                let display_name = if suffix == 0 {
                    (*name).to_string()
                } else {
                    format!("{name} #{suffix}")
                };

                let product = db
                    .products()
                    .insert(NewProduct {
                        sku: format!("ATL-{seq:05}"),
                        name: display_name,
                        price_cents,
                        stock_quantity: stock,
                        min_stock_level: min_level,
                        category_id: Some(category_ids[cat_idx].clone()),
                        supplier_id: None,
                    })
                    .await?;

                product_ids.push(product.id);
                seq += 1;
            }
        }
    }

    Ok(product_ids)
}
