//! # Seed Data Generator
//!
//! Populates a database with categories and products for development.
//!
//! ## Usage
//! ```bash
//! # 200 products (default)
//! cargo run -p tally-db --bin seed
//!
//! # Custom amount and path
//! cargo run -p tally-db --bin seed -- --count 1000 --db ./data/tally.db
//! ```
//!
//! Each category carries a volume discount; products get a SKU of the form
//! `{CATEGORY}-{NNNN}`, a price between 500.00 and 50,000.00 and stock
//! between 0 and 200.

use chrono::Utc;
use std::env;
use tally_core::{Category, DiscountRate, Money, Product};
use tally_db::{Database, DbConfig};

/// (code, name, discount in basis points, product names)
const CATEGORIES: &[(&str, &str, u32, &[&str])] = &[
    (
        "BEV",
        "Beverages",
        500,
        &["Mineral Water", "Orange Juice", "Green Tea", "Cola", "Lemonade"],
    ),
    (
        "GRO",
        "Groceries",
        750,
        &["Basmati Rice", "Cooking Oil", "Wheat Flour", "Sugar", "Lentils"],
    ),
    (
        "ELC",
        "Electronics",
        1000,
        &["USB Cable", "Power Bank", "Earphones", "LED Bulb", "Extension Lead"],
    ),
    (
        "HSE",
        "Household",
        0,
        &["Detergent", "Dish Soap", "Broom", "Trash Bags", "Sponges"],
    ),
];

const SIZES: &[(&str, i64)] = &[("Small", 0), ("Medium", 25_000), ("Large", 60_000), ("Bulk", 150_000)];

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args: Vec<String> = env::args().collect();

    let mut count: usize = 200;
    let mut db_path = String::from("./tally_dev.db");

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
                println!("Tally Seed Data Generator");
                println!();
                println!("Usage: seed [OPTIONS]");
                println!();
                println!("Options:");
                println!("  -c, --count <N>    Number of products to generate (default: 200)");
                println!("  -d, --db <PATH>    Database file path (default: ./tally_dev.db)");
                println!("  -h, --help         Show this help message");
                return Ok(());
            }
            _ => {}
        }
        i += 1;
    }

    println!("Tally Seed Data Generator");
    println!("=========================");
    println!("Database: {}", db_path);
    println!("Products: {}", count);
    println!();

    let db = Database::new(DbConfig::new(&db_path)).await?;
    println!("✓ Connected, migrations applied");

    let existing = db.products().count().await?;
    if existing > 0 {
        println!("⚠ Database already has {} products, skipping seed.", existing);
        return Ok(());
    }

    let now = Utc::now();
    let start = std::time::Instant::now();
    let mut generated = 0;

    'outer: for (category_idx, (code, name, discount_bps, products)) in CATEGORIES.iter().enumerate() {
        let category = Category::new(*name, DiscountRate::from_bps(*discount_bps), now)?;
        db.products().insert_category(&category).await?;

        for (product_idx, product_name) in products.iter().enumerate() {
            for (size_idx, (size, price_addon)) in SIZES.iter().enumerate() {
                if generated >= count {
                    break 'outer;
                }

                let seed = category_idx * 1000 + product_idx * 20 + size_idx;
                let product = generate_product(code, product_name, size, *price_addon, &category.id, seed)?;

                if let Err(e) = db.products().insert(&product).await {
                    eprintln!("Failed to insert {}: {}", product.sku, e);
                    continue;
                }
                generated += 1;
            }
        }
    }

    println!("✓ Generated {} products in {:?}", generated, start.elapsed());
    db.close().await;
    Ok(())
}

fn generate_product(
    code: &str,
    name: &str,
    size: &str,
    price_addon: i64,
    category_id: &str,
    seed: usize,
) -> Result<Product, Box<dyn std::error::Error>> {
    let sku = format!("{}-{:04}", code, seed);
    let base_price = 50_000 + ((seed * 7_919) % 4_800_000) as i64;
    let stock = (seed % 201) as i64;

    let product = Product::new(
        sku,
        format!("{} {}", name, size),
        Some(category_id.to_string()),
        Money::from_cents(base_price + price_addon),
        stock,
        Utc::now(),
    )?;
    Ok(product)
}
