//! Fixtures shared by the workflow tests.

#![allow(dead_code)]

use chrono::Utc;
use tally_core::{Category, DiscountRate, Money, Product, StockLevel};
use tally_db::{Database, DbConfig};
use tally_engine::BackOffice;

pub async fn office() -> BackOffice {
    let db = Database::new(DbConfig::in_memory()).await.unwrap();
    BackOffice::with_defaults(db)
}

/// Adds a product, under a discounted category when `discount_bps > 0`.
pub async fn product(office: &BackOffice, sku: &str, price_cents: i64, stock: i64, discount_bps: u32) -> Product {
    let now = Utc::now();
    let category_id = if discount_bps > 0 {
        let category = Category::new(format!("Category {}", sku), DiscountRate::from_bps(discount_bps), now).unwrap();
        office.db().products().insert_category(&category).await.unwrap();
        Some(category.id)
    } else {
        None
    };

    let product = Product::new(sku, format!("Product {}", sku), category_id, Money::from_cents(price_cents), stock, now).unwrap();
    office.db().products().insert(&product).await.unwrap();
    product
}

pub async fn stock(office: &BackOffice, product_id: &str) -> StockLevel {
    office.db().products().stock_level(product_id).await.unwrap()
}
