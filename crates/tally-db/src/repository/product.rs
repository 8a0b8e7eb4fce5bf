//! # Product Repository
//!
//! The narrow catalog interface the fulfillment engine needs: product
//! lookup with category discount, plus the atomic stock counter updates.
//!
//! ## Atomic Stock Counters
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Check-and-reserve is ONE statement, never read-then-write:            │
//! │                                                                         │
//! │  UPDATE products                                                       │
//! │     SET reserved_stock = reserved_stock + ?q                           │
//! │   WHERE id = ?id                                                       │
//! │     AND stock_quantity - reserved_stock >= ?q                          │
//! │  RETURNING stock_quantity, reserved_stock                              │
//! │                                                                         │
//! │  Order A (q=10) ─┐                                                     │
//! │                  ├─► SQLite serializes writers                         │
//! │  Order B (q=10) ─┘      A: 1 row  → Applied                            │
//! │                         B: 0 rows → Insufficient (re-read counters)    │
//! │                                                                         │
//! │  commit / release use the same shape: WHERE reserved_stock >= ?q      │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The counter updates take a `&mut SqliteConnection` so callers run them
//! inside their own transaction (`&mut *tx`).

use chrono::Utc;
use sqlx::{SqliteConnection, SqlitePool};
use std::collections::HashMap;
use tracing::debug;

use crate::error::{DbError, DbResult};
use tally_core::{Category, Product, ProductPricing, StockLevel};

/// Outcome of a conditional stock counter update.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StockUpdate {
    /// The row matched; counters after the update.
    Applied(StockLevel),
    /// The condition failed; counters as they currently stand.
    Rejected(StockLevel),
}

const PRICING_SELECT: &str = r#"
    SELECT
        p.id AS product_id,
        p.sku,
        p.name,
        p.price_cents,
        p.stock_quantity,
        p.reserved_stock,
        COALESCE(c.discount_bps, 0) AS discount_bps
    FROM products p
    LEFT JOIN categories c ON c.id = p.category_id AND c.is_active = 1
    WHERE p.id = ?1 AND p.is_active = 1
"#;

/// Repository for catalog reads and stock counters.
///
/// ## Usage
/// ```rust,ignore
/// let repo = db.products();
/// let pricing = repo.get_pricing(&product_id).await?;
///
/// let mut tx = db.begin().await?;
/// let update = ProductRepository::try_reserve(&mut *tx, &product_id, 3).await?;
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

    // =========================================================================
    // Catalog reads
    // =========================================================================

    /// Gets an active product by ID.
    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Product>> {
        let product = sqlx::query_as::<_, Product>(
            r#"
            SELECT id, sku, name, category_id, price_cents, stock_quantity,
                   reserved_stock, is_active, created_at, updated_at
            FROM products
            WHERE id = ?1 AND is_active = 1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(product)
    }

    /// Product joined with its category discount.
    pub async fn get_pricing(&self, id: &str) -> DbResult<Option<ProductPricing>> {
        let pricing = sqlx::query_as::<_, ProductPricing>(PRICING_SELECT)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(pricing)
    }

    /// Pricing for several products, keyed by product ID. Unknown or
    /// inactive products are simply absent from the map.
    pub async fn get_pricing_many(&self, ids: &[&str]) -> DbResult<HashMap<String, ProductPricing>> {
        let mut catalog = HashMap::with_capacity(ids.len());
        for id in ids {
            if let Some(pricing) = self.get_pricing(id).await? {
                catalog.insert(pricing.product_id.clone(), pricing);
            }
        }

        debug!(requested = ids.len(), found = catalog.len(), "Loaded product pricing");
        Ok(catalog)
    }

    /// Current stock counters of a product.
    pub async fn stock_level(&self, id: &str) -> DbResult<StockLevel> {
        let row: Option<(i64, i64)> =
            sqlx::query_as("SELECT stock_quantity, reserved_stock FROM products WHERE id = ?1")
                .bind(id)
                .fetch_optional(&self.pool)
                .await?;

        row.map(|(on_hand, reserved)| StockLevel { on_hand, reserved })
            .ok_or_else(|| DbError::not_found("Product", id))
    }

    /// Counts active products (for diagnostics).
    pub async fn count(&self) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM products WHERE is_active = 1")
            .fetch_one(&self.pool)
            .await?;

        Ok(count)
    }

    // =========================================================================
    // Seeding helpers
    // =========================================================================

    pub async fn insert_category(&self, category: &Category) -> DbResult<()> {
        debug!(name = %category.name, discount_bps = category.discount_bps, "Inserting category");

        sqlx::query(
            r#"
            INSERT INTO categories (id, name, discount_bps, is_active, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5)
            "#,
        )
        .bind(&category.id)
        .bind(&category.name)
        .bind(category.discount_bps)
        .bind(category.is_active)
        .bind(category.created_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    pub async fn insert(&self, product: &Product) -> DbResult<()> {
        debug!(sku = %product.sku, "Inserting product");

        sqlx::query(
            r#"
            INSERT INTO products (
                id, sku, name, category_id, price_cents, stock_quantity,
                reserved_stock, is_active, created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
            "#,
        )
        .bind(&product.id)
        .bind(&product.sku)
        .bind(&product.name)
        .bind(&product.category_id)
        .bind(product.price_cents)
        .bind(product.stock_quantity)
        .bind(product.reserved_stock)
        .bind(product.is_active)
        .bind(product.created_at)
        .bind(product.updated_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    // =========================================================================
    // Atomic stock counters
    // =========================================================================

    async fn current_level(conn: &mut SqliteConnection, id: &str) -> DbResult<StockLevel> {
        let row: Option<(i64, i64)> =
            sqlx::query_as("SELECT stock_quantity, reserved_stock FROM products WHERE id = ?1")
                .bind(id)
                .fetch_optional(&mut *conn)
                .await?;

        row.map(|(on_hand, reserved)| StockLevel { on_hand, reserved })
            .ok_or_else(|| DbError::not_found("Product", id))
    }

    async fn conditional_update(
        conn: &mut SqliteConnection,
        sql: &str,
        id: &str,
        qty: i64,
    ) -> DbResult<StockUpdate> {
        let row: Option<(i64, i64)> = sqlx::query_as(sql)
            .bind(id)
            .bind(qty)
            .bind(Utc::now())
            .fetch_optional(&mut *conn)
            .await?;

        match row {
            Some((on_hand, reserved)) => Ok(StockUpdate::Applied(StockLevel { on_hand, reserved })),
            None => Ok(StockUpdate::Rejected(Self::current_level(conn, id).await?)),
        }
    }

    /// Reserves `qty` units if at least that many are available.
    pub async fn try_reserve(conn: &mut SqliteConnection, id: &str, qty: i64) -> DbResult<StockUpdate> {
        debug!(id = %id, qty, "Reserving stock");

        Self::conditional_update(
            conn,
            r#"
            UPDATE products
            SET reserved_stock = reserved_stock + ?2, updated_at = ?3
            WHERE id = ?1 AND is_active = 1 AND stock_quantity - reserved_stock >= ?2
            RETURNING stock_quantity, reserved_stock
            "#,
            id,
            qty,
        )
        .await
    }

    /// Ships `qty` reserved units: both counters drop.
    pub async fn commit_reserved(conn: &mut SqliteConnection, id: &str, qty: i64) -> DbResult<StockUpdate> {
        debug!(id = %id, qty, "Committing reserved stock");

        Self::conditional_update(
            conn,
            r#"
            UPDATE products
            SET stock_quantity = stock_quantity - ?2,
                reserved_stock = reserved_stock - ?2,
                updated_at = ?3
            WHERE id = ?1 AND reserved_stock >= ?2
            RETURNING stock_quantity, reserved_stock
            "#,
            id,
            qty,
        )
        .await
    }

    /// Returns `qty` reserved units to availability.
    pub async fn release_reserved(conn: &mut SqliteConnection, id: &str, qty: i64) -> DbResult<StockUpdate> {
        debug!(id = %id, qty, "Releasing reserved stock");

        Self::conditional_update(
            conn,
            r#"
            UPDATE products
            SET reserved_stock = reserved_stock - ?2, updated_at = ?3
            WHERE id = ?1 AND reserved_stock >= ?2
            RETURNING stock_quantity, reserved_stock
            "#,
            id,
            qty,
        )
        .await
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Database, DbConfig};
    use tally_core::{DiscountRate, Money};

    async fn setup() -> (Database, Product) {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let now = Utc::now();
        let category = Category::new("Appliances", DiscountRate::from_bps(1000), now).unwrap();
        db.products().insert_category(&category).await.unwrap();
        let product = Product::new("FRIDGE-1", "Fridge", Some(category.id.clone()), Money::from_major(100), 10, now).unwrap();
        db.products().insert(&product).await.unwrap();
        (db, product)
    }

    #[tokio::test]
    async fn test_get_pricing_joins_category_discount() {
        let (db, product) = setup().await;

        let pricing = db.products().get_pricing(&product.id).await.unwrap().unwrap();
        assert_eq!(pricing.discount_bps, 1000);
        assert_eq!(pricing.available(), 10);
        assert_eq!(pricing.price(), Money::from_major(100));

        assert!(db.products().get_pricing("missing").await.unwrap().is_none());
        assert_eq!(db.products().count().await.unwrap(), 1);
        assert_eq!(db.products().get_by_id(&product.id).await.unwrap().unwrap().sku, "FRIDGE-1");
    }

    #[tokio::test]
    async fn test_reserve_up_to_available() {
        let (db, product) = setup().await;
        let mut conn = db.pool().acquire().await.unwrap();

        let first = ProductRepository::try_reserve(&mut conn, &product.id, 7).await.unwrap();
        assert_eq!(first, StockUpdate::Applied(StockLevel { on_hand: 10, reserved: 7 }));

        let second = ProductRepository::try_reserve(&mut conn, &product.id, 4).await.unwrap();
        assert_eq!(second, StockUpdate::Rejected(StockLevel { on_hand: 10, reserved: 7 }));

        let exact = ProductRepository::try_reserve(&mut conn, &product.id, 3).await.unwrap();
        assert_eq!(exact, StockUpdate::Applied(StockLevel { on_hand: 10, reserved: 10 }));
    }

    #[tokio::test]
    async fn test_commit_and_release() {
        let (db, product) = setup().await;
        let mut conn = db.pool().acquire().await.unwrap();

        ProductRepository::try_reserve(&mut conn, &product.id, 6).await.unwrap();

        let committed = ProductRepository::commit_reserved(&mut conn, &product.id, 4).await.unwrap();
        assert_eq!(committed, StockUpdate::Applied(StockLevel { on_hand: 6, reserved: 2 }));

        let released = ProductRepository::release_reserved(&mut conn, &product.id, 2).await.unwrap();
        assert_eq!(released, StockUpdate::Applied(StockLevel { on_hand: 6, reserved: 0 }));

        let nothing_left = ProductRepository::release_reserved(&mut conn, &product.id, 1).await.unwrap();
        assert_eq!(nothing_left, StockUpdate::Rejected(StockLevel { on_hand: 6, reserved: 0 }));
    }

    #[tokio::test]
    async fn test_unknown_product_is_not_found() {
        let (db, _) = setup().await;
        let mut conn = db.pool().acquire().await.unwrap();

        let err = ProductRepository::try_reserve(&mut conn, "ghost", 1).await.unwrap_err();
        assert!(matches!(err, DbError::NotFound { .. }));
    }
}
