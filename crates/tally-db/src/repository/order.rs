//! # Order Repository
//!
//! Database operations for orders and order items.
//!
//! ## Order Lifecycle
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                       Order Lifecycle                                   │
//! │                                                                         │
//! │  1. PLACE (one transaction)                                            │
//! │     └── try_reserve() per line  (products)                             │
//! │     └── insert()               → Order { status: pending }             │
//! │                                                                         │
//! │  2. TRANSITION (one transaction)                                       │
//! │     └── transition()  UPDATE ... WHERE status = 'pending'              │
//! │     └── commit_reserved() / release_reserved() per item                │
//! │                                                                         │
//! │  Two racing transitions: the loser's UPDATE matches 0 rows.            │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::{DateTime, Utc};
use sqlx::{SqliteConnection, SqlitePool};
use tracing::debug;

use crate::error::DbResult;
use tally_core::{Order, OrderItem, OrderStatus, PaymentType};

const ORDER_COLUMNS: &str = r#"
    id, customer_id, status, payment_type, original_total_cents, total_cents,
    created_by, notes, created_at, updated_at, completed_at, cancelled_at
"#;

const ITEM_COLUMNS: &str = r#"
    id, order_id, product_id, sku_snapshot, name_snapshot, quantity,
    unit_price_cents, final_price_cents, discount_bps, line_total_cents, created_at
"#;

/// Repository for order database operations.
#[derive(Debug, Clone)]
pub struct OrderRepository {
    pool: SqlitePool,
}

impl OrderRepository {
    /// Creates a new OrderRepository.
    pub fn new(pool: SqlitePool) -> Self {
        OrderRepository { pool }
    }

    /// Gets an order with its items.
    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Order>> {
        let mut conn = self.pool.acquire().await?;
        Self::fetch(&mut conn, id).await
    }

    /// Gets an order with its items on an existing connection.
    pub async fn fetch(conn: &mut SqliteConnection, id: &str) -> DbResult<Option<Order>> {
        let order = sqlx::query_as::<_, Order>(&format!(
            "SELECT {} FROM orders WHERE id = ?1",
            ORDER_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&mut *conn)
        .await?;

        match order {
            Some(mut order) => {
                order.items = Self::fetch_items(conn, id).await?;
                Ok(Some(order))
            }
            None => Ok(None),
        }
    }

    /// Items of an order, in insertion order.
    pub async fn fetch_items(conn: &mut SqliteConnection, order_id: &str) -> DbResult<Vec<OrderItem>> {
        let items = sqlx::query_as::<_, OrderItem>(&format!(
            "SELECT {} FROM order_items WHERE order_id = ?1 ORDER BY rowid",
            ITEM_COLUMNS
        ))
        .bind(order_id)
        .fetch_all(&mut *conn)
        .await?;

        Ok(items)
    }

    /// Lists orders, newest first, optionally filtered by status.
    ///
    /// Items are not loaded.
    pub async fn list(&self, status: Option<OrderStatus>, limit: u32) -> DbResult<Vec<Order>> {
        debug!(?status, limit, "Listing orders");

        let orders = sqlx::query_as::<_, Order>(&format!(
            r#"
            SELECT {} FROM orders
            WHERE (?1 IS NULL OR status = ?1)
            ORDER BY created_at DESC
            LIMIT ?2
            "#,
            ORDER_COLUMNS
        ))
        .bind(status)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(orders)
    }

    /// Inserts an order and all its items.
    pub async fn insert(conn: &mut SqliteConnection, order: &Order) -> DbResult<()> {
        debug!(id = %order.id, items = order.items.len(), total = order.total_cents, "Inserting order");

        sqlx::query(
            r#"
            INSERT INTO orders (
                id, customer_id, status, payment_type, original_total_cents, total_cents,
                created_by, notes, created_at, updated_at, completed_at, cancelled_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)
            "#,
        )
        .bind(&order.id)
        .bind(&order.customer_id)
        .bind(order.status)
        .bind(order.payment_type)
        .bind(order.original_total_cents)
        .bind(order.total_cents)
        .bind(&order.created_by)
        .bind(&order.notes)
        .bind(order.created_at)
        .bind(order.updated_at)
        .bind(order.completed_at)
        .bind(order.cancelled_at)
        .execute(&mut *conn)
        .await?;

        for item in &order.items {
            sqlx::query(
                r#"
                INSERT INTO order_items (
                    id, order_id, product_id, sku_snapshot, name_snapshot, quantity,
                    unit_price_cents, final_price_cents, discount_bps, line_total_cents, created_at
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)
                "#,
            )
            .bind(&item.id)
            .bind(&item.order_id)
            .bind(&item.product_id)
            .bind(&item.sku_snapshot)
            .bind(&item.name_snapshot)
            .bind(item.quantity)
            .bind(item.unit_price_cents)
            .bind(item.final_price_cents)
            .bind(item.discount_bps)
            .bind(item.line_total_cents)
            .bind(item.created_at)
            .execute(&mut *conn)
            .await?;
        }

        Ok(())
    }

    /// Moves a pending order to `target`.
    ///
    /// Returns `false` when the order is missing or no longer pending; the
    /// caller re-reads it to report why.
    pub async fn transition(
        conn: &mut SqliteConnection,
        id: &str,
        target: OrderStatus,
        payment_type: Option<PaymentType>,
        now: DateTime<Utc>,
    ) -> DbResult<bool> {
        debug!(id = %id, to = %target, "Transitioning order");

        let completed_at = (target == OrderStatus::Completed).then_some(now);
        let cancelled_at = (target == OrderStatus::Cancelled).then_some(now);

        let result = sqlx::query(
            r#"
            UPDATE orders
            SET status = ?2,
                payment_type = COALESCE(?3, payment_type),
                updated_at = ?4,
                completed_at = COALESCE(?5, completed_at),
                cancelled_at = COALESCE(?6, cancelled_at)
            WHERE id = ?1 AND status = 'pending'
            "#,
        )
        .bind(id)
        .bind(target)
        .bind(payment_type)
        .bind(now)
        .bind(completed_at)
        .bind(cancelled_at)
        .execute(&mut *conn)
        .await?;

        Ok(result.rows_affected() == 1)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Database, DbConfig};
    use tally_core::pricing::{price_order, OrderLineRequest, PricingConfig};
    use tally_core::{Money, PlaceOrderRequest, Product};

    async fn setup() -> (Database, Order) {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let product = Product::new("MUG-1", "Mug", None, Money::from_cents(500), 20, Utc::now()).unwrap();
        db.products().insert(&product).await.unwrap();

        let lines = vec![OrderLineRequest::new(product.id.clone(), 2)];
        let catalog = db.products().get_pricing_many(&[product.id.as_str()]).await.unwrap();
        let priced = price_order(&PricingConfig::default(), &lines, &catalog).unwrap();
        let order = Order::from_priced(&PlaceOrderRequest::new("clerk", lines), &priced, Utc::now());

        let mut conn = db.pool().acquire().await.unwrap();
        OrderRepository::insert(&mut conn, &order).await.unwrap();
        drop(conn);

        (db, order)
    }

    #[tokio::test]
    async fn test_insert_and_fetch_with_items() {
        let (db, order) = setup().await;

        let loaded = db.orders().get_by_id(&order.id).await.unwrap().unwrap();
        assert_eq!(loaded.status, OrderStatus::Pending);
        assert_eq!(loaded.total_cents, 1000);
        assert_eq!(loaded.items.len(), 1);
        assert_eq!(loaded.items[0].quantity, 2);
        assert_eq!(loaded.items[0].sku_snapshot, "MUG-1");
    }

    #[tokio::test]
    async fn test_transition_only_from_pending() {
        let (db, order) = setup().await;
        let mut conn = db.pool().acquire().await.unwrap();

        let moved = OrderRepository::transition(
            &mut conn,
            &order.id,
            OrderStatus::Completed,
            Some(PaymentType::Credit),
            Utc::now(),
        )
        .await
        .unwrap();
        assert!(moved);

        let again = OrderRepository::transition(&mut conn, &order.id, OrderStatus::Cancelled, None, Utc::now())
            .await
            .unwrap();
        assert!(!again);
        drop(conn);

        let loaded = db.orders().get_by_id(&order.id).await.unwrap().unwrap();
        assert_eq!(loaded.status, OrderStatus::Completed);
        assert_eq!(loaded.payment_type, Some(PaymentType::Credit));
        assert!(loaded.completed_at.is_some());
        assert!(loaded.cancelled_at.is_none());
    }

    #[tokio::test]
    async fn test_list_by_status() {
        let (db, order) = setup().await;

        let pending = db.orders().list(Some(OrderStatus::Pending), 10).await.unwrap();
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].id, order.id);

        let completed = db.orders().list(Some(OrderStatus::Completed), 10).await.unwrap();
        assert!(completed.is_empty());

        let all = db.orders().list(None, 10).await.unwrap();
        assert_eq!(all.len(), 1);
    }
}
