//! # Order Workflows
//!
//! ## Placing an Order
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  normalize lines (merge duplicates, quantity limits)                   │
//! │       │                                                                 │
//! │  read catalog ──► price_order: availability, phase 1, phase 2          │
//! │       │                                                                 │
//! │  BEGIN                                                                 │
//! │   ├── try_reserve(line 1)   UPDATE ... WHERE available >= q            │
//! │   ├── try_reserve(line n)   rejected? → drop tx (rollback), error      │
//! │   └── insert order + items                                             │
//! │  COMMIT                                                                │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The catalog read only prices the order. Reservation re-checks
//! availability atomically, so two requests racing for the last units
//! cannot both succeed.
//!
//! ## Leaving `pending`
//! The status update (`WHERE status = 'pending'`) is the first statement of
//! the transaction, so the write lock is taken before anything is read and a
//! losing racer matches zero rows. Stock effects commit with it. The SALE
//! posting for a completion runs afterwards in its own transaction.

use chrono::Utc;
use serde::Serialize;
use sqlx::SqliteConnection;
use tracing::{debug, error, info, warn};

use tally_core::order::SkippedStockLine;
use tally_core::pricing::{normalize_lines, price_order};
use tally_core::{
    CoreError, Order, OrderItem, OrderStatus, OrderStatusChange, PlaceOrderRequest, Posting,
    PostingRequest, StockEffect,
};
use tally_db::{DbError, OrderRepository, ProductRepository, StockUpdate};

use crate::error::EngineResult;
use crate::BackOffice;

/// Result of a successful status change.
#[derive(Debug, Clone, Serialize)]
pub struct OrderTransition {
    pub order: Order,
    /// Items whose stock adjustment was skipped (logged at `warn`).
    pub skipped: Vec<SkippedStockLine>,
    pub ledger: LedgerOutcome,
}

/// What happened to the bookkeeping side of a transition.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum LedgerOutcome {
    /// Cancellations and zero-value orders post nothing.
    NotRequired,
    Posted(Posting),
    /// The order is completed and its stock committed; the SALE posting
    /// failed and needs operator attention.
    Failed { reason: String },
}

impl LedgerOutcome {
    pub fn posting(&self) -> Option<&Posting> {
        match self {
            LedgerOutcome::Posted(posting) => Some(posting),
            _ => None,
        }
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, LedgerOutcome::Failed { .. })
    }
}

impl BackOffice {
    // =========================================================================
    // Place
    // =========================================================================

    /// Prices the request and reserves stock for every line, or for none.
    pub async fn place_order(&self, request: PlaceOrderRequest) -> EngineResult<Order> {
        request.validate()?;
        let lines = normalize_lines(&self.pricing, &request.lines)?;

        let ids: Vec<&str> = lines.iter().map(|l| l.product_id.as_str()).collect();
        let catalog = self.db.products().get_pricing_many(&ids).await?;
        let priced = price_order(&self.pricing, &lines, &catalog)?;

        debug!(
            lines = lines.len(),
            original_total = %priced.original_total,
            final_total = %priced.final_total,
            discount_applied = priced.discount_applied,
            "Order priced"
        );

        let order = Order::from_priced(&request, &priced, Utc::now());

        let mut tx = self.db.begin().await?;
        for line in &lines {
            match ProductRepository::try_reserve(&mut *tx, &line.product_id, line.quantity).await {
                Ok(StockUpdate::Applied(level)) => {
                    debug!(product_id = %line.product_id, reserved = level.reserved, "Stock reserved");
                }
                Ok(StockUpdate::Rejected(level)) => {
                    debug!(
                        product_id = %line.product_id,
                        requested = line.quantity,
                        available = level.available(),
                        "Reservation rejected, rolling back order"
                    );
                    return Err(CoreError::InsufficientStock {
                        product_id: line.product_id.clone(),
                        available: level.available(),
                        requested: line.quantity,
                    }
                    .into());
                }
                Err(DbError::NotFound { .. }) => {
                    return Err(CoreError::not_found("Product", &line.product_id).into());
                }
                Err(err) => return Err(err.into()),
            }
        }

        OrderRepository::insert(&mut *tx, &order).await?;
        tx.commit().await?;

        info!(
            order_id = %order.id,
            items = order.items.len(),
            total = %order.total(),
            "Order placed"
        );
        Ok(order)
    }

    // =========================================================================
    // Transition
    // =========================================================================

    /// Moves a pending order to `completed` or `cancelled`.
    ///
    /// Completion commits reserved stock and then posts the SALE pair
    /// (payment type defaults to cash). Cancellation releases reserved stock.
    /// Items whose counters no longer allow the adjustment are skipped and
    /// reported in the result.
    pub async fn set_order_status(&self, order_id: &str, change: OrderStatusChange) -> EngineResult<OrderTransition> {
        let target = change.status;
        let Some(effect) = target.stock_effect() else {
            let order = self.get_order(order_id).await?;
            return Err(CoreError::invalid_transition("Order", order_id, order.status, target).into());
        };

        let payment_type = match effect {
            StockEffect::Commit => Some(change.payment_type.unwrap_or_default()),
            StockEffect::Release => None,
        };

        let mut tx = self.db.begin().await?;
        let moved = OrderRepository::transition(&mut *tx, order_id, target, payment_type, Utc::now()).await?;
        if !moved {
            tx.rollback().await?;
            let order = self.get_order(order_id).await?;
            order.status.transition_to(order_id, target)?;
            // Still pending yet the guarded update matched nothing.
            return Err(DbError::conflict("Order", order_id).into());
        }

        let items = OrderRepository::fetch_items(&mut *tx, order_id).await?;
        let mut skipped = Vec::new();
        for item in &items {
            if !adjust_item_stock(&mut *tx, item, effect).await? {
                skipped.push(SkippedStockLine {
                    product_id: item.product_id.clone(),
                    quantity: item.quantity,
                });
            }
        }

        let order = OrderRepository::fetch(&mut *tx, order_id)
            .await?
            .ok_or_else(|| CoreError::not_found("Order", order_id))?;
        tx.commit().await?;

        info!(
            order_id = %order_id,
            status = %order.status,
            skipped = skipped.len(),
            "Order status changed"
        );

        let ledger = match effect {
            StockEffect::Commit => self.post_sale(&order).await,
            StockEffect::Release => LedgerOutcome::NotRequired,
        };

        Ok(OrderTransition { order, skipped, ledger })
    }

    async fn post_sale(&self, order: &Order) -> LedgerOutcome {
        if order.total().is_zero() {
            debug!(order_id = %order.id, "Zero-value order, nothing to post");
            return LedgerOutcome::NotRequired;
        }

        let request = PostingRequest::sale(
            order.id.clone(),
            order.customer_id.clone(),
            order.total(),
            order.payment_type.unwrap_or_default(),
        );

        match self.post(request).await {
            Ok(posting) => LedgerOutcome::Posted(posting),
            Err(err) => {
                error!(
                    order_id = %order.id,
                    amount = %order.total(),
                    error = %err,
                    "SALE posting failed after order completion"
                );
                LedgerOutcome::Failed {
                    reason: err.to_string(),
                }
            }
        }
    }

    // =========================================================================
    // Queries
    // =========================================================================

    pub async fn get_order(&self, order_id: &str) -> EngineResult<Order> {
        self.db
            .orders()
            .get_by_id(order_id)
            .await?
            .ok_or_else(|| CoreError::not_found("Order", order_id).into())
    }

    /// Newest first, without items.
    pub async fn list_orders(&self, status: Option<OrderStatus>, limit: u32) -> EngineResult<Vec<Order>> {
        Ok(self.db.orders().list(status, limit).await?)
    }
}

/// Applies one item's stock effect. `false` when skipped.
async fn adjust_item_stock(conn: &mut SqliteConnection, item: &OrderItem, effect: StockEffect) -> EngineResult<bool> {
    let result = match effect {
        StockEffect::Commit => ProductRepository::commit_reserved(conn, &item.product_id, item.quantity).await,
        StockEffect::Release => ProductRepository::release_reserved(conn, &item.product_id, item.quantity).await,
    };

    match result {
        Ok(StockUpdate::Applied(_)) => Ok(true),
        Ok(StockUpdate::Rejected(level)) => {
            warn!(
                product_id = %item.product_id,
                quantity = item.quantity,
                reserved = level.reserved,
                effect = effect.as_str(),
                "Reserved stock below item quantity, skipping"
            );
            Ok(false)
        }
        Err(DbError::NotFound { .. }) => {
            warn!(product_id = %item.product_id, effect = effect.as_str(), "Product missing, skipping");
            Ok(false)
        }
        Err(err) => Err(err.into()),
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
