//! # Orders
//!
//! Order records and the order state machine.
//!
//! ## State Machine
//! ```text
//!                  ┌──────────────┐
//!                  │   pending    │  (stock reserved)
//!                  └──────┬───────┘
//!            ┌────────────┴────────────┐
//!            ▼                         ▼
//!   ┌─────────────────┐       ┌─────────────────┐
//!   │    completed    │       │    cancelled    │
//!   │ stock committed │       │ stock released  │
//!   │ SALE posted     │       │                 │
//!   └─────────────────┘       └─────────────────┘
//!        terminal                  terminal
//! ```
//!
//! Items and their final prices are frozen when the order is placed; only
//! the status (and the payment type chosen at completion) ever changes.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use ts_rs::TS;
use uuid::Uuid;

use crate::error::{CoreError, CoreResult, ValidationError};
use crate::money::Money;
use crate::pricing::{OrderLineRequest, PricedLine, PricedOrder};
use crate::types::{DiscountRate, PaymentType};
use crate::validation::{validate_required, validate_text};
use crate::MAX_NOTES_LENGTH;

// =============================================================================
// Order Status
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    /// Stock is reserved; awaiting completion or cancellation.
    #[default]
    Pending,
    /// Stock committed and the sale posted.
    Completed,
    /// Reservation released.
    Cancelled,
}

impl OrderStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Pending => "pending",
            OrderStatus::Completed => "completed",
            OrderStatus::Cancelled => "cancelled",
        }
    }

    #[inline]
    pub fn is_terminal(&self) -> bool {
        !matches!(self, OrderStatus::Pending)
    }

    /// Validates a status change for order `order_id`.
    ///
    /// Only `pending → completed` and `pending → cancelled` exist.
    pub fn transition_to(self, order_id: &str, target: OrderStatus) -> CoreResult<OrderStatus> {
        match (self, target) {
            (OrderStatus::Pending, OrderStatus::Completed)
            | (OrderStatus::Pending, OrderStatus::Cancelled) => Ok(target),
            _ => Err(CoreError::invalid_transition("Order", order_id, self, target)),
        }
    }

    /// What a transition into `self` does to each item's stock counters.
    pub fn stock_effect(&self) -> Option<StockEffect> {
        match self {
            OrderStatus::Pending => None,
            OrderStatus::Completed => Some(StockEffect::Commit),
            OrderStatus::Cancelled => Some(StockEffect::Release),
        }
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for OrderStatus {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "pending" => Ok(OrderStatus::Pending),
            "completed" => Ok(OrderStatus::Completed),
            "cancelled" => Ok(OrderStatus::Cancelled),
            _ => Err(ValidationError::NotAllowed {
                field: "status".to_string(),
                allowed: vec![
                    "pending".to_string(),
                    "completed".to_string(),
                    "cancelled".to_string(),
                ],
            }
            .into()),
        }
    }
}

/// Stock movement applied per item when an order leaves `pending`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StockEffect {
    /// `stock_quantity -= q; reserved_stock -= q`
    Commit,
    /// `reserved_stock -= q`
    Release,
}

impl StockEffect {
    pub fn as_str(&self) -> &'static str {
        match self {
            StockEffect::Commit => "commit",
            StockEffect::Release => "release",
        }
    }
}

/// An item whose stock adjustment was skipped because the product no longer
/// held enough reserved units.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct SkippedStockLine {
    pub product_id: String,
    pub quantity: i64,
}

// =============================================================================
// Order
// =============================================================================

/// A customer order. `items` is loaded separately from `order_items`.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Order {
    pub id: String,
    pub customer_id: Option<String>,
    pub status: OrderStatus,
    /// Set when the order completes.
    pub payment_type: Option<PaymentType>,
    /// Σ list price × quantity.
    pub original_total_cents: i64,
    /// Σ final price × quantity.
    pub total_cents: i64,
    pub created_by: String,
    pub notes: Option<String>,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
    #[ts(as = "Option<String>")]
    pub completed_at: Option<DateTime<Utc>>,
    #[ts(as = "Option<String>")]
    pub cancelled_at: Option<DateTime<Utc>>,
    #[cfg_attr(feature = "sqlx", sqlx(skip))]
    #[serde(default)]
    pub items: Vec<OrderItem>,
}

impl Order {
    /// Builds a new pending order from priced lines.
    pub fn from_priced(request: &PlaceOrderRequest, priced: &PricedOrder, now: DateTime<Utc>) -> Self {
        let id = Uuid::new_v4().to_string();
        let items = priced
            .lines
            .iter()
            .map(|line| OrderItem::from_priced_line(&id, line, now))
            .collect();

        Order {
            id,
            customer_id: request.customer_id.clone(),
            status: OrderStatus::Pending,
            payment_type: None,
            original_total_cents: priced.original_total.cents(),
            total_cents: priced.final_total.cents(),
            created_by: request.created_by.clone(),
            notes: request.notes.clone(),
            created_at: now,
            updated_at: now,
            completed_at: None,
            cancelled_at: None,
            items,
        }
    }

    #[inline]
    pub fn total(&self) -> Money {
        Money::from_cents(self.total_cents)
    }

    #[inline]
    pub fn original_total(&self) -> Money {
        Money::from_cents(self.original_total_cents)
    }

    pub fn discount_total(&self) -> Money {
        self.original_total() - self.total()
    }
}

/// A frozen order line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct OrderItem {
    pub id: String,
    pub order_id: String,
    pub product_id: String,
    pub sku_snapshot: String,
    pub name_snapshot: String,
    pub quantity: i64,
    /// List price per unit at time of order.
    pub unit_price_cents: i64,
    /// Price per unit after discount.
    pub final_price_cents: i64,
    /// Discount actually applied, in basis points.
    pub discount_bps: u32,
    pub line_total_cents: i64,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

impl OrderItem {
    fn from_priced_line(order_id: &str, line: &PricedLine, now: DateTime<Utc>) -> Self {
        OrderItem {
            id: Uuid::new_v4().to_string(),
            order_id: order_id.to_string(),
            product_id: line.product_id.clone(),
            sku_snapshot: line.sku.clone(),
            name_snapshot: line.name.clone(),
            quantity: line.quantity,
            unit_price_cents: line.unit_price.cents(),
            final_price_cents: line.final_price.cents(),
            discount_bps: line.discount.bps(),
            line_total_cents: line.line_total.cents(),
            created_at: now,
        }
    }

    #[inline]
    pub fn unit_price(&self) -> Money {
        Money::from_cents(self.unit_price_cents)
    }

    #[inline]
    pub fn final_price(&self) -> Money {
        Money::from_cents(self.final_price_cents)
    }

    #[inline]
    pub fn line_total(&self) -> Money {
        Money::from_cents(self.line_total_cents)
    }

    #[inline]
    pub fn discount(&self) -> DiscountRate {
        DiscountRate::from_bps(self.discount_bps)
    }
}

// =============================================================================
// Requests
// =============================================================================

/// A sale request.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct PlaceOrderRequest {
    pub customer_id: Option<String>,
    pub created_by: String,
    pub lines: Vec<OrderLineRequest>,
    pub notes: Option<String>,
}

impl PlaceOrderRequest {
    pub fn new(created_by: impl Into<String>, lines: Vec<OrderLineRequest>) -> Self {
        PlaceOrderRequest {
            customer_id: None,
            created_by: created_by.into(),
            lines,
            notes: None,
        }
    }

    pub fn with_customer(mut self, customer_id: impl Into<String>) -> Self {
        self.customer_id = Some(customer_id.into());
        self
    }

    /// Validates the header fields. Lines are validated by
    /// [`crate::pricing::normalize_lines`].
    pub fn validate(&self) -> CoreResult<()> {
        validate_required("created_by", &self.created_by)?;
        if let Some(customer_id) = &self.customer_id {
            validate_required("customer_id", customer_id)?;
        }
        if let Some(notes) = &self.notes {
            validate_text("notes", notes, MAX_NOTES_LENGTH)?;
        }
        Ok(())
    }
}

/// A requested status change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct OrderStatusChange {
    pub status: OrderStatus,
    /// Only meaningful for completion; defaults to cash.
    pub payment_type: Option<PaymentType>,
}

impl OrderStatusChange {
    pub fn complete(payment_type: PaymentType) -> Self {
        OrderStatusChange {
            status: OrderStatus::Completed,
            payment_type: Some(payment_type),
        }
    }

    pub fn cancel() -> Self {
        OrderStatusChange {
            status: OrderStatus::Cancelled,
            payment_type: None,
        }
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
