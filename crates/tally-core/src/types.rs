//! # Catalog Types
//!
//! Shared value types and the narrow view of the external catalog that the
//! fulfillment engine consumes.
//!
//! ## Type Overview
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Catalog Types                                   │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │    Category     │   │     Product     │   │   StockLevel    │       │
//! │  │  ─────────────  │   │  ─────────────  │   │  ─────────────  │       │
//! │  │  id             │◄──│  category_id    │   │  on_hand        │       │
//! │  │  discount_bps   │   │  price_cents    │──►│  reserved       │       │
//! │  └─────────────────┘   │  stock_quantity │   │  available()    │       │
//! │                        │  reserved_stock │   └─────────────────┘       │
//! │                        └─────────────────┘                              │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐                              │
//! │  │  DiscountRate   │   │   PaymentType   │                              │
//! │  │  bps (u32)      │   │   Cash | Credit │                              │
//! │  │  1500 = 15%     │   └─────────────────┘                              │
//! │  └─────────────────┘                                                    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use ts_rs::TS;

use uuid::Uuid;

use crate::error::{CoreError, CoreResult};
use crate::money::Money;
use crate::validation::{
    validate_discount_bps, validate_price_cents, validate_required, validate_stock_counters,
};

// =============================================================================
// Discount Rate
// =============================================================================

/// Discount percentage represented in basis points (bps).
///
/// ## Why Basis Points?
/// 1 basis point = 0.01%, so the 0-100% range of a category discount maps to
/// 0-10000 and stays in integer arithmetic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct DiscountRate(u32);

impl DiscountRate {
    /// Upper bound: 100%.
    pub const MAX_BPS: u32 = 10_000;

    #[inline]
    pub const fn from_bps(bps: u32) -> Self {
        DiscountRate(bps)
    }

    /// Creates a discount rate from a percentage (for convenience).
    pub fn from_percentage(pct: f64) -> Self {
        DiscountRate((pct * 100.0).round() as u32)
    }

    #[inline]
    pub const fn bps(&self) -> u32 {
        self.0
    }

    /// Returns the rate as a percentage (for display only).
    #[inline]
    pub fn percentage(&self) -> f64 {
        self.0 as f64 / 100.0
    }

    #[inline]
    pub const fn zero() -> Self {
        DiscountRate(0)
    }

    #[inline]
    pub const fn is_zero(&self) -> bool {
        self.0 == 0
    }
}

impl Default for DiscountRate {
    fn default() -> Self {
        DiscountRate::zero()
    }
}

// =============================================================================
// Payment Type
// =============================================================================

/// How a sale or transaction is settled.
///
/// - `Cash`: collected immediately, posts to `CASH`
/// - `Credit`: a receivable, posts to `ACCOUNTS_RECEIVABLE`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum PaymentType {
    #[default]
    Cash,
    Credit,
}

impl PaymentType {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentType::Cash => "cash",
            PaymentType::Credit => "credit",
        }
    }
}

impl fmt::Display for PaymentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for PaymentType {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "cash" => Ok(PaymentType::Cash),
            "credit" => Ok(PaymentType::Credit),
            _ => Err(crate::error::ValidationError::NotAllowed {
                field: "payment_type".to_string(),
                allowed: vec!["cash".to_string(), "credit".to_string()],
            }
            .into()),
        }
    }
}

// =============================================================================
// Category
// =============================================================================

/// Product category carrying the volume discount.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Category {
    pub id: String,
    pub name: String,
    /// Discount in basis points applied when an order crosses the threshold.
    pub discount_bps: u32,
    pub is_active: bool,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

impl Category {
    /// Creates a validated category (seeding and test fixtures).
    pub fn new(name: impl Into<String>, discount: DiscountRate, now: DateTime<Utc>) -> CoreResult<Self> {
        let name = name.into();
        validate_required("name", &name)?;
        validate_discount_bps(discount.bps())?;

        Ok(Category {
            id: Uuid::new_v4().to_string(),
            name,
            discount_bps: discount.bps(),
            is_active: true,
            created_at: now,
        })
    }

    #[inline]
    pub fn discount(&self) -> DiscountRate {
        DiscountRate::from_bps(self.discount_bps)
    }
}

// =============================================================================
// Product
// =============================================================================

/// A catalog product with its two stock counters.
///
/// `stock_quantity` is physical on-hand stock; `reserved_stock` is the part
/// of it allocated to pending orders.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Product {
    pub id: String,
    pub sku: String,
    pub name: String,
    pub category_id: Option<String>,
    pub price_cents: i64,
    pub stock_quantity: i64,
    pub reserved_stock: i64,
    pub is_active: bool,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

impl Product {
    /// Creates a validated product with nothing reserved.
    pub fn new(
        sku: impl Into<String>,
        name: impl Into<String>,
        category_id: Option<String>,
        price: Money,
        stock_quantity: i64,
        now: DateTime<Utc>,
    ) -> CoreResult<Self> {
        let sku = sku.into();
        let name = name.into();
        validate_required("sku", &sku)?;
        validate_required("name", &name)?;
        validate_price_cents(price.cents())?;
        validate_stock_counters(stock_quantity, 0)?;

        Ok(Product {
            id: Uuid::new_v4().to_string(),
            sku,
            name,
            category_id,
            price_cents: price.cents(),
            stock_quantity,
            reserved_stock: 0,
            is_active: true,
            created_at: now,
            updated_at: now,
        })
    }

    #[inline]
    pub fn price(&self) -> Money {
        Money::from_cents(self.price_cents)
    }

    /// Returns the stock counters as a checked value.
    pub fn stock(&self) -> StockLevel {
        StockLevel {
            on_hand: self.stock_quantity,
            reserved: self.reserved_stock,
        }
    }
}

/// What pricing and reservation need to know about a product.
///
/// Product joined with its active category's discount.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct ProductPricing {
    pub product_id: String,
    pub sku: String,
    pub name: String,
    pub price_cents: i64,
    pub stock_quantity: i64,
    pub reserved_stock: i64,
    pub discount_bps: u32,
}

impl ProductPricing {
    #[inline]
    pub fn price(&self) -> Money {
        Money::from_cents(self.price_cents)
    }

    #[inline]
    pub fn discount(&self) -> DiscountRate {
        DiscountRate::from_bps(self.discount_bps)
    }

    #[inline]
    pub fn available(&self) -> i64 {
        self.stock_quantity - self.reserved_stock
    }
}

// =============================================================================
// Stock Level
// =============================================================================

/// The pair of stock counters with the invariant
/// `0 <= reserved <= on_hand`.
///
/// ## Counter Movements
/// ```text
///                     reserve(q)          commit(q)
///   on_hand:  10  ──────────────► 10  ──────────────► 10 - q
///   reserved:  0  ──────────────►  q  ──────────────►  0
///
///                                      release(q)
///                                 q  ──────────────►  0   (on_hand untouched)
/// ```
///
/// The database applies the same movements with conditional `UPDATE`s; this
/// type is the in-memory mirror used for checks and tests.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct StockLevel {
    pub on_hand: i64,
    pub reserved: i64,
}

impl StockLevel {
    /// Creates a stock level, rejecting counters that break the invariant.
    pub fn new(product_id: &str, on_hand: i64, reserved: i64) -> CoreResult<Self> {
        let level = StockLevel { on_hand, reserved };
        if !level.is_consistent() {
            return Err(CoreError::InsufficientStock {
                product_id: product_id.to_string(),
                available: on_hand - reserved,
                requested: reserved,
            });
        }
        Ok(level)
    }

    #[inline]
    pub fn available(&self) -> i64 {
        self.on_hand - self.reserved
    }

    /// Invariant checker: `0 <= reserved <= on_hand`.
    #[inline]
    pub fn is_consistent(&self) -> bool {
        self.on_hand >= 0 && self.reserved >= 0 && self.reserved <= self.on_hand
    }

    /// Allocates `qty` units to a pending order.
    pub fn reserve(&self, product_id: &str, qty: i64) -> CoreResult<Self> {
        if qty > self.available() {
            return Err(CoreError::InsufficientStock {
                product_id: product_id.to_string(),
                available: self.available(),
                requested: qty,
            });
        }
        Ok(StockLevel {
            on_hand: self.on_hand,
            reserved: self.reserved + qty,
        })
    }

    /// Ships `qty` reserved units. `None` when fewer than `qty` are reserved.
    pub fn commit(&self, qty: i64) -> Option<Self> {
        (self.reserved >= qty).then(|| StockLevel {
            on_hand: self.on_hand - qty,
            reserved: self.reserved - qty,
        })
    }

    /// Returns `qty` reserved units to availability.
    pub fn release(&self, qty: i64) -> Option<Self> {
        (self.reserved >= qty).then(|| StockLevel {
            on_hand: self.on_hand,
            reserved: self.reserved - qty,
        })
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
