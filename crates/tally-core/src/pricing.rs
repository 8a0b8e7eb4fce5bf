//! # Pricing
//!
//! Turns a sale request into priced order lines.
//!
//! ## Two-Phase Pricing
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         price_order()                                   │
//! │                                                                         │
//! │  lines [(P1, 2), (P2, 1), (P1, 3)]                                     │
//! │       │                                                                 │
//! │       ▼  normalize_lines: validate + merge duplicates                  │
//! │  [(P1, 5), (P2, 1)]                                                    │
//! │       │                                                                 │
//! │       ▼  check_availability: qty <= stock - reserved (all-or-nothing)  │
//! │       │                                                                 │
//! │       ▼  PHASE 1: provisional_subtotal at LIST prices                  │
//! │  subtotal = Σ price × qty                                              │
//! │       │                                                                 │
//! │       ▼  PHASE 2: final prices                                         │
//! │  subtotal >= threshold ?                                               │
//! │     yes → final_price = price - category discount (every line)         │
//! │     no  → final_price = price                                          │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The threshold decision depends on the undiscounted total of the WHOLE
//! order, so the phases cannot be collapsed into one loop.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::error::{CoreError, CoreResult, ValidationError};
use crate::money::Money;
use crate::types::{DiscountRate, ProductPricing};
use crate::validation::{validate_quantity, validate_required};
use crate::{DEFAULT_DISCOUNT_THRESHOLD_CENTS, MAX_LINE_QUANTITY, MAX_ORDER_LINES};

// =============================================================================
// Configuration
// =============================================================================

/// Pricing rules injected per deployment (or tenant).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PricingConfig {
    /// Order subtotal (at list prices) from which category discounts apply.
    pub discount_threshold: Money,

    /// Largest quantity accepted on a single line.
    pub max_line_quantity: i64,

    /// Largest number of distinct lines in one order.
    pub max_order_lines: usize,
}

impl Default for PricingConfig {
    fn default() -> Self {
        PricingConfig {
            discount_threshold: Money::from_cents(DEFAULT_DISCOUNT_THRESHOLD_CENTS),
            max_line_quantity: MAX_LINE_QUANTITY,
            max_order_lines: MAX_ORDER_LINES,
        }
    }
}

// =============================================================================
// Request & Result Types
// =============================================================================

/// One `(product, quantity)` pair of a sale request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct OrderLineRequest {
    pub product_id: String,
    pub quantity: i64,
}

impl OrderLineRequest {
    pub fn new(product_id: impl Into<String>, quantity: i64) -> Self {
        OrderLineRequest {
            product_id: product_id.into(),
            quantity,
        }
    }
}

/// A line with its price fixed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct PricedLine {
    pub product_id: String,
    pub sku: String,
    pub name: String,
    pub quantity: i64,
    /// List price per unit.
    pub unit_price: Money,
    /// Discount actually applied (zero below the threshold).
    pub discount: DiscountRate,
    /// Price per unit after discount.
    pub final_price: Money,
    /// `final_price × quantity`.
    pub line_total: Money,
}

/// Output of the pricing engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct PricedOrder {
    pub lines: Vec<PricedLine>,
    /// Σ list price × quantity.
    pub original_total: Money,
    /// Σ final price × quantity.
    pub final_total: Money,
    /// Whether the subtotal crossed the discount threshold.
    pub discount_applied: bool,
}

impl PricedOrder {
    pub fn total_discount(&self) -> Money {
        self.original_total - self.final_total
    }
}

// =============================================================================
// Line Normalization
// =============================================================================

/// Validates request lines and merges repeated products.
///
/// Merging matters for reservation: two lines of the same product must be
/// checked against availability as one quantity.
pub fn normalize_lines(
    config: &PricingConfig,
    lines: &[OrderLineRequest],
) -> CoreResult<Vec<OrderLineRequest>> {
    if lines.is_empty() {
        return Err(CoreError::EmptyOrder);
    }

    let mut merged: Vec<OrderLineRequest> = Vec::with_capacity(lines.len());
    for line in lines {
        validate_required("product_id", &line.product_id)?;
        validate_quantity(line.quantity, config.max_line_quantity)?;

        match merged.iter_mut().find(|m| m.product_id == line.product_id) {
            Some(existing) => existing.quantity = existing.quantity.saturating_add(line.quantity),
            None => merged.push(line.clone()),
        }
    }

    for line in &merged {
        validate_quantity(line.quantity, config.max_line_quantity)?;
    }

    if merged.len() > config.max_order_lines {
        return Err(ValidationError::OutOfRange {
            field: "order lines".to_string(),
            min: 1,
            max: config.max_order_lines as i64,
            value: merged.len() as i64,
        }
        .into());
    }

    Ok(merged)
}

// =============================================================================
// Availability
// =============================================================================

fn lookup<'a>(
    catalog: &'a HashMap<String, ProductPricing>,
    product_id: &str,
) -> CoreResult<&'a ProductPricing> {
    catalog
        .get(product_id)
        .ok_or_else(|| CoreError::not_found("Product", product_id))
}

/// Verifies every line fits in available stock; the first failing line
/// rejects the whole request.
///
/// This is the read-side check. The database re-checks atomically while
/// reserving, which is what actually prevents oversell.
pub fn check_availability(
    lines: &[OrderLineRequest],
    catalog: &HashMap<String, ProductPricing>,
) -> CoreResult<()> {
    for line in lines {
        let product = lookup(catalog, &line.product_id)?;
        if line.quantity > product.available() {
            return Err(CoreError::InsufficientStock {
                product_id: line.product_id.clone(),
                available: product.available(),
                requested: line.quantity,
            });
        }
    }
    Ok(())
}

// =============================================================================
// Phase 1 & Phase 2
// =============================================================================

fn overflow(field: &str) -> CoreError {
    ValidationError::Overflow {
        field: field.to_string(),
    }
    .into()
}

fn line_total(price: Money, quantity: i64) -> CoreResult<Money> {
    price.checked_mul_quantity(quantity).ok_or_else(|| overflow("line_total"))
}

/// PHASE 1: subtotal at list prices.
pub fn provisional_subtotal(
    lines: &[OrderLineRequest],
    catalog: &HashMap<String, ProductPricing>,
) -> CoreResult<Money> {
    let mut subtotal = Money::zero();
    for line in lines {
        let product = lookup(catalog, &line.product_id)?;
        subtotal = subtotal
            .checked_add(line_total(product.price(), line.quantity)?)
            .ok_or_else(|| overflow("subtotal"))?;
    }
    Ok(subtotal)
}

/// Whether a subtotal qualifies for category discounts.
#[inline]
pub fn qualifies_for_discount(config: &PricingConfig, subtotal: Money) -> bool {
    subtotal >= config.discount_threshold
}

/// PHASE 2: fix each line's final price.
pub fn apply_final_prices(
    lines: &[OrderLineRequest],
    catalog: &HashMap<String, ProductPricing>,
    discount_applies: bool,
) -> CoreResult<Vec<PricedLine>> {
    lines
        .iter()
        .map(|line| {
            let product = lookup(catalog, &line.product_id)?;
            let discount = if discount_applies {
                product.discount()
            } else {
                DiscountRate::zero()
            };
            let final_price = product.price().apply_discount(discount);
            let total = line_total(final_price, line.quantity)?;

            Ok(PricedLine {
                product_id: line.product_id.clone(),
                sku: product.sku.clone(),
                name: product.name.clone(),
                quantity: line.quantity,
                unit_price: product.price(),
                discount,
                final_price,
                line_total: total,
            })
        })
        .collect()
}

/// Prices a whole order.
///
/// `lines` must already be normalized (see [`normalize_lines`]).
pub fn price_order(
    config: &PricingConfig,
    lines: &[OrderLineRequest],
    catalog: &HashMap<String, ProductPricing>,
) -> CoreResult<PricedOrder> {
    if lines.is_empty() {
        return Err(CoreError::EmptyOrder);
    }

    check_availability(lines, catalog)?;

    let original_total = provisional_subtotal(lines, catalog)?;
    let discount_applied = qualifies_for_discount(config, original_total);
    let priced = apply_final_prices(lines, catalog, discount_applied)?;
    let final_total = Money::checked_sum(priced.iter().map(|l| l.line_total)).ok_or_else(|| overflow("total"))?;

    Ok(PricedOrder {
        lines: priced,
        original_total,
        final_total,
        discount_applied,
    })
}

// =============================================================================
// Unit Tests
// =============================================================================
