//! # Validation Module
//!
//! Input validation run before any business logic or database work.
//!
//! ## Validation Layers
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Layer 1: Caller (API / UI)                                            │
//! │  └── Shape of the request                                              │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 2: THIS MODULE                                                  │
//! │  ├── quantities ≥ 1, amounts > 0                                       │
//! │  └── ids present, discount within 0-100%                           │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 3: Database (SQLite)                                            │
//! │  ├── CHECK constraints on counters and amounts                         │
//! │  └── UNIQUE / FOREIGN KEY constraints                                  │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust
//! use tally_core::validation::{validate_quantity, validate_amount_cents};
//!
//! assert!(validate_quantity(5, 999).is_ok());
//! assert!(validate_amount_cents("amount", 0).is_err());
//! ```

use crate::error::ValidationError;
use crate::types::DiscountRate;

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

// =============================================================================
// Numeric Validators
// =============================================================================

/// Validates an order line quantity.
///
/// ## Rules
/// - Must be positive (>= 1)
/// - Must not exceed `max` (configured per deployment)
pub fn validate_quantity(qty: i64, max: i64) -> ValidationResult<()> {
    if qty <= 0 {
        return Err(ValidationError::MustBePositive {
            field: "quantity".to_string(),
            value: qty,
        });
    }

    if qty > max {
        return Err(ValidationError::OutOfRange {
            field: "quantity".to_string(),
            min: 1,
            max,
            value: qty,
        });
    }

    Ok(())
}

/// Validates a price in cents. Zero is allowed (free items).
///
/// ```rust
/// use tally_core::validation::validate_price_cents;
///
/// assert!(validate_price_cents(1099).is_ok());
/// assert!(validate_price_cents(0).is_ok());
/// assert!(validate_price_cents(-100).is_err());
/// ```
pub fn validate_price_cents(cents: i64) -> ValidationResult<()> {
    if cents < 0 {
        return Err(ValidationError::OutOfRange {
            field: "price".to_string(),
            min: 0,
            max: i64::MAX,
            value: cents,
        });
    }

    Ok(())
}

/// Validates a monetary amount that must be strictly positive
/// (transaction amounts, payments, journal postings).
pub fn validate_amount_cents(field: &str, cents: i64) -> ValidationResult<()> {
    if cents <= 0 {
        return Err(ValidationError::MustBePositive {
            field: field.to_string(),
            value: cents,
        });
    }

    Ok(())
}

/// Validates a category discount (0% to 100%).
pub fn validate_discount_bps(bps: u32) -> ValidationResult<()> {
    if bps > DiscountRate::MAX_BPS {
        return Err(ValidationError::OutOfRange {
            field: "discount".to_string(),
            min: 0,
            max: DiscountRate::MAX_BPS as i64,
            value: bps as i64,
        });
    }

    Ok(())
}

/// Validates initial stock counters for a catalog product.
pub fn validate_stock_counters(stock_quantity: i64, reserved_stock: i64) -> ValidationResult<()> {
    if stock_quantity < 0 {
        return Err(ValidationError::OutOfRange {
            field: "stock_quantity".to_string(),
            min: 0,
            max: i64::MAX,
            value: stock_quantity,
        });
    }

    if reserved_stock < 0 || reserved_stock > stock_quantity {
        return Err(ValidationError::OutOfRange {
            field: "reserved_stock".to_string(),
            min: 0,
            max: stock_quantity,
            value: reserved_stock,
        });
    }

    Ok(())
}

// =============================================================================
// String Validators
// =============================================================================

/// Validates a free-text field (notes, descriptions).
pub fn validate_text(field: &str, value: &str, max: usize) -> ValidationResult<()> {
    if value.len() > max {
        return Err(ValidationError::TooLong {
            field: field.to_string(),
            max,
        });
    }

    Ok(())
}

/// Validates that an identifier is present (any non-blank string).
pub fn validate_required(field: &str, value: &str) -> ValidationResult<()> {
    if value.trim().is_empty() {
        return Err(ValidationError::Required {
            field: field.to_string(),
        });
    }

    Ok(())
}

// =============================================================================
// Unit Tests
// =============================================================================
