//! # Error Types
//!
//! Domain-specific error types for tally-core.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Error Types                                     │
//! │                                                                         │
//! │  tally-core errors (this file)                                         │
//! │  ├── CoreError        - Business rule violations                       │
//! │  └── ValidationError  - Malformed input                                │
//! │                                                                         │
//! │  tally-db errors                                                       │
//! │  └── DbError          - Database operation failures                    │
//! │                                                                         │
//! │  tally-engine errors                                                   │
//! │  └── EngineError      - CoreError | DbError | ConfigError              │
//! │                                                                         │
//! │  Flow: ValidationError → CoreError → EngineError → caller              │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Every variant carries enough context (entity id, attempted value,
//! current value) for the caller to build a precise message.

use thiserror::Error;

use crate::money::Money;

// =============================================================================
// Core Error
// =============================================================================

/// Core business logic errors.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Malformed input (empty field, non-positive amount, ...).
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    /// A sale request without any line items.
    #[error("Order must contain at least one item")]
    EmptyOrder,

    /// Referenced entity does not exist (or is soft-deleted).
    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },

    /// Reserving `requested` units would exceed availability.
    ///
    /// ## User Workflow
    /// ```text
    /// place_order([{ product: P1, qty: 5 }])
    ///      │
    ///      ▼
    /// stock_quantity=10, reserved_stock=7 → available=3
    ///      │
    ///      ▼
    /// InsufficientStock { product_id: "P1", available: 3, requested: 5 }
    /// ```
    #[error("Insufficient stock for product {product_id}: available {available}, requested {requested}")]
    InsufficientStock {
        product_id: String,
        available: i64,
        requested: i64,
    },

    /// Status change attempted from a state that does not allow it.
    #[error("{entity} {id} cannot move from {from} to {to}")]
    InvalidTransition {
        entity: &'static str,
        id: String,
        from: String,
        to: String,
    },

    /// Receivable has already been collected.
    #[error("Transaction {transaction_id} is already paid")]
    AlreadyPaid { transaction_id: String },

    /// Payment larger than what is left on the invoice.
    #[error("Payment of {attempted} exceeds remaining amount {remaining} on invoice {invoice_id}")]
    Overpayment {
        invoice_id: String,
        attempted: Money,
        remaining: Money,
    },

    /// A second invoice was requested for one transaction.
    #[error("Invoice already exists for transaction {transaction_id}")]
    DuplicateInvoice { transaction_id: String },

    /// A posting request whose two sides cannot form a valid pair.
    #[error("Unbalanced posting: {reason}")]
    UnbalancedPosting { reason: String },

    /// Trial balance does not reconcile. Indicates a posting bug; surfaced
    /// to an operator, never auto-corrected.
    #[error("Books do not reconcile: total debit {total_debit}, total credit {total_credit}")]
    PostingInconsistency {
        total_debit: Money,
        total_credit: Money,
    },
}

impl CoreError {
    /// Creates a NotFound error for a given entity type and ID.
    pub fn not_found(entity: &'static str, id: impl Into<String>) -> Self {
        CoreError::NotFound {
            entity,
            id: id.into(),
        }
    }

    /// Creates an InvalidTransition error from any displayable states.
    pub fn invalid_transition(
        entity: &'static str,
        id: impl Into<String>,
        from: impl std::fmt::Display,
        to: impl std::fmt::Display,
    ) -> Self {
        CoreError::InvalidTransition {
            entity,
            id: id.into(),
            from: from.to_string(),
            to: to.to_string(),
        }
    }
}

// =============================================================================
// Validation Error
// =============================================================================

/// Input validation errors.
///
/// Raised before any business logic or database work runs.
#[derive(Debug, Error)]
pub enum ValidationError {
    /// A required field is missing or empty.
    #[error("{field} is required")]
    Required { field: String },

    /// Field value is too long.
    #[error("{field} must be at most {max} characters")]
    TooLong { field: String, max: usize },

    /// Numeric value is out of range.
    #[error("{field} must be between {min} and {max}, got {value}")]
    OutOfRange {
        field: String,
        min: i64,
        max: i64,
        value: i64,
    },

    /// Computed amount does not fit in i64 minor units.
    #[error("{field} exceeds the largest representable amount")]
    Overflow { field: String },

    /// Value must be positive.
    #[error("{field} must be positive, got {value}")]
    MustBePositive { field: String, value: i64 },

    /// Invalid format (e.g., invalid UUID).
    #[error("{field} has invalid format: {reason}")]
    InvalidFormat { field: String, reason: String },

    /// Value is not in allowed set.
    #[error("{field} must be one of: {allowed:?}")]
    NotAllowed { field: String, allowed: Vec<String> },
}

// =============================================================================
// Result Type Alias
// =============================================================================

/// Convenience type alias for Results with CoreError.
pub type CoreResult<T> = Result<T, CoreError>;

// =============================================================================
// Unit Tests
// =============================================================================
