//! # Engine Error Type
//!
//! Unified error for back-office workflows.
//!
//! ## Error Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Workflow (orders / billing / ledger)                                  │
//! │       │                                                                 │
//! │       ├── rule violated?  ── CoreError  (InsufficientStock, ...) ──┐   │
//! │       ├── storage failed? ── DbError    (QueryFailed, Conflict) ───┤   │
//! │       └── bad config?     ── ConfigError ──────────────────────────┤   │
//! │                                                                    ▼   │
//! │                                                           EngineError  │
//! │                                                              .code()   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use serde::Serialize;
use tally_core::CoreError;
use tally_db::DbError;
use thiserror::Error;

use crate::config::ConfigError;

pub type EngineResult<T> = Result<T, EngineError>;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error(transparent)]
    Core(#[from] CoreError),

    #[error(transparent)]
    Db(#[from] DbError),

    #[error(transparent)]
    Config(#[from] ConfigError),
}

/// Machine-readable category of an [`EngineError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    NotFound,
    ValidationError,
    InsufficientStock,
    InvalidTransition,
    PaymentError,
    DuplicateInvoice,
    LedgerError,
    Conflict,
    DatabaseError,
    ConfigError,
}

impl EngineError {
    pub fn code(&self) -> ErrorCode {
        match self {
            EngineError::Core(err) => match err {
                CoreError::Validation(_) | CoreError::EmptyOrder => ErrorCode::ValidationError,
                CoreError::NotFound { .. } => ErrorCode::NotFound,
                CoreError::InsufficientStock { .. } => ErrorCode::InsufficientStock,
                CoreError::InvalidTransition { .. } => ErrorCode::InvalidTransition,
                CoreError::AlreadyPaid { .. } | CoreError::Overpayment { .. } => ErrorCode::PaymentError,
                CoreError::DuplicateInvoice { .. } => ErrorCode::DuplicateInvoice,
                CoreError::UnbalancedPosting { .. } | CoreError::PostingInconsistency { .. } => {
                    ErrorCode::LedgerError
                }
            },
            EngineError::Db(err) => match err {
                DbError::NotFound { .. } => ErrorCode::NotFound,
                DbError::Conflict { .. } => ErrorCode::Conflict,
                _ => ErrorCode::DatabaseError,
            },
            EngineError::Config(_) => ErrorCode::ConfigError,
        }
    }

    /// The wrapped rule violation, if this is one.
    pub fn as_core(&self) -> Option<&CoreError> {
        match self {
            EngineError::Core(err) => Some(err),
            _ => None,
        }
    }
}

/// Errors from `commit`/`rollback`, which sqlx reports unwrapped.
impl From<sqlx::Error> for EngineError {
    fn from(err: sqlx::Error) -> Self {
        EngineError::Db(DbError::from(err))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tally_core::Money;

    #[test]
    fn test_error_codes() {
        let err = EngineError::from(CoreError::InsufficientStock {
            product_id: "p".into(),
            available: 1,
            requested: 2,
        });
        assert_eq!(err.code(), ErrorCode::InsufficientStock);
        assert!(err.to_string().contains("available 1"));

        let err = EngineError::from(CoreError::Overpayment {
            invoice_id: "i".into(),
            attempted: Money::from_major(2),
            remaining: Money::from_major(1),
        });
        assert_eq!(err.code(), ErrorCode::PaymentError);

        let err = EngineError::from(DbError::conflict("Invoice", "i"));
        assert_eq!(err.code(), ErrorCode::Conflict);
        assert!(err.as_core().is_none());
    }

    #[test]
    fn test_code_serialization() {
        let json = serde_json::to_string(&ErrorCode::InvalidTransition).unwrap();
        assert_eq!(json, "\"INVALID_TRANSITION\"");
    }
}
