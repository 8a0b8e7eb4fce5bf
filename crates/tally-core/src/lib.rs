//! # tally-core: Pure Business Logic for the Tally Back Office
//!
//! Pricing, order state, ledger postings, reports and invoice math as pure
//! functions with zero I/O.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                     Tally Back Office Architecture                      │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │              tally-engine (workflows, config, logging)          │   │
//! │  │   place_order ─ set_order_status ─ record_transaction ─ ...    │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │               ★ tally-core (THIS CRATE) ★                       │   │
//! │  │                                                                 │   │
//! │  │   ┌─────────┐ ┌─────────┐ ┌─────────┐ ┌─────────┐ ┌─────────┐ │   │
//! │  │   │ pricing │ │  order  │ │ ledger  │ │ reports │ │ invoice │ │   │
//! │  │   └─────────┘ └─────────┘ └─────────┘ └─────────┘ └─────────┘ │   │
//! │  │   money · types · validation · error                           │   │
//! │  │                                                                 │   │
//! │  │   NO I/O • NO DATABASE • NO NETWORK                             │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │                    tally-db (Database Layer)                    │   │
//! │  │       SQLite repositories, atomic stock counters, migrations    │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`money`] - Money type with integer arithmetic
//! - [`types`] - Catalog view, discount rates, stock counters
//! - [`pricing`] - Two-phase pricing with the volume-discount threshold
//! - [`order`] - Orders and the order state machine
//! - [`ledger`] - Chart of accounts and balanced postings
//! - [`reports`] - Trial balance, P&L, balance sheet
//! - [`invoice`] - Transactions, invoices, payment application
//! - [`validation`] - Input checks
//! - [`error`] - Domain error types
//!
//! ## Example Usage
//!
//! ```rust
//! use std::collections::HashMap;
//! use tally_core::pricing::{price_order, OrderLineRequest, PricingConfig};
//! use tally_core::{Money, ProductPricing};
//!
//! let mut catalog = HashMap::new();
//! catalog.insert(
//!     "p-1".to_string(),
//!     ProductPricing {
//!         product_id: "p-1".to_string(),
//!         sku: "TV-55".to_string(),
//!         name: "55\" TV".to_string(),
//!         price_cents: Money::from_major(150_000).cents(),
//!         stock_quantity: 4,
//!         reserved_stock: 0,
//!         discount_bps: 1000, // 10%
//!     },
//! );
//!
//! // 2 × 150,000.00 reaches the 300,000.00 threshold
//! let lines = vec![OrderLineRequest::new("p-1", 2)];
//! let priced = price_order(&PricingConfig::default(), &lines, &catalog).unwrap();
//! assert!(priced.discount_applied);
//! assert_eq!(priced.final_total, Money::from_major(270_000));
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod invoice;
pub mod ledger;
pub mod money;
pub mod order;
pub mod pricing;
pub mod reports;
pub mod types;
pub mod validation;

// =============================================================================
// Re-exports for Convenience
// =============================================================================

pub use error::{CoreError, CoreResult, ValidationError};
pub use invoice::{
    Invoice, InvoiceItem, InvoicePayment, InvoiceStatus, InvoiceType, NewTransaction,
    PaymentApplication, PaymentMethod, Transaction, TransactionStatus,
};
pub use ledger::{
    AccountName, AccountType, EntryFilter, EntryType, LedgerEntry, LedgerStatus, Posting,
    PostingRequest,
};
pub use money::Money;
pub use order::{Order, OrderItem, OrderStatus, OrderStatusChange, PlaceOrderRequest, StockEffect};
pub use pricing::{OrderLineRequest, PricedOrder, PricingConfig};
pub use reports::{AccountBalance, AccountTotals, BalanceSheet, DateRange, ProfitAndLoss, TrialBalance};
pub use types::*;

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// Default discount threshold: 300,000.00 in minor units.
///
/// Orders whose list-price subtotal reaches this amount get their category
/// discounts. Overridable through `PricingConfig`.
pub const DEFAULT_DISCOUNT_THRESHOLD_CENTS: i64 = 30_000_000;

/// Maximum distinct lines in one order.
pub const MAX_ORDER_LINES: usize = 100;

/// Maximum quantity on a single order line.
///
/// Catches typos like 1000 instead of 10.
pub const MAX_LINE_QUANTITY: i64 = 10_000;

/// Maximum length of notes and descriptions.
pub const MAX_NOTES_LENGTH: usize = 1_000;

/// Default days until an invoice is due.
pub const DEFAULT_DUE_DAYS: i64 = 30;
