//! # tally-engine: Order Fulfillment & Ledger Workflows
//!
//! [`BackOffice`] is the entry point: every operation that spans more than
//! one repository runs here, inside the database transactions it needs.
//!
//! ## Sale Data Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  place_order(lines)                                                    │
//! │     │  price (two phases) + reserve stock, all-or-nothing              │
//! │     ▼                                                                   │
//! │  Order { pending }                                                     │
//! │     │                                                                   │
//! │     ├── set_order_status(cancelled) → release reserved stock           │
//! │     │                                                                   │
//! │     └── set_order_status(completed) → commit reserved stock            │
//! │              │                                                          │
//! │              ▼  (separate transaction, failure reported not rolled     │
//! │           SALE posting            back)                                │
//! │                                                                         │
//! │  record_transaction(cash|credit) → Transaction + Invoice               │
//! │     │                                                                   │
//! │     ├── pay_receivable        → Paid + PAYMENT_RECEIVED posting        │
//! │     └── apply_invoice_payment → Partial/Paid (+ Receipt when settled)  │
//! │                                                                         │
//! │  trial_balance / profit_and_loss / balance_sheet ← ACTIVE entries      │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust,ignore
//! use tally_engine::{BackOffice, EngineConfig};
//! use tally_core::{OrderLineRequest, OrderStatusChange, PaymentType, PlaceOrderRequest};
//!
//! let config = EngineConfig::load(None)?;
//! let office = BackOffice::open(&config).await?;
//!
//! let order = office
//!     .place_order(PlaceOrderRequest::new("clerk-1", vec![OrderLineRequest::new(product_id, 2)]))
//!     .await?;
//! office
//!     .set_order_status(&order.id, OrderStatusChange::complete(PaymentType::Cash))
//!     .await?;
//! ```

pub mod billing;
pub mod config;
pub mod error;
pub mod ledger;
pub mod orders;
pub mod telemetry;

pub use billing::{InvoicePaymentOutcome, RecordedTransaction, ReceivablePayment};
pub use config::{ConfigError, ConfigResult, EngineConfig};
pub use error::{EngineError, EngineResult, ErrorCode};
pub use ledger::PostingReversal;
pub use orders::{LedgerOutcome, OrderTransition};

use tally_core::pricing::PricingConfig;
use tally_db::Database;
use tracing::info;

use crate::config::InvoicingSettings;

/// Default page size for list operations.
pub const DEFAULT_LIST_LIMIT: u32 = 100;

/// Back-office facade over one database.
///
/// Cheap to clone; clones share the connection pool.
#[derive(Debug, Clone)]
pub struct BackOffice {
    db: Database,
    pricing: PricingConfig,
    invoicing: InvoicingSettings,
}

impl BackOffice {
    pub fn new(db: Database, config: &EngineConfig) -> Self {
        BackOffice {
            db,
            pricing: config.pricing_config(),
            invoicing: config.invoicing.clone(),
        }
    }

    /// Default pricing and invoicing rules.
    pub fn with_defaults(db: Database) -> Self {
        Self::new(db, &EngineConfig::default())
    }

    /// Opens (and migrates) the configured database.
    pub async fn open(config: &EngineConfig) -> EngineResult<Self> {
        let db = Database::new(config.db_config()?).await?;
        info!(
            threshold = %config.pricing_config().discount_threshold,
            due_days = config.invoicing.due_days,
            "Back office ready"
        );
        Ok(Self::new(db, config))
    }

    /// Underlying database, for catalog seeding and ad-hoc reads.
    pub fn db(&self) -> &Database {
        &self.db
    }

    pub fn pricing(&self) -> &PricingConfig {
        &self.pricing
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use chrono::Utc;
    use tally_core::{Category, DiscountRate, Money, Product};
    use tally_db::{Database, DbConfig};

    use crate::BackOffice;

    pub async fn office() -> BackOffice {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        BackOffice::with_defaults(db)
    }

    /// Inserts a product, under a discounted category when `discount_bps > 0`.
    pub async fn product(office: &BackOffice, sku: &str, price_cents: i64, stock: i64, discount_bps: u32) -> Product {
        let now = Utc::now();
        let category_id = if discount_bps > 0 {
            let category = Category::new(format!("cat-{}", sku), DiscountRate::from_bps(discount_bps), now).unwrap();
            office.db().products().insert_category(&category).await.unwrap();
            Some(category.id)
        } else {
            None
        };

        let product = Product::new(sku, format!("Product {}", sku), category_id, Money::from_cents(price_cents), stock, now).unwrap();
        office.db().products().insert(&product).await.unwrap();
        product
    }
}
