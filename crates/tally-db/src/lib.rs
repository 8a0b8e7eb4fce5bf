//! # tally-db: Persistence for the Back-Office Engine
//!
//! SQLite storage for catalog, orders, transactions, invoices and the
//! ledger, using sqlx for async access.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  tally-engine (BackOffice workflows)                                   │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                     tally-db (THIS CRATE)                       │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────────┐    ┌───────────────┐    ┌──────────────┐  │   │
//! │  │   │   Database    │    │  Repositories │    │  Migrations  │  │   │
//! │  │   │   (pool.rs)   │    │               │    │  (embedded)  │  │   │
//! │  │   │               │    │ Product       │    │              │  │   │
//! │  │   │ SqlitePool    │◄───│ Order         │    │ 001_initial  │  │   │
//! │  │   │ begin()       │    │ Transaction   │    │   _schema    │  │   │
//! │  │   │               │    │ Invoice       │    │              │  │   │
//! │  │   │               │    │ Ledger        │    │              │  │   │
//! │  │   └───────────────┘    └───────────────┘    └──────────────┘  │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  SQLite (WAL)                                                          │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Organization
//!
//! - [`pool`] - Connection pool creation and configuration
//! - [`migrations`] - Embedded database migrations
//! - [`error`] - Database error types
//! - [`repository`] - Repository implementations
//!
//! ## Usage
//!
//! ```rust,ignore
//! use tally_db::{Database, DbConfig, OrderRepository};
//!
//! let db = Database::new(DbConfig::new("tally.db")).await?;
//!
//! let mut tx = db.begin().await?;
//! OrderRepository::insert(&mut tx, &order).await?;
//! tx.commit().await?;
//!
//! let order = db.orders().get_by_id(&order.id).await?;
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod migrations;
pub mod pool;
pub mod repository;

// =============================================================================
// Re-exports
// =============================================================================

pub use error::{DbError, DbResult};
pub use pool::{Database, DbConfig};

pub use repository::invoice::{InvoiceRepository, NumberSeries};
pub use repository::ledger::LedgerRepository;
pub use repository::order::OrderRepository;
pub use repository::product::{ProductRepository, StockUpdate};
pub use repository::transaction::TransactionRepository;
