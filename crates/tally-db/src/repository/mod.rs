//! # Repository Module
//!
//! Database repository implementations.
//!
//! ## Two Calling Styles
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Reads (pool)                 db.orders().get_by_id(id)                │
//! │                                                                         │
//! │  Writes (caller's tx)         let mut tx = db.begin().await?;          │
//! │                               OrderRepository::insert(&mut *tx, ..)    │
//! │                               LedgerRepository::insert_posting(..)     │
//! │                               tx.commit().await?;                      │
//! │                                                                         │
//! │  Write functions take `&mut SqliteConnection` so several repositories  │
//! │  can share one transaction.                                            │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Available Repositories
//!
//! - [`product::ProductRepository`] - Catalog and atomic stock counters
//! - [`order::OrderRepository`] - Orders, items and status transitions
//! - [`transaction::TransactionRepository`] - Cash/credit transactions
//! - [`invoice::InvoiceRepository`] - Invoices, receipts, payments, numbering
//! - [`ledger::LedgerRepository`] - Ledger entries and account aggregation

pub mod invoice;
pub mod ledger;
pub mod order;
pub mod product;
pub mod transaction;
