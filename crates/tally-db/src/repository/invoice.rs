//! # Invoice Repository
//!
//! Invoices, their number sequences, and the payment audit trail.
//!
//! ## Invoice Numbering
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Count-then-format races: two writers both see 41 rows → both "42".   │
//! │                                                                         │
//! │  Instead, one counter row per series, bumped atomically:              │
//! │                                                                         │
//! │  UPDATE invoice_sequences SET next_value = next_value + 1             │
//! │   WHERE name = 'invoice'                                               │
//! │  RETURNING next_value - 1          → 42 (only this writer gets it)    │
//! │                                                                         │
//! │  invoices.invoice_number is UNIQUE as a backstop.                      │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::{DateTime, Utc};
use sqlx::types::Json;
use sqlx::{SqliteConnection, SqlitePool};
use tracing::debug;

use crate::error::{DbError, DbResult};
use tally_core::{Invoice, InvoicePayment, PaymentApplication};

const COLUMNS: &str = r#"
    id, invoice_number, invoice_type, transaction_id, customer_id, order_id,
    original_amount_cents, paid_amount_cents, remaining_amount_cents, status,
    due_date, items, is_active, settles_invoice_id, created_at, updated_at
"#;

/// A number series backed by a row in `invoice_sequences`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NumberSeries {
    Invoice,
    Receipt,
}

impl NumberSeries {
    fn key(&self) -> &'static str {
        match self {
            NumberSeries::Invoice => "invoice",
            NumberSeries::Receipt => "receipt",
        }
    }
}

#[derive(Debug, Clone)]
pub struct InvoiceRepository {
    pool: SqlitePool,
}

impl InvoiceRepository {
    pub fn new(pool: SqlitePool) -> Self {
        InvoiceRepository { pool }
    }

    // =========================================================================
    // Reads
    // =========================================================================

    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Invoice>> {
        let mut conn = self.pool.acquire().await?;
        Self::fetch(&mut conn, id).await
    }

    pub async fn fetch(conn: &mut SqliteConnection, id: &str) -> DbResult<Option<Invoice>> {
        let invoice = sqlx::query_as::<_, Invoice>(&format!("SELECT {} FROM invoices WHERE id = ?1", COLUMNS))
            .bind(id)
            .fetch_optional(&mut *conn)
            .await?;

        Ok(invoice)
    }

    /// The non-receipt invoice of a transaction, if any.
    pub async fn find_for_transaction(&self, transaction_id: &str) -> DbResult<Option<Invoice>> {
        let invoice = sqlx::query_as::<_, Invoice>(&format!(
            "SELECT {} FROM invoices WHERE transaction_id = ?1 AND invoice_type != 'receipt'",
            COLUMNS
        ))
        .bind(transaction_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(invoice)
    }

    /// The receipt issued when `invoice_id` was settled.
    pub async fn find_receipt_for(&self, invoice_id: &str) -> DbResult<Option<Invoice>> {
        let invoice = sqlx::query_as::<_, Invoice>(&format!(
            "SELECT {} FROM invoices WHERE settles_invoice_id = ?1 AND invoice_type = 'receipt'",
            COLUMNS
        ))
        .bind(invoice_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(invoice)
    }

    /// A customer's active invoices, newest first.
    pub async fn list_for_customer(&self, customer_id: &str) -> DbResult<Vec<Invoice>> {
        let invoices = sqlx::query_as::<_, Invoice>(&format!(
            r#"
            SELECT {} FROM invoices
            WHERE customer_id = ?1 AND is_active = 1
            ORDER BY created_at DESC, invoice_number DESC
            "#,
            COLUMNS
        ))
        .bind(customer_id)
        .fetch_all(&self.pool)
        .await?;

        debug!(customer_id = %customer_id, count = invoices.len(), "Listed invoices");
        Ok(invoices)
    }

    /// Payment audit trail of an invoice, oldest first.
    pub async fn payments_for(&self, invoice_id: &str) -> DbResult<Vec<InvoicePayment>> {
        let payments = sqlx::query_as::<_, InvoicePayment>(
            r#"
            SELECT id, invoice_id, amount_cents, method, reference, created_at
            FROM invoice_payments
            WHERE invoice_id = ?1
            ORDER BY created_at ASC, rowid ASC
            "#,
        )
        .bind(invoice_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(payments)
    }

    // =========================================================================
    // Writes
    // =========================================================================

    /// Takes the next value of a number series.
    pub async fn next_number(conn: &mut SqliteConnection, series: NumberSeries) -> DbResult<i64> {
        let value: Option<i64> = sqlx::query_scalar(
            r#"
            UPDATE invoice_sequences
            SET next_value = next_value + 1
            WHERE name = ?1
            RETURNING next_value - 1
            "#,
        )
        .bind(series.key())
        .fetch_optional(&mut *conn)
        .await?;

        value.ok_or_else(|| DbError::not_found("Invoice sequence", series.key()))
    }

    pub async fn insert(conn: &mut SqliteConnection, invoice: &Invoice) -> DbResult<()> {
        debug!(
            id = %invoice.id,
            number = %invoice.invoice_number,
            transaction_id = %invoice.transaction_id,
            amount = invoice.original_amount_cents,
            "Inserting invoice"
        );

        sqlx::query(
            r#"
            INSERT INTO invoices (
                id, invoice_number, invoice_type, transaction_id, customer_id, order_id,
                original_amount_cents, paid_amount_cents, remaining_amount_cents, status,
                due_date, items, is_active, settles_invoice_id, created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16)
            "#,
        )
        .bind(&invoice.id)
        .bind(&invoice.invoice_number)
        .bind(invoice.invoice_type)
        .bind(&invoice.transaction_id)
        .bind(&invoice.customer_id)
        .bind(&invoice.order_id)
        .bind(invoice.original_amount_cents)
        .bind(invoice.paid_amount_cents)
        .bind(invoice.remaining_amount_cents)
        .bind(invoice.status)
        .bind(invoice.due_date)
        .bind(Json(&invoice.items))
        .bind(invoice.is_active)
        .bind(&invoice.settles_invoice_id)
        .bind(invoice.created_at)
        .bind(invoice.updated_at)
        .execute(&mut *conn)
        .await?;

        Ok(())
    }

    /// Writes a computed payment, conditional on the paid amount it was
    /// computed from. Returns `false` if another payment got there first
    /// (or the invoice was deactivated meanwhile).
    pub async fn apply_payment(
        conn: &mut SqliteConnection,
        application: &PaymentApplication,
        now: DateTime<Utc>,
    ) -> DbResult<bool> {
        debug!(
            invoice_id = %application.invoice_id,
            amount = application.amount.cents(),
            status = %application.status,
            "Applying invoice payment"
        );

        let result = sqlx::query(
            r#"
            UPDATE invoices
            SET paid_amount_cents = ?2,
                remaining_amount_cents = ?3,
                status = ?4,
                updated_at = ?5
            WHERE id = ?1
              AND paid_amount_cents = ?6
              AND is_active = 1
              AND status != 'paid'
            "#,
        )
        .bind(&application.invoice_id)
        .bind(application.paid_amount.cents())
        .bind(application.remaining_amount.cents())
        .bind(application.status)
        .bind(now)
        .bind(application.previous_paid.cents())
        .execute(&mut *conn)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    pub async fn insert_payment(conn: &mut SqliteConnection, payment: &InvoicePayment) -> DbResult<()> {
        sqlx::query(
            r#"
            INSERT INTO invoice_payments (id, invoice_id, amount_cents, method, reference, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            "#,
        )
        .bind(&payment.id)
        .bind(&payment.invoice_id)
        .bind(payment.amount_cents)
        .bind(payment.method)
        .bind(&payment.reference)
        .bind(payment.created_at)
        .execute(&mut *conn)
        .await?;

        Ok(())
    }

    /// Soft-deletes an invoice. Returns `false` if it was already inactive.
    pub async fn deactivate(&self, id: &str) -> DbResult<bool> {
        debug!(id = %id, "Deactivating invoice");

        let result = sqlx::query(
            "UPDATE invoices SET is_active = 0, updated_at = ?2 WHERE id = ?1 AND is_active = 1",
        )
        .bind(id)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() == 1)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::transaction::TransactionRepository;
    use crate::{Database, DbConfig};
    use tally_core::invoice::format_invoice_number;
    use tally_core::{InvoiceStatus, Money, NewTransaction, PaymentMethod, PaymentType, Transaction};

    async fn setup() -> (Database, Transaction, Invoice) {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let now = Utc::now();
        let transaction = NewTransaction::new("cust-1", Money::from_major(500), PaymentType::Credit).into_transaction(now);

        let mut conn = db.pool().acquire().await.unwrap();
        TransactionRepository::insert(&mut conn, &transaction).await.unwrap();
        let number = InvoiceRepository::next_number(&mut conn, NumberSeries::Invoice).await.unwrap();
        let invoice = Invoice::for_transaction(&transaction, format_invoice_number("INV-", number), vec![], 30, now);
        InvoiceRepository::insert(&mut conn, &invoice).await.unwrap();
        drop(conn);

        (db, transaction, invoice)
    }

    #[tokio::test]
    async fn test_sequences_are_independent_and_increasing() {
        let (db, _, invoice) = setup().await;
        assert_eq!(invoice.invoice_number, "INV-000001");

        let mut conn = db.pool().acquire().await.unwrap();
        assert_eq!(InvoiceRepository::next_number(&mut conn, NumberSeries::Invoice).await.unwrap(), 2);
        assert_eq!(InvoiceRepository::next_number(&mut conn, NumberSeries::Receipt).await.unwrap(), 1);
        assert_eq!(InvoiceRepository::next_number(&mut conn, NumberSeries::Invoice).await.unwrap(), 3);
    }

    #[tokio::test]
    async fn test_second_invoice_for_transaction_rejected() {
        let (db, transaction, _) = setup().await;

        let duplicate = Invoice::for_transaction(&transaction, "INV-999999".into(), vec![], 30, Utc::now());
        let mut conn = db.pool().acquire().await.unwrap();
        let err = InvoiceRepository::insert(&mut conn, &duplicate).await.unwrap_err();
        assert!(err.is_unique_violation_on("transaction_id"), "unexpected error: {err:?}");
    }

    #[tokio::test]
    async fn test_receipt_allowed_alongside_invoice() {
        let (db, _, invoice) = setup().await;

        let receipt = Invoice::receipt_for(&invoice, "RCT-000001".into(), Money::from_major(500), Utc::now());
        let mut conn = db.pool().acquire().await.unwrap();
        InvoiceRepository::insert(&mut conn, &receipt).await.unwrap();
        drop(conn);

        let found = db.invoices().find_receipt_for(&invoice.id).await.unwrap().unwrap();
        assert_eq!(found.id, receipt.id);
        assert_eq!(db.invoices().list_for_customer("cust-1").await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_conditional_payment_update() {
        let (db, _, invoice) = setup().await;
        let application = invoice.apply_payment(Money::from_major(200)).unwrap();

        let mut conn = db.pool().acquire().await.unwrap();
        assert!(InvoiceRepository::apply_payment(&mut conn, &application, Utc::now()).await.unwrap());
        // Same stale application again: paid amount no longer matches.
        assert!(!InvoiceRepository::apply_payment(&mut conn, &application, Utc::now()).await.unwrap());

        let payment = InvoicePayment::new(&invoice.id, application.amount, PaymentMethod::Card, None, Utc::now());
        InvoiceRepository::insert_payment(&mut conn, &payment).await.unwrap();
        drop(conn);

        let loaded = db.invoices().get_by_id(&invoice.id).await.unwrap().unwrap();
        assert_eq!(loaded.status, InvoiceStatus::Partial);
        assert_eq!(loaded.remaining_amount(), Money::from_major(300));
        assert_eq!(db.invoices().payments_for(&invoice.id).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_deactivate_hides_invoice_from_listing() {
        let (db, transaction, invoice) = setup().await;

        assert!(db.invoices().deactivate(&invoice.id).await.unwrap());
        assert!(!db.invoices().deactivate(&invoice.id).await.unwrap());
        assert!(db.invoices().list_for_customer("cust-1").await.unwrap().is_empty());

        let found = db.invoices().find_for_transaction(&transaction.id).await.unwrap().unwrap();
        assert!(!found.is_active);
    }
}
