//! # Transactions, Receivables & Invoices
//!
//! ## Lifecycle
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  record_transaction(cash | credit)                                     │
//! │     BEGIN                                                              │
//! │      ├── insert transaction (cash → paid, credit → pending)            │
//! │      ├── next invoice number (atomic sequence)                         │
//! │      └── insert invoice { outstanding, remaining = amount }            │
//! │     COMMIT                                                             │
//! │                                                                         │
//! │  pay_receivable(tx)             apply_invoice_payment(inv, amount)     │
//! │     BEGIN                          BEGIN                               │
//! │      ├── pending → paid             ├── UPDATE ... WHERE paid = prev   │
//! │      └── PAYMENT_RECEIVED pair      ├── audit row                      │
//! │     COMMIT                          └── settled? → receipt invoice     │
//! │                                    COMMIT                              │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! `pay_receivable` settles the transaction and the books; invoice balances
//! move only through `apply_invoice_payment`.

use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::SqliteConnection;
use tracing::{debug, info};

use tally_core::invoice::format_invoice_number;
use tally_core::{
    CoreError, Invoice, InvoiceItem, InvoicePayment, Money, NewTransaction, PaymentMethod, Posting,
    PostingRequest, Transaction,
};
use tally_db::{DbError, InvoiceRepository, NumberSeries, TransactionRepository};

use crate::config::InvoicingSettings;
use crate::error::EngineResult;
use crate::ledger::post_in;
use crate::BackOffice;

#[derive(Debug, Clone, Serialize)]
pub struct RecordedTransaction {
    pub transaction: Transaction,
    pub invoice: Invoice,
}

#[derive(Debug, Clone, Serialize)]
pub struct ReceivablePayment {
    pub transaction: Transaction,
    pub posting: Posting,
}

#[derive(Debug, Clone, Serialize)]
pub struct InvoicePaymentOutcome {
    pub invoice: Invoice,
    pub payment: InvoicePayment,
    /// Issued when this payment settled the invoice.
    pub receipt: Option<Invoice>,
}

fn next_number_prefix(prefix: &str) -> String {
    format!("{}-", prefix)
}

/// Numbers and inserts the invoice of `transaction`.
async fn issue_invoice_in(
    conn: &mut SqliteConnection,
    transaction: &Transaction,
    items: Vec<InvoiceItem>,
    invoicing: &InvoicingSettings,
    now: DateTime<Utc>,
) -> EngineResult<Invoice> {
    let sequence = InvoiceRepository::next_number(conn, NumberSeries::Invoice).await?;
    let number = format_invoice_number(&next_number_prefix(&invoicing.invoice_prefix), sequence);
    let invoice = Invoice::for_transaction(transaction, number, items, invoicing.due_days, now);

    match InvoiceRepository::insert(conn, &invoice).await {
        Ok(()) => Ok(invoice),
        Err(err) if err.is_unique_violation_on("transaction_id") => Err(CoreError::DuplicateInvoice {
            transaction_id: transaction.id.clone(),
        }
        .into()),
        Err(err) => Err(err.into()),
    }
}

impl BackOffice {
    // =========================================================================
    // Transactions
    // =========================================================================

    /// Records a transaction and its invoice atomically.
    ///
    /// Linked orders contribute their items to the invoice snapshot.
    pub async fn record_transaction(&self, new: NewTransaction) -> EngineResult<RecordedTransaction> {
        new.validate()?;
        let items = self.invoice_items_for(new.order_id.as_deref()).await?;

        let now = Utc::now();
        let transaction = new.into_transaction(now);

        let mut tx = self.db.begin().await?;
        TransactionRepository::insert(&mut *tx, &transaction).await?;
        let invoice = issue_invoice_in(&mut *tx, &transaction, items, &self.invoicing, now).await?;
        tx.commit().await?;

        info!(
            transaction_id = %transaction.id,
            customer_id = %transaction.customer_id,
            amount = %transaction.amount(),
            payment_type = %transaction.payment_type,
            status = %transaction.status,
            invoice_number = %invoice.invoice_number,
            "Transaction recorded"
        );
        Ok(RecordedTransaction { transaction, invoice })
    }

    /// Issues the invoice of an existing transaction. A transaction has at
    /// most one non-receipt invoice; a second request is `DuplicateInvoice`.
    pub async fn issue_invoice(&self, transaction_id: &str) -> EngineResult<Invoice> {
        let transaction = self.get_transaction(transaction_id).await?;
        let items = self.invoice_items_for(transaction.order_id.as_deref()).await?;

        let mut tx = self.db.begin().await?;
        let invoice = issue_invoice_in(&mut *tx, &transaction, items, &self.invoicing, Utc::now()).await?;
        tx.commit().await?;

        info!(transaction_id = %transaction_id, invoice_number = %invoice.invoice_number, "Invoice issued");
        Ok(invoice)
    }

    async fn invoice_items_for(&self, order_id: Option<&str>) -> EngineResult<Vec<InvoiceItem>> {
        match order_id {
            Some(order_id) => {
                let order = self.get_order(order_id).await?;
                Ok(order.items.iter().map(InvoiceItem::from).collect())
            }
            None => Ok(Vec::new()),
        }
    }

    pub async fn get_transaction(&self, transaction_id: &str) -> EngineResult<Transaction> {
        self.db
            .transactions()
            .get_by_id(transaction_id)
            .await?
            .ok_or_else(|| CoreError::not_found("Transaction", transaction_id).into())
    }

    /// Collects a pending receivable: marks it paid and posts
    /// `CASH / ACCOUNTS_RECEIVABLE` in the same transaction.
    pub async fn pay_receivable(&self, transaction_id: &str) -> EngineResult<ReceivablePayment> {
        let now = Utc::now();

        let mut tx = self.db.begin().await?;
        if !TransactionRepository::mark_paid(&mut *tx, transaction_id, now).await? {
            tx.rollback().await?;
            let current = self.get_transaction(transaction_id).await?;
            current.status.mark_paid(transaction_id)?;
            return Err(DbError::conflict("Transaction", transaction_id).into());
        }

        let transaction = TransactionRepository::fetch(&mut *tx, transaction_id)
            .await?
            .ok_or_else(|| CoreError::not_found("Transaction", transaction_id))?;
        let request = PostingRequest::payment_received(
            transaction.id.clone(),
            transaction.customer_id.clone(),
            transaction.amount(),
        );
        let posting = post_in(&mut *tx, request).await?;
        tx.commit().await?;

        info!(
            transaction_id = %transaction_id,
            amount = %transaction.amount(),
            posting_id = %posting.posting_id,
            "Receivable collected"
        );
        Ok(ReceivablePayment { transaction, posting })
    }

    /// Pending credit transactions, oldest first.
    pub async fn outstanding_receivables(&self, customer_id: Option<&str>) -> EngineResult<Vec<Transaction>> {
        Ok(self.db.transactions().outstanding_receivables(customer_id).await?)
    }

    // =========================================================================
    // Invoices
    // =========================================================================

    /// Applies a payment to an invoice.
    ///
    /// The write is conditional on the paid amount the payment was computed
    /// from; if a concurrent payment landed first, the payment is rechecked
    /// against fresh state and either rejected with the domain error or
    /// reported as a conflict for the caller to retry.
    pub async fn apply_invoice_payment(
        &self,
        invoice_id: &str,
        amount: Money,
        method: PaymentMethod,
        reference: Option<String>,
    ) -> EngineResult<InvoicePaymentOutcome> {
        let invoice = self.get_invoice(invoice_id).await?;
        let application = invoice.apply_payment(amount)?;
        let now = Utc::now();

        let mut tx = self.db.begin().await?;
        if !InvoiceRepository::apply_payment(&mut *tx, &application, now).await? {
            tx.rollback().await?;
            let fresh = self.get_invoice(invoice_id).await?;
            fresh.apply_payment(amount)?;
            return Err(DbError::conflict("Invoice", invoice_id).into());
        }

        let payment = InvoicePayment::new(invoice_id, amount, method, reference, now);
        InvoiceRepository::insert_payment(&mut *tx, &payment).await?;

        let updated = InvoiceRepository::fetch(&mut *tx, invoice_id)
            .await?
            .ok_or_else(|| CoreError::not_found("Invoice", invoice_id))?;

        let receipt = if application.settles() {
            let sequence = InvoiceRepository::next_number(&mut *tx, NumberSeries::Receipt).await?;
            let number = format_invoice_number(&next_number_prefix(&self.invoicing.receipt_prefix), sequence);
            let receipt = Invoice::receipt_for(&updated, number, amount, now);
            InvoiceRepository::insert(&mut *tx, &receipt).await?;
            Some(receipt)
        } else {
            None
        };
        tx.commit().await?;

        debug!(
            invoice_id = %invoice_id,
            previous_paid = %application.previous_paid,
            paid = %application.paid_amount,
            "Invoice payment written"
        );
        info!(
            invoice_id = %invoice_id,
            amount = %amount,
            remaining = %updated.remaining_amount(),
            status = %updated.status,
            receipt = receipt.as_ref().map(|r| r.invoice_number.as_str()).unwrap_or("-"),
            "Invoice payment applied"
        );

        Ok(InvoicePaymentOutcome {
            invoice: updated,
            payment,
            receipt,
        })
    }

    /// Active or not; listing operations hide inactive invoices.
    pub async fn get_invoice(&self, invoice_id: &str) -> EngineResult<Invoice> {
        self.db
            .invoices()
            .get_by_id(invoice_id)
            .await?
            .ok_or_else(|| CoreError::not_found("Invoice", invoice_id).into())
    }

    pub async fn list_invoices_for_customer(&self, customer_id: &str) -> EngineResult<Vec<Invoice>> {
        Ok(self.db.invoices().list_for_customer(customer_id).await?)
    }

    pub async fn invoice_payments(&self, invoice_id: &str) -> EngineResult<Vec<InvoicePayment>> {
        Ok(self.db.invoices().payments_for(invoice_id).await?)
    }

    /// Soft-deletes an invoice. Missing or already inactive is `NotFound`.
    pub async fn deactivate_invoice(&self, invoice_id: &str) -> EngineResult<()> {
        if !self.db.invoices().deactivate(invoice_id).await? {
            return Err(CoreError::not_found("Invoice", invoice_id).into());
        }
        info!(invoice_id = %invoice_id, "Invoice deactivated");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::EngineError;
    use crate::test_support::office;
    use tally_core::{AccountName, InvoiceStatus, InvoiceType, PaymentType, TransactionStatus};

    #[tokio::test]
    async fn test_cash_transaction_is_paid_with_payment_invoice() {
        let office = office().await;
        let recorded = office
            .record_transaction(NewTransaction::new("cust-1", Money::from_major(20), PaymentType::Cash))
            .await
            .unwrap();

        assert_eq!(recorded.transaction.status, TransactionStatus::Paid);
        assert_eq!(recorded.invoice.invoice_type, InvoiceType::Payment);
        assert_eq!(recorded.invoice.invoice_number, "INV-000001");
        assert_eq!(recorded.invoice.status, InvoiceStatus::Outstanding);

        let err = office.pay_receivable(&recorded.transaction.id).await.unwrap_err();
        assert!(matches!(err, EngineError::Core(CoreError::AlreadyPaid { .. })));
    }

    #[tokio::test]
    async fn test_pay_receivable_posts_payment() {
        let office = office().await;
        let recorded = office
            .record_transaction(NewTransaction::new("cust-1", Money::from_major(500), PaymentType::Credit))
            .await
            .unwrap();
        assert_eq!(recorded.transaction.status, TransactionStatus::Pending);
        assert_eq!(recorded.invoice.invoice_type, InvoiceType::Credit);
        assert_eq!(office.outstanding_receivables(Some("cust-1")).await.unwrap().len(), 1);

        let paid = office.pay_receivable(&recorded.transaction.id).await.unwrap();
        assert_eq!(paid.transaction.status, TransactionStatus::Paid);
        assert_eq!(paid.posting.debit.account_name, AccountName::Cash);
        assert_eq!(paid.posting.credit.account_name, AccountName::AccountsReceivable);
        assert_eq!(paid.posting.debit.transaction_id.as_deref(), Some(recorded.transaction.id.as_str()));
        assert!(office.outstanding_receivables(None).await.unwrap().is_empty());

        // Invoice balances move only through invoice payments.
        let invoice = office.get_invoice(&recorded.invoice.id).await.unwrap();
        assert_eq!(invoice.remaining_amount(), Money::from_major(500));

        let err = office.pay_receivable("missing").await.unwrap_err();
        assert!(matches!(err, EngineError::Core(CoreError::NotFound { .. })));
    }

    #[tokio::test]
    async fn test_second_invoice_is_rejected() {
        let office = office().await;
        let recorded = office
            .record_transaction(NewTransaction::new("cust-1", Money::from_major(5), PaymentType::Credit))
            .await
            .unwrap();

        let err = office.issue_invoice(&recorded.transaction.id).await.unwrap_err();
        assert!(matches!(err, EngineError::Core(CoreError::DuplicateInvoice { .. })));

        // The rejected attempt did not consume a number.
        let next = office
            .record_transaction(NewTransaction::new("cust-1", Money::from_major(5), PaymentType::Credit))
            .await
            .unwrap();
        assert_eq!(next.invoice.invoice_number, "INV-000002");
    }

    #[tokio::test]
    async fn test_payment_rejections() {
        let office = office().await;
        let recorded = office
            .record_transaction(NewTransaction::new("cust-1", Money::from_major(100), PaymentType::Credit))
            .await
            .unwrap();
        let id = recorded.invoice.id.clone();

        let err = office
            .apply_invoice_payment(&id, Money::zero(), PaymentMethod::Cash, None)
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::Core(CoreError::Validation(_))));

        let err = office
            .apply_invoice_payment(&id, Money::from_major(101), PaymentMethod::Cash, None)
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::Core(CoreError::Overpayment { .. })));

        office
            .apply_invoice_payment(&id, Money::from_major(100), PaymentMethod::Card, Some("auth-1".into()))
            .await
            .unwrap();
        let err = office
            .apply_invoice_payment(&id, Money::from_major(1), PaymentMethod::Cash, None)
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::Core(CoreError::InvalidTransition { .. })));

        office.deactivate_invoice(&id).await.unwrap();
        assert!(office.list_invoices_for_customer("cust-1").await.unwrap().iter().all(|i| i.id != id));
        let err = office.deactivate_invoice(&id).await.unwrap_err();
        assert!(matches!(err, EngineError::Core(CoreError::NotFound { .. })));
    }

    #[tokio::test]
    async fn test_inactive_invoice_rejects_payment() {
        let office = office().await;
        let recorded = office
            .record_transaction(NewTransaction::new("cust-1", Money::from_major(100), PaymentType::Credit))
            .await
            .unwrap();
        office.deactivate_invoice(&recorded.invoice.id).await.unwrap();

        let err = office
            .apply_invoice_payment(&recorded.invoice.id, Money::from_major(10), PaymentMethod::Cash, None)
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::Core(CoreError::NotFound { .. })));
    }
}
