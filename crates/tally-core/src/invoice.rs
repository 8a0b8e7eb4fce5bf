//! # Transactions & Invoices
//!
//! Customer-facing cash/credit transactions and the invoices derived from
//! them.
//!
//! ## Invoice Lifecycle
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  record_transaction(amount = 500, Credit)                              │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  Transaction { Pending }  +  Invoice { Outstanding, paid 0, rem 500 }  │
//! │                                                                         │
//! │  apply_payment(200)  → Invoice { Partial,     paid 200, rem 300 }      │
//! │  apply_payment(300)  → Invoice { Paid,        paid 500, rem 0   }      │
//! │                            └──► Receipt invoice { amount 300, Paid }   │
//! │                                                                         │
//! │  Status only moves forward: Outstanding → Partial → Paid.              │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use ts_rs::TS;
use uuid::Uuid;

use crate::error::{CoreError, CoreResult, ValidationError};
use crate::money::Money;
use crate::order::OrderItem;
use crate::types::PaymentType;
use crate::validation::{validate_amount_cents, validate_required, validate_text};
use crate::MAX_NOTES_LENGTH;

// =============================================================================
// Transaction
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum TransactionStatus {
    /// An open receivable.
    Pending,
    Paid,
}

impl TransactionStatus {
    /// Cash is collected on the spot; credit starts as a receivable.
    pub fn default_for(payment_type: PaymentType) -> Self {
        match payment_type {
            PaymentType::Cash => TransactionStatus::Paid,
            PaymentType::Credit => TransactionStatus::Pending,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionStatus::Pending => "pending",
            TransactionStatus::Paid => "paid",
        }
    }

    /// `Pending → Paid`; anything else means the money was already collected.
    pub fn mark_paid(self, transaction_id: &str) -> CoreResult<TransactionStatus> {
        match self {
            TransactionStatus::Pending => Ok(TransactionStatus::Paid),
            TransactionStatus::Paid => Err(CoreError::AlreadyPaid {
                transaction_id: transaction_id.to_string(),
            }),
        }
    }
}

impl fmt::Display for TransactionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Transaction {
    pub id: String,
    pub customer_id: String,
    pub amount_cents: i64,
    pub payment_type: PaymentType,
    pub status: TransactionStatus,
    pub order_id: Option<String>,
    pub notes: Option<String>,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "Option<String>")]
    pub paid_at: Option<DateTime<Utc>>,
}

impl Transaction {
    #[inline]
    pub fn amount(&self) -> Money {
        Money::from_cents(self.amount_cents)
    }
}

/// Input for recording a transaction.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct NewTransaction {
    pub customer_id: String,
    pub amount: Money,
    pub payment_type: PaymentType,
    pub order_id: Option<String>,
    pub notes: Option<String>,
    /// Overrides the status derived from `payment_type`.
    pub status: Option<TransactionStatus>,
}

impl NewTransaction {
    pub fn new(customer_id: impl Into<String>, amount: Money, payment_type: PaymentType) -> Self {
        NewTransaction {
            customer_id: customer_id.into(),
            amount,
            payment_type,
            order_id: None,
            notes: None,
            status: None,
        }
    }

    pub fn for_order(mut self, order_id: impl Into<String>) -> Self {
        self.order_id = Some(order_id.into());
        self
    }

    pub fn with_notes(mut self, notes: impl Into<String>) -> Self {
        self.notes = Some(notes.into());
        self
    }

    pub fn with_status(mut self, status: TransactionStatus) -> Self {
        self.status = Some(status);
        self
    }

    pub fn validate(&self) -> CoreResult<()> {
        validate_required("customer_id", &self.customer_id)?;
        validate_amount_cents("amount", self.amount.cents())?;
        if let Some(notes) = &self.notes {
            validate_text("notes", notes, MAX_NOTES_LENGTH)?;
        }
        Ok(())
    }

    /// Materializes the transaction with its resolved status.
    pub fn into_transaction(self, now: DateTime<Utc>) -> Transaction {
        let status = self
            .status
            .unwrap_or_else(|| TransactionStatus::default_for(self.payment_type));

        Transaction {
            id: Uuid::new_v4().to_string(),
            customer_id: self.customer_id,
            amount_cents: self.amount.cents(),
            payment_type: self.payment_type,
            status,
            order_id: self.order_id,
            notes: self.notes,
            created_at: now,
            paid_at: (status == TransactionStatus::Paid).then_some(now),
        }
    }
}

// =============================================================================
// Invoice Type & Status
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum InvoiceType {
    Sales,
    Payment,
    Credit,
    /// Documents the payment that settled another invoice.
    Receipt,
}

impl InvoiceType {
    /// Order-linked transactions invoice as sales; otherwise by payment type.
    pub fn for_transaction(payment_type: PaymentType, linked_to_order: bool) -> Self {
        match (linked_to_order, payment_type) {
            (true, _) => InvoiceType::Sales,
            (false, PaymentType::Credit) => InvoiceType::Credit,
            (false, PaymentType::Cash) => InvoiceType::Payment,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            InvoiceType::Sales => "sales",
            InvoiceType::Payment => "payment",
            InvoiceType::Credit => "credit",
            InvoiceType::Receipt => "receipt",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum InvoiceStatus {
    Outstanding,
    Partial,
    Paid,
}

impl InvoiceStatus {
    /// Derives the status from the amounts.
    pub fn derive(original: Money, paid: Money) -> Self {
        if (original - paid) <= Money::zero() {
            InvoiceStatus::Paid
        } else if paid.is_positive() {
            InvoiceStatus::Partial
        } else {
            InvoiceStatus::Outstanding
        }
    }

    fn rank(&self) -> u8 {
        match self {
            InvoiceStatus::Outstanding => 0,
            InvoiceStatus::Partial => 1,
            InvoiceStatus::Paid => 2,
        }
    }

    /// Status never moves backwards.
    pub fn can_advance_to(&self, next: InvoiceStatus) -> bool {
        next.rank() >= self.rank()
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            InvoiceStatus::Outstanding => "outstanding",
            InvoiceStatus::Partial => "partial",
            InvoiceStatus::Paid => "paid",
        }
    }
}

impl fmt::Display for InvoiceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// =============================================================================
// Invoice
// =============================================================================

/// Snapshot of an order line printed on an invoice.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct InvoiceItem {
    pub product_id: String,
    pub name: String,
    pub quantity: i64,
    pub unit_price_cents: i64,
    pub final_price_cents: i64,
    pub line_total_cents: i64,
}

impl From<&OrderItem> for InvoiceItem {
    fn from(item: &OrderItem) -> Self {
        InvoiceItem {
            product_id: item.product_id.clone(),
            name: item.name_snapshot.clone(),
            quantity: item.quantity,
            unit_price_cents: item.unit_price_cents,
            final_price_cents: item.final_price_cents,
            line_total_cents: item.line_total_cents,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Invoice {
    pub id: String,
    pub invoice_number: String,
    pub invoice_type: InvoiceType,
    pub transaction_id: String,
    pub customer_id: String,
    pub order_id: Option<String>,
    pub original_amount_cents: i64,
    pub paid_amount_cents: i64,
    /// Always `original_amount_cents − paid_amount_cents`.
    pub remaining_amount_cents: i64,
    pub status: InvoiceStatus,
    #[ts(as = "String")]
    pub due_date: DateTime<Utc>,
    #[cfg_attr(feature = "sqlx", sqlx(json))]
    pub items: Vec<InvoiceItem>,
    pub is_active: bool,
    /// Receipts only: the invoice this receipt settles.
    pub settles_invoice_id: Option<String>,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

impl Invoice {
    /// Invoice derived from a freshly recorded transaction.
    pub fn for_transaction(
        transaction: &Transaction,
        invoice_number: String,
        items: Vec<InvoiceItem>,
        due_days: i64,
        now: DateTime<Utc>,
    ) -> Self {
        let original = transaction.amount();
        let paid = Money::zero();

        Invoice {
            id: Uuid::new_v4().to_string(),
            invoice_number,
            invoice_type: InvoiceType::for_transaction(
                transaction.payment_type,
                transaction.order_id.is_some(),
            ),
            transaction_id: transaction.id.clone(),
            customer_id: transaction.customer_id.clone(),
            order_id: transaction.order_id.clone(),
            original_amount_cents: original.cents(),
            paid_amount_cents: paid.cents(),
            remaining_amount_cents: (original - paid).cents(),
            status: InvoiceStatus::derive(original, paid),
            due_date: now + Duration::days(due_days),
            items,
            is_active: true,
            settles_invoice_id: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Receipt documenting the payment that settled `settled`.
    pub fn receipt_for(
        settled: &Invoice,
        receipt_number: String,
        settling_payment: Money,
        now: DateTime<Utc>,
    ) -> Self {
        Invoice {
            id: Uuid::new_v4().to_string(),
            invoice_number: receipt_number,
            invoice_type: InvoiceType::Receipt,
            transaction_id: settled.transaction_id.clone(),
            customer_id: settled.customer_id.clone(),
            order_id: settled.order_id.clone(),
            original_amount_cents: settling_payment.cents(),
            paid_amount_cents: settling_payment.cents(),
            remaining_amount_cents: 0,
            status: InvoiceStatus::Paid,
            due_date: now,
            items: Vec::new(),
            is_active: true,
            settles_invoice_id: Some(settled.id.clone()),
            created_at: now,
            updated_at: now,
        }
    }

    #[inline]
    pub fn original_amount(&self) -> Money {
        Money::from_cents(self.original_amount_cents)
    }

    #[inline]
    pub fn paid_amount(&self) -> Money {
        Money::from_cents(self.paid_amount_cents)
    }

    #[inline]
    pub fn remaining_amount(&self) -> Money {
        Money::from_cents(self.remaining_amount_cents)
    }

    /// Checks and computes the effect of a payment without mutating anything.
    ///
    /// ## Rejections
    /// - `amount <= 0` → `Validation`
    /// - inactive invoice → `NotFound`
    /// - already paid → `InvalidTransition`
    /// - `amount > remaining` → `Overpayment`
    pub fn apply_payment(&self, amount: Money) -> CoreResult<PaymentApplication> {
        validate_amount_cents("amount", amount.cents())?;

        if !self.is_active {
            return Err(CoreError::not_found("Invoice", &self.id));
        }
        if self.status == InvoiceStatus::Paid {
            return Err(CoreError::invalid_transition(
                "Invoice",
                &self.id,
                self.status,
                InvoiceStatus::Paid,
            ));
        }
        if amount > self.remaining_amount() {
            return Err(CoreError::Overpayment {
                invoice_id: self.id.clone(),
                attempted: amount,
                remaining: self.remaining_amount(),
            });
        }

        let paid_amount = self.paid_amount() + amount;
        let remaining_amount = self.original_amount() - paid_amount;
        let status = InvoiceStatus::derive(self.original_amount(), paid_amount);
        debug_assert!(self.status.can_advance_to(status));

        Ok(PaymentApplication {
            invoice_id: self.id.clone(),
            amount,
            previous_paid: self.paid_amount(),
            paid_amount,
            remaining_amount,
            status,
        })
    }
}

// =============================================================================
// Payments
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    #[default]
    Cash,
    Card,
    BankTransfer,
    Other,
}

impl std::str::FromStr for PaymentMethod {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "cash" => Ok(PaymentMethod::Cash),
            "card" => Ok(PaymentMethod::Card),
            "bank_transfer" => Ok(PaymentMethod::BankTransfer),
            "other" => Ok(PaymentMethod::Other),
            _ => Err(ValidationError::NotAllowed {
                field: "method".to_string(),
                allowed: ["cash", "card", "bank_transfer", "other"]
                    .iter()
                    .map(|s| s.to_string())
                    .collect(),
            }
            .into()),
        }
    }
}

/// Audit record of one applied payment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct InvoicePayment {
    pub id: String,
    pub invoice_id: String,
    pub amount_cents: i64,
    pub method: PaymentMethod,
    pub reference: Option<String>,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

impl InvoicePayment {
    pub fn new(
        invoice_id: impl Into<String>,
        amount: Money,
        method: PaymentMethod,
        reference: Option<String>,
        now: DateTime<Utc>,
    ) -> Self {
        InvoicePayment {
            id: Uuid::new_v4().to_string(),
            invoice_id: invoice_id.into(),
            amount_cents: amount.cents(),
            method,
            reference,
            created_at: now,
        }
    }

    #[inline]
    pub fn amount(&self) -> Money {
        Money::from_cents(self.amount_cents)
    }
}

/// The computed effect of a payment on an invoice.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentApplication {
    pub invoice_id: String,
    pub amount: Money,
    /// Paid amount the update is conditional on.
    pub previous_paid: Money,
    pub paid_amount: Money,
    pub remaining_amount: Money,
    pub status: InvoiceStatus,
}

impl PaymentApplication {
    pub fn settles(&self) -> bool {
        self.status == InvoiceStatus::Paid
    }
}

// =============================================================================
// Numbering
// =============================================================================

/// `("INV-", 1)` → `INV-000001`.
pub fn format_invoice_number(prefix: &str, sequence: i64) -> String {
    format!("{}{:06}", prefix, sequence)
}

// =============================================================================
// Unit Tests
// =============================================================================
