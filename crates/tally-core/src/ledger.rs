//! # Ledger
//!
//! Chart of accounts, ledger entries, and construction of balanced postings.
//!
//! ## Posting Shape
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  PostingRequest ──into_posting()──► Posting { posting_id, [debit,      │
//! │                                                           credit] }     │
//! │                                                                         │
//! │  SALE (cash)         debit CASH                 credit SALES_REVENUE    │
//! │  SALE (credit)       debit ACCOUNTS_RECEIVABLE  credit SALES_REVENUE    │
//! │  PAYMENT_RECEIVED    debit CASH                 credit ACCOUNTS_RECV.   │
//! │  journal             debit <any>                credit <any other>      │
//! │  reversal            mirror of an ACTIVE posting, type ADJUSTMENT       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Every posting has exactly two entries of the same amount, one debit and
//! one credit, so `Σ debit = Σ credit` holds over any set of whole postings.
//! Entries are never edited; corrections change only `status`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use ts_rs::TS;
use uuid::Uuid;

use crate::error::{CoreError, CoreResult, ValidationError};
use crate::money::Money;
use crate::types::PaymentType;
use crate::validation::{validate_amount_cents, validate_text};
use crate::MAX_NOTES_LENGTH;

// =============================================================================
// Account Type
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "UPPERCASE"))]
#[ts(export)]
#[serde(rename_all = "UPPERCASE")]
pub enum AccountType {
    Assets,
    Liabilities,
    Equity,
    Revenue,
    Expenses,
}

impl AccountType {
    pub fn as_str(&self) -> &'static str {
        match self {
            AccountType::Assets => "ASSETS",
            AccountType::Liabilities => "LIABILITIES",
            AccountType::Equity => "EQUITY",
            AccountType::Revenue => "REVENUE",
            AccountType::Expenses => "EXPENSES",
        }
    }

    /// Assets and expenses grow on the debit side.
    #[inline]
    pub fn is_debit_normal(&self) -> bool {
        matches!(self, AccountType::Assets | AccountType::Expenses)
    }

    /// Balance of an account of this type, signed so the normal side is
    /// positive.
    pub fn normal_balance(&self, total_debit: Money, total_credit: Money) -> Money {
        if self.is_debit_normal() {
            total_debit - total_credit
        } else {
            total_credit - total_debit
        }
    }
}

impl fmt::Display for AccountType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// =============================================================================
// Account Name
// =============================================================================

/// The fixed chart of accounts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "SCREAMING_SNAKE_CASE"))]
#[ts(export)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AccountName {
    Cash,
    Bank,
    AccountsReceivable,
    Inventory,
    AccountsPayable,
    OwnerEquity,
    RetainedEarnings,
    SalesRevenue,
    OtherIncome,
    CostOfGoodsSold,
    OperatingExpenses,
}

impl AccountName {
    pub const ALL: [AccountName; 11] = [
        AccountName::Cash,
        AccountName::Bank,
        AccountName::AccountsReceivable,
        AccountName::Inventory,
        AccountName::AccountsPayable,
        AccountName::OwnerEquity,
        AccountName::RetainedEarnings,
        AccountName::SalesRevenue,
        AccountName::OtherIncome,
        AccountName::CostOfGoodsSold,
        AccountName::OperatingExpenses,
    ];

    pub fn account_type(&self) -> AccountType {
        match self {
            AccountName::Cash
            | AccountName::Bank
            | AccountName::AccountsReceivable
            | AccountName::Inventory => AccountType::Assets,
            AccountName::AccountsPayable => AccountType::Liabilities,
            AccountName::OwnerEquity | AccountName::RetainedEarnings => AccountType::Equity,
            AccountName::SalesRevenue | AccountName::OtherIncome => AccountType::Revenue,
            AccountName::CostOfGoodsSold | AccountName::OperatingExpenses => AccountType::Expenses,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            AccountName::Cash => "CASH",
            AccountName::Bank => "BANK",
            AccountName::AccountsReceivable => "ACCOUNTS_RECEIVABLE",
            AccountName::Inventory => "INVENTORY",
            AccountName::AccountsPayable => "ACCOUNTS_PAYABLE",
            AccountName::OwnerEquity => "OWNER_EQUITY",
            AccountName::RetainedEarnings => "RETAINED_EARNINGS",
            AccountName::SalesRevenue => "SALES_REVENUE",
            AccountName::OtherIncome => "OTHER_INCOME",
            AccountName::CostOfGoodsSold => "COST_OF_GOODS_SOLD",
            AccountName::OperatingExpenses => "OPERATING_EXPENSES",
        }
    }
}

impl fmt::Display for AccountName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for AccountName {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let upper = s.trim().to_uppercase();
        AccountName::ALL
            .iter()
            .copied()
            .find(|name| name.as_str() == upper)
            .ok_or_else(|| {
                ValidationError::NotAllowed {
                    field: "account_name".to_string(),
                    allowed: AccountName::ALL.iter().map(|n| n.as_str().to_string()).collect(),
                }
                .into()
            })
    }
}

// =============================================================================
// Entry Type & Status
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "SCREAMING_SNAKE_CASE"))]
#[ts(export)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EntryType {
    Sale,
    Purchase,
    PaymentReceived,
    PaymentMade,
    Expense,
    Income,
    Adjustment,
}

impl EntryType {
    pub fn as_str(&self) -> &'static str {
        match self {
            EntryType::Sale => "SALE",
            EntryType::Purchase => "PURCHASE",
            EntryType::PaymentReceived => "PAYMENT_RECEIVED",
            EntryType::PaymentMade => "PAYMENT_MADE",
            EntryType::Expense => "EXPENSE",
            EntryType::Income => "INCOME",
            EntryType::Adjustment => "ADJUSTMENT",
        }
    }

    /// Sales and received payments have dedicated entry points.
    pub fn allowed_in_journal(&self) -> bool {
        !matches!(self, EntryType::Sale | EntryType::PaymentReceived)
    }
}

impl fmt::Display for EntryType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "UPPERCASE"))]
#[ts(export)]
#[serde(rename_all = "UPPERCASE")]
pub enum LedgerStatus {
    /// Counted by every report.
    #[default]
    Active,
    /// Soft-deleted.
    Cancelled,
    /// Stored vocabulary only. Reversals leave the original ACTIVE and
    /// link the offsetting pair through `reverses_posting_id`.
    Adjusted,
}

impl LedgerStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            LedgerStatus::Active => "ACTIVE",
            LedgerStatus::Cancelled => "CANCELLED",
            LedgerStatus::Adjusted => "ADJUSTED",
        }
    }

    /// Only ACTIVE entries can be cancelled or adjusted, and only once.
    pub fn transition_to(self, posting_id: &str, target: LedgerStatus) -> CoreResult<LedgerStatus> {
        match (self, target) {
            (LedgerStatus::Active, LedgerStatus::Cancelled)
            | (LedgerStatus::Active, LedgerStatus::Adjusted) => Ok(target),
            _ => Err(CoreError::invalid_transition("Posting", posting_id, self, target)),
        }
    }
}

impl fmt::Display for LedgerStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// =============================================================================
// Ledger Entry
// =============================================================================

/// One side of a posting. Immutable once written apart from `status`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct LedgerEntry {
    pub id: String,
    /// Shared by both sides of one posting.
    pub posting_id: String,
    pub transaction_id: Option<String>,
    pub order_id: Option<String>,
    pub entry_type: EntryType,
    pub debit_cents: i64,
    pub credit_cents: i64,
    pub account_type: AccountType,
    pub account_name: AccountName,
    pub customer_id: Option<String>,
    pub description: String,
    pub reference_number: String,
    /// Posting this entry offsets, on both sides of a reversal.
    pub reverses_posting_id: Option<String>,
    #[ts(as = "String")]
    pub transaction_date: DateTime<Utc>,
    pub status: LedgerStatus,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

impl LedgerEntry {
    #[inline]
    pub fn debit(&self) -> Money {
        Money::from_cents(self.debit_cents)
    }

    #[inline]
    pub fn credit(&self) -> Money {
        Money::from_cents(self.credit_cents)
    }

    #[inline]
    pub fn is_debit(&self) -> bool {
        self.debit_cents > 0
    }

    /// Exactly one side is nonzero and neither is negative.
    pub fn is_well_formed(&self) -> bool {
        self.debit_cents >= 0
            && self.credit_cents >= 0
            && ((self.debit_cents > 0) != (self.credit_cents > 0))
    }
}

/// Both sides of one posting.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Posting {
    pub posting_id: String,
    pub debit: LedgerEntry,
    pub credit: LedgerEntry,
}

impl Posting {
    pub fn amount(&self) -> Money {
        self.debit.debit()
    }

    pub fn entries(&self) -> [&LedgerEntry; 2] {
        [&self.debit, &self.credit]
    }

    /// Rebuilds a posting from its stored entries.
    pub fn from_entries(posting_id: &str, entries: Vec<LedgerEntry>) -> CoreResult<Posting> {
        if entries.is_empty() {
            return Err(CoreError::not_found("Posting", posting_id));
        }
        if entries.len() != 2 {
            return Err(CoreError::UnbalancedPosting {
                reason: format!("posting {} has {} entries", posting_id, entries.len()),
            });
        }

        let (debits, credits): (Vec<_>, Vec<_>) = entries.into_iter().partition(|e| e.is_debit());
        match (debits.into_iter().next(), credits.into_iter().next()) {
            (Some(debit), Some(credit)) if debit.debit() == credit.credit() => Ok(Posting {
                posting_id: posting_id.to_string(),
                debit,
                credit,
            }),
            _ => Err(CoreError::UnbalancedPosting {
                reason: format!("posting {} does not pair one debit with one equal credit", posting_id),
            }),
        }
    }
}

// =============================================================================
// Posting Request
// =============================================================================

/// Everything needed to write one balanced posting.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct PostingRequest {
    pub entry_type: EntryType,
    pub debit_account: AccountName,
    pub credit_account: AccountName,
    pub amount: Money,
    pub description: String,
    pub order_id: Option<String>,
    pub transaction_id: Option<String>,
    pub customer_id: Option<String>,
    pub reverses_posting_id: Option<String>,
    /// Defaults to the posting time.
    #[ts(as = "Option<String>")]
    pub transaction_date: Option<DateTime<Utc>>,
}

impl PostingRequest {
    /// SALE pair for a completed order.
    pub fn sale(
        order_id: impl Into<String>,
        customer_id: Option<String>,
        amount: Money,
        payment_type: PaymentType,
    ) -> Self {
        let order_id = order_id.into();
        let debit_account = match payment_type {
            PaymentType::Cash => AccountName::Cash,
            PaymentType::Credit => AccountName::AccountsReceivable,
        };

        PostingRequest {
            entry_type: EntryType::Sale,
            debit_account,
            credit_account: AccountName::SalesRevenue,
            amount,
            description: format!("{} sale for order {}", payment_type, order_id),
            order_id: Some(order_id),
            transaction_id: None,
            customer_id,
            reverses_posting_id: None,
            transaction_date: None,
        }
    }

    /// PAYMENT_RECEIVED pair for a collected receivable.
    pub fn payment_received(
        transaction_id: impl Into<String>,
        customer_id: impl Into<String>,
        amount: Money,
    ) -> Self {
        let transaction_id = transaction_id.into();

        PostingRequest {
            entry_type: EntryType::PaymentReceived,
            debit_account: AccountName::Cash,
            credit_account: AccountName::AccountsReceivable,
            amount,
            description: format!("Payment received for transaction {}", transaction_id),
            order_id: None,
            transaction_id: Some(transaction_id),
            customer_id: Some(customer_id.into()),
            reverses_posting_id: None,
            transaction_date: None,
        }
    }

    /// General two-sided posting.
    pub fn journal(
        entry_type: EntryType,
        debit_account: AccountName,
        credit_account: AccountName,
        amount: Money,
        description: impl Into<String>,
    ) -> Self {
        PostingRequest {
            entry_type,
            debit_account,
            credit_account,
            amount,
            description: description.into(),
            order_id: None,
            transaction_id: None,
            customer_id: None,
            reverses_posting_id: None,
            transaction_date: None,
        }
    }

    /// Mirror image of an existing posting, booked as ADJUSTMENT.
    ///
    /// The original stays ACTIVE; the two pairs cancel out in every report.
    pub fn reversal_of(original: &Posting) -> CoreResult<Self> {
        if original.debit.status != LedgerStatus::Active || original.credit.status != LedgerStatus::Active {
            return Err(CoreError::invalid_transition(
                "Posting",
                &original.posting_id,
                original.debit.status,
                "REVERSED",
            ));
        }

        Ok(PostingRequest {
            entry_type: EntryType::Adjustment,
            debit_account: original.credit.account_name,
            credit_account: original.debit.account_name,
            amount: original.amount(),
            description: format!("Reversal of posting {}", original.posting_id),
            order_id: original.debit.order_id.clone(),
            transaction_id: original.debit.transaction_id.clone(),
            customer_id: original.debit.customer_id.clone(),
            reverses_posting_id: Some(original.posting_id.clone()),
            transaction_date: None,
        })
    }

    pub fn with_customer(mut self, customer_id: impl Into<String>) -> Self {
        self.customer_id = Some(customer_id.into());
        self
    }

    pub fn with_transaction_date(mut self, date: DateTime<Utc>) -> Self {
        self.transaction_date = Some(date);
        self
    }

    /// Checks the request can produce a balanced pair.
    pub fn validate(&self) -> CoreResult<()> {
        validate_amount_cents("amount", self.amount.cents())?;
        validate_text("description", &self.description, MAX_NOTES_LENGTH)?;
        if self.debit_account == self.credit_account {
            return Err(CoreError::UnbalancedPosting {
                reason: format!("debit and credit both target {}", self.debit_account),
            });
        }
        Ok(())
    }

    /// Like [`validate`](Self::validate), and also refuses entry types that
    /// have dedicated posting paths.
    pub fn validate_journal(&self) -> CoreResult<()> {
        if !self.entry_type.allowed_in_journal() {
            return Err(ValidationError::NotAllowed {
                field: "entry_type".to_string(),
                allowed: ["PURCHASE", "PAYMENT_MADE", "EXPENSE", "INCOME", "ADJUSTMENT"]
                    .iter()
                    .map(|s| s.to_string())
                    .collect(),
            }
            .into());
        }
        self.validate()
    }

    /// Builds both entries with fresh ids and reference numbers.
    pub fn into_posting(self, now: DateTime<Utc>) -> CoreResult<Posting> {
        self.validate()?;

        let posting_id = Uuid::new_v4().to_string();
        let transaction_date = self.transaction_date.unwrap_or(now);
        let side = |account: AccountName, debit_cents: i64, credit_cents: i64| LedgerEntry {
            id: Uuid::new_v4().to_string(),
            posting_id: posting_id.clone(),
            transaction_id: self.transaction_id.clone(),
            order_id: self.order_id.clone(),
            entry_type: self.entry_type,
            debit_cents,
            credit_cents,
            account_type: account.account_type(),
            account_name: account,
            customer_id: self.customer_id.clone(),
            description: self.description.clone(),
            reference_number: reference_number(),
            reverses_posting_id: self.reverses_posting_id.clone(),
            transaction_date,
            status: LedgerStatus::Active,
            created_at: now,
        };

        let debit = side(self.debit_account, self.amount.cents(), 0);
        let credit = side(self.credit_account, 0, self.amount.cents());

        Ok(Posting {
            posting_id,
            debit,
            credit,
        })
    }
}

/// Unique per entry: `LE-` followed by 32 hex digits.
pub fn reference_number() -> String {
    format!("LE-{}", Uuid::new_v4().simple().to_string().to_uppercase())
}

// =============================================================================
// Entry Filter
// =============================================================================

/// Selects entries for listing. Empty filter lists everything.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct EntryFilter {
    pub order_id: Option<String>,
    pub transaction_id: Option<String>,
    pub customer_id: Option<String>,
    pub account_name: Option<AccountName>,
    pub status: Option<LedgerStatus>,
}

impl EntryFilter {
    pub fn for_order(order_id: impl Into<String>) -> Self {
        EntryFilter {
            order_id: Some(order_id.into()),
            ..Default::default()
        }
    }

    pub fn for_transaction(transaction_id: impl Into<String>) -> Self {
        EntryFilter {
            transaction_id: Some(transaction_id.into()),
            ..Default::default()
        }
    }

    pub fn for_customer(customer_id: impl Into<String>) -> Self {
        EntryFilter {
            customer_id: Some(customer_id.into()),
            ..Default::default()
        }
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chart_of_accounts() {
        assert_eq!(AccountName::Cash.account_type(), AccountType::Assets);
        assert_eq!(AccountName::AccountsPayable.account_type(), AccountType::Liabilities);
        assert_eq!(AccountName::RetainedEarnings.account_type(), AccountType::Equity);
        assert_eq!(AccountName::OtherIncome.account_type(), AccountType::Revenue);
        assert_eq!(AccountName::CostOfGoodsSold.account_type(), AccountType::Expenses);
        assert_eq!("accounts_receivable".parse::<AccountName>().unwrap(), AccountName::AccountsReceivable);
        assert!("PETTY_CASH".parse::<AccountName>().is_err());
    }

    #[test]
    fn test_cash_sale_posting() {
        let posting = PostingRequest::sale("o-1", None, Money::from_major(1000), PaymentType::Cash)
            .into_posting(Utc::now())
            .unwrap();

        assert_eq!(posting.debit.account_name, AccountName::Cash);
        assert_eq!(posting.credit.account_name, AccountName::SalesRevenue);
        assert_eq!(posting.debit.debit(), Money::from_major(1000));
        assert_eq!(posting.credit.credit(), Money::from_major(1000));
        assert_eq!(posting.debit.posting_id, posting.credit.posting_id);
        assert_ne!(posting.debit.reference_number, posting.credit.reference_number);
        assert!(posting.entries().iter().all(|e| e.is_well_formed()));
        assert_eq!(posting.debit.order_id.as_deref(), Some("o-1"));
    }

    #[test]
    fn test_credit_sale_debits_receivable() {
        let posting = PostingRequest::sale("o-1", Some("c-1".into()), Money::from_cents(50), PaymentType::Credit)
            .into_posting(Utc::now())
            .unwrap();
        assert_eq!(posting.debit.account_name, AccountName::AccountsReceivable);
        assert_eq!(posting.debit.customer_id.as_deref(), Some("c-1"));
    }

    #[test]
    fn test_payment_received_posting() {
        let posting = PostingRequest::payment_received("t-1", "c-1", Money::from_major(500))
            .into_posting(Utc::now())
            .unwrap();
        assert_eq!(posting.debit.entry_type, EntryType::PaymentReceived);
        assert_eq!(posting.debit.account_name, AccountName::Cash);
        assert_eq!(posting.credit.account_name, AccountName::AccountsReceivable);
        assert_eq!(posting.credit.transaction_id.as_deref(), Some("t-1"));
    }

    #[test]
    fn test_invalid_postings_rejected() {
        let zero = PostingRequest::journal(
            EntryType::Expense,
            AccountName::OperatingExpenses,
            AccountName::Cash,
            Money::zero(),
            "rent",
        );
        assert!(matches!(zero.into_posting(Utc::now()), Err(CoreError::Validation(_))));

        let same = PostingRequest::journal(
            EntryType::Adjustment,
            AccountName::Cash,
            AccountName::Cash,
            Money::from_cents(100),
            "noop",
        );
        assert!(matches!(same.validate(), Err(CoreError::UnbalancedPosting { .. })));

        let sale = PostingRequest::journal(
            EntryType::Sale,
            AccountName::Cash,
            AccountName::SalesRevenue,
            Money::from_cents(100),
            "sneaky sale",
        );
        assert!(sale.validate_journal().is_err());
    }

    #[test]
    fn test_reversal_mirrors_posting() {
        let original = PostingRequest::sale("o-1", None, Money::from_cents(700), PaymentType::Cash)
            .into_posting(Utc::now())
            .unwrap();
        let reversal = PostingRequest::reversal_of(&original).unwrap();

        assert_eq!(reversal.entry_type, EntryType::Adjustment);
        assert_eq!(reversal.debit_account, AccountName::SalesRevenue);
        assert_eq!(reversal.credit_account, AccountName::Cash);
        assert_eq!(reversal.amount, Money::from_cents(700));
        assert_eq!(reversal.reverses_posting_id.as_deref(), Some(original.posting_id.as_str()));

        let pair = reversal.into_posting(Utc::now()).unwrap();
        assert!(pair
            .entries()
            .iter()
            .all(|e| e.reverses_posting_id.as_deref() == Some(original.posting_id.as_str())));

        let mut cancelled = original.clone();
        cancelled.debit.status = LedgerStatus::Cancelled;
        cancelled.credit.status = LedgerStatus::Cancelled;
        assert!(matches!(
            PostingRequest::reversal_of(&cancelled),
            Err(CoreError::InvalidTransition { .. })
        ));
    }

    #[test]
    fn test_posting_from_entries_round_trip() {
        let posting = PostingRequest::sale("o-1", None, Money::from_cents(700), PaymentType::Cash)
            .into_posting(Utc::now())
            .unwrap();
        let id = posting.posting_id.clone();
        let rebuilt = Posting::from_entries(&id, vec![posting.credit.clone(), posting.debit.clone()]).unwrap();
        assert_eq!(rebuilt, posting);

        assert!(matches!(
            Posting::from_entries("missing", vec![]),
            Err(CoreError::NotFound { .. })
        ));
    }

    #[test]
    fn test_ledger_status_transitions() {
        assert!(LedgerStatus::Active.transition_to("p", LedgerStatus::Cancelled).is_ok());
        assert!(LedgerStatus::Active.transition_to("p", LedgerStatus::Adjusted).is_ok());
        assert!(LedgerStatus::Cancelled.transition_to("p", LedgerStatus::Cancelled).is_err());
        assert!(LedgerStatus::Adjusted.transition_to("p", LedgerStatus::Cancelled).is_err());
    }

    #[test]
    fn test_normal_balance_sign() {
        let d = Money::from_cents(300);
        let c = Money::from_cents(100);
        assert_eq!(AccountType::Assets.normal_balance(d, c), Money::from_cents(200));
        assert_eq!(AccountType::Revenue.normal_balance(d, c), Money::from_cents(-200));
    }
}
