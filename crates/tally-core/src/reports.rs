//! # Accounting Reports
//!
//! Aggregate queries over posted entries.
//!
//! ## Data Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  ledger_entries (status = ACTIVE, date in range)                       │
//! │       │                                                                 │
//! │       ▼  GROUP BY account_name   (tally-db)                            │
//! │  Vec<AccountTotals>                                                    │
//! │       │                                                                 │
//! │       ├──► account_balance()   debit − credit                          │
//! │       ├──► trial_balance()     Σ debit, Σ credit, difference           │
//! │       ├──► profit_and_loss()   revenue − expenses                      │
//! │       └──► balance_sheet()     assets vs liabilities + equity          │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Reports are always recomputed from entries. There are no running totals
//! to drift out of sync.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::error::{CoreError, CoreResult, ValidationError};
use crate::ledger::{AccountName, AccountType};
use crate::money::Money;

// =============================================================================
// Date Range
// =============================================================================

/// Inclusive date range; either bound may be open.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct DateRange {
    #[ts(as = "Option<String>")]
    pub from: Option<DateTime<Utc>>,
    #[ts(as = "Option<String>")]
    pub to: Option<DateTime<Utc>>,
}

impl DateRange {
    pub fn new(from: Option<DateTime<Utc>>, to: Option<DateTime<Utc>>) -> CoreResult<Self> {
        if let (Some(from), Some(to)) = (from, to) {
            if from > to {
                return Err(ValidationError::InvalidFormat {
                    field: "date range".to_string(),
                    reason: format!("from {} is after to {}", from, to),
                }
                .into());
            }
        }
        Ok(DateRange { from, to })
    }

    pub fn all() -> Self {
        DateRange::default()
    }

    pub fn contains(&self, at: DateTime<Utc>) -> bool {
        self.from.map_or(true, |from| at >= from) && self.to.map_or(true, |to| at <= to)
    }
}

// =============================================================================
// Account Totals
// =============================================================================

/// Debit and credit sums of one account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct AccountTotals {
    pub account_name: AccountName,
    pub total_debit_cents: i64,
    pub total_credit_cents: i64,
}

impl AccountTotals {
    pub fn empty(account_name: AccountName) -> Self {
        AccountTotals {
            account_name,
            total_debit_cents: 0,
            total_credit_cents: 0,
        }
    }

    #[inline]
    pub fn total_debit(&self) -> Money {
        Money::from_cents(self.total_debit_cents)
    }

    #[inline]
    pub fn total_credit(&self) -> Money {
        Money::from_cents(self.total_credit_cents)
    }

    #[inline]
    pub fn account_type(&self) -> AccountType {
        self.account_name.account_type()
    }
}

/// Balance of a single account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct AccountBalance {
    pub account_name: AccountName,
    pub account_type: AccountType,
    pub total_debit: Money,
    pub total_credit: Money,
    /// `total_debit − total_credit`
    pub balance: Money,
}

impl From<&AccountTotals> for AccountBalance {
    fn from(totals: &AccountTotals) -> Self {
        AccountBalance {
            account_name: totals.account_name,
            account_type: totals.account_type(),
            total_debit: totals.total_debit(),
            total_credit: totals.total_credit(),
            balance: totals.total_debit() - totals.total_credit(),
        }
    }
}

/// Balance of `account` given the grouped totals (zero when it has no entries).
pub fn account_balance(account: AccountName, totals: &[AccountTotals]) -> AccountBalance {
    totals
        .iter()
        .find(|t| t.account_name == account)
        .map(AccountBalance::from)
        .unwrap_or_else(|| AccountBalance::from(&AccountTotals::empty(account)))
}

// =============================================================================
// Trial Balance
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct TrialBalance {
    pub accounts: Vec<AccountBalance>,
    pub total_debit: Money,
    pub total_credit: Money,
    /// `total_debit − total_credit`; nonzero means a posting bug.
    pub difference: Money,
    pub is_balanced: bool,
}

pub fn trial_balance(totals: &[AccountTotals]) -> TrialBalance {
    let mut accounts: Vec<AccountBalance> = totals.iter().map(AccountBalance::from).collect();
    accounts.sort_by_key(|a| a.account_name);

    let total_debit: Money = accounts.iter().map(|a| a.total_debit).sum();
    let total_credit: Money = accounts.iter().map(|a| a.total_credit).sum();
    let difference = total_debit - total_credit;

    TrialBalance {
        accounts,
        total_debit,
        total_credit,
        difference,
        is_balanced: difference.is_zero(),
    }
}

/// Strict check for operators: an unbalanced book is an error.
pub fn verify(trial: &TrialBalance) -> CoreResult<()> {
    if trial.is_balanced {
        Ok(())
    } else {
        Err(CoreError::PostingInconsistency {
            total_debit: trial.total_debit,
            total_credit: trial.total_credit,
        })
    }
}

// =============================================================================
// Profit & Loss / Balance Sheet
// =============================================================================

/// One account's contribution to a report section, signed so that the
/// account's normal side is positive.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct ReportLine {
    pub account_name: AccountName,
    pub amount: Money,
}

fn section(totals: &[AccountTotals], account_type: AccountType) -> (Vec<ReportLine>, Money) {
    let mut lines: Vec<ReportLine> = totals
        .iter()
        .filter(|t| t.account_type() == account_type)
        .map(|t| ReportLine {
            account_name: t.account_name,
            amount: account_type.normal_balance(t.total_debit(), t.total_credit()),
        })
        .collect();
    lines.sort_by_key(|l| l.account_name);
    let total = lines.iter().map(|l| l.amount).sum();
    (lines, total)
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct ProfitAndLoss {
    pub revenue: Vec<ReportLine>,
    pub expenses: Vec<ReportLine>,
    /// Σ revenue (credit − debit)
    pub total_revenue: Money,
    /// Σ expenses (debit − credit)
    pub total_expenses: Money,
    pub net_profit: Money,
}

pub fn profit_and_loss(totals: &[AccountTotals]) -> ProfitAndLoss {
    let (revenue, total_revenue) = section(totals, AccountType::Revenue);
    let (expenses, total_expenses) = section(totals, AccountType::Expenses);

    ProfitAndLoss {
        revenue,
        expenses,
        total_revenue,
        total_expenses,
        net_profit: total_revenue - total_expenses,
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct BalanceSheet {
    pub assets: Vec<ReportLine>,
    pub liabilities: Vec<ReportLine>,
    pub equity: Vec<ReportLine>,
    pub total_assets: Money,
    pub total_liabilities: Money,
    pub total_equity: Money,
    /// Current-period earnings not yet closed into equity.
    pub net_profit: Money,
    /// `total_assets − (total_liabilities + total_equity)`
    pub difference: Money,
    /// True when the difference is fully explained by `net_profit`.
    pub is_balanced: bool,
}

pub fn balance_sheet(totals: &[AccountTotals]) -> BalanceSheet {
    let (assets, total_assets) = section(totals, AccountType::Assets);
    let (liabilities, total_liabilities) = section(totals, AccountType::Liabilities);
    let (equity, total_equity) = section(totals, AccountType::Equity);
    let net_profit = profit_and_loss(totals).net_profit;
    let difference = total_assets - (total_liabilities + total_equity);

    BalanceSheet {
        assets,
        liabilities,
        equity,
        total_assets,
        total_liabilities,
        total_equity,
        net_profit,
        difference,
        is_balanced: (difference - net_profit).is_zero(),
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn totals(name: AccountName, debit: i64, credit: i64) -> AccountTotals {
        AccountTotals {
            account_name: name,
            total_debit_cents: debit,
            total_credit_cents: credit,
        }
    }

    /// Cash sale 1000, credit sale 500, 500 collected, rent 200 paid in cash.
    fn sample_book() -> Vec<AccountTotals> {
        vec![
            totals(AccountName::Cash, 1000 + 500, 200),
            totals(AccountName::AccountsReceivable, 500, 500),
            totals(AccountName::SalesRevenue, 0, 1500),
            totals(AccountName::OperatingExpenses, 200, 0),
        ]
    }

    #[test]
    fn test_account_balance() {
        let book = sample_book();
        let cash = account_balance(AccountName::Cash, &book);
        assert_eq!(cash.balance, Money::from_cents(1300));

        let bank = account_balance(AccountName::Bank, &book);
        assert_eq!(bank.balance, Money::zero());
        assert_eq!(bank.account_type, AccountType::Assets);
    }

    #[test]
    fn test_trial_balance_balances() {
        let trial = trial_balance(&sample_book());
        assert_eq!(trial.total_debit, Money::from_cents(2200));
        assert_eq!(trial.total_credit, Money::from_cents(2200));
        assert!(trial.is_balanced);
        assert!(verify(&trial).is_ok());
    }

    #[test]
    fn test_unbalanced_trial_balance_is_reported() {
        let mut book = sample_book();
        book.push(totals(AccountName::Bank, 1, 0));
        let trial = trial_balance(&book);
        assert!(!trial.is_balanced);
        assert_eq!(trial.difference, Money::from_cents(1));
        assert!(matches!(verify(&trial), Err(CoreError::PostingInconsistency { .. })));
    }

    #[test]
    fn test_profit_and_loss() {
        let pnl = profit_and_loss(&sample_book());
        assert_eq!(pnl.total_revenue, Money::from_cents(1500));
        assert_eq!(pnl.total_expenses, Money::from_cents(200));
        assert_eq!(pnl.net_profit, Money::from_cents(1300));
    }

    #[test]
    fn test_balance_sheet_with_unclosed_earnings() {
        let sheet = balance_sheet(&sample_book());
        assert_eq!(sheet.total_assets, Money::from_cents(1300));
        assert_eq!(sheet.total_liabilities, Money::zero());
        assert_eq!(sheet.total_equity, Money::zero());
        assert_eq!(sheet.difference, Money::from_cents(1300));
        assert_eq!(sheet.net_profit, Money::from_cents(1300));
        assert!(sheet.is_balanced);
    }

    #[test]
    fn test_empty_book() {
        let trial = trial_balance(&[]);
        assert!(trial.is_balanced);
        let sheet = balance_sheet(&[]);
        assert!(sheet.is_balanced);
        assert_eq!(sheet.difference, Money::zero());
    }

    #[test]
    fn test_date_range() {
        let jan = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let feb = Utc.with_ymd_and_hms(2024, 2, 1, 0, 0, 0).unwrap();

        assert!(DateRange::new(Some(feb), Some(jan)).is_err());

        let range = DateRange::new(Some(jan), Some(feb)).unwrap();
        assert!(range.contains(jan));
        assert!(range.contains(feb));
        assert!(!range.contains(feb + chrono::Duration::seconds(1)));
        assert!(DateRange::all().contains(jan));
    }
}
