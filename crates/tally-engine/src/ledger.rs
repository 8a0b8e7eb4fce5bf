//! # Ledger Workflows
//!
//! Posting, correction and reporting over ledger entries.
//!
//! ## Corrections Never Edit Amounts
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  cancel_posting(P)    P: ACTIVE → CANCELLED     (drops out of reports) │
//! │                                                                         │
//! │  reverse_posting(P)   P: stays ACTIVE                                  │
//! │                       R: new ADJUSTMENT pair, sides swapped, ACTIVE,   │
//! │                          reverses_posting_id = P                       │
//! │                                                                         │
//! │  Both sides of a posting always change status together.                │
//! │  P cannot be cancelled or reversed again while R is ACTIVE.            │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Every report is an aggregation over ACTIVE entries at query time.

use chrono::Utc;
use serde::Serialize;
use sqlx::SqliteConnection;
use tracing::{debug, error, info};

use tally_core::reports::{self, AccountBalance, BalanceSheet, ProfitAndLoss, TrialBalance};
use tally_core::{AccountName, CoreError, DateRange, EntryFilter, LedgerEntry, LedgerStatus, Posting, PostingRequest};
use tally_db::{DbError, LedgerRepository};

use crate::error::EngineResult;
use crate::BackOffice;

/// A reversed posting and the ADJUSTMENT pair that offsets it.
#[derive(Debug, Clone, Serialize)]
pub struct PostingReversal {
    pub original: Posting,
    pub reversal: Posting,
}

/// Builds and writes a posting on an open transaction.
pub(crate) async fn post_in(conn: &mut SqliteConnection, request: PostingRequest) -> EngineResult<Posting> {
    let posting = request.into_posting(Utc::now())?;
    LedgerRepository::insert_posting(conn, &posting).await?;
    Ok(posting)
}

impl BackOffice {
    /// Writes one posting in its own transaction.
    pub(crate) async fn post(&self, request: PostingRequest) -> EngineResult<Posting> {
        let mut tx = self.db.begin().await?;
        let posting = post_in(&mut *tx, request).await?;
        tx.commit().await?;

        info!(
            posting_id = %posting.posting_id,
            entry_type = %posting.debit.entry_type,
            debit = %posting.debit.account_name,
            credit = %posting.credit.account_name,
            amount = %posting.amount(),
            "Posting written"
        );
        Ok(posting)
    }

    // =========================================================================
    // Postings
    // =========================================================================

    /// General two-sided posting (purchases, expenses, income, adjustments).
    ///
    /// SALE and PAYMENT_RECEIVED go through their own workflows.
    pub async fn post_journal(&self, request: PostingRequest) -> EngineResult<Posting> {
        request.validate_journal()?;
        self.post(request).await
    }

    pub async fn get_posting(&self, posting_id: &str) -> EngineResult<Posting> {
        let entries = self.db.ledger().get_posting(posting_id).await?;
        Ok(Posting::from_entries(posting_id, entries)?)
    }

    /// Marks both sides of an ACTIVE posting CANCELLED. A posting with an
    /// ACTIVE reversal must have the reversal cancelled first.
    pub async fn cancel_posting(&self, posting_id: &str) -> EngineResult<Posting> {
        let mut tx = self.db.begin().await?;
        let changed = LedgerRepository::cancel_posting(&mut *tx, posting_id).await?;
        if changed == 0 {
            tx.rollback().await?;
            return Err(self.posting_not_cancellable(posting_id).await);
        }

        let entries = LedgerRepository::fetch_posting(&mut *tx, posting_id).await?;
        let posting = Posting::from_entries(posting_id, entries)?;
        tx.commit().await?;

        info!(posting_id = %posting_id, amount = %posting.amount(), "Posting cancelled");
        Ok(posting)
    }

    /// Posts the mirror image of an ACTIVE posting, linked back to it. The
    /// original stays ACTIVE, so the two pairs net to zero in every report.
    pub async fn reverse_posting(&self, posting_id: &str) -> EngineResult<PostingReversal> {
        let original = self.get_posting(posting_id).await?;
        let request = PostingRequest::reversal_of(&original)?;

        // The insert takes the write lock before the original is re-read.
        let mut tx = self.db.begin().await?;
        let reversal = match post_in(&mut *tx, request).await {
            Ok(reversal) => reversal,
            Err(crate::EngineError::Db(err)) if err.is_unique_violation_on("reverses_posting_id") => {
                tx.rollback().await?;
                return Err(already_reversed(posting_id, "REVERSED").into());
            }
            Err(err) => return Err(err),
        };

        let entries = LedgerRepository::fetch_posting(&mut *tx, posting_id).await?;
        let original = Posting::from_entries(posting_id, entries)?;
        // Cancelled between the read above and the insert.
        if let Err(err) = PostingRequest::reversal_of(&original) {
            tx.rollback().await?;
            return Err(err.into());
        }
        tx.commit().await?;

        info!(
            posting_id = %posting_id,
            reversal_id = %reversal.posting_id,
            amount = %reversal.amount(),
            "Posting reversed"
        );
        Ok(PostingReversal { original, reversal })
    }

    /// Explains why a guarded cancel matched nothing.
    async fn posting_not_cancellable(&self, posting_id: &str) -> crate::EngineError {
        let posting = match self.get_posting(posting_id).await {
            Ok(posting) => posting,
            Err(err) => return err,
        };
        if let Err(err) = posting.debit.status.transition_to(posting_id, LedgerStatus::Cancelled) {
            return err.into();
        }
        match self.db.ledger().active_reversal(posting_id).await {
            Ok(reversal) if !reversal.is_empty() => already_reversed(posting_id, LedgerStatus::Cancelled).into(),
            Ok(_) => DbError::conflict("Posting", posting_id).into(),
            Err(err) => err.into(),
        }
    }

    /// Entries matching `filter`, newest first.
    pub async fn ledger_entries(&self, filter: &EntryFilter, limit: u32) -> EngineResult<Vec<LedgerEntry>> {
        Ok(self.db.ledger().list(filter, limit).await?)
    }

    // =========================================================================
    // Reports
    // =========================================================================

    pub async fn account_balance(&self, account: AccountName, range: &DateRange) -> EngineResult<AccountBalance> {
        let totals = self.db.ledger().account_totals(account, range).await?;
        Ok(AccountBalance::from(&totals))
    }

    /// Per-account totals. An imbalance is reported in the result and
    /// logged, never hidden.
    pub async fn trial_balance(&self, range: &DateRange) -> EngineResult<TrialBalance> {
        let totals = self.db.ledger().totals_by_account(range).await?;
        let trial = reports::trial_balance(&totals);

        if trial.is_balanced {
            debug!(
                accounts = trial.accounts.len(),
                total = %trial.total_debit,
                "Trial balance computed"
            );
        } else {
            error!(
                total_debit = %trial.total_debit,
                total_credit = %trial.total_credit,
                difference = %trial.difference,
                "Trial balance does not reconcile"
            );
        }
        Ok(trial)
    }

    /// Like [`trial_balance`](Self::trial_balance) but an imbalance is an
    /// error.
    pub async fn verify_books(&self, range: &DateRange) -> EngineResult<TrialBalance> {
        let trial = self.trial_balance(range).await?;
        reports::verify(&trial)?;
        Ok(trial)
    }

    pub async fn profit_and_loss(&self, range: &DateRange) -> EngineResult<ProfitAndLoss> {
        let totals = self.db.ledger().totals_by_account(range).await?;
        Ok(reports::profit_and_loss(&totals))
    }

    pub async fn balance_sheet(&self, range: &DateRange) -> EngineResult<BalanceSheet> {
        let totals = self.db.ledger().totals_by_account(range).await?;
        let sheet = reports::balance_sheet(&totals);

        if !sheet.is_balanced {
            error!(
                total_assets = %sheet.total_assets,
                total_liabilities = %sheet.total_liabilities,
                total_equity = %sheet.total_equity,
                net_profit = %sheet.net_profit,
                "Balance sheet does not reconcile"
            );
        }
        Ok(sheet)
    }
}

fn already_reversed(posting_id: &str, target: impl std::fmt::Display) -> CoreError {
    CoreError::invalid_transition("Posting", posting_id, "REVERSED", target)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::EngineError;
    use crate::test_support::office;
    use tally_core::{EntryType, Money, PaymentType};

    #[tokio::test]
    async fn test_journal_rejects_dedicated_types() {
        let office = office().await;

        let sale = PostingRequest::sale("o-1", None, Money::from_major(1), PaymentType::Cash);
        let err = office.post_journal(sale).await.unwrap_err();
        assert!(matches!(err, EngineError::Core(CoreError::Validation(_))));

        let same_account = PostingRequest::journal(
            EntryType::Expense,
            AccountName::Cash,
            AccountName::Cash,
            Money::from_major(1),
            "noop",
        );
        let err = office.post_journal(same_account).await.unwrap_err();
        assert!(matches!(err, EngineError::Core(CoreError::UnbalancedPosting { .. })));
    }

    #[tokio::test]
    async fn test_cancel_twice_is_invalid() {
        let office = office().await;
        let posting = office
            .post_journal(PostingRequest::journal(
                EntryType::Expense,
                AccountName::OperatingExpenses,
                AccountName::Cash,
                Money::from_major(40),
                "Rent",
            ))
            .await
            .unwrap();

        let cancelled = office.cancel_posting(&posting.posting_id).await.unwrap();
        assert_eq!(cancelled.debit.status, LedgerStatus::Cancelled);
        assert_eq!(cancelled.credit.status, LedgerStatus::Cancelled);

        let err = office.cancel_posting(&posting.posting_id).await.unwrap_err();
        assert!(matches!(err, EngineError::Core(CoreError::InvalidTransition { .. })));

        let err = office.cancel_posting("missing").await.unwrap_err();
        assert!(matches!(err, EngineError::Core(CoreError::NotFound { .. })));

        let trial = office.trial_balance(&DateRange::all()).await.unwrap();
        assert!(trial.accounts.is_empty());
    }

    #[tokio::test]
    async fn test_reverse_keeps_books_balanced() {
        let office = office().await;
        let posting = office
            .post_journal(PostingRequest::journal(
                EntryType::Income,
                AccountName::Cash,
                AccountName::OtherIncome,
                Money::from_major(25),
                "Interest",
            ))
            .await
            .unwrap();

        let reversal = office.reverse_posting(&posting.posting_id).await.unwrap();
        assert_eq!(reversal.original.debit.status, LedgerStatus::Active);
        assert_eq!(reversal.reversal.debit.account_name, AccountName::OtherIncome);
        assert_eq!(reversal.reversal.credit.account_name, AccountName::Cash);
        assert_eq!(reversal.reversal.debit.entry_type, EntryType::Adjustment);
        assert_eq!(
            reversal.reversal.credit.reverses_posting_id.as_deref(),
            Some(posting.posting_id.as_str())
        );

        let all = DateRange::all();
        let cash = office.account_balance(AccountName::Cash, &all).await.unwrap();
        assert_eq!(cash.total_debit, Money::from_major(25));
        assert_eq!(cash.total_credit, Money::from_major(25));
        assert_eq!(cash.balance, Money::zero());
        assert_eq!(office.profit_and_loss(&all).await.unwrap().net_profit, Money::zero());
        office.verify_books(&all).await.unwrap();

        let err = office.reverse_posting(&posting.posting_id).await.unwrap_err();
        assert!(matches!(err, EngineError::Core(CoreError::InvalidTransition { .. })));
        let err = office.cancel_posting(&posting.posting_id).await.unwrap_err();
        assert!(matches!(err, EngineError::Core(CoreError::InvalidTransition { .. })));

        // Cancelling the reversal brings the original back into effect.
        office.cancel_posting(&reversal.reversal.posting_id).await.unwrap();
        let cash = office.account_balance(AccountName::Cash, &all).await.unwrap();
        assert_eq!(cash.balance, Money::from_major(25));
        assert_eq!(office.profit_and_loss(&all).await.unwrap().net_profit, Money::from_major(25));
    }
}
