//! # Ledger Repository
//!
//! Append-only storage of ledger entries and the aggregation queries
//! behind every report.
//!
//! ## Write Rules
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  INSERT   both sides of a posting, same connection/transaction         │
//! │  UPDATE   status only (ACTIVE → CANCELLED)                             │
//! │  DELETE   never                                                        │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! A reversal is a new ACTIVE pair whose entries carry
//! `reverses_posting_id`. A partial unique index allows one ACTIVE reversal
//! per posting, and a reversed posting cannot be cancelled while its
//! reversal is ACTIVE.
//!
//! Aggregations always read `status = 'ACTIVE'` rows and never keep running
//! totals.

use sqlx::{SqliteConnection, SqlitePool};
use tracing::debug;

use crate::error::DbResult;
use tally_core::reports::AccountTotals;
use tally_core::{AccountName, DateRange, EntryFilter, LedgerEntry, Posting};

const COLUMNS: &str = r#"
    id, posting_id, transaction_id, order_id, entry_type, debit_cents, credit_cents,
    account_type, account_name, customer_id, description, reference_number,
    reverses_posting_id, transaction_date, status, created_at
"#;

#[derive(Debug, Clone)]
pub struct LedgerRepository {
    pool: SqlitePool,
}

impl LedgerRepository {
    pub fn new(pool: SqlitePool) -> Self {
        LedgerRepository { pool }
    }

    // =========================================================================
    // Writes
    // =========================================================================

    async fn insert_entry(conn: &mut SqliteConnection, entry: &LedgerEntry) -> DbResult<()> {
        sqlx::query(
            r#"
            INSERT INTO ledger_entries (
                id, posting_id, transaction_id, order_id, entry_type, debit_cents, credit_cents,
                account_type, account_name, customer_id, description, reference_number,
                reverses_posting_id, transaction_date, status, created_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16)
            "#,
        )
        .bind(&entry.id)
        .bind(&entry.posting_id)
        .bind(&entry.transaction_id)
        .bind(&entry.order_id)
        .bind(entry.entry_type)
        .bind(entry.debit_cents)
        .bind(entry.credit_cents)
        .bind(entry.account_type)
        .bind(entry.account_name)
        .bind(&entry.customer_id)
        .bind(&entry.description)
        .bind(&entry.reference_number)
        .bind(&entry.reverses_posting_id)
        .bind(entry.transaction_date)
        .bind(entry.status)
        .bind(entry.created_at)
        .execute(&mut *conn)
        .await?;

        Ok(())
    }

    /// Writes both sides of a posting.
    pub async fn insert_posting(conn: &mut SqliteConnection, posting: &Posting) -> DbResult<()> {
        debug!(
            posting_id = %posting.posting_id,
            entry_type = %posting.debit.entry_type,
            debit = %posting.debit.account_name,
            credit = %posting.credit.account_name,
            amount = posting.amount().cents(),
            "Inserting posting"
        );

        for entry in posting.entries() {
            Self::insert_entry(conn, entry).await?;
        }
        Ok(())
    }

    /// Marks every ACTIVE entry of a posting CANCELLED. Returns the number
    /// of entries changed: 0 when nothing was ACTIVE or the posting has an
    /// ACTIVE reversal.
    pub async fn cancel_posting(conn: &mut SqliteConnection, posting_id: &str) -> DbResult<u64> {
        debug!(posting_id = %posting_id, "Cancelling posting");

        let result = sqlx::query(
            r#"
            UPDATE ledger_entries SET status = 'CANCELLED'
            WHERE posting_id = ?1
              AND status = 'ACTIVE'
              AND NOT EXISTS (
                  SELECT 1 FROM ledger_entries r
                  WHERE r.reverses_posting_id = ?1 AND r.status = 'ACTIVE'
              )
            "#,
        )
        .bind(posting_id)
        .execute(&mut *conn)
        .await?;

        Ok(result.rows_affected())
    }

    // =========================================================================
    // Reads
    // =========================================================================

    /// Entries of a posting, regardless of status.
    pub async fn fetch_posting(conn: &mut SqliteConnection, posting_id: &str) -> DbResult<Vec<LedgerEntry>> {
        let entries = sqlx::query_as::<_, LedgerEntry>(&format!(
            "SELECT {} FROM ledger_entries WHERE posting_id = ?1 ORDER BY debit_cents DESC",
            COLUMNS
        ))
        .bind(posting_id)
        .fetch_all(&mut *conn)
        .await?;

        Ok(entries)
    }

    pub async fn get_posting(&self, posting_id: &str) -> DbResult<Vec<LedgerEntry>> {
        let mut conn = self.pool.acquire().await?;
        Self::fetch_posting(&mut conn, posting_id).await
    }

    /// ACTIVE entries offsetting `posting_id`, empty if it is not reversed.
    pub async fn active_reversal(&self, posting_id: &str) -> DbResult<Vec<LedgerEntry>> {
        let entries = sqlx::query_as::<_, LedgerEntry>(&format!(
            r#"
            SELECT {} FROM ledger_entries
            WHERE reverses_posting_id = ?1 AND status = 'ACTIVE'
            ORDER BY debit_cents DESC
            "#,
            COLUMNS
        ))
        .bind(posting_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(entries)
    }

    /// Lists entries matching a filter, newest first.
    pub async fn list(&self, filter: &EntryFilter, limit: u32) -> DbResult<Vec<LedgerEntry>> {
        debug!(?filter, limit, "Listing ledger entries");

        let entries = sqlx::query_as::<_, LedgerEntry>(&format!(
            r#"
            SELECT {} FROM ledger_entries
            WHERE (?1 IS NULL OR order_id = ?1)
              AND (?2 IS NULL OR transaction_id = ?2)
              AND (?3 IS NULL OR customer_id = ?3)
              AND (?4 IS NULL OR account_name = ?4)
              AND (?5 IS NULL OR status = ?5)
            ORDER BY transaction_date DESC, posting_id, debit_cents DESC
            LIMIT ?6
            "#,
            COLUMNS
        ))
        .bind(&filter.order_id)
        .bind(&filter.transaction_id)
        .bind(&filter.customer_id)
        .bind(filter.account_name)
        .bind(filter.status)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(entries)
    }

    /// Σ debit and Σ credit per account over ACTIVE entries in the range.
    pub async fn totals_by_account(&self, range: &DateRange) -> DbResult<Vec<AccountTotals>> {
        let totals = sqlx::query_as::<_, AccountTotals>(
            r#"
            SELECT
                account_name,
                COALESCE(SUM(debit_cents), 0) AS total_debit_cents,
                COALESCE(SUM(credit_cents), 0) AS total_credit_cents
            FROM ledger_entries
            WHERE status = 'ACTIVE'
              AND (?1 IS NULL OR transaction_date >= ?1)
              AND (?2 IS NULL OR transaction_date <= ?2)
            GROUP BY account_name
            ORDER BY account_name
            "#,
        )
        .bind(range.from)
        .bind(range.to)
        .fetch_all(&self.pool)
        .await?;

        debug!(accounts = totals.len(), "Aggregated account totals");
        Ok(totals)
    }

    /// Totals of one account over ACTIVE entries in the range.
    pub async fn account_totals(&self, account: AccountName, range: &DateRange) -> DbResult<AccountTotals> {
        let (debit, credit): (i64, i64) = sqlx::query_as(
            r#"
            SELECT
                COALESCE(SUM(debit_cents), 0),
                COALESCE(SUM(credit_cents), 0)
            FROM ledger_entries
            WHERE status = 'ACTIVE'
              AND account_name = ?1
              AND (?2 IS NULL OR transaction_date >= ?2)
              AND (?3 IS NULL OR transaction_date <= ?3)
            "#,
        )
        .bind(account)
        .bind(range.from)
        .bind(range.to)
        .fetch_one(&self.pool)
        .await?;

        Ok(AccountTotals {
            account_name: account,
            total_debit_cents: debit,
            total_credit_cents: credit,
        })
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
