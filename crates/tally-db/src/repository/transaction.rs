//! # Transaction Repository
//!
//! Customer-facing cash/credit transactions (not to be confused with
//! database transactions, which callers open with `Database::begin`).

use chrono::{DateTime, Utc};
use sqlx::{SqliteConnection, SqlitePool};
use tracing::debug;

use crate::error::DbResult;
use tally_core::Transaction;

const COLUMNS: &str = r#"
    id, customer_id, amount_cents, payment_type, status, order_id, notes, created_at, paid_at
"#;

#[derive(Debug, Clone)]
pub struct TransactionRepository {
    pool: SqlitePool,
}

impl TransactionRepository {
    pub fn new(pool: SqlitePool) -> Self {
        TransactionRepository { pool }
    }

    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Transaction>> {
        let mut conn = self.pool.acquire().await?;
        Self::fetch(&mut conn, id).await
    }

    pub async fn fetch(conn: &mut SqliteConnection, id: &str) -> DbResult<Option<Transaction>> {
        let transaction = sqlx::query_as::<_, Transaction>(&format!(
            "SELECT {} FROM transactions WHERE id = ?1",
            COLUMNS
        ))
        .bind(id)
        .fetch_optional(&mut *conn)
        .await?;

        Ok(transaction)
    }

    pub async fn insert(conn: &mut SqliteConnection, transaction: &Transaction) -> DbResult<()> {
        debug!(
            id = %transaction.id,
            customer_id = %transaction.customer_id,
            amount = transaction.amount_cents,
            payment_type = %transaction.payment_type,
            "Inserting transaction"
        );

        sqlx::query(
            r#"
            INSERT INTO transactions (
                id, customer_id, amount_cents, payment_type, status, order_id, notes, created_at, paid_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
            "#,
        )
        .bind(&transaction.id)
        .bind(&transaction.customer_id)
        .bind(transaction.amount_cents)
        .bind(transaction.payment_type)
        .bind(transaction.status)
        .bind(&transaction.order_id)
        .bind(&transaction.notes)
        .bind(transaction.created_at)
        .bind(transaction.paid_at)
        .execute(&mut *conn)
        .await?;

        Ok(())
    }

    /// `pending → paid`. Returns `false` if the row was not pending.
    pub async fn mark_paid(conn: &mut SqliteConnection, id: &str, now: DateTime<Utc>) -> DbResult<bool> {
        debug!(id = %id, "Marking transaction paid");

        let result = sqlx::query(
            r#"
            UPDATE transactions
            SET status = 'paid', paid_at = ?2
            WHERE id = ?1 AND status = 'pending'
            "#,
        )
        .bind(id)
        .bind(now)
        .execute(&mut *conn)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    /// Pending credit transactions, oldest first.
    pub async fn outstanding_receivables(&self, customer_id: Option<&str>) -> DbResult<Vec<Transaction>> {
        let transactions = sqlx::query_as::<_, Transaction>(&format!(
            r#"
            SELECT {} FROM transactions
            WHERE payment_type = 'credit' AND status = 'pending'
              AND (?1 IS NULL OR customer_id = ?1)
            ORDER BY created_at ASC
            "#,
            COLUMNS
        ))
        .bind(customer_id)
        .fetch_all(&self.pool)
        .await?;

        debug!(count = transactions.len(), "Loaded outstanding receivables");
        Ok(transactions)
    }
}
