// SQLite QueueRepository Implementation
//
// Counter mutations are single UPDATE ... RETURNING statements or
// write-first transactions, so SQLite's row locking serializes concurrent
// callers without read-then-write races.

use crate::SqliteQueueTransaction;
use async_trait::async_trait;
use sqlx::SqlitePool;
use waitless_core::domain::{ShopId, ShopQueue, TokenEntry, TokenStatus};
use waitless_core::error::{AppError, Result};
use waitless_core::port::{
    AdvanceOutcome, ClaimOutcome, QueueRepository, QueueTransaction, TransactionalQueueRepository,
};

// Helper to convert sqlx::Error to AppError with structured information
pub(crate) fn map_sqlx_error(err: sqlx::Error) -> AppError {
    match &err {
        sqlx::Error::Database(db_err) => {
            if let Some(code) = db_err.code() {
                let code_str = code.as_ref();

                // SQLite error codes: https://www.sqlite.org/rescode.html
                match code_str {
                    "2067" | "1555" => AppError::Database(format!(
                        "Unique constraint violation: {} ({})",
                        db_err.message(),
                        code_str
                    )),
                    "787" | "3850" => AppError::Database(format!(
                        "Foreign key constraint violation: {} ({})",
                        db_err.message(),
                        code_str
                    )),
                    "275" | "1811" => AppError::Database(format!(
                        "Check constraint violation: {} ({})",
                        db_err.message(),
                        code_str
                    )),
                    "5" => AppError::Database(format!(
                        "Database locked (SQLITE_BUSY): {}",
                        db_err.message()
                    )),
                    "13" => AppError::Database(format!("Database full: {}", db_err.message())),
                    _ => AppError::Database(format!(
                        "Database error [{}]: {}",
                        code_str,
                        db_err.message()
                    )),
                }
            } else {
                AppError::Database(format!("Database error: {}", db_err.message()))
            }
        }
        sqlx::Error::RowNotFound => AppError::Database("Row not found".to_string()),
        sqlx::Error::ColumnNotFound(col) => {
            AppError::Database(format!("Column not found: {}", col))
        }
        _ => AppError::Database(err.to_string()),
    }
}

pub struct SqliteQueueRepository {
    pool: SqlitePool,
}

impl SqliteQueueRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl QueueRepository for SqliteQueueRepository {
    async fn find_shop(&self, shop_id: &str) -> Result<Option<ShopQueue>> {
        let row = sqlx::query_as::<_, ShopRow>("SELECT * FROM shops WHERE shop_id = ?")
            .bind(shop_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(map_sqlx_error)?;

        Ok(row.map(|r| r.into_shop()))
    }

    async fn insert_shop(&self, shop: &ShopQueue) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO shops (
                shop_id, current_token, last_issued_token, daily_served,
                pause_state, last_reset, avg_service_time, reset_secret_hash
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&shop.shop_id)
        .bind(shop.current_token)
        .bind(shop.last_issued_token)
        .bind(shop.daily_served)
        .bind(if shop.pause_state { 1 } else { 0 })
        .bind(shop.last_reset)
        .bind(shop.avg_service_time)
        .bind(&shop.reset_secret_hash)
        .execute(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        Ok(())
    }

    async fn list_shop_ids(&self) -> Result<Vec<ShopId>> {
        let ids: Vec<String> = sqlx::query_scalar("SELECT shop_id FROM shops ORDER BY shop_id")
            .fetch_all(&self.pool)
            .await
            .map_err(map_sqlx_error)?;

        Ok(ids)
    }

    async fn issue_token(
        &self,
        shop_id: &str,
        entry_id: &str,
        created_at: i64,
    ) -> Result<Option<i64>> {
        // Write-first transaction: the counter bump takes the write lock
        // before anything else runs, and the ledger row commits with it.
        let mut tx = self.pool.begin().await.map_err(map_sqlx_error)?;

        let issued: Option<i64> = sqlx::query_scalar(
            r#"
            UPDATE shops
            SET last_issued_token = last_issued_token + 1
            WHERE shop_id = ?
            RETURNING last_issued_token
            "#,
        )
        .bind(shop_id)
        .fetch_optional(&mut *tx)
        .await
        .map_err(map_sqlx_error)?;

        let Some(token_number) = issued else {
            tx.rollback().await.map_err(map_sqlx_error)?;
            return Ok(None);
        };

        sqlx::query(
            r#"
            INSERT INTO tokens (id, shop_id, token_number, status, payment_id, created_at)
            VALUES (?, ?, ?, 'waiting', NULL, ?)
            "#,
        )
        .bind(entry_id)
        .bind(shop_id)
        .bind(token_number)
        .bind(created_at)
        .execute(&mut *tx)
        .await
        .map_err(map_sqlx_error)?;

        tx.commit().await.map_err(map_sqlx_error)?;

        Ok(Some(token_number))
    }

    async fn advance_served(
        &self,
        shop_id: &str,
        served_by: Option<&str>,
        served_at: i64,
    ) -> Result<Option<AdvanceOutcome>> {
        let mut tx = self.pool.begin().await.map_err(map_sqlx_error)?;

        let row: Option<(i64, i64, i64)> = sqlx::query_as(
            r#"
            UPDATE shops
            SET current_token = current_token + 1,
                daily_served = daily_served + 1
            WHERE shop_id = ?
            RETURNING current_token, last_issued_token, daily_served
            "#,
        )
        .bind(shop_id)
        .fetch_optional(&mut *tx)
        .await
        .map_err(map_sqlx_error)?;

        let Some((current_token, last_issued_token, daily_served)) = row else {
            tx.rollback().await.map_err(map_sqlx_error)?;
            return Ok(None);
        };

        // Best-effort ledger mark; the counter advance stands even when no
        // waiting row exists for the new current number
        sqlx::query(
            r#"
            UPDATE tokens
            SET status = 'served', served_by = ?, served_at = ?
            WHERE shop_id = ? AND token_number = ? AND status = 'waiting'
            "#,
        )
        .bind(served_by.unwrap_or("Owner"))
        .bind(served_at)
        .bind(shop_id)
        .bind(current_token)
        .execute(&mut *tx)
        .await
        .map_err(map_sqlx_error)?;

        tx.commit().await.map_err(map_sqlx_error)?;

        Ok(Some(AdvanceOutcome {
            current_token,
            last_issued_token,
            daily_served,
        }))
    }

    async fn advance_skipped(&self, shop_id: &str) -> Result<Option<AdvanceOutcome>> {
        let mut tx = self.pool.begin().await.map_err(map_sqlx_error)?;

        let row: Option<(i64, i64, i64)> = sqlx::query_as(
            r#"
            UPDATE shops
            SET current_token = current_token + 1
            WHERE shop_id = ?
            RETURNING current_token, last_issued_token, daily_served
            "#,
        )
        .bind(shop_id)
        .fetch_optional(&mut *tx)
        .await
        .map_err(map_sqlx_error)?;

        let Some((current_token, last_issued_token, daily_served)) = row else {
            tx.rollback().await.map_err(map_sqlx_error)?;
            return Ok(None);
        };

        // The skipped row is the one we just advanced past
        sqlx::query(
            r#"
            UPDATE tokens
            SET status = 'missed'
            WHERE shop_id = ? AND token_number = ? AND status = 'waiting'
            "#,
        )
        .bind(shop_id)
        .bind(current_token)
        .execute(&mut *tx)
        .await
        .map_err(map_sqlx_error)?;

        tx.commit().await.map_err(map_sqlx_error)?;

        Ok(Some(AdvanceOutcome {
            current_token,
            last_issued_token,
            daily_served,
        }))
    }

    async fn set_pause_state(&self, shop_id: &str, paused: bool) -> Result<bool> {
        let result = sqlx::query("UPDATE shops SET pause_state = ? WHERE shop_id = ?")
            .bind(if paused { 1 } else { 0 })
            .bind(shop_id)
            .execute(&self.pool)
            .await
            .map_err(map_sqlx_error)?;

        Ok(result.rows_affected() > 0)
    }

    async fn claim_oldest_unpaid(&self, shop_id: &str, payment_id: &str) -> Result<ClaimOutcome> {
        // Single-row optimistic claim: pick the candidate, then a
        // compare-and-swap keyed on payment_id still being NULL. A loser
        // gets Lost and the caller retries.
        let candidate: Option<(String, i64)> = sqlx::query_as(
            r#"
            SELECT id, token_number FROM tokens
            WHERE shop_id = ? AND status = 'waiting' AND payment_id IS NULL
            ORDER BY created_at ASC, token_number ASC
            LIMIT 1
            "#,
        )
        .bind(shop_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        let Some((entry_id, token_number)) = candidate else {
            return Ok(ClaimOutcome::NoneWaiting);
        };

        let result = sqlx::query(
            r#"
            UPDATE tokens
            SET payment_id = ?
            WHERE id = ? AND payment_id IS NULL
            "#,
        )
        .bind(payment_id)
        .bind(&entry_id)
        .execute(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        if result.rows_affected() == 0 {
            Ok(ClaimOutcome::Lost)
        } else {
            Ok(ClaimOutcome::Claimed(token_number))
        }
    }

    async fn history_page(
        &self,
        shop_id: &str,
        offset: i64,
        limit: i64,
    ) -> Result<Vec<TokenEntry>> {
        let rows: Vec<TokenRow> = sqlx::query_as(
            r#"
            SELECT * FROM tokens
            WHERE shop_id = ?
            ORDER BY created_at DESC, token_number DESC
            LIMIT ? OFFSET ?
            "#,
        )
        .bind(shop_id)
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        Ok(rows.into_iter().map(|r| r.into_entry()).collect())
    }

    async fn count_tokens(&self, shop_id: &str) -> Result<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM tokens WHERE shop_id = ?")
            .bind(shop_id)
            .fetch_one(&self.pool)
            .await
            .map_err(map_sqlx_error)?;

        Ok(count)
    }

    async fn find_token(&self, shop_id: &str, token_number: i64) -> Result<Option<TokenEntry>> {
        let row: Option<TokenRow> = sqlx::query_as(
            r#"
            SELECT * FROM tokens
            WHERE shop_id = ? AND token_number = ?
            ORDER BY created_at DESC
            LIMIT 1
            "#,
        )
        .bind(shop_id)
        .bind(token_number)
        .fetch_optional(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        Ok(row.map(|r| r.into_entry()))
    }

    async fn reset_if_stale(
        &self,
        shop_id: &str,
        day_start_millis: i64,
        now_millis: i64,
    ) -> Result<bool> {
        let mut tx = self.pool.begin().await.map_err(map_sqlx_error)?;

        // Conditional on last_reset predating the day start: exactly one
        // concurrent caller can win
        let result = sqlx::query(
            r#"
            UPDATE shops
            SET current_token = 0,
                last_issued_token = 0,
                daily_served = 0,
                last_reset = ?
            WHERE shop_id = ? AND last_reset < ?
            "#,
        )
        .bind(now_millis)
        .bind(shop_id)
        .bind(day_start_millis)
        .execute(&mut *tx)
        .await
        .map_err(map_sqlx_error)?;

        if result.rows_affected() == 0 {
            tx.rollback().await.map_err(map_sqlx_error)?;
            return Ok(false);
        }

        // Scheduled reset purges only rows from before today
        sqlx::query("DELETE FROM tokens WHERE shop_id = ? AND created_at < ?")
            .bind(shop_id)
            .bind(day_start_millis)
            .execute(&mut *tx)
            .await
            .map_err(map_sqlx_error)?;

        tx.commit().await.map_err(map_sqlx_error)?;

        Ok(true)
    }

    async fn reset_all(&self, shop_id: &str, now_millis: i64) -> Result<bool> {
        let mut tx = self.pool.begin().await.map_err(map_sqlx_error)?;

        let result = sqlx::query(
            r#"
            UPDATE shops
            SET current_token = 0,
                last_issued_token = 0,
                daily_served = 0,
                last_reset = ?
            WHERE shop_id = ?
            "#,
        )
        .bind(now_millis)
        .bind(shop_id)
        .execute(&mut *tx)
        .await
        .map_err(map_sqlx_error)?;

        if result.rows_affected() == 0 {
            tx.rollback().await.map_err(map_sqlx_error)?;
            return Ok(false);
        }

        // Manual reset purges the whole ledger, not just prior-day rows
        sqlx::query("DELETE FROM tokens WHERE shop_id = ?")
            .bind(shop_id)
            .execute(&mut *tx)
            .await
            .map_err(map_sqlx_error)?;

        tx.commit().await.map_err(map_sqlx_error)?;

        Ok(true)
    }
}

#[async_trait]
impl TransactionalQueueRepository for SqliteQueueRepository {
    async fn begin_transaction(&self) -> Result<Box<dyn QueueTransaction>> {
        let tx = self.pool.begin().await.map_err(map_sqlx_error)?;
        Ok(Box::new(SqliteQueueTransaction::new(tx)))
    }
}

/// SQLite row representation of a shop's counter record
#[derive(Debug, sqlx::FromRow)]
struct ShopRow {
    shop_id: String,
    current_token: i64,
    last_issued_token: i64,
    daily_served: i64,
    pause_state: i64,
    last_reset: i64,
    avg_service_time: f64,
    reset_secret_hash: Option<String>,
}

impl ShopRow {
    fn into_shop(self) -> ShopQueue {
        ShopQueue {
            shop_id: self.shop_id,
            current_token: self.current_token,
            last_issued_token: self.last_issued_token,
            daily_served: self.daily_served,
            pause_state: self.pause_state != 0,
            last_reset: self.last_reset,
            avg_service_time: self.avg_service_time,
            reset_secret_hash: self.reset_secret_hash,
        }
    }
}

/// SQLite row representation of a ledger entry
#[derive(Debug, sqlx::FromRow)]
struct TokenRow {
    id: String,
    shop_id: String,
    token_number: i64,
    status: String,
    payment_id: Option<String>,
    created_at: i64,
    served_by: Option<String>,
    served_at: Option<i64>,
}

impl TokenRow {
    fn into_entry(self) -> TokenEntry {
        // Unknown status strings fall back to waiting
        let status = self.status.parse().unwrap_or(TokenStatus::Waiting);

        TokenEntry {
            id: self.id,
            shop_id: self.shop_id,
            token_number: self.token_number,
            status,
            payment_id: self.payment_id,
            created_at: self.created_at,
            served_by: self.served_by,
            served_at: self.served_at,
        }
    }
}
