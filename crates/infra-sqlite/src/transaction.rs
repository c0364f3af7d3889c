// SQLite Transaction Implementation

use crate::queue_repository::map_sqlx_error;
use async_trait::async_trait;
use sqlx::{Sqlite, Transaction as SqlxTransaction};
use waitless_core::domain::TokenEntry;
use waitless_core::error::Result;
use waitless_core::port::{QueueTransaction, Transaction};

pub struct SqliteQueueTransaction<'a> {
    tx: SqlxTransaction<'a, Sqlite>,
}

impl<'a> SqliteQueueTransaction<'a> {
    pub fn new(tx: SqlxTransaction<'a, Sqlite>) -> Self {
        Self { tx }
    }
}

#[async_trait]
impl Transaction for SqliteQueueTransaction<'_> {
    async fn commit(mut self: Box<Self>) -> Result<()> {
        self.tx.commit().await.map_err(map_sqlx_error)?;
        Ok(())
    }

    async fn rollback(mut self: Box<Self>) -> Result<()> {
        self.tx.rollback().await.map_err(map_sqlx_error)?;
        Ok(())
    }
}

#[async_trait]
impl QueueTransaction for SqliteQueueTransaction<'_> {
    async fn bump_issued(&mut self, shop_id: &str) -> Result<Option<i64>> {
        // First statement in the transaction: takes the write lock up front
        let issued: Option<i64> = sqlx::query_scalar(
            r#"
            UPDATE shops
            SET last_issued_token = last_issued_token + 1
            WHERE shop_id = ?
            RETURNING last_issued_token
            "#,
        )
        .bind(shop_id)
        .fetch_optional(&mut *self.tx)
        .await
        .map_err(map_sqlx_error)?;

        Ok(issued)
    }

    async fn insert_token(&mut self, entry: &TokenEntry) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO tokens (
                id, shop_id, token_number, status, payment_id,
                created_at, served_by, served_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&entry.id)
        .bind(&entry.shop_id)
        .bind(entry.token_number)
        .bind(entry.status.to_string())
        .bind(&entry.payment_id)
        .bind(entry.created_at)
        .bind(&entry.served_by)
        .bind(entry.served_at)
        .execute(&mut *self.tx)
        .await
        .map_err(map_sqlx_error)?;

        Ok(())
    }
}
