// Transaction port for atomic multi-step operations

use crate::domain::TokenEntry;
use crate::error::Result;
use async_trait::async_trait;

/// Transaction trait for atomic multi-step operations
#[async_trait]
pub trait Transaction: Send {
    /// Commit the transaction
    async fn commit(self: Box<Self>) -> Result<()>;

    /// Rollback the transaction
    async fn rollback(self: Box<Self>) -> Result<()>;
}

/// Transactional QueueRepository operations
#[async_trait]
pub trait TransactionalQueueRepository: Send + Sync {
    /// Begin a new transaction
    async fn begin_transaction(&self) -> Result<Box<dyn QueueTransaction>>;
}

/// QueueRepository operations within a transaction.
///
/// Used by paid-token generation: the counter bump and the ledger row must
/// agree or neither exists. `bump_issued` is the first statement so the
/// write lock is taken up front.
#[async_trait]
pub trait QueueTransaction: Transaction {
    /// Increment `last_issued_token` and return the new value; None when
    /// the shop is unknown
    async fn bump_issued(&mut self, shop_id: &str) -> Result<Option<i64>>;

    /// Insert a ledger row (within the transaction)
    async fn insert_token(&mut self, entry: &TokenEntry) -> Result<()>;
}
