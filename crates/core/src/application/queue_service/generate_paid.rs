// Paid Token Generation Use Case
//
// The one operation whose correctness depends on the counter and the ledger
// row agreeing, so both writes share one transaction. The counter bump is
// the first statement, taking the write lock up front.

use crate::domain::TokenEntry;
use crate::error::{AppError, Result};
use crate::port::{IdProvider, TimeProvider, TransactionalQueueRepository};

/// Issue the next token for a shop atomically with its ledger row.
///
/// Returns the issued token number. The shop counter and the ledger entry
/// are committed together or not at all.
pub async fn execute(
    tx_repo: &dyn TransactionalQueueRepository,
    id_provider: &dyn IdProvider,
    time_provider: &dyn TimeProvider,
    shop_id: &str,
) -> Result<i64> {
    let mut tx = tx_repo.begin_transaction().await?;

    let token_number = match tx.bump_issued(shop_id).await? {
        Some(n) => n,
        None => {
            tx.rollback().await?;
            return Err(AppError::NotFound(format!("Shop {} not found", shop_id)));
        }
    };

    let entry = TokenEntry::issued(
        id_provider.generate_id(),
        shop_id,
        token_number,
        time_provider.now_millis(),
    );
    tx.insert_token(&entry).await?;

    tx.commit().await?;

    Ok(token_number)
}
