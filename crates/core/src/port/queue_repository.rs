// Queue Repository Port
//
// Every counter mutation here is atomic at the store level: a conditional
// UPDATE or a write-first transaction, never a separate read then write.
// Two concurrent issue_token calls for one shop must never return the same
// number.

use crate::domain::{ShopId, ShopQueue, TokenEntry};
use crate::error::Result;
use async_trait::async_trait;

/// Counter values after a serve/skip advance
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AdvanceOutcome {
    pub current_token: i64,
    pub last_issued_token: i64,
    pub daily_served: i64,
}

impl AdvanceOutcome {
    pub fn waiting(&self) -> i64 {
        (self.last_issued_token - self.current_token).max(0)
    }
}

/// Result of the single-row optimistic claim
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClaimOutcome {
    /// Payment reference attached to this token number
    Claimed(i64),
    /// No waiting, unclaimed ledger row exists
    NoneWaiting,
    /// A concurrent claim won the race on the selected row; caller retries
    Lost,
}

#[async_trait]
pub trait QueueRepository: Send + Sync {
    /// Point lookup of a shop's counter record
    async fn find_shop(&self, shop_id: &str) -> Result<Option<ShopQueue>>;

    /// Insert a counter record (shop provisioning is an external concern;
    /// this exists for collaborators and tests)
    async fn insert_shop(&self, shop: &ShopQueue) -> Result<()>;

    /// All known shop ids, for the daily sweep
    async fn list_shop_ids(&self) -> Result<Vec<ShopId>>;

    /// Atomically increment `last_issued_token` and append the waiting
    /// ledger row for the new number. Returns the issued number, or None
    /// when the shop is unknown.
    async fn issue_token(
        &self,
        shop_id: &str,
        entry_id: &str,
        created_at: i64,
    ) -> Result<Option<i64>>;

    /// Atomically advance `current_token`, increment `daily_served`, and
    /// best-effort mark the ledger row for the new current number as served.
    /// The counter advances even when no matching waiting row exists.
    async fn advance_served(
        &self,
        shop_id: &str,
        served_by: Option<&str>,
        served_at: i64,
    ) -> Result<Option<AdvanceOutcome>>;

    /// Atomically mark the row for `current_token + 1` missed and advance
    /// `current_token`. `daily_served` is unchanged.
    async fn advance_skipped(&self, shop_id: &str) -> Result<Option<AdvanceOutcome>>;

    /// Flip the pause flag. Returns false when the shop is unknown.
    async fn set_pause_state(&self, shop_id: &str, paused: bool) -> Result<bool>;

    /// Compare-and-swap a payment reference onto the oldest waiting,
    /// unclaimed row (earliest created_at, then lowest token_number).
    /// Single-row optimism; never serializes the whole shop.
    async fn claim_oldest_unpaid(&self, shop_id: &str, payment_id: &str) -> Result<ClaimOutcome>;

    /// Newest-first ledger page
    async fn history_page(&self, shop_id: &str, offset: i64, limit: i64)
        -> Result<Vec<TokenEntry>>;

    /// Total ledger rows for the shop
    async fn count_tokens(&self, shop_id: &str) -> Result<i64>;

    /// Point lookup of one ledger row by natural key (tests and diagnostics)
    async fn find_token(&self, shop_id: &str, token_number: i64) -> Result<Option<TokenEntry>>;

    /// Day-boundary reset, conditional on `last_reset < day_start_millis` so
    /// exactly one concurrent caller wins. Zeroes the counters, stamps
    /// `last_reset = now_millis`, purges ledger rows created before the day
    /// start. Returns whether this caller performed the reset.
    async fn reset_if_stale(
        &self,
        shop_id: &str,
        day_start_millis: i64,
        now_millis: i64,
    ) -> Result<bool>;

    /// Manual reset: zero the counters and purge every ledger row for the
    /// shop (stronger than the scheduled purge). Returns false when the
    /// shop is unknown.
    async fn reset_all(&self, shop_id: &str, now_millis: i64) -> Result<bool>;
}
