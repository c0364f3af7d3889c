// Queue Service - The token engine use cases

pub mod generate_paid;

use crate::application::reset::ensure_reset_up_to_date;
use crate::domain::{QueueSnapshot, ShopQueue, TokenEntry};
use crate::error::{AppError, Result};
use crate::port::{
    ClaimOutcome, IdProvider, QueueEvent, QueuePublisher, QueueRepository, SecretVerifier,
    TimeProvider, TransactionalQueueRepository,
};
use serde::Serialize;
use std::sync::Arc;
use tracing::info;

/// Hard cap on history page size
pub const MAX_HISTORY_LIMIT: i64 = 100;
/// Default history page size when the caller does not specify one
pub const DEFAULT_HISTORY_LIMIT: i64 = 20;

/// queue status payload
#[derive(Debug, Clone, Serialize)]
pub struct QueueStatus {
    pub current_token: i64,
    pub next_token: i64,
    pub waiting: i64,
    pub served_today: i64,
}

/// next-customer result
#[derive(Debug, Clone, Serialize)]
pub struct ServeResult {
    pub current_token: i64,
    pub waiting: i64,
    pub served_today: i64,
}

/// skip-customer result
#[derive(Debug, Clone, Serialize)]
pub struct SkipResult {
    pub current_token: i64,
    pub waiting: i64,
}

/// wait-time estimate; `estimated_minutes` is derived, never authoritative
#[derive(Debug, Clone, Serialize)]
pub struct WaitEstimate {
    pub tokens_ahead: i64,
    pub estimated_minutes: f64,
    pub avg_service_time: f64,
}

/// one page of ledger history, newest first
#[derive(Debug, Clone, Serialize)]
pub struct HistoryPage {
    pub tokens: Vec<TokenEntry>,
    pub page: i64,
    pub limit: i64,
    pub total_count: i64,
    pub total_pages: i64,
    pub has_more: bool,
}

/// The token engine.
///
/// Per-shop linearization of counter mutations lives in the repository
/// (atomic conditional updates); this service sequences the reset check,
/// pause policy, persistence, and fan-out around them.
pub struct QueueService {
    repo: Arc<dyn QueueRepository>,
    tx_repo: Arc<dyn TransactionalQueueRepository>,
    publisher: Arc<dyn QueuePublisher>,
    id_provider: Arc<dyn IdProvider>,
    time_provider: Arc<dyn TimeProvider>,
    secret_verifier: Arc<dyn SecretVerifier>,
    utc_offset_minutes: i32,
}

impl QueueService {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        repo: Arc<dyn QueueRepository>,
        tx_repo: Arc<dyn TransactionalQueueRepository>,
        publisher: Arc<dyn QueuePublisher>,
        id_provider: Arc<dyn IdProvider>,
        time_provider: Arc<dyn TimeProvider>,
        secret_verifier: Arc<dyn SecretVerifier>,
        utc_offset_minutes: i32,
    ) -> Self {
        Self {
            repo,
            tx_repo,
            publisher,
            id_provider,
            time_provider,
            secret_verifier,
            utc_offset_minutes,
        }
    }

    /// Current counters for a shop. Read-only apart from the reset check.
    pub async fn status(&self, shop_id: &str) -> Result<QueueStatus> {
        let shop = self.checked_shop(shop_id).await?;
        Ok(QueueStatus {
            current_token: shop.current_token,
            next_token: shop.next_token(),
            waiting: shop.waiting(),
            served_today: shop.daily_served,
        })
    }

    /// Customer pulls a ticket. Deliberately not blocked by pause_state:
    /// customers may still join while service is paused.
    pub async fn join(&self, shop_id: &str) -> Result<i64> {
        self.checked_shop(shop_id).await?;

        let entry_id = self.id_provider.generate_id();
        let created_at = self.time_provider.now_millis();
        let token = self
            .repo
            .issue_token(shop_id, &entry_id, created_at)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Shop {} not found", shop_id)))?;

        info!(shop_id = %shop_id, token = token, "Token issued");
        self.publish_current_state(shop_id).await;
        Ok(token)
    }

    /// Staff/owner advances service by one token
    pub async fn next_customer(
        &self,
        shop_id: &str,
        served_by: Option<&str>,
    ) -> Result<ServeResult> {
        let shop = self.checked_shop(shop_id).await?;
        self.refuse_if_paused(&shop)?;

        let served_at = self.time_provider.now_millis();
        let outcome = self
            .repo
            .advance_served(shop_id, served_by, served_at)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Shop {} not found", shop_id)))?;

        info!(
            shop_id = %shop_id,
            token = outcome.current_token,
            served_by = served_by.unwrap_or("Owner"),
            "Customer served"
        );

        self.publisher.publish(QueueEvent::QueueUpdate(QueueSnapshot {
            shop_id: shop_id.to_string(),
            current_token: outcome.current_token,
            waiting: outcome.waiting(),
            served_today: outcome.daily_served,
            reset_notice: None,
        }));

        Ok(ServeResult {
            current_token: outcome.current_token,
            waiting: outcome.waiting(),
            served_today: outcome.daily_served,
        })
    }

    /// Mark the next token missed and advance past it
    pub async fn skip_customer(&self, shop_id: &str) -> Result<SkipResult> {
        let shop = self.checked_shop(shop_id).await?;
        self.refuse_if_paused(&shop)?;

        let outcome = self
            .repo
            .advance_skipped(shop_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Shop {} not found", shop_id)))?;

        info!(
            shop_id = %shop_id,
            token = outcome.current_token,
            "Customer skipped"
        );

        self.publisher.publish(QueueEvent::QueueUpdate(QueueSnapshot {
            shop_id: shop_id.to_string(),
            current_token: outcome.current_token,
            waiting: outcome.waiting(),
            served_today: outcome.daily_served,
            reset_notice: None,
        }));

        Ok(SkipResult {
            current_token: outcome.current_token,
            waiting: outcome.waiting(),
        })
    }

    /// Owner issues the next token at point of sale. Counter bump and
    /// ledger row are one transaction: both commit or neither.
    pub async fn generate_paid_token(&self, shop_id: &str) -> Result<i64> {
        let shop = self.checked_shop(shop_id).await?;
        self.refuse_if_paused(&shop)?;

        let token = generate_paid::execute(
            self.tx_repo.as_ref(),
            self.id_provider.as_ref(),
            self.time_provider.as_ref(),
            shop_id,
        )
        .await?;

        info!(shop_id = %shop_id, token = token, "Paid token generated");
        self.publish_current_state(shop_id).await;
        Ok(token)
    }

    /// Customer attaches a payment reference to the oldest unclaimed
    /// waiting token. Single-row compare-and-swap; retried by the caller
    /// on Conflict.
    pub async fn claim_token(&self, shop_id: &str, payment_id: &str) -> Result<i64> {
        if payment_id.is_empty() {
            return Err(AppError::Validation("paymentId is required".to_string()));
        }
        let shop = self.checked_shop(shop_id).await?;
        self.refuse_if_paused(&shop)?;

        match self.repo.claim_oldest_unpaid(shop_id, payment_id).await? {
            ClaimOutcome::Claimed(token) => {
                info!(shop_id = %shop_id, token = token, "Token claimed");
                self.publish_current_state(shop_id).await;
                Ok(token)
            }
            ClaimOutcome::NoneWaiting => Err(AppError::NotFound(
                "No waiting tokens available".to_string(),
            )),
            ClaimOutcome::Lost => Err(AppError::Conflict(
                "Token already claimed, please retry".to_string(),
            )),
        }
    }

    /// Pause the queue; publishes the distinct pause event only
    pub async fn pause(&self, shop_id: &str) -> Result<bool> {
        self.set_paused(shop_id, true).await
    }

    /// Resume the queue; publishes the distinct resume event only
    pub async fn resume(&self, shop_id: &str) -> Result<bool> {
        self.set_paused(shop_id, false).await
    }

    /// Pure read: estimated wait for a given token number
    pub async fn wait_time(&self, shop_id: &str, token_number: i64) -> Result<WaitEstimate> {
        require_shop_id(shop_id)?;
        let shop = self
            .repo
            .find_shop(shop_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Shop {} not found", shop_id)))?;

        let tokens_ahead = (token_number - shop.current_token - 1).max(0);
        Ok(WaitEstimate {
            tokens_ahead,
            estimated_minutes: tokens_ahead as f64 * shop.avg_service_time,
            avg_service_time: shop.avg_service_time,
        })
    }

    /// Manual owner reset, gated on the configured reset secret. Purges the
    /// whole ledger for the shop, not just prior-day rows.
    pub async fn reset_tokens(&self, shop_id: &str, supplied_secret: &str) -> Result<QueueStatus> {
        require_shop_id(shop_id)?;
        if supplied_secret.is_empty() {
            return Err(AppError::Validation(
                "Reset password is required".to_string(),
            ));
        }

        let shop = self
            .repo
            .find_shop(shop_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Shop {} not found", shop_id)))?;

        let stored_hash = shop.reset_secret_hash.as_deref().ok_or_else(|| {
            AppError::Validation("Reset password not set. Please set it first.".to_string())
        })?;

        if !self.secret_verifier.verify(supplied_secret, stored_hash) {
            return Err(AppError::Unauthorized("Invalid reset password".to_string()));
        }

        let now = self.time_provider.now_millis();
        if !self.repo.reset_all(shop_id, now).await? {
            return Err(AppError::NotFound(format!("Shop {} not found", shop_id)));
        }

        info!(shop_id = %shop_id, "Tokens manually reset");

        self.publisher.publish(QueueEvent::QueueUpdate(QueueSnapshot {
            shop_id: shop_id.to_string(),
            current_token: 0,
            waiting: 0,
            served_today: 0,
            reset_notice: None,
        }));

        Ok(QueueStatus {
            current_token: 0,
            next_token: 1,
            waiting: 0,
            served_today: 0,
        })
    }

    /// Paginated ledger history, newest first
    pub async fn history(&self, shop_id: &str, page: i64, limit: i64) -> Result<HistoryPage> {
        require_shop_id(shop_id)?;

        // Verify shop exists before paging
        self.repo
            .find_shop(shop_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Shop {} not found", shop_id)))?;

        let page = page.max(1);
        let limit = if limit <= 0 {
            DEFAULT_HISTORY_LIMIT
        } else {
            limit.min(MAX_HISTORY_LIMIT)
        };
        let offset = (page - 1) * limit;

        let total_count = self.repo.count_tokens(shop_id).await?;
        let tokens = self.repo.history_page(shop_id, offset, limit).await?;
        let total_pages = (total_count + limit - 1) / limit;

        Ok(HistoryPage {
            tokens,
            page,
            limit,
            total_count,
            total_pages,
            has_more: page < total_pages,
        })
    }

    /// Reset check shared by all queue operations; returns the shop state
    /// that pause/issuance decisions are based on
    async fn checked_shop(&self, shop_id: &str) -> Result<ShopQueue> {
        require_shop_id(shop_id)?;
        let check = ensure_reset_up_to_date(
            self.repo.as_ref(),
            self.publisher.as_ref(),
            self.time_provider.as_ref(),
            self.utc_offset_minutes,
            shop_id,
        )
        .await?;
        Ok(check.shop)
    }

    fn refuse_if_paused(&self, shop: &ShopQueue) -> Result<()> {
        if shop.pause_state {
            return Err(AppError::Unavailable(format!(
                "Queue for shop {} is paused",
                shop.shop_id
            )));
        }
        Ok(())
    }

    async fn set_paused(&self, shop_id: &str, paused: bool) -> Result<bool> {
        require_shop_id(shop_id)?;
        if !self.repo.set_pause_state(shop_id, paused).await? {
            return Err(AppError::NotFound(format!("Shop {} not found", shop_id)));
        }

        info!(shop_id = %shop_id, paused = paused, "Pause state changed");

        let event = if paused {
            QueueEvent::QueuePaused {
                shop_id: shop_id.to_string(),
                pause_state: true,
            }
        } else {
            QueueEvent::QueueResumed {
                shop_id: shop_id.to_string(),
                pause_state: false,
            }
        };
        self.publisher.publish(event);
        Ok(paused)
    }

    /// Re-read counters and publish a queue-update. Best effort: a read
    /// failure here must not fail the already-committed mutation.
    async fn publish_current_state(&self, shop_id: &str) {
        match self.repo.find_shop(shop_id).await {
            Ok(Some(shop)) => {
                self.publisher
                    .publish(QueueEvent::QueueUpdate(QueueSnapshot::of(&shop)));
            }
            Ok(None) => {}
            Err(e) => {
                tracing::warn!(shop_id = %shop_id, error = %e, "Post-mutation snapshot read failed");
            }
        }
    }
}

/// Every operation takes a non-empty shop id, lookups included
fn require_shop_id(shop_id: &str) -> Result<()> {
    if shop_id.is_empty() {
        return Err(AppError::Validation("Shop ID is required".to_string()));
    }
    Ok(())
}
