//! RPC Method Handlers
//!
//! Thin adapter from JSON-RPC methods to the queue service. Mutating
//! methods share one token-bucket rate limit; reads are unmetered.

use crate::error::{throttled, to_rpc_error};
use crate::rate_limiter::RateLimiter;
use crate::types::{
    ClaimRequest, ClaimResponse, GenerateRequest, GenerateResponse, HistoryRequest,
    HistoryResponse, JoinRequest, JoinResponse, NextRequest, NextResponse, PauseRequest,
    PauseResponse, ResetRequest, ResetResponse, SkipRequest, SkipResponse, StatusRequest,
    StatusResponse, WaitTimeRequest, WaitTimeResponse,
};
use jsonrpsee::types::ErrorObjectOwned;
use std::sync::Arc;
use waitless_core::application::QueueService;

/// RPC Handler with injected dependencies
pub struct RpcHandler {
    service: Arc<QueueService>,
    rate_limiter: Arc<RateLimiter>,
}

impl RpcHandler {
    pub fn new(service: Arc<QueueService>) -> Self {
        // Default: 200 burst, 100 req/sec (configurable via env)
        let max_burst: u32 = std::env::var("WAITLESS_RATE_LIMIT_BURST")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(200);

        let rate_per_sec: u32 = std::env::var("WAITLESS_RATE_LIMIT_RATE")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(100);

        Self {
            service,
            rate_limiter: Arc::new(RateLimiter::new(max_burst, rate_per_sec)),
        }
    }

    async fn throttle(&self) -> Result<(), ErrorObjectOwned> {
        if self.rate_limiter.check().await {
            Ok(())
        } else {
            Err(throttled())
        }
    }

    /// queue.status.v1
    pub async fn status(&self, params: StatusRequest) -> Result<StatusResponse, ErrorObjectOwned> {
        let status = self
            .service
            .status(&params.shop_id)
            .await
            .map_err(to_rpc_error)?;

        Ok(StatusResponse {
            shop_id: params.shop_id,
            current_token: status.current_token,
            next_token: status.next_token,
            waiting: status.waiting,
            served_today: status.served_today,
        })
    }

    /// queue.join.v1
    pub async fn join(&self, params: JoinRequest) -> Result<JoinResponse, ErrorObjectOwned> {
        self.throttle().await?;

        let token_number = self
            .service
            .join(&params.shop_id)
            .await
            .map_err(to_rpc_error)?;

        Ok(JoinResponse {
            shop_id: params.shop_id,
            token_number,
        })
    }

    /// queue.next.v1
    pub async fn next(&self, params: NextRequest) -> Result<NextResponse, ErrorObjectOwned> {
        self.throttle().await?;

        let result = self
            .service
            .next_customer(&params.shop_id, params.served_by.as_deref())
            .await
            .map_err(to_rpc_error)?;

        Ok(NextResponse {
            current_token: result.current_token,
            waiting: result.waiting,
            served_today: result.served_today,
        })
    }

    /// queue.skip.v1
    pub async fn skip(&self, params: SkipRequest) -> Result<SkipResponse, ErrorObjectOwned> {
        self.throttle().await?;

        let result = self
            .service
            .skip_customer(&params.shop_id)
            .await
            .map_err(to_rpc_error)?;

        Ok(SkipResponse {
            current_token: result.current_token,
            waiting: result.waiting,
        })
    }

    /// queue.generate.v1
    pub async fn generate(
        &self,
        params: GenerateRequest,
    ) -> Result<GenerateResponse, ErrorObjectOwned> {
        self.throttle().await?;

        let token_number = self
            .service
            .generate_paid_token(&params.shop_id)
            .await
            .map_err(to_rpc_error)?;

        Ok(GenerateResponse {
            shop_id: params.shop_id,
            token_number,
        })
    }

    /// queue.claim.v1
    pub async fn claim(&self, params: ClaimRequest) -> Result<ClaimResponse, ErrorObjectOwned> {
        self.throttle().await?;

        let token_number = self
            .service
            .claim_token(&params.shop_id, &params.payment_id)
            .await
            .map_err(to_rpc_error)?;

        Ok(ClaimResponse {
            shop_id: params.shop_id,
            token_number,
        })
    }

    /// queue.pause.v1
    pub async fn pause(&self, params: PauseRequest) -> Result<PauseResponse, ErrorObjectOwned> {
        self.throttle().await?;

        let pause_state = self
            .service
            .pause(&params.shop_id)
            .await
            .map_err(to_rpc_error)?;

        Ok(PauseResponse {
            shop_id: params.shop_id,
            pause_state,
        })
    }

    /// queue.resume.v1
    pub async fn resume(&self, params: PauseRequest) -> Result<PauseResponse, ErrorObjectOwned> {
        self.throttle().await?;

        let pause_state = self
            .service
            .resume(&params.shop_id)
            .await
            .map_err(to_rpc_error)?;

        Ok(PauseResponse {
            shop_id: params.shop_id,
            pause_state,
        })
    }

    /// queue.waitTime.v1
    pub async fn wait_time(
        &self,
        params: WaitTimeRequest,
    ) -> Result<WaitTimeResponse, ErrorObjectOwned> {
        let estimate = self
            .service
            .wait_time(&params.shop_id, params.token_number)
            .await
            .map_err(to_rpc_error)?;

        Ok(WaitTimeResponse {
            tokens_ahead: estimate.tokens_ahead,
            estimated_minutes: estimate.estimated_minutes,
            avg_service_time: estimate.avg_service_time,
        })
    }

    /// queue.reset.v1
    pub async fn reset(&self, params: ResetRequest) -> Result<ResetResponse, ErrorObjectOwned> {
        self.throttle().await?;

        let status = self
            .service
            .reset_tokens(&params.shop_id, &params.reset_secret)
            .await
            .map_err(to_rpc_error)?;

        Ok(ResetResponse {
            shop_id: params.shop_id,
            current_token: status.current_token,
            next_token: status.next_token,
            waiting: status.waiting,
            served_today: status.served_today,
        })
    }

    /// queue.history.v1
    pub async fn history(
        &self,
        params: HistoryRequest,
    ) -> Result<HistoryResponse, ErrorObjectOwned> {
        let page = self
            .service
            .history(&params.shop_id, params.page, params.limit)
            .await
            .map_err(to_rpc_error)?;

        Ok(HistoryResponse {
            tokens: page.tokens.into_iter().map(Into::into).collect(),
            page: page.page,
            limit: page.limit,
            total_count: page.total_count,
            total_pages: page.total_pages,
            has_more: page.has_more,
        })
    }
}
