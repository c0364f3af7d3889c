//! RPC Request/Response Types
//!
//! JSON-RPC method parameters and results. Wire keys are camelCase.

use serde::{Deserialize, Serialize};
use waitless_core::domain::TokenEntry;

/// queue.status.v1 - Current counters for a shop
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusRequest {
    pub shop_id: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusResponse {
    pub shop_id: String,
    pub current_token: i64,
    pub next_token: i64,
    pub waiting: i64,
    pub served_today: i64,
}

/// queue.join.v1 - Customer pulls a ticket
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JoinRequest {
    pub shop_id: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct JoinResponse {
    pub shop_id: String,
    pub token_number: i64,
}

/// queue.next.v1 - Advance service by one token
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NextRequest {
    pub shop_id: String,
    #[serde(default)]
    pub served_by: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NextResponse {
    pub current_token: i64,
    pub waiting: i64,
    pub served_today: i64,
}

/// queue.skip.v1 - Mark the next token missed and advance past it
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SkipRequest {
    pub shop_id: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SkipResponse {
    pub current_token: i64,
    pub waiting: i64,
}

/// queue.generate.v1 - Owner issues the next token at point of sale
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateRequest {
    pub shop_id: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateResponse {
    pub shop_id: String,
    pub token_number: i64,
}

/// queue.claim.v1 - Attach a payment reference to the oldest unclaimed token
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClaimRequest {
    pub shop_id: String,
    pub payment_id: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClaimResponse {
    pub shop_id: String,
    pub token_number: i64,
}

/// queue.pause.v1 / queue.resume.v1
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PauseRequest {
    pub shop_id: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PauseResponse {
    pub shop_id: String,
    pub pause_state: bool,
}

/// queue.waitTime.v1 - Estimated wait for a token number
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WaitTimeRequest {
    pub shop_id: String,
    pub token_number: i64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WaitTimeResponse {
    pub tokens_ahead: i64,
    pub estimated_minutes: f64,
    pub avg_service_time: f64,
}

/// queue.reset.v1 - Manual secret-gated reset
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResetRequest {
    pub shop_id: String,
    pub reset_secret: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResetResponse {
    pub shop_id: String,
    pub current_token: i64,
    pub next_token: i64,
    pub waiting: i64,
    pub served_today: i64,
}

/// queue.history.v1 - Paginated ledger history
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryRequest {
    pub shop_id: String,
    #[serde(default = "default_page")]
    pub page: i64,
    #[serde(default = "default_limit")]
    pub limit: i64,
}

fn default_page() -> i64 {
    1
}

fn default_limit() -> i64 {
    20
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryResponse {
    pub tokens: Vec<TokenDto>,
    pub page: i64,
    pub limit: i64,
    pub total_count: i64,
    pub total_pages: i64,
    pub has_more: bool,
}

/// Wire shape of a ledger entry
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenDto {
    pub id: String,
    pub token_number: i64,
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payment_id: Option<String>,
    pub created_at: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub served_by: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub served_at: Option<i64>,
}

impl From<TokenEntry> for TokenDto {
    fn from(entry: TokenEntry) -> Self {
        Self {
            id: entry.id,
            token_number: entry.token_number,
            status: entry.status.to_string(),
            payment_id: entry.payment_id,
            created_at: entry.created_at,
            served_by: entry.served_by,
            served_at: entry.served_at,
        }
    }
}
