// Shop Queue Domain Model

use serde::{Deserialize, Serialize};

/// Shop identifier (opaque key owning all queue state)
pub type ShopId = String;

/// Per-shop counter record.
///
/// Normally `0 <= current_token <= last_issued_token`; serving past the end
/// of the queue can push `current_token` one past `last_issued_token`, which
/// is why the waiting count is derived and clamped, never stored.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShopQueue {
    pub shop_id: ShopId,

    /// Token currently being served (0 = none served yet today)
    pub current_token: i64,

    /// Highest token number handed out today
    pub last_issued_token: i64,

    /// Tokens marked served since the last reset
    pub daily_served: i64,

    /// When true, queue-advancing operations are refused
    pub pause_state: bool,

    /// Last successful reset, epoch ms
    pub last_reset: i64,

    /// Average minutes per customer; estimation only, not throughput
    pub avg_service_time: f64,

    /// Hashed manual-reset secret; verification is the SecretVerifier's job
    pub reset_secret_hash: Option<String>,
}

impl ShopQueue {
    /// Create a fresh shop queue with zeroed counters
    pub fn new(shop_id: impl Into<String>, now_millis: i64) -> Self {
        Self {
            shop_id: shop_id.into(),
            current_token: 0,
            last_issued_token: 0,
            daily_served: 0,
            pause_state: false,
            last_reset: now_millis,
            avg_service_time: 5.0,
            reset_secret_hash: None,
        }
    }

    /// Number of customers waiting, derived from the two counters
    pub fn waiting(&self) -> i64 {
        (self.last_issued_token - self.current_token).max(0)
    }

    /// The token number the next join will receive
    pub fn next_token(&self) -> i64 {
        self.last_issued_token + 1
    }
}

/// Published fan-out payload for the general queue-update event
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueueSnapshot {
    pub shop_id: ShopId,
    pub current_token: i64,
    pub waiting: i64,
    pub served_today: i64,

    /// Present only when this update was caused by a reset
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reset_notice: Option<String>,
}

impl QueueSnapshot {
    pub fn of(shop: &ShopQueue) -> Self {
        Self {
            shop_id: shop.shop_id.clone(),
            current_token: shop.current_token,
            waiting: shop.waiting(),
            served_today: shop.daily_served,
            reset_notice: None,
        }
    }
}
