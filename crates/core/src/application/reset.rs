// Day-Boundary Reset
//
// The per-request reset check and the midnight sweep are two callers of one
// idempotent primitive. The concurrency guard is the store's conditional
// update keyed on `last_reset < start_of_today`, so exactly one concurrent
// caller performs the reset for a shop.

use crate::domain::{QueueSnapshot, ShopQueue};
use crate::error::{AppError, Result};
use crate::port::{QueueEvent, QueuePublisher, QueueRepository, TimeProvider};
use tracing::{info, warn};

/// Reset notice carried on the queue-update event published at reset
pub const RESET_NOTICE: &str = "Queue has been reset for the new day";

const MILLIS_PER_DAY: i64 = 86_400_000;
const MILLIS_PER_MINUTE: i64 = 60_000;

/// Start of the calendar day containing `now_millis`, in a fixed UTC offset.
///
/// Pure integer arithmetic; a fixed offset has no DST transitions.
pub fn start_of_day_millis(now_millis: i64, utc_offset_minutes: i32) -> i64 {
    let offset_ms = utc_offset_minutes as i64 * MILLIS_PER_MINUTE;
    let local = now_millis + offset_ms;
    local.div_euclid(MILLIS_PER_DAY) * MILLIS_PER_DAY - offset_ms
}

/// Whether two instants fall on the same calendar day in the reference zone
pub fn same_calendar_day(a_millis: i64, b_millis: i64, utc_offset_minutes: i32) -> bool {
    start_of_day_millis(a_millis, utc_offset_minutes)
        == start_of_day_millis(b_millis, utc_offset_minutes)
}

/// First instant of the next calendar day after `now_millis`
pub fn next_midnight_millis(now_millis: i64, utc_offset_minutes: i32) -> i64 {
    start_of_day_millis(now_millis, utc_offset_minutes) + MILLIS_PER_DAY
}

/// Outcome of the reset check: the shop state to base decisions on, and
/// whether this caller performed a reset
#[derive(Debug)]
pub struct ResetCheck {
    pub shop: ShopQueue,
    pub did_reset: bool,
}

/// Load a shop and bring its counters up to date across a day boundary.
///
/// Idempotent: once a shop has been reset today, further calls find no day
/// change and mutate nothing. A failed opportunistic reset is logged and
/// swallowed so it never aborts the caller's primary operation.
pub async fn ensure_reset_up_to_date(
    repo: &dyn QueueRepository,
    publisher: &dyn QueuePublisher,
    time_provider: &dyn TimeProvider,
    utc_offset_minutes: i32,
    shop_id: &str,
) -> Result<ResetCheck> {
    let shop = repo
        .find_shop(shop_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Shop {} not found", shop_id)))?;

    let now = time_provider.now_millis();
    if same_calendar_day(shop.last_reset, now, utc_offset_minutes) {
        return Ok(ResetCheck {
            shop,
            did_reset: false,
        });
    }

    let day_start = start_of_day_millis(now, utc_offset_minutes);
    match repo.reset_if_stale(shop_id, day_start, now).await {
        Ok(true) => {
            info!(
                shop_id = %shop_id,
                last_reset = shop.last_reset,
                "Daily reset performed"
            );

            let mut fresh = shop;
            fresh.current_token = 0;
            fresh.last_issued_token = 0;
            fresh.daily_served = 0;
            fresh.last_reset = now;

            let mut snapshot = QueueSnapshot::of(&fresh);
            snapshot.reset_notice = Some(RESET_NOTICE.to_string());
            publisher.publish(QueueEvent::QueueUpdate(snapshot));

            Ok(ResetCheck {
                shop: fresh,
                did_reset: true,
            })
        }
        Ok(false) => {
            // A concurrent caller won the conditional update; re-read
            let fresh = repo
                .find_shop(shop_id)
                .await?
                .ok_or_else(|| AppError::NotFound(format!("Shop {} not found", shop_id)))?;
            Ok(ResetCheck {
                shop: fresh,
                did_reset: false,
            })
        }
        Err(e) => {
            warn!(
                shop_id = %shop_id,
                error = %e,
                "Reset check failed; continuing with pre-reset state"
            );
            Ok(ResetCheck {
                shop,
                did_reset: false,
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // 2024-01-15 12:00:00 UTC
    const NOON: i64 = 1_705_320_000_000;

    #[test]
    fn start_of_day_utc() {
        let start = start_of_day_millis(NOON, 0);
        assert_eq!(start, NOON - 12 * 3_600_000);
        assert_eq!(start % MILLIS_PER_DAY, 0);
    }

    #[test]
    fn start_of_day_positive_offset() {
        // UTC+05:30: local noon is 17:30, day started 17.5h before that
        let start = start_of_day_millis(NOON, 330);
        assert_eq!(start, NOON - (12 * 60 + 330) as i64 * 60_000);
    }

    #[test]
    fn start_of_day_negative_offset_crosses_utc_date() {
        // 00:30 UTC is still the previous day in UTC-05:00
        let half_past_midnight = start_of_day_millis(NOON, 0) + 30 * 60_000;
        let start = start_of_day_millis(half_past_midnight, -300);
        assert!(start < start_of_day_millis(half_past_midnight, 0));
    }

    #[test]
    fn same_day_detection() {
        let morning = start_of_day_millis(NOON, 0) + 3_600_000;
        let evening = start_of_day_millis(NOON, 0) + 23 * 3_600_000;
        assert!(same_calendar_day(morning, evening, 0));
        assert!(!same_calendar_day(morning, evening + 2 * 3_600_000, 0));
    }

    #[test]
    fn next_midnight_is_tomorrow() {
        let next = next_midnight_millis(NOON, 0);
        assert_eq!(next - start_of_day_millis(NOON, 0), MILLIS_PER_DAY);
        assert!(next > NOON);
        assert!(next - NOON <= MILLIS_PER_DAY);
    }
}
