// Daily Reset Scheduler
//
// Sweeps every shop through the shared reset primitive: once immediately at
// startup (covers midnights crossed while the process was down), then once
// per midnight in the reference time zone. Safe to run concurrently with
// the per-request reset check; both paths share the same conditional guard.

use crate::application::reset::{ensure_reset_up_to_date, next_midnight_millis};
use crate::application::shutdown::ShutdownToken;
use crate::port::{QueuePublisher, QueueRepository, TimeProvider};
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info};

pub struct DailyResetScheduler {
    repo: Arc<dyn QueueRepository>,
    publisher: Arc<dyn QueuePublisher>,
    time_provider: Arc<dyn TimeProvider>,
    utc_offset_minutes: i32,
}

impl DailyResetScheduler {
    pub fn new(
        repo: Arc<dyn QueueRepository>,
        publisher: Arc<dyn QueuePublisher>,
        time_provider: Arc<dyn TimeProvider>,
        utc_offset_minutes: i32,
    ) -> Self {
        Self {
            repo,
            publisher,
            time_provider,
            utc_offset_minutes,
        }
    }

    /// Run the scheduler loop (spawn in tokio::spawn).
    ///
    /// Sweep failures are logged and the scheduler re-arms regardless.
    pub async fn run(self, mut shutdown: ShutdownToken) {
        info!(
            utc_offset_minutes = self.utc_offset_minutes,
            "Daily reset scheduler started"
        );

        // Startup sweep: reset any shop whose last_reset predates today
        self.sweep_once().await;

        loop {
            let now = self.time_provider.now_millis();
            let next_midnight = next_midnight_millis(now, self.utc_offset_minutes);
            let sleep_ms = (next_midnight - now).max(0) as u64;

            info!(
                next_midnight = next_midnight,
                sleep_ms = sleep_ms,
                "Daily reset scheduled"
            );

            tokio::select! {
                _ = tokio::time::sleep(Duration::from_millis(sleep_ms)) => {
                    self.sweep_once().await;
                }
                _ = shutdown.wait() => {
                    info!("Daily reset scheduler shutting down");
                    break;
                }
            }
        }
    }

    /// One pass over every shop. Per-shop failures are logged and the sweep
    /// continues with the remaining shops.
    pub async fn sweep_once(&self) {
        let shop_ids = match self.repo.list_shop_ids().await {
            Ok(ids) => ids,
            Err(e) => {
                error!(error = %e, "Daily reset sweep could not list shops");
                return;
            }
        };

        let mut reset_count = 0usize;
        for shop_id in &shop_ids {
            match ensure_reset_up_to_date(
                self.repo.as_ref(),
                self.publisher.as_ref(),
                self.time_provider.as_ref(),
                self.utc_offset_minutes,
                shop_id,
            )
            .await
            {
                Ok(check) if check.did_reset => reset_count += 1,
                Ok(_) => {}
                Err(e) => {
                    error!(shop_id = %shop_id, error = %e, "Daily reset failed for shop");
                }
            }
        }

        info!(
            shops = shop_ids.len(),
            resets = reset_count,
            "Daily reset sweep completed"
        );
    }
}
