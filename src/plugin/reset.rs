//! Daily quota reset task.
//!
//! A single background task that sleeps until the next Beijing-time
//! midnight, clears the quota tracker, and goes back to sleep. Shutdown is
//! signalled through a watch channel and the task handle is awaited by the
//! plugin before the storage handle is released, so a reset can never fire
//! against a closed store.

use chrono::{DateTime, Days, FixedOffset};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;

use super::quota::{beijing_now, QuotaTracker};

/// The Beijing-time midnight strictly after `now`.
pub fn next_midnight(now: DateTime<FixedOffset>) -> DateTime<FixedOffset> {
    let tomorrow = now
        .date_naive()
        .checked_add_days(Days::new(1))
        .expect("date within chrono range");
    tomorrow
        .and_hms_opt(0, 0, 0)
        .expect("midnight is a valid time")
        .and_local_timezone(*now.offset())
        .single()
        .expect("fixed offsets have no gaps")
}

/// Sleep duration from `now` to the next midnight.
pub fn until_next_midnight(now: DateTime<FixedOffset>) -> Duration {
    (next_midnight(now) - now).to_std().unwrap_or_default()
}

/// Spawn the reset loop. Terminate by sending `true` on the returned sender
/// and awaiting the handle; the loop then exits without clearing.
pub fn spawn_reset_task(
    tracker: Arc<Mutex<QuotaTracker>>,
) -> (watch::Sender<bool>, JoinHandle<()>) {
    let (tx, mut rx) = watch::channel(false);

    let handle = tokio::spawn(async move {
        loop {
            let wait = until_next_midnight(beijing_now());
            tracing::debug!(wait_secs = wait.as_secs(), "reset task sleeping until next midnight");

            tokio::select! {
                _ = tokio::time::sleep(wait) => {
                    match tracker.lock() {
                        Ok(mut tracker) => {
                            tracker.clear();
                            tracing::info!("daily draw records cleared");
                        }
                        Err(e) => {
                            // Poisoned lock: a handler panicked while holding it.
                            tracing::error!("reset task stopping: {}", e);
                            return;
                        }
                    }
                }
                _ = rx.changed() => {
                    tracing::info!("reset task cancelled");
                    return;
                }
            }
        }
    });

    (tx, handle)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::plugin::quota::beijing_offset;
    use chrono::TimeZone;

    #[test]
    fn next_midnight_is_start_of_tomorrow() {
        let now = beijing_offset()
            .with_ymd_and_hms(2024, 5, 1, 23, 30, 0)
            .unwrap();
        let midnight = next_midnight(now);

        assert_eq!(
            midnight,
            beijing_offset().with_ymd_and_hms(2024, 5, 2, 0, 0, 0).unwrap()
        );
        assert_eq!(until_next_midnight(now), Duration::from_secs(30 * 60));
    }

    #[test]
    fn midnight_waits_a_full_day() {
        let now = beijing_offset()
            .with_ymd_and_hms(2024, 5, 1, 0, 0, 0)
            .unwrap();
        assert_eq!(until_next_midnight(now), Duration::from_secs(24 * 3600));
    }

    #[test]
    fn next_midnight_crosses_month_end() {
        let now = beijing_offset()
            .with_ymd_and_hms(2024, 5, 31, 12, 0, 0)
            .unwrap();
        assert_eq!(
            next_midnight(now),
            beijing_offset().with_ymd_and_hms(2024, 6, 1, 0, 0, 0).unwrap()
        );
    }

    #[tokio::test]
    async fn shutdown_exits_without_clearing() {
        let tracker = Arc::new(Mutex::new(QuotaTracker::new(3)));
        tracker.lock().unwrap().try_record("u1");

        let (tx, handle) = spawn_reset_task(Arc::clone(&tracker));
        tx.send(true).expect("task still listening");

        tokio::time::timeout(Duration::from_secs(1), handle)
            .await
            .expect("task exits promptly")
            .expect("task did not panic");

        assert_eq!(tracker.lock().unwrap().len(), 1);
    }
}
