//! Daily fortune plugin: quota-limited random fortune draws.
//!
//! Lifecycle: construction opens the fortune store and spawns the midnight
//! reset task; [`FortunePlugin::terminate`] cancels the task, awaits it, and
//! only then lets go of the store. Every failure inside a draw is converted
//! to a user-visible reply at this boundary; nothing propagates to the host.

pub mod quota;
pub mod reset;

use chrono::{DateTime, FixedOffset};
use std::sync::{Arc, Mutex};
use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::application::errors::StorageError;
use crate::application::services::CommandService;
use crate::domain::entities::Command;
use crate::infrastructure::config::FortuneConfig;
use crate::infrastructure::database::FortuneStore;
use quota::{beijing_now, QuotaTracker};

/// Reply when a user has used up today's draws.
pub const MSG_QUOTA_EXHAUSTED: &str = "❌ No draws left today, come back tomorrow";
/// Reply when the fortune table has no rows.
pub const MSG_STORE_EMPTY: &str = "⚠️ The fortune database is empty, please contact the admin";
/// Reply when the storage read fails.
pub const MSG_STORE_ERROR: &str =
    "⚠️ The fortune sticks are unavailable right now, please try again later";
/// Reply for any other internal failure.
pub const MSG_UNKNOWN_ERROR: &str = "⚠️ Something went wrong, please contact the admin";

/// The fortune draw plugin.
pub struct FortunePlugin {
    store: Arc<Mutex<FortuneStore>>,
    tracker: Arc<Mutex<QuotaTracker>>,
    shutdown: watch::Sender<bool>,
    reset_task: Option<JoinHandle<()>>,
}

impl FortunePlugin {
    /// Open the configured store and start the reset task.
    pub fn new(config: &FortuneConfig) -> Result<Self, StorageError> {
        let store = FortuneStore::new(&config.database)?;
        match store.count() {
            Ok(n) => tracing::info!("fortune store opened with {} entries", n),
            Err(e) => tracing::warn!("fortune store opened, count failed: {}", e),
        }
        Self::with_store(store, config.daily_limit)
    }

    /// Wrap an already-open store. Used by tests with in-memory SQLite.
    pub fn with_store(store: FortuneStore, daily_limit: u32) -> Result<Self, StorageError> {
        let tracker = Arc::new(Mutex::new(QuotaTracker::new(daily_limit)));
        let (shutdown, reset_task) = reset::spawn_reset_task(Arc::clone(&tracker));
        Ok(Self {
            store: Arc::new(Mutex::new(store)),
            tracker,
            shutdown,
            reset_task: Some(reset_task),
        })
    }

    /// Register the draw command with the host's command service.
    pub fn register_commands(&self, commands: &mut CommandService, trigger: &str) {
        let store = Arc::clone(&self.store);
        let tracker = Arc::clone(&self.tracker);
        commands.register(
            Command::new(trigger)
                .with_description("Draw today's fortune")
                .with_usage(format!("/{}", trigger))
                .with_handler(move |msg| {
                    Ok(draw_reply(&store, &tracker, msg.sender_id(), beijing_now()))
                }),
        );
    }

    /// Handle one draw request and produce the reply text.
    pub fn handle_draw(&self, user_id: &str) -> String {
        self.handle_draw_at(user_id, beijing_now())
    }

    /// Same as [`handle_draw`](Self::handle_draw) with a pinned clock.
    pub fn handle_draw_at(&self, user_id: &str, now: DateTime<FixedOffset>) -> String {
        draw_reply(&self.store, &self.tracker, user_id, now)
    }

    /// Shut the plugin down: stop the reset task, await it, then release the
    /// store. Safe to call more than once; failures are logged, not surfaced.
    pub async fn terminate(&mut self) {
        if self.shutdown.send(true).is_err() {
            tracing::warn!("reset task already stopped");
        }
        if let Some(handle) = self.reset_task.take() {
            if let Err(e) = handle.await {
                tracing::error!("reset task join failed: {}", e);
            }
        }
        tracing::info!("fortune plugin shut down");
    }
}

/// The draw state machine: quota check, draw, record, format.
///
/// The quota is recorded only after a successful draw, so a failed or empty
/// draw never consumes a request. The denied path performs no mutation.
/// The pre-draw check and the record run under separate lock acquisitions
/// (the store read sits between them), so the record re-verifies the limit:
/// of two draws racing for the last slot, one gets the fortune and the
/// other gets the denial, never a fourth success.
fn draw_reply(
    store: &Mutex<FortuneStore>,
    tracker: &Mutex<QuotaTracker>,
    user_id: &str,
    now: DateTime<FixedOffset>,
) -> String {
    let allowed = match tracker.lock() {
        Ok(tracker) => tracker.check_at(user_id, now),
        Err(e) => {
            tracing::error!("quota tracker unavailable: {}", e);
            return MSG_UNKNOWN_ERROR.to_string();
        }
    };
    if !allowed {
        return MSG_QUOTA_EXHAUSTED.to_string();
    }

    let drawn = match store.lock() {
        Ok(store) => store.draw_random(),
        Err(e) => {
            tracing::error!("fortune store unavailable: {}", e);
            return MSG_UNKNOWN_ERROR.to_string();
        }
    };

    match drawn {
        Ok(Some(text)) => {
            let (count, limit) = match tracker.lock() {
                Ok(mut tracker) => {
                    let limit = tracker.limit();
                    match tracker.try_record_at(user_id, now) {
                        Some(count) => (count, limit),
                        // A concurrent draw took the last slot; the drawn
                        // text is discarded.
                        None => return MSG_QUOTA_EXHAUSTED.to_string(),
                    }
                }
                Err(e) => {
                    tracing::error!("quota tracker unavailable: {}", e);
                    return MSG_UNKNOWN_ERROR.to_string();
                }
            };
            format_reply(&text, limit.saturating_sub(count), limit)
        }
        Ok(None) => MSG_STORE_EMPTY.to_string(),
        Err(e) => {
            tracing::error!("fortune draw failed: {}", e);
            MSG_STORE_ERROR.to_string()
        }
    }
}

fn format_reply(text: &str, remaining: u32, limit: u32) -> String {
    format!(
        "🔮 Fortune of the Day\n\
         ------------------------\n\
         {}\n\
         ------------------------\n\
         🎫 Draws left today: {}/{}",
        text, remaining, limit
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn reply_carries_text_and_remaining() {
        let reply = format_reply("The east wind favors you.", 2, 3);
        assert!(reply.contains("The east wind favors you."));
        assert!(reply.contains("Draws left today: 2/3"));
        assert!(reply.starts_with("🔮"));
    }

    /// A failing storage read maps to the try-later reply and, well past
    /// the daily limit, never consumes quota.
    #[tokio::test]
    async fn storage_failure_yields_try_later_and_keeps_quota() {
        let store = FortuneStore::open_in_memory().expect("in-memory store");
        store.add_fortune("unreachable").expect("seed");
        store.break_table().expect("drop table");

        let mut plugin = FortunePlugin::with_store(store, 3).expect("plugin");
        let day = quota::beijing_offset()
            .with_ymd_and_hms(2024, 5, 1, 9, 0, 0)
            .unwrap();

        for _ in 0..5 {
            assert_eq!(plugin.handle_draw_at("u1", day), MSG_STORE_ERROR);
        }
        plugin.terminate().await;
    }
}
