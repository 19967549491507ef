//! Per-user daily draw quota.
//!
//! Records live in memory only; a restart forgets them, which is the
//! intended behavior. Day boundaries follow Beijing time (fixed UTC+8),
//! derived from `Utc::now()` so the host's configured timezone never
//! shifts them.

use chrono::{DateTime, FixedOffset, Utc};
use std::collections::HashMap;

const BEIJING_OFFSET_SECS: i32 = 8 * 3600;

/// Current time in Beijing (fixed UTC+8).
pub fn beijing_now() -> DateTime<FixedOffset> {
    Utc::now().with_timezone(&beijing_offset())
}

pub fn beijing_offset() -> FixedOffset {
    FixedOffset::east_opt(BEIJING_OFFSET_SECS).expect("UTC+8 is a valid offset")
}

/// One user's bookkeeping for the current day.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuotaRecord {
    pub last_request: DateTime<FixedOffset>,
    pub count: u32,
}

/// Tracks per-user draw counts for the current Beijing-time day.
#[derive(Debug)]
pub struct QuotaTracker {
    records: HashMap<String, QuotaRecord>,
    limit: u32,
}

impl QuotaTracker {
    pub fn new(limit: u32) -> Self {
        Self {
            records: HashMap::new(),
            limit,
        }
    }

    pub fn limit(&self) -> u32 {
        self.limit
    }

    /// Whether `user_id` may draw again today. Never mutates state.
    pub fn check(&self, user_id: &str) -> bool {
        self.check_at(user_id, beijing_now())
    }

    pub fn check_at(&self, user_id: &str, now: DateTime<FixedOffset>) -> bool {
        match self.records.get(user_id) {
            Some(rec) if rec.last_request.date_naive() == now.date_naive() => {
                rec.count < self.limit
            }
            // No record yet, or the record is from an earlier day.
            _ => true,
        }
    }

    /// Record a draw, returning the count after the update, or `None` when
    /// the user is already at today's limit.
    ///
    /// A record from an earlier day restarts at 1, same-day records
    /// increment. The limit re-check and the increment share one `&mut self`
    /// borrow: two draws racing past a stale `check` still cannot push a
    /// user over the limit, the loser just wastes its draw.
    pub fn try_record(&mut self, user_id: &str) -> Option<u32> {
        self.try_record_at(user_id, beijing_now())
    }

    pub fn try_record_at(&mut self, user_id: &str, now: DateTime<FixedOffset>) -> Option<u32> {
        match self.records.get_mut(user_id) {
            Some(rec) if rec.last_request.date_naive() == now.date_naive() => {
                if rec.count >= self.limit {
                    return None;
                }
                rec.count += 1;
                rec.last_request = now;
                Some(rec.count)
            }
            Some(rec) => {
                rec.count = 1;
                rec.last_request = now;
                Some(1)
            }
            None => {
                self.records.insert(
                    user_id.to_string(),
                    QuotaRecord {
                        last_request: now,
                        count: 1,
                    },
                );
                Some(1)
            }
        }
    }

    pub fn get(&self, user_id: &str) -> Option<&QuotaRecord> {
        self.records.get(user_id)
    }

    /// Drop every record. Invoked by the daily reset task.
    pub fn clear(&mut self) {
        self.records.clear();
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(day: u32, hour: u32) -> DateTime<FixedOffset> {
        beijing_offset()
            .with_ymd_and_hms(2024, 5, day, hour, 0, 0)
            .unwrap()
    }

    #[test]
    fn allows_up_to_limit_then_denies() {
        let mut tracker = QuotaTracker::new(3);
        let now = at(1, 9);

        for expected in 1..=3 {
            assert!(tracker.check_at("u1", now));
            assert_eq!(tracker.try_record_at("u1", now), Some(expected));
        }
        assert!(!tracker.check_at("u1", now));
    }

    #[test]
    fn record_refuses_past_limit() {
        let mut tracker = QuotaTracker::new(3);
        let now = at(1, 9);
        for _ in 0..3 {
            tracker.try_record_at("u1", now);
        }

        // Even without a prior check, the slot is gone.
        assert_eq!(tracker.try_record_at("u1", now), None);
        assert_eq!(tracker.get("u1").map(|rec| rec.count), Some(3));
    }

    #[test]
    fn check_never_mutates() {
        let mut tracker = QuotaTracker::new(3);
        let now = at(1, 9);
        for _ in 0..3 {
            tracker.try_record_at("u1", now);
        }
        let before = tracker.get("u1").cloned();

        assert!(!tracker.check_at("u1", now));
        assert!(!tracker.check_at("u1", at(1, 23)));
        assert_eq!(tracker.get("u1").cloned(), before);
    }

    #[test]
    fn new_day_restarts_count_at_one() {
        let mut tracker = QuotaTracker::new(3);
        for _ in 0..3 {
            tracker.try_record_at("u1", at(1, 22));
        }
        assert!(!tracker.check_at("u1", at(1, 23)));

        // Next Beijing-time calendar day.
        assert!(tracker.check_at("u1", at(2, 0)));
        assert_eq!(tracker.try_record_at("u1", at(2, 0)), Some(1));
    }

    #[test]
    fn users_are_tracked_independently() {
        let mut tracker = QuotaTracker::new(3);
        let now = at(1, 9);
        for _ in 0..3 {
            tracker.try_record_at("u1", now);
        }
        assert!(!tracker.check_at("u1", now));
        assert!(tracker.check_at("u2", now));
    }

    #[test]
    fn clear_drops_all_records() {
        let mut tracker = QuotaTracker::new(3);
        tracker.try_record_at("u1", at(1, 9));
        tracker.try_record_at("u2", at(1, 9));
        assert_eq!(tracker.len(), 2);

        tracker.clear();
        assert!(tracker.is_empty());
        assert!(tracker.check_at("u1", at(1, 9)));
    }
}
