//! Per-day counters and the daily quota gate.
//!
//! The quota is advisory: it stops the scheduler from initiating further
//! actions once today's successes reach the ceiling. It never aborts an
//! action already in flight.

use std::collections::BTreeMap;

use chrono::{DateTime, Local, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// Counters for one calendar day. Written fully initialised — no
/// absent-field patching on read.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DayStats {
    pub attempts: u32,
    pub successes: u32,
    pub errors: u32,
    pub posts_made: u32,
    pub started_at: DateTime<Utc>,
    pub last_actuator_identity: String,
}

impl DayStats {
    fn fresh() -> Self {
        Self {
            attempts: 0,
            successes: 0,
            errors: 0,
            posts_made: 0,
            started_at: Utc::now(),
            last_actuator_identity: String::new(),
        }
    }
}

/// Tracks per-day stats and gates actions against the daily quota.
///
/// Day keys use the process-local calendar; all date-dependent methods have
/// an explicit-date form so tests don't depend on the wall clock.
#[derive(Debug)]
pub struct QuotaTracker {
    days: BTreeMap<String, DayStats>,
    daily_quota: u32,
}

fn day_key(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}

impl QuotaTracker {
    pub fn new(days: BTreeMap<String, DayStats>, daily_quota: u32) -> Self {
        Self { days, daily_quota }
    }

    pub fn today() -> NaiveDate {
        Local::now().date_naive()
    }

    /// Today's record, created zero-initialised on first access of a new date.
    pub fn stats_for_today(&mut self) -> &mut DayStats {
        self.stats_for(Self::today())
    }

    pub fn stats_for(&mut self, date: NaiveDate) -> &mut DayStats {
        self.days.entry(day_key(date)).or_insert_with(DayStats::fresh)
    }

    /// Whether the day's quota still allows initiating an action.
    pub fn can_act_today(&self) -> bool {
        self.can_act_on(Self::today())
    }

    pub fn can_act_on(&self, date: NaiveDate) -> bool {
        let successes = self
            .days
            .get(&day_key(date))
            .map_or(0, |d| d.successes);
        successes < self.daily_quota
    }

    pub fn daily_quota(&self) -> u32 {
        self.daily_quota
    }

    /// The full per-day map, as persisted.
    pub fn days(&self) -> &BTreeMap<String, DayStats> {
        &self.days
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(s: &str) -> NaiveDate {
        s.parse().unwrap()
    }

    #[test]
    fn first_access_creates_zeroed_record() {
        let mut tracker = QuotaTracker::new(BTreeMap::new(), 50);
        let day = tracker.stats_for(date("2025-03-01"));
        assert_eq!(day.attempts, 0);
        assert_eq!(day.successes, 0);
        assert_eq!(day.errors, 0);
        assert_eq!(day.posts_made, 0);
    }

    #[test]
    fn quota_ceiling_blocks_further_action() {
        let mut tracker = QuotaTracker::new(BTreeMap::new(), 2);
        let d = date("2025-03-01");
        assert!(tracker.can_act_on(d));
        tracker.stats_for(d).successes = 2;
        assert!(!tracker.can_act_on(d));
    }

    #[test]
    fn quota_counts_successes_not_attempts() {
        let mut tracker = QuotaTracker::new(BTreeMap::new(), 2);
        let d = date("2025-03-01");
        let day = tracker.stats_for(d);
        day.attempts = 40;
        day.errors = 38;
        day.successes = 1;
        assert!(tracker.can_act_on(d));
    }

    #[test]
    fn day_rollover_yields_fresh_record() {
        let mut tracker = QuotaTracker::new(BTreeMap::new(), 2);
        let yesterday = date("2025-03-01");
        tracker.stats_for(yesterday).successes = 2;
        assert!(!tracker.can_act_on(yesterday));

        let today = date("2025-03-02");
        assert!(tracker.can_act_on(today));
        let fresh = tracker.stats_for(today);
        assert_eq!(fresh.successes, 0);
        assert_eq!(fresh.attempts, 0);

        // Prior day untouched.
        assert_eq!(tracker.days().get("2025-03-01").unwrap().successes, 2);
    }

    #[test]
    fn zero_quota_never_acts() {
        let tracker = QuotaTracker::new(BTreeMap::new(), 0);
        assert!(!tracker.can_act_on(date("2025-03-01")));
    }
}
