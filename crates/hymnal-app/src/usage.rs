//! # Usage Tracker
//!
//! Persists the donation-prompt counters in the settings store. The
//! scheduling rules live in `hymnal_core::usage`.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use hymnal_core::{PromptSchedule, UsageCounters};
use tracing::debug;

use crate::error::AppResult;
use crate::settings::{keys, SettingsStore};

pub struct UsageTracker {
    settings: Arc<dyn SettingsStore>,
    schedule: PromptSchedule,
}

impl UsageTracker {
    pub fn new(settings: Arc<dyn SettingsStore>, schedule: PromptSchedule) -> Self {
        UsageTracker { settings, schedule }
    }

    pub fn schedule(&self) -> &PromptSchedule {
        &self.schedule
    }

    /// Current counters. A fresh install starts at the first threshold.
    pub fn counters(&self) -> UsageCounters {
        let initial = UsageCounters::initial(&self.schedule);
        UsageCounters {
            hymns_read: self.settings.get_i64(keys::HYMNS_READ, initial.hymns_read),
            next_threshold: self
                .settings
                .get_i64(keys::NEXT_PROMPT_THRESHOLD, initial.next_threshold),
            last_prompt_at: self.settings.get_timestamp(keys::LAST_PROMPT_AT),
            prompt_count: self.settings.get_i64(keys::PROMPT_COUNT, initial.prompt_count),
        }
    }

    fn save(&self, counters: &UsageCounters) -> AppResult<()> {
        self.settings.set_i64(keys::HYMNS_READ, counters.hymns_read)?;
        self.settings
            .set_i64(keys::NEXT_PROMPT_THRESHOLD, counters.next_threshold)?;
        self.settings.set_i64(keys::PROMPT_COUNT, counters.prompt_count)?;
        if let Some(at) = counters.last_prompt_at {
            self.settings.set_timestamp(keys::LAST_PROMPT_AT, at)?;
        }
        Ok(())
    }

    /// Counts one more hymn read. Returns the new total. Safe to call from
    /// several tasks at once; the increment happens under the store's lock.
    pub fn record_hymn_read(&self) -> AppResult<i64> {
        let initial = UsageCounters::initial(&self.schedule).hymns_read;
        self.settings.increment_i64(keys::HYMNS_READ, initial)
    }

    /// Whether the donation prompt is due. Supporters are never prompted.
    pub fn should_show_donation_prompt(&self, is_supporter: bool) -> bool {
        self.counters().is_prompt_due(is_supporter)
    }

    /// Advances the threshold after the prompt was shown. Called once per
    /// prompt from the UI, not concurrently with itself.
    pub fn record_prompt_shown(&self, now: DateTime<Utc>) -> AppResult<()> {
        let counters = self.counters().after_prompt_shown(&self.schedule, now);
        self.save(&counters)?;
        debug!(
            next_threshold = counters.next_threshold,
            prompt_count = counters.prompt_count,
            "Donation prompt shown"
        );
        Ok(())
    }

    /// Resets the read counter after a donation. The threshold stays.
    pub fn record_donation(&self) -> AppResult<()> {
        let counters = self.counters().after_donation();
        self.save(&counters)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::settings::MemorySettings;

    fn tracker() -> UsageTracker {
        UsageTracker::new(Arc::new(MemorySettings::new()), PromptSchedule::default())
    }

    #[test]
    fn test_fresh_counters() {
        let counters = tracker().counters();
        assert_eq!(counters.hymns_read, 0);
        assert_eq!(counters.next_threshold, 10);
        assert_eq!(counters.prompt_count, 0);
        assert!(counters.last_prompt_at.is_none());
    }

    #[test]
    fn test_prompt_schedule_through_store() {
        let tracker = tracker();
        let now = Utc::now();

        for _ in 0..9 {
            tracker.record_hymn_read().unwrap();
        }
        assert!(!tracker.should_show_donation_prompt(false));

        assert_eq!(tracker.record_hymn_read().unwrap(), 10);
        assert!(tracker.should_show_donation_prompt(false));
        assert!(!tracker.should_show_donation_prompt(true));

        tracker.record_prompt_shown(now).unwrap();
        assert!(!tracker.should_show_donation_prompt(false));

        let counters = tracker.counters();
        assert_eq!(counters.next_threshold, 25);
        assert_eq!(counters.prompt_count, 1);
        assert_eq!(counters.last_prompt_at, Some(now));
    }

    #[test]
    fn test_reads_from_many_threads_are_all_counted() {
        let tracker = Arc::new(tracker());
        let workers: Vec<_> = (0..4)
            .map(|_| {
                let tracker = tracker.clone();
                std::thread::spawn(move || {
                    for _ in 0..30 {
                        tracker.record_hymn_read().unwrap();
                    }
                })
            })
            .collect();
        for worker in workers {
            worker.join().unwrap();
        }

        assert_eq!(tracker.counters().hymns_read, 120);
    }

    #[test]
    fn test_donation_resets_reads_only() {
        let tracker = tracker();
        for _ in 0..12 {
            tracker.record_hymn_read().unwrap();
        }
        tracker.record_prompt_shown(Utc::now()).unwrap();

        tracker.record_donation().unwrap();
        let counters = tracker.counters();
        assert_eq!(counters.hymns_read, 0);
        assert_eq!(counters.next_threshold, 25);
    }
}
