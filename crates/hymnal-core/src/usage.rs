//! # Support Prompt Scheduler
//!
//! Decides when to nudge a non-supporter towards a donation.
//!
//! ```text
//! hymns read:   0 ─── 10 ─── 25 ─── 50 ─── 100 ─── 200 ─── 400 (cap)
//! prompt at:         ▲      ▲      ▲       ▲        ▲       ▲
//!                    └─ threshold advances only when a prompt is shown,
//!                       and stays at the cap (400) after the schedule ends
//! ```
//!
//! Supporters are never prompted. A donation resets the read counter but
//! leaves the threshold where it is.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Default thresholds for the first prompts.
pub const DEFAULT_PROMPT_THRESHOLDS: [i64; 5] = [10, 25, 50, 100, 200];

/// Threshold used once the schedule is exhausted.
pub const DEFAULT_PROMPT_CAP: i64 = 400;

/// Backoff sequence of read-count thresholds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PromptSchedule {
    thresholds: Vec<i64>,
    cap: i64,
}

impl Default for PromptSchedule {
    fn default() -> Self {
        PromptSchedule {
            thresholds: DEFAULT_PROMPT_THRESHOLDS.to_vec(),
            cap: DEFAULT_PROMPT_CAP,
        }
    }
}

impl PromptSchedule {
    /// Creates a schedule. Thresholds are sorted and deduplicated; values
    /// above the cap are dropped.
    pub fn new(mut thresholds: Vec<i64>, cap: i64) -> Self {
        thresholds.retain(|t| *t > 0 && *t <= cap);
        thresholds.sort_unstable();
        thresholds.dedup();
        PromptSchedule { thresholds, cap }
    }

    /// Threshold before any prompt has been shown.
    pub fn first(&self) -> i64 {
        self.thresholds.first().copied().unwrap_or(self.cap)
    }

    /// Threshold that follows `current`.
    pub fn next_after(&self, current: i64) -> i64 {
        self.thresholds
            .iter()
            .copied()
            .find(|t| *t > current)
            .unwrap_or(self.cap)
    }

    /// The cap.
    pub fn cap(&self) -> i64 {
        self.cap
    }

    /// The configured thresholds, ascending.
    pub fn thresholds(&self) -> &[i64] {
        &self.thresholds
    }
}

/// Persisted usage counters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UsageCounters {
    pub hymns_read: i64,
    pub next_threshold: i64,
    pub last_prompt_at: Option<DateTime<Utc>>,
    pub prompt_count: i64,
}

impl UsageCounters {
    /// Counters for a fresh install.
    pub fn initial(schedule: &PromptSchedule) -> Self {
        UsageCounters {
            hymns_read: 0,
            next_threshold: schedule.first(),
            last_prompt_at: None,
            prompt_count: 0,
        }
    }

    /// Whether a prompt is due for this user.
    pub fn is_prompt_due(&self, is_supporter: bool) -> bool {
        !is_supporter && self.hymns_read >= self.next_threshold
    }

    /// Counters after one more hymn was read.
    pub fn after_read(&self) -> Self {
        UsageCounters {
            hymns_read: self.hymns_read.saturating_add(1),
            ..self.clone()
        }
    }

    /// Counters after a prompt was shown at `now`.
    pub fn after_prompt_shown(&self, schedule: &PromptSchedule, now: DateTime<Utc>) -> Self {
        UsageCounters {
            hymns_read: self.hymns_read,
            next_threshold: schedule.next_after(self.next_threshold),
            last_prompt_at: Some(now),
            prompt_count: self.prompt_count.saturating_add(1),
        }
    }

    /// Counters after a donation: reads reset, threshold unchanged.
    pub fn after_donation(&self) -> Self {
        UsageCounters {
            hymns_read: 0,
            ..self.clone()
        }
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
