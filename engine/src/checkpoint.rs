//! Checkpoint scheduling
//!
//! Decides when enough journaling has happened since the last checkpoint to
//! warrant a synthesis, and when a quiet stretch warrants an autonomous
//! dialogue. Pure functions of entry timestamps; no I/O.

use crate::config::CheckpointConfig;
use crate::journal::JournalEntry;
use chrono::{DateTime, Duration, Utc};
use serde::Serialize;

/// Why a checkpoint is or is not due
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckpointDecision {
    /// Entries created after the last checkpoint
    pub window_entries: usize,
    /// Whole days between the earliest and latest entry of the window
    pub span_days: i64,
    pub by_count: bool,
    pub by_span: bool,
    pub due: bool,
}

#[derive(Debug, Clone)]
pub struct CheckpointScheduler {
    entry_threshold: usize,
    span_days: i64,
    dialogue_idle_days: i64,
}

impl CheckpointScheduler {
    pub fn new(config: &CheckpointConfig) -> Self {
        Self {
            entry_threshold: config.entry_threshold,
            span_days: config.span_days,
            dialogue_idle_days: config.dialogue_idle_days,
        }
    }

    /// True when the window since `last_checkpoint_at` holds at least
    /// `entry_threshold` entries or spans at least `span_days` whole days.
    /// A window of fewer than two entries never triggers.
    pub fn should_checkpoint(
        &self,
        entries: &[JournalEntry],
        last_checkpoint_at: Option<DateTime<Utc>>,
    ) -> bool {
        self.decide(entries, last_checkpoint_at).due
    }

    pub fn decide(
        &self,
        entries: &[JournalEntry],
        last_checkpoint_at: Option<DateTime<Utc>>,
    ) -> CheckpointDecision {
        let window: Vec<DateTime<Utc>> = entries
            .iter()
            .map(|e| e.created_at)
            .filter(|at| last_checkpoint_at.map_or(true, |cp| *at > cp))
            .collect();

        let span_days = match (window.iter().min(), window.iter().max()) {
            (Some(earliest), Some(latest)) => (*latest - *earliest).num_days(),
            _ => 0,
        };

        if window.len() < 2 {
            return CheckpointDecision {
                window_entries: window.len(),
                span_days,
                by_count: false,
                by_span: false,
                due: false,
            };
        }

        let by_count = window.len() >= self.entry_threshold;
        let by_span = span_days >= self.span_days;
        let decision = CheckpointDecision {
            window_entries: window.len(),
            span_days,
            by_count,
            by_span,
            due: by_count || by_span,
        };

        tracing::debug!(
            window_entries = decision.window_entries,
            span_days,
            by_count,
            by_span,
            due = decision.due,
            "Checkpoint check"
        );
        decision
    }

    /// True when more than `dialogue_idle_days` have passed since the last entry
    pub fn should_offer_dialogue(&self, last_entry_at: DateTime<Utc>, now: DateTime<Utc>) -> bool {
        now - last_entry_at > Duration::days(self.dialogue_idle_days)
    }
}

impl Default for CheckpointScheduler {
    fn default() -> Self {
        Self::new(&CheckpointConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn entry_on(day: i64) -> JournalEntry {
        JournalEntry {
            id: format!("e{}", day),
            created_at: Utc.with_ymd_and_hms(2024, 1, 1, 8, 0, 0).unwrap() + Duration::days(day),
            title: None,
            moment: None,
            initial_thoughts: None,
            tags: Vec::new(),
            analysis: None,
        }
    }

    /// Most recent first, one entry per day for `count` days
    fn daily(count: i64) -> Vec<JournalEntry> {
        (0..count).rev().map(entry_on).collect()
    }

    #[test]
    fn test_empty_and_single_never_trigger() {
        let scheduler = CheckpointScheduler::default();
        assert!(!scheduler.should_checkpoint(&[], None));
        assert!(!scheduler.should_checkpoint(&[entry_on(0)], None));
    }

    #[test]
    fn test_count_threshold() {
        let scheduler = CheckpointScheduler::default();
        assert!(!scheduler.should_checkpoint(&daily(9), None));
        assert!(scheduler.should_checkpoint(&daily(10), None));
    }

    #[test]
    fn test_span_threshold() {
        let scheduler = CheckpointScheduler::default();
        assert!(!scheduler.should_checkpoint(&[entry_on(29), entry_on(0)], None));

        let decision = scheduler.decide(&[entry_on(30), entry_on(0)], None);
        assert!(decision.due);
        assert!(decision.by_span);
        assert!(!decision.by_count);
        assert_eq!(decision.span_days, 30);
    }

    #[test]
    fn test_window_starts_after_last_checkpoint() {
        let scheduler = CheckpointScheduler::default();
        let entries = daily(12);
        let last_checkpoint = entry_on(5).created_at;

        let decision = scheduler.decide(&entries, Some(last_checkpoint));
        assert_eq!(decision.window_entries, 6);
        assert!(!decision.due);
    }

    #[test]
    fn test_dialogue_offer() {
        let scheduler = CheckpointScheduler::default();
        let last = entry_on(0).created_at;
        assert!(!scheduler.should_offer_dialogue(last, last + Duration::days(3)));
        assert!(scheduler.should_offer_dialogue(last, last + Duration::days(3) + Duration::minutes(1)));
    }
}
