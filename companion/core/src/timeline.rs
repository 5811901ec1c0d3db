//! Virtual-Time Timer Queue
//!
//! Every delay in the companion (typing pacing, the grace period before the
//! mood relaxes, the pause before a reply) is an entry on a [`Timeline`].
//! The timeline only moves when its owner advances it, so the same code runs
//! deterministically under a test (`advance(Duration)`) and under the tokio
//! runtime (which advances it to wall-clock elapsed time).
//!
//! Entries due at the same instant fire in the order they were scheduled.

use std::collections::BTreeMap;
use std::time::Duration;

/// Milliseconds in a duration, saturating
#[must_use]
pub fn millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}

/// Timer queue over virtual milliseconds
#[derive(Debug)]
pub struct Timeline<T> {
    now_ms: u64,
    next_seq: u64,
    queue: BTreeMap<(u64, u64), T>,
}

impl<T> Timeline<T> {
    /// Create an empty timeline at time zero
    #[must_use]
    pub fn new() -> Self {
        Self {
            now_ms: 0,
            next_seq: 0,
            queue: BTreeMap::new(),
        }
    }

    /// Current virtual time in milliseconds
    #[must_use]
    pub fn now_ms(&self) -> u64 {
        self.now_ms
    }

    /// Schedule `task` to fire `delay` after the current time
    pub fn schedule(&mut self, delay: Duration, task: T) {
        let due = self.now_ms.saturating_add(millis(delay));
        let seq = self.next_seq;
        self.next_seq += 1;
        self.queue.insert((due, seq), task);
    }

    /// Due time of the earliest pending entry
    #[must_use]
    pub fn next_due(&self) -> Option<u64> {
        self.queue.keys().next().map(|(due, _)| *due)
    }

    /// Pop the earliest entry due at or before `deadline_ms`
    ///
    /// The clock moves to the entry's due time, so anything the task
    /// schedules is relative to when it fired.
    pub fn pop_due(&mut self, deadline_ms: u64) -> Option<T> {
        let (&(due, seq), _) = self.queue.iter().next()?;
        if due > deadline_ms {
            return None;
        }
        self.now_ms = self.now_ms.max(due);
        self.queue.remove(&(due, seq))
    }

    /// Move the clock forward to `ms`. Never moves backwards.
    pub fn set_now(&mut self, ms: u64) {
        self.now_ms = self.now_ms.max(ms);
    }

    /// Number of pending entries
    #[must_use]
    pub fn len(&self) -> usize {
        self.queue.len()
    }

    /// Whether nothing is pending
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    /// Drop pending entries matching `predicate`
    pub fn cancel_where<F>(&mut self, mut predicate: F)
    where
        F: FnMut(&T) -> bool,
    {
        self.queue.retain(|_, task| !predicate(task));
    }
}

impl<T> Default for Timeline<T> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_entries_fire_in_due_then_schedule_order() {
        let mut timeline = Timeline::new();
        timeline.schedule(Duration::from_millis(100), "late");
        timeline.schedule(Duration::from_millis(50), "early");
        timeline.schedule(Duration::from_millis(50), "early-second");

        assert_eq!(timeline.next_due(), Some(50));
        assert_eq!(timeline.pop_due(200), Some("early"));
        assert_eq!(timeline.pop_due(200), Some("early-second"));
        assert_eq!(timeline.now_ms(), 50);
        assert_eq!(timeline.pop_due(200), Some("late"));
        assert_eq!(timeline.pop_due(200), None);
    }

    #[test]
    fn test_pop_respects_deadline() {
        let mut timeline = Timeline::new();
        timeline.schedule(Duration::from_millis(100), 1);
        assert_eq!(timeline.pop_due(99), None);
        assert_eq!(timeline.now_ms(), 0);
        assert_eq!(timeline.pop_due(100), Some(1));
    }

    #[test]
    fn test_schedule_is_relative_to_now() {
        let mut timeline = Timeline::new();
        timeline.set_now(1_000);
        timeline.schedule(Duration::from_millis(10), ());
        assert_eq!(timeline.next_due(), Some(1_010));

        timeline.set_now(500);
        assert_eq!(timeline.now_ms(), 1_000);
    }

    #[test]
    fn test_cancel_where() {
        let mut timeline = Timeline::new();
        timeline.schedule(Duration::ZERO, 1);
        timeline.schedule(Duration::ZERO, 2);
        timeline.cancel_where(|task| *task == 1);
        assert_eq!(timeline.len(), 1);
        assert_eq!(timeline.pop_due(0), Some(2));
        assert!(timeline.is_empty());
    }
}
