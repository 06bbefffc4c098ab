//! Per-rule notification cooldown.
//!
//! Once a rule has produced an alert, further alerts for the same rule are
//! suppressed until `cooldown` has elapsed since the last one. The window is
//! strict: an alert exactly `cooldown` after the previous one is allowed,
//! anything earlier is not.
//!
//! # Example
//!
//! ```ignore
//! let mut tracker = CooldownTracker::new();
//! let now = Utc::now();
//! if tracker.allow("high_cpu", Duration::from_secs(300), now) {
//!     tracker.mark_sent("high_cpu", now);
//! }
//! ```

use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::time::Duration;

/// Result of a cooldown check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CooldownResult {
    /// No alert within the window.
    Pass,
    /// An alert was sent less than `cooldown` ago.
    Suppressed,
}

/// Tracks the last alert time of every rule.
#[derive(Debug, Default)]
pub struct CooldownTracker {
    last_sent: HashMap<String, DateTime<Utc>>,
}

impl CooldownTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Check whether `rule` may alert at `now`.
    pub fn check(&self, rule: &str, cooldown: Duration, now: DateTime<Utc>) -> CooldownResult {
        let Some(last) = self.last_sent.get(rule) else {
            return CooldownResult::Pass;
        };

        // A window too large for chrono never expires.
        let Ok(window) = chrono::Duration::from_std(cooldown) else {
            return CooldownResult::Suppressed;
        };

        if now.signed_duration_since(*last) < window {
            CooldownResult::Suppressed
        } else {
            CooldownResult::Pass
        }
    }

    pub fn allow(&self, rule: &str, cooldown: Duration, now: DateTime<Utc>) -> bool {
        self.check(rule, cooldown, now) == CooldownResult::Pass
    }

    /// Record that `rule` alerted at `now`.
    pub fn mark_sent(&mut self, rule: &str, now: DateTime<Utc>) {
        self.last_sent.insert(rule.to_string(), now);
    }

    pub fn last_sent(&self, rule: &str) -> Option<DateTime<Utc>> {
        self.last_sent.get(rule).copied()
    }

    /// Forget every rule's last alert time.
    pub fn reset(&mut self) {
        self.last_sent.clear();
    }

    pub fn len(&self) -> usize {
        self.last_sent.len()
    }

    pub fn is_empty(&self) -> bool {
        self.last_sent.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn t(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(1_700_000_000 + secs, 0).unwrap()
    }

    const FIVE_MINUTES: Duration = Duration::from_secs(300);

    #[test]
    fn first_alert_passes() {
        let tracker = CooldownTracker::new();
        assert_eq!(tracker.check("r", FIVE_MINUTES, t(0)), CooldownResult::Pass);
    }

    #[test]
    fn suppressed_within_window() {
        let mut tracker = CooldownTracker::new();
        tracker.mark_sent("r", t(0));

        assert!(!tracker.allow("r", FIVE_MINUTES, t(1)));
        assert!(!tracker.allow("r", FIVE_MINUTES, t(299)));
    }

    #[test]
    fn passes_once_window_elapsed() {
        let mut tracker = CooldownTracker::new();
        tracker.mark_sent("r", t(0));

        assert!(tracker.allow("r", FIVE_MINUTES, t(300)));
        assert!(tracker.allow("r", FIVE_MINUTES, t(301)));
    }

    #[test]
    fn rules_are_independent() {
        let mut tracker = CooldownTracker::new();
        tracker.mark_sent("a", t(0));

        assert!(!tracker.allow("a", FIVE_MINUTES, t(10)));
        assert!(tracker.allow("b", FIVE_MINUTES, t(10)));
    }

    #[test]
    fn zero_cooldown_never_suppresses() {
        let mut tracker = CooldownTracker::new();
        tracker.mark_sent("r", t(0));
        assert!(tracker.allow("r", Duration::ZERO, t(0)));
    }

    #[test]
    fn clock_going_backwards_stays_suppressed() {
        let mut tracker = CooldownTracker::new();
        tracker.mark_sent("r", t(100));
        assert!(!tracker.allow("r", FIVE_MINUTES, t(50)));
    }

    #[test]
    fn storm_produces_one_alert_per_window() {
        let mut tracker = CooldownTracker::new();
        let mut sent = 0;
        // One evaluation per second for ten minutes.
        for s in 0..600 {
            if tracker.allow("r", FIVE_MINUTES, t(s)) {
                tracker.mark_sent("r", t(s));
                sent += 1;
            }
        }
        assert_eq!(sent, 2);
    }

    #[test]
    fn reset_clears_all_rules() {
        let mut tracker = CooldownTracker::new();
        tracker.mark_sent("a", t(0));
        tracker.mark_sent("b", t(0));
        assert_eq!(tracker.len(), 2);

        tracker.reset();

        assert!(tracker.is_empty());
        assert!(tracker.allow("a", FIVE_MINUTES, t(1)));
        assert_eq!(tracker.last_sent("b"), None);
    }
}
