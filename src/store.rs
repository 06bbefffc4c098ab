//! In-memory alert store: active alerts keyed by id plus a capped history.
//!
//! History keeps the most recent [`HISTORY_CAPACITY`] alerts in arrival
//! order and evicts the oldest first. Acknowledging or resolving an alert
//! updates both the active entry and its history copy, so the history
//! always reflects the latest state of an alert it still holds.
//!
//! The active set is not capped: only [`AlertStore::resolve`] removes
//! entries. A rule with a zero cooldown that nobody resolves adds one
//! active alert per tick. A warning is logged when the active count first
//! grows past the history capacity.

use crate::alert::{Alert, AlertLevel};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::{BTreeMap, HashMap, VecDeque};

/// Maximum number of alerts retained in history.
pub const HISTORY_CAPACITY: usize = 100;

/// Number of history entries included in a summary.
pub const RECENT_ALERTS: usize = 10;

/// Compact view of an alert for summaries.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AlertDigest {
    pub id: String,
    pub level: AlertLevel,
    pub title: String,
    pub component: String,
    pub timestamp: DateTime<Utc>,
    pub acknowledged: bool,
    pub resolved: bool,
}

impl From<&Alert> for AlertDigest {
    fn from(alert: &Alert) -> Self {
        Self {
            id: alert.id.clone(),
            level: alert.level,
            title: alert.title.clone(),
            component: alert.component.clone(),
            timestamp: alert.timestamp,
            acknowledged: alert.acknowledged,
            resolved: alert.resolved,
        }
    }
}

/// Snapshot of the store for reporting.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AlertSummary {
    pub active_alerts_count: usize,
    /// Active alerts per level; every level is present.
    pub alerts_by_level: BTreeMap<AlertLevel, usize>,
    /// Last history entries, oldest first.
    pub recent_alerts: Vec<AlertDigest>,
}

#[derive(Debug)]
pub struct AlertStore {
    active: HashMap<String, Alert>,
    history: VecDeque<Alert>,
    capacity: usize,
}

impl Default for AlertStore {
    fn default() -> Self {
        Self::new()
    }
}

impl AlertStore {
    pub fn new() -> Self {
        Self::with_capacity(HISTORY_CAPACITY)
    }

    /// Create a store with a custom history cap (for testing).
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            active: HashMap::new(),
            history: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Add a new alert to the active set and history.
    pub fn record(&mut self, alert: Alert) {
        self.history.push_back(alert.clone());
        while self.history.len() > self.capacity {
            self.history.pop_front();
        }
        self.active.insert(alert.id.clone(), alert);
        if self.active.len() == self.capacity + 1 {
            tracing::warn!(
                active = self.active.len(),
                history_capacity = self.capacity,
                "Active alerts exceed history capacity, resolve alerts to bound memory"
            );
        }
    }

    /// Mark an active alert acknowledged.
    ///
    /// Returns `false` for unknown or already resolved ids.
    pub fn acknowledge(&mut self, id: &str, actor: &str) -> bool {
        let Some(alert) = self.active.get_mut(id) else {
            tracing::debug!(alert_id = %id, "Acknowledge ignored, alert not active");
            return false;
        };
        alert.acknowledged = true;
        self.update_history(id, |a| a.acknowledged = true);
        tracing::info!(alert_id = %id, actor = %actor, "Alert acknowledged");
        true
    }

    /// Resolve an active alert and drop it from the active set.
    ///
    /// Returns `false` for unknown or already resolved ids.
    pub fn resolve(&mut self, id: &str, actor: &str) -> bool {
        if self.active.remove(id).is_none() {
            tracing::debug!(alert_id = %id, "Resolve ignored, alert not active");
            return false;
        }
        self.update_history(id, |a| a.resolved = true);
        tracing::info!(alert_id = %id, actor = %actor, "Alert resolved");
        true
    }

    fn update_history(&mut self, id: &str, update: impl FnOnce(&mut Alert)) {
        if let Some(alert) = self.history.iter_mut().rev().find(|a| a.id == id) {
            update(alert);
        }
    }

    /// Active alerts ordered by timestamp, then id.
    pub fn active_alerts(&self) -> Vec<Alert> {
        let mut alerts: Vec<Alert> = self.active.values().cloned().collect();
        alerts.sort_by(|a, b| a.timestamp.cmp(&b.timestamp).then_with(|| a.id.cmp(&b.id)));
        alerts
    }

    pub fn get(&self, id: &str) -> Option<&Alert> {
        self.active.get(id)
    }

    /// History entries, oldest first.
    pub fn history(&self) -> impl Iterator<Item = &Alert> {
        self.history.iter()
    }

    pub fn active_count(&self) -> usize {
        self.active.len()
    }

    pub fn history_len(&self) -> usize {
        self.history.len()
    }

    pub fn summary(&self) -> AlertSummary {
        let mut alerts_by_level: BTreeMap<AlertLevel, usize> =
            AlertLevel::ALL.iter().map(|level| (*level, 0)).collect();
        for alert in self.active.values() {
            *alerts_by_level.entry(alert.level).or_default() += 1;
        }

        let skip = self.history.len().saturating_sub(RECENT_ALERTS);
        let recent_alerts = self.history.iter().skip(skip).map(AlertDigest::from).collect();

        AlertSummary {
            active_alerts_count: self.active.len(),
            alerts_by_level,
            recent_alerts,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::alert::Metrics;
    use chrono::TimeZone;

    fn alert(id: &str, level: AlertLevel, secs: i64) -> Alert {
        Alert {
            id: id.to_string(),
            level,
            title: format!("Alert: {id}"),
            message: "m".to_string(),
            component: "rule".to_string(),
            timestamp: Utc.timestamp_opt(1_700_000_000 + secs, 0).unwrap(),
            metadata: Metrics::new(),
            resolved: false,
            acknowledged: false,
        }
    }

    #[test]
    fn record_adds_to_active_and_history() {
        let mut store = AlertStore::new();
        store.record(alert("a", AlertLevel::Warning, 0));

        assert_eq!(store.active_count(), 1);
        assert_eq!(store.history_len(), 1);
        assert!(store.get("a").is_some());
    }

    #[test]
    fn history_is_capped_fifo() {
        let mut store = AlertStore::new();
        for i in 0..150 {
            store.record(alert(&format!("a{i}"), AlertLevel::Info, i));
        }

        assert_eq!(store.history_len(), HISTORY_CAPACITY);
        let ids: Vec<&str> = store.history().map(|a| a.id.as_str()).collect();
        assert_eq!(ids.first(), Some(&"a50"));
        assert_eq!(ids.last(), Some(&"a149"));
        // Eviction only trims history, never the active set.
        assert_eq!(store.active_count(), 150);
    }

    #[test]
    fn resolve_removes_from_active_and_marks_history() {
        let mut store = AlertStore::new();
        store.record(alert("a", AlertLevel::Critical, 0));

        assert!(store.resolve("a", "oncall"));

        assert!(store.active_alerts().is_empty());
        let entry = store.history().find(|a| a.id == "a").unwrap();
        assert!(entry.resolved);
    }

    #[test]
    fn resolve_unknown_or_twice_is_noop() {
        let mut store = AlertStore::new();
        store.record(alert("a", AlertLevel::Critical, 0));

        assert!(!store.resolve("missing", "oncall"));
        assert!(store.resolve("a", "oncall"));
        assert!(!store.resolve("a", "oncall"));
        assert!(!store.acknowledge("a", "oncall"));
    }

    #[test]
    fn acknowledge_updates_active_and_history() {
        let mut store = AlertStore::new();
        store.record(alert("a", AlertLevel::Warning, 0));

        assert!(store.acknowledge("a", "oncall"));

        assert!(store.get("a").unwrap().acknowledged);
        assert!(store.history().next().unwrap().acknowledged);
        assert_eq!(store.active_count(), 1);
    }

    #[test]
    fn active_alerts_sorted_by_timestamp_then_id() {
        let mut store = AlertStore::new();
        store.record(alert("c", AlertLevel::Info, 5));
        store.record(alert("b", AlertLevel::Info, 1));
        store.record(alert("a", AlertLevel::Info, 5));

        let ids: Vec<String> = store.active_alerts().into_iter().map(|a| a.id).collect();
        assert_eq!(ids, vec!["b", "a", "c"]);
    }

    #[test]
    fn summary_counts_active_by_level() {
        let mut store = AlertStore::new();
        store.record(alert("a", AlertLevel::Warning, 0));
        store.record(alert("b", AlertLevel::Warning, 1));
        store.record(alert("c", AlertLevel::Emergency, 2));
        store.resolve("c", "oncall");

        let summary = store.summary();
        assert_eq!(summary.active_alerts_count, 2);
        assert_eq!(summary.alerts_by_level[&AlertLevel::Info], 0);
        assert_eq!(summary.alerts_by_level[&AlertLevel::Warning], 2);
        assert_eq!(summary.alerts_by_level[&AlertLevel::Critical], 0);
        assert_eq!(summary.alerts_by_level[&AlertLevel::Emergency], 0);
        assert_eq!(summary.recent_alerts.len(), 3);
        assert!(summary.recent_alerts[2].resolved);
    }

    #[test]
    fn summary_keeps_last_ten_history_entries() {
        let mut store = AlertStore::new();
        for i in 0..25 {
            store.record(alert(&format!("a{i}"), AlertLevel::Info, i));
        }

        let summary = store.summary();
        assert_eq!(summary.recent_alerts.len(), RECENT_ALERTS);
        assert_eq!(summary.recent_alerts[0].id, "a15");
        assert_eq!(summary.recent_alerts[9].id, "a24");
    }

    #[test]
    fn summary_serializes_levels_as_lowercase_keys() {
        let store = AlertStore::new();
        let value = serde_json::to_value(store.summary()).unwrap();
        assert_eq!(value["alerts_by_level"]["emergency"], 0);
        assert_eq!(value["active_alerts_count"], 0);
    }

    #[test]
    fn active_set_is_bounded_only_by_resolve() {
        let mut store = AlertStore::with_capacity(2);
        for i in 0..4 {
            store.record(alert(&format!("a{i}"), AlertLevel::Warning, i));
        }

        assert_eq!(store.history_len(), 2);
        assert_eq!(store.active_count(), 4);
        assert!(store.get("a0").is_some());

        assert!(store.resolve("a0", "oncall"));
        assert_eq!(store.active_count(), 3);
        // a0 was evicted from history; resolving still drops it from the active set.
        assert!(store.history().all(|a| a.id != "a0"));
    }
}
