//! Weighted health scoring over named check results.
//!
//! Each check contributes a status score (healthy 100, warning 70,
//! failed 0, anything else 50). Checks named in the critical set count
//! double. The weighted mean is rounded to one decimal and classified as
//! healthy (>= 90), warning (>= 70) or critical.
//!
//! # Example
//!
//! ```ignore
//! let scorer = HealthScorer::default();
//! let checks = HealthScorer::checks_from_metrics(&metrics);
//! let score = scorer.score(&checks);
//! score.augment(&mut metrics);
//! ```

use crate::alert::Metrics;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};
use std::collections::{BTreeMap, BTreeSet};

/// Checks weighted double when none are configured.
pub const DEFAULT_CRITICAL_CHECKS: [&str; 2] = ["discovery_server", "daemon_agents"];

/// Key under which the computed score is inserted into a metrics snapshot.
pub const OVERALL_HEALTH_KEY: &str = "overall_health";

const CRITICAL_WEIGHT: f64 = 2.0;
const NORMAL_WEIGHT: f64 = 1.0;

/// Status reported by a single health check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CheckStatus {
    Healthy,
    Warning,
    Failed,
    #[default]
    #[serde(other)]
    Unknown,
}

impl CheckStatus {
    /// Parse a status string; anything unrecognised is `Unknown`.
    pub fn parse(raw: &str) -> Self {
        match raw {
            "healthy" => CheckStatus::Healthy,
            "warning" => CheckStatus::Warning,
            "failed" => CheckStatus::Failed,
            _ => CheckStatus::Unknown,
        }
    }

    pub fn score(self) -> f64 {
        match self {
            CheckStatus::Healthy => 100.0,
            CheckStatus::Warning => 70.0,
            CheckStatus::Failed => 0.0,
            CheckStatus::Unknown => 50.0,
        }
    }
}

/// Result of one named check: a status plus free-form detail fields.
///
/// On the wire the detail fields sit beside `status` in the same object.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct HealthCheckResult {
    #[serde(default)]
    pub status: CheckStatus,
    #[serde(flatten)]
    pub detail: Map<String, Value>,
}

impl HealthCheckResult {
    pub fn new(status: CheckStatus) -> Self {
        Self {
            status,
            detail: Map::new(),
        }
    }

    /// Build a check result from a JSON object, tolerating any status value.
    pub fn from_object(object: &Map<String, Value>) -> Self {
        let status = object
            .get("status")
            .and_then(Value::as_str)
            .map(CheckStatus::parse)
            .unwrap_or_default();
        let detail = object
            .iter()
            .filter(|(key, _)| key.as_str() != "status")
            .map(|(key, value)| (key.clone(), value.clone()))
            .collect();
        Self { status, detail }
    }
}

/// Overall classification derived from the weighted score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    Healthy,
    Warning,
    Critical,
}

impl HealthStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            HealthStatus::Healthy => "healthy",
            HealthStatus::Warning => "warning",
            HealthStatus::Critical => "critical",
        }
    }
}

/// Weighted score in `0.0..=100.0` plus its classification.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HealthScore {
    pub score: f64,
    pub status: HealthStatus,
}

impl HealthScore {
    /// Insert `overall_health: {score, status}` into a metrics snapshot,
    /// replacing any previous value.
    pub fn augment(&self, metrics: &mut Metrics) {
        metrics.insert(
            OVERALL_HEALTH_KEY.to_string(),
            json!({ "score": self.score, "status": self.status.as_str() }),
        );
    }
}

/// Reduces check results to a [`HealthScore`].
#[derive(Debug, Clone)]
pub struct HealthScorer {
    critical_checks: BTreeSet<String>,
}

impl Default for HealthScorer {
    fn default() -> Self {
        Self::new(DEFAULT_CRITICAL_CHECKS.iter().map(|s| s.to_string()))
    }
}

impl HealthScorer {
    pub fn new(critical_checks: impl IntoIterator<Item = String>) -> Self {
        Self {
            critical_checks: critical_checks.into_iter().collect(),
        }
    }

    pub fn is_critical(&self, check: &str) -> bool {
        self.critical_checks.contains(check)
    }

    /// Score a set of named checks.
    ///
    /// An empty set scores `0.0` and is classified critical: with nothing
    /// reporting there is no evidence the system is up.
    pub fn score(&self, checks: &BTreeMap<String, HealthCheckResult>) -> HealthScore {
        let (weighted_sum, total_weight) =
            checks
                .iter()
                .fold((0.0, 0.0), |(sum, weight), (name, result)| {
                    let w = if self.is_critical(name) {
                        CRITICAL_WEIGHT
                    } else {
                        NORMAL_WEIGHT
                    };
                    (sum + result.status.score() * w, weight + w)
                });

        let raw = if total_weight > 0.0 {
            weighted_sum / total_weight
        } else {
            0.0
        };

        let status = if raw >= 90.0 {
            HealthStatus::Healthy
        } else if raw >= 70.0 {
            HealthStatus::Warning
        } else {
            HealthStatus::Critical
        };

        HealthScore {
            score: (raw * 10.0).round() / 10.0,
            status,
        }
    }

    /// Extract check results from a metrics snapshot.
    ///
    /// Every top-level object except `overall_health` is a check.
    pub fn checks_from_metrics(metrics: &Metrics) -> BTreeMap<String, HealthCheckResult> {
        metrics
            .iter()
            .filter(|(name, _)| name.as_str() != OVERALL_HEALTH_KEY)
            .filter_map(|(name, value)| {
                value
                    .as_object()
                    .map(|object| (name.clone(), HealthCheckResult::from_object(object)))
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn checks(entries: &[(&str, CheckStatus)]) -> BTreeMap<String, HealthCheckResult> {
        entries
            .iter()
            .map(|(name, status)| (name.to_string(), HealthCheckResult::new(*status)))
            .collect()
    }

    #[test]
    fn all_healthy_scores_hundred() {
        let scorer = HealthScorer::default();
        let score = scorer.score(&checks(&[
            ("discovery_server", CheckStatus::Healthy),
            ("system_resources", CheckStatus::Healthy),
        ]));
        assert_eq!(score.score, 100.0);
        assert_eq!(score.status, HealthStatus::Healthy);
    }

    #[test]
    fn critical_checks_weigh_double() {
        let scorer = HealthScorer::default();
        // (0 * 2 + 100 * 1) / 3 = 33.3
        let score = scorer.score(&checks(&[
            ("discovery_server", CheckStatus::Failed),
            ("system_resources", CheckStatus::Healthy),
        ]));
        assert_eq!(score.score, 33.3);
        assert_eq!(score.status, HealthStatus::Critical);

        // Same statuses on two normal checks: (0 + 100) / 2 = 50
        let score = scorer.score(&checks(&[
            ("api", CheckStatus::Failed),
            ("system_resources", CheckStatus::Healthy),
        ]));
        assert_eq!(score.score, 50.0);
    }

    #[test]
    fn warning_band() {
        let scorer = HealthScorer::default();
        // (70 * 2 + 100) / 3 = 80
        let score = scorer.score(&checks(&[
            ("daemon_agents", CheckStatus::Warning),
            ("system_resources", CheckStatus::Healthy),
        ]));
        assert_eq!(score.score, 80.0);
        assert_eq!(score.status, HealthStatus::Warning);
    }

    #[test]
    fn boundaries_are_inclusive() {
        let scorer = HealthScorer::new(Vec::new());
        // (100 * 9 + 0) / 10 = 90
        let mut set = BTreeMap::new();
        for i in 0..9 {
            set.insert(format!("c{i}"), HealthCheckResult::new(CheckStatus::Healthy));
        }
        set.insert("z".to_string(), HealthCheckResult::new(CheckStatus::Failed));
        assert_eq!(scorer.score(&set).status, HealthStatus::Healthy);

        let score = scorer.score(&checks(&[("only", CheckStatus::Warning)]));
        assert_eq!(score.score, 70.0);
        assert_eq!(score.status, HealthStatus::Warning);
    }

    #[test]
    fn unknown_status_scores_fifty() {
        let scorer = HealthScorer::default();
        let score = scorer.score(&checks(&[("x", CheckStatus::Unknown)]));
        assert_eq!(score.score, 50.0);
        assert_eq!(score.status, HealthStatus::Critical);
    }

    #[test]
    fn empty_set_is_critical_zero() {
        let scorer = HealthScorer::default();
        let score = scorer.score(&BTreeMap::new());
        assert_eq!(score.score, 0.0);
        assert_eq!(score.status, HealthStatus::Critical);
    }

    #[test]
    fn score_is_deterministic() {
        let scorer = HealthScorer::default();
        let set = checks(&[
            ("discovery_server", CheckStatus::Warning),
            ("daemon_agents", CheckStatus::Healthy),
            ("system_resources", CheckStatus::Failed),
        ]);
        assert_eq!(scorer.score(&set), scorer.score(&set));
    }

    #[test]
    fn unrecognised_status_string_deserializes_to_unknown() {
        let result: HealthCheckResult =
            serde_json::from_str(r#"{"status": "critical", "cpu_percent": 97.5}"#).unwrap();
        assert_eq!(result.status, CheckStatus::Unknown);
        assert_eq!(result.detail.get("cpu_percent"), Some(&json!(97.5)));
    }

    #[test]
    fn checks_from_metrics_skips_scalars_and_overall_health() {
        let metrics = json!({
            "discovery_server": {"status": "healthy", "response_time_ms": 120},
            "daemon_agents": {"status": 7},
            "overall_health": {"score": 10.0, "status": "critical"},
            "timestamp": "2026-01-01T00:00:00Z"
        });
        let metrics = metrics.as_object().unwrap();

        let checks = HealthScorer::checks_from_metrics(metrics);
        assert_eq!(checks.len(), 2);
        assert_eq!(checks["discovery_server"].status, CheckStatus::Healthy);
        assert_eq!(
            checks["discovery_server"].detail.get("response_time_ms"),
            Some(&json!(120))
        );
        assert_eq!(checks["daemon_agents"].status, CheckStatus::Unknown);
    }

    #[test]
    fn augment_overwrites_previous_value() {
        let mut metrics = Metrics::new();
        metrics.insert(OVERALL_HEALTH_KEY.to_string(), json!("stale"));

        let score = HealthScore {
            score: 42.5,
            status: HealthStatus::Critical,
        };
        score.augment(&mut metrics);

        assert_eq!(
            metrics[OVERALL_HEALTH_KEY],
            json!({"score": 42.5, "status": "critical"})
        );
    }
}
