//! Rule conditions over dotted metric paths.
//!
//! A condition is a closed set of comparisons against the rule threshold.
//! Configuration may use the structured form
//! (`{"kind": "above", "metric": "system_resources.cpu_percent"}`) or one of
//! the legacy expression strings, which map to a structured condition by
//! exact match. Any other string becomes [`Condition::Unsupported`] and
//! never fires.
//!
//! Missing metrics take a neutral default (0 for numbers, `"unknown"` for
//! strings, empty for lists). A present value of the wrong type is an
//! [`EvaluationError`].

use crate::alert::Metrics;
use crate::error::EvaluationError;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Value, json};
use std::fmt;

/// Dotted path into a metrics snapshot, e.g. `system_resources.cpu_percent`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MetricPath(String);

impl MetricPath {
    pub fn new(path: impl Into<String>) -> Self {
        Self(path.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Walk the snapshot one segment at a time.
    pub fn lookup<'a>(&self, metrics: &'a Metrics) -> Option<&'a Value> {
        let mut segments = self.0.split('.');
        let mut current = metrics.get(segments.next()?)?;
        for segment in segments {
            current = current.as_object()?.get(segment)?;
        }
        Some(current)
    }
}

impl fmt::Display for MetricPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Legacy expression strings and their structured equivalents.
const LEGACY_CONDITIONS: [(&str, &str, &str, Option<&str>); 6] = [
    (
        "response_time_ms > threshold",
        "above",
        "discovery_server.response_time_ms",
        None,
    ),
    (
        "active_agents < threshold",
        "below",
        "daemon_agents.active_daemon_agents",
        None,
    ),
    (
        "cpu_percent > threshold",
        "above",
        "system_resources.cpu_percent",
        None,
    ),
    (
        "memory_percent > threshold",
        "above",
        "system_resources.memory_percent",
        None,
    ),
    (
        "overall_health == 'critical'",
        "equals",
        "overall_health.status",
        Some("critical"),
    ),
    (
        "deprecated_services_detected > threshold",
        "count_above",
        "deprecated_services.running_deprecated_services",
        None,
    ),
];

/// A rule condition.
#[derive(Debug, Clone, PartialEq)]
pub enum Condition {
    /// Numeric value strictly greater than the threshold.
    Above { metric: MetricPath },
    /// Numeric value strictly less than the threshold.
    Below { metric: MetricPath },
    /// String value equal to a literal. The threshold is ignored.
    Equals { metric: MetricPath, value: String },
    /// List length strictly greater than the threshold.
    CountAbove { metric: MetricPath },
    /// Unrecognised expression, kept verbatim. Always false.
    Unsupported(String),
}

impl Condition {
    /// Parse a legacy expression string by exact match.
    pub fn from_legacy(expression: &str) -> Self {
        LEGACY_CONDITIONS
            .iter()
            .find(|(legacy, ..)| *legacy == expression)
            .map(|(_, kind, metric, value)| {
                Self::structured(kind, Some(metric.to_string()), value.map(str::to_string))
            })
            .unwrap_or_else(|| Condition::Unsupported(expression.to_string()))
    }

    fn structured(kind: &str, metric: Option<String>, value: Option<String>) -> Self {
        let Some(metric) = metric.filter(|m| !m.is_empty()).map(MetricPath::new) else {
            return Condition::Unsupported(format!("{kind} (missing metric)"));
        };
        match (kind, value) {
            ("above", _) => Condition::Above { metric },
            ("below", _) => Condition::Below { metric },
            ("count_above", _) => Condition::CountAbove { metric },
            ("equals", Some(value)) => Condition::Equals { metric, value },
            ("equals", None) => Condition::Unsupported("equals (missing value)".to_string()),
            (other, _) => Condition::Unsupported(other.to_string()),
        }
    }

    pub fn metric(&self) -> Option<&MetricPath> {
        match self {
            Condition::Above { metric }
            | Condition::Below { metric }
            | Condition::Equals { metric, .. }
            | Condition::CountAbove { metric } => Some(metric),
            Condition::Unsupported(_) => None,
        }
    }

    pub fn is_supported(&self) -> bool {
        !matches!(self, Condition::Unsupported(_))
    }

    /// Evaluate against a snapshot.
    ///
    /// # Errors
    ///
    /// Returns [`EvaluationError::TypeMismatch`] when the metric is present
    /// with a type the condition cannot compare (including `null`).
    pub fn evaluate(&self, metrics: &Metrics, threshold: f64) -> Result<bool, EvaluationError> {
        match self {
            Condition::Above { metric } => Ok(numeric(metric, metrics)? > threshold),
            Condition::Below { metric } => Ok(numeric(metric, metrics)? < threshold),
            Condition::Equals { metric, value } => Ok(text(metric, metrics)? == value.as_str()),
            Condition::CountAbove { metric } => Ok(list(metric, metrics)?.len() as f64 > threshold),
            Condition::Unsupported(raw) => {
                tracing::warn!(condition = %raw, "Unsupported condition, evaluating as false");
                Ok(false)
            }
        }
    }

    /// The value the condition compared, for message templates.
    ///
    /// Missing metrics yield the same defaults evaluation uses.
    pub fn observed_value(&self, metrics: &Metrics) -> Value {
        let found = self.metric().and_then(|m| m.lookup(metrics)).cloned();
        match self {
            Condition::Above { .. } | Condition::Below { .. } => found.unwrap_or(json!(0)),
            Condition::Equals { .. } => found.unwrap_or(json!("unknown")),
            Condition::CountAbove { .. } => found.unwrap_or(json!([])),
            Condition::Unsupported(_) => Value::Null,
        }
    }
}

impl fmt::Display for Condition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Condition::Above { metric } => write!(f, "{metric} > threshold"),
            Condition::Below { metric } => write!(f, "{metric} < threshold"),
            Condition::Equals { metric, value } => write!(f, "{metric} == '{value}'"),
            Condition::CountAbove { metric } => write!(f, "len({metric}) > threshold"),
            Condition::Unsupported(raw) => write!(f, "unsupported: {raw}"),
        }
    }
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

fn mismatch(metric: &MetricPath, expected: &'static str, found: &Value) -> EvaluationError {
    EvaluationError::TypeMismatch {
        path: metric.to_string(),
        expected,
        found: type_name(found).to_string(),
    }
}

fn numeric(metric: &MetricPath, metrics: &Metrics) -> Result<f64, EvaluationError> {
    match metric.lookup(metrics) {
        None => Ok(0.0),
        Some(value) => value
            .as_f64()
            .ok_or_else(|| mismatch(metric, "number", value)),
    }
}

fn text<'a>(metric: &MetricPath, metrics: &'a Metrics) -> Result<&'a str, EvaluationError> {
    match metric.lookup(metrics) {
        None => Ok("unknown"),
        Some(value) => value
            .as_str()
            .ok_or_else(|| mismatch(metric, "string", value)),
    }
}

fn list<'a>(metric: &MetricPath, metrics: &'a Metrics) -> Result<&'a [Value], EvaluationError> {
    match metric.lookup(metrics) {
        None => Ok(&[]),
        Some(value) => value
            .as_array()
            .map(Vec::as_slice)
            .ok_or_else(|| mismatch(metric, "array", value)),
    }
}

// ===================================================================
// Serde: legacy string or structured object
// ===================================================================

#[derive(Deserialize)]
#[serde(untagged)]
enum RawCondition {
    Legacy(String),
    Structured {
        kind: String,
        #[serde(default)]
        metric: Option<String>,
        #[serde(default)]
        value: Option<String>,
    },
}

#[derive(Serialize)]
struct StructuredOut<'a> {
    kind: &'a str,
    metric: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    value: Option<&'a str>,
}

impl<'de> Deserialize<'de> for Condition {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        Ok(match RawCondition::deserialize(deserializer)? {
            RawCondition::Legacy(expression) => Condition::from_legacy(&expression),
            RawCondition::Structured {
                kind,
                metric,
                value,
            } => Condition::structured(&kind, metric, value),
        })
    }
}

impl Serialize for Condition {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let (kind, metric, value) = match self {
            Condition::Above { metric } => ("above", metric, None),
            Condition::Below { metric } => ("below", metric, None),
            Condition::Equals { metric, value } => ("equals", metric, Some(value.as_str())),
            Condition::CountAbove { metric } => ("count_above", metric, None),
            Condition::Unsupported(raw) => return serializer.serialize_str(raw),
        };
        StructuredOut {
            kind,
            metric: metric.as_str(),
            value,
        }
        .serialize(serializer)
    }
}
