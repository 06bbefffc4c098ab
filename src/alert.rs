//! Alert data model shared by the engine, store and channels.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

/// A metrics snapshot: top-level check names mapped to their JSON payloads.
pub type Metrics = Map<String, Value>;

/// Severity of an alert, ordered from least to most severe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AlertLevel {
    Info,
    Warning,
    Critical,
    Emergency,
}

impl AlertLevel {
    /// All levels in ascending severity.
    pub const ALL: [AlertLevel; 4] = [
        AlertLevel::Info,
        AlertLevel::Warning,
        AlertLevel::Critical,
        AlertLevel::Emergency,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            AlertLevel::Info => "info",
            AlertLevel::Warning => "warning",
            AlertLevel::Critical => "critical",
            AlertLevel::Emergency => "emergency",
        }
    }

    /// Critical and emergency alerts page someone.
    pub fn is_page_worthy(&self) -> bool {
        matches!(self, AlertLevel::Critical | AlertLevel::Emergency)
    }
}

impl fmt::Display for AlertLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A triggered alert.
///
/// Created by the rule engine, then mutated only through
/// [`AlertStore::acknowledge`](crate::store::AlertStore::acknowledge) and
/// [`AlertStore::resolve`](crate::store::AlertStore::resolve).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Alert {
    pub id: String,
    pub level: AlertLevel,
    pub title: String,
    pub message: String,
    /// Name of the rule that produced this alert.
    pub component: String,
    pub timestamp: DateTime<Utc>,
    /// Metrics snapshot the rule was evaluated against.
    #[serde(default)]
    pub metadata: Metrics,
    #[serde(default)]
    pub resolved: bool,
    #[serde(default)]
    pub acknowledged: bool,
}

/// Build the human-readable alert title for a rule name.
///
/// `high_response_time` becomes `Alert: High Response Time`.
pub fn title_for_rule(rule_name: &str) -> String {
    let words: Vec<String> = rule_name
        .split('_')
        .filter(|w| !w.is_empty())
        .map(capitalize)
        .collect();
    format!("Alert: {}", words.join(" "))
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first
            .to_uppercase()
            .chain(chars.flat_map(char::to_lowercase))
            .collect(),
        None => String::new(),
    }
}
