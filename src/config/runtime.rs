//! Runtime configuration with resolved rule messages and durations.

use super::channels::{ChannelKind, ChannelsConfig};
use super::defaults::builtin_message;
use super::types::{Config, DispatchConfig, MetricsConfig, MonitorConfig};
use crate::alert::AlertLevel;
use crate::condition::Condition;
use std::time::Duration;

/// Runtime configuration.
#[derive(Debug, Clone)]
pub struct RuntimeConfig {
    pub rules: Vec<AlertRule>,
    pub channels: ChannelsConfig,
    pub monitor: MonitorConfig,
    pub dispatch: DispatchConfig,
    pub metrics: MetricsConfig,
}

/// Alert rule ready for evaluation.
#[derive(Debug, Clone, PartialEq)]
pub struct AlertRule {
    pub name: String,
    pub condition: Condition,
    pub threshold: f64,
    /// Informational only; alerts fire on the first matching snapshot.
    pub duration: Duration,
    pub level: AlertLevel,
    pub channels: Vec<ChannelKind>,
    pub cooldown: Duration,
    pub enabled: bool,
    /// Message template; `None` renders the generic fallback.
    pub message: Option<String>,
}

impl RuntimeConfig {
    pub fn rule_names(&self) -> Vec<&str> {
        self.rules.iter().map(|r| r.name.as_str()).collect()
    }
}

impl Config {
    /// Compile configuration into runtime-ready format.
    pub fn compile(self) -> RuntimeConfig {
        let rules = self
            .rules
            .into_iter()
            .map(|rule| {
                let message = rule
                    .message
                    .or_else(|| builtin_message(&rule.name).map(str::to_string));

                AlertRule {
                    name: rule.name,
                    condition: rule.condition,
                    threshold: rule.threshold,
                    duration: Duration::from_secs(rule.duration),
                    level: rule.level,
                    channels: rule.channels,
                    cooldown: Duration::from_secs(rule.cooldown),
                    enabled: rule.enabled,
                    message,
                }
            })
            .collect();

        RuntimeConfig {
            rules,
            channels: self.channels,
            monitor: self.monitor,
            dispatch: self.dispatch,
            metrics: self.metrics,
        }
    }
}
