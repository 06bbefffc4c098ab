//! Core configuration types and loading.

use super::channels::{
    ChannelConfig, ChannelKind, ChannelSettings, ChannelsConfig, ChatSettings, EmailSettings,
    PagerSettings, PubSubSettings, WebhookSettings,
};
use super::validation::{validate_jinja_template, validate_template_render};
use crate::alert::AlertLevel;
use crate::condition::Condition;
use crate::error::ConfigError;
use crate::health::DEFAULT_CRITICAL_CHECKS;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Default configuration file path.
pub const DEFAULT_CONFIG_PATH: &str = "/etc/healthwarden/config.json";

/// Default per-rule cooldown in seconds.
pub const DEFAULT_COOLDOWN_SECS: u64 = 300;

pub(crate) fn default_true() -> bool {
    true
}

fn default_cooldown() -> u64 {
    DEFAULT_COOLDOWN_SECS
}

/// Main configuration structure.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Alert rules, evaluated in declaration order.
    #[serde(default)]
    pub rules: Vec<RuleConfig>,
    /// Notification channels keyed by type.
    #[serde(default)]
    pub channels: ChannelsConfig,
    #[serde(default)]
    pub monitor: MonitorConfig,
    #[serde(default)]
    pub dispatch: DispatchConfig,
    #[serde(default)]
    pub metrics: MetricsConfig,
}

/// Alert rule configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RuleConfig {
    pub name: String,
    pub condition: Condition,
    pub threshold: f64,
    /// Seconds the condition should hold. Recorded but not enforced.
    #[serde(default)]
    pub duration: u64,
    pub level: AlertLevel,
    #[serde(default)]
    pub channels: Vec<ChannelKind>,
    /// Minimum seconds between two alerts of this rule.
    #[serde(default = "default_cooldown")]
    pub cooldown: u64,
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Message template; rules named like a built-in rule get its message.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

/// Periodic monitor settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonitorConfig {
    #[serde(default = "default_interval", with = "humantime_serde")]
    pub interval: Duration,
    #[serde(default = "default_collect_timeout", with = "humantime_serde")]
    pub collect_timeout: Duration,
    /// Checks weighted double by the health scorer.
    #[serde(default = "default_critical_checks")]
    pub critical_checks: Vec<String>,
    /// Where metrics snapshots come from.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<SourceConfig>,
}

fn default_interval() -> Duration {
    Duration::from_secs(30)
}

fn default_collect_timeout() -> Duration {
    Duration::from_secs(10)
}

fn default_critical_checks() -> Vec<String> {
    DEFAULT_CRITICAL_CHECKS.iter().map(|s| s.to_string()).collect()
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            interval: default_interval(),
            collect_timeout: default_collect_timeout(),
            critical_checks: default_critical_checks(),
            source: None,
        }
    }
}

/// Metrics snapshot source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum SourceConfig {
    /// GET a JSON object from a health endpoint.
    Http { url: String },
    /// Read a JSON object from a file on every tick.
    File { path: PathBuf },
}

/// Notification dispatch settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DispatchConfig {
    /// Upper bound for one delivery to one channel.
    #[serde(default = "default_dispatch_timeout", with = "humantime_serde")]
    pub timeout: Duration,
}

fn default_dispatch_timeout() -> Duration {
    Duration::from_secs(10)
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            timeout: default_dispatch_timeout(),
        }
    }
}

/// Metrics exposition configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricsConfig {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default = "default_metrics_port")]
    pub port: u16,
}

fn default_metrics_port() -> u16 {
    9090
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            port: default_metrics_port(),
        }
    }
}

fn is_yaml(path: &Path) -> bool {
    matches!(
        path.extension().and_then(|e| e.to_str()),
        Some("yaml") | Some("yml")
    )
}

impl Config {
    /// Load configuration from a JSON file, or YAML for `.yaml`/`.yml`.
    ///
    /// # Errors
    /// Returns [`ConfigError::LoadError`] if the file cannot be read.
    /// Returns [`ConfigError::ValidationError`] if the content cannot be parsed.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::LoadError(format!("{}: {}", path.display(), e)))?;

        if is_yaml(path) {
            serde_yaml::from_str(&content).map_err(|e| ConfigError::ValidationError(e.to_string()))
        } else {
            serde_json::from_str(&content).map_err(|e| ConfigError::ValidationError(e.to_string()))
        }
    }

    /// Load configuration, falling back to the built-in defaults on any
    /// load or parse error.
    pub fn load_or_default(path: &Path) -> Self {
        match Self::load(path) {
            Ok(config) => {
                tracing::info!(
                    path = %path.display(),
                    rules = config.rules.len(),
                    channels = config.channels.len(),
                    "Loaded configuration"
                );
                config
            }
            Err(e) => {
                tracing::warn!(
                    path = %path.display(),
                    error = %e,
                    "Failed to load configuration, using built-in defaults"
                );
                Self::builtin()
            }
        }
    }

    /// Write the configuration as pretty-printed JSON.
    ///
    /// # Errors
    /// Returns [`ConfigError::SaveError`] if serialization or the write fails.
    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        let content = serde_json::to_string_pretty(self)
            .map_err(|e| ConfigError::SaveError(e.to_string()))?;
        std::fs::write(path, content)
            .map_err(|e| ConfigError::SaveError(format!("{}: {}", path.display(), e)))?;
        tracing::info!(path = %path.display(), "Saved configuration");
        Ok(())
    }

    /// Validate all rules (even disabled ones) and enabled channels.
    ///
    /// # Errors
    /// Returns a `Vec<ConfigError>` containing all validation errors found.
    pub fn validate(&self) -> Result<(), Vec<ConfigError>> {
        let mut errors = Vec::new();
        let mut seen = HashSet::new();

        for rule in &self.rules {
            if rule.name.trim().is_empty() {
                errors.push(ConfigError::ValidationError(
                    "rule name cannot be empty".to_string(),
                ));
            } else if !seen.insert(rule.name.as_str()) {
                errors.push(ConfigError::ValidationError(format!(
                    "duplicate rule name '{}'",
                    rule.name
                )));
            }

            if let Condition::Unsupported(raw) = &rule.condition {
                errors.push(ConfigError::ValidationError(format!(
                    "rule '{}': unsupported condition '{}'",
                    rule.name, raw
                )));
            }

            if !rule.threshold.is_finite() {
                errors.push(ConfigError::ValidationError(format!(
                    "rule '{}': threshold must be a finite number",
                    rule.name
                )));
            }

            if let Some(ref message) = rule.message {
                if let Err(e) = validate_jinja_template(message) {
                    errors.push(ConfigError::InvalidTemplate {
                        rule: rule.name.clone(),
                        message: format!("message: {}", e),
                    });
                } else if let Err(e) = validate_template_render(message) {
                    errors.push(ConfigError::InvalidTemplate {
                        rule: rule.name.clone(),
                        message: format!("message render: {}", e),
                    });
                }
            }
        }

        for (kind, channel) in &self.channels {
            if channel.enabled
                && let Err(e) = check_channel(*kind, channel)
            {
                errors.push(e);
            }
        }

        if self.monitor.interval.is_zero() {
            errors.push(ConfigError::ValidationError(
                "monitor.interval must be greater than zero".to_string(),
            ));
        }

        if self.dispatch.timeout.is_zero() {
            errors.push(ConfigError::ValidationError(
                "dispatch.timeout must be greater than zero".to_string(),
            ));
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

/// Parse a channel's settings to surface type and `${VAR}` errors early.
fn check_channel(kind: ChannelKind, channel: &ChannelConfig) -> Result<(), ConfigError> {
    fn parse<T: ChannelSettings>(kind: ChannelKind, channel: &ChannelConfig) -> Result<(), ConfigError> {
        channel.settings::<T>(kind).map(|_| ())
    }

    match kind {
        ChannelKind::Email => parse::<EmailSettings>(kind, channel),
        ChannelKind::Chat => parse::<ChatSettings>(kind, channel),
        ChannelKind::PubSub => parse::<PubSubSettings>(kind, channel),
        ChannelKind::Webhook => parse::<WebhookSettings>(kind, channel),
        ChannelKind::Pager => parse::<PagerSettings>(kind, channel),
    }
}
