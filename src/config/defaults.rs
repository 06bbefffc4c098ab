//! Built-in rules and channels, used when no usable config file exists.

use super::channels::{ChannelConfig, ChannelKind, ChannelsConfig, DEFAULT_PAGER_URL};
use super::types::{
    Config, DEFAULT_COOLDOWN_SECS, DispatchConfig, MetricsConfig, MonitorConfig, RuleConfig,
};
use crate::alert::AlertLevel;
use crate::condition::Condition;
use serde_json::json;

/// Messages for the built-in rule names.
const BUILTIN_MESSAGES: [(&str, &str); 6] = [
    (
        "high_response_time",
        "API response time is {{ value | fixed(1) }}ms (threshold: {{ threshold }}ms)",
    ),
    (
        "agent_down",
        "Only {{ value }} agents active (minimum: {{ threshold }})",
    ),
    (
        "high_cpu",
        "CPU usage is {{ value | fixed(1) }}% (threshold: {{ threshold }}%)",
    ),
    (
        "high_memory",
        "Memory usage is {{ value | fixed(1) }}% (threshold: {{ threshold }}%)",
    ),
    (
        "system_critical",
        "System health is critical - immediate attention required",
    ),
    (
        "deprecated_service_running",
        "Deprecated services detected: {{ value | join(', ') }}",
    ),
];

/// Message template for a built-in rule name, if any.
pub fn builtin_message(rule_name: &str) -> Option<&'static str> {
    BUILTIN_MESSAGES
        .iter()
        .find(|(name, _)| *name == rule_name)
        .map(|(_, message)| *message)
}

fn rule(
    name: &str,
    condition: &str,
    threshold: f64,
    duration: u64,
    level: AlertLevel,
    channels: &[ChannelKind],
) -> RuleConfig {
    RuleConfig {
        name: name.to_string(),
        condition: Condition::from_legacy(condition),
        threshold,
        duration,
        level,
        channels: channels.to_vec(),
        cooldown: DEFAULT_COOLDOWN_SECS,
        enabled: true,
        message: None,
    }
}

/// The six built-in rules.
pub fn default_rules() -> Vec<RuleConfig> {
    use ChannelKind::*;

    vec![
        rule(
            "high_response_time",
            "response_time_ms > threshold",
            5000.0,
            60,
            AlertLevel::Warning,
            &[Email, Chat],
        ),
        rule(
            "agent_down",
            "active_agents < threshold",
            3.0,
            30,
            AlertLevel::Critical,
            &[Email, Chat, PubSub],
        ),
        rule(
            "high_cpu",
            "cpu_percent > threshold",
            80.0,
            300,
            AlertLevel::Warning,
            &[Email],
        ),
        rule(
            "high_memory",
            "memory_percent > threshold",
            85.0,
            300,
            AlertLevel::Warning,
            &[Email],
        ),
        rule(
            "system_critical",
            "overall_health == 'critical'",
            1.0,
            0,
            AlertLevel::Emergency,
            &[Email, Chat, PubSub, Pager],
        ),
        rule(
            "deprecated_service_running",
            "deprecated_services_detected > threshold",
            0.0,
            0,
            AlertLevel::Warning,
            &[Email],
        ),
    ]
}

/// All five channel types, disabled until configured.
pub fn default_channels() -> ChannelsConfig {
    let disabled = |config| ChannelConfig::new(config, false);

    ChannelsConfig::from([
        (
            ChannelKind::Email,
            disabled(json!({
                "smtp_server": "smtp.gmail.com",
                "smtp_port": 587,
                "username": "",
                "password": "",
                "from_email": "",
                "to_emails": []
            })),
        ),
        (
            ChannelKind::Chat,
            disabled(json!({
                "webhook_url": "",
                "channel": "#alerts",
                "username": "Agent Monitor"
            })),
        ),
        (
            ChannelKind::PubSub,
            disabled(json!({
                "topic_arn": "",
                "region": "us-east-1"
            })),
        ),
        (
            ChannelKind::Webhook,
            disabled(json!({
                "url": "",
                "method": "POST",
                "headers": {"Content-Type": "application/json"}
            })),
        ),
        (
            ChannelKind::Pager,
            disabled(json!({
                "integration_key": "",
                "service_url": DEFAULT_PAGER_URL
            })),
        ),
    ])
}

impl Config {
    /// Built-in rules and disabled channels with default runtime settings.
    pub fn builtin() -> Self {
        Self {
            rules: default_rules(),
            channels: default_channels(),
            monitor: MonitorConfig::default(),
            dispatch: DispatchConfig::default(),
            metrics: MetricsConfig::default(),
        }
    }
}
