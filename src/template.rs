//! Alert message rendering with minijinja.
//!
//! Rule messages are Jinja templates rendered against the metrics snapshot.
//! Every top-level check is available by name, plus:
//!
//! - `value`: the value the rule's condition compared
//! - `threshold`: the rule threshold, printed without a trailing `.0`
//! - `rule_name` and `level`
//!
//! The `fixed(n)` filter formats a number with `n` decimals
//! (`{{ value | fixed(1) }}`). A path into a check missing from the
//! snapshot renders empty, so `{{ system_resources.host | default('n/a') }}`
//! works whether or not `system_resources` was reported.
//!
//! # Example
//!
//! ```ignore
//! let renderer = MessageRenderer::new();
//! let message = renderer.render_with_fallback(&rule, &metrics);
//! ```

use crate::alert::Metrics;
use crate::config::AlertRule;
use crate::error::TemplateError;
use minijinja::{Environment, UndefinedBehavior};
use serde_json::Value;

/// Build the environment used for rendering and for config validation.
pub(crate) fn environment<'source>() -> Environment<'source> {
    let mut env = Environment::new();
    // Missing checks and fields, nested ones included, render as empty.
    env.set_undefined_behavior(UndefinedBehavior::Chainable);
    env.add_filter("fixed", fixed);
    env
}

fn fixed(value: minijinja::Value, precision: Option<usize>) -> String {
    match f64::try_from(value.clone()) {
        Ok(number) => format!("{:.*}", precision.unwrap_or(1), number),
        Err(_) => value.to_string(),
    }
}

/// Format a threshold the way an operator wrote it: `5000`, not `5000.0`.
pub fn format_threshold(threshold: f64) -> String {
    if threshold.fract() == 0.0 && threshold.abs() < 1e15 {
        format!("{}", threshold as i64)
    } else {
        threshold.to_string()
    }
}

/// Fallback message when a rule has no template or rendering fails.
pub fn fallback_message(rule_name: &str) -> String {
    format!("Alert condition met for {}", rule_name)
}

/// Renders rule messages. Build once and reuse.
pub struct MessageRenderer {
    env: Environment<'static>,
}

impl Default for MessageRenderer {
    fn default() -> Self {
        Self::new()
    }
}

impl MessageRenderer {
    pub fn new() -> Self {
        Self {
            env: environment(),
        }
    }

    /// Render a template against a context object.
    ///
    /// # Errors
    ///
    /// Returns [`TemplateError::RenderFailed`] on syntax or filter errors.
    pub fn render(&self, template: &str, context: &Value) -> Result<String, TemplateError> {
        self.env
            .render_str(template, context)
            .map_err(|e| TemplateError::RenderFailed {
                message: e.to_string(),
            })
    }

    /// Build the template context for a rule and snapshot.
    pub fn context(rule: &AlertRule, metrics: &Metrics) -> Value {
        let mut context = metrics.clone();
        context.insert("value".to_string(), rule.condition.observed_value(metrics));
        context.insert(
            "threshold".to_string(),
            Value::String(format_threshold(rule.threshold)),
        );
        context.insert("rule_name".to_string(), Value::String(rule.name.clone()));
        context.insert(
            "level".to_string(),
            Value::String(rule.level.as_str().to_string()),
        );
        Value::Object(context)
    }

    /// Render the rule message, falling back to a generic one on error.
    ///
    /// Never fails: an alert is always better than a dropped alert.
    pub fn render_with_fallback(&self, rule: &AlertRule, metrics: &Metrics) -> String {
        let Some(template) = rule.message.as_deref() else {
            return fallback_message(&rule.name);
        };

        match self.render(template, &Self::context(rule, metrics)) {
            Ok(message) if !message.trim().is_empty() => message,
            Ok(_) => {
                tracing::warn!(rule_name = %rule.name, "Message template rendered empty, using fallback");
                fallback_message(&rule.name)
            }
            Err(e) => {
                tracing::warn!(
                    rule_name = %rule.name,
                    error = %e,
                    "Message template render failed, using fallback"
                );
                fallback_message(&rule.name)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::alert::AlertLevel;
    use crate::condition::Condition;
    use crate::config::builtin_message;
    use serde_json::json;
    use std::time::Duration;

    fn rule(name: &str, condition: &str, threshold: f64, message: Option<&str>) -> AlertRule {
        AlertRule {
            name: name.to_string(),
            condition: Condition::from_legacy(condition),
            threshold,
            duration: Duration::ZERO,
            level: AlertLevel::Warning,
            channels: Vec::new(),
            cooldown: Duration::from_secs(300),
            enabled: true,
            message: message.map(str::to_string),
        }
    }

    fn metrics(value: Value) -> Metrics {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn format_threshold_drops_integral_fraction() {
        assert_eq!(format_threshold(5000.0), "5000");
        assert_eq!(format_threshold(85.5), "85.5");
        assert_eq!(format_threshold(0.0), "0");
    }

    #[test]
    fn builtin_response_time_message() {
        let r = rule(
            "high_response_time",
            "response_time_ms > threshold",
            5000.0,
            builtin_message("high_response_time"),
        );
        let m = metrics(json!({"discovery_server": {"response_time_ms": 6000}}));

        let renderer = MessageRenderer::new();
        assert_eq!(
            renderer.render_with_fallback(&r, &m),
            "API response time is 6000.0ms (threshold: 5000ms)"
        );
    }

    #[test]
    fn builtin_agent_down_message_uses_default_for_missing_metric() {
        let r = rule(
            "agent_down",
            "active_agents < threshold",
            3.0,
            builtin_message("agent_down"),
        );

        let renderer = MessageRenderer::new();
        assert_eq!(
            renderer.render_with_fallback(&r, &Metrics::new()),
            "Only 0 agents active (minimum: 3)"
        );
    }

    #[test]
    fn builtin_deprecated_services_message_lists_services() {
        let r = rule(
            "deprecated_service_running",
            "deprecated_services_detected > threshold",
            0.0,
            builtin_message("deprecated_service_running"),
        );
        let m = metrics(json!({
            "deprecated_services": {"running_deprecated_services": ["Port 7777", "Port 7778"]}
        }));

        let renderer = MessageRenderer::new();
        assert_eq!(
            renderer.render_with_fallback(&r, &m),
            "Deprecated services detected: Port 7777, Port 7778"
        );
    }

    #[test]
    fn missing_template_uses_fallback() {
        let r = rule("custom_rule", "cpu_percent > threshold", 1.0, None);
        let renderer = MessageRenderer::new();
        assert_eq!(
            renderer.render_with_fallback(&r, &Metrics::new()),
            "Alert condition met for custom_rule"
        );
    }

    #[test]
    fn broken_template_uses_fallback() {
        let r = rule(
            "custom_rule",
            "cpu_percent > threshold",
            1.0,
            Some("{{ value | no_such_filter }}"),
        );
        let renderer = MessageRenderer::new();
        assert_eq!(
            renderer.render_with_fallback(&r, &Metrics::new()),
            "Alert condition met for custom_rule"
        );
    }

    #[test]
    fn templates_can_reach_any_metric() {
        let r = rule(
            "custom_rule",
            "cpu_percent > threshold",
            90.0,
            Some("{{ rule_name }} [{{ level }}]: cpu {{ system_resources.cpu_percent }}, host {{ system_resources.host | default('n/a') }}"),
        );
        let m = metrics(json!({"system_resources": {"cpu_percent": 95}}));

        let renderer = MessageRenderer::new();
        assert_eq!(
            renderer.render_with_fallback(&r, &m),
            "custom_rule [warning]: cpu 95, host n/a"
        );
    }

    #[test]
    fn nested_path_into_missing_check_renders_empty() {
        let r = rule(
            "custom_rule",
            "cpu_percent > threshold",
            90.0,
            Some("CPU at {{ system_resources.cpu_percent }}% on {{ system_resources.host | default('n/a') }}"),
        );
        let m = metrics(json!({"discovery_server": {"status": "healthy"}}));

        let renderer = MessageRenderer::new();
        assert_eq!(renderer.render_with_fallback(&r, &m), "CPU at % on n/a");
    }
}
