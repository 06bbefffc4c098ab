//! Rule engine: turns a metrics snapshot into newly triggered alerts.
//!
//! Each enabled rule is evaluated in declaration order. A rule that fails
//! to evaluate is logged and skipped; the remaining rules still run.
//!
//! ```text
//! metrics --> RuleEngine.evaluate --> condition holds?
//!                                        |
//!                                        v
//!                                  CooldownTracker --suppressed--> (nothing)
//!                                        |
//!                                        v pass
//!                              render message, build Alert
//!                                        |
//!                                        v
//!                          AlertStore.record + mark_sent
//! ```

use chrono::{DateTime, Utc};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::alert::{Alert, Metrics, title_for_rule};
use crate::config::AlertRule;
use crate::cooldown::{CooldownResult, CooldownTracker};
use crate::store::AlertStore;
use crate::template::MessageRenderer;

/// Evaluates alert rules against metrics snapshots.
///
/// Owns the per-rule cooldown state; constructed once at startup.
pub struct RuleEngine {
    rules: Vec<AlertRule>,
    cooldowns: CooldownTracker,
    renderer: MessageRenderer,
}

impl RuleEngine {
    pub fn new(rules: Vec<AlertRule>) -> Self {
        Self {
            rules,
            cooldowns: CooldownTracker::new(),
            renderer: MessageRenderer::new(),
        }
    }

    pub fn rules(&self) -> &[AlertRule] {
        &self.rules
    }

    pub fn rule(&self, name: &str) -> Option<&AlertRule> {
        self.rules.iter().find(|r| r.name == name)
    }

    /// Enable or disable a rule by name. Returns `false` if no such rule.
    pub fn set_enabled(&mut self, name: &str, enabled: bool) -> bool {
        match self.rules.iter_mut().find(|r| r.name == name) {
            Some(rule) => {
                rule.enabled = enabled;
                info!(rule_name = %name, enabled, "Rule toggled");
                true
            }
            None => false,
        }
    }

    pub fn cooldowns(&self) -> &CooldownTracker {
        &self.cooldowns
    }

    /// Forget every cooldown, so the next matching snapshot notifies again.
    pub fn reset_cooldowns(&mut self) {
        self.cooldowns.reset();
    }

    /// Evaluate all enabled rules at the current time.
    pub fn evaluate(&mut self, metrics: &Metrics, store: &mut AlertStore) -> Vec<Alert> {
        self.evaluate_at(metrics, store, Utc::now())
    }

    /// Evaluate all enabled rules using a caller-supplied clock.
    ///
    /// Returned alerts have already been recorded in `store` and their
    /// rules marked in the cooldown tracker.
    pub fn evaluate_at(
        &mut self,
        metrics: &Metrics,
        store: &mut AlertStore,
        now: DateTime<Utc>,
    ) -> Vec<Alert> {
        let mut triggered = Vec::new();

        for rule in self.rules.iter().filter(|r| r.enabled) {
            let holds = match rule.condition.evaluate(metrics, rule.threshold) {
                Ok(holds) => holds,
                Err(e) => {
                    warn!(rule_name = %rule.name, error = %e, "Rule evaluation failed, skipping");
                    metrics::counter!(
                        "healthwarden_rule_errors_total",
                        "rule_name" => rule.name.clone()
                    )
                    .increment(1);
                    continue;
                }
            };

            if !holds {
                continue;
            }

            if self.cooldowns.check(&rule.name, rule.cooldown, now) == CooldownResult::Suppressed {
                debug!(rule_name = %rule.name, "Alert suppressed by cooldown");
                metrics::counter!(
                    "healthwarden_alerts_suppressed_total",
                    "rule_name" => rule.name.clone()
                )
                .increment(1);
                continue;
            }

            let alert = Alert {
                id: format!("{}_{}", rule.name, Uuid::new_v4().simple()),
                level: rule.level,
                title: title_for_rule(&rule.name),
                message: self.renderer.render_with_fallback(rule, metrics),
                component: rule.name.clone(),
                timestamp: now,
                metadata: metrics.clone(),
                resolved: false,
                acknowledged: false,
            };

            info!(
                rule_name = %rule.name,
                alert_id = %alert.id,
                level = %alert.level,
                "Alert triggered"
            );
            metrics::counter!(
                "healthwarden_alerts_triggered_total",
                "rule_name" => rule.name.clone()
            )
            .increment(1);

            store.record(alert.clone());
            self.cooldowns.mark_sent(&rule.name, now);
            triggered.push(alert);
        }

        triggered
    }
}
