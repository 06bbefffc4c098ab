//! Alert manager: evaluate, record and dispatch under one tick lock.
//!
//! Owns the rule engine, the alert store and the dispatcher. Ticks are
//! serialised; acknowledge/resolve and summaries only take the state lock,
//! so they can run while a tick is dispatching.

use tokio::sync::Mutex;
use tracing::{debug, info};

use crate::alert::{Alert, Metrics};
use crate::config::AlertRule;
use crate::engine::RuleEngine;
use crate::notify::{DispatchReport, Dispatcher};
use crate::store::{AlertStore, AlertSummary};

struct State {
    engine: RuleEngine,
    store: AlertStore,
}

/// Outcome of one `process` call.
#[derive(Debug)]
pub struct ProcessReport {
    pub alerts: Vec<Alert>,
    pub dispatches: Vec<DispatchReport>,
}

pub struct AlertManager {
    /// Held for a whole `process` call.
    tick_lock: Mutex<()>,
    state: Mutex<State>,
    dispatcher: Dispatcher,
}

impl AlertManager {
    pub fn new(rules: Vec<AlertRule>, dispatcher: Dispatcher) -> Self {
        Self::with_store(rules, AlertStore::new(), dispatcher)
    }

    pub fn with_store(rules: Vec<AlertRule>, store: AlertStore, dispatcher: Dispatcher) -> Self {
        Self {
            tick_lock: Mutex::new(()),
            state: Mutex::new(State {
                engine: RuleEngine::new(rules),
                store,
            }),
            dispatcher,
        }
    }

    /// Evaluate rules against `metrics`, record new alerts and send each
    /// to its rule's channels.
    pub async fn process(&self, metrics: &Metrics) -> ProcessReport {
        let _tick = self.tick_lock.lock().await;

        let (alerts, routes) = {
            let mut state = self.state.lock().await;
            let State { engine, store } = &mut *state;
            let alerts = engine.evaluate(metrics, store);
            let routes: Vec<_> = alerts
                .iter()
                .map(|alert| {
                    engine
                        .rule(&alert.component)
                        .map(|rule| rule.channels.clone())
                        .unwrap_or_default()
                })
                .collect();
            (alerts, routes)
        };

        if alerts.is_empty() {
            debug!("No new alerts");
        } else {
            info!(count = alerts.len(), "New alerts triggered");
        }

        let mut dispatches = Vec::with_capacity(alerts.len());
        for (alert, channels) in alerts.iter().zip(&routes) {
            dispatches.push(self.dispatcher.send(alert, channels).await);
        }

        ProcessReport { alerts, dispatches }
    }

    /// Acknowledge an active alert. Returns `false` for unknown ids.
    pub async fn acknowledge(&self, id: &str, actor: &str) -> bool {
        self.state.lock().await.store.acknowledge(id, actor)
    }

    /// Resolve an active alert. Returns `false` for unknown ids.
    pub async fn resolve(&self, id: &str, actor: &str) -> bool {
        self.state.lock().await.store.resolve(id, actor)
    }

    pub async fn summary(&self) -> AlertSummary {
        self.state.lock().await.store.summary()
    }

    pub async fn active_alerts(&self) -> Vec<Alert> {
        self.state.lock().await.store.active_alerts()
    }

    pub async fn history(&self) -> Vec<Alert> {
        self.state.lock().await.store.history().cloned().collect()
    }

    /// Enable or disable a rule at runtime. Returns `false` if unknown.
    pub async fn set_rule_enabled(&self, name: &str, enabled: bool) -> bool {
        self.state.lock().await.engine.set_enabled(name, enabled)
    }

    pub fn dispatcher(&self) -> &Dispatcher {
        &self.dispatcher
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{ChannelKind, Config};
    use crate::error::DeliveryError;
    use crate::notify::{ChannelRegistry, ChannelSlot, Notifier};
    use async_trait::async_trait;
    use serde_json::json;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::time::Duration;

    struct CountingNotifier {
        kind: ChannelKind,
        calls: AtomicU32,
    }

    #[async_trait]
    impl Notifier for CountingNotifier {
        fn kind(&self) -> ChannelKind {
            self.kind
        }

        async fn deliver(&self, _alert: &Alert) -> Result<(), DeliveryError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    fn manager_with(notifier: Arc<CountingNotifier>) -> AlertManager {
        let mut registry = ChannelRegistry::new();
        registry.insert(notifier);
        AlertManager::new(
            Config::builtin().compile().rules,
            Dispatcher::new(registry, Duration::from_secs(5)),
        )
    }

    fn snapshot(value: serde_json::Value) -> Metrics {
        value.as_object().cloned().unwrap()
    }

    #[tokio::test]
    async fn process_dispatches_to_rule_channels() {
        let chat = Arc::new(CountingNotifier {
            kind: ChannelKind::Chat,
            calls: AtomicU32::new(0),
        });
        let manager = manager_with(chat.clone());
        let metrics = snapshot(json!({
            "discovery_server": {"response_time_ms": 6000},
            "daemon_agents": {"active_daemon_agents": 5},
            "system_resources": {"cpu_percent": 95.0}
        }));

        let report = manager.process(&metrics).await;

        // high_response_time -> email + slack, high_cpu -> email only.
        assert_eq!(report.alerts.len(), 2);
        assert_eq!(chat.calls.load(Ordering::SeqCst), 1);
        assert_eq!(report.dispatches[0].delivered(), 1);
        assert_eq!(report.dispatches[1].delivered(), 0);
        assert_eq!(manager.summary().await.active_alerts_count, 2);
    }

    #[tokio::test]
    async fn second_tick_within_cooldown_sends_nothing() {
        let chat = Arc::new(CountingNotifier {
            kind: ChannelKind::Chat,
            calls: AtomicU32::new(0),
        });
        let manager = manager_with(chat.clone());
        let metrics = snapshot(json!({"discovery_server": {"response_time_ms": 6000}, "daemon_agents": {"active_daemon_agents": 5}}));

        assert_eq!(manager.process(&metrics).await.alerts.len(), 1);
        assert!(manager.process(&metrics).await.alerts.is_empty());
        assert_eq!(chat.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn acknowledge_and_resolve_through_manager() {
        let mut registry = ChannelRegistry::new();
        registry.insert_slot(ChannelKind::Email, ChannelSlot::Disabled);
        let manager = AlertManager::new(
            Config::builtin().compile().rules,
            Dispatcher::new(registry, Duration::from_secs(5)),
        );

        let report = manager.process(&Metrics::new()).await;
        let id = report.alerts[0].id.clone();

        assert!(manager.acknowledge(&id, "ops").await);
        assert!(manager.active_alerts().await[0].acknowledged);
        assert!(manager.resolve(&id, "ops").await);
        assert!(!manager.resolve(&id, "ops").await);
        assert!(manager.active_alerts().await.is_empty());

        let history = manager.history().await;
        assert_eq!(history.len(), 1);
        assert!(history[0].resolved);
    }

    #[tokio::test]
    async fn disabled_rule_stops_alerting() {
        let manager = AlertManager::new(
            Config::builtin().compile().rules,
            Dispatcher::new(ChannelRegistry::new(), Duration::from_secs(5)),
        );
        assert!(manager.set_rule_enabled("agent_down", false).await);

        assert!(manager.process(&Metrics::new()).await.alerts.is_empty());
    }
}
