//! Fan-out of one alert to its rule's channels.

use std::time::Duration;

use futures_util::future::join_all;
use tracing::{Instrument, debug, error, info, warn};

use super::registry::{ChannelRegistry, ChannelSlot};
use crate::alert::Alert;
use crate::config::ChannelKind;
use crate::error::DeliveryError;

/// Default per-channel delivery timeout.
pub const DEFAULT_DELIVERY_TIMEOUT: Duration = Duration::from_secs(10);

/// Why a channel was not attempted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    /// Not present in the channel config.
    NotConfigured,
    Disabled,
    NotActionable(String),
}

/// Result of delivering an alert to one channel.
#[derive(Debug)]
pub enum DeliveryOutcome {
    Delivered,
    Skipped(SkipReason),
    Failed(DeliveryError),
}

/// Per-channel outcomes for one alert, in the order the rule lists them.
#[derive(Debug)]
pub struct DispatchReport {
    pub alert_id: String,
    pub outcomes: Vec<(ChannelKind, DeliveryOutcome)>,
}

impl DispatchReport {
    pub fn outcome(&self, kind: ChannelKind) -> Option<&DeliveryOutcome> {
        self.outcomes
            .iter()
            .find(|(k, _)| *k == kind)
            .map(|(_, outcome)| outcome)
    }

    pub fn delivered(&self) -> usize {
        self.count(|o| matches!(o, DeliveryOutcome::Delivered))
    }

    pub fn failed(&self) -> usize {
        self.count(|o| matches!(o, DeliveryOutcome::Failed(_)))
    }

    pub fn skipped(&self) -> usize {
        self.count(|o| matches!(o, DeliveryOutcome::Skipped(_)))
    }

    /// Channels a delivery was actually attempted on.
    pub fn attempted(&self) -> usize {
        self.delivered() + self.failed()
    }

    fn count(&self, predicate: impl Fn(&DeliveryOutcome) -> bool) -> usize {
        self.outcomes.iter().filter(|(_, o)| predicate(o)).count()
    }
}

/// Delivers alerts through the channel registry.
#[derive(Debug)]
pub struct Dispatcher {
    registry: ChannelRegistry,
    timeout: Duration,
}

impl Dispatcher {
    pub fn new(registry: ChannelRegistry, timeout: Duration) -> Self {
        Self { registry, timeout }
    }

    pub fn registry(&self) -> &ChannelRegistry {
        &self.registry
    }

    /// Send `alert` to each of `channels`.
    ///
    /// Unconfigured and disabled channels are skipped silently and
    /// not-actionable ones with a warning. The remaining deliveries run
    /// concurrently, each bounded by the dispatcher timeout. A failure on
    /// one channel never affects the others.
    pub async fn send(&self, alert: &Alert, channels: &[ChannelKind]) -> DispatchReport {
        let mut unique: Vec<ChannelKind> = Vec::with_capacity(channels.len());
        for kind in channels {
            if !unique.contains(kind) {
                unique.push(*kind);
            }
        }

        let mut outcomes = Vec::with_capacity(unique.len());
        let mut deliveries = Vec::new();

        for &kind in &unique {
            match self.registry.get(kind) {
                None => {
                    debug!(channel = %kind, "Channel not configured, skipping");
                    outcomes.push((kind, DeliveryOutcome::Skipped(SkipReason::NotConfigured)));
                }
                Some(ChannelSlot::Disabled) => {
                    debug!(channel = %kind, "Channel disabled, skipping");
                    outcomes.push((kind, DeliveryOutcome::Skipped(SkipReason::Disabled)));
                }
                Some(ChannelSlot::NotActionable { reason }) => {
                    warn!(channel = %kind, reason = %reason, alert_id = %alert.id, "Channel not properly configured, skipping");
                    outcomes.push((
                        kind,
                        DeliveryOutcome::Skipped(SkipReason::NotActionable(reason.clone())),
                    ));
                }
                Some(ChannelSlot::Ready(notifier)) => {
                    let span = tracing::info_span!(
                        "deliver",
                        channel = %kind,
                        alert_id = %alert.id,
                        rule_name = %alert.component
                    );
                    let timeout = self.timeout;
                    deliveries.push(
                        async move {
                            let result =
                                match tokio::time::timeout(timeout, notifier.deliver(alert)).await {
                                    Ok(result) => result,
                                    Err(_) => Err(DeliveryError::Timeout(timeout)),
                                };
                            (kind, record(kind, alert, result))
                        }
                        .instrument(span),
                    );
                }
            }
        }

        outcomes.extend(join_all(deliveries).await);
        outcomes.sort_by_key(|(kind, _)| unique.iter().position(|k| k == kind));

        DispatchReport {
            alert_id: alert.id.clone(),
            outcomes,
        }
    }
}

fn record(kind: ChannelKind, alert: &Alert, result: Result<(), DeliveryError>) -> DeliveryOutcome {
    match result {
        Ok(()) => {
            info!(title = %alert.title, "Alert sent via {}", kind);
            metrics::counter!(
                "healthwarden_notifications_sent_total",
                "channel" => kind.as_str(),
                "rule_name" => alert.component.clone()
            )
            .increment(1);
            DeliveryOutcome::Delivered
        }
        Err(e) => {
            error!(error = %e, "Failed to send alert via {}", kind);
            metrics::counter!(
                "healthwarden_notify_errors_total",
                "channel" => kind.as_str(),
                "rule_name" => alert.component.clone()
            )
            .increment(1);
            DeliveryOutcome::Failed(e)
        }
    }
}
