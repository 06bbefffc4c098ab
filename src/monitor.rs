//! Periodic monitor loop: collect, score, evaluate, dispatch.
//!
//! ```text
//! tick --> collector (timeout) --> HealthScorer --> overall_health added
//!                                                        |
//!                                                        v
//!                                              AlertManager.process
//! ```
//!
//! A failed collection skips the tick. Cancellation is checked between
//! ticks; a tick in progress always completes.

use std::sync::Arc;
use std::time::Duration;

use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::alert::Metrics;
use crate::collect::{MetricsCollector, collect_with_timeout};
use crate::error::CollectError;
use crate::health::{HealthScore, HealthScorer};
use crate::manager::{AlertManager, ProcessReport};

/// Result of one monitor tick.
#[derive(Debug)]
pub struct TickReport {
    pub health: HealthScore,
    pub process: ProcessReport,
}

pub struct MonitorLoop {
    collector: Box<dyn MetricsCollector>,
    scorer: HealthScorer,
    manager: Arc<AlertManager>,
    interval: Duration,
    collect_timeout: Duration,
}

impl MonitorLoop {
    pub fn new(
        collector: Box<dyn MetricsCollector>,
        scorer: HealthScorer,
        manager: Arc<AlertManager>,
        interval: Duration,
        collect_timeout: Duration,
    ) -> Self {
        Self {
            collector,
            scorer,
            manager,
            interval,
            collect_timeout,
        }
    }

    pub fn manager(&self) -> &Arc<AlertManager> {
        &self.manager
    }

    /// Collect one snapshot and process it.
    ///
    /// # Errors
    ///
    /// Returns the collector error; nothing is evaluated in that case.
    pub async fn run_tick(&self) -> Result<TickReport, CollectError> {
        let metrics = collect_with_timeout(self.collector.as_ref(), self.collect_timeout).await?;
        Ok(evaluate_snapshot(&self.scorer, &self.manager, metrics).await)
    }

    /// Run ticks every `interval` until `cancel` fires.
    pub async fn run(&self, cancel: CancellationToken) {
        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        info!(
            interval_secs = self.interval.as_secs(),
            collector = self.collector.name(),
            "Monitor loop started"
        );

        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    info!("Monitor loop stopping");
                    break;
                }
                _ = ticker.tick() => {
                    match self.run_tick().await {
                        Ok(report) => debug!(
                            health_score = report.health.score,
                            new_alerts = report.process.alerts.len(),
                            "Tick complete"
                        ),
                        Err(e) => {
                            warn!(collector = self.collector.name(), error = %e, "Metrics collection failed, skipping tick");
                            metrics::counter!("healthwarden_collect_errors_total").increment(1);
                        }
                    }
                }
            }
        }
    }
}

/// Score `metrics`, add `overall_health` and run it through the manager.
pub async fn evaluate_snapshot(
    scorer: &HealthScorer,
    manager: &AlertManager,
    mut metrics: Metrics,
) -> TickReport {
    let health = scorer.score(&HealthScorer::checks_from_metrics(&metrics));
    health.augment(&mut metrics);
    metrics::gauge!("healthwarden_health_score").set(health.score);
    debug!(score = health.score, status = health.status.as_str(), "Health scored");

    let process = manager.process(&metrics).await;
    TickReport { health, process }
}
