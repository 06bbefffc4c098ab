//! Prometheus metrics exposition server.
//!
//! Exposes healthwarden counters and gauges on `/metrics` when enabled in
//! the `metrics` config section.

use anyhow::Result;
use metrics_exporter_prometheus::PrometheusBuilder;
use std::net::SocketAddr;
use std::sync::OnceLock;
use tokio_util::sync::CancellationToken;
use tracing::info;

/// Set once the recorder is installed.
static RECORDER_INSTALLED: OnceLock<()> = OnceLock::new();

/// Register HELP text for every metric.
pub fn register_metric_descriptions() {
    use metrics::{describe_counter, describe_gauge};

    describe_counter!(
        "healthwarden_alerts_triggered_total",
        "Total number of alerts created by rules"
    );
    describe_counter!(
        "healthwarden_alerts_suppressed_total",
        "Total number of matching evaluations suppressed by the rule cooldown"
    );
    describe_counter!(
        "healthwarden_notifications_sent_total",
        "Total number of alerts delivered to a channel"
    );
    describe_counter!(
        "healthwarden_notify_errors_total",
        "Total number of failed channel deliveries (no retry)"
    );
    describe_counter!(
        "healthwarden_rule_errors_total",
        "Total number of rule evaluations skipped because of a metric type error"
    );
    describe_counter!(
        "healthwarden_collect_errors_total",
        "Total number of monitor ticks skipped because collection failed"
    );

    describe_gauge!(
        "healthwarden_health_score",
        "Weighted health score of the last collected snapshot (0-100)"
    );
    describe_gauge!(
        "healthwarden_build_info",
        "Build information with version label (always 1)"
    );
}

/// Metrics server for Prometheus exposition.
pub struct MetricsServer {
    port: u16,
    /// Signalled once the recorder is installed, so callers can wait
    /// before emitting metrics.
    ready_tx: Option<tokio::sync::oneshot::Sender<()>>,
}

impl MetricsServer {
    /// Use port 0 to let the OS pick one.
    pub fn new(port: u16) -> Self {
        Self {
            port,
            ready_tx: None,
        }
    }

    pub fn with_ready_signal(port: u16, ready_tx: tokio::sync::oneshot::Sender<()>) -> Self {
        Self {
            port,
            ready_tx: Some(ready_tx),
        }
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    /// Install the global recorder and serve until cancelled.
    ///
    /// # Errors
    ///
    /// Returns an error if the exporter cannot be installed (port in use,
    /// or a recorder already installed in this process).
    pub async fn run(self, cancel: CancellationToken) -> Result<()> {
        let addr: SocketAddr = ([0, 0, 0, 0], self.port).into();

        PrometheusBuilder::new()
            .with_http_listener(addr)
            .install()
            .map_err(|e| anyhow::anyhow!("Failed to install Prometheus exporter: {}", e))?;

        let _ = RECORDER_INSTALLED.set(());
        register_metric_descriptions();

        if let Some(tx) = self.ready_tx {
            let _ = tx.send(());
        }

        info!(port = self.port, "Metrics server started on /metrics");

        cancel.cancelled().await;

        info!("Metrics server shutting down");
        Ok(())
    }
}

pub fn is_recorder_installed() -> bool {
    RECORDER_INSTALLED.get().is_some()
}

/// Initialize known series to zero so they show up before any event.
pub fn initialize_metrics(rule_names: &[&str], channel_names: &[&str]) {
    use metrics::{counter, gauge};

    gauge!("healthwarden_build_info", "version" => env!("CARGO_PKG_VERSION")).set(1.0);
    counter!("healthwarden_collect_errors_total").absolute(0);

    for rule_name in rule_names {
        counter!("healthwarden_alerts_triggered_total", "rule_name" => rule_name.to_string())
            .absolute(0);
        counter!("healthwarden_alerts_suppressed_total", "rule_name" => rule_name.to_string())
            .absolute(0);
        counter!("healthwarden_rule_errors_total", "rule_name" => rule_name.to_string())
            .absolute(0);
    }

    for channel in channel_names {
        counter!("healthwarden_notifications_sent_total", "channel" => channel.to_string())
            .absolute(0);
        counter!("healthwarden_notify_errors_total", "channel" => channel.to_string()).absolute(0);
    }

    tracing::info!(
        rule_count = rule_names.len(),
        channel_count = channel_names.len(),
        "Metrics initialized to zero"
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    static TEST_PORT: OnceLock<u16> = OnceLock::new();

    fn get_test_port() -> u16 {
        *TEST_PORT.get_or_init(|| {
            let port = portpicker::pick_unused_port().expect("No free port");
            let server = MetricsServer::new(port);

            std::thread::spawn(move || {
                let rt = tokio::runtime::Runtime::new().unwrap();
                rt.block_on(async {
                    let _ = server.run(CancellationToken::new()).await;
                });
            });

            std::thread::sleep(Duration::from_millis(500));
            port
        })
    }

    async fn scrape(port: u16) -> String {
        reqwest::get(format!("http://127.0.0.1:{}/metrics", port))
            .await
            .expect("Request should succeed")
            .text()
            .await
            .expect("Should have body")
    }

    #[tokio::test]
    async fn metrics_server_serves_prometheus_text() {
        let port = get_test_port();
        metrics::counter!("healthwarden_notifications_sent_total", "channel" => "webhook")
            .increment(1);

        let body = scrape(port).await;
        for line in body.lines().map(str::trim).filter(|l| !l.is_empty()) {
            let first = line.chars().next().unwrap_or(' ');
            assert!(
                first == '#' || first.is_alphabetic() || first == '_',
                "Invalid Prometheus line: {}",
                line
            );
        }
    }

    #[tokio::test]
    async fn initialized_and_incremented_metrics_appear() {
        let port = get_test_port();
        assert!(is_recorder_installed());

        initialize_metrics(&["agent_down"], &["pagerduty"]);
        metrics::counter!("healthwarden_alerts_triggered_total", "rule_name" => "high_cpu")
            .increment(3);
        metrics::gauge!("healthwarden_health_score").set(51.7);

        let body = scrape(port).await;
        assert!(body.contains("healthwarden_alerts_triggered_total"), "{}", body);
        assert!(body.contains("high_cpu"), "{}", body);
        assert!(body.contains("pagerduty"), "{}", body);
        assert!(body.contains("healthwarden_health_score"), "{}", body);
    }

    #[test]
    fn new_with_port_zero_allowed() {
        assert_eq!(MetricsServer::new(0).port(), 0);
        assert_eq!(MetricsServer::new(9090).port(), 9090);
    }
}
