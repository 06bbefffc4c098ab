//! healthwarden - health scoring, alert rules and multi-channel notifications.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use clap::Parser;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use healthwarden::cli::{Cli, LogFormat};
use healthwarden::collect::{self, FileCollector, MetricsCollector};
use healthwarden::config::{Config, RuntimeConfig};
use healthwarden::{
    AlertManager, ChannelRegistry, Dispatcher, HealthScorer, MetricsServer, MonitorLoop,
    initialize_metrics,
};

/// Initialize the tracing subscriber with the specified log format.
fn init_logging(format: LogFormat) {
    let filter = tracing_subscriber::EnvFilter::from_default_env()
        .add_directive(tracing::Level::INFO.into());

    match format {
        LogFormat::Text => {
            tracing_subscriber::fmt()
                .with_writer(std::io::stderr)
                .with_env_filter(filter)
                .init();
        }
        LogFormat::Json => {
            tracing_subscriber::fmt()
                .with_writer(std::io::stderr)
                .json()
                .with_current_span(true)
                .with_span_list(false)
                .flatten_event(true)
                .with_env_filter(filter)
                .init();
        }
    }
}

/// `--validate`: strict load, report every error, exit non-zero on failure.
fn validate(path: &Path) -> Result<()> {
    let config = match Config::load(path) {
        Ok(c) => c,
        Err(e) => {
            error!(error = %e, path = %path.display(), "Failed to load configuration");
            std::process::exit(1);
        }
    };

    if let Err(errors) = config.validate() {
        for e in &errors {
            error!(error = %e, "Configuration validation error");
        }
        error!(error_count = errors.len(), "Configuration validation failed");
        std::process::exit(1);
    }

    println!("Configuration is valid: {}", path.display());
    println!(
        "  Rules: {} ({} enabled)",
        config.rules.len(),
        config.rules.iter().filter(|r| r.enabled).count()
    );
    println!(
        "  Channels: {} ({} enabled)",
        config.channels.len(),
        config.channels.values().filter(|c| c.enabled).count()
    );
    println!(
        "  Metrics: {} (port {})",
        if config.metrics.enabled {
            "enabled"
        } else {
            "disabled"
        },
        config.metrics.port
    );
    Ok(())
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    init_logging(cli.log_format);

    if cli.validate {
        return validate(&cli.config);
    }

    info!(config_path = %cli.config.display(), "Loading configuration");
    let config = Config::load_or_default(&cli.config);

    // Problems are reported, not fatal: unusable channels are skipped at send time.
    if let Err(errors) = config.validate() {
        for e in &errors {
            warn!(error = %e, "Configuration problem");
        }
        warn!(
            error_count = errors.len(),
            "Configuration has problems, continuing with usable parts"
        );
    }

    let runtime_config = config.compile();

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;

    runtime.block_on(run(cli, runtime_config))
}

async fn run(cli: Cli, config: RuntimeConfig) -> Result<()> {
    // Shared HTTP client for channels and the collector.
    let http_client = reqwest::Client::builder()
        .timeout(config.dispatch.timeout)
        .build()?;

    let registry = ChannelRegistry::from_config(&config.channels, &http_client);
    let channel_names: Vec<&str> = registry.ready_kinds().iter().map(|k| k.as_str()).collect();
    let dispatcher = Dispatcher::new(registry, config.dispatch.timeout);
    let manager = Arc::new(AlertManager::new(config.rules.clone(), dispatcher));

    let collector: Box<dyn MetricsCollector> = match (&cli.metrics_file, &config.monitor.source) {
        (Some(path), _) => Box::new(FileCollector::new(path.clone())),
        (None, Some(source)) => collect::from_source(source, http_client.clone()),
        (None, None) => anyhow::bail!(
            "no metrics source configured: set monitor.source or pass --metrics-file"
        ),
    };

    let monitor = MonitorLoop::new(
        collector,
        HealthScorer::new(config.monitor.critical_checks.clone()),
        manager.clone(),
        config.monitor.interval,
        config.monitor.collect_timeout,
    );

    if cli.single_shot() {
        let report = monitor.run_tick().await?;
        info!(
            health_score = report.health.score,
            new_alerts = report.process.alerts.len(),
            "Single evaluation complete"
        );
        let output = serde_json::json!({
            "health": report.health,
            "summary": manager.summary().await,
        });
        println!("{}", serde_json::to_string_pretty(&output)?);
        return Ok(());
    }

    let cancel = CancellationToken::new();

    let metrics_handle = if config.metrics.enabled {
        let (ready_tx, ready_rx) = tokio::sync::oneshot::channel();
        let server = MetricsServer::with_ready_signal(config.metrics.port, ready_tx);
        let cancel_metrics = cancel.clone();
        info!(port = config.metrics.port, "Starting metrics server");
        let handle = tokio::spawn(async move {
            if let Err(e) = server.run(cancel_metrics).await {
                error!(error = %e, "Metrics server error");
            }
        });
        if ready_rx.await.is_ok() {
            initialize_metrics(&config.rule_names(), &channel_names);
        }
        Some(handle)
    } else {
        info!("Metrics server disabled");
        None
    };

    let cancel_signal = cancel.clone();
    tokio::spawn(async move {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "Failed to listen for ctrl-c signal");
            return;
        }
        info!("Received shutdown signal, finishing current tick");
        cancel_signal.cancel();
    });

    info!(
        rules = config.rules.len(),
        channels = channel_names.len(),
        "healthwarden starting"
    );
    monitor.run(cancel.clone()).await;

    if let Some(handle) = metrics_handle {
        let _ = tokio::time::timeout(Duration::from_secs(2), handle).await;
    }

    info!("healthwarden shutdown complete");
    Ok(())
}
