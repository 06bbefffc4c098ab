//! Command-line interface for healthwarden using clap.

use clap::{Parser, ValueEnum};
use std::path::PathBuf;

use crate::config::DEFAULT_CONFIG_PATH;

/// Log output format.
#[derive(Debug, Clone, Copy, Default, ValueEnum)]
pub enum LogFormat {
    /// Human-readable text (default).
    #[default]
    Text,
    /// Structured JSON for log aggregation.
    Json,
}

/// Health-metric alerting with multi-channel notifications.
#[derive(Parser, Debug)]
#[command(name = "healthwarden")]
#[command(version)]
#[command(about = "Health-metric alerting with multi-channel notifications")]
pub struct Cli {
    /// Path to configuration file (JSON, or YAML for .yaml/.yml).
    #[arg(short = 'c', long = "config", default_value = DEFAULT_CONFIG_PATH)]
    pub config: PathBuf,

    /// Validate configuration and exit.
    #[arg(long = "validate")]
    pub validate: bool,

    /// Run a single tick, print the alert summary as JSON and exit.
    #[arg(long = "once")]
    pub once: bool,

    /// Evaluate this metrics snapshot instead of the configured source.
    /// Implies --once.
    #[arg(long = "metrics-file", value_name = "PATH")]
    pub metrics_file: Option<PathBuf>,

    /// Log format: text or json.
    #[arg(long = "log-format", value_enum, default_value_t = LogFormat::Text, env = "LOG_FORMAT")]
    pub log_format: LogFormat,
}

impl Cli {
    /// Whether to exit after a single tick.
    pub fn single_shot(&self) -> bool {
        self.once || self.metrics_file.is_some()
    }
}
