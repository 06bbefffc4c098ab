//! Metrics snapshot sources.
//!
//! A collector returns one JSON object per call: top-level check names
//! mapped to their results, e.g.
//!
//! ```json
//! {"discovery_server": {"status": "healthy", "response_time_ms": 120}}
//! ```

use std::path::PathBuf;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;

use crate::alert::Metrics;
use crate::config::SourceConfig;
use crate::error::CollectError;

/// A source of metrics snapshots, polled once per monitor tick.
#[async_trait]
pub trait MetricsCollector: Send + Sync {
    /// Short name for logs.
    fn name(&self) -> &str;

    /// Fetch the current snapshot.
    async fn collect(&self) -> Result<Metrics, CollectError>;
}

/// Build the collector for a configured source.
pub fn from_source(source: &SourceConfig, client: reqwest::Client) -> Box<dyn MetricsCollector> {
    match source {
        SourceConfig::Http { url } => Box::new(HttpCollector::new(url.clone(), client)),
        SourceConfig::File { path } => Box::new(FileCollector::new(path.clone())),
    }
}

/// Run `collector` bounded by `timeout`.
///
/// # Errors
///
/// Returns [`CollectError::Timeout`] if the collector does not answer in
/// time, or the collector's own error.
pub async fn collect_with_timeout(
    collector: &dyn MetricsCollector,
    timeout: Duration,
) -> Result<Metrics, CollectError> {
    tokio::time::timeout(timeout, collector.collect())
        .await
        .map_err(|_| CollectError::Timeout(timeout))?
}

fn into_snapshot(value: Value) -> Result<Metrics, CollectError> {
    match value {
        Value::Object(map) => Ok(map),
        other => Err(CollectError::InvalidPayload(format!(
            "expected a JSON object, got {}",
            match other {
                Value::Null => "null",
                Value::Bool(_) => "a boolean",
                Value::Number(_) => "a number",
                Value::String(_) => "a string",
                Value::Array(_) => "an array",
                Value::Object(_) => "an object",
            }
        ))),
    }
}

/// GETs a JSON snapshot from an HTTP endpoint.
pub struct HttpCollector {
    url: String,
    client: reqwest::Client,
}

impl HttpCollector {
    pub fn new(url: String, client: reqwest::Client) -> Self {
        Self { url, client }
    }
}

#[async_trait]
impl MetricsCollector for HttpCollector {
    fn name(&self) -> &str {
        "http"
    }

    async fn collect(&self) -> Result<Metrics, CollectError> {
        let response = self
            .client
            .get(&self.url)
            .send()
            .await
            .map_err(|e| CollectError::Request(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(CollectError::Request(format!(
                "{} returned status {}",
                self.url, status
            )));
        }

        let value: Value = response
            .json()
            .await
            .map_err(|e| CollectError::InvalidPayload(e.to_string()))?;
        into_snapshot(value)
    }
}

/// Reads a JSON snapshot from a file, re-read on every tick.
pub struct FileCollector {
    path: PathBuf,
}

impl FileCollector {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }
}

#[async_trait]
impl MetricsCollector for FileCollector {
    fn name(&self) -> &str {
        "file"
    }

    async fn collect(&self) -> Result<Metrics, CollectError> {
        let content = tokio::fs::read_to_string(&self.path)
            .await
            .map_err(|e| CollectError::Io(format!("{}: {}", self.path.display(), e)))?;
        let value: Value = serde_json::from_str(&content)
            .map_err(|e| CollectError::InvalidPayload(format!("{}: {}", self.path.display(), e)))?;
        into_snapshot(value)
    }
}
