// src/lib.rs
//! healthwarden - health scoring, alert rules and multi-channel notifications.
//!
//! A metrics snapshot is scored by [`HealthScorer`], evaluated by the
//! [`RuleEngine`] (subject to per-rule cooldown), recorded in the
//! [`AlertStore`] and fanned out to notification channels by the
//! [`Dispatcher`]. [`AlertManager`] ties these together and
//! [`MonitorLoop`] drives it periodically.

pub mod alert;
pub mod cli;
pub mod collect;
pub mod condition;
pub mod config;
pub mod cooldown;
pub mod engine;
pub mod error;
pub mod health;
pub mod manager;
pub mod metrics;
pub mod monitor;
pub mod notify;
pub mod store;
pub mod template;

// Re-export commonly used types
pub use alert::{Alert, AlertLevel, Metrics};
pub use cli::LogFormat;
pub use collect::{FileCollector, HttpCollector, MetricsCollector};
pub use condition::{Condition, MetricPath};
pub use cooldown::{CooldownResult, CooldownTracker};
pub use engine::RuleEngine;
pub use health::{CheckStatus, HealthCheckResult, HealthScore, HealthScorer, HealthStatus};
pub use manager::{AlertManager, ProcessReport};
pub use metrics::{MetricsServer, initialize_metrics, register_metric_descriptions};
pub use monitor::{MonitorLoop, TickReport};
pub use notify::{
    ChannelRegistry, ChannelSlot, DeliveryOutcome, DispatchReport, Dispatcher, Notifier,
    SkipReason,
};
pub use store::{AlertStore, AlertSummary};
pub use template::MessageRenderer;
