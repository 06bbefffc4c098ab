//! Configuration loading and validation for healthwarden.
//!
//! This module handles loading the JSON (or YAML) configuration file,
//! validation, built-in defaults and `${VAR}` substitution for secrets.

mod channels;
mod defaults;
mod env;
mod runtime;
mod secret;
mod types;
mod validation;

// Re-exports publics
pub use channels::{
    ChannelConfig, ChannelKind, ChannelSettings, ChannelsConfig, ChatSettings, DEFAULT_PAGER_URL,
    EmailSettings, PagerSettings, PubSubSettings, WebhookSettings,
};
pub use defaults::{builtin_message, default_channels, default_rules};
pub use env::{resolve_env_vars, resolve_value};
pub use runtime::{AlertRule, RuntimeConfig};
pub use secret::SecretString;
pub use types::{
    Config, DEFAULT_CONFIG_PATH, DEFAULT_COOLDOWN_SECS, DispatchConfig, MetricsConfig,
    MonitorConfig, RuleConfig, SourceConfig,
};
pub use validation::validate_template_render;
