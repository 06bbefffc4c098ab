//! Notification channel configuration.
//!
//! Channels are keyed by type in the config file. Each carries a free-form
//! `config` map which is only interpreted, after `${VAR}` substitution, when
//! the channel is built; a channel whose settings are incomplete is kept but
//! marked not actionable instead of failing the whole configuration.

use super::env::resolve_value;
use super::secret::SecretString;
use crate::error::ConfigError;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::{BTreeMap, HashMap};
use std::fmt;

/// Channel types, named as they appear in configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ChannelKind {
    #[serde(rename = "email")]
    Email,
    #[serde(rename = "slack", alias = "chat")]
    Chat,
    #[serde(rename = "sns", alias = "pubsub")]
    PubSub,
    #[serde(rename = "webhook")]
    Webhook,
    #[serde(rename = "pagerduty", alias = "pager")]
    Pager,
}

impl ChannelKind {
    pub const ALL: [ChannelKind; 5] = [
        ChannelKind::Email,
        ChannelKind::Chat,
        ChannelKind::PubSub,
        ChannelKind::Webhook,
        ChannelKind::Pager,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ChannelKind::Email => "email",
            ChannelKind::Chat => "slack",
            ChannelKind::PubSub => "sns",
            ChannelKind::Webhook => "webhook",
            ChannelKind::Pager => "pagerduty",
        }
    }
}

impl fmt::Display for ChannelKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One configured channel: raw settings plus an enable switch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChannelConfig {
    #[serde(default)]
    pub config: Map<String, Value>,
    #[serde(default = "super::types::default_true")]
    pub enabled: bool,
}

/// All configured channels, keyed by type.
pub type ChannelsConfig = BTreeMap<ChannelKind, ChannelConfig>;

impl ChannelConfig {
    pub fn new(config: Value, enabled: bool) -> Self {
        Self {
            config: match config {
                Value::Object(map) => map,
                _ => Map::new(),
            },
            enabled,
        }
    }

    /// Resolve `${VAR}` references and parse the settings for `kind`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidChannel`] if a variable is undefined or
    /// a field has the wrong type.
    pub fn settings<T: DeserializeOwned>(&self, kind: ChannelKind) -> Result<T, ConfigError> {
        let invalid = |message: String| ConfigError::InvalidChannel {
            name: kind.to_string(),
            message,
        };
        let resolved = resolve_value(&Value::Object(self.config.clone()))
            .map_err(|e| invalid(e.to_string()))?;
        serde_json::from_value(resolved).map_err(|e| invalid(e.to_string()))
    }
}

/// Settings that can report which required fields are unset.
pub trait ChannelSettings: DeserializeOwned {
    /// Names of required fields that are empty.
    fn missing_fields(&self) -> Vec<&'static str>;
}

fn required(missing: &mut Vec<&'static str>, field: &'static str, empty: bool) {
    if empty {
        missing.push(field);
    }
}

// ===================================================================
// Email
// ===================================================================

/// SMTP settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct EmailSettings {
    pub smtp_server: String,
    pub smtp_port: u16,
    pub username: String,
    pub password: SecretString,
    /// Sender address; the username is used when empty.
    pub from_email: String,
    pub to_emails: Vec<String>,
}

impl Default for EmailSettings {
    fn default() -> Self {
        Self {
            smtp_server: "smtp.gmail.com".to_string(),
            smtp_port: 587,
            username: String::new(),
            password: SecretString::default(),
            from_email: String::new(),
            to_emails: Vec::new(),
        }
    }
}

impl ChannelSettings for EmailSettings {
    fn missing_fields(&self) -> Vec<&'static str> {
        let mut missing = Vec::new();
        required(&mut missing, "username", self.username.is_empty());
        required(&mut missing, "to_emails", self.to_emails.is_empty());
        missing
    }
}

// ===================================================================
// Chat webhook
// ===================================================================

/// Incoming-webhook chat settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ChatSettings {
    pub webhook_url: SecretString,
    pub channel: String,
    pub username: String,
}

impl Default for ChatSettings {
    fn default() -> Self {
        Self {
            webhook_url: SecretString::default(),
            channel: "#alerts".to_string(),
            username: "Agent Monitor".to_string(),
        }
    }
}

impl ChannelSettings for ChatSettings {
    fn missing_fields(&self) -> Vec<&'static str> {
        let mut missing = Vec::new();
        required(&mut missing, "webhook_url", self.webhook_url.is_empty());
        missing
    }
}

// ===================================================================
// Pub/sub topic
// ===================================================================

/// SNS topic settings.
///
/// Credentials fall back to `AWS_ACCESS_KEY_ID`, `AWS_SECRET_ACCESS_KEY`
/// and `AWS_SESSION_TOKEN` when not set here.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PubSubSettings {
    pub topic_arn: String,
    pub region: String,
    pub access_key_id: Option<String>,
    pub secret_access_key: Option<SecretString>,
    pub session_token: Option<SecretString>,
    /// Overrides `https://sns.<region>.amazonaws.com/`.
    pub endpoint: Option<String>,
}

impl Default for PubSubSettings {
    fn default() -> Self {
        Self {
            topic_arn: String::new(),
            region: "us-east-1".to_string(),
            access_key_id: None,
            secret_access_key: None,
            session_token: None,
            endpoint: None,
        }
    }
}

impl ChannelSettings for PubSubSettings {
    fn missing_fields(&self) -> Vec<&'static str> {
        let mut missing = Vec::new();
        required(&mut missing, "topic_arn", self.topic_arn.is_empty());
        missing
    }
}

// ===================================================================
// Generic webhook
// ===================================================================

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct WebhookSettings {
    pub url: SecretString,
    pub method: String,
    pub headers: HashMap<String, String>,
}

impl Default for WebhookSettings {
    fn default() -> Self {
        Self {
            url: SecretString::default(),
            method: "POST".to_string(),
            headers: HashMap::new(),
        }
    }
}

impl ChannelSettings for WebhookSettings {
    fn missing_fields(&self) -> Vec<&'static str> {
        let mut missing = Vec::new();
        required(&mut missing, "url", self.url.is_empty());
        missing
    }
}

// ===================================================================
// Pager
// ===================================================================

/// Default pager events endpoint.
pub const DEFAULT_PAGER_URL: &str = "https://events.pagerduty.com/v2/enqueue";

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PagerSettings {
    pub integration_key: SecretString,
    pub service_url: String,
}

impl Default for PagerSettings {
    fn default() -> Self {
        Self {
            integration_key: SecretString::default(),
            service_url: DEFAULT_PAGER_URL.to_string(),
        }
    }
}

impl ChannelSettings for PagerSettings {
    fn missing_fields(&self) -> Vec<&'static str> {
        let mut missing = Vec::new();
        required(&mut missing, "integration_key", self.integration_key.is_empty());
        missing
    }
}
