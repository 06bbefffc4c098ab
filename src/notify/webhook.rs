//! Generic webhook notifier.
//!
//! Sends the alert as JSON ([`WebhookPayload`]) to an arbitrary endpoint,
//! with the method and extra headers taken from the channel config.

use crate::alert::Alert;
use crate::config::{ChannelKind, SecretString, WebhookSettings};
use crate::error::{ConfigError, DeliveryError};
use crate::notify::payload::WebhookPayload;
use crate::notify::{Notifier, send_request};
use async_trait::async_trait;
use reqwest::Method;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use std::str::FromStr;

/// Generic webhook notifier.
pub struct WebhookNotifier {
    /// Shared HTTP client (connection pooling).
    client: reqwest::Client,
    url: SecretString,
    method: Method,
    /// Extra headers; values may carry secrets.
    headers: HeaderMap,
}

impl WebhookNotifier {
    /// Build from resolved settings.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidChannel`] for an unknown method or an
    /// invalid header name or value.
    pub fn from_settings(
        settings: &WebhookSettings,
        client: reqwest::Client,
    ) -> Result<Self, ConfigError> {
        let invalid = |message: String| ConfigError::InvalidChannel {
            name: ChannelKind::Webhook.to_string(),
            message,
        };

        let method = Method::from_str(&settings.method.to_uppercase())
            .map_err(|_| invalid(format!("invalid method: {}", settings.method)))?;

        let mut headers = HeaderMap::new();
        for (key, value) in &settings.headers {
            let name = HeaderName::from_str(key)
                .map_err(|_| invalid(format!("invalid header name: {}", key)))?;
            let value = HeaderValue::from_str(value)
                .map_err(|_| invalid(format!("invalid header value for '{}'", key)))?;
            headers.insert(name, value);
        }

        Ok(Self {
            client,
            url: settings.url.clone(),
            method,
            headers,
        })
    }

    #[cfg(test)]
    pub fn method(&self) -> &Method {
        &self.method
    }
}

#[async_trait]
impl Notifier for WebhookNotifier {
    fn kind(&self) -> ChannelKind {
        ChannelKind::Webhook
    }

    async fn deliver(&self, alert: &Alert) -> Result<(), DeliveryError> {
        let request = self
            .client
            .request(self.method.clone(), self.url.expose())
            .headers(self.headers.clone())
            .json(&WebhookPayload::from_alert(alert));

        send_request(request).await?;
        tracing::debug!(method = %self.method, "Webhook accepted alert");
        Ok(())
    }
}

impl std::fmt::Debug for WebhookNotifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // URL and header values may carry credentials.
        f.debug_struct("WebhookNotifier")
            .field("method", &self.method.as_str())
            .field("header_count", &self.headers.len())
            .finish()
    }
}
