//! Pager notifier (events API v2 trigger events).

use crate::alert::Alert;
use crate::config::{ChannelKind, PagerSettings, SecretString};
use crate::error::DeliveryError;
use crate::notify::payload::PagerEvent;
use crate::notify::{Notifier, send_request};
use async_trait::async_trait;

pub struct PagerNotifier {
    client: reqwest::Client,
    routing_key: SecretString,
    service_url: String,
}

impl PagerNotifier {
    pub fn new(settings: PagerSettings, client: reqwest::Client) -> Self {
        Self {
            client,
            routing_key: settings.integration_key,
            service_url: settings.service_url,
        }
    }
}

#[async_trait]
impl Notifier for PagerNotifier {
    fn kind(&self) -> ChannelKind {
        ChannelKind::Pager
    }

    async fn deliver(&self, alert: &Alert) -> Result<(), DeliveryError> {
        let event = PagerEvent::trigger(alert, self.routing_key.expose());
        send_request(self.client.post(&self.service_url).json(&event)).await
    }
}

impl std::fmt::Debug for PagerNotifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PagerNotifier")
            .field("service_url", &self.service_url)
            .field("routing_key", &self.routing_key)
            .finish()
    }
}
