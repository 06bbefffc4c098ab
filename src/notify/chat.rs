//! Chat notifier for incoming-webhook style chat services.
//!
//! Posts a single colour-coded attachment per alert, see [`ChatPayload`].

use crate::alert::Alert;
use crate::config::{ChannelKind, ChatSettings, SecretString};
use crate::error::DeliveryError;
use crate::notify::payload::ChatPayload;
use crate::notify::{Notifier, send_request};
use async_trait::async_trait;

pub struct ChatNotifier {
    client: reqwest::Client,
    webhook_url: SecretString,
    channel: String,
    username: String,
}

impl ChatNotifier {
    pub fn new(settings: ChatSettings, client: reqwest::Client) -> Self {
        Self {
            client,
            webhook_url: settings.webhook_url,
            channel: settings.channel,
            username: settings.username,
        }
    }
}

#[async_trait]
impl Notifier for ChatNotifier {
    fn kind(&self) -> ChannelKind {
        ChannelKind::Chat
    }

    async fn deliver(&self, alert: &Alert) -> Result<(), DeliveryError> {
        let payload = ChatPayload::from_alert(alert, &self.channel, &self.username);
        send_request(self.client.post(self.webhook_url.expose()).json(&payload)).await
    }
}

impl std::fmt::Debug for ChatNotifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // The webhook URL is the credential.
        f.debug_struct("ChatNotifier")
            .field("channel", &self.channel)
            .field("username", &self.username)
            .finish()
    }
}
