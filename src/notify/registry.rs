//! Channel registry: one slot per configured channel kind.

use std::collections::BTreeMap;
use std::sync::Arc;

use crate::config::{
    ChannelConfig, ChannelKind, ChannelSettings, ChannelsConfig, ChatSettings, EmailSettings,
    PagerSettings, PubSubSettings, WebhookSettings,
};
use tracing::{debug, info, warn};

use super::{ChatNotifier, EmailNotifier, Notifier, PagerNotifier, PubSubNotifier, WebhookNotifier};

/// State of a configured channel.
#[derive(Debug, Clone)]
pub enum ChannelSlot {
    /// Present in config with `enabled: false`.
    Disabled,
    /// Enabled but missing required settings; sends are skipped.
    NotActionable { reason: String },
    Ready(Arc<dyn Notifier>),
}

/// Registry of channels keyed by kind.
///
/// Kinds absent from the registry were never configured.
#[derive(Debug, Default)]
pub struct ChannelRegistry {
    slots: BTreeMap<ChannelKind, ChannelSlot>,
}

impl ChannelRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build every configured channel.
    ///
    /// Never fails: a channel whose settings are incomplete or invalid is
    /// registered as [`ChannelSlot::NotActionable`] with a warning.
    pub fn from_config(channels: &ChannelsConfig, client: &reqwest::Client) -> Self {
        let mut registry = Self::new();

        for (&kind, channel) in channels {
            let slot = if !channel.enabled {
                debug!(channel = %kind, "Channel disabled");
                ChannelSlot::Disabled
            } else {
                match build(kind, channel, client) {
                    Ok(notifier) => {
                        info!(channel = %kind, "Channel ready");
                        ChannelSlot::Ready(notifier)
                    }
                    Err(reason) => {
                        warn!(channel = %kind, reason = %reason, "Channel not actionable, sends will be skipped");
                        ChannelSlot::NotActionable { reason }
                    }
                }
            };
            registry.slots.insert(kind, slot);
        }

        registry
    }

    /// Register a ready notifier under its own kind, replacing any slot.
    pub fn insert(&mut self, notifier: Arc<dyn Notifier>) {
        self.slots.insert(notifier.kind(), ChannelSlot::Ready(notifier));
    }

    pub fn insert_slot(&mut self, kind: ChannelKind, slot: ChannelSlot) {
        self.slots.insert(kind, slot);
    }

    pub fn get(&self, kind: ChannelKind) -> Option<&ChannelSlot> {
        self.slots.get(&kind)
    }

    /// Kinds with a ready notifier.
    pub fn ready_kinds(&self) -> Vec<ChannelKind> {
        self.slots
            .iter()
            .filter(|(_, slot)| matches!(slot, ChannelSlot::Ready(_)))
            .map(|(kind, _)| *kind)
            .collect()
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }
}

/// Parse settings and require every mandatory field.
fn settings<T: ChannelSettings>(kind: ChannelKind, channel: &ChannelConfig) -> Result<T, String> {
    let settings: T = channel.settings(kind).map_err(|e| e.to_string())?;
    let missing = settings.missing_fields();
    if missing.is_empty() {
        Ok(settings)
    } else {
        Err(format!("missing {}", missing.join(", ")))
    }
}

fn build(
    kind: ChannelKind,
    channel: &ChannelConfig,
    client: &reqwest::Client,
) -> Result<Arc<dyn Notifier>, String> {
    let notifier: Arc<dyn Notifier> = match kind {
        ChannelKind::Email => {
            let settings: EmailSettings = settings(kind, channel)?;
            Arc::new(EmailNotifier::from_settings(&settings).map_err(|e| e.to_string())?)
        }
        ChannelKind::Chat => {
            let settings: ChatSettings = settings(kind, channel)?;
            Arc::new(ChatNotifier::new(settings, client.clone()))
        }
        ChannelKind::PubSub => {
            let settings: PubSubSettings = settings(kind, channel)?;
            Arc::new(
                PubSubNotifier::from_settings(&settings, client.clone())
                    .map_err(|e| e.to_string())?,
            )
        }
        ChannelKind::Webhook => {
            let settings: WebhookSettings = settings(kind, channel)?;
            Arc::new(
                WebhookNotifier::from_settings(&settings, client.clone())
                    .map_err(|e| e.to_string())?,
            )
        }
        ChannelKind::Pager => {
            let settings: PagerSettings = settings(kind, channel)?;
            Arc::new(PagerNotifier::new(settings, client.clone()))
        }
    };
    Ok(notifier)
}
