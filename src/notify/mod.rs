//! Alert delivery to notification channels.
//!
//! Each channel kind has one [`Notifier`] implementation, built from the
//! channel's config at startup and held by a [`ChannelRegistry`]. The
//! [`Dispatcher`] fans an alert out to the channels bound to its rule,
//! concurrently and with a per-channel timeout.
//!
//! # Architecture
//!
//! ```text
//! AlertManager --> Dispatcher.send(alert, rule.channels)
//!                      |
//!                      +--> ChannelRegistry lookup (disabled / not actionable / ready)
//!                      |
//!                      +--> join_all(timeout(notifier.deliver(alert)) per channel)
//! ```
//!
//! Failed deliveries are reported and logged, never retried.

pub mod chat;
pub mod dispatcher;
pub mod email;
pub mod pager;
pub mod payload;
pub mod pubsub;
pub mod registry;
pub mod traits;
pub mod webhook;

use crate::error::DeliveryError;

pub use chat::ChatNotifier;
pub use dispatcher::{DeliveryOutcome, DispatchReport, Dispatcher, SkipReason};
pub use email::{EmailNotifier, EmailTransport, SmtpTransport};
pub use pager::PagerNotifier;
pub use payload::{ChatPayload, PagerEvent, WebhookPayload};
pub use pubsub::PubSubNotifier;
pub use registry::{ChannelRegistry, ChannelSlot};
pub use traits::Notifier;
pub use webhook::WebhookNotifier;

/// Send a prepared HTTP request and map non-2xx statuses to errors.
pub(crate) async fn send_request(request: reqwest::RequestBuilder) -> Result<(), DeliveryError> {
    let response = request
        .send()
        .await
        .map_err(|e| DeliveryError::SendFailed(e.to_string()))?;

    let status = response.status();
    if status.is_success() {
        Ok(())
    } else {
        Err(DeliveryError::Rejected {
            status: status.as_u16(),
        })
    }
}
