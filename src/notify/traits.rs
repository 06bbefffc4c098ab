//! Notifier trait definition.

use async_trait::async_trait;

use crate::alert::Alert;
use crate::config::ChannelKind;
use crate::error::DeliveryError;

/// A configured notification channel.
///
/// Implementations must be `Send + Sync`; the dispatcher runs deliveries
/// for one alert concurrently. They make a single attempt: the dispatcher
/// applies the timeout and nothing retries.
///
/// # Example
///
/// ```ignore
/// struct LogNotifier;
///
/// #[async_trait]
/// impl Notifier for LogNotifier {
///     fn kind(&self) -> ChannelKind { ChannelKind::Webhook }
///     async fn deliver(&self, alert: &Alert) -> Result<(), DeliveryError> {
///         tracing::info!(alert_id = %alert.id, "delivered");
///         Ok(())
///     }
/// }
/// ```
#[async_trait]
pub trait Notifier: Send + Sync {
    /// Channel kind this notifier serves.
    fn kind(&self) -> ChannelKind;

    /// Deliver one alert.
    async fn deliver(&self, alert: &Alert) -> Result<(), DeliveryError>;
}

impl std::fmt::Debug for dyn Notifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Notifier")
            .field("kind", &self.kind())
            .finish()
    }
}
