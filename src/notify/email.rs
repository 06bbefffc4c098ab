//! Email notifier over SMTP.
//!
//! Connects with STARTTLS and authenticates with the configured username
//! and password. One message is sent per alert, addressed to every
//! recipient.

use crate::alert::Alert;
use crate::config::{ChannelKind, EmailSettings};
use crate::error::{ConfigError, DeliveryError};
use crate::notify::Notifier;
use async_trait::async_trait;
use lettre::message::Mailbox;
use lettre::message::header::ContentType;
use lettre::transport::smtp::authentication::Credentials;
use lettre::transport::smtp::client::{Tls, TlsParameters};
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use std::sync::Arc;

/// Async email transport abstraction.
///
/// Lets tests inject a mock while production uses `AsyncSmtpTransport`.
#[async_trait]
pub trait EmailTransport: Send + Sync {
    /// Send an email message, returning the transport error text on failure.
    async fn send_email(&self, message: Message) -> Result<(), String>;
}

/// Real SMTP transport wrapper implementing `EmailTransport`.
pub struct SmtpTransport {
    inner: AsyncSmtpTransport<Tokio1Executor>,
}

impl SmtpTransport {
    pub fn new(transport: AsyncSmtpTransport<Tokio1Executor>) -> Self {
        Self { inner: transport }
    }
}

#[async_trait]
impl EmailTransport for SmtpTransport {
    async fn send_email(&self, message: Message) -> Result<(), String> {
        self.inner
            .send(message)
            .await
            .map(|_| ())
            .map_err(|e| e.to_string())
    }
}

/// Email notifier.
pub struct EmailNotifier {
    transport: Arc<dyn EmailTransport>,
    from: Mailbox,
    to: Vec<Mailbox>,
}

impl EmailNotifier {
    /// Build from resolved settings.
    ///
    /// The sender defaults to the SMTP username when `from_email` is empty.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidChannel`] for unparsable addresses or
    /// a TLS setup failure.
    pub fn from_settings(settings: &EmailSettings) -> Result<Self, ConfigError> {
        let invalid = |message: String| ConfigError::InvalidChannel {
            name: ChannelKind::Email.to_string(),
            message,
        };

        let tls = TlsParameters::new(settings.smtp_server.clone())
            .map_err(|e| invalid(format!("TLS configuration error: {}", e)))?;

        let transport = AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(&settings.smtp_server)
            .port(settings.smtp_port)
            .tls(Tls::Required(tls))
            .credentials(Credentials::new(
                settings.username.clone(),
                settings.password.expose().to_string(),
            ))
            .build();

        let from_address = if settings.from_email.is_empty() {
            &settings.username
        } else {
            &settings.from_email
        };
        let from: Mailbox = from_address
            .parse()
            .map_err(|e| invalid(format!("invalid 'from' address '{}': {}", from_address, e)))?;

        let to = settings
            .to_emails
            .iter()
            .map(|addr| {
                addr.parse::<Mailbox>()
                    .map_err(|e| invalid(format!("invalid 'to' address '{}': {}", addr, e)))
            })
            .collect::<Result<Vec<_>, _>>()?;

        if to.is_empty() {
            return Err(invalid(
                "'to_emails' must contain at least one address".to_string(),
            ));
        }

        Ok(Self {
            transport: Arc::new(SmtpTransport::new(transport)),
            from,
            to,
        })
    }

    /// Build with a custom transport.
    pub fn with_transport(transport: Arc<dyn EmailTransport>, from: Mailbox, to: Vec<Mailbox>) -> Self {
        Self { transport, from, to }
    }

    fn build_message(&self, alert: &Alert) -> Result<Message, DeliveryError> {
        let mut builder = Message::builder()
            .from(self.from.clone())
            .subject(subject(alert));
        for recipient in &self.to {
            builder = builder.to(recipient.clone());
        }

        builder
            .header(ContentType::TEXT_PLAIN)
            .body(body(alert)?)
            .map_err(|e| DeliveryError::Build(e.to_string()))
    }
}

/// `[LEVEL] title`.
pub fn subject(alert: &Alert) -> String {
    format!("[{}] {}", alert.level.as_str().to_uppercase(), alert.title)
}

/// Plain-text body with the alert fields and the metrics snapshot.
pub fn body(alert: &Alert) -> Result<String, DeliveryError> {
    let metadata = serde_json::to_string_pretty(&alert.metadata)
        .map_err(|e| DeliveryError::Build(format!("metadata serialization: {}", e)))?;

    Ok(format!(
        "Alert Level: {}\nComponent: {}\nTime: {}\n\nMessage:\n{}\n\nMetadata:\n{}\n",
        alert.level.as_str().to_uppercase(),
        alert.component,
        alert.timestamp.format("%Y-%m-%d %H:%M:%S UTC"),
        alert.message,
        metadata
    ))
}

#[async_trait]
impl Notifier for EmailNotifier {
    fn kind(&self) -> ChannelKind {
        ChannelKind::Email
    }

    async fn deliver(&self, alert: &Alert) -> Result<(), DeliveryError> {
        let message = self.build_message(alert)?;
        self.transport
            .send_email(message)
            .await
            .map_err(DeliveryError::SendFailed)?;
        tracing::debug!(recipients = self.to.len(), "Email sent");
        Ok(())
    }
}

impl std::fmt::Debug for EmailNotifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EmailNotifier")
            .field("from", &self.from.to_string())
            .field("to_count", &self.to.len())
            .finish()
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::alert::AlertLevel;
    use crate::config::SecretString;
    use chrono::{TimeZone, Utc};
    use serde_json::json;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicU32, Ordering};

    /// Mock email transport recording every message it is given.
    pub struct MockEmailTransport {
        sent_messages: Mutex<Vec<SentEmail>>,
        send_count: AtomicU32,
        fail_next_n: AtomicU32,
    }

    #[derive(Debug, Clone)]
    pub struct SentEmail {
        pub from: String,
        pub to: String,
        pub subject: String,
        pub body: String,
    }

    impl MockEmailTransport {
        pub fn new() -> Self {
            Self {
                sent_messages: Mutex::new(Vec::new()),
                send_count: AtomicU32::new(0),
                fail_next_n: AtomicU32::new(0),
            }
        }

        pub fn fail_next(&self, count: u32) {
            self.fail_next_n.store(count, Ordering::SeqCst);
        }

        pub fn send_count(&self) -> u32 {
            self.send_count.load(Ordering::SeqCst)
        }

        pub fn sent_emails(&self) -> Vec<SentEmail> {
            self.sent_messages.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl EmailTransport for MockEmailTransport {
        async fn send_email(&self, message: Message) -> Result<(), String> {
            self.send_count.fetch_add(1, Ordering::SeqCst);

            if self.fail_next_n.load(Ordering::SeqCst) > 0 {
                self.fail_next_n.fetch_sub(1, Ordering::SeqCst);
                return Err("Connection refused".to_string());
            }

            let header = |name: &str| {
                message
                    .headers()
                    .get_raw(name)
                    .map(|v| v.to_string())
                    .unwrap_or_default()
            };

            self.sent_messages.lock().unwrap().push(SentEmail {
                from: header("From"),
                to: header("To"),
                subject: header("Subject"),
                body: String::from_utf8_lossy(&message.formatted()).to_string(),
            });
            Ok(())
        }
    }

    pub fn mock_notifier(transport: Arc<MockEmailTransport>) -> EmailNotifier {
        EmailNotifier::with_transport(
            transport,
            "monitor@example.com".parse().unwrap(),
            vec![
                "oncall@example.com".parse().unwrap(),
                "team@example.com".parse().unwrap(),
            ],
        )
    }

    fn make_alert() -> Alert {
        Alert {
            id: "agent_down_1".to_string(),
            level: AlertLevel::Critical,
            title: "Alert: Agent Down".to_string(),
            message: "Only 2 agents active (minimum: 3)".to_string(),
            component: "agent_down".to_string(),
            timestamp: Utc.with_ymd_and_hms(2026, 3, 4, 5, 6, 7).unwrap(),
            metadata: json!({"daemon_agents": {"active_daemon_agents": 2}})
                .as_object()
                .cloned()
                .unwrap(),
            resolved: false,
            acknowledged: false,
        }
    }

    fn settings() -> EmailSettings {
        EmailSettings {
            smtp_server: "smtp.example.com".to_string(),
            smtp_port: 587,
            username: "monitor@example.com".to_string(),
            password: SecretString::new("hunter2".to_string()),
            from_email: String::new(),
            to_emails: vec!["oncall@example.com".to_string()],
        }
    }

    #[test]
    fn subject_has_uppercase_level() {
        assert_eq!(subject(&make_alert()), "[CRITICAL] Alert: Agent Down");
    }

    #[test]
    fn body_contains_fields_and_pretty_metadata() {
        let body = body(&make_alert()).unwrap();
        assert!(body.starts_with("Alert Level: CRITICAL\nComponent: agent_down\n"));
        assert!(body.contains("Time: 2026-03-04 05:06:07 UTC"));
        assert!(body.contains("Message:\nOnly 2 agents active (minimum: 3)"));
        assert!(body.contains("\"active_daemon_agents\": 2"));
    }

    #[tokio::test]
    async fn from_settings_with_valid_settings() {
        let notifier = EmailNotifier::from_settings(&settings()).unwrap();
        assert_eq!(notifier.kind(), ChannelKind::Email);
        assert_eq!(notifier.from.email.to_string(), "monitor@example.com");
    }

    #[tokio::test]
    async fn from_settings_prefers_explicit_sender() {
        let mut settings = settings();
        settings.from_email = "alerts@example.com".to_string();
        let notifier = EmailNotifier::from_settings(&settings).unwrap();
        assert_eq!(notifier.from.email.to_string(), "alerts@example.com");
    }

    #[tokio::test]
    async fn from_settings_rejects_invalid_recipient() {
        let mut settings = settings();
        settings.to_emails = vec!["not-an-address".to_string()];
        match EmailNotifier::from_settings(&settings) {
            Err(ConfigError::InvalidChannel { name, message }) => {
                assert_eq!(name, "email");
                assert!(message.contains("not-an-address"));
            }
            other => panic!("Expected InvalidChannel, got {:?}", other.map(|_| ())),
        }
    }

    #[tokio::test]
    async fn deliver_sends_one_message_to_all_recipients() {
        let transport = Arc::new(MockEmailTransport::new());
        let notifier = mock_notifier(transport.clone());

        notifier.deliver(&make_alert()).await.unwrap();

        let sent = transport.sent_emails();
        assert_eq!(sent.len(), 1);
        assert!(sent[0].from.contains("monitor@example.com"));
        assert!(sent[0].to.contains("oncall@example.com"));
        assert!(sent[0].to.contains("team@example.com"));
        assert_eq!(sent[0].subject, "[CRITICAL] Alert: Agent Down");
        assert!(sent[0].body.contains("Component: agent_down"));
    }

    #[tokio::test]
    async fn deliver_reports_transport_failure() {
        let transport = Arc::new(MockEmailTransport::new());
        transport.fail_next(1);
        let notifier = mock_notifier(transport.clone());

        let result = notifier.deliver(&make_alert()).await;

        match result {
            Err(DeliveryError::SendFailed(message)) => {
                assert!(message.contains("Connection refused"))
            }
            other => panic!("Expected SendFailed, got {:?}", other),
        }
        assert_eq!(transport.send_count(), 1);
    }
}
