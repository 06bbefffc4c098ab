//! JSON bodies for the HTTP channels.

use crate::alert::{Alert, AlertLevel, Metrics};
use serde::Serialize;

/// Source field reported to the pager service.
pub const PAGER_SOURCE: &str = "agent-monitoring";

/// Chat timestamp format.
const CHAT_TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

// ===================================================================
// Generic webhook
// ===================================================================

/// Body posted to a generic webhook.
#[derive(Debug, Clone, Serialize)]
pub struct WebhookPayload<'a> {
    pub alert_id: &'a str,
    pub level: AlertLevel,
    pub title: &'a str,
    pub message: &'a str,
    pub component: &'a str,
    /// ISO 8601.
    pub timestamp: String,
    pub metadata: &'a Metrics,
}

impl<'a> WebhookPayload<'a> {
    pub fn from_alert(alert: &'a Alert) -> Self {
        Self {
            alert_id: &alert.id,
            level: alert.level,
            title: &alert.title,
            message: &alert.message,
            component: &alert.component,
            timestamp: alert.timestamp.to_rfc3339(),
            metadata: &alert.metadata,
        }
    }
}

// ===================================================================
// Pager
// ===================================================================

/// Trigger event for the pager events API.
#[derive(Debug, Clone, Serialize)]
pub struct PagerEvent<'a> {
    pub routing_key: &'a str,
    pub event_action: &'static str,
    /// `<component>_<level>`, so repeats of the same alert collapse.
    pub dedup_key: String,
    pub payload: PagerEventBody<'a>,
}

#[derive(Debug, Clone, Serialize)]
pub struct PagerEventBody<'a> {
    pub summary: &'a str,
    pub source: &'static str,
    pub severity: &'static str,
    pub component: &'a str,
    pub custom_details: PagerDetails<'a>,
}

#[derive(Debug, Clone, Serialize)]
pub struct PagerDetails<'a> {
    pub message: &'a str,
    pub metadata: &'a Metrics,
}

impl<'a> PagerEvent<'a> {
    pub fn trigger(alert: &'a Alert, routing_key: &'a str) -> Self {
        Self {
            routing_key,
            event_action: "trigger",
            dedup_key: format!("{}_{}", alert.component, alert.level),
            payload: PagerEventBody {
                summary: &alert.title,
                source: PAGER_SOURCE,
                severity: pager_severity(alert.level),
                component: &alert.component,
                custom_details: PagerDetails {
                    message: &alert.message,
                    metadata: &alert.metadata,
                },
            },
        }
    }
}

/// Pager severity: only critical and emergency alerts page as critical.
pub fn pager_severity(level: AlertLevel) -> &'static str {
    if level.is_page_worthy() {
        "critical"
    } else {
        "warning"
    }
}

// ===================================================================
// Chat
// ===================================================================

/// Incoming-webhook chat message with a single attachment.
#[derive(Debug, Clone, Serialize)]
pub struct ChatPayload<'a> {
    pub channel: &'a str,
    pub username: &'a str,
    pub attachments: Vec<ChatAttachment<'a>>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ChatAttachment<'a> {
    pub color: &'static str,
    pub title: &'a str,
    pub text: &'a str,
    pub fields: Vec<ChatField>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ChatField {
    pub title: &'static str,
    pub value: String,
    pub short: bool,
}

impl ChatField {
    fn short(title: &'static str, value: String) -> Self {
        Self {
            title,
            value,
            short: true,
        }
    }
}

impl<'a> ChatPayload<'a> {
    pub fn from_alert(alert: &'a Alert, channel: &'a str, username: &'a str) -> Self {
        Self {
            channel,
            username,
            attachments: vec![ChatAttachment {
                color: chat_color(alert.level),
                title: &alert.title,
                text: &alert.message,
                fields: vec![
                    ChatField::short("Level", alert.level.as_str().to_uppercase()),
                    ChatField::short("Component", alert.component.clone()),
                    ChatField::short(
                        "Time",
                        alert.timestamp.format(CHAT_TIME_FORMAT).to_string(),
                    ),
                ],
            }],
        }
    }
}

/// Attachment colour for an alert level.
pub fn chat_color(level: AlertLevel) -> &'static str {
    match level {
        AlertLevel::Info => "good",
        AlertLevel::Warning => "warning",
        AlertLevel::Critical => "danger",
        AlertLevel::Emergency => "#FF0000",
    }
}
