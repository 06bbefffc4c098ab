//! Pub/sub notifier publishing to an SNS topic.
//!
//! Uses the SNS Query API (`Action=Publish`) over HTTPS, signed with
//! AWS Signature Version 4.

use crate::alert::Alert;
use crate::config::{ChannelKind, PubSubSettings, SecretString};
use crate::error::{ConfigError, DeliveryError};
use crate::notify::{Notifier, send_request};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use hmac::{Hmac, Mac};
use sha2::{Digest, Sha256};

type HmacSha256 = Hmac<Sha256>;

const SERVICE: &str = "sns";
const API_VERSION: &str = "2010-03-31";
const CONTENT_TYPE: &str = "application/x-www-form-urlencoded; charset=utf-8";
/// SNS rejects longer subjects.
const MAX_SUBJECT_CHARS: usize = 100;

/// AWS credentials used for signing.
#[derive(Debug, Clone)]
pub struct AwsCredentials {
    pub access_key_id: String,
    pub secret_access_key: SecretString,
    pub session_token: Option<SecretString>,
}

impl AwsCredentials {
    /// Credentials from the settings, falling back to the standard
    /// `AWS_*` environment variables for anything unset.
    pub fn resolve(settings: &PubSubSettings) -> Option<Self> {
        let access_key_id = settings
            .access_key_id
            .clone()
            .filter(|k| !k.is_empty())
            .or_else(|| std::env::var("AWS_ACCESS_KEY_ID").ok())?;
        let secret_access_key = settings
            .secret_access_key
            .clone()
            .filter(|k| !k.is_empty())
            .or_else(|| {
                std::env::var("AWS_SECRET_ACCESS_KEY")
                    .ok()
                    .map(SecretString::new)
            })?;
        let session_token = settings.session_token.clone().or_else(|| {
            std::env::var("AWS_SESSION_TOKEN")
                .ok()
                .map(SecretString::new)
        });

        Some(Self {
            access_key_id,
            secret_access_key,
            session_token,
        })
    }
}

/// A signed request ready to send.
#[derive(Debug)]
pub struct SignedRequest {
    pub amz_date: String,
    pub authorization: String,
}

pub struct PubSubNotifier {
    client: reqwest::Client,
    topic_arn: String,
    region: String,
    endpoint: url::Url,
    credentials: AwsCredentials,
}

impl PubSubNotifier {
    /// Build from resolved settings.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidChannel`] when no credentials are
    /// available or the endpoint is not a valid URL.
    pub fn from_settings(
        settings: &PubSubSettings,
        client: reqwest::Client,
    ) -> Result<Self, ConfigError> {
        let invalid = |message: String| ConfigError::InvalidChannel {
            name: ChannelKind::PubSub.to_string(),
            message,
        };

        let credentials = AwsCredentials::resolve(settings)
            .ok_or_else(|| invalid("missing AWS credentials".to_string()))?;

        let endpoint = settings
            .endpoint
            .clone()
            .unwrap_or_else(|| format!("https://sns.{}.amazonaws.com/", settings.region));
        let endpoint = url::Url::parse(&endpoint)
            .map_err(|e| invalid(format!("invalid endpoint '{}': {}", endpoint, e)))?;

        Ok(Self {
            client,
            topic_arn: settings.topic_arn.clone(),
            region: settings.region.clone(),
            endpoint,
            credentials,
        })
    }

    fn host(&self) -> String {
        let host = self.endpoint.host_str().unwrap_or_default();
        match self.endpoint.port() {
            Some(port) => format!("{}:{}", host, port),
            None => host.to_string(),
        }
    }
}

/// `[ALERT] title`, cut to the SNS subject limit.
pub fn subject(alert: &Alert) -> String {
    format!("[ALERT] {}", alert.title)
        .chars()
        .take(MAX_SUBJECT_CHARS)
        .collect()
}

/// Published message text.
pub fn message(alert: &Alert) -> String {
    format!(
        "ALERT: {}\nLevel: {}\nComponent: {}\nTime: {}\n\n{}\n",
        alert.title,
        alert.level.as_str().to_uppercase(),
        alert.component,
        alert.timestamp.to_rfc3339(),
        alert.message
    )
}

/// Form-encoded `Publish` request body.
pub fn publish_body(topic_arn: &str, alert: &Alert) -> String {
    url::form_urlencoded::Serializer::new(String::new())
        .append_pair("Action", "Publish")
        .append_pair("Message", &message(alert))
        .append_pair("Subject", &subject(alert))
        .append_pair("TopicArn", topic_arn)
        .append_pair("Version", API_VERSION)
        .finish()
}

fn hmac_sha256(key: &[u8], data: &[u8]) -> Result<Vec<u8>, DeliveryError> {
    let mut mac = HmacSha256::new_from_slice(key)
        .map_err(|e| DeliveryError::Build(format!("HMAC error: {}", e)))?;
    mac.update(data);
    Ok(mac.finalize().into_bytes().to_vec())
}

/// Derive the SigV4 signing key for one day, region and service.
pub fn signing_key(
    secret: &str,
    date: &str,
    region: &str,
    service: &str,
) -> Result<Vec<u8>, DeliveryError> {
    let k_date = hmac_sha256(format!("AWS4{}", secret).as_bytes(), date.as_bytes())?;
    let k_region = hmac_sha256(&k_date, region.as_bytes())?;
    let k_service = hmac_sha256(&k_region, service.as_bytes())?;
    hmac_sha256(&k_service, b"aws4_request")
}

/// Sign a `POST /` form request with SigV4.
pub fn sign_request(
    credentials: &AwsCredentials,
    region: &str,
    host: &str,
    body: &str,
    now: DateTime<Utc>,
) -> Result<SignedRequest, DeliveryError> {
    let amz_date = now.format("%Y%m%dT%H%M%SZ").to_string();
    let date = now.format("%Y%m%d").to_string();

    let mut canonical_headers = format!(
        "content-type:{}\nhost:{}\nx-amz-date:{}\n",
        CONTENT_TYPE, host, amz_date
    );
    let mut signed_headers = "content-type;host;x-amz-date".to_string();
    if let Some(token) = &credentials.session_token {
        canonical_headers.push_str(&format!("x-amz-security-token:{}\n", token.expose()));
        signed_headers.push_str(";x-amz-security-token");
    }

    let hashed_payload = format!("{:x}", Sha256::digest(body.as_bytes()));
    let canonical_request = format!(
        "POST\n/\n\n{}\n{}\n{}",
        canonical_headers, signed_headers, hashed_payload
    );

    let credential_scope = format!("{}/{}/{}/aws4_request", date, region, SERVICE);
    let string_to_sign = format!(
        "AWS4-HMAC-SHA256\n{}\n{}\n{:x}",
        amz_date,
        credential_scope,
        Sha256::digest(canonical_request.as_bytes())
    );

    let key = signing_key(
        credentials.secret_access_key.expose(),
        &date,
        region,
        SERVICE,
    )?;
    let signature = hex::encode(hmac_sha256(&key, string_to_sign.as_bytes())?);

    Ok(SignedRequest {
        amz_date,
        authorization: format!(
            "AWS4-HMAC-SHA256 Credential={}/{}, SignedHeaders={}, Signature={}",
            credentials.access_key_id, credential_scope, signed_headers, signature
        ),
    })
}

#[async_trait]
impl Notifier for PubSubNotifier {
    fn kind(&self) -> ChannelKind {
        ChannelKind::PubSub
    }

    async fn deliver(&self, alert: &Alert) -> Result<(), DeliveryError> {
        let body = publish_body(&self.topic_arn, alert);
        let signed = sign_request(&self.credentials, &self.region, &self.host(), &body, Utc::now())?;

        let mut request = self
            .client
            .post(self.endpoint.clone())
            .header("Content-Type", CONTENT_TYPE)
            .header("X-Amz-Date", signed.amz_date)
            .header("Authorization", signed.authorization);
        if let Some(token) = &self.credentials.session_token {
            request = request.header("X-Amz-Security-Token", token.expose());
        }

        send_request(request.body(body)).await
    }
}

impl std::fmt::Debug for PubSubNotifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PubSubNotifier")
            .field("topic_arn", &self.topic_arn)
            .field("region", &self.region)
            .field("endpoint", &self.endpoint.as_str())
            .finish()
    }
}
