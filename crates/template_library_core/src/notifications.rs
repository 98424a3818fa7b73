//! Notifications sent when template versions change state.
//!
//! The workflow collects notifications while deciding a transition and dispatches them only after
//! the transaction has committed. Delivery is delegated to a [`NotificationSender`]; the webhook
//! sender signs every payload with HMAC-SHA256 so receivers can verify its origin.

use std::time::Duration;

use async_trait::async_trait;
use hmac::{Hmac, Mac};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use template_store::{ReportId, TemplateId};
use thiserror::Error;
use tracing::{debug, info, warn};
use url::Url;

#[cfg(test)]
#[path = "notifications_tests.rs"]
mod tests;

/// Header carrying the payload signature on webhook deliveries.
pub const SIGNATURE_HEADER: &str = "X-Signature-256";

type HmacSha256 = Hmac<Sha256>;

/// What happened to a template version.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    /// A new template was submitted for review.
    VersionSubmitted,
    /// An approved template was changed and the new version awaits review.
    VersionUpdated,
    VersionApproved,
    VersionRejected,
}

impl NotificationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            NotificationKind::VersionSubmitted => "version_submitted",
            NotificationKind::VersionUpdated => "version_updated",
            NotificationKind::VersionApproved => "version_approved",
            NotificationKind::VersionRejected => "version_rejected",
        }
    }
}

impl std::fmt::Display for NotificationKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Who a notification is addressed to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "email", rename_all = "snake_case")]
pub enum Recipient {
    User(String),
    /// The internal review queue.
    Reviewers,
}

impl std::fmt::Display for Recipient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Recipient::User(email) => f.write_str(email),
            Recipient::Reviewers => f.write_str("reviewers"),
        }
    }
}

/// A message about a template version state change.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Notification {
    pub kind: NotificationKind,
    pub recipients: Vec<Recipient>,
    pub template_id: TemplateId,
    pub template_name: String,
    pub template_url: String,
    /// E-mail of the user whose action triggered the notification.
    pub actor: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
}

/// Errors raised while delivering a notification.
#[derive(Error, Debug)]
pub enum NotificationError {
    #[error("Failed to serialize notification: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Failed to deliver notification: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Notification endpoint rejected the delivery with status {status}")]
    Rejected { status: u16 },

    #[error("Invalid notification configuration: {0}")]
    Configuration(String),
}

/// Delivers notifications.
#[async_trait]
pub trait NotificationSender: Send + Sync {
    async fn send(&self, notification: &Notification) -> Result<(), NotificationError>;
}

/// What a transition does when notifications fail after its change was committed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationPolicy {
    /// Report the failures to the caller as `WorkflowError::NotificationFailed`.
    #[default]
    Strict,
    /// Log the failures and report success.
    BestEffort,
}

/// Builds console links to templates.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TemplateUrls {
    base: Url,
}

impl TemplateUrls {
    /// Creates a builder for the console at `base`.
    ///
    /// # Errors
    ///
    /// Returns the parse error if `base` is not an absolute URL.
    pub fn new(base: &str) -> Result<Self, url::ParseError> {
        Ok(Self {
            base: Url::parse(base)?,
        })
    }

    /// The console page of a template, opened on the report of the version being reviewed.
    pub fn template_url(&self, template_id: &TemplateId, report_id: &ReportId) -> String {
        format!(
            "{}/analytics/report-templates/{}?report={}",
            self.base.as_str().trim_end_matches('/'),
            template_id,
            report_id
        )
    }
}

/// Writes notifications to the log instead of delivering them.
#[derive(Debug, Clone, Copy, Default)]
pub struct LoggingNotificationSender;

#[async_trait]
impl NotificationSender for LoggingNotificationSender {
    async fn send(&self, notification: &Notification) -> Result<(), NotificationError> {
        let recipients: Vec<String> = notification
            .recipients
            .iter()
            .map(ToString::to_string)
            .collect();
        info!(
            kind = %notification.kind,
            template_id = %notification.template_id,
            actor = %notification.actor,
            recipients = ?recipients,
            url = %notification.template_url,
            "Template notification"
        );
        Ok(())
    }
}

/// Computes the HMAC-SHA256 signature of a webhook payload.
///
/// # Returns
///
/// The signature formatted as `sha256=<hex>`.
///
/// # Errors
///
/// Returns `NotificationError::Configuration` if the secret cannot be used as an HMAC key.
pub fn compute_hmac_sha256(payload: &[u8], secret: &str) -> Result<String, NotificationError> {
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .map_err(|e| NotificationError::Configuration(format!("invalid signing key: {e}")))?;
    mac.update(payload);
    Ok(format!("sha256={}", hex::encode(mac.finalize().into_bytes())))
}

/// Posts notifications as signed JSON to a webhook endpoint.
pub struct WebhookNotificationSender {
    client: reqwest::Client,
    endpoint: Url,
    secret: SecretString,
}

impl WebhookNotificationSender {
    /// Creates a sender for `endpoint`.
    ///
    /// # Parameters
    ///
    /// * `endpoint` - URL the payloads are posted to
    /// * `secret` - Shared key used to sign payloads
    /// * `timeout` - Timeout applied to each delivery
    ///
    /// # Errors
    ///
    /// Returns `NotificationError::Transport` if the HTTP client cannot be built.
    pub fn new(
        endpoint: Url,
        secret: SecretString,
        timeout: Duration,
    ) -> Result<Self, NotificationError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            endpoint,
            secret,
        })
    }
}

#[async_trait]
impl NotificationSender for WebhookNotificationSender {
    async fn send(&self, notification: &Notification) -> Result<(), NotificationError> {
        let payload = serde_json::to_vec(notification)?;
        let signature = compute_hmac_sha256(&payload, self.secret.expose_secret())?;

        debug!(
            kind = %notification.kind,
            template_id = %notification.template_id,
            endpoint = %self.endpoint,
            "Posting notification"
        );

        let response = self
            .client
            .post(self.endpoint.clone())
            .header(reqwest::header::CONTENT_TYPE, "application/json")
            .header(SIGNATURE_HEADER, signature)
            .body(payload)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            warn!(
                kind = %notification.kind,
                template_id = %notification.template_id,
                status = status.as_u16(),
                "Notification endpoint rejected delivery"
            );
            return Err(NotificationError::Rejected {
                status: status.as_u16(),
            });
        }

        Ok(())
    }
}
