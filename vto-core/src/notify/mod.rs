//! Outbound chat messages.
//!
//! Delivery is best-effort from the caller's point of view: the relay logs a
//! failed send and moves on. The notifier itself still reports errors so the
//! caller decides how loud to be.

use async_trait::async_trait;
use serde::Serialize;
use tracing::{debug, warn};

use crate::error::{Error, Result};

/// Default messaging API base
pub const DEFAULT_TWILIO_API_BASE: &str = "https://api.twilio.com";

/// Sends text replies to a chat user.
#[async_trait]
pub trait Notifier: Send + Sync {
    /// Send a plain text message.
    async fn notify(&self, recipient: &str, text: &str) -> Result<()>;

    /// Send a text message with one media attachment.
    async fn notify_with_media(&self, recipient: &str, text: &str, media_url: &str) -> Result<()>;
}

/// Messaging account configuration
#[derive(Debug, Clone)]
pub struct TwilioConfig {
    pub account_sid: String,
    pub auth_token: String,
    /// Sending address, e.g. `whatsapp:+14155238886`
    pub from: String,
    pub api_base: String,
}

impl Default for TwilioConfig {
    fn default() -> Self {
        Self {
            account_sid: String::new(),
            auth_token: String::new(),
            from: String::new(),
            api_base: DEFAULT_TWILIO_API_BASE.to_string(),
        }
    }
}

#[derive(Serialize)]
struct MessageForm<'a> {
    #[serde(rename = "From")]
    from: &'a str,
    #[serde(rename = "To")]
    to: &'a str,
    #[serde(rename = "Body")]
    body: &'a str,
    #[serde(rename = "MediaUrl", skip_serializing_if = "Option::is_none")]
    media_url: Option<&'a str>,
}

/// Twilio messages API implementation of [`Notifier`]
#[derive(Clone)]
pub struct TwilioNotifier {
    config: TwilioConfig,
    client: reqwest::Client,
}

impl TwilioNotifier {
    pub fn new(config: TwilioConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .build()
            .map_err(|e| Error::Other(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self { config, client })
    }

    fn messages_url(&self) -> String {
        format!(
            "{}/2010-04-01/Accounts/{}/Messages.json",
            self.config.api_base.trim_end_matches('/'),
            self.config.account_sid
        )
    }

    async fn send(&self, form: &MessageForm<'_>) -> Result<()> {
        debug!(to = %form.to, "Sending message");

        let resp = self
            .client
            .post(self.messages_url())
            .basic_auth(&self.config.account_sid, Some(&self.config.auth_token))
            .form(form)
            .send()
            .await
            .map_err(|e| Error::notify_failed(form.to, e.to_string()))?;

        let status = resp.status();
        if status.is_success() {
            Ok(())
        } else {
            let error_text = resp.text().await.unwrap_or_default();
            warn!(to = %form.to, status = %status, "Messaging API rejected message");
            Err(Error::notify_failed(
                form.to,
                format!("API error {}: {}", status, error_text),
            ))
        }
    }
}

#[async_trait]
impl Notifier for TwilioNotifier {
    async fn notify(&self, recipient: &str, text: &str) -> Result<()> {
        self.send(&MessageForm {
            from: &self.config.from,
            to: recipient,
            body: text,
            media_url: None,
        })
        .await
    }

    async fn notify_with_media(&self, recipient: &str, text: &str, media_url: &str) -> Result<()> {
        self.send(&MessageForm {
            from: &self.config.from,
            to: recipient,
            body: text,
            media_url: Some(media_url),
        })
        .await
    }
}
