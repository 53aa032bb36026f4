//! WhatsApp Cloud API plumbing
//!
//! Inbound webhook payload types and outbound reply delivery.
//! Uses a long-lived reqwest::Client for connection pooling.

use crate::config::WhatsAppConfig;
use crate::conversation::user_tag;
use crate::error::BotError;
use crate::Result;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{error, info};

//
// ================= Inbound payload =================
//

/// Webhook notification body. Everything is optional so unexpected shapes
/// deserialize to "no messages" instead of failing.
#[derive(Debug, Default, Deserialize)]
pub struct WebhookPayload {
    #[serde(default)]
    pub entry: Vec<Entry>,
}

#[derive(Debug, Default, Deserialize)]
pub struct Entry {
    #[serde(default)]
    pub changes: Vec<Change>,
}

#[derive(Debug, Default, Deserialize)]
pub struct Change {
    #[serde(default)]
    pub value: ChangeValue,
}

#[derive(Debug, Default, Deserialize)]
pub struct ChangeValue {
    #[serde(default)]
    pub messages: Vec<InboundMessage>,
}

#[derive(Debug, Deserialize)]
pub struct InboundMessage {
    pub from: Option<String>,
    #[serde(rename = "type")]
    pub kind: Option<String>,
    pub text: Option<TextBody>,
}

#[derive(Debug, Deserialize)]
pub struct TextBody {
    pub body: String,
}

impl WebhookPayload {
    /// `(sender, text)` for every text message, in delivery order.
    pub fn text_messages(&self) -> Vec<(String, String)> {
        self.entry
            .iter()
            .flat_map(|entry| entry.changes.iter())
            .flat_map(|change| change.value.messages.iter())
            .filter(|message| message.kind.as_deref().map_or(true, |kind| kind == "text"))
            .filter_map(|message| {
                let from = message.from.as_ref()?;
                let text = message.text.as_ref()?;
                Some((from.clone(), text.body.clone()))
            })
            .collect()
    }
}

//
// ================= Outbound delivery =================
//

/// Delivers a reply to a user.
#[async_trait::async_trait]
pub trait MessageSender: Send + Sync {
    async fn send(&self, to: &str, text: &str) -> Result<()>;
}

/// Logs replies instead of sending them. Used when no credentials are configured.
pub struct LogSender;

#[async_trait::async_trait]
impl MessageSender for LogSender {
    async fn send(&self, to: &str, text: &str) -> Result<()> {
        info!(user = %user_tag(to), chars = text.chars().count(), "Reply ready (log delivery)");
        Ok(())
    }
}

#[derive(Serialize)]
struct OutboundText<'a> {
    messaging_product: &'static str,
    to: &'a str,
    #[serde(rename = "type")]
    kind: &'static str,
    text: OutboundBody<'a>,
}

#[derive(Serialize)]
struct OutboundBody<'a> {
    body: &'a str,
}

/// Reusable Cloud API client (connection-pooled)
pub struct CloudApiSender {
    client: Client,
    token: String,
    url: String,
}

impl CloudApiSender {
    pub fn new(config: &WhatsAppConfig) -> Result<Self> {
        let client = Client::builder()
            .pool_idle_timeout(Duration::from_secs(90))
            .pool_max_idle_per_host(8)
            .timeout(Duration::from_secs(30))
            .build()?;

        Ok(Self {
            client,
            token: config.token.clone(),
            url: format!("{}/{}/messages", config.api_base, config.phone_number_id),
        })
    }
}

#[async_trait::async_trait]
impl MessageSender for CloudApiSender {
    async fn send(&self, to: &str, text: &str) -> Result<()> {
        let body = OutboundText {
            messaging_product: "whatsapp",
            to,
            kind: "text",
            text: OutboundBody { body: text },
        };

        let response = self
            .client
            .post(&self.url)
            .bearer_auth(&self.token)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            error!(user = %user_tag(to), status = %status, "Cloud API rejected reply");
            return Err(BotError::Delivery(format!(
                "Cloud API returned {}: {}",
                status, error_text
            )));
        }

        info!(user = %user_tag(to), "Reply delivered");
        Ok(())
    }
}
