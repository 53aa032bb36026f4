//! Runtime configuration from the environment (`.env` is loaded by the binaries).

use crate::error::BotError;
use crate::Result;

pub const DEFAULT_PORT: u16 = 8080;
pub const DEFAULT_API_BASE: &str = "https://graph.facebook.com/v19.0";

#[derive(Debug, Clone)]
pub struct BotConfig {
    pub port: u16,
    /// Token the platform echoes back when verifying the webhook.
    pub verify_token: String,
    pub whatsapp: Option<WhatsAppConfig>,
}

/// Credentials for replying through the WhatsApp Cloud API.
#[derive(Debug, Clone)]
pub struct WhatsAppConfig {
    pub token: String,
    pub phone_number_id: String,
    pub api_base: String,
}

impl BotConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from any key lookup, so tests don't touch the process environment.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let value = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let port = match value("PORT").or_else(|| value("API_PORT")) {
            Some(raw) => raw
                .trim()
                .parse()
                .map_err(|_| BotError::Config(format!("invalid port '{}'", raw)))?,
            None => DEFAULT_PORT,
        };

        let verify_token = value("VERIFY_TOKEN")
            .ok_or_else(|| BotError::Config("VERIFY_TOKEN is not set".to_string()))?;

        let whatsapp = match (value("WHATSAPP_TOKEN"), value("WHATSAPP_PHONE_NUMBER_ID")) {
            (Some(token), Some(phone_number_id)) => Some(WhatsAppConfig {
                token,
                phone_number_id,
                api_base: value("WHATSAPP_API_BASE")
                    .unwrap_or_else(|| DEFAULT_API_BASE.to_string())
                    .trim_end_matches('/')
                    .to_string(),
            }),
            (None, None) => None,
            _ => {
                return Err(BotError::Config(
                    "WHATSAPP_TOKEN and WHATSAPP_PHONE_NUMBER_ID must be set together".to_string(),
                ))
            }
        };

        Ok(Self {
            port,
            verify_token,
            whatsapp,
        })
    }
}
