use std::env;

use anyhow::{Result, anyhow};
use serde_json::json;
use tracing::info;

use crate::config::parse_bool;
use crate::error::NotifyError;
use crate::http_client::http_client;

const TELEGRAM_API: &str = "https://api.telegram.org";

/// Text sink for one channel.
pub trait Notifier {
    fn send(&self, text: &str) -> Result<(), NotifyError>;
}

#[derive(Debug, Clone)]
pub enum NotifierConfig {
    Telegram { bot_token: String, chat_id: String },
    DryRun,
}

impl NotifierConfig {
    pub fn from_env() -> Result<Self> {
        if env::var("NOTIFY_DRY_RUN").is_ok_and(|v| parse_bool(&v)) {
            return Ok(NotifierConfig::DryRun);
        }
        let var = |key: &str| {
            env::var(key)
                .ok()
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
        };
        let bot_token = var("TELEGRAM_BOT_TOKEN")
            .ok_or_else(|| anyhow!("TELEGRAM_BOT_TOKEN is required (or set NOTIFY_DRY_RUN=1)"))?;
        let chat_id = var("TELEGRAM_CHANNEL_ID")
            .ok_or_else(|| anyhow!("TELEGRAM_CHANNEL_ID is required (or set NOTIFY_DRY_RUN=1)"))?;
        Ok(NotifierConfig::Telegram { bot_token, chat_id })
    }

    pub fn build(self) -> Box<dyn Notifier> {
        match self {
            NotifierConfig::Telegram { bot_token, chat_id } => {
                Box::new(TelegramNotifier::new(bot_token, chat_id))
            }
            NotifierConfig::DryRun => Box::new(LogNotifier),
        }
    }
}

/// Telegram Bot API `sendMessage`.
#[derive(Debug, Clone)]
pub struct TelegramNotifier {
    bot_token: String,
    chat_id: String,
}

impl TelegramNotifier {
    pub fn new(bot_token: String, chat_id: String) -> Self {
        Self { bot_token, chat_id }
    }
}

impl Notifier for TelegramNotifier {
    fn send(&self, text: &str) -> Result<(), NotifyError> {
        let url = format!("{TELEGRAM_API}/bot{}/sendMessage", self.bot_token);
        let resp = http_client()?
            .post(url)
            .json(&json!({ "chat_id": self.chat_id, "text": text }))
            .send()?;
        let status = resp.status();
        if !status.is_success() {
            return Err(NotifyError::Rejected {
                status: status.as_u16(),
                body: resp.text().unwrap_or_default(),
            });
        }
        info!("message sent");
        Ok(())
    }
}

/// Logs messages instead of sending them.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn send(&self, text: &str) -> Result<(), NotifyError> {
        info!(target: "matchday::dry_run", "{text}");
        Ok(())
    }
}
