use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;
use tracing::debug;

use crate::alerts::Notifier;
use crate::config::NOTIFY_TIMEOUT_SECS;
use crate::error::{AppError, Result};

/// Delivers alerts through the Telegram Bot API (`sendMessage`).
pub struct TelegramNotifier {
    client: reqwest::Client,
    endpoint: String,
    chat_id: String,
}

#[derive(Serialize)]
struct SendMessage<'a> {
    chat_id: &'a str,
    text: &'a str,
    disable_web_page_preview: bool,
}

impl TelegramNotifier {
    pub fn new(api_url: &str, bot_token: &str, chat_id: &str) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(NOTIFY_TIMEOUT_SECS))
            .build()?;
        Ok(Self {
            client,
            endpoint: send_message_url(api_url, bot_token),
            chat_id: chat_id.to_string(),
        })
    }
}

fn send_message_url(api_url: &str, bot_token: &str) -> String {
    format!("{}/bot{}/sendMessage", api_url.trim_end_matches('/'), bot_token)
}

#[async_trait]
impl Notifier for TelegramNotifier {
    async fn send(&self, message: &str) -> Result<()> {
        let body = SendMessage {
            chat_id: &self.chat_id,
            text: message,
            disable_web_page_preview: true,
        };

        let resp = self.client.post(&self.endpoint).json(&body).send().await?;
        let status = resp.status();
        if !status.is_success() {
            // Telegram explains rejections in the body ("chat not found", ...).
            let detail = resp.text().await.unwrap_or_default();
            return Err(AppError::Notify(format!("Telegram returned {status}: {detail}")));
        }

        debug!(chat_id = %self.chat_id, "Telegram message delivered");
        Ok(())
    }
}
