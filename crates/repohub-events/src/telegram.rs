//! Telegram notifications
//!
//! Fire-and-forget text summaries sent by the background consumer when a bot
//! token and chat id are configured. Delivery failures are logged only.

use std::time::Duration;

use tracing::{debug, warn};

const TELEGRAM_API_BASE: &str = "https://api.telegram.org";

pub struct TelegramNotifier {
    client: reqwest::Client,
    token: String,
    chat_id: String,
}

impl TelegramNotifier {
    pub fn new(token: impl Into<String>, chat_id: impl Into<String>) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(5))
            .build()
            .unwrap_or_default();
        Self { client, token: token.into(), chat_id: chat_id.into() }
    }

    /// Sends a text message to the configured chat. Never returns an error;
    /// notification delivery is best-effort.
    pub async fn send(&self, text: &str) {
        let url = format!("{}/bot{}/sendMessage", TELEGRAM_API_BASE, self.token);
        let params = [("chat_id", self.chat_id.as_str()), ("text", text)];

        match self.client.post(&url).form(&params).send().await {
            Ok(response) if response.status().is_success() => {
                debug!("Telegram notification sent");
            }
            Ok(response) => {
                warn!(status = %response.status(), "Telegram notification rejected");
            }
            Err(e) => {
                warn!(error = %e, "Telegram notification failed");
            }
        }
    }
}
