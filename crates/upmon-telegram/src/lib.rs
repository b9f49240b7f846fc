//! Telegram adapter (teloxide).
//!
//! `TelegramNotifier` implements the `upmon-core` NotificationSink over the
//! Bot API; `router` runs the command/button surface.

use async_trait::async_trait;
use teloxide::prelude::*;
use tokio::time::sleep;

pub mod handlers;
pub mod router;

use upmon_core::{
    domain::Destination, errors::Error, messaging::port::NotificationSink, Result,
};

/// Sends plain-text messages to one chat with one bot credential.
#[derive(Clone)]
pub struct TelegramNotifier {
    bot: Bot,
    chat_id: teloxide::types::ChatId,
}

impl TelegramNotifier {
    pub fn new(bot: Bot, chat_id: upmon_core::domain::ChatId) -> Self {
        Self {
            bot,
            chat_id: teloxide::types::ChatId(chat_id.0),
        }
    }

    /// Separate bot for the destination's own credential.
    pub fn for_destination(dest: &Destination) -> Self {
        Self::new(Bot::new(dest.credential.expose()), dest.chat_id)
    }

    pub fn bot(&self) -> Bot {
        self.bot.clone()
    }

    fn map_err(e: teloxide::RequestError) -> Error {
        Error::Notification(format!("telegram error: {e}"))
    }

    async fn with_retry<T, Fut>(&self, mut op: impl FnMut() -> Fut) -> Result<T>
    where
        Fut: std::future::IntoFuture<Output = std::result::Result<T, teloxide::RequestError>>,
        Fut::IntoFuture: Send,
    {
        const MAX_RETRIES: usize = 1;
        let mut attempts = 0usize;
        loop {
            match op().await {
                Ok(v) => return Ok(v),
                Err(e) => match e {
                    teloxide::RequestError::RetryAfter(d) if attempts < MAX_RETRIES => {
                        attempts += 1;
                        sleep(d).await;
                        continue;
                    }
                    other => return Err(Self::map_err(other)),
                },
            }
        }
    }
}

#[async_trait]
impl NotificationSink for TelegramNotifier {
    async fn send(&self, text: &str) -> Result<()> {
        self.with_retry(|| self.bot.send_message(self.chat_id, text.to_string()))
            .await?;
        Ok(())
    }
}
