//! Outbound messages to pet owners through the messaging platform.

use tracing::info;

/// Fire-and-forget delivery of a short message to a pet owner.
///
/// Implementations must not block the caller; failures are only logged.
pub trait NotificationSink: Send + Sync {
    fn notify(&self, user_id: &str, message: &str);
}

/// Sink that only writes notifications to the log.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogNotificationSink;

impl NotificationSink for LogNotificationSink {
    fn notify(&self, user_id: &str, message: &str) {
        info!(user_id, message, "pet notification");
    }
}

#[cfg(feature = "telegram-notify")]
pub use self::telegram::TelegramNotificationSink;

#[cfg(feature = "telegram-notify")]
mod telegram {
    use std::sync::Arc;

    use reqwest::Client;
    use serde::Serialize;
    use tracing::{debug, warn};

    use super::NotificationSink;

    const API_BASE: &str = "https://api.telegram.org";

    #[derive(Serialize)]
    struct SendMessage<'a> {
        chat_id: &'a str,
        text: &'a str,
    }

    /// Sends notifications through the Telegram Bot API. User ids are the
    /// Telegram chat ids the pets were created with.
    #[derive(Clone)]
    pub struct TelegramNotificationSink {
        client: Client,
        endpoint: Arc<str>,
    }

    impl TelegramNotificationSink {
        /// Sink posting through the bot identified by `bot_token`.
        pub fn new(bot_token: &str) -> reqwest::Result<Self> {
            Ok(Self {
                client: Client::builder().build()?,
                endpoint: Arc::from(format!("{API_BASE}/bot{bot_token}/sendMessage")),
            })
        }

        /// Build the sink from `TELEGRAM_BOT_TOKEN`, if set.
        pub fn from_env() -> Option<Self> {
            let token = std::env::var("TELEGRAM_BOT_TOKEN").ok()?;
            match Self::new(&token) {
                Ok(sink) => Some(sink),
                Err(err) => {
                    warn!(error = %err, "failed to build Telegram client; notifications go to the log");
                    None
                }
            }
        }
    }

    impl NotificationSink for TelegramNotificationSink {
        fn notify(&self, user_id: &str, message: &str) {
            let sink = self.clone();
            let user_id = user_id.to_owned();
            let message = message.to_owned();
            tokio::spawn(async move {
                let body = SendMessage {
                    chat_id: &user_id,
                    text: &message,
                };
                match sink.client.post(sink.endpoint.as_ref()).json(&body).send().await {
                    Ok(response) if response.status().is_success() => {
                        debug!(user_id, "telegram notification delivered");
                    }
                    Ok(response) => {
                        warn!(user_id, status = %response.status(), "telegram rejected notification");
                    }
                    Err(err) => warn!(user_id, error = %err, "failed to send telegram notification"),
                }
            });
        }
    }
}
