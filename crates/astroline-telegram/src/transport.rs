//! Telegram sending: Markdown first with a plain-text fallback, and the
//! permanent-vs-transient classification the delivery core keys off.

use std::borrow::Cow;

use async_trait::async_trait;
use teloxide::prelude::*;
use teloxide::types::ParseMode;
use teloxide::{ApiError, RequestError};
use tracing::warn;

use astroline_delivery::{SendError, Transport};

/// Telegram's message limit is 4096 characters. We clip at 4090 for safety.
const TEXT_MAX: usize = 4090;

/// Sends delivery-core messages through a Telegram bot.
pub struct TelegramTransport {
    bot: Bot,
}

impl TelegramTransport {
    pub fn new(token: &str) -> Self {
        Self {
            bot: Bot::new(token),
        }
    }
}

#[async_trait]
impl Transport for TelegramTransport {
    async fn send(&self, recipient: i64, text: &str, markdown: bool) -> Result<(), SendError> {
        let chat = ChatId(recipient);
        let text = clip(text);

        if markdown {
            match self
                .bot
                .send_message(chat, text.as_ref())
                .parse_mode(ParseMode::Markdown)
                .await
            {
                Ok(_) => return Ok(()),
                Err(RequestError::Api(ApiError::CantParseEntities(reason))) => {
                    // Bad markup is our bug, not the recipient's — still
                    // deliver the content as plain text.
                    warn!(recipient, %reason, "markdown rejected — falling back to plain text");
                }
                Err(e) => return Err(classify(e)),
            }
        }

        self.bot
            .send_message(chat, text.as_ref())
            .await
            .map(|_| ())
            .map_err(classify)
    }
}

/// Map a teloxide failure onto the delivery core's taxonomy.
///
/// Permanent means this chat can never be reached again; only those
/// rejections may deactivate a subscriber.
fn classify(err: RequestError) -> SendError {
    match &err {
        RequestError::Api(api) => match api {
            ApiError::BotBlocked
            | ApiError::UserDeactivated
            | ApiError::BotKicked
            | ApiError::BotKickedFromSupergroup
            | ApiError::ChatNotFound
            | ApiError::CantInitiateConversation => SendError::PermanentReject(api.to_string()),
            _ => SendError::Transient(err.to_string()),
        },
        _ => SendError::Transient(err.to_string()),
    }
}

/// Clip to the Telegram limit on a char boundary.
fn clip(text: &str) -> Cow<'_, str> {
    if text.len() <= TEXT_MAX {
        return Cow::Borrowed(text);
    }
    let mut end = TEXT_MAX;
    while !text.is_char_boundary(end) {
        end -= 1;
    }
    Cow::Owned(text[..end].to_string())
}
