use futures::Future;
use teloxide::{
    types::{ChatId, MessageId, ParseMode},
    Bot,
};
use tg_bot_commons::useful_methods::BotSendChunked;

use crate::ForwardError;

/// What Telegram gave back for a delivered message. Long texts get split,
/// so there may be several.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SentMessage {
    pub message_ids: Vec<MessageId>,
}

/// The destination formatted messages get delivered to.
pub trait Sink: Send + Sync {
    fn send(&self, text: &str) -> impl Future<Output = Result<SentMessage, ForwardError>> + Send;

    /// Where it delivers to, for logging.
    fn destination(&self) -> ChatId;
}

/// Delivers into one Telegram chat.
pub struct TelegramSink {
    bot: Bot,
    chat_id: ChatId,
}

impl TelegramSink {
    #[must_use]
    pub fn new(bot: Bot, chat_id: ChatId) -> Self {
        Self { bot, chat_id }
    }
}

impl Sink for TelegramSink {
    async fn send(&self, text: &str) -> Result<SentMessage, ForwardError> {
        // The messages are written for the legacy flavor.
        #[allow(deprecated)]
        let parse_mode = ParseMode::Markdown;

        let sent = self
            .bot
            .send_chunked(self.chat_id, text, Some(parse_mode))
            .await
            .map_err(|e| ForwardError::Delivery(e.to_string()))?;

        Ok(SentMessage {
            message_ids: sent.iter().map(|x| x.id).collect(),
        })
    }

    fn destination(&self) -> ChatId {
        self.chat_id
    }
}
