mod split_msg;
pub use split_msg::*;

use futures::Future;
use teloxide::{
    payloads::SendMessageSetters,
    requests::Requester,
    types::{Message, ParseMode, Recipient},
    Bot, RequestError,
};

pub trait BotSendChunked {
    /// Send a message, split into as many messages as Telegram's length
    /// limit needs. Each chunk is sent exactly once; the first failure
    /// stops the whole thing and is returned.
    fn send_chunked(
        &self,
        to_where: impl Into<Recipient> + Send,
        text: &str,
        parse_mode: Option<ParseMode>,
    ) -> impl Future<Output = Result<Vec<Message>, RequestError>> + Send;
}

impl BotSendChunked for Bot {
    async fn send_chunked(
        &self,
        to_where: impl Into<Recipient> + Send,
        text: &str,
        parse_mode: Option<ParseMode>,
    ) -> Result<Vec<Message>, RequestError> {
        let to_where: Recipient = to_where.into();
        let mut sent_messages = Vec::new();

        for chunk in split_for_telegram(text, TELEGRAM_MAX_MESSAGE_LEN) {
            let mut request = self.send_message(to_where.clone(), chunk);
            if let Some(parse_mode) = parse_mode {
                request = request.parse_mode(parse_mode);
            }
            sent_messages.push(request.await?);
        }

        Ok(sent_messages)
    }
}
