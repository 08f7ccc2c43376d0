use chrono::{DateTime, Local, Utc};
use teloxide::types::{
    Chat, ChatId, ChatMemberStatus, Message, MessageEntityKind, UpdateKind, User, UserId,
};

/// Short name of the kind of an update, for one-line logging.
#[must_use]
pub fn update_kind_label(kind: &UpdateKind) -> &'static str {
    match kind {
        UpdateKind::Message(_) => "message",
        UpdateKind::EditedMessage(_) => "edited_message",
        UpdateKind::ChannelPost(_) => "channel_post",
        UpdateKind::EditedChannelPost(_) => "edited_channel_post",
        UpdateKind::InlineQuery(_) => "inline_query",
        UpdateKind::ChosenInlineResult(_) => "chosen_inline_result",
        UpdateKind::CallbackQuery(_) => "callback_query",
        UpdateKind::Poll(_) => "poll",
        UpdateKind::PollAnswer(_) => "poll_answer",
        UpdateKind::MyChatMember(_) => "my_chat_member",
        UpdateKind::ChatMember(_) => "chat_member",
        UpdateKind::ChatJoinRequest(_) => "chat_join_request",
        UpdateKind::Error(_) => "unparsed",
        _ => "other",
    }
}

/// The chat type the way the Bot API names it.
#[must_use]
pub fn chat_kind_label(chat: &Chat) -> &'static str {
    if chat.is_private() {
        "private"
    } else if chat.is_group() {
        "group"
    } else if chat.is_supergroup() {
        "supergroup"
    } else if chat.is_channel() {
        "channel"
    } else {
        "unknown"
    }
}

/// Whether messages from this chat are group messages, and hence subject to
/// the bot's privacy mode.
#[must_use]
pub fn is_group_chat(chat: &Chat) -> bool {
    chat.is_group() || chat.is_supergroup()
}

/// Chat title, or the name of the other person for private chats.
#[must_use]
pub fn chat_title(chat: &Chat) -> String {
    if let Some(title) = chat.title() {
        return title.to_string();
    }

    match (chat.first_name(), chat.last_name()) {
        (Some(first), Some(last)) => format!("{first} {last}"),
        (Some(first), None) => first.to_string(),
        _ => String::from("N/A"),
    }
}

/// Full name of the user followed by `@username` if they have one.
#[must_use]
pub fn user_name_prettyprint(user: &User) -> String {
    match &user.username {
        Some(username) => format!("{} (@{username})", user.full_name()),
        None => user.full_name(),
    }
}

/// Text of the message, or a tag describing what kind of content it carries.
#[must_use]
pub fn content_summary(msg: &Message) -> String {
    if let Some(text) = msg.text() {
        return text.to_string();
    }

    let tag = if msg.photo().is_some() {
        "[photo]"
    } else if msg.video().is_some() {
        "[video]"
    } else if msg.audio().is_some() {
        "[audio]"
    } else if let Some(document) = msg.document() {
        return format!(
            "[document] {}",
            document.file_name.as_deref().unwrap_or("N/A")
        );
    } else if msg.sticker().is_some() {
        "[sticker]"
    } else if msg.voice().is_some() {
        "[voice]"
    } else {
        "[other]"
    };

    match msg.caption() {
        Some(caption) => format!("{tag} {caption}"),
        None => tag.to_string(),
    }
}

/// Whether the message has an `@username` mention of this exact user.
#[must_use]
pub fn mentions_user(msg: &Message, username: &str) -> bool {
    let wanted = format!("@{username}");
    msg.parse_entities()
        .unwrap_or_default()
        .iter()
        .any(|x| matches!(x.kind(), MessageEntityKind::Mention) && x.text().eq_ignore_ascii_case(&wanted))
}

/// Timestamp in the local timezone, for people reading logs.
#[must_use]
pub fn local_time(date: DateTime<Utc>) -> String {
    date.with_timezone(&Local)
        .format("%Y-%m-%d %H:%M:%S")
        .to_string()
}

/// What a change of the bot's own membership status means for receiving messages.
#[must_use]
pub fn membership_status_note(status: ChatMemberStatus) -> &'static str {
    match status {
        ChatMemberStatus::Owner | ChatMemberStatus::Administrator | ChatMemberStatus::Member => {
            "bot is a normal member and should see messages"
        }
        ChatMemberStatus::Restricted => "bot is restricted and may miss messages",
        ChatMemberStatus::Left => "bot left the chat",
        ChatMemberStatus::Banned => "bot was kicked from the chat",
    }
}

/// Decides which group messages a listener cares about.
///
/// Only group and supergroup messages ever pass. An empty user list means
/// every sender is fine.
#[derive(Debug, Clone, Default)]
pub struct GroupFilter {
    pub group: Option<ChatId>,
    pub users: Vec<UserId>,
}

impl GroupFilter {
    #[must_use]
    pub fn accepts(&self, chat: ChatId, group_chat: bool, sender: Option<UserId>) -> bool {
        if !group_chat {
            return false;
        }

        if self.group.is_some_and(|group| group != chat) {
            return false;
        }

        if self.users.is_empty() {
            return true;
        }

        sender.is_some_and(|sender| self.users.contains(&sender))
    }

    #[must_use]
    pub fn accepts_message(&self, msg: &Message) -> bool {
        self.accepts(
            msg.chat.id,
            is_group_chat(&msg.chat),
            msg.from.as_ref().map(|x| x.id),
        )
    }
}

/// Parses one user ID out of a comma separated list, tolerating spaces.
///
/// # Errors
/// Errors if it's not a number.
pub fn parse_user_id(value: &str) -> Result<UserId, String> {
    value
        .trim()
        .parse::<u64>()
        .map(UserId)
        .map_err(|e| format!("`{value}` is not a user ID: {e}"))
}
