use std::{process::ExitCode, sync::LazyLock};

use clap::Parser;
use regex::Regex;
use teloxide::{
    prelude::*,
    types::{ChatMemberUpdated, Me},
    ApiError, RequestError,
};

use tg_bot_commons::{describe::*, *};

/// Diagnostic bot: logs everything it receives and answers every message,
/// so you can see whether updates (especially group ones) reach the bot at all.
#[derive(Parser, Debug)]
#[command(version)]
struct Cli {
    #[command(flatten)]
    connection: ConnectionArgs,
}

static ECHO_COMMAND: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^/echo(?:@\w+)?\s+(.+)$").expect("Regex will always be valid")
});

const ACKNOWLEDGEMENT: &str = "✅ Got your message!";

fn log_update(update: &Update) {
    let chat = update
        .chat()
        .map(|x| format!(", {} chat {}", chat_kind_label(x), x.id))
        .unwrap_or_default();
    log::debug!(
        "Update {}: {}{chat}",
        update.id.0,
        update_kind_label(&update.kind)
    );
}

/// What the bot answers to a message: the echo for `/echo <text>`, then
/// the acknowledgement, which every message gets.
fn replies_for(text: Option<&str>) -> Vec<String> {
    let mut replies = Vec::new();
    if let Some(captures) = text.and_then(|x| ECHO_COMMAND.captures(x.trim())) {
        replies.push(captures[1].to_string());
    }
    replies.push(ACKNOWLEDGEMENT.to_string());
    replies
}

async fn send_reply(bot: &Bot, chat_id: ChatId, text: String) {
    if let Err(e) = bot.send_message(chat_id, text).await {
        log::error!("Failed to reply in chat {chat_id}: {e}");
        if matches!(
            e,
            RequestError::Api(ApiError::BotBlocked | ApiError::ChatNotFound)
        ) {
            log::error!("The bot is probably blocked or muted there, or has no rights to post.");
        }
    }
}

fn log_membership_changes(msg: &Message) {
    if let Some(users) = msg.new_chat_members() {
        for user in users {
            log::info!(
                "New member in {} ({}): {} (user id {})",
                chat_title(&msg.chat),
                msg.chat.id,
                user_name_prettyprint(user),
                user.id
            );
        }
    }
    if let Some(user) = msg.left_chat_member() {
        log::info!(
            "Member left {} ({}): {} (user id {})",
            chat_title(&msg.chat),
            msg.chat.id,
            user_name_prettyprint(user),
            user.id
        );
    }
}

async fn handle_message(bot: Bot, me: Me, msg: Message) -> Result<(), RequestError> {
    let sender = msg
        .from
        .as_ref()
        .map(user_name_prettyprint)
        .unwrap_or_else(|| String::from("N/A"));
    let sender_id = msg
        .from
        .as_ref()
        .map(|x| x.id.to_string())
        .unwrap_or_else(|| String::from("N/A"));

    log::info!(
        "Message from {sender} (user id {sender_id}) in {} chat {} ({})",
        chat_kind_label(&msg.chat),
        chat_title(&msg.chat),
        msg.chat.id,
    );
    log::info!("  Content: {}", content_summary(&msg));
    log::info!("  Mentions the bot: {}", mentions_user(&msg, me.username()));
    log::info!("  Sent at: {}", local_time(msg.date));
    log_membership_changes(&msg);
    if is_group_chat(&msg.chat) {
        log::info!("  With privacy mode on, only commands and mentions of the bot arrive from groups.");
    }

    for reply in replies_for(msg.text()) {
        send_reply(&bot, msg.chat.id, reply).await;
    }

    respond(())
}

async fn handle_my_chat_member(update: ChatMemberUpdated) -> Result<(), RequestError> {
    let status = update.new_chat_member.status();
    log::info!(
        "Bot status changed in {} ({}): {:?}, {}",
        chat_title(&update.chat),
        update.chat.id,
        status,
        membership_status_note(status),
    );
    respond(())
}

async fn run() -> ExitCode {
    let cli = Cli::parse();

    let bot = match cli.connection.build_bot() {
        Ok(bot) => bot,
        Err(e) => {
            log::error!("{e}");
            return ExitCode::FAILURE;
        }
    };

    // Polling doesn't work while a webhook is set.
    match bot.delete_webhook().await {
        Ok(_) => log::info!("Webhook cleared."),
        Err(e) => log::warn!("Could not clear the webhook: {e}"),
    }

    match bot.get_me().await {
        Ok(me) => {
            log::info!("Running as @{} ({})", me.username(), me.first_name);
            log::info!(
                "Not getting group messages? Send /setprivacy to @BotFather, pick @{} and choose Disable.",
                me.username()
            );
        }
        Err(e) => {
            log::error!("Could not fetch bot info, is the token right? {e}");
            return ExitCode::FAILURE;
        }
    }

    let handler = dptree::entry()
        // Lets everything through, this only logs.
        .filter(|update: Update| {
            log_update(&update);
            true
        })
        .branch(Update::filter_message().endpoint(handle_message))
        .branch(Update::filter_my_chat_member().endpoint(handle_my_chat_member));

    log::info!("Listening for updates, send the bot something.");

    Dispatcher::builder(bot, handler)
        .default_handler(|_| async {})
        .enable_ctrlc_handler()
        .build()
        .dispatch()
        .await;

    log::info!("it appears we have been bonked.");
    ExitCode::SUCCESS
}

fn main() -> ExitCode {
    start_everything_with_default_log("info,echo_bot=debug", run())
}
