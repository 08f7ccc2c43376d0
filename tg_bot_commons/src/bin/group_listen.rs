use std::{process::ExitCode, sync::Arc};

use clap::Parser;
use teloxide::{dptree::deps, prelude::*, RequestError};

use tg_bot_commons::{describe::*, *};

/// Prints group messages the bot can see, optionally only from one group
/// and a set of users. Remember that with privacy mode on, the bot only sees
/// commands and mentions.
#[derive(Parser, Debug)]
#[command(version)]
struct Cli {
    /// Only show messages from this group.
    #[arg(long, env = "TARGET_GROUP_ID", allow_negative_numbers = true)]
    group_id: Option<i64>,

    /// Only show messages from these users, comma separated.
    #[arg(long, env = "TARGET_USER_IDS", value_delimiter = ',', value_parser = parse_user_id)]
    user_ids: Vec<UserId>,

    #[command(flatten)]
    connection: ConnectionArgs,
}

async fn print_group_message(msg: Message, filter: Arc<GroupFilter>) -> Result<(), RequestError> {
    if !filter.accepts_message(&msg) {
        return respond(());
    }

    let (sender, sender_id) = match &msg.from {
        Some(user) => (user.full_name(), user.id.to_string()),
        None => (String::from("N/A"), String::from("N/A")),
    };
    let username = msg
        .from
        .as_ref()
        .and_then(|x| x.username.as_deref())
        .map(|x| format!("@{x}"))
        .unwrap_or_else(|| String::from("N/A"));

    println!("Message");
    println!("{}", "-".repeat(60));
    println!("Group:    {} (ID: {})", chat_title(&msg.chat), msg.chat.id);
    println!("User:     {sender} (ID: {sender_id})");
    println!("Username: {username}");
    println!("Content:  {}", content_summary(&msg));
    println!("Time:     {}", local_time(msg.date));
    println!("{}\n", "=".repeat(60));

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

    let filter = Arc::new(GroupFilter {
        group: cli.group_id.map(ChatId),
        users: cli.user_ids,
    });

    match filter.group {
        Some(group) => log::info!("Listening to group {group}"),
        None => log::info!("Listening to all groups"),
    }
    if filter.users.is_empty() {
        log::info!("Listening to all users");
    } else {
        let users = filter
            .users
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(", ");
        log::info!("Listening to users {users}");
    }

    let handler = Update::filter_message().endpoint(print_group_message);

    log::info!("Press Ctrl+C to stop.");

    Dispatcher::builder(bot, handler)
        .default_handler(|_| async {})
        .dependencies(deps![filter])
        .enable_ctrlc_handler()
        .build()
        .dispatch()
        .await;

    log::info!("it appears we have been bonked.");
    ExitCode::SUCCESS
}

fn main() -> ExitCode {
    start_everything(run())
}
