use std::{
    process::ExitCode,
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc,
    },
};

use clap::Parser;
use teloxide::{dptree::deps, prelude::*, RequestError};

use tg_bot_commons::{describe::*, *};

/// Prints the ID of every chat the bot gets a message from, ready to be
/// pasted into a `.env` file. Add the bot to a group and say something there.
#[derive(Parser, Debug)]
#[command(version)]
struct Cli {
    #[command(flatten)]
    connection: ConnectionArgs,
}

async fn print_chat_id(msg: Message, counter: Arc<AtomicUsize>) -> Result<(), RequestError> {
    let number = counter.fetch_add(1, Ordering::Relaxed) + 1;
    let chat = &msg.chat;

    println!("{}", "=".repeat(60));
    println!("Message #{number}");
    println!("{}", "=".repeat(60));
    println!("Chat type:  {}", chat_kind_label(chat));
    println!("Chat ID:    {}", chat.id);
    println!("Chat title: {}", chat_title(chat));

    if is_group_chat(chat) {
        println!("\nGroup ID: {}, put this into your .env:", chat.id);
        println!("    TEST_GROUP_ID={}", chat.id);
    } else if chat.is_private() {
        println!("\nUser ID: {}, put this into your .env:", chat.id);
        println!("    TEST_USER_ID={}", chat.id);
    }
    println!();

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

    let counter = Arc::new(AtomicUsize::new(0));

    let handler = Update::filter_message().endpoint(print_chat_id);

    log::info!("Waiting for messages. Make sure the bot is in the group, then send something there.");
    log::info!("Press Ctrl+C to stop.");

    Dispatcher::builder(bot, handler)
        .default_handler(|_| async {})
        .dependencies(deps![counter])
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
