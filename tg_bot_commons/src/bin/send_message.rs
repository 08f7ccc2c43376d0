use std::process::ExitCode;

use clap::Parser;

use tg_bot_commons::{
    config::env_var, describe::local_time, useful_methods::BotSendChunked, *,
};

/// Sends one message and exits.
///
/// Examples:
///   send_message --chat-id -5279508223 "Hello, this is a test"
///   send_message -5279508223 "Hello, this is a test"
///   send_message "Hello, this is a test"   (with TARGET_GROUP_ID set)
///   send_message -- "-5 degrees outside"     (text starting with a dash)
#[derive(Parser, Debug)]
#[command(version, allow_negative_numbers = true)]
struct Cli {
    /// Chat to send to. Falls back to TARGET_GROUP_ID, then TARGET_CHAT_ID,
    /// then the first argument if it's a number.
    #[arg(long)]
    chat_id: Option<i64>,

    /// The message text. Multiple arguments get joined with spaces.
    /// Flags may go anywhere on the line.
    words: Vec<String>,

    #[command(flatten)]
    connection: ConnectionArgs,
}

async fn run() -> ExitCode {
    let cli = Cli::parse();

    let (chat_id, text) = match resolve_send_target(cli.chat_id, env_var, cli.words) {
        Ok(target) => target,
        Err(e) => {
            log::error!("{e}");
            log::error!("Usage: send_message [--chat-id <ID>] [ID] <text>...");
            return ExitCode::FAILURE;
        }
    };

    let bot = match cli.connection.build_bot() {
        Ok(bot) => bot,
        Err(e) => {
            log::error!("{e}");
            return ExitCode::FAILURE;
        }
    };

    log::info!("Sending to chat {chat_id}: {text}");

    match bot.send_chunked(chat_id, &text, None).await {
        Ok(sent) => {
            for message in sent {
                println!(
                    "Sent message {} at {}",
                    message.id.0,
                    local_time(message.date)
                );
            }
            ExitCode::SUCCESS
        }
        Err(e) => {
            log::error!("Failed to send the message: {e}");
            ExitCode::FAILURE
        }
    }
}

fn main() -> ExitCode {
    start_everything(run())
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;

    #[test]
    fn flags_after_the_text() {
        let cli = Cli::try_parse_from(["send_message", "hello", "--chat-id", "-100"]).unwrap();
        assert_eq!(cli.chat_id, Some(-100));
        assert_eq!(cli.words, vec!["hello"]);

        let cli = Cli::try_parse_from(["send_message", "-100", "hello", "-n"]).unwrap();
        assert!(cli.connection.no_proxy);
        assert_eq!(cli.words, vec!["-100", "hello"]);
    }

    #[test]
    fn flag_wins_over_positional_chat_id() {
        let cli =
            Cli::try_parse_from(["send_message", "42", "apples", "--chat-id", "-7"]).unwrap();
        let (chat_id, text) = resolve_send_target(cli.chat_id, |_| None, cli.words).unwrap();
        assert_eq!(chat_id, teloxide::types::ChatId(-7));
        assert_eq!(text, "42 apples");
    }

    #[test]
    fn double_dash_keeps_dashes_in_text() {
        let cli = Cli::try_parse_from(["send_message", "--chat-id", "5", "--", "-n", "is", "text"])
            .unwrap();
        assert!(!cli.connection.no_proxy);
        assert_eq!(cli.words, vec!["-n", "is", "text"]);
    }
}
