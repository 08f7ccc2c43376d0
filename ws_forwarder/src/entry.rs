use std::process::ExitCode;

use clap::Parser;
use teloxide::types::ChatId;
use tg_bot_commons::ConnectionArgs;
use url::Url;

use crate::{
    forwarder::Forwarder, sink::TelegramSink, stream::WsConnector, ForwardError, DEFAULT_CHAT_ID,
    DEFAULT_WS_URL,
};

/// Forward trading signals from a WebSocket event stream into a Telegram group.
#[derive(Parser, Debug)]
#[command(version, allow_negative_numbers = true)]
pub struct Cli {
    /// Chat to forward the events to.
    #[arg(long, env = "TARGET_GROUP_ID", default_value_t = DEFAULT_CHAT_ID)]
    pub chat_id: i64,

    /// WebSocket endpoint to read events from.
    #[arg(long, env = "WS_URL", default_value = DEFAULT_WS_URL, value_parser = parse_ws_url)]
    pub ws_url: Url,

    #[command(flatten)]
    pub connection: ConnectionArgs,
}

fn parse_ws_url(value: &str) -> Result<Url, String> {
    let url = Url::parse(value.trim()).map_err(|e| e.to_string())?;
    match url.scheme() {
        "ws" | "wss" => Ok(url),
        other => Err(format!("expected a ws:// or wss:// URL, got {other}://")),
    }
}

/// Parse the command line, then forward events until Ctrl+C or until the
/// stream can't be reached anymore.
pub async fn entry() -> ExitCode {
    let cli = Cli::parse();
    log::info!("ASYNC WOOOO");

    let bot = match cli.connection.build_bot() {
        Ok(bot) => bot,
        Err(e) => {
            log::error!("{e}");
            return ExitCode::FAILURE;
        }
    };

    let chat_id = ChatId(cli.chat_id);
    log::info!("Forwarding from {} to chat {chat_id}", cli.ws_url);

    let mut forwarder = Forwarder::new(WsConnector::new(cli.ws_url), TelegramSink::new(bot, chat_id));

    let shutdown = async {
        match tokio::signal::ctrl_c().await {
            Ok(()) => log::info!("Got Ctrl+C, shutting down..."),
            Err(e) => {
                log::error!("Can't listen for Ctrl+C: {e}");
                // Without a way to be told to stop, run until the stream gives up.
                std::future::pending::<()>().await;
            }
        }
    };

    let result = forwarder.run(shutdown).await;

    log::info!("it appears we have been bonked.");

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e @ ForwardError::ReconnectExhausted { .. }) => {
            log::error!("{e}");
            ExitCode::FAILURE
        }
        Err(e) => {
            log::error!("Forwarder stopped: {e}");
            ExitCode::FAILURE
        }
    }
}
