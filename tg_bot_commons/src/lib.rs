//! This crate houses the stuff every one of the Telegram debugging tools
//! needs, because setting up logging, a runtime and a bot that talks
//! through the right proxy is the same boilerplate every single time.

use std::future::Future;

/// Command line and environment configuration shared by the tools.
pub mod config;
pub use config::{resolve_send_target, ConnectionArgs, ProxySetting};

/// Human readable descriptions of chats, users and messages.
pub mod describe;

mod error;
pub use error::ConfigError;

pub mod useful_methods;

/// Initialize logging and run the `closure` in an async runtime, returning
/// whatever it returns. Logging is enabled by default on level `info` unless
/// overridden by environment variable `RUST_LOG`.
///
/// See [`start_everything_with_default_log`] for the details.
pub fn start_everything<T>(closure: impl Future<Output = T>) -> T {
    start_everything_with_default_log("info", closure)
}

/// Load `.env`, initialize logging and start the `closure` in an async runtime.
/// `default_filter` is used unless the environment variable `RUST_LOG` is set,
/// either for real or in the `.env` file. This uses the crate
/// [pretty_env_logger][] internally, see its documentation for more details.
///
/// [pretty_env_logger]: https://docs.rs/pretty_env_logger
///
/// # Panics
///
/// Panics if the tokio runtime can't be built.
pub fn start_everything_with_default_log<T>(
    default_filter: &str,
    closure: impl Future<Output = T>,
) -> T {
    // A missing .env is perfectly normal.
    let dotenv_result = dotenvy::dotenv();

    let log_level = std::env::var_os("RUST_LOG")
        .and_then(|x| x.into_string().ok())
        .unwrap_or_else(|| default_filter.to_string());

    let running_as_systemd_service = std::env::var_os("JOURNAL_STREAM").is_some();

    let mut builder = match running_as_systemd_service {
        true => pretty_env_logger::formatted_builder(),
        false => pretty_env_logger::formatted_timed_builder(),
    };

    builder.parse_filters(&log_level);

    if builder.try_init().is_err() {
        log::error!("Tried to init logger twice!");
    }

    match dotenv_result {
        Ok(path) => log::debug!("Loaded environment from {}", path.display()),
        Err(e) if e.not_found() => (),
        Err(e) => log::warn!("Could not load .env file: {e}"),
    }

    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .expect("Failed to build the tokio runtime!")
        .block_on(closure)
}
