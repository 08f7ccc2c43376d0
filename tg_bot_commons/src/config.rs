use std::{fs, io, path::Path};

use clap::Args;
use teloxide::{types::ChatId, Bot};
use thiserror::Error;

use crate::ConfigError;

/// Environment variables that may hold the bot token, in order of priority.
pub const TOKEN_ENV_VARS: &[&str] = &[
    "TEST_TELEGRAM_TOKEN",
    "TELEGRAM_BOT_TOKEN",
    "TEST_TELEGRAM_BOT_TOKEN",
    "TELEGRAM_TOKEN",
];

/// Environment variables that may hold a proxy for the Telegram API, in order of priority.
pub const PROXY_ENV_VARS: &[&str] = &[
    "PROXY_URL",
    "HTTPS_PROXY",
    "https_proxy",
    "HTTP_PROXY",
    "http_proxy",
];

/// Reads an environment variable, treating blank values as unset.
pub fn env_var(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|x| !x.trim().is_empty())
}

/// Key file the token is read from when nothing else provides one.
pub fn default_key_file() -> &'static str {
    match cfg!(debug_assertions) {
        true => "key_debug",
        false => "key",
    }
}

/// How to reach the Telegram Bot API.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProxySetting {
    Direct,
    Proxy(String),
}

/// Arguments every tool takes to connect to Telegram.
#[derive(Args, Debug, Clone, Default)]
pub struct ConnectionArgs {
    /// Bot token. If omitted, it's taken from the environment or the key file.
    #[arg(long)]
    pub token: Option<String>,

    /// Talk to Telegram directly and ignore any proxy settings.
    /// Same as setting NO_PROXY=1.
    #[arg(short = 'n', long)]
    pub no_proxy: bool,

    /// Proxy for Telegram API requests, like `http://127.0.0.1:7890` or `socks5://host:port`.
    #[arg(long)]
    pub proxy: Option<String>,
}

impl ConnectionArgs {
    /// Find the bot token: `--token`, then [`TOKEN_ENV_VARS`], then `key_file`.
    ///
    /// # Errors
    ///
    /// Errors if there's no token anywhere, or if the key file exists but can't be read.
    pub fn resolve_token(
        &self,
        env: impl Fn(&str) -> Option<String>,
        key_file: &Path,
    ) -> Result<String, ConfigError> {
        let explicit = self
            .token
            .as_deref()
            .map(str::trim)
            .filter(|x| !x.is_empty());
        if let Some(token) = explicit {
            return Ok(token.to_string());
        }

        for name in TOKEN_ENV_VARS {
            if let Some(token) = env(name) {
                log::debug!("Using bot token from {name}");
                return Ok(token.trim().to_string());
            }
        }

        let missing = || ConfigError::MissingToken {
            key_file: key_file.display().to_string(),
        };

        match fs::read_to_string(key_file) {
            Ok(token) if !token.trim().is_empty() => Ok(token.trim().to_string()),
            Ok(_) => Err(missing()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Err(missing()),
            Err(source) => Err(ConfigError::KeyFile {
                path: key_file.display().to_string(),
                source,
            }),
        }
    }

    /// Decide whether and which proxy to use.
    ///
    /// `--no-proxy` or `NO_PROXY=1` always means a direct connection.
    /// Otherwise `--proxy` and then [`PROXY_ENV_VARS`] are tried in order,
    /// skipping values that [`normalize_proxy`] rejects.
    pub fn proxy_setting(&self, env: impl Fn(&str) -> Option<String>) -> ProxySetting {
        if self.no_proxy || env("NO_PROXY").is_some_and(|x| x.trim() == "1") {
            return ProxySetting::Direct;
        }

        let candidates = self
            .proxy
            .iter()
            .map(|x| ("--proxy", x.clone()))
            .chain(
                PROXY_ENV_VARS
                    .iter()
                    .filter_map(|name| env(name).map(|value| (*name, value))),
            );

        for (source, value) in candidates {
            match normalize_proxy(&value) {
                Some(proxy) => {
                    if proxy != value.trim() {
                        log::info!("Fixed up proxy setting {source}={value} -> {proxy}");
                    }
                    return ProxySetting::Proxy(proxy);
                }
                None => log::warn!("Ignoring proxy setting {source}={value}, it's not a proxy"),
            }
        }

        ProxySetting::Direct
    }

    /// Create a bot out of these arguments and the process environment.
    ///
    /// # Errors
    ///
    /// Errors if there's no token or the proxy is unusable.
    pub fn build_bot(&self) -> Result<Bot, ConfigError> {
        let token = self.resolve_token(env_var, Path::new(default_key_file()))?;

        let client = teloxide::net::default_reqwest_settings();
        let client = match self.proxy_setting(env_var) {
            ProxySetting::Direct => {
                log::info!("Not using a proxy, connecting to Telegram directly");
                client.no_proxy()
            }
            ProxySetting::Proxy(url) => {
                log::info!("Connecting to Telegram through proxy {url}");
                match reqwest::Proxy::all(&url) {
                    Ok(proxy) => client.proxy(proxy),
                    Err(source) => return Err(ConfigError::BadProxy { url, source }),
                }
            }
        };

        let client = client.build().map_err(ConfigError::HttpClient)?;

        Ok(Bot::with_client(token, client))
    }
}

/// Clean up a proxy setting the way people tend to get it wrong.
///
/// Returns `None` for blank values and for bare port numbers like `7890`,
/// which are not usable. Adds `http://` if there's no scheme.
pub fn normalize_proxy(value: &str) -> Option<String> {
    let value = value.trim();
    if value.is_empty() || value.bytes().all(|x| x.is_ascii_digit()) {
        return None;
    }

    if value.contains("://") {
        Some(value.to_string())
    } else {
        Some(format!("http://{value}"))
    }
}

#[derive(Error, Debug, PartialEq, Eq)]
pub enum SendTargetError {
    #[error("no target chat: pass --chat-id, set TARGET_GROUP_ID or TARGET_CHAT_ID, or give the ID as the first argument")]
    MissingChatId,
    #[error("no message text given")]
    EmptyMessage,
}

/// Work out where a one-shot message goes and what it says.
///
/// The chat comes from `chat_id`, then `TARGET_GROUP_ID`, then `TARGET_CHAT_ID`,
/// then the first word if it's an integer. All remaining words form the text.
///
/// # Errors
///
/// Errors if there's no chat ID or the text is blank.
pub fn resolve_send_target(
    chat_id: Option<i64>,
    env: impl Fn(&str) -> Option<String>,
    mut words: Vec<String>,
) -> Result<(ChatId, String), SendTargetError> {
    let parse_id = |x: &str| {
        let x = x.trim();
        if x.starts_with('+') {
            return None;
        }
        x.parse::<i64>().ok().filter(|&id| id != 0)
    };

    let mut chat_id = chat_id
        .filter(|&id| id != 0)
        .or_else(|| env("TARGET_GROUP_ID").as_deref().and_then(parse_id))
        .or_else(|| env("TARGET_CHAT_ID").as_deref().and_then(parse_id));

    if chat_id.is_none() {
        if let Some(id) = words.first().and_then(|x| parse_id(x)) {
            chat_id = Some(id);
            words.remove(0);
        }
    }

    let chat_id = chat_id.ok_or(SendTargetError::MissingChatId)?;

    let text = words.join(" ").trim().to_string();
    if text.is_empty() {
        return Err(SendTargetError::EmptyMessage);
    }

    Ok((ChatId(chat_id), text))
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use std::collections::HashMap;

    use super::*;

    fn fake_env(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| vars.get(name).cloned()
    }

    fn words(x: &[&str]) -> Vec<String> {
        x.iter().map(|x| x.to_string()).collect()
    }

    #[test]
    fn proxy_normalization() {
        assert_eq!(normalize_proxy("7890"), None);
        assert_eq!(normalize_proxy("  "), None);
        assert_eq!(
            normalize_proxy("127.0.0.1:7890").as_deref(),
            Some("http://127.0.0.1:7890")
        );
        assert_eq!(
            normalize_proxy("socks5://10.0.0.1:1080").as_deref(),
            Some("socks5://10.0.0.1:1080")
        );
    }

    #[test]
    fn proxy_selection_order() {
        let args = ConnectionArgs::default();

        let env = fake_env(&[("HTTP_PROXY", "http://a:1"), ("HTTPS_PROXY", "http://b:2")]);
        assert_eq!(args.proxy_setting(env), ProxySetting::Proxy("http://b:2".into()));

        // Port-only garbage gets skipped in favor of the next one.
        let env = fake_env(&[("HTTPS_PROXY", "7897"), ("http_proxy", "127.0.0.1:7890")]);
        assert_eq!(
            args.proxy_setting(env),
            ProxySetting::Proxy("http://127.0.0.1:7890".into())
        );

        assert_eq!(args.proxy_setting(fake_env(&[])), ProxySetting::Direct);

        let args = ConnectionArgs {
            proxy: Some("socks5://c:3".into()),
            ..Default::default()
        };
        let env = fake_env(&[("HTTPS_PROXY", "http://b:2")]);
        assert_eq!(args.proxy_setting(env), ProxySetting::Proxy("socks5://c:3".into()));
    }

    #[test]
    fn proxy_disabled() {
        let env = fake_env(&[("HTTPS_PROXY", "http://b:2"), ("NO_PROXY", "1")]);
        assert_eq!(ConnectionArgs::default().proxy_setting(env), ProxySetting::Direct);

        let args = ConnectionArgs {
            no_proxy: true,
            proxy: Some("http://a:1".into()),
            ..Default::default()
        };
        assert_eq!(args.proxy_setting(fake_env(&[])), ProxySetting::Direct);

        // A host list in NO_PROXY is not the "disable" switch.
        let env = fake_env(&[("HTTPS_PROXY", "http://b:2"), ("NO_PROXY", "localhost")]);
        assert_eq!(
            ConnectionArgs::default().proxy_setting(env),
            ProxySetting::Proxy("http://b:2".into())
        );
    }

    #[test]
    fn token_lookup() {
        let dir = tempfile::tempdir().unwrap();
        let key_file = dir.path().join("key_debug");
        let args = ConnectionArgs::default();

        let env = fake_env(&[("TELEGRAM_TOKEN", "low"), ("TELEGRAM_BOT_TOKEN", "high")]);
        assert_eq!(args.resolve_token(env, &key_file).unwrap(), "high");

        let err = args.resolve_token(fake_env(&[]), &key_file).unwrap_err();
        assert!(matches!(err, ConfigError::MissingToken { .. }));

        fs::write(&key_file, "123:abc\n").unwrap();
        assert_eq!(args.resolve_token(fake_env(&[]), &key_file).unwrap(), "123:abc");

        let args = ConnectionArgs {
            token: Some("from-flag".into()),
            ..Default::default()
        };
        let env = fake_env(&[("TEST_TELEGRAM_TOKEN", "from-env")]);
        assert_eq!(args.resolve_token(env, &key_file).unwrap(), "from-flag");
    }

    #[test]
    fn send_target_from_flag_and_env() {
        let env = fake_env(&[("TARGET_GROUP_ID", "-100"), ("TARGET_CHAT_ID", "5")]);
        let (chat, text) = resolve_send_target(Some(-42), &env, words(&["hi", "there"])).unwrap();
        assert_eq!(chat, ChatId(-42));
        assert_eq!(text, "hi there");

        let (chat, _) = resolve_send_target(None, &env, words(&["hi"])).unwrap();
        assert_eq!(chat, ChatId(-100));

        let env = fake_env(&[("TARGET_CHAT_ID", "5")]);
        let (chat, _) = resolve_send_target(None, &env, words(&["hi"])).unwrap();
        assert_eq!(chat, ChatId(5));
    }

    #[test]
    fn send_target_from_first_word() {
        let env = fake_env(&[]);
        let (chat, text) =
            resolve_send_target(None, &env, words(&["-5279508223", "Hello,", "world"])).unwrap();
        assert_eq!(chat, ChatId(-5279508223));
        assert_eq!(text, "Hello, world");

        // With a chat ID already known, a leading number is just text.
        let (chat, text) = resolve_send_target(Some(7), &env, words(&["42", "apples"])).unwrap();
        assert_eq!(chat, ChatId(7));
        assert_eq!(text, "42 apples");
    }

    #[test]
    fn send_target_errors() {
        let env = fake_env(&[]);
        assert_eq!(
            resolve_send_target(None, &env, words(&["hello"])),
            Err(SendTargetError::MissingChatId)
        );
        assert_eq!(
            resolve_send_target(None, &env, words(&["-100", "  "])),
            Err(SendTargetError::EmptyMessage)
        );
        assert_eq!(
            resolve_send_target(None, &env, words(&[])),
            Err(SendTargetError::MissingChatId)
        );
    }
}
