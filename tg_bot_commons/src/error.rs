use thiserror::Error;

use crate::config::TOKEN_ENV_VARS;

/// Things that can go wrong while turning command line arguments and
/// environment variables into a working [`teloxide::Bot`].
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error(
        "no bot token found: pass --token, set one of {} or put it into the `{key_file}` file",
        TOKEN_ENV_VARS.join(", ")
    )]
    MissingToken { key_file: String },

    #[error("could not read bot key file `{path}`: {source}")]
    KeyFile {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid proxy `{url}`: {source}")]
    BadProxy {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("failed to build the HTTP client: {0}")]
    HttpClient(#[source] reqwest::Error),
}
