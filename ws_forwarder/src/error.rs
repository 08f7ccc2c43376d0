use thiserror::Error;

#[derive(Error, Debug)]
pub enum ForwardError {
    /// The stream sent something that isn't JSON. The event gets dropped.
    #[error("malformed event payload: {0}")]
    Parse(#[from] serde_json::Error),

    /// Telegram refused the message or couldn't be reached. Not retried.
    #[error("failed to deliver message: {0}")]
    Delivery(String),

    /// The stream couldn't be opened or went away. Retried.
    #[error("stream connection failed: {0}")]
    Connection(String),

    #[error("gave up after {attempts} reconnect attempts")]
    ReconnectExhausted { attempts: u32 },
}
