//! Forwards trading signals from a WebSocket event stream into a Telegram group.

/// Errors of the forwarding pipeline.
mod error;
pub use error::ForwardError;

/// Events as they come off the stream.
pub mod event;

/// Turning events into Telegram messages.
pub mod format;

/// The connection state machine and the main loop.
pub mod forwarder;

/// Where events come from.
pub mod stream;

/// Where messages go.
pub mod sink;

/// Entry function that starts the forwarder.
mod entry;
pub use entry::*;

/// The group signals get forwarded to unless told otherwise.
pub const DEFAULT_CHAT_ID: i64 = -5279508223;

/// The event stream we listen to unless told otherwise.
pub const DEFAULT_WS_URL: &str = "wss://bz.a.gaopf.top/api/ws";
