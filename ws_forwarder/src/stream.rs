use futures::{Future, StreamExt};
use tokio::net::TcpStream;
use tokio_tungstenite::{
    connect_async, tungstenite::Message, MaybeTlsStream, WebSocketStream,
};
use url::Url;

use crate::ForwardError;

/// Close code for a connection that went away without a close frame.
pub const ABNORMAL_CLOSE: u16 = 1006;
/// Close code for a close frame that didn't carry a status.
pub const NO_STATUS_CLOSE: u16 = 1005;

/// What a live stream connection can tell us.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamEvent {
    /// One message's worth of text.
    Payload(String),
    /// The connection is gone. Nothing more will come from it.
    Closed { code: u16, reason: String },
}

/// A live connection to the event stream.
pub trait Connection: Send {
    /// Wait for the next payload, or for the connection to close.
    fn next_event(&mut self) -> impl Future<Output = StreamEvent> + Send;

    /// Close the connection from our side.
    fn close(&mut self) -> impl Future<Output = ()> + Send;
}

/// Something that can open connections to the event stream.
pub trait Connector: Send {
    type Conn: Connection;

    fn connect(&mut self) -> impl Future<Output = Result<Self::Conn, ForwardError>> + Send;

    /// Where it connects to, for logging.
    fn endpoint(&self) -> &str;
}

/// Connects to a WebSocket endpoint.
pub struct WsConnector {
    url: Url,
}

impl WsConnector {
    #[must_use]
    pub fn new(url: Url) -> Self {
        Self { url }
    }
}

impl Connector for WsConnector {
    type Conn = WsConnection;

    async fn connect(&mut self) -> Result<WsConnection, ForwardError> {
        let (socket, _response) = connect_async(self.url.as_str())
            .await
            .map_err(|e| ForwardError::Connection(e.to_string()))?;
        Ok(WsConnection { socket })
    }

    fn endpoint(&self) -> &str {
        self.url.as_str()
    }
}

pub struct WsConnection {
    socket: WebSocketStream<MaybeTlsStream<TcpStream>>,
}

impl Connection for WsConnection {
    async fn next_event(&mut self) -> StreamEvent {
        // Pings get answered by tungstenite on its own.
        loop {
            let Some(frame) = self.socket.next().await else {
                return StreamEvent::Closed {
                    code: ABNORMAL_CLOSE,
                    reason: String::from("stream ended"),
                };
            };

            match frame {
                Ok(Message::Text(text)) => return StreamEvent::Payload(text),
                Ok(Message::Binary(bytes)) => match String::from_utf8(bytes) {
                    Ok(text) => return StreamEvent::Payload(text),
                    Err(e) => log::warn!("Dropping binary frame that isn't UTF-8: {e}"),
                },
                Ok(Message::Close(frame)) => {
                    let (code, reason) = match frame {
                        Some(frame) => (u16::from(frame.code), frame.reason.into_owned()),
                        None => (NO_STATUS_CLOSE, String::new()),
                    };
                    return StreamEvent::Closed { code, reason };
                }
                Ok(Message::Ping(_) | Message::Pong(_) | Message::Frame(_)) => (),
                Err(e) => {
                    log::error!("WebSocket error: {e}");
                    return StreamEvent::Closed {
                        code: ABNORMAL_CLOSE,
                        reason: e.to_string(),
                    };
                }
            }
        }
    }

    async fn close(&mut self) {
        if let Err(e) = self.socket.close(None).await {
            log::debug!("Error while closing the WebSocket: {e}");
        }
    }
}
