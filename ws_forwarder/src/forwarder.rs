use std::{future::Future, pin::Pin, time::Duration};

use tokio::time::Sleep;

use crate::{
    event::parse_event,
    format::format_event,
    sink::{SentMessage, Sink},
    stream::{Connection, Connector, StreamEvent, ABNORMAL_CLOSE},
    ForwardError,
};

/// How many times in a row we try to reconnect before giving up.
pub const MAX_RECONNECT_ATTEMPTS: u32 = 10;
/// Reconnect attempt `n` waits `n` times this long.
pub const RECONNECT_BASE_DELAY: Duration = Duration::from_secs(5);
/// How long we wait for the stream to acknowledge our close on shutdown.
const CLOSE_TIMEOUT: Duration = Duration::from_secs(5);
/// How much of a bad payload goes into the log.
const EXCERPT_LEN: usize = 200;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Connected,
    Reconnecting,
    Terminated,
}

/// Linear backoff: attempt `n` waits `n * base_delay`, up to `max_attempts` attempts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReconnectPolicy {
    pub base_delay: Duration,
    pub max_attempts: u32,
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        Self {
            base_delay: RECONNECT_BASE_DELAY,
            max_attempts: MAX_RECONNECT_ATTEMPTS,
        }
    }
}

impl ReconnectPolicy {
    /// Delay before reconnect attempt number `attempt`, counting from 1.
    /// `None` once we're past the limit.
    #[must_use]
    pub fn delay_for(&self, attempt: u32) -> Option<Duration> {
        (1..=self.max_attempts)
            .contains(&attempt)
            .then(|| self.base_delay * attempt)
    }
}

/// What happened to one payload from the stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventOutcome {
    Malformed,
    Heartbeat,
    Delivered,
    DeliveryFailed,
}

/// What [`Forwarder::on_close`] decided to do about a lost connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CloseDecision {
    Reconnect { attempt: u32, delay: Duration },
    GiveUp,
}

/// Where the run loop goes next.
enum Step {
    Continue,
    Event(String),
    Closed { code: u16, reason: String },
    Shutdown,
}

/// Reads events off a stream and delivers them to a sink one at a time,
/// reconnecting with linear backoff when the stream goes away.
///
/// Holds at most one connection and at most one pending reconnect timer.
pub struct Forwarder<C: Connector, S: Sink> {
    connector: C,
    sink: S,
    policy: ReconnectPolicy,
    state: ConnectionState,
    attempts: u32,
    connection: Option<C::Conn>,
    reconnect_timer: Option<Pin<Box<Sleep>>>,
}

impl<C: Connector, S: Sink> Forwarder<C, S> {
    #[must_use]
    pub fn new(connector: C, sink: S) -> Self {
        Self::with_policy(connector, sink, ReconnectPolicy::default())
    }

    #[must_use]
    pub fn with_policy(connector: C, sink: S, policy: ReconnectPolicy) -> Self {
        Self {
            connector,
            sink,
            policy,
            state: ConnectionState::Disconnected,
            attempts: 0,
            connection: None,
            reconnect_timer: None,
        }
    }

    #[must_use]
    pub fn state(&self) -> ConnectionState {
        self.state
    }

    /// Consecutive reconnect attempts since the last successful connection.
    #[must_use]
    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    /// Forward events until `shutdown` completes or we run out of reconnect attempts.
    ///
    /// `shutdown` is checked before anything else every time the loop waits,
    /// so once it has completed no further connection attempt is made.
    ///
    /// # Errors
    ///
    /// Returns [`ForwardError::ReconnectExhausted`] if the stream kept failing.
    pub async fn run(&mut self, shutdown: impl Future<Output = ()>) -> Result<(), ForwardError> {
        tokio::pin!(shutdown);

        loop {
            let step = match self.state {
                ConnectionState::Terminated => return Ok(()),
                ConnectionState::Disconnected | ConnectionState::Connecting => {
                    tokio::select! {
                        biased;
                        () = &mut shutdown => Step::Shutdown,
                        result = self.connect() => match result {
                            Ok(()) => Step::Continue,
                            Err(e) => Step::Closed {
                                code: ABNORMAL_CLOSE,
                                reason: e.to_string(),
                            },
                        },
                    }
                }
                ConnectionState::Connected => {
                    tokio::select! {
                        biased;
                        () = &mut shutdown => Step::Shutdown,
                        event = self.next_event() => match event {
                            StreamEvent::Payload(raw) => Step::Event(raw),
                            StreamEvent::Closed { code, reason } => Step::Closed { code, reason },
                        },
                    }
                }
                ConnectionState::Reconnecting => {
                    tokio::select! {
                        biased;
                        () = &mut shutdown => Step::Shutdown,
                        () = wait_for_timer(&mut self.reconnect_timer) => {
                            Step::Continue
                        }
                    }
                }
            };

            match step {
                Step::Continue => {
                    if self.state == ConnectionState::Reconnecting {
                        self.reconnect_timer = None;
                        self.state = ConnectionState::Connecting;
                    }
                }
                Step::Event(raw) => {
                    let shut_down = tokio::select! {
                        biased;
                        () = &mut shutdown => true,
                        _ = self.on_event(&raw) => false,
                    };
                    if shut_down {
                        self.shutdown().await;
                        return Ok(());
                    }
                }
                Step::Closed { code, reason } => {
                    if self.on_close(code, &reason) == CloseDecision::GiveUp {
                        return Err(ForwardError::ReconnectExhausted {
                            attempts: self.attempts,
                        });
                    }
                }
                Step::Shutdown => {
                    self.shutdown().await;
                    return Ok(());
                }
            }
        }
    }

    /// Open the stream connection.
    ///
    /// # Errors
    ///
    /// Returns the connector's error. The state is then `Reconnecting`, and
    /// [`Forwarder::on_close`] decides whether there will be another attempt.
    pub async fn connect(&mut self) -> Result<(), ForwardError> {
        self.state = ConnectionState::Connecting;
        log::info!("Connecting to {}", self.connector.endpoint());

        match self.connector.connect().await {
            Ok(connection) => {
                self.connection = Some(connection);
                self.state = ConnectionState::Connected;
                self.attempts = 0;
                log::info!(
                    "Connected! Forwarding events to chat {}",
                    self.sink.destination()
                );
                Ok(())
            }
            Err(e) => {
                log::error!("Could not connect to {}: {e}", self.connector.endpoint());
                self.state = ConnectionState::Reconnecting;
                Err(e)
            }
        }
    }

    async fn next_event(&mut self) -> StreamEvent {
        match self.connection.as_mut() {
            Some(connection) => connection.next_event().await,
            None => StreamEvent::Closed {
                code: ABNORMAL_CLOSE,
                reason: String::from("no connection"),
            },
        }
    }

    /// Handle one payload from the stream: parse, skip heartbeats, format, deliver.
    /// Never touches the connection state.
    pub async fn on_event(&self, raw: &str) -> EventOutcome {
        log::debug!("Received: {raw}");

        let event = match parse_event(raw) {
            Ok(event) => event,
            Err(e) => {
                let e = ForwardError::from(e);
                log::warn!("Dropping event, {e}. Payload: {}", excerpt(raw));
                return EventOutcome::Malformed;
            }
        };

        let Some(text) = format_event(&event) else {
            log::debug!("Heartbeat, not forwarding");
            return EventOutcome::Heartbeat;
        };

        match self.deliver(&text).await {
            Ok(_) => EventOutcome::Delivered,
            Err(_) => EventOutcome::DeliveryFailed,
        }
    }

    /// Send text to the destination once. Failures are logged and handed back,
    /// but nothing retries them.
    ///
    /// # Errors
    ///
    /// Returns the sink's error.
    pub async fn deliver(&self, text: &str) -> Result<SentMessage, ForwardError> {
        match self.sink.send(text).await {
            Ok(sent) => {
                let ids = sent
                    .message_ids
                    .iter()
                    .map(|x| x.0.to_string())
                    .collect::<Vec<_>>()
                    .join(", ");
                log::info!("Forwarded to chat {} (message ID {ids})", self.sink.destination());
                Ok(sent)
            }
            Err(e) => {
                log::error!("Could not forward to chat {}: {e}", self.sink.destination());
                Err(e)
            }
        }
    }

    /// React to the connection going away: schedule the next attempt with
    /// backoff, or give up and terminate once the attempts are used up.
    pub fn on_close(&mut self, code: u16, reason: &str) -> CloseDecision {
        let reason = if reason.is_empty() { "unknown" } else { reason };
        log::warn!("Stream connection closed (code {code}, reason: {reason})");

        self.connection = None;

        let attempt = self.attempts + 1;
        match self.policy.delay_for(attempt) {
            Some(delay) => {
                self.attempts = attempt;
                self.state = ConnectionState::Reconnecting;
                // Replacing the old timer drops it, so there's never more than one.
                self.reconnect_timer = Some(Box::pin(tokio::time::sleep(delay)));
                log::info!(
                    "Reconnecting in {} seconds ({attempt}/{})",
                    delay.as_secs(),
                    self.policy.max_attempts
                );
                CloseDecision::Reconnect { attempt, delay }
            }
            None => {
                self.state = ConnectionState::Terminated;
                self.reconnect_timer = None;
                log::error!(
                    "Reached the limit of {} reconnect attempts, giving up",
                    self.policy.max_attempts
                );
                CloseDecision::GiveUp
            }
        }
    }

    /// Cancel any pending reconnect, close the connection if there is one, and stop.
    pub async fn shutdown(&mut self) {
        if self.reconnect_timer.take().is_some() {
            log::info!("Cancelled the pending reconnect");
        }

        if let Some(mut connection) = self.connection.take() {
            log::info!("Closing the stream connection...");
            if tokio::time::timeout(CLOSE_TIMEOUT, connection.close())
                .await
                .is_err()
            {
                log::warn!("The stream didn't acknowledge the close in time");
            }
        }

        self.state = ConnectionState::Terminated;
    }
}

async fn wait_for_timer(timer: &mut Option<Pin<Box<Sleep>>>) {
    if let Some(timer) = timer.as_mut() {
        timer.as_mut().await;
    }
}

/// Start of a payload, short enough for a log line.
fn excerpt(raw: &str) -> String {
    let mut excerpt: String = raw.chars().take(EXCERPT_LEN).collect();
    if excerpt.len() < raw.len() {
        excerpt.push('…');
    }
    excerpt
}
