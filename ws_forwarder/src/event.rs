use serde::{Deserialize, Deserializer};
use serde_json::Value;

/// Liveness ping from the stream. Never forwarded.
pub const HEARTBEAT: &str = "heartbeat";
/// A trading signal or similar message worth forwarding.
pub const MESSAGE_RECEIVED: &str = "message_received";

/// One event read off the stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InboundEvent {
    Heartbeat,
    Signal(SignalMessage),
    /// Anything we don't know how to render nicely. Keeps the payload exactly as received.
    Other { raw: String },
}

/// The `message` record of a `message_received` event.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct SignalMessage {
    #[serde(default, deserialize_with = "loose_text")]
    pub title: Option<String>,
    #[serde(default, rename = "type", deserialize_with = "loose_text")]
    pub kind: Option<String>,
    #[serde(default, deserialize_with = "loose_text")]
    pub content: Option<String>,
    #[serde(default, deserialize_with = "loose_text")]
    pub sender: Option<String>,
    #[serde(default)]
    pub metadata: Option<SignalMetadata>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct SignalMetadata {
    #[serde(default, deserialize_with = "loose_text")]
    pub ticker: Option<String>,
    #[serde(default, rename = "type", deserialize_with = "loose_text")]
    pub kind: Option<String>,
    #[serde(default, deserialize_with = "loose_text")]
    pub time: Option<String>,
    #[serde(default, deserialize_with = "loose_text")]
    pub close: Option<String>,
    #[serde(default, deserialize_with = "loose_text")]
    pub high: Option<String>,
    #[serde(default, deserialize_with = "loose_text")]
    pub low: Option<String>,
}

/// Accepts whatever the sender put in a field and turns it into display text.
///
/// Prices come as numbers about as often as strings. `null`, `false`, a
/// numeric zero and empty strings count as absent.
fn loose_text<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::Null | Value::Bool(false) => None,
        Value::String(x) if x.trim().is_empty() => None,
        Value::String(x) => Some(x),
        Value::Number(x) if x.as_f64() == Some(0.0) => None,
        Value::Number(x) => Some(x.to_string()),
        other => Some(other.to_string()),
    })
}

/// Parse one payload from the stream.
///
/// A `message_received` event whose `message` is missing or doesn't look like
/// a message is treated as [`InboundEvent::Other`], so it still gets forwarded
/// in raw form.
///
/// # Errors
///
/// Errors if the payload isn't JSON at all, or is a bare `null`.
pub fn parse_event(raw: &str) -> Result<InboundEvent, serde_json::Error> {
    let value: Value = serde_json::from_str(raw)?;

    if value.is_null() {
        return Err(serde::de::Error::custom("the event is null"));
    }

    match value.get("type").and_then(Value::as_str) {
        Some(HEARTBEAT) => return Ok(InboundEvent::Heartbeat),
        Some(MESSAGE_RECEIVED) => {
            let signal = value
                .get("message")
                .filter(|x| x.is_object())
                .and_then(|x| SignalMessage::deserialize(x).ok());
            if let Some(signal) = signal {
                return Ok(InboundEvent::Signal(signal));
            }
        }
        _ => (),
    }

    Ok(InboundEvent::Other {
        raw: raw.trim().to_string(),
    })
}
