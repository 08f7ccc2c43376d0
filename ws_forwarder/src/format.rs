//! Rendering of events as Telegram messages, in the legacy Markdown flavor.

use crate::event::{InboundEvent, SignalMessage};

/// Header used when a signal has neither a title nor a type.
const DEFAULT_TITLE: &str = "Trading signal";

/// Render an event as message text. Heartbeats render to nothing.
#[must_use]
pub fn format_event(event: &InboundEvent) -> Option<String> {
    match event {
        InboundEvent::Heartbeat => None,
        InboundEvent::Signal(signal) => Some(format_signal(signal)),
        InboundEvent::Other { raw } => Some(format_raw(raw)),
    }
}

/// Title, content, metadata in a fixed order, then the source.
/// Missing fields are left out entirely.
#[must_use]
pub fn format_signal(signal: &SignalMessage) -> String {
    let title = signal
        .title
        .as_deref()
        .or(signal.kind.as_deref())
        .unwrap_or(DEFAULT_TITLE);

    let mut text = format!("📊 *{title}*\n\n");

    if let Some(content) = &signal.content {
        text.push_str(content);
        text.push_str("\n\n");
    }

    if let Some(metadata) = &signal.metadata {
        let lines = [
            ("💰", "Ticker", &metadata.ticker),
            ("📈", "Type", &metadata.kind),
            ("⏰", "Time", &metadata.time),
            ("💵", "Price", &metadata.close),
            ("📈", "High", &metadata.high),
            ("📉", "Low", &metadata.low),
        ];
        for (icon, label, value) in lines {
            if let Some(value) = value {
                text.push_str(&format!("{icon} *{label}*: {value}\n"));
            }
        }
    }

    if let Some(sender) = &signal.sender {
        text.push_str(&format!("\n👤 *Source*: {sender}"));
    }

    text.trim_end().to_string()
}

/// Fallback for events we don't understand: the payload as is, in a code block.
#[must_use]
pub fn format_raw(raw: &str) -> String {
    format!("📨 *Message received*\n\n```json\n{raw}\n```")
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;
    use crate::event::{parse_event, SignalMetadata};

    fn position(text: &str, needle: &str) -> usize {
        text.find(needle)
            .unwrap_or_else(|| panic!("{needle:?} missing from {text:?}"))
    }

    #[test]
    fn heartbeat_renders_nothing() {
        assert_eq!(format_event(&InboundEvent::Heartbeat), None);
    }

    #[test]
    fn alert_scenario() {
        let event = parse_event(
            r#"{"type":"message_received","message":{"title":"Alert","content":"Price moved","metadata":{"ticker":"BTC","close":"50000"}}}"#,
        )
        .unwrap();
        let text = format_event(&event).unwrap();

        let alert = position(&text, "Alert");
        let content = position(&text, "Price moved");
        let ticker = position(&text, "BTC");
        let close = position(&text, "50000");
        assert!(alert < content && content < ticker && ticker < close, "{text}");

        // Absent fields leave no trace.
        assert!(!text.contains("Type"), "{text}");
        assert!(!text.contains("Time"), "{text}");
        assert!(!text.contains("High"), "{text}");
        assert!(!text.contains("Low"), "{text}");
        assert!(!text.contains("Source"), "{text}");
    }

    #[test]
    fn full_signal_layout() {
        let signal = SignalMessage {
            title: Some("Breakout".into()),
            kind: Some("alert".into()),
            content: Some("ETH broke resistance".into()),
            sender: Some("TradingView".into()),
            metadata: Some(SignalMetadata {
                ticker: Some("ETHUSDT".into()),
                kind: Some("long".into()),
                time: Some("2024-01-01 00:00".into()),
                close: Some("2300".into()),
                high: Some("2350".into()),
                low: Some("2250".into()),
            }),
        };

        assert_eq!(
            format_signal(&signal),
            "📊 *Breakout*\n\n\
             ETH broke resistance\n\n\
             💰 *Ticker*: ETHUSDT\n\
             📈 *Type*: long\n\
             ⏰ *Time*: 2024-01-01 00:00\n\
             💵 *Price*: 2300\n\
             📈 *High*: 2350\n\
             📉 *Low*: 2250\n\
             \n👤 *Source*: TradingView"
        );
    }

    #[test]
    fn title_fallbacks() {
        let signal = SignalMessage {
            kind: Some("alert".into()),
            ..Default::default()
        };
        assert_eq!(format_signal(&signal), "📊 *alert*");

        assert_eq!(format_signal(&SignalMessage::default()), "📊 *Trading signal*");
    }

    #[test]
    fn unknown_events_are_embedded_verbatim() {
        let raw = r#"{"type":"other","foo":1}"#;
        let text = format_event(&parse_event(raw).unwrap()).unwrap();
        assert!(text.contains(raw), "{text}");
        assert!(text.contains("```json"), "{text}");
    }
}
