use bytes::Bytes;
use serde_json::json;
use spectra_llm::streaming::ErrorEvent;
use spectra_llm::StreamEvent;

use super::WireAdapter;

/// Server-Sent Events: `event: {type}` plus the event payload as `data:`.
///
/// There is no end-of-stream sentinel; `stream-end` is the last event and the
/// connection closes after it.
#[derive(Debug, Clone, Copy, Default)]
pub struct SseAdapter;

const HEADERS: &[(&str, &str)] = &[
    ("content-type", "text/event-stream"),
    ("cache-control", "no-cache"),
    ("x-accel-buffering", "no"),
    ("connection", "keep-alive"),
];

fn frame(event_type: &str, data: &str) -> Bytes {
    Bytes::from(format!("event: {}\ndata: {}\n\n", event_type, data))
}

impl WireAdapter for SseAdapter {
    fn headers(&self) -> &'static [(&'static str, &'static str)] {
        HEADERS
    }

    fn encode(&self, event: &StreamEvent) -> spectra_llm::Result<Option<Bytes>> {
        let data = event.to_data()?;
        Ok(Some(frame(event.event_type().as_str(), &data.to_string())))
    }

    fn encode_error(&self, error: &ErrorEvent) -> Bytes {
        let data = json!({
            "id": error.id,
            "timestamp": error.timestamp,
            "error_type": error.error_type,
            "message": error.message,
            "recoverable": error.recoverable,
            "metadata": error.metadata,
        });
        frame("error", &data.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use spectra_llm::streaming::TextDeltaEvent;

    #[test]
    fn test_frame_layout() {
        let event: StreamEvent = TextDeltaEvent::new("e1", 1700000000, "Hello", "m1").into();
        let frame = SseAdapter.encode(&event).unwrap().unwrap();
        let text = std::str::from_utf8(&frame).unwrap();

        let data = text
            .strip_prefix("event: text-delta\ndata: ")
            .and_then(|rest| rest.strip_suffix("\n\n"))
            .unwrap();
        let payload: serde_json::Value = serde_json::from_str(data).unwrap();
        assert_eq!(
            payload,
            json!({ "id": "e1", "timestamp": 1700000000, "delta": "Hello", "message_id": "m1" })
        );
    }

    #[test]
    fn test_no_terminator() {
        assert!(SseAdapter.terminator().is_none());
    }
}
