use std::sync::{Arc, Mutex};

use serde_json::Value;
use spectra_api::adapters::{BufferSink, DataProtocolAdapter, EventsCallback, WireAdapter};
use spectra_llm::streaming::{
    new_event_id, now, StreamEndEvent, TextDeltaEvent, TextStartEvent, ToolCallEvent,
};
use spectra_llm::testing::{FakeStreamingClient, FAKE_MODEL};
use spectra_llm::{
    ChatRequest, EventStream, FinishReason, Message, StreamEvent, StreamingClient, ToolCall,
};

const DONE: &str = "data: [DONE]\n\n";

fn stream_of(events: Vec<StreamEvent>) -> EventStream {
    Box::pin(futures::stream::iter(events.into_iter().map(Ok)))
}

async fn fake_stream(client: &FakeStreamingClient) -> EventStream {
    client
        .stream(ChatRequest::new(FAKE_MODEL, vec![Message::user("hi")]))
        .await
        .unwrap()
}

fn payloads(text: &str) -> Vec<Value> {
    text.split("\n\n")
        .filter(|frame| !frame.is_empty() && *frame != "data: [DONE]")
        .map(|frame| {
            let json = frame
                .strip_prefix("data: ")
                .unwrap_or_else(|| panic!("frame without data prefix: {:?}", frame));
            serde_json::from_str(json).unwrap()
        })
        .collect()
}

fn recording_callback() -> (EventsCallback, Arc<Mutex<Vec<Vec<StreamEvent>>>>) {
    let calls = Arc::new(Mutex::new(Vec::new()));
    let sink = calls.clone();
    let callback: EventsCallback = Box::new(move |_, events| {
        sink.lock().unwrap().push(events.to_vec());
    });
    (callback, calls)
}

#[tokio::test]
async fn test_text_delta_line_structure() {
    let mut sink = BufferSink::new();
    DataProtocolAdapter
        .write_to(
            stream_of(vec![TextDeltaEvent::new("e1", 1700000000, "Hello", "m1").into()]),
            &mut sink,
            None,
            None,
        )
        .await;

    let text = sink.to_text();
    let line = text.lines().next().unwrap();
    assert!(line.starts_with("data: {"));
    assert!(line.contains("\"type\":\"text-delta\""));
    assert!(line.contains("\"delta\":\"Hello\""));
    assert!(line.contains("\"id\":\"m1\""));
    assert!(text.ends_with(DONE));
}

#[tokio::test]
async fn test_full_text_stream_vocabulary() {
    let client = FakeStreamingClient::from_text("Hello world");
    let mut sink = BufferSink::new();
    DataProtocolAdapter
        .write_to(fake_stream(&client).await, &mut sink, None, None)
        .await;

    let text = sink.to_text();
    assert!(text.ends_with(DONE));

    let types: Vec<String> = payloads(&text)
        .iter()
        .map(|p| p["type"].as_str().unwrap().to_string())
        .collect();
    assert_eq!(
        types,
        vec!["start", "text-start", "text-delta", "text-delta", "text-end", "finish"]
    );

    let finish = payloads(&text).pop().unwrap();
    assert_eq!(finish["messageMetadata"]["finishReason"], "stop");
    assert_eq!(finish["messageMetadata"]["usage"]["promptTokens"], 10);
    assert_eq!(finish["messageMetadata"]["usage"]["completionTokens"], 2);
}

#[tokio::test]
async fn test_empty_stream_still_ends_with_sentinel() {
    let (callback, calls) = recording_callback();
    let mut sink = BufferSink::new();
    let collected = DataProtocolAdapter
        .write_to(stream_of(vec![]), &mut sink, None, Some(callback))
        .await;

    assert!(collected.is_empty());
    assert_eq!(sink.to_text(), DONE);
    assert_eq!(calls.lock().unwrap().len(), 1);
}

#[tokio::test]
async fn test_upstream_failure_writes_one_error_frame_before_sentinel() {
    let client =
        FakeStreamingClient::from_text("Hello").failing_with(Some(500), "API connection failed");
    let (callback, calls) = recording_callback();
    let mut sink = BufferSink::new();
    let request = ChatRequest::new(FAKE_MODEL, vec![Message::user("hi")]);

    DataProtocolAdapter
        .write_to(
            fake_stream(&client).await,
            &mut sink,
            Some(request),
            Some(callback),
        )
        .await;

    let text = sink.to_text();
    assert!(text.ends_with(DONE));
    assert_eq!(text.matches("\"type\":\"error\"").count(), 1);
    assert!(text.contains("\"errorText\":\"API connection failed\""));

    let errors: Vec<Value> = payloads(&text)
        .into_iter()
        .filter(|p| p["type"] == "error")
        .collect();
    assert_eq!(errors.len(), 1);

    let calls = calls.lock().unwrap();
    assert_eq!(calls.len(), 1);
    match calls[0].last() {
        Some(StreamEvent::Error(error)) => {
            assert_eq!(error.message, "API connection failed");
            assert_eq!(error.metadata["code"], 500);
            assert!(error.recoverable);
        }
        other => panic!("expected a trailing error event, got {:?}", other),
    }
}

#[tokio::test]
async fn test_encoding_failure_is_replaced_and_stream_continues() {
    let events = vec![
        TextStartEvent::new(new_event_id(), now(), "m1").into(),
        ToolCallEvent::new(
            new_event_id(),
            now(),
            ToolCall::new("call-1", "search", "{not json"),
            "m1",
        )
        .into(),
        StreamEndEvent::new(new_event_id(), now(), FinishReason::ToolCalls).into(),
    ];
    let mut sink = BufferSink::new();
    let collected = DataProtocolAdapter
        .write_to(stream_of(events), &mut sink, None, None)
        .await;

    let text = sink.to_text();
    assert!(text.contains("Failed to encode event data as JSON"));
    assert!(text.contains("\"type\":\"finish\""));
    assert!(text.ends_with(DONE));
    assert_eq!(collected.len(), 3);
}

#[tokio::test]
async fn test_disconnect_stops_pulling_and_skips_sentinel() {
    let client = FakeStreamingClient::from_text("one two three four");
    let (callback, calls) = recording_callback();
    let mut sink = BufferSink::disconnecting_after(2);

    let collected = DataProtocolAdapter
        .write_to(fake_stream(&client).await, &mut sink, None, Some(callback))
        .await;

    assert_eq!(sink.frames().len(), 2);
    assert!(!sink.to_text().contains("[DONE]"));
    assert_eq!(collected.len(), 2);

    let calls = calls.lock().unwrap();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].len(), 2);
}

#[tokio::test]
async fn test_into_response_headers_and_body() {
    let client = FakeStreamingClient::from_text("Hi there");
    let response =
        DataProtocolAdapter.into_response(fake_stream(&client).await, None, None, 1);

    assert_eq!(response.status(), axum::http::StatusCode::OK);
    let headers = response.headers();
    assert_eq!(headers["content-type"], "text/plain; charset=utf-8");
    assert_eq!(headers["cache-control"], "no-cache, no-transform");
    assert_eq!(headers["x-accel-buffering"], "no");
    assert_eq!(headers["x-vercel-ai-ui-message-stream"], "v1");

    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let text = String::from_utf8(body.to_vec()).unwrap();
    assert!(text.starts_with("data: {\"type\":\"start\""));
    assert!(text.ends_with(DONE));
}
