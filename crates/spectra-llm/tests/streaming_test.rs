use std::sync::{Arc, Mutex};

use futures::{stream, StreamExt};
use serde_json::{json, Map};
use spectra_llm::streaming::{
    EventStream, StreamEndEvent, TextDeltaEvent, TextStartEvent, ToolCallEvent, ToolResultEvent,
};
use spectra_llm::{
    ChatRequest, FinishReason, Message, Response, SpectraError, StreamCollector, StreamEvent,
    ToolCall, ToolResult, ToolResultMessage, Usage,
};

const TS: i64 = 1700000000;

fn text_start() -> StreamEvent {
    TextStartEvent::new("ts", TS, "m1").into()
}

fn delta(text: &str) -> StreamEvent {
    TextDeltaEvent::new("td", TS, text, "m1").into()
}

fn tool_call(call: &ToolCall) -> StreamEvent {
    ToolCallEvent::new("tc", TS, call.clone(), "m1").into()
}

fn tool_result(result: &ToolResult) -> StreamEvent {
    ToolResultEvent::new("tr", TS, result.clone(), "m1", true).into()
}

fn stream_end() -> StreamEvent {
    StreamEndEvent::new("end", TS, FinishReason::Stop)
        .with_usage(Usage::new(20, 7))
        .into()
}

fn weather_call() -> ToolCall {
    ToolCall::new("call-1", "get_weather", r#"{"city":"Paris"}"#)
}

fn weather_result() -> ToolResult {
    let mut args = Map::new();
    args.insert("city".to_string(), json!("Paris"));
    ToolResult::new("call-1", "get_weather", args, json!("sunny"))
}

fn observe_all(events: &[StreamEvent]) -> StreamCollector {
    let mut collector = StreamCollector::new();
    for event in events {
        collector.observe(event);
    }
    collector
}

fn event_stream(items: Vec<spectra_llm::Result<StreamEvent>>) -> EventStream {
    Box::pin(stream::iter(items))
}

type Captured = Arc<Mutex<Vec<(Option<String>, Vec<Message>, Response)>>>;

fn capturing_collector(captured: &Captured) -> StreamCollector {
    let sink = Arc::clone(captured);
    StreamCollector::new()
        .with_request(ChatRequest::new("gpt-4", vec![Message::user("weather?")]))
        .on_complete(move |request, messages, response| {
            sink.lock().unwrap().push((
                request.map(|r| r.model.clone()),
                messages.to_vec(),
                response.clone(),
            ));
        })
}

#[test]
fn test_text_and_tool_call_form_one_assistant_message() {
    let call = weather_call();
    let collector = observe_all(&[
        text_start(),
        delta("A"),
        delta("B"),
        tool_call(&call),
        stream_end(),
    ]);

    assert_eq!(
        collector.messages(),
        &[Message::assistant_with_tools("AB", vec![call])]
    );
}

#[test]
fn test_text_start_flushes_pending_text_and_results_in_order() {
    let result = weather_result();
    let collector = observe_all(&[
        delta("hi"),
        tool_result(&result),
        text_start(),
        delta("bye"),
        stream_end(),
    ]);

    assert_eq!(
        collector.messages(),
        &[
            Message::assistant("hi"),
            Message::Tool(ToolResultMessage::new(vec![result])),
            Message::assistant("bye"),
        ]
    );
}

#[test]
fn test_multi_step_response_assembly() {
    let call = weather_call();
    let result = weather_result();
    let collector = observe_all(&[
        text_start(),
        delta("Let me check. "),
        tool_call(&call),
        tool_result(&result),
        text_start(),
        delta("It is sunny."),
        stream_end(),
    ]);

    let response = collector.response().unwrap();
    assert_eq!(response.messages.len(), 3);
    assert_eq!(response.text, "Let me check. It is sunny.");
    assert_eq!(response.tool_calls, vec![call]);
    assert_eq!(response.tool_results, vec![result]);
    assert_eq!(response.usage, Usage::new(20, 7));
    assert_eq!(response.steps.len(), 1);
    assert_eq!(response.total_usage(), Usage::new(20, 7));
}

#[test]
fn test_delta_without_text_start_is_tolerated() {
    let collector = observe_all(&[delta("orphan"), stream_end()]);

    assert_eq!(collector.messages(), &[Message::assistant("orphan")]);
}

#[test]
fn test_tool_call_without_text_forms_empty_assistant_message() {
    let call = weather_call();
    let collector = observe_all(&[tool_call(&call), stream_end()]);

    assert_eq!(
        collector.messages(),
        &[Message::assistant_with_tools("", vec![call])]
    );
}

#[test]
fn test_tool_results_without_text_still_make_a_step() {
    let result = weather_result();
    let collector = observe_all(&[tool_result(&result), stream_end()]);

    let response = collector.response().unwrap();
    assert_eq!(response.steps.len(), 1);
    assert_eq!(response.steps[0].tool_results, vec![result]);
    assert_eq!(response.steps[0].text, "");
}

#[tokio::test]
async fn test_collect_passes_every_item_through_unchanged() {
    let events = vec![text_start(), delta("Hello"), stream_end()];
    let items = events.iter().cloned().map(Ok).collect();

    let forwarded: Vec<StreamEvent> = StreamCollector::new()
        .collect(event_stream(items))
        .map(|item| item.unwrap())
        .collect()
        .await;

    assert_eq!(forwarded, events);
}

#[tokio::test]
async fn test_callback_runs_once_after_stream_end_is_consumed() {
    let captured: Captured = Arc::new(Mutex::new(Vec::new()));
    let items = vec![Ok(text_start()), Ok(delta("Hello")), Ok(stream_end())];
    let mut forwarded = capturing_collector(&captured).collect(event_stream(items));

    while let Some(item) = forwarded.next().await {
        if item.unwrap().is_terminal() {
            // the consumer handles the terminal event before the collector reacts to it
            assert!(captured.lock().unwrap().is_empty());
        }
    }

    let captured = captured.lock().unwrap();
    assert_eq!(captured.len(), 1);
    let (model, messages, response) = &captured[0];
    assert_eq!(model.as_deref(), Some("gpt-4"));
    assert_eq!(messages, &vec![Message::assistant("Hello")]);
    assert_eq!(response.text, "Hello");
}

#[tokio::test]
async fn test_second_stream_end_does_not_invoke_callback_again() {
    let captured: Captured = Arc::new(Mutex::new(Vec::new()));
    let items = vec![Ok(delta("once")), Ok(stream_end()), Ok(stream_end())];

    let count = capturing_collector(&captured)
        .collect(event_stream(items))
        .count()
        .await;

    assert_eq!(count, 3);
    assert_eq!(captured.lock().unwrap().len(), 1);
}

#[tokio::test]
async fn test_upstream_failure_runs_callback_with_partial_response() {
    let captured: Captured = Arc::new(Mutex::new(Vec::new()));
    let items = vec![
        Ok(text_start()),
        Ok(delta("partial")),
        Err(SpectraError::provider(Some(500), "API connection failed")),
    ];

    let forwarded: Vec<_> = capturing_collector(&captured)
        .collect(event_stream(items))
        .collect()
        .await;

    assert_eq!(forwarded.len(), 3);
    assert!(forwarded[2].is_err());

    let captured = captured.lock().unwrap();
    assert_eq!(captured.len(), 1);
    let (model, messages, response) = &captured[0];
    assert_eq!(model.as_deref(), Some("gpt-4"));
    assert_eq!(messages, &vec![Message::assistant("partial")]);
    assert_eq!(response.text, "partial");
    assert_eq!(response.finish_reason, FinishReason::Error);
}

#[tokio::test]
async fn test_failure_after_stream_end_keeps_single_callback() {
    let captured: Captured = Arc::new(Mutex::new(Vec::new()));
    let items = vec![
        Ok(delta("done")),
        Ok(stream_end()),
        Err(SpectraError::provider(None, "connection reset")),
    ];

    let count = capturing_collector(&captured)
        .collect(event_stream(items))
        .count()
        .await;

    assert_eq!(count, 3);
    let captured = captured.lock().unwrap();
    assert_eq!(captured.len(), 1);
    assert_eq!(captured[0].2.finish_reason, FinishReason::Stop);
}
