use serde::Deserialize;
use serde_json::Value;

use super::state::OllamaStreamState;
use crate::buffer_utils::LineDecoder;
use crate::streaming::{
    new_event_id, now, ErrorEvent, PendingToolCall, StreamEndEvent, StreamEvent, StreamStartEvent,
    TextCompleteEvent, TextDeltaEvent, TextStartEvent, ThinkingCompleteEvent, ThinkingEvent,
    ThinkingStartEvent, ToolCallEvent,
};
use crate::types::FinishReason;

const PROVIDER: &str = "ollama";

#[derive(Debug, Deserialize)]
struct ChatChunk {
    #[serde(default)]
    model: Option<String>,
    #[serde(default)]
    message: Option<ChunkMessage>,
    #[serde(default)]
    done: bool,
    #[serde(default)]
    done_reason: Option<String>,
    #[serde(default)]
    prompt_eval_count: Option<u32>,
    #[serde(default)]
    eval_count: Option<u32>,
    #[serde(default)]
    error: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ChunkMessage {
    #[serde(default)]
    content: Option<String>,
    #[serde(default)]
    thinking: Option<String>,
    #[serde(default)]
    tool_calls: Option<Vec<ChunkToolCall>>,
}

#[derive(Debug, Deserialize)]
struct ChunkToolCall {
    function: ChunkFunction,
}

#[derive(Debug, Deserialize)]
struct ChunkFunction {
    name: String,
    #[serde(default)]
    arguments: Value,
}

/// Decoder for Ollama `/api/chat` NDJSON streams
pub struct ChatStreamDecoder {
    state: OllamaStreamState,
    model: String,
    block_index: u32,
    finished: bool,
}

impl ChatStreamDecoder {
    pub fn new(model: impl Into<String>) -> Self {
        Self::with_state(model, OllamaStreamState::new())
    }

    /// Continue from the state of a previous turn so token counters keep accumulating
    pub fn with_state(model: impl Into<String>, state: OllamaStreamState) -> Self {
        Self {
            state,
            model: model.into(),
            block_index: 0,
            finished: false,
        }
    }

    pub fn state(&self) -> &OllamaStreamState {
        &self.state
    }

    pub fn into_state(self) -> OllamaStreamState {
        self.state
    }

    fn ensure_stream_started(&mut self, model: Option<&str>, events: &mut Vec<StreamEvent>) {
        if !self.state.should_emit_stream_start() {
            return;
        }
        let model = model.unwrap_or(&self.model).to_string();
        self.state
            .with_model(model.as_str())
            .with_provider(PROVIDER)
            .with_message_id(new_event_id())
            .mark_stream_started();
        events.push(StreamStartEvent::new(new_event_id(), now(), model, PROVIDER).into());
    }

    fn open_thinking(&mut self, events: &mut Vec<StreamEvent>) {
        if self.state.current_block_type() == Some("text") {
            self.close_block(events);
        }
        if self.state.should_emit_thinking_start() {
            let index = self.next_block_index();
            self.state
                .with_reasoning_id(new_event_id())
                .mark_thinking_started()
                .with_block_context(index, "thinking");
            events.push(
                ThinkingStartEvent::new(new_event_id(), now(), self.state.reasoning_id()).into(),
            );
        }
    }

    fn open_text(&mut self, events: &mut Vec<StreamEvent>) {
        if self.state.current_block_type() == Some("thinking") {
            self.close_block(events);
        }
        if self.state.should_emit_text_start() {
            if self.state.message_id().is_empty() {
                self.state.with_message_id(new_event_id());
            }
            let index = self.next_block_index();
            self.state.mark_text_started().with_block_context(index, "text");
            events.push(TextStartEvent::new(new_event_id(), now(), self.state.message_id()).into());
        }
    }

    fn close_block(&mut self, events: &mut Vec<StreamEvent>) {
        match self.state.current_block_type() {
            Some("thinking") => events.push(
                ThinkingCompleteEvent::new(new_event_id(), now(), self.state.reasoning_id()).into(),
            ),
            Some("text") => events.push(
                TextCompleteEvent::new(new_event_id(), now(), self.state.message_id()).into(),
            ),
            _ => {}
        }
        self.state.finish_block();
    }

    fn next_block_index(&mut self) -> u32 {
        let index = self.block_index;
        self.block_index += 1;
        index
    }

    fn end_stream(&mut self, finish_reason: FinishReason, events: &mut Vec<StreamEvent>) {
        self.close_block(events);
        self.state.with_finish_reason(finish_reason);
        events.push(
            StreamEndEvent::new(new_event_id(), now(), finish_reason)
                .with_usage(self.state.accumulated_usage())
                .into(),
        );
        self.state.reset();
        self.finished = true;
    }

    fn push_tool_calls(&mut self, calls: Vec<ChunkToolCall>, events: &mut Vec<StreamEvent>) {
        self.close_block(events);
        for call in calls {
            let index = self.state.tool_calls().len() as u32;
            let pending = PendingToolCall::new()
                .with_id(format!("call_{}", new_event_id()))
                .with_name(call.function.name)
                .with_input(arguments_text(&call.function.arguments));
            self.state.add_tool_call(index, pending);

            if let Some(tool_call) = self.state.tool_call(index).and_then(|c| c.to_tool_call()) {
                events.push(
                    ToolCallEvent::new(new_event_id(), now(), tool_call, self.state.message_id())
                        .into(),
                );
            }
        }
    }
}

impl LineDecoder for ChatStreamDecoder {
    fn decode_line(&mut self, line: &str) -> Vec<StreamEvent> {
        let chunk: ChatChunk = match serde_json::from_str(line) {
            Ok(chunk) => chunk,
            Err(e) => {
                tracing::warn!("Skipping unparseable Ollama chunk: {}", e);
                return Vec::new();
            }
        };

        let mut events = Vec::new();
        self.ensure_stream_started(chunk.model.as_deref(), &mut events);

        if let Some(message) = chunk.error {
            events.push(ErrorEvent::new(new_event_id(), now(), "provider_error", message, false).into());
            self.end_stream(FinishReason::Error, &mut events);
            return events;
        }

        if let Some(message) = chunk.message {
            if let Some(thinking) = message.thinking.filter(|t| !t.is_empty()) {
                self.open_thinking(&mut events);
                self.state.append_thinking(&thinking);
                events.push(
                    ThinkingEvent::new(new_event_id(), now(), thinking, self.state.reasoning_id())
                        .into(),
                );
            }

            if let Some(content) = message.content.filter(|c| !c.is_empty()) {
                self.open_text(&mut events);
                self.state.append_text(&content);
                events.push(
                    TextDeltaEvent::new(new_event_id(), now(), content, self.state.message_id())
                        .into(),
                );
            }

            if let Some(calls) = message.tool_calls.filter(|c| !c.is_empty()) {
                self.push_tool_calls(calls, &mut events);
            }
        }

        if chunk.done {
            self.state
                .add_prompt_tokens(chunk.prompt_eval_count.unwrap_or(0))
                .add_completion_tokens(chunk.eval_count.unwrap_or(0));

            let finish_reason = if self.state.has_tool_calls() {
                FinishReason::ToolCalls
            } else {
                map_done_reason(chunk.done_reason.as_deref())
            };
            self.end_stream(finish_reason, &mut events);
        }

        events
    }

    fn finish(&mut self) -> Vec<StreamEvent> {
        let mut events = Vec::new();
        if !self.finished {
            tracing::warn!("Ollama stream ended without a done chunk");
            self.end_stream(FinishReason::Unknown, &mut events);
        }
        events
    }

    fn is_finished(&self) -> bool {
        self.finished
    }
}

fn map_done_reason(reason: Option<&str>) -> FinishReason {
    match reason {
        None | Some("stop") => FinishReason::Stop,
        Some("length") => FinishReason::Length,
        Some(_) => FinishReason::Other,
    }
}

fn arguments_text(arguments: &Value) -> String {
    match arguments {
        Value::Null => "{}".to_string(),
        Value::String(raw) => raw.clone(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::streaming::StreamEventType;

    fn decode_all(decoder: &mut ChatStreamDecoder, lines: &[&str]) -> Vec<StreamEvent> {
        let mut events: Vec<StreamEvent> =
            lines.iter().flat_map(|line| decoder.decode_line(line)).collect();
        events.extend(decoder.finish());
        events
    }

    fn types(events: &[StreamEvent]) -> Vec<StreamEventType> {
        events.iter().map(|e| e.event_type()).collect()
    }

    #[test]
    fn test_thinking_then_text() {
        let mut decoder = ChatStreamDecoder::new("qwen3");
        let events = decode_all(
            &mut decoder,
            &[
                r#"{"model":"qwen3","message":{"role":"assistant","content":"","thinking":"Let me think"},"done":false}"#,
                r#"{"model":"qwen3","message":{"role":"assistant","content":"Hello"},"done":false}"#,
                r#"{"model":"qwen3","message":{"role":"assistant","content":""},"done":true,"done_reason":"stop","prompt_eval_count":10,"eval_count":4}"#,
            ],
        );

        assert_eq!(
            types(&events),
            vec![
                StreamEventType::StreamStart,
                StreamEventType::ThinkingStart,
                StreamEventType::ThinkingDelta,
                StreamEventType::ThinkingComplete,
                StreamEventType::TextStart,
                StreamEventType::TextDelta,
                StreamEventType::TextComplete,
                StreamEventType::StreamEnd,
            ]
        );

        match events.last() {
            Some(StreamEvent::StreamEnd(end)) => {
                assert_eq!(end.finish_reason, FinishReason::Stop);
                assert_eq!(end.usage.map(|u| u.prompt_tokens), Some(10));
                assert_eq!(end.usage.map(|u| u.completion_tokens), Some(4));
            }
            other => panic!("expected stream end, got {:?}", other),
        }
    }

    #[test]
    fn test_tool_calls_finish_with_tool_calls_reason() {
        let mut decoder = ChatStreamDecoder::new("llama3.1");
        let events = decode_all(
            &mut decoder,
            &[
                r#"{"message":{"role":"assistant","content":"","tool_calls":[{"function":{"name":"get_weather","arguments":{"city":"Paris"}}}]},"done":false}"#,
                r#"{"message":{"role":"assistant","content":""},"done":true,"done_reason":"stop"}"#,
            ],
        );

        let call = events
            .iter()
            .find_map(|e| match e {
                StreamEvent::ToolCall(call) => Some(call.tool_call.clone()),
                _ => None,
            })
            .unwrap();
        assert_eq!(call.name, "get_weather");
        assert_eq!(call.arguments().unwrap()["city"], "Paris");

        assert!(matches!(
            events.last(),
            Some(StreamEvent::StreamEnd(end)) if end.finish_reason == FinishReason::ToolCalls
        ));
    }

    #[test]
    fn test_in_band_error_ends_stream() {
        let mut decoder = ChatStreamDecoder::new("missing");
        let events = decode_all(&mut decoder, &[r#"{"error":"model 'missing' not found"}"#]);

        assert_eq!(
            types(&events),
            vec![
                StreamEventType::StreamStart,
                StreamEventType::Error,
                StreamEventType::StreamEnd,
            ]
        );
        assert!(decoder.is_finished());
    }

    #[test]
    fn test_truncated_stream_still_ends() {
        let mut decoder = ChatStreamDecoder::new("llama3");
        let events = decode_all(
            &mut decoder,
            &[r#"{"message":{"role":"assistant","content":"Hi"},"done":false}"#, "not json"],
        );

        assert!(matches!(
            events.last(),
            Some(StreamEvent::StreamEnd(end)) if end.finish_reason == FinishReason::Unknown
        ));
        assert_eq!(events.iter().filter(|e| e.is_terminal()).count(), 1);
    }

    #[test]
    fn test_counters_accumulate_across_turns() {
        let mut first = ChatStreamDecoder::new("llama3");
        first.decode_line(r#"{"message":{"content":"a"},"done":true,"prompt_eval_count":5,"eval_count":2}"#);

        let mut second = ChatStreamDecoder::with_state("llama3", first.into_state());
        let events = second.decode_line(
            r#"{"message":{"content":"b"},"done":true,"prompt_eval_count":7,"eval_count":3}"#,
        );

        // stream-start is not repeated for the continued turn
        assert!(!events.iter().any(|e| e.event_type() == StreamEventType::StreamStart));
        assert_eq!(second.state().prompt_tokens(), 12);
        assert_eq!(second.state().completion_tokens(), 5);
    }
}
