use serde::Deserialize;
use serde_json::Value;

use crate::buffer_utils::{is_done_marker, sse_data, LineDecoder};
use crate::streaming::{
    new_event_id, now, ErrorEvent, PendingToolCall, StreamEndEvent, StreamEvent, StreamStartEvent,
    StreamState, TextCompleteEvent, TextDeltaEvent, TextStartEvent, ThinkingCompleteEvent,
    ThinkingEvent, ThinkingStartEvent, ToolCallDeltaEvent, ToolCallEvent,
};
use crate::types::{FinishReason, Usage};

const PROVIDER: &str = "openai";

#[derive(Debug, Deserialize)]
struct ChatStreamChunk {
    #[serde(default)]
    id: Option<String>,
    #[serde(default)]
    model: Option<String>,
    #[serde(default)]
    choices: Vec<StreamChoice>,
    #[serde(default)]
    usage: Option<ChunkUsage>,
    #[serde(default)]
    error: Option<ChunkError>,
}

#[derive(Debug, Deserialize)]
struct StreamChoice {
    #[serde(default)]
    delta: Delta,
    #[serde(default)]
    finish_reason: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct Delta {
    #[serde(default)]
    content: Option<String>,
    #[serde(default)]
    reasoning_content: Option<String>,
    #[serde(default)]
    tool_calls: Option<Vec<ToolCallDelta>>,
}

#[derive(Debug, Deserialize)]
struct ToolCallDelta {
    index: u32,
    #[serde(default)]
    id: Option<String>,
    #[serde(default)]
    function: Option<FunctionDelta>,
}

#[derive(Debug, Deserialize)]
struct FunctionDelta {
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    arguments: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ChunkUsage {
    prompt_tokens: u32,
    completion_tokens: u32,
    #[serde(default)]
    prompt_tokens_details: Option<PromptTokensDetails>,
    #[serde(default)]
    completion_tokens_details: Option<CompletionTokensDetails>,
}

#[derive(Debug, Deserialize)]
struct PromptTokensDetails {
    #[serde(default)]
    cached_tokens: Option<u32>,
}

#[derive(Debug, Deserialize)]
struct CompletionTokensDetails {
    #[serde(default)]
    reasoning_tokens: Option<u32>,
}

#[derive(Debug, Deserialize)]
struct ChunkError {
    message: String,
    #[serde(default, rename = "type")]
    error_type: Option<String>,
    #[serde(default)]
    code: Option<Value>,
}

impl ChunkUsage {
    fn to_usage(&self) -> Usage {
        let mut usage = Usage::new(self.prompt_tokens, self.completion_tokens);
        if let Some(cached) = self.prompt_tokens_details.as_ref().and_then(|d| d.cached_tokens) {
            usage = usage.with_cache_read_input_tokens(cached);
        }
        if let Some(reasoning) = self
            .completion_tokens_details
            .as_ref()
            .and_then(|d| d.reasoning_tokens)
        {
            usage = usage.with_thought_tokens(reasoning);
        }
        usage
    }
}

/// Decoder for OpenAI chat-completions SSE streams.
///
/// Tool-call fragments are merged per provider index and surface as one
/// `tool-call-delta` per argument fragment plus one `tool-call` per finished
/// call, right before the stream end. The finish reason and the trailing usage
/// chunk are held until `[DONE]` (or the end of the transport).
pub struct ChatStreamDecoder {
    state: StreamState,
    model: String,
    block_index: u32,
    finished: bool,
}

impl ChatStreamDecoder {
    pub fn new(model: impl Into<String>) -> Self {
        Self {
            state: StreamState::new(),
            model: model.into(),
            block_index: 0,
            finished: false,
        }
    }

    pub fn state(&self) -> &StreamState {
        &self.state
    }

    fn ensure_stream_started(&mut self, chunk: &ChatStreamChunk, events: &mut Vec<StreamEvent>) {
        if !self.state.should_emit_stream_start() {
            return;
        }
        let model = chunk.model.clone().unwrap_or_else(|| self.model.clone());
        let message_id = chunk.id.clone().unwrap_or_else(new_event_id);
        self.state
            .with_model(model.as_str())
            .with_provider(PROVIDER)
            .with_message_id(message_id)
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

    fn apply_tool_call_deltas(&mut self, deltas: Vec<ToolCallDelta>, events: &mut Vec<StreamEvent>) {
        if self.state.current_block_type().is_some() {
            self.close_block(events);
        }

        for delta in deltas {
            let mut patch = PendingToolCall::new();
            if let Some(id) = delta.id {
                patch = patch.with_id(id);
            }
            let (name, arguments) = match delta.function {
                Some(function) => (function.name, function.arguments),
                None => (None, None),
            };
            if let Some(name) = name {
                patch = patch.with_name(name);
            }
            self.state.update_tool_call(delta.index, patch);

            let Some(fragment) = arguments.filter(|a| !a.is_empty()) else {
                continue;
            };
            self.state.append_tool_call_input(delta.index, &fragment);

            let (tool_id, tool_name) = self
                .state
                .tool_call(delta.index)
                .map(|call| {
                    (
                        call.id.clone().unwrap_or_default(),
                        call.name.clone().unwrap_or_default(),
                    )
                })
                .unwrap_or_default();
            events.push(
                ToolCallDeltaEvent::new(
                    new_event_id(),
                    now(),
                    tool_id,
                    tool_name,
                    fragment,
                    self.state.message_id(),
                )
                .into(),
            );
        }
    }

    fn end_stream(&mut self, events: &mut Vec<StreamEvent>) {
        self.close_block(events);

        for (index, pending) in self.state.tool_calls() {
            match pending.to_tool_call() {
                Some(tool_call) => events.push(
                    ToolCallEvent::new(new_event_id(), now(), tool_call, self.state.message_id())
                        .into(),
                ),
                None => tracing::warn!("Dropping tool call {} without id or name", index),
            }
        }

        let finish_reason = self.state.finish_reason().unwrap_or(FinishReason::Unknown);
        let mut end = StreamEndEvent::new(new_event_id(), now(), finish_reason)
            .with_citations(self.state.citations().to_vec());
        if let Some(usage) = self.state.usage() {
            end = end.with_usage(*usage);
        }
        events.push(end.into());

        self.state.reset();
        self.finished = true;
    }

    fn fail(&mut self, error: ChunkError, events: &mut Vec<StreamEvent>) {
        let error_type = error.error_type.unwrap_or_else(|| "provider_error".to_string());
        let recoverable = matches!(error_type.as_str(), "server_error" | "rate_limit_exceeded");
        let mut event = ErrorEvent::new(new_event_id(), now(), error_type, error.message, recoverable);
        if let Some(code) = error.code.filter(|c| !c.is_null()) {
            event.metadata.insert("code".to_string(), code);
        }
        events.push(event.into());

        self.state.with_finish_reason(FinishReason::Error);
        self.end_stream(events);
    }
}

impl LineDecoder for ChatStreamDecoder {
    fn decode_line(&mut self, line: &str) -> Vec<StreamEvent> {
        let mut events = Vec::new();
        let Some(data) = sse_data(line) else {
            return events;
        };

        if is_done_marker(data) {
            self.end_stream(&mut events);
            return events;
        }

        let chunk: ChatStreamChunk = match serde_json::from_str(data) {
            Ok(chunk) => chunk,
            Err(e) => {
                tracing::warn!("Skipping unparseable OpenAI chunk: {}", e);
                return events;
            }
        };

        self.ensure_stream_started(&chunk, &mut events);

        if let Some(error) = chunk.error {
            self.fail(error, &mut events);
            return events;
        }

        if let Some(usage) = &chunk.usage {
            self.state.with_usage(usage.to_usage());
        }

        for choice in chunk.choices {
            if let Some(reasoning) = choice.delta.reasoning_content.filter(|r| !r.is_empty()) {
                self.open_thinking(&mut events);
                self.state.append_thinking(&reasoning);
                events.push(
                    ThinkingEvent::new(new_event_id(), now(), reasoning, self.state.reasoning_id())
                        .into(),
                );
            }

            if let Some(content) = choice.delta.content.filter(|c| !c.is_empty()) {
                self.open_text(&mut events);
                self.state.append_text(&content);
                events.push(
                    TextDeltaEvent::new(new_event_id(), now(), content, self.state.message_id())
                        .into(),
                );
            }

            if let Some(deltas) = choice.delta.tool_calls {
                self.apply_tool_call_deltas(deltas, &mut events);
            }

            if let Some(reason) = choice.finish_reason {
                self.close_block(&mut events);
                self.state.with_finish_reason(map_finish_reason(&reason));
            }
        }

        events
    }

    fn finish(&mut self) -> Vec<StreamEvent> {
        let mut events = Vec::new();
        if !self.finished {
            tracing::warn!("OpenAI stream ended without [DONE]");
            self.end_stream(&mut events);
        }
        events
    }

    fn is_finished(&self) -> bool {
        self.finished
    }
}

fn map_finish_reason(reason: &str) -> FinishReason {
    match reason {
        "stop" => FinishReason::Stop,
        "length" => FinishReason::Length,
        "content_filter" => FinishReason::ContentFilter,
        "tool_calls" | "function_call" => FinishReason::ToolCalls,
        _ => FinishReason::Other,
    }
}
