use serde_json::{Map, Value};

use crate::types::{FinishReason, MessagePartWithCitations, ToolCall, Usage};

/// Partially streamed tool call, keyed by its provider index in [`StreamState`]
#[derive(Debug, Clone, PartialEq, Default)]
pub struct PendingToolCall {
    pub id: Option<String>,
    pub name: Option<String>,
    pub input: Option<String>,
    pub reasoning_id: Option<String>,
    /// Provider-specific keys (status, result, ...)
    pub extra: Map<String, Value>,
}

impl PendingToolCall {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_input(mut self, input: impl Into<String>) -> Self {
        self.input = Some(input.into());
        self
    }

    pub fn with_reasoning_id(mut self, reasoning_id: impl Into<String>) -> Self {
        self.reasoning_id = Some(reasoning_id.into());
        self
    }

    pub fn with_extra(mut self, key: impl Into<String>, value: Value) -> Self {
        self.extra.insert(key.into(), value);
        self
    }

    /// Shallow merge: every field set on `patch` overwrites ours
    fn merge(&mut self, patch: PendingToolCall) {
        if patch.id.is_some() {
            self.id = patch.id;
        }
        if patch.name.is_some() {
            self.name = patch.name;
        }
        if patch.input.is_some() {
            self.input = patch.input;
        }
        if patch.reasoning_id.is_some() {
            self.reasoning_id = patch.reasoning_id;
        }
        self.extra.extend(patch.extra);
    }

    /// Finalize into a [`ToolCall`] once both id and name are known
    pub fn to_tool_call(&self) -> Option<ToolCall> {
        let mut call = ToolCall::new(
            self.id.clone()?,
            self.name.clone()?,
            self.input.clone().unwrap_or_default(),
        );
        call.reasoning_id = self.reasoning_id.clone();
        Some(call)
    }
}

/// Mutable accumulator for one in-flight stream turn.
///
/// Owned by the decoder that produces events for one stream. Mutators return
/// `&mut Self` so decoder call sites can chain updates, and none of them can
/// fail.
#[derive(Debug, Clone, Default)]
pub struct StreamState {
    message_id: String,
    reasoning_id: String,
    model: String,
    provider: String,
    metadata: Option<Map<String, Value>>,

    stream_started: bool,
    text_started: bool,
    thinking_started: bool,

    current_text: String,
    current_thinking: String,

    current_block_index: Option<u32>,
    current_block_type: Option<String>,

    // Insertion-ordered; providers may announce indices out of order
    tool_calls: Vec<(u32, PendingToolCall)>,
    citations: Vec<MessagePartWithCitations>,

    usage: Option<Usage>,
    finish_reason: Option<FinishReason>,
}

impl StreamState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_message_id(&mut self, message_id: impl Into<String>) -> &mut Self {
        self.message_id = message_id.into();
        self
    }

    pub fn with_reasoning_id(&mut self, reasoning_id: impl Into<String>) -> &mut Self {
        self.reasoning_id = reasoning_id.into();
        self
    }

    pub fn with_model(&mut self, model: impl Into<String>) -> &mut Self {
        self.model = model.into();
        self
    }

    pub fn with_provider(&mut self, provider: impl Into<String>) -> &mut Self {
        self.provider = provider.into();
        self
    }

    pub fn with_metadata(&mut self, metadata: Option<Map<String, Value>>) -> &mut Self {
        self.metadata = metadata;
        self
    }

    pub fn mark_stream_started(&mut self) -> &mut Self {
        self.stream_started = true;
        self
    }

    pub fn mark_text_started(&mut self) -> &mut Self {
        self.text_started = true;
        self
    }

    pub fn mark_thinking_started(&mut self) -> &mut Self {
        self.thinking_started = true;
        self
    }

    pub fn append_text(&mut self, text: &str) -> &mut Self {
        self.current_text.push_str(text);
        self
    }

    pub fn append_thinking(&mut self, thinking: &str) -> &mut Self {
        self.current_thinking.push_str(thinking);
        self
    }

    pub fn with_text(&mut self, text: impl Into<String>) -> &mut Self {
        self.current_text = text.into();
        self
    }

    pub fn with_thinking(&mut self, thinking: impl Into<String>) -> &mut Self {
        self.current_thinking = thinking.into();
        self
    }

    pub fn with_block_context(&mut self, index: u32, block_type: impl Into<String>) -> &mut Self {
        self.current_block_index = Some(index);
        self.current_block_type = Some(block_type.into());
        self
    }

    /// Replace the whole tool call at `index`
    pub fn add_tool_call(&mut self, index: u32, tool_call: PendingToolCall) -> &mut Self {
        match self.tool_call_mut(index) {
            Some(existing) => *existing = tool_call,
            None => self.tool_calls.push((index, tool_call)),
        }
        self
    }

    /// Append a raw argument fragment, creating the call if `index` is new
    pub fn append_tool_call_input(&mut self, index: u32, fragment: &str) -> &mut Self {
        match self.tool_call_mut(index) {
            Some(existing) => existing
                .input
                .get_or_insert_with(String::new)
                .push_str(fragment),
            None => self
                .tool_calls
                .push((index, PendingToolCall::new().with_input(fragment))),
        }
        self
    }

    /// Shallow-merge `patch` into the call at `index`, creating it if absent
    pub fn update_tool_call(&mut self, index: u32, patch: PendingToolCall) -> &mut Self {
        match self.tool_call_mut(index) {
            Some(existing) => existing.merge(patch),
            None => self.tool_calls.push((index, patch)),
        }
        self
    }

    pub fn add_citation(&mut self, citation: MessagePartWithCitations) -> &mut Self {
        self.citations.push(citation);
        self
    }

    pub fn with_usage(&mut self, usage: Usage) -> &mut Self {
        self.usage = Some(usage);
        self
    }

    pub fn with_finish_reason(&mut self, finish_reason: FinishReason) -> &mut Self {
        self.finish_reason = Some(finish_reason);
        self
    }

    /// Turn boundary: clears everything but the stream-started flag, usage and finish reason
    pub fn reset(&mut self) -> &mut Self {
        self.message_id.clear();
        self.reasoning_id.clear();
        self.model.clear();
        self.provider.clear();
        self.metadata = None;
        self.text_started = false;
        self.thinking_started = false;
        self.current_text.clear();
        self.current_thinking.clear();
        self.current_block_index = None;
        self.current_block_type = None;
        self.tool_calls.clear();
        self.citations.clear();
        self
    }

    /// Message boundary: clears message, text and thinking only
    pub fn reset_text_state(&mut self) -> &mut Self {
        self.message_id.clear();
        self.text_started = false;
        self.thinking_started = false;
        self.current_text.clear();
        self.current_thinking.clear();
        self
    }

    /// Block boundary: clears block context only
    pub fn reset_block(&mut self) -> &mut Self {
        self.current_block_index = None;
        self.current_block_type = None;
        self
    }

    /// Close the open block: its started flag drops so the next block of the
    /// same kind gets a fresh start event
    pub fn finish_block(&mut self) -> &mut Self {
        match self.current_block_type.as_deref() {
            Some("text") => self.text_started = false,
            Some("thinking") => self.thinking_started = false,
            _ => {}
        }
        self.reset_block()
    }

    pub fn should_emit_stream_start(&self) -> bool {
        !self.stream_started
    }

    pub fn should_emit_text_start(&self) -> bool {
        !self.text_started
    }

    pub fn should_emit_thinking_start(&self) -> bool {
        !self.thinking_started
    }

    pub fn message_id(&self) -> &str {
        &self.message_id
    }

    pub fn reasoning_id(&self) -> &str {
        &self.reasoning_id
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn provider(&self) -> &str {
        &self.provider
    }

    pub fn metadata(&self) -> Option<&Map<String, Value>> {
        self.metadata.as_ref()
    }

    pub fn has_stream_started(&self) -> bool {
        self.stream_started
    }

    pub fn has_text_started(&self) -> bool {
        self.text_started
    }

    pub fn has_thinking_started(&self) -> bool {
        self.thinking_started
    }

    pub fn current_text(&self) -> &str {
        &self.current_text
    }

    pub fn current_thinking(&self) -> &str {
        &self.current_thinking
    }

    pub fn current_block_index(&self) -> Option<u32> {
        self.current_block_index
    }

    pub fn current_block_type(&self) -> Option<&str> {
        self.current_block_type.as_deref()
    }

    pub fn tool_calls(&self) -> &[(u32, PendingToolCall)] {
        &self.tool_calls
    }

    pub fn tool_call(&self, index: u32) -> Option<&PendingToolCall> {
        self.tool_calls
            .iter()
            .find(|(i, _)| *i == index)
            .map(|(_, call)| call)
    }

    pub fn has_tool_calls(&self) -> bool {
        !self.tool_calls.is_empty()
    }

    pub fn citations(&self) -> &[MessagePartWithCitations] {
        &self.citations
    }

    pub fn usage(&self) -> Option<&Usage> {
        self.usage.as_ref()
    }

    pub fn finish_reason(&self) -> Option<FinishReason> {
        self.finish_reason
    }

    fn tool_call_mut(&mut self, index: u32) -> Option<&mut PendingToolCall> {
        self.tool_calls
            .iter_mut()
            .find(|(i, _)| *i == index)
            .map(|(_, call)| call)
    }
}
