use futures::StreamExt;
use serde_json::{Map, Value};

use super::events::StreamEvent;
use super::EventStream;
use crate::traits::ChatRequest;
use crate::types::response::{assistant_text, assistant_tool_calls, tool_results};
use crate::types::{
    AssistantMessage, FinishReason, Message, Meta, ProviderToolCall, Response, Step, ToolCall,
    ToolResult, ToolResultMessage, Usage,
};

/// Invoked once the stream end or a fatal upstream error has been observed, with the
/// originating request, the reconstructed message history and the final response.
pub type CompletionCallback = Box<dyn FnOnce(Option<&ChatRequest>, &[Message], &Response) + Send>;

/// Rebuilds message history and a final [`Response`] from a canonical event sequence.
///
/// The collector is a pass-through decorator: [`StreamCollector::collect`] yields every
/// item unchanged and observes it afterwards, so the downstream consumer has already
/// handled an event before the collector reacts to it. Error events are forwarded like
/// any other event; presenting them is the wire adapter's job.
pub struct StreamCollector {
    request: Option<ChatRequest>,
    on_complete: Option<CompletionCallback>,

    accumulated_text: String,
    tool_calls: Vec<ToolCall>,
    tool_results: Vec<ToolResult>,
    provider_tool_calls: Vec<ProviderToolCall>,
    messages: Vec<Message>,

    meta: Meta,
    finish_reason: FinishReason,
    usage: Option<Usage>,
    additional_content: Map<String, Value>,
    response: Option<Response>,
}

impl Default for StreamCollector {
    fn default() -> Self {
        Self::new()
    }
}

impl StreamCollector {
    pub fn new() -> Self {
        Self {
            request: None,
            on_complete: None,
            accumulated_text: String::new(),
            tool_calls: Vec::new(),
            tool_results: Vec::new(),
            provider_tool_calls: Vec::new(),
            messages: Vec::new(),
            meta: Meta::default(),
            finish_reason: FinishReason::Stop,
            usage: None,
            additional_content: Map::new(),
            response: None,
        }
    }

    pub fn with_request(mut self, request: ChatRequest) -> Self {
        self.request = Some(request);
        self
    }

    pub fn on_complete<F>(mut self, callback: F) -> Self
    where
        F: FnOnce(Option<&ChatRequest>, &[Message], &Response) + Send + 'static,
    {
        self.on_complete = Some(Box::new(callback));
        self
    }

    /// Wrap `stream`, forwarding every item while accumulating state on the side
    pub fn collect(mut self, mut stream: EventStream) -> EventStream {
        Box::pin(async_stream::stream! {
            while let Some(item) = stream.next().await {
                let observed = item.as_ref().ok().cloned();
                let failed = item.is_err();
                yield item;
                match observed {
                    Some(event) => self.observe(&event),
                    None if failed => self.fail(),
                    None => {}
                }
            }
        })
    }

    /// Feed one event into the accumulators
    pub fn observe(&mut self, event: &StreamEvent) {
        match event {
            StreamEvent::TextStart(_) => self.finalize_current_message(),
            StreamEvent::TextDelta(e) => self.accumulated_text.push_str(&e.delta),
            StreamEvent::ToolCall(e) => self.tool_calls.push(e.tool_call.clone()),
            StreamEvent::ToolResult(e) => self.tool_results.push(e.tool_result.clone()),
            StreamEvent::ProviderTool(e) => {
                // text emitted before the first provider tool keeps its place in history
                if !self.accumulated_text.is_empty() && self.provider_tool_calls.is_empty() {
                    self.finalize_current_message();
                }
                self.provider_tool_calls.push(ProviderToolCall {
                    id: e.item_id.clone(),
                    tool_type: e.tool_type.clone(),
                    status: e.status.clone(),
                    data: e.data.clone(),
                });
            }
            StreamEvent::StreamStart(e) => {
                self.meta = Meta::new(e.id.clone(), e.model.clone());
            }
            StreamEvent::StreamEnd(e) => {
                self.finish_reason = e.finish_reason;
                self.usage = e.usage;
                self.additional_content = e.additional_content.clone();
                self.handle_stream_end();
            }
            StreamEvent::TextComplete(_)
            | StreamEvent::ThinkingStart(_)
            | StreamEvent::ThinkingDelta(_)
            | StreamEvent::ThinkingComplete(_)
            | StreamEvent::ToolCallDelta(_)
            | StreamEvent::Artifact(_)
            | StreamEvent::Error(_) => {}
        }
    }

    /// Fatal upstream failure: finalize whatever was accumulated with an `Error`
    /// finish reason. No-op once a stream end has been observed.
    pub fn fail(&mut self) {
        if self.response.is_some() {
            return;
        }
        self.finish_reason = FinishReason::Error;
        self.handle_stream_end();
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    /// Final response, available once a stream end has been observed
    pub fn response(&self) -> Option<&Response> {
        self.response.as_ref()
    }

    pub fn into_messages(self) -> Vec<Message> {
        self.messages
    }

    fn finalize_current_message(&mut self) {
        if !self.accumulated_text.is_empty() || !self.tool_calls.is_empty() {
            self.messages.push(Message::Assistant(AssistantMessage::new(
                std::mem::take(&mut self.accumulated_text),
                std::mem::take(&mut self.tool_calls),
            )));
        }

        if !self.tool_results.is_empty() {
            self.messages.push(Message::Tool(ToolResultMessage::new(std::mem::take(
                &mut self.tool_results,
            ))));
        }
    }

    fn handle_stream_end(&mut self) {
        self.finalize_current_message();

        let text = assistant_text(&self.messages);
        let tool_calls = assistant_tool_calls(&self.messages);
        let tool_results = tool_results(&self.messages);
        let usage = self.usage.unwrap_or_default();

        let mut steps = Vec::new();
        if !text.is_empty()
            || !tool_calls.is_empty()
            || !tool_results.is_empty()
            || !self.provider_tool_calls.is_empty()
        {
            steps.push(Step {
                text: text.clone(),
                finish_reason: self.finish_reason,
                tool_calls: tool_calls.clone(),
                tool_results: tool_results.clone(),
                provider_tool_calls: self.provider_tool_calls.clone(),
                usage,
                meta: self.meta.clone(),
                messages: self.messages.clone(),
                additional_content: self.additional_content.clone(),
            });
        }

        let response = Response {
            steps,
            text,
            finish_reason: self.finish_reason,
            tool_calls,
            tool_results,
            usage,
            meta: self.meta.clone(),
            messages: self.messages.clone(),
            additional_content: self.additional_content.clone(),
        };

        if let Some(callback) = self.on_complete.take() {
            tracing::debug!(
                "Stream completed with {} messages, invoking completion callback",
                self.messages.len()
            );
            callback(self.request.as_ref(), &self.messages, &response);
        }

        self.response = Some(response);
    }
}
