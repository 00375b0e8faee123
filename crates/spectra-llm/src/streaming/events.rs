use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

use super::{new_event_id, now};
use crate::error::{Result, SpectraError};
use crate::types::{Artifact, FinishReason, MessagePartWithCitations, ToolCall, ToolResult, Usage};

/// Discriminator of every canonical stream event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StreamEventType {
    StreamStart,
    TextStart,
    TextDelta,
    TextComplete,
    ThinkingStart,
    ThinkingDelta,
    ThinkingComplete,
    ToolCall,
    ToolCallDelta,
    ToolResult,
    ProviderTool,
    Artifact,
    Error,
    StreamEnd,
}

impl StreamEventType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::StreamStart => "stream-start",
            Self::TextStart => "text-start",
            Self::TextDelta => "text-delta",
            Self::TextComplete => "text-complete",
            Self::ThinkingStart => "thinking-start",
            Self::ThinkingDelta => "thinking-delta",
            Self::ThinkingComplete => "thinking-complete",
            Self::ToolCall => "tool-call",
            Self::ToolCallDelta => "tool-call-delta",
            Self::ToolResult => "tool-result",
            Self::ProviderTool => "provider-tool-event",
            Self::Artifact => "artifact",
            Self::Error => "error",
            Self::StreamEnd => "stream-end",
        }
    }
}

impl std::fmt::Display for StreamEventType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.pad(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StreamStartEvent {
    pub id: String,
    pub timestamp: i64,
    pub model: String,
    pub provider: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Map<String, Value>>,
}

impl StreamStartEvent {
    pub fn new(
        id: impl Into<String>,
        timestamp: i64,
        model: impl Into<String>,
        provider: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            timestamp,
            model: model.into(),
            provider: provider.into(),
            metadata: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextStartEvent {
    pub id: String,
    pub timestamp: i64,
    pub message_id: String,
}

impl TextStartEvent {
    pub fn new(id: impl Into<String>, timestamp: i64, message_id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            timestamp,
            message_id: message_id.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextDeltaEvent {
    pub id: String,
    pub timestamp: i64,
    pub delta: String,
    pub message_id: String,
}

impl TextDeltaEvent {
    pub fn new(
        id: impl Into<String>,
        timestamp: i64,
        delta: impl Into<String>,
        message_id: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            timestamp,
            delta: delta.into(),
            message_id: message_id.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextCompleteEvent {
    pub id: String,
    pub timestamp: i64,
    pub message_id: String,
}

impl TextCompleteEvent {
    pub fn new(id: impl Into<String>, timestamp: i64, message_id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            timestamp,
            message_id: message_id.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ThinkingStartEvent {
    pub id: String,
    pub timestamp: i64,
    pub reasoning_id: String,
}

impl ThinkingStartEvent {
    pub fn new(id: impl Into<String>, timestamp: i64, reasoning_id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            timestamp,
            reasoning_id: reasoning_id.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ThinkingEvent {
    pub id: String,
    pub timestamp: i64,
    pub delta: String,
    pub reasoning_id: String,
}

impl ThinkingEvent {
    pub fn new(
        id: impl Into<String>,
        timestamp: i64,
        delta: impl Into<String>,
        reasoning_id: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            timestamp,
            delta: delta.into(),
            reasoning_id: reasoning_id.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ThinkingCompleteEvent {
    pub id: String,
    pub timestamp: i64,
    pub reasoning_id: String,
}

impl ThinkingCompleteEvent {
    pub fn new(id: impl Into<String>, timestamp: i64, reasoning_id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            timestamp,
            reasoning_id: reasoning_id.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCallEvent {
    pub id: String,
    pub timestamp: i64,
    pub tool_call: ToolCall,
    pub message_id: String,
}

impl ToolCallEvent {
    pub fn new(
        id: impl Into<String>,
        timestamp: i64,
        tool_call: ToolCall,
        message_id: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            timestamp,
            tool_call,
            message_id: message_id.into(),
        }
    }

    fn to_data(&self) -> Result<Value> {
        let arguments = self
            .tool_call
            .arguments()
            .map_err(|e| SpectraError::Encoding(e.to_string()))?;

        let mut data = json!({
            "id": self.id,
            "timestamp": self.timestamp,
            "tool_id": self.tool_call.id,
            "tool_name": self.tool_call.name,
            "arguments": arguments,
            "message_id": self.message_id,
        });
        if let (Some(reasoning_id), Some(obj)) = (&self.tool_call.reasoning_id, data.as_object_mut()) {
            obj.insert("reasoning_id".to_string(), json!(reasoning_id));
        }
        Ok(data)
    }
}

/// Incremental raw-argument JSON fragment for a tool call still being streamed
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCallDeltaEvent {
    pub id: String,
    pub timestamp: i64,
    pub tool_id: String,
    pub tool_name: String,
    pub delta: String,
    pub message_id: String,
}

impl ToolCallDeltaEvent {
    pub fn new(
        id: impl Into<String>,
        timestamp: i64,
        tool_id: impl Into<String>,
        tool_name: impl Into<String>,
        delta: impl Into<String>,
        message_id: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            timestamp,
            tool_id: tool_id.into(),
            tool_name: tool_name.into(),
            delta: delta.into(),
            message_id: message_id.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolResultEvent {
    pub id: String,
    pub timestamp: i64,
    pub tool_result: ToolResult,
    pub message_id: String,
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ToolResultEvent {
    pub fn new(
        id: impl Into<String>,
        timestamp: i64,
        tool_result: ToolResult,
        message_id: impl Into<String>,
        success: bool,
    ) -> Self {
        Self {
            id: id.into(),
            timestamp,
            tool_result,
            message_id: message_id.into(),
            success,
            error: None,
        }
    }

    fn to_data(&self) -> Value {
        json!({
            "id": self.id,
            "timestamp": self.timestamp,
            "tool_id": self.tool_result.tool_call_id,
            "tool_name": self.tool_result.tool_name,
            "args": self.tool_result.args,
            "result": self.tool_result.result,
            "artifacts": self.tool_result.artifacts,
            "message_id": self.message_id,
            "success": self.success,
            "error": self.error,
        })
    }
}

/// Provider-native tool activity that is not one of our own tools
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProviderToolEvent {
    pub id: String,
    pub timestamp: i64,
    pub item_id: String,
    pub tool_type: String,
    pub status: String,
    #[serde(default)]
    pub data: Map<String, Value>,
}

impl ProviderToolEvent {
    pub fn new(
        id: impl Into<String>,
        timestamp: i64,
        item_id: impl Into<String>,
        tool_type: impl Into<String>,
        status: impl Into<String>,
        data: Map<String, Value>,
    ) -> Self {
        Self {
            id: id.into(),
            timestamp,
            item_id: item_id.into(),
            tool_type: tool_type.into(),
            status: status.into(),
            data,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArtifactEvent {
    pub id: String,
    pub timestamp: i64,
    pub tool_call_id: String,
    pub tool_name: String,
    pub message_id: String,
    pub artifact: Artifact,
}

impl ArtifactEvent {
    pub fn new(
        id: impl Into<String>,
        timestamp: i64,
        artifact: Artifact,
        tool_call_id: impl Into<String>,
        tool_name: impl Into<String>,
        message_id: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            timestamp,
            tool_call_id: tool_call_id.into(),
            tool_name: tool_name.into(),
            message_id: message_id.into(),
            artifact,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorEvent {
    pub id: String,
    pub timestamp: i64,
    pub error_type: String,
    pub message: String,
    pub recoverable: bool,
    #[serde(default)]
    pub metadata: Map<String, Value>,
}

impl ErrorEvent {
    pub fn new(
        id: impl Into<String>,
        timestamp: i64,
        error_type: impl Into<String>,
        message: impl Into<String>,
        recoverable: bool,
    ) -> Self {
        Self {
            id: id.into(),
            timestamp,
            error_type: error_type.into(),
            message: message.into(),
            recoverable,
            metadata: Map::new(),
        }
    }

    /// Synthesize the in-band representation of a failure raised by the event source
    pub fn from_error(err: &SpectraError) -> Self {
        let mut event = Self::new(
            new_event_id(),
            now(),
            err.error_type(),
            err.to_string(),
            err.is_recoverable(),
        );
        if let Some(code) = err.status_code() {
            event.metadata.insert("code".to_string(), json!(code));
        }
        if let SpectraError::RateLimited {
            retry_after: Some(seconds),
            ..
        } = err
        {
            event.metadata.insert("retry_after".to_string(), json!(seconds));
        }
        event
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StreamEndEvent {
    pub id: String,
    pub timestamp: i64,
    pub finish_reason: FinishReason,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub usage: Option<Usage>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub citations: Vec<MessagePartWithCitations>,
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub additional_content: Map<String, Value>,
}

impl StreamEndEvent {
    pub fn new(id: impl Into<String>, timestamp: i64, finish_reason: FinishReason) -> Self {
        Self {
            id: id.into(),
            timestamp,
            finish_reason,
            usage: None,
            citations: Vec::new(),
            additional_content: Map::new(),
        }
    }

    pub fn with_usage(mut self, usage: Usage) -> Self {
        self.usage = Some(usage);
        self
    }

    pub fn with_citations(mut self, citations: Vec<MessagePartWithCitations>) -> Self {
        self.citations = citations;
        self
    }

    pub fn with_additional_content(mut self, key: impl Into<String>, value: Value) -> Self {
        self.additional_content.insert(key.into(), value);
        self
    }
}

/// One discrete occurrence in a model's streaming output
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum StreamEvent {
    StreamStart(StreamStartEvent),
    TextStart(TextStartEvent),
    TextDelta(TextDeltaEvent),
    TextComplete(TextCompleteEvent),
    ThinkingStart(ThinkingStartEvent),
    ThinkingDelta(ThinkingEvent),
    ThinkingComplete(ThinkingCompleteEvent),
    ToolCall(ToolCallEvent),
    ToolCallDelta(ToolCallDeltaEvent),
    ToolResult(ToolResultEvent),
    #[serde(rename = "provider-tool-event")]
    ProviderTool(ProviderToolEvent),
    Artifact(ArtifactEvent),
    Error(ErrorEvent),
    StreamEnd(StreamEndEvent),
}

impl StreamEvent {
    pub fn event_type(&self) -> StreamEventType {
        match self {
            Self::StreamStart(_) => StreamEventType::StreamStart,
            Self::TextStart(_) => StreamEventType::TextStart,
            Self::TextDelta(_) => StreamEventType::TextDelta,
            Self::TextComplete(_) => StreamEventType::TextComplete,
            Self::ThinkingStart(_) => StreamEventType::ThinkingStart,
            Self::ThinkingDelta(_) => StreamEventType::ThinkingDelta,
            Self::ThinkingComplete(_) => StreamEventType::ThinkingComplete,
            Self::ToolCall(_) => StreamEventType::ToolCall,
            Self::ToolCallDelta(_) => StreamEventType::ToolCallDelta,
            Self::ToolResult(_) => StreamEventType::ToolResult,
            Self::ProviderTool(_) => StreamEventType::ProviderTool,
            Self::Artifact(_) => StreamEventType::Artifact,
            Self::Error(_) => StreamEventType::Error,
            Self::StreamEnd(_) => StreamEventType::StreamEnd,
        }
    }

    pub fn id(&self) -> &str {
        match self {
            Self::StreamStart(e) => &e.id,
            Self::TextStart(e) => &e.id,
            Self::TextDelta(e) => &e.id,
            Self::TextComplete(e) => &e.id,
            Self::ThinkingStart(e) => &e.id,
            Self::ThinkingDelta(e) => &e.id,
            Self::ThinkingComplete(e) => &e.id,
            Self::ToolCall(e) => &e.id,
            Self::ToolCallDelta(e) => &e.id,
            Self::ToolResult(e) => &e.id,
            Self::ProviderTool(e) => &e.id,
            Self::Artifact(e) => &e.id,
            Self::Error(e) => &e.id,
            Self::StreamEnd(e) => &e.id,
        }
    }

    pub fn timestamp(&self) -> i64 {
        match self {
            Self::StreamStart(e) => e.timestamp,
            Self::TextStart(e) => e.timestamp,
            Self::TextDelta(e) => e.timestamp,
            Self::TextComplete(e) => e.timestamp,
            Self::ThinkingStart(e) => e.timestamp,
            Self::ThinkingDelta(e) => e.timestamp,
            Self::ThinkingComplete(e) => e.timestamp,
            Self::ToolCall(e) => e.timestamp,
            Self::ToolCallDelta(e) => e.timestamp,
            Self::ToolResult(e) => e.timestamp,
            Self::ProviderTool(e) => e.timestamp,
            Self::Artifact(e) => e.timestamp,
            Self::Error(e) => e.timestamp,
            Self::StreamEnd(e) => e.timestamp,
        }
    }

    /// Wire payload of the event (without the type discriminator)
    pub fn to_data(&self) -> Result<Value> {
        match self {
            Self::StreamStart(e) => encode(e),
            Self::TextStart(e) => encode(e),
            Self::TextDelta(e) => encode(e),
            Self::TextComplete(e) => encode(e),
            Self::ThinkingStart(e) => encode(e),
            Self::ThinkingDelta(e) => encode(e),
            Self::ThinkingComplete(e) => encode(e),
            Self::ToolCall(e) => e.to_data(),
            Self::ToolCallDelta(e) => encode(e),
            Self::ToolResult(e) => Ok(e.to_data()),
            Self::ProviderTool(e) => encode(e),
            Self::Artifact(e) => encode(e),
            Self::Error(e) => encode(e),
            Self::StreamEnd(e) => encode(e),
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::StreamEnd(_))
    }
}

fn encode<T: Serialize>(payload: &T) -> Result<Value> {
    serde_json::to_value(payload).map_err(|e| SpectraError::Encoding(e.to_string()))
}

macro_rules! impl_from_payload {
    ($($payload:ident => $variant:ident),* $(,)?) => {
        $(
            impl From<$payload> for StreamEvent {
                fn from(event: $payload) -> Self {
                    StreamEvent::$variant(event)
                }
            }
        )*
    };
}

impl_from_payload! {
    StreamStartEvent => StreamStart,
    TextStartEvent => TextStart,
    TextDeltaEvent => TextDelta,
    TextCompleteEvent => TextComplete,
    ThinkingStartEvent => ThinkingStart,
    ThinkingEvent => ThinkingDelta,
    ThinkingCompleteEvent => ThinkingComplete,
    ToolCallEvent => ToolCall,
    ToolCallDeltaEvent => ToolCallDelta,
    ToolResultEvent => ToolResult,
    ProviderToolEvent => ProviderTool,
    ArtifactEvent => Artifact,
    ErrorEvent => Error,
    StreamEndEvent => StreamEnd,
}
