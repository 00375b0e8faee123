use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::tool::{ToolCall, ToolResult};

/// Assistant turn: text and the tool calls emitted alongside it
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct AssistantMessage {
    pub content: String,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tool_calls: Vec<ToolCall>,

    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub additional_content: Map<String, Value>,
}

impl AssistantMessage {
    pub fn new(content: impl Into<String>, tool_calls: Vec<ToolCall>) -> Self {
        Self {
            content: content.into(),
            tool_calls,
            additional_content: Map::new(),
        }
    }
}

/// Tool results fed back to the model after an assistant turn
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ToolResultMessage {
    pub tool_results: Vec<ToolResult>,
}

impl ToolResultMessage {
    pub fn new(tool_results: Vec<ToolResult>) -> Self {
        Self { tool_results }
    }
}

/// Provider-agnostic conversation message
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "role", rename_all = "lowercase")]
pub enum Message {
    /// System prompt (instructions)
    System { content: String },

    /// User/Human message
    User { content: String },

    /// Assistant/AI message
    Assistant(AssistantMessage),

    /// Tool result message
    Tool(ToolResultMessage),
}

impl Message {
    pub fn system(content: impl Into<String>) -> Self {
        Self::System {
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::User {
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::Assistant(AssistantMessage::new(content, Vec::new()))
    }

    pub fn assistant_with_tools(content: impl Into<String>, tool_calls: Vec<ToolCall>) -> Self {
        Self::Assistant(AssistantMessage::new(content, tool_calls))
    }

    pub fn tool_results(tool_results: Vec<ToolResult>) -> Self {
        Self::Tool(ToolResultMessage::new(tool_results))
    }

    /// Get role as string
    pub fn role(&self) -> &str {
        match self {
            Self::System { .. } => "system",
            Self::User { .. } => "user",
            Self::Assistant(_) => "assistant",
            Self::Tool(_) => "tool",
        }
    }

    pub fn as_assistant(&self) -> Option<&AssistantMessage> {
        match self {
            Self::Assistant(message) => Some(message),
            _ => None,
        }
    }

    pub fn as_tool_results(&self) -> Option<&ToolResultMessage> {
        match self {
            Self::Tool(message) => Some(message),
            _ => None,
        }
    }
}
