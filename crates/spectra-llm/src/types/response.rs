use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::message::Message;
use super::tool::{ProviderToolCall, ToolCall, ToolResult};
use super::usage::{FinishReason, Meta, Usage};

/// One model turn (e.g. before or after a tool call)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Step {
    pub text: String,
    pub finish_reason: FinishReason,
    pub tool_calls: Vec<ToolCall>,
    pub tool_results: Vec<ToolResult>,
    pub provider_tool_calls: Vec<ProviderToolCall>,
    pub usage: Usage,
    pub meta: Meta,
    pub messages: Vec<Message>,
    #[serde(default)]
    pub additional_content: Map<String, Value>,
}

/// Final result of a text request, assembled from one or more steps
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Response {
    pub steps: Vec<Step>,
    pub text: String,
    pub finish_reason: FinishReason,
    pub tool_calls: Vec<ToolCall>,
    pub tool_results: Vec<ToolResult>,
    /// Last-known usage, not a sum over steps
    pub usage: Usage,
    pub meta: Meta,
    pub messages: Vec<Message>,
    #[serde(default)]
    pub additional_content: Map<String, Value>,
}

impl Response {
    /// Usage summed over every step
    pub fn total_usage(&self) -> Usage {
        self.steps
            .iter()
            .fold(Usage::default(), |total, step| total + step.usage)
    }
}

/// Concatenated text of every assistant message, in order
pub fn assistant_text(messages: &[Message]) -> String {
    messages
        .iter()
        .filter_map(Message::as_assistant)
        .map(|m| m.content.as_str())
        .collect()
}

/// Tool calls of every assistant message, in order
pub fn assistant_tool_calls(messages: &[Message]) -> Vec<ToolCall> {
    messages
        .iter()
        .filter_map(Message::as_assistant)
        .flat_map(|m| m.tool_calls.iter().cloned())
        .collect()
}

/// Tool results of every tool message, in order
pub fn tool_results(messages: &[Message]) -> Vec<ToolResult> {
    messages
        .iter()
        .filter_map(Message::as_tool_results)
        .flat_map(|m| m.tool_results.iter().cloned())
        .collect()
}
