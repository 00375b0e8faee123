use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::artifact::Artifact;

/// Tool/Function definition (sent to the provider)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Tool {
    #[serde(rename = "type")]
    pub tool_type: String, // Always "function" for now
    pub function: FunctionDefinition,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FunctionDefinition {
    pub name: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// JSON Schema for parameters
    pub parameters: Value,
}

impl Tool {
    pub fn new(name: impl Into<String>, description: impl Into<String>, parameters: Value) -> Self {
        Self {
            tool_type: "function".to_string(),
            function: FunctionDefinition {
                name: name.into(),
                description: Some(description.into()),
                parameters,
            },
        }
    }
}

/// Finalized tool call made by the model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCall {
    pub id: String,
    pub name: String,

    /// Raw JSON text of the arguments, exactly as the provider streamed it
    pub arguments: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub reasoning_id: Option<String>,
}

impl ToolCall {
    pub fn new(id: impl Into<String>, name: impl Into<String>, arguments: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            arguments: arguments.into(),
            reasoning_id: None,
        }
    }

    /// Build a call from already-structured arguments
    pub fn with_value(id: impl Into<String>, name: impl Into<String>, arguments: &Value) -> Self {
        Self::new(id, name, arguments.to_string())
    }

    pub fn with_reasoning_id(mut self, reasoning_id: impl Into<String>) -> Self {
        self.reasoning_id = Some(reasoning_id.into());
        self
    }

    /// Parse arguments into a JSON object. Empty input is an empty object.
    pub fn arguments(&self) -> Result<Map<String, Value>, serde_json::Error> {
        if self.arguments.trim().is_empty() {
            return Ok(Map::new());
        }
        serde_json::from_str(&self.arguments)
    }

    /// Parse arguments into a typed value
    pub fn parse_arguments<T: serde::de::DeserializeOwned>(&self) -> Result<T, serde_json::Error> {
        serde_json::from_str(&self.arguments)
    }
}

/// Result of running a tool, bound to the call that produced it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolResult {
    pub tool_call_id: String,
    pub tool_name: String,
    pub args: Map<String, Value>,
    pub result: Value,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_call_result_id: Option<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub artifacts: Vec<Artifact>,
}

impl ToolResult {
    pub fn new(
        tool_call_id: impl Into<String>,
        tool_name: impl Into<String>,
        args: Map<String, Value>,
        result: Value,
    ) -> Self {
        Self {
            tool_call_id: tool_call_id.into(),
            tool_name: tool_name.into(),
            args,
            result,
            tool_call_result_id: None,
            artifacts: Vec::new(),
        }
    }

    /// Bind a tool implementation's output to the call it answered
    pub fn from_output(call: &ToolCall, output: ToolOutput) -> Result<Self, serde_json::Error> {
        Ok(Self {
            tool_call_id: call.id.clone(),
            tool_name: call.name.clone(),
            args: call.arguments()?,
            result: Value::String(output.result),
            tool_call_result_id: None,
            artifacts: output.artifacts,
        })
    }

    pub fn with_artifacts(mut self, artifacts: Vec<Artifact>) -> Self {
        self.artifacts = artifacts;
        self
    }

    pub fn has_artifacts(&self) -> bool {
        !self.artifacts.is_empty()
    }
}

/// What a tool implementation returns: text plus optional artifacts
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ToolOutput {
    pub result: String,
    pub artifacts: Vec<Artifact>,
}

impl ToolOutput {
    pub fn new(result: impl Into<String>) -> Self {
        Self {
            result: result.into(),
            artifacts: Vec::new(),
        }
    }

    pub fn with_artifact(mut self, artifact: Artifact) -> Self {
        self.artifacts.push(artifact);
        self
    }

    pub fn has_artifacts(&self) -> bool {
        !self.artifacts.is_empty()
    }
}

impl From<String> for ToolOutput {
    fn from(result: String) -> Self {
        Self::new(result)
    }
}

impl From<&str> for ToolOutput {
    fn from(result: &str) -> Self {
        Self::new(result)
    }
}

/// Provider-native tool invocation (web search, code interpreter, ...)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProviderToolCall {
    pub id: String,
    #[serde(rename = "type")]
    pub tool_type: String,
    pub status: String,
    #[serde(default)]
    pub data: Map<String, Value>,
}
