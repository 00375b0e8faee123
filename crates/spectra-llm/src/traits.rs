use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::streaming::EventStream;
use crate::types::{Message, Tool};

/// Any backend that can turn a chat request into a canonical event stream.
///
/// Implementations decode their provider's wire format behind this seam; consumers
/// (collector, wire adapters) only ever see [`StreamEvent`](crate::StreamEvent)s.
#[async_trait]
pub trait StreamingClient: Send + Sync {
    /// Provider name reported on `stream-start`
    fn provider(&self) -> &str;

    async fn stream(&self, request: ChatRequest) -> Result<EventStream>;
}

/// The request a stream was produced for, handed back to completion callbacks
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatRequest {
    pub model: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provider: Option<String>,
    pub messages: Vec<Message>,
    #[serde(default)]
    pub options: ChatOptions,
}

impl ChatRequest {
    pub fn new(model: impl Into<String>, messages: Vec<Message>) -> Self {
        Self {
            model: model.into(),
            provider: None,
            messages,
            options: ChatOptions::default(),
        }
    }

    pub fn with_provider(mut self, provider: impl Into<String>) -> Self {
        self.provider = Some(provider.into());
        self
    }

    pub fn with_options(mut self, options: ChatOptions) -> Self {
        self.options = options;
        self
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ChatOptions {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tools: Option<Vec<Tool>>,
}

impl ChatOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn temperature(mut self, temp: f32) -> Self {
        self.temperature = Some(temp);
        self
    }

    pub fn max_tokens(mut self, tokens: u32) -> Self {
        self.max_tokens = Some(tokens);
        self
    }

    pub fn tools(mut self, tools: Vec<Tool>) -> Self {
        self.tools = Some(tools);
        self
    }
}
