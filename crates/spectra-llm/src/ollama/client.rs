use async_trait::async_trait;
use serde_json::{json, Map, Value};

use super::decoder::ChatStreamDecoder;
use crate::buffer_utils::decode_lines;
use crate::error::{Result, SpectraError};
use crate::streaming::EventStream;
use crate::traits::{ChatOptions, ChatRequest, StreamingClient};
use crate::types::Message;

pub const DEFAULT_BASE_URL: &str = "http://localhost:11434";

/// Streaming client for a local or remote Ollama server (HTTP direct, no SDK)
pub struct OllamaClient {
    http_client: reqwest::Client,
    base_url: String,
}

impl OllamaClient {
    pub fn new(base_url: impl Into<String>) -> Result<Self> {
        let http_client = reqwest::Client::builder().build()?;
        Ok(Self {
            http_client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn build_chat_request(&self, request: &ChatRequest) -> Result<Value> {
        let messages: Vec<Value> = request.messages.iter().flat_map(convert_message).collect();

        let mut payload = Map::new();
        payload.insert("model".to_string(), json!(request.model));
        payload.insert("messages".to_string(), Value::Array(messages));
        payload.insert("stream".to_string(), json!(true));

        let options = convert_options(&request.options);
        if !options.is_empty() {
            payload.insert("options".to_string(), Value::Object(options));
        }
        if let Some(tools) = &request.options.tools {
            payload.insert("tools".to_string(), serde_json::to_value(tools)?);
        }

        Ok(Value::Object(payload))
    }
}

#[async_trait]
impl StreamingClient for OllamaClient {
    fn provider(&self) -> &str {
        "ollama"
    }

    async fn stream(&self, request: ChatRequest) -> Result<EventStream> {
        let payload = self.build_chat_request(&request)?;

        tracing::debug!("Streaming chat from Ollama model {}", request.model);

        let response = self
            .http_client
            .post(format!("{}/api/chat", self.base_url))
            .json(&payload)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(SpectraError::from_status(status.as_u16(), error_text));
        }

        Ok(decode_lines(
            response.bytes_stream(),
            ChatStreamDecoder::new(request.model),
        ))
    }
}

fn convert_message(message: &Message) -> Vec<Value> {
    match message {
        Message::System { content } => vec![json!({ "role": "system", "content": content })],
        Message::User { content } => vec![json!({ "role": "user", "content": content })],
        Message::Assistant(assistant) => {
            let mut obj = json!({ "role": "assistant", "content": assistant.content });
            if !assistant.tool_calls.is_empty() {
                let calls: Vec<Value> = assistant
                    .tool_calls
                    .iter()
                    .map(|call| {
                        let arguments = call.arguments().map(Value::Object).unwrap_or(Value::Null);
                        json!({ "function": { "name": call.name, "arguments": arguments } })
                    })
                    .collect();
                obj["tool_calls"] = Value::Array(calls);
            }
            vec![obj]
        }
        // Ollama takes one tool message per result
        Message::Tool(results) => results
            .tool_results
            .iter()
            .map(|result| {
                let content = match &result.result {
                    Value::String(text) => text.clone(),
                    other => other.to_string(),
                };
                json!({ "role": "tool", "content": content })
            })
            .collect(),
    }
}

fn convert_options(options: &ChatOptions) -> Map<String, Value> {
    let mut converted = Map::new();
    if let Some(temperature) = options.temperature {
        converted.insert("temperature".to_string(), json!(temperature));
    }
    if let Some(max_tokens) = options.max_tokens {
        converted.insert("num_predict".to_string(), json!(max_tokens));
    }
    converted
}
