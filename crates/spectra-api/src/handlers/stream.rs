use axum::{extract::State, response::Response, Json};
use serde::Deserialize;
use std::sync::Arc;
use utoipa::ToSchema;

use spectra_llm::{ChatOptions, ChatRequest, Message, StreamCollector};

use crate::adapters::{DataProtocolAdapter, EventsCallback, SseAdapter, WireAdapter};
use crate::{
    error::{ApiError, ApiResult},
    state::AppState,
};

#[derive(Debug, Deserialize, ToSchema)]
pub struct ChatStreamRequest {
    /// Falls back to the configured default model
    #[serde(default)]
    pub model: Option<String>,
    pub messages: Vec<ChatMessageInput>,
    #[serde(default)]
    pub temperature: Option<f32>,
    #[serde(default)]
    pub max_tokens: Option<u32>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct ChatMessageInput {
    /// One of `system`, `user`, `assistant`
    pub role: String,
    pub content: String,
}

impl ChatMessageInput {
    fn to_message(&self) -> ApiResult<Message> {
        match self.role.as_str() {
            "system" => Ok(Message::system(self.content.as_str())),
            "user" => Ok(Message::user(self.content.as_str())),
            "assistant" => Ok(Message::assistant(self.content.as_str())),
            other => Err(ApiError::BadRequest(format!("Unsupported role: {}", other))),
        }
    }
}

impl ChatStreamRequest {
    pub fn into_chat_request(self, default_model: &str) -> ApiResult<ChatRequest> {
        if self.messages.is_empty() {
            return Err(ApiError::BadRequest("messages must not be empty".to_string()));
        }

        let messages = self
            .messages
            .iter()
            .map(ChatMessageInput::to_message)
            .collect::<ApiResult<Vec<_>>>()?;

        let mut options = ChatOptions::new();
        if let Some(temperature) = self.temperature {
            options = options.temperature(temperature);
        }
        if let Some(max_tokens) = self.max_tokens {
            options = options.max_tokens(max_tokens);
        }

        let model = self
            .model
            .filter(|m| !m.trim().is_empty())
            .unwrap_or_else(|| default_model.to_string());

        Ok(ChatRequest::new(model, messages).with_options(options))
    }
}

/// Stream a chat completion as Server-Sent Events
#[utoipa::path(
    post,
    path = "/chat/sse",
    request_body = ChatStreamRequest,
    responses(
        (status = 200, description = "Event stream", content_type = "text/event-stream"),
        (status = 400, description = "Invalid request"),
        (status = 502, description = "Provider rejected the request")
    ),
    tag = "chat"
)]
pub async fn stream_sse(
    State(state): State<Arc<AppState>>,
    Json(req): Json<ChatStreamRequest>,
) -> ApiResult<Response> {
    stream_with(&state, req, SseAdapter).await
}

/// Stream a chat completion in the UI message stream data protocol
#[utoipa::path(
    post,
    path = "/chat/data",
    request_body = ChatStreamRequest,
    responses(
        (status = 200, description = "Data protocol stream", content_type = "text/plain"),
        (status = 400, description = "Invalid request"),
        (status = 502, description = "Provider rejected the request")
    ),
    tag = "chat"
)]
pub async fn stream_data(
    State(state): State<Arc<AppState>>,
    Json(req): Json<ChatStreamRequest>,
) -> ApiResult<Response> {
    stream_with(&state, req, DataProtocolAdapter).await
}

async fn stream_with<A: WireAdapter>(
    state: &AppState,
    req: ChatStreamRequest,
    adapter: A,
) -> ApiResult<Response> {
    let request = req.into_chat_request(&state.config.ollama.model)?;
    tracing::info!(
        model = %request.model,
        provider = %state.client.provider(),
        messages = request.messages.len(),
        "Starting chat stream"
    );

    let events = state.client.stream(request.clone()).await?;

    let events = StreamCollector::new()
        .with_request(request.clone())
        .on_complete(|_, messages, response| {
            tracing::info!(
                model = %response.meta.model,
                finish_reason = %response.finish_reason.as_str(),
                steps = response.steps.len(),
                messages = messages.len(),
                prompt_tokens = response.usage.prompt_tokens,
                completion_tokens = response.usage.completion_tokens,
                "Chat stream completed"
            );
        })
        .collect(events);

    let written: EventsCallback = Box::new(|_, events| {
        tracing::debug!(events = events.len(), "Stream written");
    });

    Ok(adapter.into_response(
        events,
        Some(request),
        Some(written),
        state.config.stream.channel_capacity,
    ))
}
