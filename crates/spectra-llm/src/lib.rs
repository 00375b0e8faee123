pub mod buffer_utils;
pub mod error;
pub mod ollama;
pub mod openai;
pub mod streaming;
pub mod testing;
pub mod traits;
pub mod types;

pub use error::{Result, SpectraError};
pub use traits::{ChatOptions, ChatRequest, StreamingClient};

pub use streaming::{
    CompletionCallback, EventStream, PendingToolCall, StreamCollector, StreamEvent,
    StreamEventType, StreamState,
};
pub use ollama::{OllamaClient, OllamaStreamState};
pub use types::{
    Artifact, AssistantMessage, FinishReason, Message, Meta, ModerationResponse, ModerationResult,
    ProviderToolCall, Response, Step, Tool, ToolCall, ToolOutput, ToolResult, ToolResultMessage,
    Usage,
};
