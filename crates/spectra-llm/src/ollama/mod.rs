// Ollama provider: NDJSON chat stream decoding and a thin streaming client

mod client;
mod decoder;
mod state;

pub use client::{OllamaClient, DEFAULT_BASE_URL};
pub use decoder::ChatStreamDecoder;
pub use state::OllamaStreamState;
