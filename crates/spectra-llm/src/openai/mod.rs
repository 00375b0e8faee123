// OpenAI chat-completions stream decoding
// https://platform.openai.com/docs/api-reference/chat-streaming

mod decoder;

pub use decoder::ChatStreamDecoder;
