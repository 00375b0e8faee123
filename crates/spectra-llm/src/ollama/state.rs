use std::ops::{Deref, DerefMut};

use crate::streaming::StreamState;
use crate::types::Usage;

/// [`StreamState`] plus token counters that span every turn of an Ollama stream.
///
/// The counters only move through [`add_prompt_tokens`](Self::add_prompt_tokens) and
/// [`add_completion_tokens`](Self::add_completion_tokens); `reset`, `reset_text_state`
/// and `reset_block` act on the inner state only.
#[derive(Debug, Clone, Default)]
pub struct OllamaStreamState {
    inner: StreamState,
    prompt_tokens: u32,
    completion_tokens: u32,
}

impl OllamaStreamState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_prompt_tokens(&mut self, tokens: u32) -> &mut Self {
        self.prompt_tokens = self.prompt_tokens.saturating_add(tokens);
        self
    }

    pub fn add_completion_tokens(&mut self, tokens: u32) -> &mut Self {
        self.completion_tokens = self.completion_tokens.saturating_add(tokens);
        self
    }

    pub fn prompt_tokens(&self) -> u32 {
        self.prompt_tokens
    }

    pub fn completion_tokens(&self) -> u32 {
        self.completion_tokens
    }

    pub fn accumulated_usage(&self) -> Usage {
        Usage::new(self.prompt_tokens, self.completion_tokens)
    }
}

impl Deref for OllamaStreamState {
    type Target = StreamState;

    fn deref(&self) -> &StreamState {
        &self.inner
    }
}

impl DerefMut for OllamaStreamState {
    fn deref_mut(&mut self) -> &mut StreamState {
        &mut self.inner
    }
}
