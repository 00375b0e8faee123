//! In-memory [`StreamingClient`] that replays a scripted event sequence.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use crate::error::{Result, SpectraError};
use crate::streaming::{
    new_event_id, now, EventStream, StreamEndEvent, StreamEvent, StreamStartEvent,
    TextCompleteEvent, TextDeltaEvent, TextStartEvent,
};
use crate::traits::{ChatRequest, StreamingClient};
use crate::types::{FinishReason, Usage};

pub const FAKE_MODEL: &str = "fake-model";
pub const FAKE_PROVIDER: &str = "fake";

#[derive(Clone)]
pub struct FakeStreamingClient {
    events: Vec<StreamEvent>,
    failure: Option<(Option<u16>, String)>,
    requests: Arc<Mutex<Vec<ChatRequest>>>,
}

impl FakeStreamingClient {
    pub fn from_events(events: Vec<StreamEvent>) -> Self {
        Self {
            events,
            failure: None,
            requests: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// One text block streamed word by word, closed with `stop`
    pub fn from_text(text: &str) -> Self {
        let message_id = new_event_id();
        let mut events: Vec<StreamEvent> = vec![
            StreamStartEvent::new(new_event_id(), now(), FAKE_MODEL, FAKE_PROVIDER).into(),
            TextStartEvent::new(new_event_id(), now(), message_id.as_str()).into(),
        ];

        let words = split_words(text);
        for word in &words {
            events.push(TextDeltaEvent::new(new_event_id(), now(), word.as_str(), message_id.as_str()).into());
        }

        events.push(TextCompleteEvent::new(new_event_id(), now(), message_id.as_str()).into());
        events.push(
            StreamEndEvent::new(new_event_id(), now(), FinishReason::Stop)
                .with_usage(Usage::new(10, words.len() as u32))
                .into(),
        );
        Self::from_events(events)
    }

    /// After the scripted events, fail the stream as a provider error would
    pub fn failing_with(mut self, status: Option<u16>, message: impl Into<String>) -> Self {
        self.failure = Some((status, message.into()));
        self
    }

    pub fn events(&self) -> &[StreamEvent] {
        &self.events
    }

    /// Requests received so far, oldest first
    pub fn requests(&self) -> Vec<ChatRequest> {
        match self.requests.lock() {
            Ok(requests) => requests.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }
}

#[async_trait]
impl StreamingClient for FakeStreamingClient {
    fn provider(&self) -> &str {
        FAKE_PROVIDER
    }

    async fn stream(&self, request: ChatRequest) -> Result<EventStream> {
        match self.requests.lock() {
            Ok(mut requests) => requests.push(request),
            Err(poisoned) => poisoned.into_inner().push(request),
        }

        let events = self.events.clone();
        let failure = self.failure.clone();

        Ok(Box::pin(async_stream::stream! {
            for event in events {
                yield Ok(event);
            }
            if let Some((status, message)) = failure {
                yield Err(SpectraError::provider(status, message));
            }
        }))
    }
}

// "Hello big world" -> ["Hello", " big", " world"]
fn split_words(text: &str) -> Vec<String> {
    text.split_whitespace()
        .enumerate()
        .map(|(i, word)| if i == 0 { word.to_string() } else { format!(" {}", word) })
        .collect()
}
