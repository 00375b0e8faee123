pub mod collector;
pub mod events;
pub mod state;

use futures::Stream;
use std::pin::Pin;

use crate::error::Result;

pub use collector::{CompletionCallback, StreamCollector};
pub use events::*;
pub use state::{PendingToolCall, StreamState};

/// Lazily produced, single-consumer sequence of canonical stream events
pub type EventStream = Pin<Box<dyn Stream<Item = Result<StreamEvent>> + Send>>;

/// Fresh opaque identifier for an event, message or reasoning block
pub fn new_event_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

/// Current time as epoch seconds
pub fn now() -> i64 {
    chrono::Utc::now().timestamp()
}
