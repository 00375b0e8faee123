//! Wire adapters: render a canonical event stream into an HTTP streaming body.

mod data_protocol;
mod sink;
mod sse;

pub use data_protocol::DataProtocolAdapter;
pub use sink::{BufferSink, ChannelSink, FrameSink, SinkClosed};
pub use sse::SseAdapter;

use async_trait::async_trait;
use axum::{
    body::Body,
    http::{HeaderName, HeaderValue, StatusCode},
    response::Response,
};
use bytes::Bytes;
use futures::StreamExt;
use spectra_llm::streaming::{new_event_id, now, ErrorEvent};
use spectra_llm::{ChatRequest, EventStream, SpectraError, StreamEvent};

/// Runs after the stream has been fully written, with every event that was produced
pub type EventsCallback = Box<dyn FnOnce(Option<&ChatRequest>, &[StreamEvent]) + Send>;

/// A wire format plus the shared drive loop that writes it.
///
/// Implementors only describe framing; ordering, disconnect handling, error
/// recovery and the completion callback live in [`WireAdapter::write_to`].
#[async_trait]
pub trait WireAdapter: Send + Sync + Sized + 'static {
    fn headers(&self) -> &'static [(&'static str, &'static str)];

    /// Frame for one event, `None` when the format has no counterpart for it
    fn encode(&self, event: &StreamEvent) -> spectra_llm::Result<Option<Bytes>>;

    /// Frame for an error event; cannot fail
    fn encode_error(&self, error: &ErrorEvent) -> Bytes;

    /// Literal end-of-stream frame, if the format has one
    fn terminator(&self) -> Option<Bytes> {
        None
    }

    /// Drive `events` into `sink` and return everything the source produced.
    ///
    /// A failing source is turned into one error frame; a frame that cannot be
    /// encoded is replaced by an error frame and the stream continues. The
    /// source is not polled again once the sink reports the peer gone; the
    /// callback still runs with what was produced up to that point.
    async fn write_to<S>(
        &self,
        mut events: EventStream,
        sink: &mut S,
        request: Option<ChatRequest>,
        callback: Option<EventsCallback>,
    ) -> Vec<StreamEvent>
    where
        S: FrameSink + ?Sized,
    {
        let mut collected = Vec::new();
        let mut disconnected = false;

        loop {
            if sink.is_closed() {
                disconnected = true;
                break;
            }
            let Some(item) = events.next().await else {
                break;
            };

            match item {
                Ok(event) => {
                    let frame = match self.encode(&event) {
                        Ok(frame) => frame,
                        Err(err) => {
                            tracing::warn!("Failed to encode {} event: {}", event.event_type(), err);
                            Some(self.encode_error(&encoding_error(&err)))
                        }
                    };
                    collected.push(event);

                    if let Some(frame) = frame {
                        if sink.send(frame).await.is_err() {
                            disconnected = true;
                            break;
                        }
                    }
                }
                Err(err) => {
                    tracing::error!("Event stream failed: {}", err);
                    let error = ErrorEvent::from_error(&err);
                    let frame = self.encode_error(&error);
                    collected.push(StreamEvent::Error(error));

                    if sink.send(frame).await.is_err() {
                        disconnected = true;
                    }
                    break;
                }
            }
        }

        if disconnected {
            tracing::debug!("Peer disconnected after {} events", collected.len());
        } else if let Some(terminator) = self.terminator() {
            if sink.send(terminator).await.is_err() {
                tracing::debug!("Peer disconnected before the end-of-stream frame");
            }
        }

        if let Some(callback) = callback {
            callback(request.as_ref(), &collected);
        }

        collected
    }

    /// Streaming HTTP response whose body is fed by a spawned drive loop
    fn into_response(
        self,
        events: EventStream,
        request: Option<ChatRequest>,
        callback: Option<EventsCallback>,
        channel_capacity: usize,
    ) -> Response {
        let headers = self.headers();
        let (mut sink, body) = ChannelSink::channel(channel_capacity);

        tokio::spawn(async move {
            self.write_to(events, &mut sink, request, callback).await;
        });

        let mut response = Response::new(Body::from_stream(body));
        *response.status_mut() = StatusCode::OK;
        for &(name, value) in headers {
            response.headers_mut().insert(
                HeaderName::from_static(name),
                HeaderValue::from_static(value),
            );
        }
        response
    }
}

fn encoding_error(err: &SpectraError) -> ErrorEvent {
    ErrorEvent::new(new_event_id(), now(), err.error_type(), err.to_string(), false)
}
