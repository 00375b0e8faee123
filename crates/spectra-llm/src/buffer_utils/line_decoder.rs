use bytes::Bytes;
use futures::{Stream, StreamExt};

use super::buffering::CircularLineBuffer;
use crate::error::SpectraError;
use crate::streaming::{EventStream, StreamEvent};

/// Strategy for turning one provider's line-oriented wire format into canonical events.
///
/// A decoder owns the [`StreamState`](crate::streaming::StreamState) of the stream it
/// decodes. Unparseable lines are logged and skipped; provider-reported failures come
/// back as events (an error event followed by the stream end), never as `Err`.
pub trait LineDecoder: Send {
    /// Handle one complete, non-empty, trimmed line
    fn decode_line(&mut self, line: &str) -> Vec<StreamEvent>;

    /// Called once when the transport is exhausted
    fn finish(&mut self) -> Vec<StreamEvent>;

    /// True once the terminal stream end has been produced
    fn is_finished(&self) -> bool;
}

/// Payload of an SSE `data:` line. Comments, `event:` and `id:` lines yield `None`.
pub fn sse_data(line: &str) -> Option<&str> {
    line.strip_prefix("data:").map(str::trim_start)
}

pub fn is_done_marker(data: &str) -> bool {
    data == "[DONE]"
}

/// Drive `decoder` over a chunked byte stream.
///
/// Transport failures and undecodable bytes end the sequence with a single `Err`;
/// everything decoded before that point has already been yielded.
pub fn decode_lines<S, E, D>(chunks: S, decoder: D) -> EventStream
where
    S: Stream<Item = Result<Bytes, E>> + Send + 'static,
    E: Into<SpectraError> + Send + 'static,
    D: LineDecoder + 'static,
{
    Box::pin(async_stream::stream! {
        let mut decoder = decoder;
        let mut chunks = Box::pin(chunks);
        let mut buffer = CircularLineBuffer::with_capacity(8192);

        while let Some(chunk_result) = chunks.next().await {
            let bytes = match chunk_result {
                Ok(bytes) => bytes,
                Err(e) => {
                    yield Err(e.into());
                    return;
                }
            };
            buffer.extend(&bytes);

            while let Some(line_result) = buffer.next_line() {
                match line_result {
                    Ok(line) => {
                        if line.is_empty() || decoder.is_finished() {
                            continue;
                        }
                        for event in decoder.decode_line(&line) {
                            yield Ok(event);
                        }
                    }
                    Err(e) => {
                        yield Err(e);
                        return;
                    }
                }
            }

            if decoder.is_finished() {
                break;
            }
        }

        if !decoder.is_finished() {
            match buffer.take_remaining() {
                Some(Ok(line)) if !line.is_empty() => {
                    for event in decoder.decode_line(&line) {
                        yield Ok(event);
                    }
                }
                Some(Err(e)) => {
                    yield Err(e);
                    return;
                }
                _ => {}
            }
        }

        for event in decoder.finish() {
            yield Ok(event);
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sse_data() {
        assert_eq!(sse_data("data: {\"a\":1}"), Some("{\"a\":1}"));
        assert_eq!(sse_data("data:[DONE]"), Some("[DONE]"));
        assert_eq!(sse_data("event: message"), None);
        assert_eq!(sse_data(": keep-alive"), None);
        assert!(is_done_marker("[DONE]"));
    }
}
