use std::convert::Infallible;

use async_trait::async_trait;
use bytes::Bytes;
use thiserror::Error;
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;

/// The peer is gone; nothing more can be written
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("peer disconnected")]
pub struct SinkClosed;

/// Transport a wire adapter writes encoded frames into
#[async_trait]
pub trait FrameSink: Send {
    /// Hand one frame to the transport, waiting while it is full
    async fn send(&mut self, frame: Bytes) -> Result<(), SinkClosed>;

    fn is_closed(&self) -> bool;
}

/// Bounded channel feeding an HTTP streaming body.
///
/// Dropping the body (client disconnect) closes the channel.
pub struct ChannelSink {
    tx: mpsc::Sender<Result<Bytes, Infallible>>,
}

impl ChannelSink {
    pub fn channel(capacity: usize) -> (Self, ReceiverStream<Result<Bytes, Infallible>>) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        (Self { tx }, ReceiverStream::new(rx))
    }
}

#[async_trait]
impl FrameSink for ChannelSink {
    async fn send(&mut self, frame: Bytes) -> Result<(), SinkClosed> {
        self.tx.send(Ok(frame)).await.map_err(|_| SinkClosed)
    }

    fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

/// In-memory sink for tests and batch rendering
#[derive(Debug, Default)]
pub struct BufferSink {
    frames: Vec<Bytes>,
    disconnect_after: Option<usize>,
}

impl BufferSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Behave like a peer that goes away after `frames` frames
    pub fn disconnecting_after(frames: usize) -> Self {
        Self {
            frames: Vec::new(),
            disconnect_after: Some(frames),
        }
    }

    pub fn frames(&self) -> &[Bytes] {
        &self.frames
    }

    pub fn to_text(&self) -> String {
        self.frames
            .iter()
            .map(|frame| String::from_utf8_lossy(frame))
            .collect()
    }
}

#[async_trait]
impl FrameSink for BufferSink {
    async fn send(&mut self, frame: Bytes) -> Result<(), SinkClosed> {
        if self.is_closed() {
            return Err(SinkClosed);
        }
        self.frames.push(frame);
        Ok(())
    }

    fn is_closed(&self) -> bool {
        self.disconnect_after
            .map_or(false, |limit| self.frames.len() >= limit)
    }
}
