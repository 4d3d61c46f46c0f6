//! Bounded single-payload channel with close acknowledgement

use crate::protocol::PayloadType;
use futures::Stream;
use thiserror::Error;
use tokio::sync::{mpsc, oneshot};

/// Lifecycle of a channel's writer half
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelState {
    Open,
    /// End marker sent, waiting for the reader to see it
    Closing,
    Closed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ChannelError {
    #[error("write to a closed channel")]
    Closed,
    #[error("channel reader went away")]
    ReaderGone,
    #[error("channel was dropped before it was closed")]
    Aborted,
}

#[derive(Debug)]
enum Frame {
    Data(String),
    End,
}

/// Create a channel for one payload.
///
/// `capacity` bounds how many chunks may be queued before writes wait for
/// the reader; it is clamped to at least one.
pub fn channel(payload: PayloadType, capacity: usize) -> (ChannelWriter, ChannelReader) {
    let (sender, receiver) = mpsc::channel(capacity.max(1));
    let (ack_tx, ack_rx) = oneshot::channel();

    let writer = ChannelWriter {
        payload,
        sender: Some(sender),
        ack: Some(ack_rx),
        state: ChannelState::Open,
    };
    let reader = ChannelReader {
        payload,
        receiver,
        ack: Some(ack_tx),
    };
    (writer, reader)
}

/// Writable end, owned by the stream stack while the payload is open
#[derive(Debug)]
pub struct ChannelWriter {
    payload: PayloadType,
    sender: Option<mpsc::Sender<Frame>>,
    ack: Option<oneshot::Receiver<()>>,
    state: ChannelState,
}

impl ChannelWriter {
    pub fn payload(&self) -> PayloadType {
        self.payload
    }

    #[allow(dead_code)] // State query utility
    pub fn state(&self) -> ChannelState {
        self.state
    }

    /// Write a chunk, waiting for room if the reader is behind.
    pub async fn write(&mut self, data: &str) -> Result<(), ChannelError> {
        let sender = self.sender.as_ref().ok_or(ChannelError::Closed)?;
        if data.is_empty() {
            return Ok(());
        }
        sender
            .send(Frame::Data(data.to_string()))
            .await
            .map_err(|_| ChannelError::ReaderGone)
    }

    /// Close the channel and wait until the reader has seen the end.
    ///
    /// Returns immediately if the reader is already gone. Closing twice is a
    /// no-op.
    pub async fn close(&mut self) {
        let Some(sender) = self.sender.take() else {
            return;
        };
        self.state = ChannelState::Closing;

        let delivered = sender.send(Frame::End).await.is_ok();
        drop(sender);
        if let (true, Some(ack)) = (delivered, self.ack.take()) {
            // Err means the reader dropped after the end marker was queued
            let _ = ack.await;
        }

        self.state = ChannelState::Closed;
    }
}

/// Readable end, handed to the payload's consumer
#[derive(Debug)]
pub struct ChannelReader {
    payload: PayloadType,
    receiver: mpsc::Receiver<Frame>,
    ack: Option<oneshot::Sender<()>>,
}

impl ChannelReader {
    #[cfg(test)]
    pub fn payload(&self) -> PayloadType {
        self.payload
    }

    /// Next chunk, `Ok(None)` once the writer closed the channel, or
    /// [`ChannelError::Aborted`] if the writer was dropped without closing.
    pub async fn recv(&mut self) -> Result<Option<String>, ChannelError> {
        match self.receiver.recv().await {
            Some(Frame::Data(data)) => Ok(Some(data)),
            Some(Frame::End) => {
                if let Some(ack) = self.ack.take() {
                    let _ = ack.send(());
                }
                Ok(None)
            }
            None if self.ack.is_none() => Ok(None),
            None => Err(ChannelError::Aborted),
        }
    }

    /// Buffer the whole payload.
    pub async fn read_to_end(mut self) -> Result<String, ChannelError> {
        let mut buf = String::new();
        while let Some(chunk) = self.recv().await? {
            buf.push_str(&chunk);
        }
        Ok(buf)
    }

    /// Chunks as a stream; ends when the channel closes.
    pub fn into_stream(self) -> impl Stream<Item = Result<String, ChannelError>> + Send {
        futures::stream::unfold(Some(self), |reader| async move {
            let mut reader = reader?;
            match reader.recv().await {
                Ok(Some(chunk)) => Some((Ok(chunk), Some(reader))),
                Ok(None) => None,
                Err(e) => Some((Err(e), None)),
            }
        })
    }
}
