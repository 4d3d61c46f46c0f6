//! Stack of open channels for one round

use super::channel::{channel, ChannelWriter};
use crate::commands::PendingResult;
use crate::protocol::{CommandKind, PayloadType};
use crate::stream::ChannelReader;

/// Starts the consumer of a freshly opened channel
pub trait Dispatch: Send + Sync {
    /// Hand `reader` to whatever handles `kind`. Returns `None` when the
    /// payload produces nothing for the next request.
    fn start(&self, kind: CommandKind, reader: ChannelReader) -> Option<PendingResult>;
}

/// What a finished round leaves behind
#[derive(Debug, Default)]
pub struct RoundOutcome {
    /// Handler results in the order their channels were opened
    pub pending: Vec<PendingResult>,
    pub follow_up: bool,
    pub end_of_turn: bool,
}

/// Open channels of the current response.
///
/// Position 0 is the base channel for plain response text and lives until
/// the round ends. Only the top channel receives writes.
pub struct StreamStack<'a> {
    dispatcher: &'a dyn Dispatch,
    channels: Vec<ChannelWriter>,
    pending: Vec<PendingResult>,
    capacity: usize,
    follow_up: bool,
    end_of_turn: bool,
}

impl<'a> StreamStack<'a> {
    pub fn new(base: ChannelWriter, dispatcher: &'a dyn Dispatch, capacity: usize) -> Self {
        Self {
            dispatcher,
            channels: vec![base],
            pending: Vec::new(),
            capacity,
            follow_up: false,
            end_of_turn: false,
        }
    }

    /// Number of open channels, base included
    #[cfg(test)]
    pub fn depth(&self) -> usize {
        self.channels.len()
    }

    /// Payload types of the open channels, base first
    #[cfg(test)]
    pub fn open_payloads(&self) -> Vec<PayloadType> {
        self.channels.iter().map(ChannelWriter::payload).collect()
    }

    #[cfg(test)]
    pub fn follow_up(&self) -> bool {
        self.follow_up
    }

    /// Write data that continues the current top channel.
    pub async fn write_continuation(&mut self, data: &str) {
        let Some(top) = self.channels.last_mut() else {
            return;
        };
        if let Err(e) = top.write(data).await {
            tracing::warn!(payload = %top.payload().tag(), error = %e, "Dropping channel data");
        }
    }

    /// Handle a tag that starts a new payload.
    ///
    /// Any tag but voice closes exactly one channel (the top) if a command
    /// channel is open. Voice channels therefore pile up until a later
    /// transition or [`drain`](Self::drain) closes them.
    pub async fn transition(&mut self, tag: PayloadType, data: &str) {
        if !tag.is_aside() && self.channels.len() > 1 {
            if let Some(mut top) = self.channels.pop() {
                tracing::debug!(payload = %top.payload().tag(), "Closing channel");
                top.close().await;
            }
        }

        match tag {
            PayloadType::FollowUp => self.follow_up = true,
            PayloadType::End => self.end_of_turn = true,
            _ => {}
        }

        if let Some(kind) = tag.command() {
            let (writer, reader) = channel(tag, self.capacity);
            if let Some(pending) = self.dispatcher.start(kind, reader) {
                self.pending.push(pending);
            }
            tracing::debug!(payload = %tag.tag(), depth = self.channels.len() + 1, "Opened channel");
            self.channels.push(writer);
        }

        self.write_continuation(data).await;
    }

    /// Close every command channel, newest first. The base stays open.
    pub async fn drain(&mut self) {
        while self.channels.len() > 1 {
            if let Some(mut top) = self.channels.pop() {
                top.close().await;
            }
        }
    }

    /// End of response body: drain, close the base channel and hand back
    /// the pending results.
    pub async fn finish(mut self) -> RoundOutcome {
        self.drain().await;
        if let Some(mut base) = self.channels.pop() {
            base.close().await;
        }
        RoundOutcome {
            pending: self.pending,
            follow_up: self.follow_up,
            end_of_turn: self.end_of_turn,
        }
    }

    /// Abandon the round. Open channels are dropped without closing, so
    /// their handlers never run. Handlers already running are stopped.
    pub fn abort(self) {
        tracing::info!(
            open = self.channels.len(),
            pending = self.pending.len(),
            "Aborting round"
        );
        for pending in &self.pending {
            pending.abort();
        }
    }
}
