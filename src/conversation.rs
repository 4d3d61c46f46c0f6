//! Conversation loop
//!
//! A turn starts with the user's utterance and runs rounds until a round
//! produces no handler output:
//!
//! ```text
//! Idle -> Sending -> Streaming -> Aggregating -+-> Sending   (results to report)
//!                                              +-> Idle      (nothing left)
//! ```
//!
//! Each round posts the pending payloads, demultiplexes the streamed body
//! into channels, and collects the command results in the order their
//! channels were opened.

mod client;
mod error;
mod totp;

#[cfg(test)]
pub mod testing;

pub use client::{os_type, HttpTransport, ResponseBody, RoundRequest, Transport};
pub use error::{ConversationError, TransportError};
pub use totp::Totp;

use crate::commands::{aggregate, PendingResult};
use crate::config::{ClientConfig, SettingsStore};
use crate::protocol::{FrameScanner, Message, PayloadType, Record, RequestPayload, Utf8Decoder};
use crate::stream::{channel, Dispatch, StreamStack};
use crate::ui::Notifier;
use futures::StreamExt;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Where the loop is within a turn
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopState {
    Idle,
    Sending,
    Streaming,
    Aggregating,
}

/// Summary of a completed turn
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TurnOutcome {
    /// Some round asked for the user's reply; start listening again
    pub resume_listening: bool,
    pub end_of_turn: bool,
    pub rounds: usize,
}

/// Result of one round
struct RoundResult {
    next: Vec<RequestPayload>,
    follow_up: bool,
    end_of_turn: bool,
}

pub struct ConversationLoop<T: Transport> {
    transport: T,
    dispatcher: Arc<dyn Dispatch>,
    notifier: Arc<dyn Notifier>,
    settings: Arc<dyn SettingsStore>,
    session_id: String,
    api_version: String,
    channel_capacity: usize,
    history: Vec<Message>,
    /// Assistant text of the current turn, flushed into history on the next
    /// utterance
    in_flight: String,
    state: LoopState,
}

impl<T: Transport> ConversationLoop<T> {
    pub fn new(
        transport: T,
        dispatcher: Arc<dyn Dispatch>,
        notifier: Arc<dyn Notifier>,
        settings: Arc<dyn SettingsStore>,
        config: &ClientConfig,
    ) -> Self {
        Self {
            transport,
            dispatcher,
            notifier,
            settings,
            session_id: uuid::Uuid::new_v4().to_string(),
            api_version: config.api_version.clone(),
            channel_capacity: config.channel_capacity,
            history: Vec::new(),
            in_flight: String::new(),
            state: LoopState::Idle,
        }
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    #[cfg(test)]
    pub fn history(&self) -> &[Message] {
        &self.history
    }

    /// Assistant text received since the last utterance
    #[cfg(test)]
    pub fn in_flight(&self) -> &str {
        &self.in_flight
    }

    #[cfg(test)]
    pub fn state(&self) -> LoopState {
        self.state
    }

    #[cfg(test)]
    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Run a full turn for `utterance`.
    ///
    /// On error or cancellation the turn stops where it is; the assistant
    /// text received so far is kept for history.
    pub async fn submit(
        &mut self,
        utterance: &str,
        cancel: &CancellationToken,
    ) -> Result<TurnOutcome, ConversationError> {
        if !self.in_flight.is_empty() {
            let text = std::mem::take(&mut self.in_flight);
            self.history.push(Message::assistant(text));
        }
        self.history.push(Message::user(utterance));

        let mut payloads = vec![RequestPayload::user_text(utterance)];
        let mut outcome = TurnOutcome::default();

        while !payloads.is_empty() {
            let round = self.run_round(payloads, cancel).await;
            self.state = LoopState::Idle;
            let round = round?;

            outcome.rounds += 1;
            outcome.resume_listening |= round.follow_up;
            outcome.end_of_turn |= round.end_of_turn;
            payloads = round.next;
        }

        tracing::info!(
            session = %self.session_id,
            rounds = outcome.rounds,
            resume_listening = outcome.resume_listening,
            "Turn completed"
        );
        Ok(outcome)
    }

    async fn run_round(
        &mut self,
        payloads: Vec<RequestPayload>,
        cancel: &CancellationToken,
    ) -> Result<RoundResult, ConversationError> {
        let settings = self.settings.load();
        let request = RoundRequest {
            one_time_code: Totp::new(&settings.token).now(),
            username: settings.username.clone(),
            session_id: self.session_id.clone(),
            os_type: os_type(),
            accept_risk: settings.accepts_all_risk(),
            api_version: self.api_version.clone(),
            payloads,
        };

        self.state = LoopState::Sending;
        let bytes = serde_json::to_vec(&request.payloads)?.len();
        tracing::info!(payloads = request.payloads.len(), bytes, "Sending round");

        let mut body = tokio::select! {
            () = cancel.cancelled() => return Err(ConversationError::Cancelled),
            result = self.transport.send(&request) => result?,
        };

        self.state = LoopState::Streaming;
        self.notifier.round_started();

        let (base, base_reader) = channel(PayloadType::Response, self.channel_capacity);
        let notifier = Arc::clone(&self.notifier);
        let base_text = tokio::spawn(async move {
            let mut reader = base_reader;
            let mut text = String::new();
            while let Ok(Some(chunk)) = reader.recv().await {
                notifier.response_text(&chunk);
                text.push_str(&chunk);
            }
            text
        });

        let dispatcher = Arc::clone(&self.dispatcher);
        let mut stack = StreamStack::new(base, dispatcher.as_ref(), self.channel_capacity);

        if let Err(e) = pump(&mut body, &mut stack, cancel).await {
            stack.abort();
            self.in_flight.push_str(&base_text.await.unwrap_or_default());
            tracing::warn!(error = %e, state = ?self.state, "Round aborted");
            return Err(e);
        }

        let outcome = stack.finish().await;
        self.in_flight.push_str(&base_text.await.unwrap_or_default());

        self.state = LoopState::Aggregating;
        let next = collect(outcome.pending, cancel).await?;
        tracing::info!(
            results = next.len(),
            follow_up = outcome.follow_up,
            end_of_turn = outcome.end_of_turn,
            "Round finished"
        );

        Ok(RoundResult {
            next,
            follow_up: outcome.follow_up,
            end_of_turn: outcome.end_of_turn,
        })
    }
}

/// Feed the body through the decoder and scanner into the stack until it
/// ends.
async fn pump(
    body: &mut ResponseBody,
    stack: &mut StreamStack<'_>,
    cancel: &CancellationToken,
) -> Result<(), ConversationError> {
    let mut decoder = Utf8Decoder::new();
    let mut scanner = FrameScanner::new();
    let mut received = 0usize;

    loop {
        let next = tokio::select! {
            () = cancel.cancelled() => return Err(ConversationError::Cancelled),
            next = body.next() => next,
        };
        let Some(chunk) = next else {
            break;
        };
        let bytes = chunk?;
        received += bytes.len();
        feed(stack, &mut scanner, &decoder.decode(&bytes)).await;
    }

    feed(stack, &mut scanner, &decoder.finish()).await;
    if scanner.finish() {
        tracing::warn!("Body ended with a separator but no tag");
    }
    if received == 0 {
        return Err(TransportError::empty_body().into());
    }
    tracing::debug!(bytes = received, "Body complete");
    Ok(())
}

async fn feed(stack: &mut StreamStack<'_>, scanner: &mut FrameScanner, text: &str) {
    for record in scanner.scan(text) {
        match record {
            Record::Continuation(data) => stack.write_continuation(data).await,
            Record::Payload { tag, data } => {
                match tag {
                    PayloadType::Unknown('?') => {}
                    PayloadType::Unknown(c) => {
                        tracing::warn!(tag = %c, "Unrecognized payload tag");
                    }
                    PayloadType::Play | PayloadType::Calendar | PayloadType::Email => {
                        tracing::debug!(
                            tag = %tag.tag(),
                            "No handler for payload, routing to top channel"
                        );
                    }
                    _ => {}
                }
                stack.transition(tag, data).await;
            }
        }
    }
}

/// Await every handler, stopping them all if the turn is cancelled.
async fn collect(
    pending: Vec<PendingResult>,
    cancel: &CancellationToken,
) -> Result<Vec<RequestPayload>, ConversationError> {
    let aborts: Vec<_> = pending.iter().map(PendingResult::abort_handle).collect();
    tokio::select! {
        () = cancel.cancelled() => {
            for handle in aborts {
                handle.abort();
            }
            Err(ConversationError::Cancelled)
        }
        results = aggregate(pending) => Ok(results),
    }
}
