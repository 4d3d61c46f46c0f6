//! Mock implementations for testing
//!
//! These mocks let the stream, command and conversation layers be tested
//! without network, processes or a terminal.

use super::client::{ResponseBody, RoundRequest, Transport};
use super::error::TransportError;
use crate::commands::{CommandHandler, HandlerContext, HandlerError, PendingResult};
use crate::protocol::{CommandKind, RequestPayload};
use crate::stream::{ChannelReader, Dispatch};
use crate::ui::{AudioSink, Notifier, ScriptingPhase};
use async_trait::async_trait;
use futures::StreamExt;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;

// ============================================================================
// Recording Dispatcher
// ============================================================================

#[derive(Default)]
struct DispatchLog {
    /// (tag, full text) per channel that was closed properly
    closed: Vec<(char, String)>,
    cards: Vec<String>,
    aborted: usize,
}

/// Dispatcher that reads every channel to the end and records what it saw.
/// Each command resolves to one payload `{type: <command name>, data: text}`.
#[derive(Default)]
pub struct RecordingDispatcher {
    started: Mutex<Vec<CommandKind>>,
    log: Arc<Mutex<DispatchLog>>,
    tasks: Mutex<Vec<JoinHandle<()>>>,
}

impl RecordingDispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait for every reader task started so far
    pub async fn settle(&self) {
        let tasks = std::mem::take(&mut *self.tasks.lock().unwrap());
        for task in tasks {
            let _ = task.await;
        }
    }

    /// Yield until at least `n` channels were read to the end
    pub async fn wait_closed(&self, n: usize) {
        for _ in 0..10_000 {
            if self.log.lock().unwrap().closed.len() >= n {
                return;
            }
            tokio::task::yield_now().await;
        }
    }

    pub fn started(&self) -> Vec<CommandKind> {
        self.started.lock().unwrap().clone()
    }

    pub fn closed(&self) -> Vec<(char, String)> {
        self.log.lock().unwrap().closed.clone()
    }

    pub fn cards(&self) -> Vec<String> {
        self.log.lock().unwrap().cards.clone()
    }

    pub fn aborted(&self) -> usize {
        self.log.lock().unwrap().aborted
    }
}

impl Dispatch for RecordingDispatcher {
    fn start(&self, kind: CommandKind, reader: ChannelReader) -> Option<PendingResult> {
        self.started.lock().unwrap().push(kind);
        let tag = reader.payload().tag();
        let log = Arc::clone(&self.log);
        let (result_tx, result_rx) = oneshot::channel();

        let task = tokio::spawn(async move {
            match reader.read_to_end().await {
                Ok(text) if kind == CommandKind::Card => log.lock().unwrap().cards.push(text),
                Ok(text) => {
                    log.lock().unwrap().closed.push((tag, text.clone()));
                    let _ = result_tx.send(vec![RequestPayload::new(kind.name(), text)]);
                }
                Err(_) => log.lock().unwrap().aborted += 1,
            }
        });
        self.tasks.lock().unwrap().push(task);

        if kind == CommandKind::Card {
            return None;
        }
        Some(PendingResult::spawn(kind, async move {
            result_rx.await.unwrap_or_default()
        }))
    }
}

// ============================================================================
// Mock Transport
// ============================================================================

/// Transport that returns queued bodies in order
#[derive(Default)]
pub struct MockTransport {
    responses: Mutex<VecDeque<Result<ResponseBody, TransportError>>>,
    /// Record of all requests made
    pub requests: Mutex<Vec<RoundRequest>>,
}

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a body delivered as the given chunks
    pub fn queue_chunks(&self, chunks: &[&str]) {
        let chunks: Vec<Result<Vec<u8>, TransportError>> =
            chunks.iter().map(|c| Ok(c.as_bytes().to_vec())).collect();
        self.queue_body(futures::stream::iter(chunks).boxed());
    }

    /// Queue a body that delivers `chunks` and then never ends
    pub fn queue_stalled(&self, chunks: &[&str]) {
        let chunks: Vec<Result<Vec<u8>, TransportError>> =
            chunks.iter().map(|c| Ok(c.as_bytes().to_vec())).collect();
        self.queue_body(
            futures::stream::iter(chunks)
                .chain(futures::stream::pending())
                .boxed(),
        );
    }

    pub fn queue_body(&self, body: ResponseBody) {
        self.responses.lock().unwrap().push_back(Ok(body));
    }

    pub fn queue_error(&self, error: TransportError) {
        self.responses.lock().unwrap().push_back(Err(error));
    }

    pub fn recorded_requests(&self) -> Vec<RoundRequest> {
        self.requests.lock().unwrap().clone()
    }

    /// Payload types of each recorded request
    pub fn recorded_kinds(&self) -> Vec<Vec<String>> {
        self.recorded_requests()
            .iter()
            .map(|r| r.payloads.iter().map(|p| p.kind.clone()).collect())
            .collect()
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn send(&self, request: &RoundRequest) -> Result<ResponseBody, TransportError> {
        self.requests.lock().unwrap().push(request.clone());
        self.responses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(TransportError::network("No mock response queued")))
    }
}

// ============================================================================
// Mock Notifier
// ============================================================================

#[derive(Default)]
struct NotifierLog {
    statuses: Vec<String>,
    phases: Vec<ScriptingPhase>,
    errors: Vec<(String, String)>,
    approvals: Vec<(Option<u32>, String)>,
    text: String,
    rounds: usize,
}

/// Notifier that records every call
#[derive(Default)]
pub struct MockNotifier {
    log: Mutex<NotifierLog>,
    approve: bool,
    card_tasks: Mutex<Vec<JoinHandle<String>>>,
}

impl MockNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Answer every approval request with `approve`
    pub fn with_approval(mut self, approve: bool) -> Self {
        self.approve = approve;
        self
    }

    pub fn statuses(&self) -> Vec<String> {
        self.log.lock().unwrap().statuses.clone()
    }

    pub fn phases(&self) -> Vec<ScriptingPhase> {
        self.log.lock().unwrap().phases.clone()
    }

    pub fn errors(&self) -> Vec<(String, String)> {
        self.log.lock().unwrap().errors.clone()
    }

    pub fn approvals(&self) -> Vec<(Option<u32>, String)> {
        self.log.lock().unwrap().approvals.clone()
    }

    /// Base channel text received so far
    pub fn text(&self) -> String {
        self.log.lock().unwrap().text.clone()
    }

    pub fn rounds_started(&self) -> usize {
        self.log.lock().unwrap().rounds
    }

    /// Full text of every card handed off so far
    pub async fn cards(&self) -> Vec<String> {
        let tasks = std::mem::take(&mut *self.card_tasks.lock().unwrap());
        let mut cards = Vec::new();
        for task in tasks {
            cards.push(task.await.unwrap_or_default());
        }
        cards
    }
}

#[async_trait]
impl Notifier for MockNotifier {
    fn round_started(&self) {
        self.log.lock().unwrap().rounds += 1;
    }

    fn status(&self, text: &str, _loading: bool) {
        self.log.lock().unwrap().statuses.push(text.to_string());
    }

    fn scripting_phase(&self, phase: ScriptingPhase) {
        self.log.lock().unwrap().phases.push(phase);
    }

    fn error(&self, title: &str, detail: &str) {
        self.log
            .lock()
            .unwrap()
            .errors
            .push((title.to_string(), detail.to_string()));
    }

    async fn request_approval(&self, rating: Option<u32>, review: &str) -> bool {
        self.log
            .lock()
            .unwrap()
            .approvals
            .push((rating, review.to_string()));
        self.approve
    }

    fn hand_off_card(&self, card: ChannelReader) {
        let task = tokio::spawn(async move { card.read_to_end().await.unwrap_or_default() });
        self.card_tasks.lock().unwrap().push(task);
    }

    fn response_text(&self, chunk: &str) {
        self.log.lock().unwrap().text.push_str(chunk);
    }
}

// ============================================================================
// Mock Audio Sink
// ============================================================================

#[derive(Default)]
pub struct MockAudioSink {
    clips: Mutex<Vec<Vec<u8>>>,
}

impl MockAudioSink {
    pub fn clips(&self) -> Vec<Vec<u8>> {
        self.clips.lock().unwrap().clone()
    }
}

impl AudioSink for MockAudioSink {
    fn enqueue(&self, clip: Vec<u8>) {
        self.clips.lock().unwrap().push(clip);
    }
}

// ============================================================================
// Mock Command Handler
// ============================================================================

enum Reply {
    /// `{type: "echo", data: args}`
    Echo,
    Fixed(Vec<RequestPayload>),
    Fail(String),
}

/// Handler with a canned reply and an optional delay
pub struct MockHandler {
    reply: Reply,
    delay: Option<Duration>,
    calls: Mutex<Vec<String>>,
}

impl MockHandler {
    fn with_reply(reply: Reply) -> Self {
        Self {
            reply,
            delay: None,
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn echo() -> Self {
        Self::with_reply(Reply::Echo)
    }

    pub fn returning(payloads: Vec<RequestPayload>) -> Self {
        Self::with_reply(Reply::Fixed(payloads))
    }

    pub fn failing(message: impl Into<String>) -> Self {
        Self::with_reply(Reply::Fail(message.into()))
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Arguments of every call, in order
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl CommandHandler for MockHandler {
    async fn handle(
        &self,
        args: String,
        _ctx: &HandlerContext,
    ) -> Result<Vec<RequestPayload>, HandlerError> {
        self.calls.lock().unwrap().push(args.clone());
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        match &self.reply {
            Reply::Echo => Ok(vec![RequestPayload::new("echo", args)]),
            Reply::Fixed(payloads) => Ok(payloads.clone()),
            Reply::Fail(message) => Err(HandlerError::unavailable(message.clone())),
        }
    }
}
