//! Command handlers for payloads that need client-side work
//!
//! Each command channel is buffered until it closes, then its text goes to
//! the matching [`CommandHandler`]. Handlers run as independent tasks; their
//! results are collected in channel order for the next request.

mod audio;
mod browse;
mod error;
mod html;
mod open;
mod process;
mod python;
pub mod reminders;
mod search;
mod unknown;

pub use audio::VoiceHandler;
pub use browse::BrowseHandler;
pub use error::HandlerError;
pub use open::OpenHandler;
pub use python::{PipHandler, PythonHandler, PythonWithEvaluationHandler};
pub use reminders::{InMemoryReminders, RemindersHandler, RemindersStore};
pub use search::SearchHandler;
pub use unknown::UnknownHandler;

use crate::config::{ClientConfig, SettingsStore};
use crate::protocol::{CommandKind, RequestPayload};
use crate::stream::{ChannelReader, Dispatch};
use crate::ui::{AudioSink, Notifier, ScriptingPhase};
use async_trait::async_trait;
use reqwest::Client;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::{AbortHandle, JoinHandle};

const USER_AGENT: &str = "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/15.4 Safari/605.1.15";

/// Everything a handler may call out to
#[derive(Clone)]
pub struct HandlerContext {
    pub notifier: Arc<dyn Notifier>,
    pub settings: Arc<dyn SettingsStore>,
}

impl HandlerContext {
    pub fn new(notifier: Arc<dyn Notifier>, settings: Arc<dyn SettingsStore>) -> Self {
        Self { notifier, settings }
    }
}

/// Client-side work for one payload type
#[async_trait]
pub trait CommandHandler: Send + Sync {
    /// Title used when reporting a failure to the user
    fn error_title(&self) -> &'static str {
        "Command Error"
    }

    /// Run the command on the fully buffered payload text
    async fn handle(
        &self,
        args: String,
        ctx: &HandlerContext,
    ) -> Result<Vec<RequestPayload>, HandlerError>;
}

/// Result of a started command, resolved once the handler finishes
#[derive(Debug)]
pub struct PendingResult {
    kind: CommandKind,
    handle: JoinHandle<Vec<RequestPayload>>,
}

impl PendingResult {
    pub fn spawn<F>(kind: CommandKind, task: F) -> Self
    where
        F: Future<Output = Vec<RequestPayload>> + Send + 'static,
    {
        Self {
            kind,
            handle: tokio::spawn(task),
        }
    }

    #[cfg(test)]
    pub fn kind(&self) -> CommandKind {
        self.kind
    }

    /// Stop the handler. Its result resolves to nothing.
    pub fn abort(&self) {
        self.handle.abort();
    }

    pub fn abort_handle(&self) -> AbortHandle {
        self.handle.abort_handle()
    }

    /// Wait for the handler. A panicked handler contributes nothing.
    pub async fn resolve(self) -> Vec<RequestPayload> {
        match self.handle.await {
            Ok(payloads) => payloads,
            Err(e) if e.is_cancelled() => Vec::new(),
            Err(e) => {
                tracing::error!(command = self.kind.name(), error = %e, "Command task failed");
                Vec::new()
            }
        }
    }
}

/// Await every result concurrently and flatten them in creation order.
pub async fn aggregate(pending: Vec<PendingResult>) -> Vec<RequestPayload> {
    futures::future::join_all(pending.into_iter().map(PendingResult::resolve))
        .await
        .into_iter()
        .flatten()
        .collect()
}

/// One handler per command that produces a result. Cards are handed to the
/// UI instead and have no entry.
#[derive(Clone)]
pub struct HandlerSet {
    pub voice: Arc<dyn CommandHandler>,
    pub search: Arc<dyn CommandHandler>,
    pub browse: Arc<dyn CommandHandler>,
    pub python: Arc<dyn CommandHandler>,
    pub python_with_evaluation: Arc<dyn CommandHandler>,
    pub pip: Arc<dyn CommandHandler>,
    pub open: Arc<dyn CommandHandler>,
    pub reminders: Arc<dyn CommandHandler>,
    pub unknown: Arc<dyn CommandHandler>,
}

impl HandlerSet {
    /// Production handlers
    pub fn standard(
        config: &ClientConfig,
        audio: Arc<dyn AudioSink>,
        reminders: Arc<dyn RemindersStore>,
    ) -> Self {
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .timeout(Duration::from_secs(60))
            .build()
            .expect("Failed to create HTTP client");

        Self {
            voice: Arc::new(VoiceHandler::new(audio)),
            search: Arc::new(SearchHandler::new(client.clone(), config.search_url.clone())),
            browse: Arc::new(BrowseHandler::new(client)),
            python: Arc::new(PythonHandler),
            python_with_evaluation: Arc::new(PythonWithEvaluationHandler),
            pip: Arc::new(PipHandler),
            open: Arc::new(OpenHandler),
            reminders: Arc::new(RemindersHandler::new(reminders)),
            unknown: Arc::new(UnknownHandler),
        }
    }

    /// Build every entry from one factory
    #[cfg(test)]
    pub fn from_fn(mut make: impl FnMut(CommandKind) -> Arc<dyn CommandHandler>) -> Self {
        Self {
            voice: make(CommandKind::Voice),
            search: make(CommandKind::Search),
            browse: make(CommandKind::Browse),
            python: make(CommandKind::Python),
            python_with_evaluation: make(CommandKind::PythonWithEvaluation),
            pip: make(CommandKind::Pip),
            open: make(CommandKind::Open),
            reminders: make(CommandKind::Reminders),
            unknown: make(CommandKind::Unknown),
        }
    }

    pub fn get(&self, kind: CommandKind) -> Option<&Arc<dyn CommandHandler>> {
        match kind {
            CommandKind::Voice => Some(&self.voice),
            CommandKind::Search => Some(&self.search),
            CommandKind::Browse => Some(&self.browse),
            CommandKind::Python => Some(&self.python),
            CommandKind::PythonWithEvaluation => Some(&self.python_with_evaluation),
            CommandKind::Pip => Some(&self.pip),
            CommandKind::Open => Some(&self.open),
            CommandKind::Reminders => Some(&self.reminders),
            CommandKind::Unknown => Some(&self.unknown),
            CommandKind::Card => None,
        }
    }
}

/// Routes command channels to their handlers
pub struct CommandDispatcher {
    handlers: HandlerSet,
    ctx: HandlerContext,
    timeout: Option<Duration>,
}

impl CommandDispatcher {
    pub fn new(handlers: HandlerSet, ctx: HandlerContext) -> Self {
        Self {
            handlers,
            ctx,
            timeout: None,
        }
    }

    /// Fail handlers that run longer than `timeout`
    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }
}

impl Dispatch for CommandDispatcher {
    fn start(&self, kind: CommandKind, reader: ChannelReader) -> Option<PendingResult> {
        match kind {
            CommandKind::Card => {
                self.ctx.notifier.hand_off_card(reader);
                return None;
            }
            CommandKind::Python => self.ctx.notifier.scripting_phase(ScriptingPhase::Scripting),
            CommandKind::PythonWithEvaluation => {
                self.ctx.notifier.scripting_phase(ScriptingPhase::Evaluating);
            }
            _ => {}
        }

        let handler = Arc::clone(self.handlers.get(kind)?);
        let ctx = self.ctx.clone();
        let timeout = self.timeout;

        Some(PendingResult::spawn(
            kind,
            run_handler(kind, handler, reader, ctx, timeout),
        ))
    }
}

async fn run_handler(
    kind: CommandKind,
    handler: Arc<dyn CommandHandler>,
    reader: ChannelReader,
    ctx: HandlerContext,
    timeout: Option<Duration>,
) -> Vec<RequestPayload> {
    let args = match reader.read_to_end().await {
        Ok(args) => args,
        Err(e) => {
            tracing::warn!(command = kind.name(), error = %e, "Channel abandoned, command skipped");
            return Vec::new();
        }
    };

    tracing::info!(command = kind.name(), bytes = args.len(), "Running command");
    let start = std::time::Instant::now();

    let outcome = match timeout {
        Some(limit) => tokio::time::timeout(limit, handler.handle(args, &ctx))
            .await
            .unwrap_or(Err(HandlerError::TimedOut(limit))),
        None => handler.handle(args, &ctx).await,
    };

    match outcome {
        Ok(payloads) => {
            tracing::info!(
                command = kind.name(),
                duration_ms = %start.elapsed().as_millis(),
                payloads = payloads.len(),
                "Command completed"
            );
            payloads
        }
        Err(e) => {
            tracing::error!(
                command = kind.name(),
                duration_ms = %start.elapsed().as_millis(),
                error = %e,
                "Command failed"
            );
            ctx.notifier.error(handler.error_title(), &e.to_string());
            Vec::new()
        }
    }
}
