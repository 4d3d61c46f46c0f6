//! April - voice assistant client
//!
//! Reads utterances from stdin, streams the assistant's multiplexed
//! response, runs the commands it asks for and reports their results back
//! until the assistant is done.

mod commands;
mod config;
mod console;
mod conversation;
mod protocol;
mod stream;
mod ui;

use commands::{CommandDispatcher, HandlerContext, HandlerSet, InMemoryReminders};
use config::{ClientConfig, FileSettings, SettingsStore};
use console::{ConsoleNotifier, LoggingAudioSink};
use conversation::{ConversationError, ConversationLoop, HttpTransport};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use ui::Notifier;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "april=info".into()),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .json()
                .with_current_span(false)
                .with_span_list(false)
                .with_writer(std::io::stderr),
        )
        .init();

    // Configuration
    let config = ClientConfig::from_env();
    let Some(api_url) = config.api_url.clone() else {
        return Err("APRIL_API_URL must be set".into());
    };

    let settings: Arc<dyn SettingsStore> = Arc::new(FileSettings::new(&config.settings_path));
    tracing::info!(path = %config.settings_path.display(), "Using settings file");

    let input = console::stdin_lines();
    let notifier: Arc<dyn Notifier> = Arc::new(ConsoleNotifier::new(Arc::clone(&input)));

    let handlers = HandlerSet::standard(
        &config,
        Arc::new(LoggingAudioSink),
        Arc::new(InMemoryReminders::new().with_list("april", "April")),
    );
    let dispatcher = CommandDispatcher::new(
        handlers,
        HandlerContext::new(Arc::clone(&notifier), Arc::clone(&settings)),
    )
    .with_timeout(config.handler_timeout);

    let mut conversation = ConversationLoop::new(
        HttpTransport::new(&api_url),
        Arc::new(dispatcher),
        notifier,
        settings,
        &config,
    );
    tracing::info!(
        session = %conversation.session_id(),
        url = %api_url,
        "Conversation started"
    );

    loop {
        eprint!("> ");
        console::flush(&mut std::io::stderr());

        let line = tokio::select! {
            line = async { input.lock().await.next_line().await } => line?,
            _ = tokio::signal::ctrl_c() => break,
        };
        // EOF
        let Some(line) = line else {
            break;
        };
        let utterance = line.trim();
        if utterance.is_empty() {
            continue;
        }

        // Ctrl-C during a turn cancels the turn, not the program
        let cancel = CancellationToken::new();
        let watcher = tokio::spawn({
            let cancel = cancel.clone();
            async move {
                if tokio::signal::ctrl_c().await.is_ok() {
                    cancel.cancel();
                }
            }
        });

        let result = conversation.submit(utterance, &cancel).await;
        watcher.abort();
        println!();

        match result {
            Ok(outcome) if outcome.resume_listening => eprintln!("(waiting for your reply)"),
            Ok(_) => {}
            Err(ConversationError::Cancelled) => eprintln!("(cancelled)"),
            Err(e) => {
                tracing::error!(error = %e, "Turn failed");
                eprintln!("Error: {e}");
            }
        }
    }

    tracing::info!(session = %conversation.session_id(), "Conversation ended");
    Ok(())
}
