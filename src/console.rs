//! Terminal front end for the binary
//!
//! Assistant text and cards go to stdout; statuses, errors and prompts go to
//! stderr.

use crate::stream::ChannelReader;
use crate::ui::{AudioSink, Notifier, ScriptingPhase};
use async_trait::async_trait;
use futures::StreamExt;
use std::io::Write;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader, Lines, Stdin};
use tokio::sync::Mutex;

/// Stdin lines, shared between the utterance prompt and approval prompts
pub type SharedInput = Arc<Mutex<Lines<BufReader<Stdin>>>>;

pub fn stdin_lines() -> SharedInput {
    Arc::new(Mutex::new(BufReader::new(tokio::io::stdin()).lines()))
}

/// Flush `out`, logging a failure. Returns whether the flush went through.
pub fn flush(out: &mut impl Write) -> bool {
    match out.flush() {
        Ok(()) => true,
        Err(e) => {
            tracing::debug!(error = %e, "Failed to flush terminal output");
            false
        }
    }
}

fn write_stdout(text: &str) {
    let mut out = std::io::stdout().lock();
    if let Err(e) = out.write_all(text.as_bytes()) {
        tracing::debug!(error = %e, "Failed to write to stdout");
        return;
    }
    flush(&mut out);
}

fn is_yes(answer: &str) -> bool {
    matches!(answer.trim().to_ascii_lowercase().as_str(), "y" | "yes")
}

pub struct ConsoleNotifier {
    input: SharedInput,
}

impl ConsoleNotifier {
    pub fn new(input: SharedInput) -> Self {
        Self { input }
    }
}

#[async_trait]
impl Notifier for ConsoleNotifier {
    fn status(&self, text: &str, loading: bool) {
        let suffix = if loading { "..." } else { "" };
        eprintln!("[{text}{suffix}]");
    }

    fn scripting_phase(&self, phase: ScriptingPhase) {
        match phase {
            ScriptingPhase::Scripting => eprintln!("[Writing a script...]"),
            ScriptingPhase::Evaluating => eprintln!("[Evaluating a script...]"),
            ScriptingPhase::Idle => {}
        }
    }

    fn error(&self, title: &str, detail: &str) {
        eprintln!("{title}: {detail}");
    }

    async fn request_approval(&self, rating: Option<u32>, review: &str) -> bool {
        let rating = rating.map_or_else(|| "unrated".to_string(), |r| format!("risk {r}/100"));
        eprint!("\nScript review ({rating}): {review}\nRun it? [y/N] ");
        flush(&mut std::io::stderr());

        match self.input.lock().await.next_line().await {
            Ok(Some(answer)) => is_yes(&answer),
            Ok(None) => false,
            Err(e) => {
                tracing::warn!(error = %e, "Failed to read approval");
                false
            }
        }
    }

    fn hand_off_card(&self, card: ChannelReader) {
        tokio::spawn(async move {
            let mut chunks = std::pin::pin!(card.into_stream());
            write_stdout("\n---\n");
            while let Some(chunk) = chunks.next().await {
                match chunk {
                    Ok(text) => write_stdout(&text),
                    Err(e) => {
                        tracing::warn!(error = %e, "Card stream ended early");
                        break;
                    }
                }
            }
            write_stdout("\n---\n");
        });
    }

    fn response_text(&self, chunk: &str) {
        write_stdout(chunk);
    }
}

/// Audio sink for terminals without playback: clips are logged and dropped
pub struct LoggingAudioSink;

impl AudioSink for LoggingAudioSink {
    fn enqueue(&self, clip: Vec<u8>) {
        tracing::debug!(bytes = clip.len(), "Dropping voice clip, no audio output");
    }
}
