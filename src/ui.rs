//! Presentation capabilities the conversation core calls into
//!
//! The core never renders anything itself: statuses, errors, approval
//! prompts, cards and audio are all handed to these traits.

use crate::stream::ChannelReader;
use async_trait::async_trait;

/// Scripting indicator shown while a script payload is in flight
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScriptingPhase {
    Idle,
    /// Script is streaming in and will run without review
    Scripting,
    /// Script is streaming in and will be rated before it runs
    Evaluating,
}

#[async_trait]
pub trait Notifier: Send + Sync {
    /// A new round's response started streaming; stale panels can go
    fn round_started(&self) {}

    /// Progress line such as "Searching for ..."
    fn status(&self, text: &str, loading: bool);

    fn scripting_phase(&self, phase: ScriptingPhase);

    /// A command failed; the round carries on without its result
    fn error(&self, title: &str, detail: &str);

    /// Ask the user whether a rated script may run
    async fn request_approval(&self, rating: Option<u32>, review: &str) -> bool;

    /// Take ownership of a card's stream. The reader must be drained or
    /// dropped, otherwise the round cannot close the card's channel.
    fn hand_off_card(&self, card: ChannelReader);

    /// Assistant text arriving on the base channel
    fn response_text(&self, chunk: &str);
}

/// Queue for synthesized speech
pub trait AudioSink: Send + Sync {
    /// Queue an encoded clip (MP3) for playback after anything already queued
    fn enqueue(&self, clip: Vec<u8>);
}
