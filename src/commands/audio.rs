//! Spoken responses

use super::{CommandHandler, HandlerContext, HandlerError};
use crate::protocol::RequestPayload;
use crate::ui::AudioSink;
use async_trait::async_trait;
use base64::Engine;
use std::sync::Arc;

/// Decodes a base64 clip and queues it for playback. Contributes nothing to
/// the next request.
pub struct VoiceHandler {
    sink: Arc<dyn AudioSink>,
}

impl VoiceHandler {
    pub fn new(sink: Arc<dyn AudioSink>) -> Self {
        Self { sink }
    }
}

#[async_trait]
impl CommandHandler for VoiceHandler {
    fn error_title(&self) -> &'static str {
        "Audio Error"
    }

    async fn handle(
        &self,
        args: String,
        _ctx: &HandlerContext,
    ) -> Result<Vec<RequestPayload>, HandlerError> {
        let encoded: String = args.split_whitespace().collect();
        if encoded.is_empty() {
            return Ok(Vec::new());
        }
        let clip = base64::engine::general_purpose::STANDARD.decode(encoded)?;
        tracing::debug!(bytes = clip.len(), "Queueing voice clip");
        self.sink.enqueue(clip);
        Ok(Vec::new())
    }
}
