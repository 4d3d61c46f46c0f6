use super::{CommandHandler, HandlerContext, HandlerError};
use crate::protocol::RequestPayload;
use async_trait::async_trait;

/// Echoes payloads with an unrecognized tag back to the server
pub struct UnknownHandler;

#[async_trait]
impl CommandHandler for UnknownHandler {
    async fn handle(
        &self,
        args: String,
        _ctx: &HandlerContext,
    ) -> Result<Vec<RequestPayload>, HandlerError> {
        tracing::warn!(bytes = args.len(), "Unrecognized command payload");
        Ok(vec![RequestPayload::new("unknown", args)])
    }
}
