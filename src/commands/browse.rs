//! Page fetch

use super::html::page_text;
use super::{CommandHandler, HandlerContext, HandlerError};
use crate::protocol::RequestPayload;
use async_trait::async_trait;
use reqwest::Client;
use serde_json::json;

pub struct BrowseHandler {
    client: Client,
}

impl BrowseHandler {
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl CommandHandler for BrowseHandler {
    async fn handle(
        &self,
        args: String,
        ctx: &HandlerContext,
    ) -> Result<Vec<RequestPayload>, HandlerError> {
        let url = args.trim();
        if url.is_empty() {
            return Err(HandlerError::invalid("No URL to browse"));
        }
        ctx.notifier.status(&format!("Accessing {url}"), true);

        let body = self.client.get(url).send().await?.text().await?;
        let info = page_text(&body);
        tracing::info!(url, bytes = body.len(), text = info.len(), "Fetched page");

        Ok(vec![RequestPayload::new(
            "browse",
            json!({ "url": url, "info": info }),
        )])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::StaticSettings;
    use crate::conversation::testing::MockNotifier;
    use std::sync::Arc;

    fn ctx() -> HandlerContext {
        HandlerContext::new(
            Arc::new(MockNotifier::new()),
            Arc::new(StaticSettings::default()),
        )
    }

    #[tokio::test]
    async fn test_empty_url_is_rejected() {
        let handler = BrowseHandler::new(Client::new());
        let err = handler.handle("  ".to_string(), &ctx()).await;
        assert!(matches!(err, Err(HandlerError::InvalidArguments(_))));
    }

    #[tokio::test]
    async fn test_unreachable_page_fails() {
        let handler = BrowseHandler::new(Client::new());
        let err = handler.handle("http://127.0.0.1:1/".to_string(), &ctx()).await;
        assert!(matches!(err, Err(HandlerError::Http(_))));
    }
}
