//! Web search

use super::html::{parse_search_results, SearchResult};
use super::{CommandHandler, HandlerContext, HandlerError};
use crate::protocol::RequestPayload;
use async_trait::async_trait;
use reqwest::Client;
use serde_json::json;

pub struct SearchHandler {
    client: Client,
    endpoint: String,
}

impl SearchHandler {
    pub fn new(client: Client, endpoint: impl Into<String>) -> Self {
        Self {
            client,
            endpoint: endpoint.into(),
        }
    }

    async fn fetch(&self, query: &str) -> Result<String, HandlerError> {
        let response = self
            .client
            .get(&self.endpoint)
            .query(&[("q", query)])
            .send()
            .await?
            .error_for_status()?;
        Ok(response.text().await?)
    }
}

#[async_trait]
impl CommandHandler for SearchHandler {
    async fn handle(
        &self,
        args: String,
        ctx: &HandlerContext,
    ) -> Result<Vec<RequestPayload>, HandlerError> {
        let query = args.trim();
        ctx.notifier.status(&format!("Searching for {query}"), true);

        // Fetch failures still answer with an empty result list
        let results: Vec<SearchResult> = match self.fetch(query).await {
            Ok(page) => parse_search_results(&page),
            Err(e) => {
                tracing::warn!(query, error = %e, "Search fetch failed");
                Vec::new()
            }
        };
        tracing::info!(query, results = results.len(), "Search completed");

        let info = serde_json::to_string(&results)?;
        Ok(vec![RequestPayload::new(
            "search",
            json!({ "query": query, "info": info }),
        )])
    }
}
