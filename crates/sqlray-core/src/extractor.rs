//! Table extraction
//!
//! SQL is never parsed locally. The model is asked which tables a query
//! touches, which copes with dialect differences, CTEs and subqueries.

use serde::Deserialize;
use sqlray_ai::{ChatCompletionProvider, ChatRequest, ChatResponse};
use std::time::{Duration, Instant};

use crate::error::{OptimizerError, OptimizerResult};
use crate::prompt;
use crate::response::parse_json_response;

#[derive(Debug, Deserialize)]
struct ExtractedTables {
    tables: Vec<String>,
}

/// Asks the model for the tables referenced by a query.
pub struct TableExtractor<'a> {
    provider: &'a dyn ChatCompletionProvider,
    model: &'a str,
    timeout: Option<Duration>,
}

impl<'a> TableExtractor<'a> {
    pub fn new(provider: &'a dyn ChatCompletionProvider, model: &'a str) -> Self {
        Self {
            provider,
            model,
            timeout: None,
        }
    }

    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    /// Returns table names in the order the model listed them.
    #[tracing::instrument(skip_all, fields(model = %self.model))]
    pub async fn extract(&self, query: &str) -> OptimizerResult<Vec<String>> {
        let request = ChatRequest::single_turn(self.model, prompt::table_extraction_prompt(query));
        let response = complete(self.provider, request, self.timeout, "extract_tables").await?;

        let extracted: ExtractedTables = parse_json_response(&response.content, false)?;
        tracing::debug!(tables = ?extracted.tables, "Extracted tables");
        Ok(extracted.tables)
    }
}

/// Sends one request, bounded by `timeout` when given.
pub(crate) async fn complete(
    provider: &dyn ChatCompletionProvider,
    request: ChatRequest,
    timeout: Option<Duration>,
    step: &'static str,
) -> OptimizerResult<ChatResponse> {
    let started = Instant::now();
    let prompt_chars = request.prompt_length();

    let response = match timeout {
        Some(limit) => tokio::time::timeout(limit, provider.complete(request))
            .await
            .map_err(|_| OptimizerError::Timeout)?,
        None => provider.complete(request).await,
    };

    match &response {
        Ok(reply) => tracing::debug!(
            step,
            model = %reply.metadata.model,
            prompt_chars,
            tokens_used = ?reply.metadata.tokens_used,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Completion received"
        ),
        Err(err) => tracing::warn!(
            step,
            error = %err,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Completion failed"
        ),
    }

    response.map_err(OptimizerError::from)
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use sqlray_ai::{CompletionError, CompletionMetadata, CompletionResult, ProviderMetadata};

    struct CannedProvider(CompletionResult<String>);

    #[async_trait]
    impl ChatCompletionProvider for CannedProvider {
        async fn complete(&self, _request: ChatRequest) -> CompletionResult<ChatResponse> {
            self.0
                .clone()
                .map(|text| ChatResponse::new(text, CompletionMetadata::new("canned", "test")))
        }

        fn metadata(&self) -> ProviderMetadata {
            ProviderMetadata::new("canned", "test")
        }

        fn is_available(&self) -> bool {
            true
        }
    }

    #[tokio::test]
    async fn test_extract_plain_json() {
        let provider = CannedProvider(Ok(r#"{"tables": ["orders","users"]}"#.to_string()));
        let tables = TableExtractor::new(&provider, "test")
            .extract("SELECT * FROM orders JOIN users USING (user_id)")
            .await
            .unwrap();
        assert_eq!(tables, vec!["orders", "users"]);
    }

    #[tokio::test]
    async fn test_extract_fenced_json() {
        let provider = CannedProvider(Ok("```json\n{\"tables\": [\"a\"]}\n```".to_string()));
        let tables = TableExtractor::new(&provider, "test")
            .extract("SELECT 1 FROM a")
            .await
            .unwrap();
        assert_eq!(tables, vec!["a"]);
    }

    #[tokio::test]
    async fn test_extract_missing_tables_key() {
        let provider = CannedProvider(Ok(r#"{"table": "orders"}"#.to_string()));
        let err = TableExtractor::new(&provider, "test")
            .extract("SELECT 1 FROM orders")
            .await
            .unwrap_err();
        assert!(matches!(err, OptimizerError::ResponseParse(_)));
    }

    #[tokio::test]
    async fn test_extract_upstream_failure() {
        let provider = CannedProvider(Err(CompletionError::Authentication("bad key".into())));
        let err = TableExtractor::new(&provider, "test")
            .extract("SELECT 1 FROM orders")
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            OptimizerError::Upstream(CompletionError::Authentication(_))
        ));
    }
}
