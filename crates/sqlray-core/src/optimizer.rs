//! Query optimizer
//!
//! Orchestrates one optimization: extract tables, filter the schema down to
//! them, build the optimization prompt, call the model and parse its answer.
//! Both model calls are sequential because the second prompt depends on the
//! first answer.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use sqlray_ai::{ChatCompletionProvider, ChatRequest, ResponseFormat};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use crate::error::{OptimizerError, OptimizerResult};
use crate::extractor::{TableExtractor, complete};
use crate::filter::{FilteredMetadata, MetadataFilter};
use crate::prompt;
use crate::response::parse_json_response;
use crate::schema::SchemaStore;

/// Everything the optimization prompt is built from.
#[derive(Debug, Clone, PartialEq)]
pub struct OptimizationRequest {
    /// The original query, verbatim
    pub query: String,
    /// Tables the model reported for the query
    pub tables: Vec<String>,
    pub metadata: FilteredMetadata,
    pub server_version: String,
}

impl OptimizationRequest {
    pub fn prompt(&self) -> String {
        prompt::optimization_prompt(self)
    }
}

/// The model's optimization proposal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OptimizationResult {
    /// DDL or setup statements to run before the query; empty means no schema changes
    pub prepare_query: Vec<String>,
    /// Rewritten query, complete and directly executable
    pub query: String,
    /// Advisory score in [0, 1] as reported by the model, never clamped
    #[serde(default)]
    pub optimization_score: Option<f64>,
    pub explanation: String,
}

impl OptimizationResult {
    /// Parses the optimization answer, rejecting an empty rewritten query.
    pub fn from_response(text: &str) -> OptimizerResult<Self> {
        let result: Self = parse_json_response(text, true)?;
        if result.query.trim().is_empty() {
            tracing::warn!("Model returned an empty optimized query");
            return Err(OptimizerError::ResponseParse(
                "optimized query is empty".to_string(),
            ));
        }
        Ok(result)
    }

    pub fn has_schema_changes(&self) -> bool {
        !self.prepare_query.is_empty()
    }
}

/// A session: one provider, one model and the loaded schema.
pub struct QueryOptimizer {
    provider: Arc<dyn ChatCompletionProvider>,
    model: String,
    schema: SchemaStore,
    timeout: Option<Duration>,
}

impl QueryOptimizer {
    pub fn new(provider: Arc<dyn ChatCompletionProvider>, model: impl Into<String>) -> Self {
        Self {
            provider,
            model: model.into(),
            schema: SchemaStore::new(),
            timeout: None,
        }
    }

    /// Bounds each of the two model calls.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn schema(&self) -> &SchemaStore {
        &self.schema
    }

    pub fn load_schema(&mut self, raw: &Value) -> OptimizerResult<()> {
        self.schema.load(raw)
    }

    pub fn load_schema_file(&mut self, path: impl AsRef<Path>) -> OptimizerResult<()> {
        self.schema.load_file(path)
    }

    pub async fn extract_tables(&self, query: &str) -> OptimizerResult<Vec<String>> {
        TableExtractor::new(self.provider.as_ref(), &self.model)
            .with_timeout(self.timeout)
            .extract(query)
            .await
    }

    /// Extracts tables and assembles the optimization request without
    /// making the second model call.
    pub async fn prepare(&self, query: &str) -> OptimizerResult<OptimizationRequest> {
        let description = self
            .schema
            .description()
            .ok_or(OptimizerError::SchemaNotLoaded)?;

        let tables = self.extract_tables(query).await?;
        let metadata = MetadataFilter::new(tables.iter().cloned()).filter(description);

        if metadata.is_empty() {
            tracing::info!(tables = ?tables, "No schema records match the extracted tables");
        }

        Ok(OptimizationRequest {
            query: query.to_string(),
            tables,
            metadata,
            server_version: description.version.clone(),
        })
    }

    #[tracing::instrument(skip_all, fields(model = %self.model, query_len = query.len()))]
    pub async fn optimize(&self, query: &str) -> OptimizerResult<OptimizationResult> {
        let request = self.prepare(query).await?;

        let mut chat = ChatRequest::single_turn(&self.model, request.prompt());
        if self.provider.supports_structured_output() {
            chat = chat.with_response_format(ResponseFormat::json_schema(
                "optimization_result",
                prompt::optimization_response_schema(),
            ));
        }

        let response = complete(self.provider.as_ref(), chat, self.timeout, "optimize").await?;
        let result = OptimizationResult::from_response(&response.content)?;

        tracing::info!(
            prepare_statements = result.prepare_query.len(),
            score = ?result.optimization_score,
            "Query optimized"
        );
        Ok(result)
    }
}
