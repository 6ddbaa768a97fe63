//! Common test utilities and mocks

#![allow(dead_code)]

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::{Value, json};
use sqlray_ai::{
    ChatCompletionProvider, ChatRequest, ChatResponse, CompletionError, CompletionMetadata,
    CompletionResult, ProviderMetadata,
};
use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

/// Mock provider that replays scripted replies in order.
///
/// Every request is recorded so tests can assert on the prompts that were
/// sent and on the number of round-trips.
pub struct MockProvider {
    replies: Mutex<VecDeque<CompletionResult<String>>>,
    requests: Arc<Mutex<Vec<ChatRequest>>>,
    structured: bool,
    delay: Option<Duration>,
}

impl MockProvider {
    pub fn new() -> Self {
        Self {
            replies: Mutex::new(VecDeque::new()),
            requests: Arc::new(Mutex::new(Vec::new())),
            structured: false,
            delay: None,
        }
    }

    pub fn with_reply(self, text: impl Into<String>) -> Self {
        self.replies.lock().push_back(Ok(text.into()));
        self
    }

    pub fn with_failure(self, err: CompletionError) -> Self {
        self.replies.lock().push_back(Err(err));
        self
    }

    pub fn with_structured_output(mut self) -> Self {
        self.structured = true;
        self
    }

    /// Sleeps before answering each request.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn requests(&self) -> Vec<ChatRequest> {
        self.requests.lock().clone()
    }

    pub fn request_count(&self) -> usize {
        self.requests.lock().len()
    }

    /// Content of the single user turn of the n-th request.
    pub fn prompt(&self, index: usize) -> String {
        self.requests.lock()[index].messages[0].content.clone()
    }
}

#[async_trait]
impl ChatCompletionProvider for MockProvider {
    async fn complete(&self, request: ChatRequest) -> CompletionResult<ChatResponse> {
        let model = request.model.clone();
        self.requests.lock().push(request);

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        let reply = self.replies.lock().pop_front().unwrap_or_else(|| {
            Err(CompletionError::Other("no scripted reply left".to_string()))
        });
        reply.map(|text| ChatResponse::new(text, CompletionMetadata::new("mock", model)))
    }

    fn metadata(&self) -> ProviderMetadata {
        ProviderMetadata::new("mock", "mock-model")
    }

    fn is_available(&self) -> bool {
        true
    }

    fn supports_structured_output(&self) -> bool {
        self.structured
    }
}

/// Schema with two tables, `orders` and `customers`.
pub fn shop_schema() -> Value {
    json!({
        "columns": [
            {"table": "orders", "name": "id", "type": "bigint"},
            {"table": "orders", "name": "customer_id", "type": "bigint"},
            {"table": "customers", "name": "id", "type": "bigint"},
            {"table": "customers", "name": "email", "type": "text"},
            {"table": "orders", "name": "created_at", "type": "timestamptz"}
        ],
        "indexes": [
            {"table": "orders", "name": "orders_pkey", "columns": ["id"]},
            {"table": "customers", "name": "customers_email_key", "columns": ["email"]}
        ],
        "tables": [
            {"table": "orders", "rows": 1500000},
            {"table": "customers", "rows": 40000}
        ],
        "views": [
            {"table": "customers", "name": "active_customers"}
        ],
        "version": "PostgreSQL 14.5"
    })
}

pub fn optimization_reply(query: &str) -> String {
    json!({
        "prepare_query": ["CREATE INDEX orders_created_at_idx ON orders (created_at)"],
        "query": query,
        "optimization_score": 0.6,
        "explanation": "An index on created_at lets the planner avoid a sequential scan."
    })
    .to_string()
}
