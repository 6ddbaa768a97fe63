//! Anthropic messages API provider

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};

use crate::error::{CompletionError, CompletionResult};
use crate::provider::ChatCompletionProvider;
use crate::types::{ChatRequest, ChatResponse, CompletionMetadata, ProviderMetadata, Role};

pub const ANTHROPIC_BASE_URL: &str = "https://api.anthropic.com/v1";
const ANTHROPIC_VERSION: &str = "2023-06-01";

/// The messages API rejects requests without `max_tokens`.
const DEFAULT_MAX_TOKENS: u32 = 4096;
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(120);

/// Anthropic API provider.
pub struct AnthropicProvider {
    api_key: String,
    model: String,
    base_url: String,
    timeout: Duration,
    temperature: Option<f32>,
    client: Client,
}

impl AnthropicProvider {
    pub fn new(api_key: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            model: model.into(),
            base_url: ANTHROPIC_BASE_URL.to_string(),
            timeout: DEFAULT_TIMEOUT,
            temperature: None,
            client: Client::new(),
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    fn build_body<'a>(&'a self, request: &'a ChatRequest) -> AnthropicRequest<'a> {
        // System turns are not part of `messages` for this API.
        let system: Vec<&str> = request
            .messages
            .iter()
            .filter(|m| m.role == Role::System)
            .map(|m| m.content.as_str())
            .collect();

        let messages = request
            .messages
            .iter()
            .filter(|m| m.role != Role::System)
            .map(|m| AnthropicMessage {
                role: m.role.as_str(),
                content: &m.content,
            })
            .collect();

        AnthropicRequest {
            model: request.resolved_model(&self.model),
            max_tokens: request.max_tokens.unwrap_or(DEFAULT_MAX_TOKENS),
            system: (!system.is_empty()).then(|| system.join("\n\n")),
            messages,
            temperature: request.temperature.or(self.temperature),
        }
    }
}

#[derive(Serialize)]
struct AnthropicRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    system: Option<String>,
    messages: Vec<AnthropicMessage<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
}

#[derive(Serialize)]
struct AnthropicMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Deserialize)]
struct AnthropicResponse {
    #[serde(default)]
    model: Option<String>,
    content: Vec<AnthropicContentBlock>,
    #[serde(default)]
    usage: Option<AnthropicUsage>,
}

#[derive(Deserialize)]
struct AnthropicContentBlock {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    text: Option<String>,
}

#[derive(Deserialize)]
struct AnthropicUsage {
    input_tokens: u32,
    output_tokens: u32,
}

fn parse_response(requested_model: &str, body: &str) -> CompletionResult<ChatResponse> {
    let response: AnthropicResponse = serde_json::from_str(body)
        .map_err(|e| CompletionError::InvalidResponse(e.to_string()))?;

    let text: String = response
        .content
        .into_iter()
        .filter(|block| block.kind == "text")
        .filter_map(|block| block.text)
        .collect();

    if text.trim().is_empty() {
        return Err(CompletionError::InvalidResponse(
            "Empty completion returned".to_string(),
        ));
    }

    let metadata = CompletionMetadata::new(
        "Anthropic",
        response.model.unwrap_or_else(|| requested_model.to_string()),
    )
    .with_tokens(response.usage.map(|u| u.input_tokens + u.output_tokens));

    Ok(ChatResponse::new(text, metadata))
}

#[async_trait]
impl ChatCompletionProvider for AnthropicProvider {
    async fn complete(&self, request: ChatRequest) -> CompletionResult<ChatResponse> {
        let body = self.build_body(&request);
        let model = body.model.to_string();
        let started = Instant::now();

        let response = self
            .client
            .post(format!("{}/messages", self.base_url))
            .timeout(self.timeout)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await
            .map_err(CompletionError::from_transport)?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(CompletionError::from_transport)?;

        tracing::debug!(
            provider = "Anthropic",
            model = %model,
            status = status.as_u16(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Messages round-trip finished"
        );

        if !status.is_success() {
            return Err(CompletionError::from_status("Anthropic", status.as_u16(), &text));
        }

        parse_response(&model, &text)
    }

    fn metadata(&self) -> ProviderMetadata {
        ProviderMetadata::new("Anthropic", &self.model).with_info(&self.base_url)
    }

    fn is_available(&self) -> bool {
        !self.api_key.trim().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ChatMessage;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn test_system_messages_are_lifted() {
        let provider = AnthropicProvider::new("sk-ant", "claude-3-5-sonnet-latest");
        let request = ChatRequest::new("")
            .with_message(ChatMessage::system("Answer in JSON."))
            .with_message(ChatMessage::user("SELECT * FROM orders"));

        let body = serde_json::to_value(provider.build_body(&request)).unwrap();
        assert_eq!(
            body,
            json!({
                "model": "claude-3-5-sonnet-latest",
                "max_tokens": 4096,
                "system": "Answer in JSON.",
                "messages": [{"role": "user", "content": "SELECT * FROM orders"}]
            })
        );
    }

    #[test]
    fn test_parse_response_joins_text_blocks() {
        let body = r#"{
            "model": "claude-3-5-sonnet-20241022",
            "content": [{"type": "text", "text": "{\"tables\": "}, {"type": "text", "text": "[\"a\"]}"}],
            "usage": {"input_tokens": 12, "output_tokens": 8}
        }"#;

        let response = parse_response("claude-3-5-sonnet-latest", body).unwrap();
        assert_eq!(response.content, r#"{"tables": ["a"]}"#);
        assert_eq!(response.metadata.tokens_used, Some(20));
        assert_eq!(response.metadata.model, "claude-3-5-sonnet-20241022");
    }

    #[test]
    fn test_parse_empty_response() {
        let err = parse_response("m", r#"{"content": []}"#).unwrap_err();
        assert_eq!(
            err,
            CompletionError::InvalidResponse("Empty completion returned".to_string())
        );
    }
}
