//! OpenAI chat completions provider
//!
//! Also serves any OpenAI-compatible endpoint (Ollama, vLLM, llama.cpp server)
//! through [`OpenAiProvider::local`].

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};

use crate::error::{CompletionError, CompletionResult};
use crate::provider::ChatCompletionProvider;
use crate::types::{
    ChatMessage, ChatRequest, ChatResponse, CompletionMetadata, ProviderMetadata, ResponseFormat,
};

pub const OPENAI_BASE_URL: &str = "https://api.openai.com/v1";
pub const LOCAL_BASE_URL: &str = "http://localhost:11434/v1";

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(120);

/// OpenAI API provider.
pub struct OpenAiProvider {
    name: &'static str,
    api_key: Option<String>,
    model: String,
    base_url: String,
    timeout: Duration,
    temperature: Option<f32>,
    client: Client,
}

impl OpenAiProvider {
    /// Creates a provider for the hosted OpenAI API.
    pub fn new(api_key: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            name: "OpenAI",
            api_key: Some(api_key.into()),
            model: model.into(),
            base_url: OPENAI_BASE_URL.to_string(),
            timeout: DEFAULT_TIMEOUT,
            temperature: None,
            client: Client::new(),
        }
    }

    /// Creates a provider for an OpenAI-compatible server that may not need a key.
    pub fn local(model: impl Into<String>, api_key: Option<String>) -> Self {
        Self {
            name: "Local",
            api_key: api_key.filter(|k| !k.trim().is_empty()),
            ..Self::new(String::new(), model)
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

    fn endpoint(&self) -> String {
        format!("{}/chat/completions", self.base_url)
    }

    fn build_body<'a>(&'a self, request: &'a ChatRequest) -> OpenAiRequest<'a> {
        OpenAiRequest {
            model: request.resolved_model(&self.model),
            messages: &request.messages,
            temperature: request.temperature.or(self.temperature),
            max_tokens: request.max_tokens,
            response_format: request.response_format.as_ref().map(OpenAiResponseFormat::from),
        }
    }
}

#[derive(Serialize)]
struct OpenAiRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_format: Option<OpenAiResponseFormat<'a>>,
}

#[derive(Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum OpenAiResponseFormat<'a> {
    Text,
    JsonObject,
    JsonSchema { json_schema: OpenAiJsonSchema<'a> },
}

#[derive(Serialize)]
struct OpenAiJsonSchema<'a> {
    name: &'a str,
    schema: &'a serde_json::Value,
    strict: bool,
}

impl<'a> From<&'a ResponseFormat> for OpenAiResponseFormat<'a> {
    fn from(format: &'a ResponseFormat) -> Self {
        match format {
            ResponseFormat::Text => Self::Text,
            ResponseFormat::JsonObject => Self::JsonObject,
            ResponseFormat::JsonSchema {
                name,
                schema,
                strict,
            } => Self::JsonSchema {
                json_schema: OpenAiJsonSchema {
                    name,
                    schema,
                    strict: *strict,
                },
            },
        }
    }
}

#[derive(Deserialize)]
struct OpenAiResponse {
    #[serde(default)]
    model: Option<String>,
    choices: Vec<OpenAiChoice>,
    #[serde(default)]
    usage: Option<OpenAiUsage>,
}

#[derive(Deserialize)]
struct OpenAiChoice {
    message: OpenAiMessage,
}

#[derive(Deserialize)]
struct OpenAiMessage {
    content: Option<String>,
    #[serde(default)]
    refusal: Option<String>,
}

#[derive(Deserialize)]
struct OpenAiUsage {
    total_tokens: u32,
}

fn parse_response(
    provider: &str,
    requested_model: &str,
    body: &str,
) -> CompletionResult<ChatResponse> {
    let response: OpenAiResponse = serde_json::from_str(body)
        .map_err(|e| CompletionError::InvalidResponse(e.to_string()))?;

    let message = response
        .choices
        .into_iter()
        .next()
        .map(|choice| choice.message)
        .ok_or_else(|| {
            CompletionError::InvalidResponse("No completion choices returned".to_string())
        })?;

    let content = match (message.content, message.refusal) {
        (Some(content), _) => content,
        (None, Some(refusal)) => {
            return Err(CompletionError::InvalidResponse(format!(
                "Model refused: {}",
                refusal
            )));
        }
        (None, None) => {
            return Err(CompletionError::InvalidResponse(
                "Completion choice has no content".to_string(),
            ));
        }
    };

    let metadata = CompletionMetadata::new(
        provider,
        response.model.unwrap_or_else(|| requested_model.to_string()),
    )
    .with_tokens(response.usage.map(|u| u.total_tokens));

    Ok(ChatResponse::new(content, metadata))
}

#[async_trait]
impl ChatCompletionProvider for OpenAiProvider {
    async fn complete(&self, request: ChatRequest) -> CompletionResult<ChatResponse> {
        let body = self.build_body(&request);
        let model = body.model.to_string();
        let started = Instant::now();

        let mut http = self
            .client
            .post(self.endpoint())
            .timeout(self.timeout)
            .header("Content-Type", "application/json")
            .json(&body);
        if let Some(api_key) = &self.api_key {
            http = http.header("Authorization", format!("Bearer {}", api_key));
        }

        let response = http.send().await.map_err(CompletionError::from_transport)?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(CompletionError::from_transport)?;

        tracing::debug!(
            provider = self.name,
            model = %model,
            status = status.as_u16(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Chat completion round-trip finished"
        );

        if !status.is_success() {
            return Err(CompletionError::from_status(self.name, status.as_u16(), &text));
        }

        parse_response(self.name, &model, &text)
    }

    fn metadata(&self) -> ProviderMetadata {
        ProviderMetadata::new(self.name, &self.model).with_info(&self.base_url)
    }

    fn is_available(&self) -> bool {
        match &self.api_key {
            Some(key) => !key.trim().is_empty(),
            None => self.name == "Local",
        }
    }

    fn supports_structured_output(&self) -> bool {
        true
    }
}
