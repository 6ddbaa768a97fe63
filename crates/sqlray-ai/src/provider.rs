//! Provider trait and factory

use async_trait::async_trait;
use sqlray_settings::AiProvider;
use std::time::Duration;

use crate::anthropic::AnthropicProvider;
use crate::error::CompletionResult;
use crate::openai::{LOCAL_BASE_URL, OpenAiProvider};
use crate::types::{ChatRequest, ChatResponse, ProviderMetadata};

/// Chat completion provider trait.
///
/// Implement this trait to plug a new LLM backend into SQLRay. A provider
/// performs exactly one network round-trip per [`complete`](Self::complete)
/// call and never retries on its own.
#[async_trait]
pub trait ChatCompletionProvider: Send + Sync {
    /// Sends the conversation and returns the text of the first choice.
    async fn complete(&self, request: ChatRequest) -> CompletionResult<ChatResponse>;

    /// Get metadata about the provider.
    fn metadata(&self) -> ProviderMetadata;

    /// Returns false if API keys are missing or the provider is otherwise unusable.
    fn is_available(&self) -> bool;

    /// Whether the backend honours [`ResponseFormat::JsonSchema`](crate::ResponseFormat::JsonSchema).
    ///
    /// Callers that get `false` must ask for JSON in the prompt instead.
    fn supports_structured_output(&self) -> bool {
        false
    }
}

/// Knobs shared by every concrete provider.
#[derive(Debug, Clone, Default)]
pub struct ProviderOptions {
    pub base_url: Option<String>,
    pub timeout: Option<Duration>,
    pub temperature: Option<f32>,
}

/// Factory for creating chat providers based on settings.
pub struct AiProviderFactory;

impl AiProviderFactory {
    /// Creates a provider for the given configuration.
    ///
    /// Returns `None` if the provider is set to `AiProvider::None` or
    /// if a hosted provider has no API key.
    pub fn create_provider(
        provider: AiProvider,
        api_key: Option<String>,
        model: impl Into<String>,
        options: ProviderOptions,
    ) -> Option<Box<dyn ChatCompletionProvider>> {
        let model = model.into();
        match provider {
            AiProvider::OpenAi => {
                let api_key = api_key.filter(|k| !k.trim().is_empty())?;
                Some(Box::new(Self::configure_openai(
                    OpenAiProvider::new(api_key, model),
                    options,
                )))
            }
            AiProvider::Anthropic => {
                let api_key = api_key.filter(|k| !k.trim().is_empty())?;
                let mut anthropic = AnthropicProvider::new(api_key, model);
                if let Some(base_url) = options.base_url {
                    anthropic = anthropic.with_base_url(base_url);
                }
                if let Some(timeout) = options.timeout {
                    anthropic = anthropic.with_timeout(timeout);
                }
                if let Some(temperature) = options.temperature {
                    anthropic = anthropic.with_temperature(temperature);
                }
                Some(Box::new(anthropic))
            }
            AiProvider::Local => {
                let local = OpenAiProvider::local(model, api_key).with_base_url(LOCAL_BASE_URL);
                Some(Box::new(Self::configure_openai(local, options)))
            }
            AiProvider::None => None,
        }
    }

    fn configure_openai(mut provider: OpenAiProvider, options: ProviderOptions) -> OpenAiProvider {
        if let Some(base_url) = options.base_url {
            provider = provider.with_base_url(base_url);
        }
        if let Some(timeout) = options.timeout {
            provider = provider.with_timeout(timeout);
        }
        if let Some(temperature) = options.temperature {
            provider = provider.with_temperature(temperature);
        }
        provider
    }
}
