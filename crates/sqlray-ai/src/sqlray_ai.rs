//! SQLRay AI - Chat completion providers
//!
//! This crate defines the interface the optimizer uses to talk to a large
//! language model, plus concrete backends:
//!
//! - [`OpenAiProvider`] - OpenAI chat completions, or any compatible server
//! - [`AnthropicProvider`] - Anthropic messages API
//!
//! Providers are created from settings through [`AiProviderFactory`].

mod anthropic;
mod error;
mod openai;
mod provider;
mod types;

pub use anthropic::{ANTHROPIC_BASE_URL, AnthropicProvider};
pub use error::{CompletionError, CompletionResult};
pub use openai::{LOCAL_BASE_URL, OPENAI_BASE_URL, OpenAiProvider};
pub use provider::{AiProviderFactory, ChatCompletionProvider, ProviderOptions};
pub use sqlray_settings::AiProvider;
pub use types::{
    ChatMessage, ChatRequest, ChatResponse, CompletionMetadata, ProviderMetadata, ResponseFormat,
    Role,
};
