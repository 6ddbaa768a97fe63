//! Building an optimizer session from flags and saved settings

use anyhow::{Result, anyhow};
use clap::Args;
use sqlray_ai::{AiProvider, AiProviderFactory, ProviderOptions};
use sqlray_core::QueryOptimizer;
use sqlray_settings::SqlRaySettings;
use std::sync::Arc;
use std::time::Duration;

/// Provider flags shared by every subcommand.
#[derive(Args, Debug, Clone, Default)]
pub struct ProviderArgs {
    /// API key for the provider; falls back to its environment variable
    #[arg(short = 'k', long)]
    pub api_key: Option<String>,

    /// Model to use, e.g. gpt-4o
    #[arg(short, long, env = "SQLRAY_MODEL")]
    pub model: Option<String>,

    /// AI provider: openai, anthropic, local or none
    #[arg(long, env = "SQLRAY_PROVIDER")]
    pub provider: Option<AiProvider>,

    /// Override the provider's API endpoint
    #[arg(long)]
    pub base_url: Option<String>,

    /// Per-request timeout in seconds
    #[arg(long, value_name = "SECS")]
    pub timeout: Option<u64>,

    /// Remember provider, model, endpoint and timeout as the new defaults
    #[arg(long)]
    pub save_settings: bool,
}

/// Fully resolved provider configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionConfig {
    pub provider: AiProvider,
    pub model: String,
    pub api_key: Option<String>,
    pub base_url: Option<String>,
    pub timeout: Duration,
    pub temperature: Option<f32>,
}

impl ProviderArgs {
    /// Merges flags over saved settings. Flags win; a provider switched on
    /// the command line ignores the saved model and key.
    pub fn resolve(&self, settings: &SqlRaySettings) -> SessionConfig {
        self.resolve_with(settings, |name| std::env::var(name).ok())
    }

    pub fn resolve_with<F>(&self, settings: &SqlRaySettings, env: F) -> SessionConfig
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut effective = settings.clone();
        if let Some(provider) = self.provider {
            if provider != settings.provider {
                effective.provider = provider;
                effective.model = String::new();
                effective.api_key = None;
            }
        }

        let model = self
            .model
            .clone()
            .filter(|m| !m.trim().is_empty())
            .or_else(|| (!effective.model.is_empty()).then(|| effective.model.clone()))
            .unwrap_or_else(|| effective.provider.default_model().to_string());

        SessionConfig {
            provider: effective.provider,
            model,
            api_key: effective.resolve_api_key_with(self.api_key.as_deref(), env),
            base_url: self.base_url.clone().or_else(|| effective.base_url.clone()),
            timeout: self
                .timeout
                .map(Duration::from_secs)
                .unwrap_or_else(|| effective.timeout()),
            temperature: effective.temperature,
        }
    }
}

impl SessionConfig {
    /// Creates the optimizer, failing when the provider cannot be built.
    pub fn build_optimizer(&self) -> Result<QueryOptimizer> {
        let options = ProviderOptions {
            base_url: self.base_url.clone(),
            timeout: Some(self.timeout),
            temperature: self.temperature,
        };

        let provider = AiProviderFactory::create_provider(
            self.provider,
            self.api_key.clone(),
            self.model.clone(),
            options,
        )
        .ok_or_else(|| self.missing_provider_error())?;

        tracing::debug!(
            provider = %self.provider,
            model = %self.model,
            timeout_secs = self.timeout.as_secs(),
            "Provider configured"
        );

        Ok(QueryOptimizer::new(Arc::from(provider), self.model.clone()).with_timeout(self.timeout))
    }

    /// Settings to persist for this session. Keys given on the command line
    /// or at a prompt are never written; a saved key is kept only while the
    /// provider stays the same.
    pub fn to_settings(&self, base: &SqlRaySettings) -> SqlRaySettings {
        SqlRaySettings {
            provider: self.provider,
            model: self.model.clone(),
            api_key: base.api_key.clone().filter(|_| base.provider == self.provider),
            base_url: self.base_url.clone(),
            timeout_secs: self.timeout.as_secs(),
            temperature: self.temperature,
        }
    }

    pub fn save_settings(&self, base: &SqlRaySettings) -> Result<()> {
        let settings = self.to_settings(base);
        settings.save()?;
        tracing::info!(provider = %settings.provider, model = %settings.model, "Settings saved");
        Ok(())
    }

    fn missing_provider_error(&self) -> anyhow::Error {
        match self.provider.api_key_env_var() {
            Some(var) if self.provider.requires_api_key() => anyhow!(
                "No API key for {}: pass --api-key or set {}",
                self.provider.display_name(),
                var
            ),
            _ => anyhow!("AI provider is disabled; choose one with --provider"),
        }
    }
}
