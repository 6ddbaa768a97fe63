//! SQLRay Settings
//!
//! Persisted user preferences for the command-line tool:
//! - Which AI provider and model to talk to
//! - An optional API key fallback and endpoint override
//! - Request timeout and sampling temperature

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::str::FromStr;

mod settings_file;

pub use settings_file::*;

/// Default request timeout, in seconds, applied to each completion call.
pub const DEFAULT_TIMEOUT_SECS: u64 = 120;

/// AI provider used for table extraction and optimization
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AiProvider {
    /// OpenAI chat completions API
    #[default]
    OpenAi,
    /// Anthropic messages API
    Anthropic,
    /// OpenAI-compatible server running locally (Ollama, llama.cpp, vLLM)
    Local,
    /// No AI provider (disabled)
    None,
}

impl AiProvider {
    pub fn display_name(&self) -> &'static str {
        match self {
            Self::OpenAi => "OpenAI",
            Self::Anthropic => "Anthropic",
            Self::Local => "Local",
            Self::None => "None",
        }
    }

    /// Name accepted on the command line and in `SQLRAY_PROVIDER`.
    pub fn key(&self) -> &'static str {
        match self {
            Self::OpenAi => "openai",
            Self::Anthropic => "anthropic",
            Self::Local => "local",
            Self::None => "none",
        }
    }

    pub fn all() -> &'static [Self] {
        &[Self::OpenAi, Self::Anthropic, Self::Local, Self::None]
    }

    /// Returns the default model for this provider.
    pub fn default_model(&self) -> &'static str {
        match self {
            Self::OpenAi => "gpt-3.5-turbo",
            Self::Anthropic => "claude-3-5-sonnet-latest",
            Self::Local => "llama3.2",
            Self::None => "",
        }
    }

    /// Environment variable consulted for the API key.
    pub fn api_key_env_var(&self) -> Option<&'static str> {
        match self {
            Self::OpenAi => Some("OPENAI_API_KEY"),
            Self::Anthropic => Some("ANTHROPIC_API_KEY"),
            Self::Local | Self::None => None,
        }
    }

    /// Whether requests to this provider need an API key at all.
    pub fn requires_api_key(&self) -> bool {
        matches!(self, Self::OpenAi | Self::Anthropic)
    }
}

impl std::fmt::Display for AiProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.display_name())
    }
}

impl FromStr for AiProvider {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        let name = s.trim().to_ascii_lowercase();
        match name.as_str() {
            "open_ai" => return Ok(Self::OpenAi),
            "ollama" => return Ok(Self::Local),
            _ => {}
        }
        Self::all()
            .iter()
            .copied()
            .find(|provider| provider.key() == name)
            .with_context(|| {
                let expected: Vec<_> = Self::all().iter().map(AiProvider::key).collect();
                format!(
                    "Unknown AI provider '{}'. Expected one of: {}",
                    name,
                    expected.join(", ")
                )
            })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SqlRaySettings {
    pub provider: AiProvider,
    pub model: String,
    /// Used only when neither the command line nor the environment supplies a key
    pub api_key: Option<String>,
    /// Overrides the provider's API endpoint
    pub base_url: Option<String>,
    pub timeout_secs: u64,
    pub temperature: Option<f32>,
}

impl Default for SqlRaySettings {
    fn default() -> Self {
        Self {
            provider: AiProvider::OpenAi,
            model: AiProvider::OpenAi.default_model().to_string(),
            api_key: None,
            base_url: None,
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            temperature: None,
        }
    }
}

impl SqlRaySettings {
    /// Loads settings from the user's config directory, falling back to
    /// defaults when no settings file exists yet.
    pub fn load() -> Result<Self> {
        let path = settings_file()?;
        Self::load_from(&path)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            tracing::debug!(path = %path.display(), "No settings file, using defaults");
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read settings from {:?}", path))?;
        serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse settings JSON in {:?}", path))
    }

    pub fn save(&self) -> Result<()> {
        let path = settings_file()?;
        self.save_to(&path)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Picks the API key: explicit flag, then the provider's environment
    /// variable, then the settings file.
    pub fn resolve_api_key(&self, explicit: Option<&str>) -> Option<String> {
        self.resolve_api_key_with(explicit, |name| std::env::var(name).ok())
    }

    pub fn resolve_api_key_with<F>(&self, explicit: Option<&str>, env: F) -> Option<String>
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |s: &str| {
            let s = s.trim();
            (!s.is_empty()).then(|| s.to_string())
        };

        explicit
            .and_then(non_empty)
            .or_else(|| {
                self.provider
                    .api_key_env_var()
                    .and_then(|name| env(name))
                    .as_deref()
                    .and_then(non_empty)
            })
            .or_else(|| self.api_key.as_deref().and_then(non_empty))
    }

    pub fn timeout(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.timeout_secs)
    }
}
