//! Completion errors

use thiserror::Error;

/// Result type for AI completion operations.
pub type CompletionResult<T> = Result<T, CompletionError>;

/// Error type for AI completion operations.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CompletionError {
    /// Network-related error
    #[error("Network error: {0}")]
    Network(String),

    /// Authentication error (invalid API key, etc.)
    #[error("Authentication error: {0}")]
    Authentication(String),

    #[error("Rate limited: {0}")]
    RateLimited(String),

    /// The provider returned an invalid response
    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Request timed out")]
    Timeout,

    /// Provider not configured or unavailable
    #[error("Provider unavailable: {0}")]
    ProviderUnavailable(String),

    #[error("Error: {0}")]
    Other(String),
}

impl CompletionError {
    /// Maps a transport error from the HTTP client.
    pub(crate) fn from_transport(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::Timeout
        } else {
            Self::Network(err.to_string())
        }
    }

    /// Maps a non-success HTTP status to an error.
    pub(crate) fn from_status(provider: &str, status: u16, body: &str) -> Self {
        match status {
            401 | 403 => Self::Authentication(format!("Invalid {} API key", provider)),
            429 => Self::RateLimited("Rate limit exceeded".to_string()),
            _ => Self::InvalidResponse(format!("Status {}: {}", status, body)),
        }
    }
}
