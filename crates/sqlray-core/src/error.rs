//! Optimizer errors

use sqlray_ai::CompletionError;
use std::path::PathBuf;
use thiserror::Error;

pub type OptimizerResult<T> = Result<T, OptimizerError>;

/// Failure categories surfaced to front-ends.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    SchemaValidation,
    SchemaNotLoaded,
    ResponseParse,
    Upstream,
    Timeout,
}

/// Errors raised while loading a schema or optimizing a query
#[derive(Debug, Error)]
pub enum OptimizerError {
    /// A required top-level schema key is missing
    #[error("Database schema must contain {0}")]
    SchemaValidation(&'static str),

    #[error("Failed to read schema file {path:?}: {source}")]
    SchemaIo {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Schema file {path:?} is not valid JSON: {message}")]
    SchemaParse { path: PathBuf, message: String },

    #[error("No database schema loaded")]
    SchemaNotLoaded,

    /// The model answered, but not in the expected JSON shape
    #[error("Failed to parse model response: {0}")]
    ResponseParse(String),

    /// The completion backend itself failed (network, auth, rate limit)
    #[error("Completion request failed: {0}")]
    Upstream(CompletionError),

    #[error("Completion request timed out")]
    Timeout,
}

impl OptimizerError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::SchemaValidation(_) | Self::SchemaIo { .. } | Self::SchemaParse { .. } => {
                ErrorKind::SchemaValidation
            }
            Self::SchemaNotLoaded => ErrorKind::SchemaNotLoaded,
            Self::ResponseParse(_) => ErrorKind::ResponseParse,
            Self::Upstream(_) => ErrorKind::Upstream,
            Self::Timeout => ErrorKind::Timeout,
        }
    }
}

impl From<CompletionError> for OptimizerError {
    fn from(err: CompletionError) -> Self {
        match err {
            CompletionError::Timeout => Self::Timeout,
            other => Self::Upstream(other),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_completion_errors_map_to_kinds() {
        let err: OptimizerError = CompletionError::RateLimited("slow down".into()).into();
        assert_eq!(err.kind(), ErrorKind::Upstream);

        let err: OptimizerError = CompletionError::Timeout.into();
        assert_eq!(err.kind(), ErrorKind::Timeout);
    }

    #[test]
    fn test_schema_validation_message() {
        let err = OptimizerError::SchemaValidation("indexes");
        assert_eq!(err.to_string(), "Database schema must contain indexes");
        assert_eq!(err.kind(), ErrorKind::SchemaValidation);
    }
}
