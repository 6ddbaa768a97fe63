//! Tolerant parsing of model responses
//!
//! Models often wrap JSON in a fenced code block, and older prompt templates
//! framed the answer between `---` separator lines. Both wrappers are peeled
//! off before the text is deserialized.

use serde::de::DeserializeOwned;

use crate::error::{OptimizerError, OptimizerResult};

const FENCE: &str = "```";
const DELIMITER: &str = "---";
const PREVIEW_CHARS: usize = 200;

/// Returns the body of a fenced code block when both an opening and a closing
/// fence are present, otherwise the trimmed input.
///
/// The info string after the opening fence (`json`, `sql`, ...) is dropped,
/// as is any prose before the opening fence or after the closing one.
pub fn strip_code_fence(text: &str) -> &str {
    let trimmed = text.trim();
    let Some(open) = trimmed.find(FENCE) else {
        return trimmed;
    };

    let after_open = &trimmed[open + FENCE.len()..];
    let body = after_open.trim_start_matches(|c: char| c.is_ascii_alphanumeric() || c == '_' || c == '-');

    match body.rfind(FENCE) {
        Some(close) => body[..close].trim(),
        None => trimmed,
    }
}

/// The segment after the first `---` delimiter, up to the next one.
pub fn delimited_segment(text: &str) -> Option<&str> {
    let mut parts = text.split(DELIMITER);
    parts.next()?;
    parts.next().map(str::trim)
}

/// Parses a JSON payload out of a model response.
///
/// The whole response is tried as JSON first, so fences inside string values
/// are left alone. Then the fenced block (if any) is parsed. When that fails
/// and `allow_delimiter` is set, the segment after the first `---` is tried.
pub fn parse_json_response<T: DeserializeOwned>(
    text: &str,
    allow_delimiter: bool,
) -> OptimizerResult<T> {
    let trimmed = text.trim();
    if let Ok(value) = serde_json::from_str::<T>(trimmed) {
        return Ok(value);
    }

    let body = strip_code_fence(trimmed);

    let first_error = match serde_json::from_str::<T>(body) {
        Ok(value) => return Ok(value),
        Err(err) => err,
    };

    if allow_delimiter {
        if let Some(segment) = delimited_segment(body) {
            if let Ok(value) = serde_json::from_str::<T>(strip_code_fence(segment)) {
                return Ok(value);
            }
        }
    }

    tracing::warn!(
        error = %first_error,
        response = %preview(text),
        "Model response is not the expected JSON"
    );
    Err(OptimizerError::ResponseParse(first_error.to_string()))
}

/// A short, char-boundary-safe excerpt for log lines.
pub(crate) fn preview(text: &str) -> String {
    let mut chars = text.chars();
    let head: String = chars.by_ref().take(PREVIEW_CHARS).collect();
    if chars.next().is_some() {
        format!("{}...", head)
    } else {
        head
    }
}
