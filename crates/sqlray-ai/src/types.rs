//! Request and response models shared by every chat provider.

use serde::{Deserialize, Serialize};

/// Author of a chat message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::System => "system",
            Self::User => "user",
            Self::Assistant => "assistant",
        }
    }
}

/// A single chat turn.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::new(Role::User, content)
    }

    pub fn system(content: impl Into<String>) -> Self {
        Self::new(Role::System, content)
    }
}

/// Output shape requested from the model.
#[derive(Debug, Clone, PartialEq)]
pub enum ResponseFormat {
    /// Free-form text
    Text,
    /// Any syntactically valid JSON object
    JsonObject,
    /// JSON constrained to the given JSON Schema
    JsonSchema {
        name: String,
        schema: serde_json::Value,
        strict: bool,
    },
}

impl ResponseFormat {
    pub fn json_schema(name: impl Into<String>, schema: serde_json::Value) -> Self {
        Self::JsonSchema {
            name: name.into(),
            schema,
            strict: true,
        }
    }
}

/// Request model for a chat completion.
///
/// An empty `model` means "use the provider's configured model".
#[derive(Debug, Clone, PartialEq)]
pub struct ChatRequest {
    pub model: String,
    pub messages: Vec<ChatMessage>,
    pub response_format: Option<ResponseFormat>,
    pub temperature: Option<f32>,
    pub max_tokens: Option<u32>,
}

impl ChatRequest {
    /// Creates a request with no messages.
    pub fn new(model: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            messages: Vec::new(),
            response_format: None,
            temperature: None,
            max_tokens: None,
        }
    }

    /// Creates a request holding a single user turn.
    pub fn single_turn(model: impl Into<String>, prompt: impl Into<String>) -> Self {
        Self::new(model).with_message(ChatMessage::user(prompt))
    }

    pub fn with_message(mut self, message: ChatMessage) -> Self {
        self.messages.push(message);
        self
    }

    pub fn with_response_format(mut self, format: ResponseFormat) -> Self {
        self.response_format = Some(format);
        self
    }

    /// Total characters across all messages.
    pub fn prompt_length(&self) -> usize {
        self.messages.iter().map(|m| m.content.len()).sum()
    }

    /// The model to send, falling back to `default_model` when unset.
    pub(crate) fn resolved_model<'a>(&'a self, default_model: &'a str) -> &'a str {
        if self.model.trim().is_empty() {
            default_model
        } else {
            &self.model
        }
    }
}

/// Metadata about a completion.
#[derive(Debug, Clone, PartialEq)]
pub struct CompletionMetadata {
    /// The provider that generated this completion
    pub provider: String,
    /// The model that actually served the request
    pub model: String,
    /// Tokens billed for the request, when the provider reports them
    pub tokens_used: Option<u32>,
}

impl CompletionMetadata {
    pub fn new(provider: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            provider: provider.into(),
            model: model.into(),
            tokens_used: None,
        }
    }

    pub fn with_tokens(mut self, tokens: Option<u32>) -> Self {
        self.tokens_used = tokens;
        self
    }
}

/// Response model for a chat completion.
#[derive(Debug, Clone, PartialEq)]
pub struct ChatResponse {
    /// Text of the first choice
    pub content: String,
    pub metadata: CompletionMetadata,
}

impl ChatResponse {
    pub fn new(content: impl Into<String>, metadata: CompletionMetadata) -> Self {
        Self {
            content: content.into(),
            metadata,
        }
    }
}

/// Metadata about an AI provider.
#[derive(Debug, Clone, PartialEq)]
pub struct ProviderMetadata {
    /// The provider's display name (e.g., "OpenAI", "Anthropic")
    pub name: String,
    /// The model being used (e.g., "gpt-4o", "claude-3-5-sonnet-latest")
    pub model: String,
    /// Optional: provider-specific information such as the endpoint
    pub info: Option<String>,
}

impl ProviderMetadata {
    pub fn new(name: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            model: model.into(),
            info: None,
        }
    }

    pub fn with_info(mut self, info: impl Into<String>) -> Self {
        self.info = Some(info.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_turn_request() {
        let request = ChatRequest::single_turn("gpt-4o", "SELECT 1");

        assert_eq!(request.messages.len(), 1);
        assert_eq!(request.messages[0].role, Role::User);
        assert_eq!(request.prompt_length(), 8);
        assert!(request.response_format.is_none());
    }

    #[test]
    fn test_resolved_model_falls_back() {
        let request = ChatRequest::single_turn("", "hi");
        assert_eq!(request.resolved_model("gpt-4o"), "gpt-4o");

        let request = ChatRequest::single_turn("gpt-4-turbo", "hi");
        assert_eq!(request.resolved_model("gpt-4o"), "gpt-4-turbo");
    }

    #[test]
    fn test_role_serialization() {
        let json = serde_json::to_string(&ChatMessage::system("be terse")).unwrap();
        assert_eq!(json, r#"{"role":"system","content":"be terse"}"#);
    }

    #[test]
    fn test_json_schema_format() {
        let format = ResponseFormat::json_schema("result", serde_json::json!({"type": "object"}));
        assert_eq!(
            format,
            ResponseFormat::JsonSchema {
                name: "result".to_string(),
                schema: serde_json::json!({"type": "object"}),
                strict: true,
            }
        );
    }
}
