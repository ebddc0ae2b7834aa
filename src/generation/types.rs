//! Generation Request/Response Types
//!
//! Language-neutral request contract for the text-generation service,
//! serialized in the shape of the Responses API.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Opaque identifier issued by the service for one call.
///
/// Passing it to the next call marks that call as a continuation. Nothing
/// is assumed about its structure beyond round-tripping it.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, Hash)]
#[serde(transparent)]
pub struct ContinuationToken(String);

impl ContinuationToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ContinuationToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Role tag of an input message.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    System,
    Developer,
    User,
    Assistant,
}

/// A single role-tagged input message.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct InputMessage {
    pub role: MessageRole,
    pub content: String,
}

impl InputMessage {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::User,
            content: content.into(),
        }
    }

    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::System,
            content: content.into(),
        }
    }
}

/// User input: a plain string or a list of role-tagged messages.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(untagged)]
pub enum GenerationInput {
    Text(String),
    Messages(Vec<InputMessage>),
}

/// Callable tool schema attached to a request.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct ToolSchema {
    #[serde(rename = "type", default = "function_kind")]
    pub kind: String,
    pub name: String,
    pub description: String,
    /// JSON Schema of the tool arguments
    pub parameters: Value,
    #[serde(default)]
    pub strict: bool,
}

fn function_kind() -> String {
    "function".to_string()
}

impl ToolSchema {
    /// Creates a strict function tool.
    pub fn function(name: impl Into<String>, description: impl Into<String>, parameters: Value) -> Self {
        Self {
            kind: function_kind(),
            name: name.into(),
            description: description.into(),
            parameters,
            strict: true,
        }
    }
}

/// Forced response format.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct ResponseFormat {
    #[serde(rename = "type")]
    pub kind: String,
}

impl ResponseFormat {
    pub fn json_object() -> Self {
        Self {
            kind: "json_object".to_string(),
        }
    }
}

/// One request to the text-generation service.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct GenerationRequest {
    pub model: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub instructions: Option<String>,

    pub input: GenerationInput,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tools: Vec<ToolSchema>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response_format: Option<ResponseFormat>,

    pub temperature: f32,

    #[serde(
        rename = "previous_response_id",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub continuation: Option<ContinuationToken>,
}

impl GenerationRequest {
    /// Creates a request with plain text input and no tools.
    pub fn new(model: impl Into<String>, input: GenerationInput, temperature: f32) -> Self {
        Self {
            model: model.into(),
            instructions: None,
            input,
            tools: Vec::new(),
            response_format: None,
            temperature,
            continuation: None,
        }
    }

    pub fn with_instructions(mut self, instructions: impl Into<String>) -> Self {
        self.instructions = Some(instructions.into());
        self
    }

    pub fn with_tools(mut self, tools: Vec<ToolSchema>) -> Self {
        self.tools = tools;
        self
    }

    pub fn with_json_output(mut self) -> Self {
        self.response_format = Some(ResponseFormat::json_object());
        self
    }

    pub fn with_continuation(mut self, token: Option<ContinuationToken>) -> Self {
        self.continuation = token;
        self
    }
}

/// Usage/billing metadata. Carried through but not consumed by the core.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
pub struct Usage {
    #[serde(default)]
    pub input_tokens: u64,
    #[serde(default)]
    pub output_tokens: u64,
    #[serde(default)]
    pub total_tokens: u64,
}

/// Result of one successful call.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct GenerationResponse {
    pub output_text: String,
    pub continuation: ContinuationToken,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub usage: Option<Usage>,
}

impl GenerationResponse {
    pub fn new(output_text: impl Into<String>, continuation: impl Into<String>) -> Self {
        Self {
            output_text: output_text.into(),
            continuation: ContinuationToken::new(continuation),
            usage: None,
        }
    }
}
