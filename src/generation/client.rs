//! Generation Client
//!
//! Performs exactly one request/response cycle against the external
//! text-generation service per invocation. The client never retries;
//! transport and API failures surface to the caller unchanged.

use std::time::Duration;

use async_trait::async_trait;
use log::{debug, warn};
use reqwest::Client;
use serde::Deserialize;
use serde_json::Value;

use crate::agents::AgentRoleDefinition;
use crate::error::GenerationError;

use super::types::{
    ContinuationToken, GenerationInput, GenerationRequest, GenerationResponse, InputMessage, Usage,
};

/// Default endpoint of the text-generation service.
pub const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";

/// Default per-request timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(120);

/// A service that turns one request into one response.
#[async_trait]
pub trait GenerationClient: Send + Sync {
    async fn generate(&self, request: GenerationRequest) -> Result<GenerationResponse, GenerationError>;
}

/// Builds the request for one agent step.
///
/// The payload is serialized as the sole user message; the role's
/// instructions, tools, model and temperature are attached and a JSON
/// object response is requested.
pub fn build_agent_request(
    role: &AgentRoleDefinition,
    payload: &Value,
    prior: Option<&ContinuationToken>,
) -> GenerationRequest {
    GenerationRequest::new(
        role.model.clone(),
        GenerationInput::Messages(vec![InputMessage::user(payload.to_string())]),
        role.temperature,
    )
    .with_instructions(role.instructions.clone())
    .with_tools(role.tools.clone())
    .with_json_output()
    .with_continuation(prior.cloned())
}

/// Invokes the service for one agent role.
pub async fn generate_for_role(
    client: &dyn GenerationClient,
    role: &AgentRoleDefinition,
    payload: &Value,
    prior: Option<&ContinuationToken>,
) -> Result<GenerationResponse, GenerationError> {
    let request = build_agent_request(role, payload, prior);
    debug!(
        "Generating for role '{}' (model: {}, continuation: {})",
        role.role,
        request.model,
        prior.map(|t| t.as_str()).unwrap_or("none")
    );
    client.generate(request).await
}

/// HTTP client for the Responses API.
pub struct OpenAiClient {
    client: Client,
    base_url: String,
    api_key: String,
}

impl OpenAiClient {
    /// Creates a client against the default endpoint.
    pub fn new(api_key: impl Into<String>) -> Result<Self, GenerationError> {
        Self::with_base_url(api_key, DEFAULT_BASE_URL, DEFAULT_TIMEOUT)
    }

    /// Creates a client against a custom endpoint (proxies, test servers).
    pub fn with_base_url(
        api_key: impl Into<String>,
        base_url: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, GenerationError> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

#[derive(Debug, Deserialize)]
struct ResponsesBody {
    id: String,
    #[serde(default)]
    output_text: Option<String>,
    #[serde(default)]
    output: Vec<OutputItem>,
    #[serde(default)]
    usage: Option<Usage>,
}

#[derive(Debug, Deserialize)]
struct OutputItem {
    #[serde(default)]
    content: Vec<OutputContent>,
}

#[derive(Debug, Deserialize)]
struct OutputContent {
    #[serde(rename = "type", default)]
    kind: String,
    #[serde(default)]
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    error: ErrorDetail,
}

#[derive(Debug, Deserialize)]
struct ErrorDetail {
    #[serde(default)]
    message: Option<String>,
}

impl ResponsesBody {
    /// Top-level `output_text` if present, else the concatenated text parts.
    fn text(&self) -> String {
        if let Some(text) = &self.output_text {
            return text.clone();
        }

        self.output
            .iter()
            .flat_map(|item| item.content.iter())
            .filter(|part| part.kind == "output_text")
            .filter_map(|part| part.text.as_deref())
            .collect::<Vec<_>>()
            .join("")
    }
}

/// Extracts the service-reported message from an error body.
fn api_error_message(status: reqwest::StatusCode, body: &str) -> String {
    serde_json::from_str::<ErrorBody>(body)
        .ok()
        .and_then(|b| b.error.message)
        .filter(|m| !m.trim().is_empty())
        .unwrap_or_else(|| {
            status
                .canonical_reason()
                .unwrap_or("Unknown error")
                .to_string()
        })
}

#[async_trait]
impl GenerationClient for OpenAiClient {
    async fn generate(&self, request: GenerationRequest) -> Result<GenerationResponse, GenerationError> {
        let url = format!("{}/responses", self.base_url);

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let message = api_error_message(status, &body);
            warn!("Generation service returned {}: {}", status.as_u16(), message);
            return Err(GenerationError::api(status.as_u16(), message));
        }

        let body: ResponsesBody = response.json().await?;
        debug!("Generation response {} received", body.id);

        Ok(GenerationResponse {
            output_text: body.text(),
            continuation: ContinuationToken::new(body.id.clone()),
            usage: body.usage.clone(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agents::{AgentRegistry, CLINICAL_ANALYST};
    use serde_json::json;

    #[test]
    fn test_build_agent_request() {
        let registry = AgentRegistry::builtin();
        let role = registry.resolve(CLINICAL_ANALYST);
        let payload = json!({"scratch": {}});

        let request = build_agent_request(&role, &payload, None);

        assert_eq!(request.model, role.model);
        assert_eq!(request.instructions.as_deref(), Some(role.instructions.as_str()));
        assert_eq!(request.tools.len(), 2);
        assert!(request.continuation.is_none());
        assert_eq!(
            request.input,
            GenerationInput::Messages(vec![InputMessage::user(r#"{"scratch":{}}"#)])
        );
        assert!(request.response_format.is_some());
    }

    #[test]
    fn test_build_agent_request_with_continuation() {
        let role = AgentRegistry::builtin().resolve("Unknown");
        let token = ContinuationToken::new("resp_9");
        let request = build_agent_request(&role, &json!({}), Some(&token));
        assert_eq!(request.continuation, Some(token));
    }

    #[test]
    fn test_output_text_prefers_top_level() {
        let body: ResponsesBody = serde_json::from_value(json!({
            "id": "resp_1",
            "output_text": "{\"a\":1}",
            "output": [{"type": "message", "content": [{"type": "output_text", "text": "ignored"}]}]
        }))
        .unwrap();
        assert_eq!(body.text(), "{\"a\":1}");
    }

    #[test]
    fn test_output_text_concatenates_parts() {
        let body: ResponsesBody = serde_json::from_value(json!({
            "id": "resp_2",
            "output": [
                {"type": "function_call", "name": "calculate_timeline"},
                {"type": "message", "content": [
                    {"type": "output_text", "text": "{\"a\":"},
                    {"type": "refusal", "refusal": "no"},
                    {"type": "output_text", "text": "2}"}
                ]}
            ]
        }))
        .unwrap();
        assert_eq!(body.text(), "{\"a\":2}");
    }

    #[test]
    fn test_api_error_message_extraction() {
        let status = reqwest::StatusCode::TOO_MANY_REQUESTS;
        assert_eq!(
            api_error_message(status, r#"{"error": {"message": "rate limited"}}"#),
            "rate limited"
        );
        assert_eq!(api_error_message(status, "<html>"), "Too Many Requests");
        assert_eq!(api_error_message(status, r#"{"error": {}}"#), "Too Many Requests");
    }

    #[test]
    fn test_base_url_trailing_slash_trimmed() {
        let client =
            OpenAiClient::with_base_url("key", "http://localhost:9999/v1/", DEFAULT_TIMEOUT).unwrap();
        assert_eq!(client.base_url(), "http://localhost:9999/v1");
    }
}
