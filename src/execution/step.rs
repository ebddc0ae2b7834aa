//! Individual Step Execution
//!
//! Runs one agent step: a single generation call for the step's role with
//! the current payload and continuation token, followed by best-effort
//! parsing of the output text into the next payload.

use std::time::Instant;

use log::{debug, warn};
use serde_json::Value;

use crate::agents::AgentRoleDefinition;
use crate::error::GenerationError;
use crate::generation::{generate_for_role, ContinuationToken, GenerationClient};

/// Result of parsing an agent's output text.
///
/// Only a JSON object replaces the working payload; anything else keeps
/// the previous payload and the step still completes.
#[derive(Debug, Clone, PartialEq)]
pub enum ParseOutcome {
    Parsed(Value),
    KeptPrevious { reason: String },
}

impl ParseOutcome {
    /// Parses output text into a payload candidate.
    pub fn parse(text: &str) -> Self {
        match serde_json::from_str::<Value>(text.trim()) {
            Ok(value @ Value::Object(_)) => Self::Parsed(value),
            Ok(other) => Self::KeptPrevious {
                reason: format!("output is a JSON {}, not an object", json_kind(&other)),
            },
            Err(e) => Self::KeptPrevious {
                reason: e.to_string(),
            },
        }
    }

    pub fn is_parsed(&self) -> bool {
        matches!(self, Self::Parsed(_))
    }

    /// Replaces the payload when parsed. Returns true if it did.
    pub fn apply_to(&self, payload: &mut Value) -> bool {
        match self {
            Self::Parsed(value) => {
                *payload = value.clone();
                true
            }
            Self::KeptPrevious { .. } => false,
        }
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Successful generation for one step.
#[derive(Debug, Clone)]
pub struct StepOutput {
    pub raw_text: String,
    pub parse: ParseOutcome,
    pub continuation: ContinuationToken,
}

impl StepOutput {
    /// Value recorded as the step's result: the parsed object, or the raw
    /// text when it did not parse.
    pub fn result_value(&self) -> Value {
        match &self.parse {
            ParseOutcome::Parsed(value) => value.clone(),
            ParseOutcome::KeptPrevious { .. } => Value::String(self.raw_text.clone()),
        }
    }
}

/// One attempted step, successful or not.
#[derive(Debug)]
pub struct StepAttempt {
    pub duration_ms: u64,
    pub result: Result<StepOutput, GenerationError>,
}

/// Executes a single agent step.
///
/// # Arguments
///
/// * `client` - Generation service
/// * `role` - Resolved role definition
/// * `payload` - Current working payload
/// * `prior` - Continuation token of the previous step, if any
pub async fn execute_step(
    client: &dyn GenerationClient,
    role: &AgentRoleDefinition,
    payload: &Value,
    prior: Option<&ContinuationToken>,
) -> StepAttempt {
    let started = Instant::now();
    let result = generate_for_role(client, role, payload, prior).await;
    let duration_ms = started.elapsed().as_millis() as u64;

    let result = result.map(|response| {
        let parse = ParseOutcome::parse(&response.output_text);
        match &parse {
            ParseOutcome::Parsed(_) => debug!("Role '{}' returned a new payload", role.role),
            ParseOutcome::KeptPrevious { reason } => warn!(
                "Role '{}' output did not parse ({}); keeping previous payload",
                role.role, reason
            ),
        }
        StepOutput {
            raw_text: response.output_text,
            parse,
            continuation: response.continuation,
        }
    });

    StepAttempt {
        duration_ms,
        result,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agents::AgentRegistry;
    use crate::generation::{GenerationRequest, GenerationResponse};
    use async_trait::async_trait;
    use serde_json::json;

    struct FixedClient(Result<&'static str, GenerationError>);

    #[async_trait]
    impl GenerationClient for FixedClient {
        async fn generate(&self, _request: GenerationRequest) -> Result<GenerationResponse, GenerationError> {
            self.0
                .clone()
                .map(|text| GenerationResponse::new(text, "resp_1"))
        }
    }

    #[test]
    fn test_parse_object() {
        let outcome = ParseOutcome::parse(r#" {"scratch": {"risk": "baixo"}} "#);
        assert_eq!(outcome, ParseOutcome::Parsed(json!({"scratch": {"risk": "baixo"}})));
    }

    #[test]
    fn test_parse_non_json_keeps_previous() {
        let outcome = ParseOutcome::parse("Análise concluída sem JSON");
        assert!(!outcome.is_parsed());

        let mut payload = json!({"prompt": "x"});
        assert!(!outcome.apply_to(&mut payload));
        assert_eq!(payload, json!({"prompt": "x"}));
    }

    #[test]
    fn test_parse_non_object_keeps_previous() {
        for text in ["[1, 2]", "42", "\"texto\"", "null"] {
            match ParseOutcome::parse(text) {
                ParseOutcome::KeptPrevious { reason } => assert!(reason.contains("not an object")),
                other => panic!("unexpected outcome for {}: {:?}", text, other),
            }
        }
    }

    #[test]
    fn test_apply_replaces_payload() {
        let mut payload = json!({"prompt": "x", "scratch": {}});
        let outcome = ParseOutcome::parse(r#"{"result": 1}"#);
        assert!(outcome.apply_to(&mut payload));
        assert_eq!(payload, json!({"result": 1}));
    }

    #[tokio::test]
    async fn test_execute_step_success() {
        let client = FixedClient(Ok(r#"{"ok": true}"#));
        let role = AgentRegistry::builtin().resolve("ClinicalAnalyst");

        let attempt = execute_step(&client, &role, &json!({}), None).await;
        let output = attempt.result.unwrap();
        assert!(output.parse.is_parsed());
        assert_eq!(output.continuation.as_str(), "resp_1");
        assert_eq!(output.result_value(), json!({"ok": true}));
    }

    #[tokio::test]
    async fn test_execute_step_keeps_raw_text() {
        let client = FixedClient(Ok("sem estrutura"));
        let role = AgentRegistry::builtin().resolve("SchedulingAgent");

        let output = execute_step(&client, &role, &json!({}), None).await.result.unwrap();
        assert_eq!(output.result_value(), json!("sem estrutura"));
    }

    #[tokio::test]
    async fn test_execute_step_failure() {
        let client = FixedClient(Err(GenerationError::api(429, "rate limited")));
        let role = AgentRegistry::builtin().resolve("ANSSubmissionAgent");

        let attempt = execute_step(&client, &role, &json!({}), None).await;
        assert_eq!(attempt.result.unwrap_err().to_string(), "rate limited");
    }
}
