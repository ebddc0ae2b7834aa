//! Single-Shot Analyzer
//!
//! One generation call, no continuation token, and a result that must
//! deserialize into the analysis kind's output type. Unlike a workflow
//! step, output that does not match is a failure: the caller gets an
//! error and no partial result.

use std::collections::HashMap;
use std::sync::Arc;

use log::{debug, error, info};
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::error::{AnalyzerError, GenerationError};
use crate::generation::{GenerationClient, GenerationInput, GenerationRequest, InputMessage};

/// A use-case specific single-shot analysis.
///
/// Implementors carry their subject context and describe how to prompt
/// the service and what shape the answer must have.
pub trait AnalysisKind {
    /// Structured result of the analysis.
    type Output: DeserializeOwned;

    /// Stable name, used for logging and model overrides.
    const NAME: &'static str;

    fn default_model(&self) -> &'static str;

    fn temperature(&self) -> f32;

    /// System instructions, including the expected JSON shape.
    fn instructions(&self) -> String;

    /// User message built from the source text and the subject context.
    fn user_input(&self, source: &str) -> String;

    /// Rejects output that deserialized but carries nothing usable.
    fn check_output(&self, _output: &Self::Output) -> Result<(), String> {
        Ok(())
    }
}

/// Runs single-shot analyses against a generation service.
#[derive(Clone)]
pub struct Analyzer {
    client: Arc<dyn GenerationClient>,
    model_overrides: HashMap<String, String>,
}

impl Analyzer {
    pub fn new(client: Arc<dyn GenerationClient>) -> Self {
        Self {
            client,
            model_overrides: HashMap::new(),
        }
    }

    /// Overrides the model used for one analysis kind.
    pub fn with_model(mut self, kind: &str, model: impl Into<String>) -> Self {
        self.model_overrides.insert(kind.to_string(), model.into());
        self
    }

    /// Builds the request for an analysis.
    pub fn build_request<K: AnalysisKind>(&self, kind: &K, source: &str) -> GenerationRequest {
        let model = self
            .model_overrides
            .get(K::NAME)
            .cloned()
            .unwrap_or_else(|| kind.default_model().to_string());

        GenerationRequest::new(
            model,
            GenerationInput::Messages(vec![InputMessage::user(kind.user_input(source))]),
            kind.temperature(),
        )
        .with_instructions(kind.instructions())
        .with_json_output()
    }

    /// Runs one analysis.
    ///
    /// # Errors
    ///
    /// Transport and API failures pass through; output that is not JSON
    /// or does not match `K::Output` is a parse error.
    pub async fn analyze<K: AnalysisKind>(&self, kind: &K, source: &str) -> Result<K::Output, AnalyzerError> {
        let request = self.build_request(kind, source);
        info!("Running {} analysis (model: {})", K::NAME, request.model);

        let response = self.client.generate(request).await.map_err(|e| {
            error!("{} analysis failed: {}", K::NAME, e);
            AnalyzerError::from(e)
        })?;

        debug!(
            "{} analysis returned {} bytes (response {})",
            K::NAME,
            response.output_text.len(),
            response.continuation
        );

        let output = parse_output::<K::Output>(&response.output_text)
            .and_then(|output| {
                kind.check_output(&output)
                    .map(|()| output)
                    .map_err(GenerationError::Parse)
            })
            .map_err(|e| {
                error!("{} analysis output rejected: {}", K::NAME, e);
                AnalyzerError::from(e)
            })?;

        info!("{} analysis completed", K::NAME);
        Ok(output)
    }
}

/// Deserializes output text into the mandated shape. The text must be a
/// single JSON object.
pub fn parse_output<T: DeserializeOwned>(text: &str) -> Result<T, GenerationError> {
    let text = text.trim();
    if text.is_empty() {
        return Err(GenerationError::Parse("empty output".to_string()));
    }

    let value: Value = serde_json::from_str(text).map_err(|e| GenerationError::Parse(e.to_string()))?;
    if !value.is_object() {
        return Err(GenerationError::Parse("output is not a JSON object".to_string()));
    }
    serde_json::from_value(value).map_err(|e| GenerationError::Parse(e.to_string()))
}
