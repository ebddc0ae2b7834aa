//! Error Types
//!
//! Failure taxonomy shared by the generation client, the workflow
//! sequencer and the single-shot analyzer.

use thiserror::Error;

/// Failures of a single call to the text-generation service.
///
/// The client never retries. Transport and API failures terminate a
/// multi-step execution; parse failures only do so inside the analyzer.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum GenerationError {
    /// The service could not be reached or the response could not be read.
    #[error("transport error: {0}")]
    Transport(String),

    /// The service answered with a non-success status.
    ///
    /// Displays the service-reported message verbatim.
    #[error("{message}")]
    Api { status: u16, message: String },

    /// Output text was expected to be structured data but was not.
    #[error("failed to parse generated output: {0}")]
    Parse(String),
}

impl GenerationError {
    /// Builds an API error from a status code and message.
    pub fn api(status: u16, message: impl Into<String>) -> Self {
        Self::Api {
            status,
            message: message.into(),
        }
    }

    /// Short machine-readable kind, used in logs and terminal records.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Transport(_) => "transport",
            Self::Api { .. } => "api",
            Self::Parse(_) => "parse",
        }
    }
}

impl From<reqwest::Error> for GenerationError {
    fn from(err: reqwest::Error) -> Self {
        Self::Transport(err.to_string())
    }
}

/// Errors raised while managing or driving workflow executions.
#[derive(Debug, Error)]
pub enum WorkflowError {
    #[error("workflow execution '{0}' not found")]
    NotFound(String),

    #[error("execution '{id}' is {status}; cannot {action}")]
    InvalidTransition {
        id: String,
        status: String,
        action: &'static str,
    },

    #[error("invalid workflow template:\n{0}")]
    InvalidTemplate(String),

    #[error("failed to read '{path}': {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse '{path}': {source}")]
    Yaml {
        path: String,
        #[source]
        source: serde_yaml::Error,
    },
}

/// Errors raised by the single-shot analyzer.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum AnalyzerError {
    #[error(transparent)]
    Generation(#[from] GenerationError),
}

impl AnalyzerError {
    /// Returns true if the generated text did not have the mandated shape.
    pub fn is_parse_error(&self) -> bool {
        matches!(self, Self::Generation(GenerationError::Parse(_)))
    }
}

/// Errors raised while loading runtime settings.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to load settings: {0}")]
    Load(#[from] config::ConfigError),

    #[error("invalid value for {key}: {value}")]
    InvalidValue { key: String, value: String },

    #[error("no API key configured; set OPENAI_API_KEY or api_key in the config file")]
    MissingApiKey,

    #[error("failed to build HTTP client: {0}")]
    Client(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_api_error_displays_message_verbatim() {
        let err = GenerationError::api(429, "rate limited");
        assert_eq!(err.to_string(), "rate limited");
        assert_eq!(err.kind(), "api");
    }

    #[test]
    fn test_transport_error_display() {
        let err = GenerationError::Transport("connection refused".to_string());
        assert!(err.to_string().contains("connection refused"));
        assert_eq!(err.kind(), "transport");
    }

    #[test]
    fn test_analyzer_error_parse_detection() {
        let err: AnalyzerError = GenerationError::Parse("not json".to_string()).into();
        assert!(err.is_parse_error());

        let err: AnalyzerError = GenerationError::api(500, "boom").into();
        assert!(!err.is_parse_error());
        assert_eq!(err.to_string(), "boom");
    }

    #[test]
    fn test_invalid_transition_display() {
        let err = WorkflowError::InvalidTransition {
            id: "WF-1".to_string(),
            status: "completed".to_string(),
            action: "resume",
        };
        assert_eq!(err.to_string(), "execution 'WF-1' is completed; cannot resume");
    }
}
