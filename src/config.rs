//! Runtime Settings
//!
//! Resolution order: built-in defaults, then an optional YAML file, then
//! `SURGIFLOW_*` environment variables. `OPENAI_API_KEY` overrides any
//! configured key. A `.env` file in the working directory is loaded
//! before the environment is read.
//!
//! Nested keys use a double underscore, e.g. `SURGIFLOW_MODELS__INTAKE`.
//!
//! # Example YAML Format
//!
//! ```yaml
//! base_url: https://api.openai.com/v1
//! timeout_secs: 90
//! models:
//!   agents: gpt-4.1
//!   post_operative: gpt-4o
//! ```

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use config::{Config as ConfigBuilder, Environment, File, FileFormat};
use log::{debug, info};
use serde::{Deserialize, Serialize};

use crate::agents::AgentRegistry;
use crate::analysis::{MedicalReportGeneration, PostOperativeAnalysis, SurgicalRequestExtraction};
use crate::error::ConfigError;
use crate::execution::{AnalysisKind, Analyzer};
use crate::generation::{GenerationClient, OpenAiClient, DEFAULT_BASE_URL, DEFAULT_TIMEOUT};

pub const ENV_API_KEY: &str = "OPENAI_API_KEY";
pub const ENV_PREFIX: &str = "SURGIFLOW";

fn default_base_url() -> String {
    DEFAULT_BASE_URL.to_string()
}

fn default_timeout_secs() -> u64 {
    DEFAULT_TIMEOUT.as_secs()
}

/// Per-use-case model overrides.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ModelOverrides {
    /// Model for agent roles that don't pin one
    #[serde(default)]
    pub agents: Option<String>,
    #[serde(default)]
    pub post_operative: Option<String>,
    #[serde(default)]
    pub intake: Option<String>,
    #[serde(default)]
    pub medical_report: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Settings {
    #[serde(default, skip_serializing)]
    pub api_key: Option<String>,

    #[serde(default = "default_base_url")]
    pub base_url: String,

    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    #[serde(default)]
    pub models: ModelOverrides,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: default_base_url(),
            timeout_secs: default_timeout_secs(),
            models: ModelOverrides::default(),
        }
    }
}

impl Settings {
    /// Loads settings from an optional file and the process environment.
    pub fn load(path: Option<&str>) -> Result<Self, ConfigError> {
        if let Ok(env_file) = dotenvy::dotenv() {
            debug!("Loaded environment from {}", env_file.display());
        }

        Self::load_from(path, std::env::vars().collect())
    }

    /// Layers an optional YAML file and the given environment over the
    /// defaults.
    pub fn load_from(path: Option<&str>, env: HashMap<String, String>) -> Result<Self, ConfigError> {
        let mut builder = ConfigBuilder::builder();

        if let Some(path) = path {
            info!("Loading settings from: {}", path);
            builder = builder.add_source(File::new(path, FileFormat::Yaml));
        }

        let variables: config::Map<String, String> = env
            .iter()
            .map(|(key, value)| (key.clone(), value.clone()))
            .collect();

        builder = builder.add_source(
            Environment::with_prefix(ENV_PREFIX)
                .prefix_separator("_")
                .separator("__")
                .ignore_empty(true)
                .try_parsing(true)
                .source(Some(variables)),
        );

        let mut settings: Settings = builder.build()?.try_deserialize()?;

        if let Some(key) = env.get(ENV_API_KEY).filter(|k| !k.trim().is_empty()) {
            settings.api_key = Some(key.clone());
        }

        settings.validate()?;
        Ok(settings)
    }

    /// Checks values that deserialize but cannot be used.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.base_url.trim().is_empty() {
            return Err(ConfigError::InvalidValue {
                key: "base_url".to_string(),
                value: self.base_url.clone(),
            });
        }

        if self.timeout_secs == 0 {
            return Err(ConfigError::InvalidValue {
                key: "timeout_secs".to_string(),
                value: self.timeout_secs.to_string(),
            });
        }

        Ok(())
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Builds the HTTP generation client.
    pub fn build_client(&self) -> Result<OpenAiClient, ConfigError> {
        let api_key = self
            .api_key
            .as_deref()
            .filter(|k| !k.trim().is_empty())
            .ok_or(ConfigError::MissingApiKey)?;

        OpenAiClient::with_base_url(api_key, &self.base_url, self.timeout())
            .map_err(|e| ConfigError::Client(e.to_string()))
    }

    /// Applies the agent model override to a registry.
    pub fn configure_registry(&self, registry: &mut AgentRegistry) {
        if let Some(model) = &self.models.agents {
            registry.set_default_model(model.clone());
        }
    }

    /// Builds an analyzer with the configured model overrides.
    pub fn analyzer(&self, client: Arc<dyn GenerationClient>) -> Analyzer {
        let overrides = [
            (PostOperativeAnalysis::NAME, &self.models.post_operative),
            (SurgicalRequestExtraction::NAME, &self.models.intake),
            (MedicalReportGeneration::NAME, &self.models.medical_report),
        ];

        overrides
            .into_iter()
            .fold(Analyzer::new(client), |analyzer, (kind, model)| match model {
                Some(model) => analyzer.with_model(kind, model.clone()),
                None => analyzer,
            })
    }
}
