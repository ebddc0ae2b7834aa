//! SurgiFlow - Multi-Agent Surgical Workflow Engine
//!
//! Orchestrates a fixed sequence of AI agent roles that turn patient and
//! procedure data into surgical documentation. Each role makes one call
//! to a text-generation service; the JSON payload produced by one step is
//! the input of the next, and calls are linked through continuation
//! tokens.
//!
//! # Architecture
//!
//! The library is organized into these modules:
//!
//! - [`workflow`]: Execution records, templates, validation and the in-memory store
//! - [`agents`]: Role registry (instructions, tools, model, temperature)
//! - [`generation`]: Generation service contract and HTTP client
//! - [`execution`]: Step sequencer and single-shot analyzer
//! - [`analysis`]: Post-operative, intake and medical report analyses
//! - [`monitoring`]: Terminal record log and execution timeline
//!
//! # Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use surgiflow::{AgentRegistry, PatientData, Sequencer, Settings, WorkflowTemplate};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let settings = Settings::load(None)?;
//!     let client = Arc::new(settings.build_client()?);
//!
//!     let sequencer = Sequencer::new(client, Arc::new(AgentRegistry::builtin()));
//!     let patient = PatientData::new("Maria Santos", "Artrodese L4-L5")
//!         .with_clinical_notes("Dor lombar crônica, falha do tratamento conservador");
//!
//!     let outcome = sequencer
//!         .execute(&WorkflowTemplate::surgical_request(), &patient)
//!         .await?;
//!     println!("{} ({}%)", outcome.status(), outcome.execution().progress);
//!     Ok(())
//! }
//! ```

pub mod agents;
pub mod analysis;
pub mod config;
pub mod error;
pub mod execution;
pub mod generation;
pub mod monitoring;
pub mod workflow;

// Re-export commonly used types
pub use agents::AgentRegistry;
pub use crate::config::Settings;
pub use error::{AnalyzerError, ConfigError, GenerationError, WorkflowError};
pub use execution::{Analyzer, ExecutionOutcome, Sequencer};
pub use generation::{ContinuationToken, GenerationClient, OpenAiClient};
pub use workflow::{
    ExecutionStatus, PatientData, StepStatus, WorkflowExecution, WorkflowStore, WorkflowTemplate,
};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Application name
pub const APP_NAME: &str = "SurgiFlow";
