//! Workflow Definition Module
//!
//! Provides data structures and utilities for defining, loading and
//! tracking multi-agent workflow executions.
//!
//! # Structure
//!
//! - [`model`]: Core data structures (WorkflowExecution, WorkflowStep)
//! - [`template`]: Ordered agent-role templates
//! - [`parser`]: YAML loading of templates and patient data
//! - [`validator`]: Template validation rules
//! - [`state`]: In-memory execution store

pub mod model;
pub mod parser;
pub mod state;
pub mod template;
pub mod validator;

pub use model::{
    progress_percent, DocumentFormat, ExecutionStatus, PatientData, StepStatus,
    SurgicalWorkflowPayload, WorkflowExecution, WorkflowStep,
};
pub use parser::{load_patient, load_template};
pub use state::WorkflowStore;
pub use template::{TemplateStep, WorkflowTemplate};
pub use validator::validate_template;
