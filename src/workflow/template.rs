//! Workflow Templates
//!
//! A template fixes the ordered list of agent roles an execution runs.
//!
//! # Example YAML Format
//!
//! ```yaml
//! name: ans_submission
//! format: ans_submission
//! steps:
//!   - role: ClinicalAnalyst
//!     name: Análise Clínica
//!   - role: ANSSubmissionAgent
//!     name: Preparação ANS
//! ```

use serde::{Deserialize, Serialize};

use crate::agents::{
    ANS_SUBMISSION_AGENT, CLINICAL_ANALYST, PATIENT_COMMUNICATION_AGENT, SCHEDULING_AGENT,
};

use super::model::DocumentFormat;

/// One step of a template.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct TemplateStep {
    /// Agent role name
    pub role: String,
    /// Display name (defaults to the role)
    #[serde(default)]
    pub name: String,
}

impl TemplateStep {
    pub fn new(role: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            role: role.into().trim().to_string(),
            name: name.into().trim().to_string(),
        }
    }
}

/// Ordered sequence of agent roles.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct WorkflowTemplate {
    pub name: String,
    #[serde(default)]
    pub format: DocumentFormat,
    pub steps: Vec<TemplateStep>,
}

impl WorkflowTemplate {
    pub fn new(name: impl Into<String>, format: DocumentFormat) -> Self {
        Self {
            name: name.into(),
            format,
            steps: Vec::new(),
        }
    }

    /// Appends a step.
    pub fn with_step(mut self, role: impl Into<String>, name: impl Into<String>) -> Self {
        self.steps.push(TemplateStep::new(role, name));
        self
    }

    /// The four-stage surgical request workflow.
    pub fn surgical_request() -> Self {
        Self::new("surgical_request", DocumentFormat::MedicalReport)
            .with_step(CLINICAL_ANALYST, "Análise Clínica")
            .with_step(ANS_SUBMISSION_AGENT, "Preparação ANS")
            .with_step(SCHEDULING_AGENT, "Agendamento")
            .with_step(PATIENT_COMMUNICATION_AGENT, "Comunicação Paciente")
    }

    /// Role names in execution order.
    pub fn roles(&self) -> Vec<&str> {
        self.steps.iter().map(|s| s.role.as_str()).collect()
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }
}

impl Default for WorkflowTemplate {
    fn default() -> Self {
        Self::surgical_request()
    }
}
