//! Workflow Data Model
//!
//! Core data structures for multi-agent workflow executions: the
//! execution record, its ordered steps, and the payload threaded through
//! them.
//!
//! # Example Payload
//!
//! ```json
//! {
//!   "prompt": "Processar solicitação cirúrgica para Maria Santos",
//!   "patientData": {
//!     "name": "Maria Santos",
//!     "procedure": "Artrodese L4-L5",
//!     "clinicalNotes": "Dor lombar crônica...",
//!     "demographics": { "age": 65 }
//!   },
//!   "template": { "language": "pt-BR", "format": "medical_report" },
//!   "scratch": {}
//! }
//! ```

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

use crate::generation::ContinuationToken;

use super::template::WorkflowTemplate;

/// Language every generated document is written in.
pub const DOCUMENT_LANGUAGE: &str = "pt-BR";

/// Status of a workflow execution.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ExecutionStatus {
    Draft,
    Running,
    Paused,
    Completed,
    Error,
}

impl ExecutionStatus {
    /// Returns true for statuses with no further automatic transition.
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Error)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Draft => "draft",
            Self::Running => "running",
            Self::Paused => "paused",
            Self::Completed => "completed",
            Self::Error => "error",
        }
    }
}

impl fmt::Display for ExecutionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Status of a single workflow step.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum StepStatus {
    /// Waiting for its predecessor
    Pending,
    /// Generation call in flight
    Running,
    /// Generation call succeeded
    Completed,
    /// Generation call failed
    Error,
    /// Next in line of a paused execution
    Paused,
}

impl StepStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Error)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Running => "running",
            Self::Completed => "completed",
            Self::Error => "error",
            Self::Paused => "paused",
        }
    }
}

impl fmt::Display for StepStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Kind of document a workflow produces.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum DocumentFormat {
    #[default]
    MedicalReport,
    AnsSubmission,
    PatientCommunication,
}

/// Subject of a workflow: the patient and the indicated procedure.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PatientData {
    pub name: String,
    pub procedure: String,
    #[serde(default)]
    pub clinical_notes: String,
    #[serde(default)]
    pub demographics: Map<String, Value>,
}

impl PatientData {
    pub fn new(name: impl Into<String>, procedure: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            procedure: procedure.into(),
            clinical_notes: String::new(),
            demographics: Map::new(),
        }
    }

    pub fn with_clinical_notes(mut self, notes: impl Into<String>) -> Self {
        self.clinical_notes = notes.into();
        self
    }

    pub fn with_demographic(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.demographics.insert(key.into(), value.into());
        self
    }
}

/// Document template attached to the payload.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct DocumentTemplate {
    pub language: String,
    pub format: DocumentFormat,
}

/// Initial shape of the document threaded through the steps.
///
/// After the first parsed agent output the payload is whatever the agent
/// returned, so executions hold it as a plain JSON value.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SurgicalWorkflowPayload {
    pub prompt: String,
    pub patient_data: PatientData,
    pub template: DocumentTemplate,
    pub scratch: Map<String, Value>,
}

impl SurgicalWorkflowPayload {
    /// Builds the initial payload with an empty scratch structure.
    pub fn initial(patient: &PatientData, format: DocumentFormat) -> Self {
        Self {
            prompt: format!("Processar solicitação cirúrgica para {}", patient.name),
            patient_data: patient.clone(),
            template: DocumentTemplate {
                language: DOCUMENT_LANGUAGE.to_string(),
                format,
            },
            scratch: Map::new(),
        }
    }

    pub fn into_value(self) -> Value {
        // Struct of strings and JSON maps; serialization cannot fail.
        serde_json::to_value(self).unwrap_or(Value::Null)
    }
}

/// One step of an execution.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct WorkflowStep {
    /// `{execution_id}-{index}`
    pub id: String,
    pub index: usize,
    /// Agent role driving this step
    pub role: String,
    /// Display name
    pub name: String,
    pub status: StepStatus,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration_ms: Option<u64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub started_at: Option<DateTime<Utc>>,

    /// Continuation token returned by this step's call
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub continuation: Option<ContinuationToken>,
}

impl WorkflowStep {
    pub fn new(execution_id: &str, index: usize, role: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: format!("{}-{}", execution_id, index),
            index,
            role: role.into(),
            name: name.into(),
            status: StepStatus::Pending,
            result: None,
            error: None,
            duration_ms: None,
            started_at: None,
            continuation: None,
        }
    }

    /// Clears run data so the step can be attempted again.
    pub fn reset(&mut self) {
        self.status = StepStatus::Pending;
        self.result = None;
        self.error = None;
        self.duration_ms = None;
        self.started_at = None;
        self.continuation = None;
    }
}

/// A single run of a workflow template for one subject.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct WorkflowExecution {
    pub id: String,
    pub template: String,
    pub patient_name: String,
    pub procedure: String,
    pub status: ExecutionStatus,
    /// Percentage of completed steps, 0..=100
    pub progress: u8,
    pub steps: Vec<WorkflowStep>,
    pub started_at: DateTime<Utc>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ended_at: Option<DateTime<Utc>>,

    /// Working payload threaded through the steps
    pub payload: Value,

    /// Index of the next step to run
    pub next_step: usize,

    /// Token to pass to the next step's call
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub continuation: Option<ContinuationToken>,
}

/// Generates a unique execution id.
pub fn new_execution_id() -> String {
    format!("WF-{}", Uuid::new_v4().simple())
}

impl WorkflowExecution {
    /// Creates a draft execution with its step list fixed by the template.
    pub fn new(template: &WorkflowTemplate, patient: &PatientData) -> Self {
        let id = new_execution_id();
        let steps = template
            .steps
            .iter()
            .enumerate()
            .map(|(index, step)| WorkflowStep::new(&id, index, step.role.clone(), step.name.clone()))
            .collect();

        Self {
            id,
            template: template.name.clone(),
            patient_name: patient.name.clone(),
            procedure: patient.procedure.clone(),
            status: ExecutionStatus::Draft,
            progress: 0,
            steps,
            started_at: Utc::now(),
            ended_at: None,
            payload: SurgicalWorkflowPayload::initial(patient, template.format).into_value(),
            next_step: 0,
            continuation: None,
        }
    }

    pub fn completed_steps(&self) -> usize {
        self.steps
            .iter()
            .filter(|s| s.status == StepStatus::Completed)
            .count()
    }

    pub fn running_steps(&self) -> usize {
        self.steps
            .iter()
            .filter(|s| s.status == StepStatus::Running)
            .count()
    }

    /// Recomputes progress from the step list.
    pub fn recompute_progress(&mut self) {
        self.progress = progress_percent(self.completed_steps(), self.steps.len());
    }

    /// Returns true if every step completed.
    pub fn all_completed(&self) -> bool {
        !self.steps.is_empty() && self.completed_steps() == self.steps.len()
    }

    /// Returns the failed step, if any.
    pub fn failed_step(&self) -> Option<&WorkflowStep> {
        self.steps.iter().find(|s| s.status == StepStatus::Error)
    }

    /// Sets the execution status, stamping the end time on terminal ones.
    pub fn set_status(&mut self, status: ExecutionStatus) {
        self.status = status;
        self.ended_at = if status.is_terminal() {
            Some(Utc::now())
        } else {
            None
        };
    }
}

/// `round(completed / total * 100)`, 0 for an empty step list.
pub fn progress_percent(completed: usize, total: usize) -> u8 {
    if total == 0 {
        return 0;
    }
    let percent = (completed as f64 / total as f64 * 100.0).round();
    percent.clamp(0.0, 100.0) as u8
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn patient() -> PatientData {
        PatientData::new("Maria Santos", "Artrodese L4-L5")
            .with_clinical_notes("Estenose foraminal bilateral L4-L5")
            .with_demographic("age", 65)
    }

    #[test]
    fn test_initial_payload_shape() {
        let payload = SurgicalWorkflowPayload::initial(&patient(), DocumentFormat::MedicalReport)
            .into_value();

        assert_eq!(payload["prompt"], "Processar solicitação cirúrgica para Maria Santos");
        assert_eq!(payload["patientData"]["name"], "Maria Santos");
        assert_eq!(payload["patientData"]["clinicalNotes"], "Estenose foraminal bilateral L4-L5");
        assert_eq!(payload["patientData"]["demographics"]["age"], 65);
        assert_eq!(payload["template"], json!({"language": "pt-BR", "format": "medical_report"}));
        assert_eq!(payload["scratch"], json!({}));
    }

    #[test]
    fn test_execution_creation() {
        let template = WorkflowTemplate::surgical_request();
        let execution = WorkflowExecution::new(&template, &patient());

        assert!(execution.id.starts_with("WF-"));
        assert_eq!(execution.status, ExecutionStatus::Draft);
        assert_eq!(execution.progress, 0);
        assert_eq!(execution.steps.len(), 4);
        assert!(execution.ended_at.is_none());
        assert_eq!(execution.next_step, 0);

        for (i, step) in execution.steps.iter().enumerate() {
            assert_eq!(step.index, i);
            assert_eq!(step.id, format!("{}-{}", execution.id, i));
            assert_eq!(step.status, StepStatus::Pending);
        }
    }

    #[test]
    fn test_execution_ids_are_unique() {
        let template = WorkflowTemplate::surgical_request();
        let a = WorkflowExecution::new(&template, &patient());
        let b = WorkflowExecution::new(&template, &patient());
        assert_ne!(a.id, b.id);
    }

    #[test]
    fn test_progress_percent_rounding() {
        assert_eq!(progress_percent(0, 4), 0);
        assert_eq!(progress_percent(1, 4), 25);
        assert_eq!(progress_percent(1, 3), 33);
        assert_eq!(progress_percent(2, 3), 67);
        assert_eq!(progress_percent(3, 3), 100);
        assert_eq!(progress_percent(0, 0), 0);
    }

    #[test]
    fn test_recompute_progress() {
        let template = WorkflowTemplate::surgical_request();
        let mut execution = WorkflowExecution::new(&template, &patient());

        execution.steps[0].status = StepStatus::Completed;
        execution.steps[1].status = StepStatus::Completed;
        execution.steps[2].status = StepStatus::Running;
        execution.recompute_progress();

        assert_eq!(execution.progress, 50);
        assert_eq!(execution.running_steps(), 1);
        assert!(!execution.all_completed());
    }

    #[test]
    fn test_set_status_end_time() {
        let template = WorkflowTemplate::surgical_request();
        let mut execution = WorkflowExecution::new(&template, &patient());

        execution.set_status(ExecutionStatus::Running);
        assert!(execution.ended_at.is_none());

        execution.set_status(ExecutionStatus::Error);
        assert!(execution.ended_at.is_some());
    }

    #[test]
    fn test_step_reset() {
        let mut step = WorkflowStep::new("WF-1", 0, "ClinicalAnalyst", "Análise Clínica");
        step.status = StepStatus::Error;
        step.error = Some("rate limited".to_string());
        step.duration_ms = Some(12);

        step.reset();
        assert_eq!(step.status, StepStatus::Pending);
        assert!(step.error.is_none());
        assert!(step.duration_ms.is_none());
    }

    #[test]
    fn test_status_serialization() {
        assert_eq!(serde_json::to_value(ExecutionStatus::Completed).unwrap(), json!("completed"));
        assert_eq!(serde_json::to_value(StepStatus::Paused).unwrap(), json!("paused"));
        assert_eq!(
            serde_json::to_value(DocumentFormat::AnsSubmission).unwrap(),
            json!("ans_submission")
        );
        assert!(ExecutionStatus::Error.is_terminal());
        assert!(!ExecutionStatus::Paused.is_terminal());
        assert!(StepStatus::Completed.is_terminal());
        assert!(!StepStatus::Paused.is_terminal());
    }

    #[test]
    fn test_patient_data_from_camel_case_json() {
        let patient: PatientData = serde_json::from_value(json!({
            "name": "João",
            "procedure": "Artroscopia",
            "clinicalNotes": "Lesão meniscal"
        }))
        .unwrap();

        assert_eq!(patient.clinical_notes, "Lesão meniscal");
        assert!(patient.demographics.is_empty());
    }
}
