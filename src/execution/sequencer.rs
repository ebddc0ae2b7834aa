//! Workflow Step Sequencer
//!
//! Drives an execution through its steps, one at a time and in template
//! order:
//! - Each step's generation call is awaited before the next step starts
//! - Every transition is written to the store as a whole-record update
//! - A failed call stops the execution; later steps stay pending
//! - Unparseable output keeps the previous payload and the step completes
//! - Pause requests are honoured between steps
//!
//! Terminal step and execution transitions are published to the
//! [`EventLog`].

use std::collections::HashSet;
use std::fmt;
use std::sync::{Arc, Mutex, PoisonError};

use chrono::Utc;
use log::{error, info, warn};

use crate::agents::AgentRegistry;
use crate::error::WorkflowError;
use crate::generation::GenerationClient;
use crate::monitoring::{EventLog, ExecutionRecord, RecordOutcome};
use crate::workflow::{
    validate_template, ExecutionStatus, PatientData, StepStatus, WorkflowExecution, WorkflowStore,
    WorkflowTemplate,
};

use super::step::execute_step;

/// Details of the step that stopped an execution.
#[derive(Debug, Clone, PartialEq)]
pub struct StepFailure {
    pub step_index: usize,
    pub role: String,
    pub message: String,
}

impl fmt::Display for StepFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "step {} ({}) failed: {}",
            self.step_index + 1,
            self.role,
            self.message
        )
    }
}

/// How a run of the sequencer ended.
#[derive(Debug, Clone)]
pub enum ExecutionOutcome {
    Completed(WorkflowExecution),
    Paused {
        execution: WorkflowExecution,
        next_step: usize,
    },
    Failed {
        execution: WorkflowExecution,
        failure: StepFailure,
    },
}

impl ExecutionOutcome {
    /// Final snapshot of the execution.
    pub fn execution(&self) -> &WorkflowExecution {
        match self {
            Self::Completed(execution) => execution,
            Self::Paused { execution, .. } => execution,
            Self::Failed { execution, .. } => execution,
        }
    }

    pub fn into_execution(self) -> WorkflowExecution {
        match self {
            Self::Completed(execution) => execution,
            Self::Paused { execution, .. } => execution,
            Self::Failed { execution, .. } => execution,
        }
    }

    pub fn status(&self) -> ExecutionStatus {
        self.execution().status
    }
}

/// Workflow execution sequencer.
///
/// Cheap to clone; clones share the client, registry, store, event log
/// and pending pause requests.
///
/// # Example
///
/// ```rust,no_run
/// use std::sync::Arc;
/// use surgiflow::agents::AgentRegistry;
/// use surgiflow::execution::Sequencer;
/// use surgiflow::generation::OpenAiClient;
/// use surgiflow::workflow::{PatientData, WorkflowTemplate};
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let client = Arc::new(OpenAiClient::new(std::env::var("OPENAI_API_KEY")?)?);
///     let sequencer = Sequencer::new(client, Arc::new(AgentRegistry::builtin()));
///
///     let patient = PatientData::new("Maria Santos", "Artrodese L4-L5");
///     let outcome = sequencer
///         .execute(&WorkflowTemplate::surgical_request(), &patient)
///         .await?;
///     println!("{}: {}%", outcome.status(), outcome.execution().progress);
///     Ok(())
/// }
/// ```
#[derive(Clone)]
pub struct Sequencer {
    client: Arc<dyn GenerationClient>,
    registry: Arc<AgentRegistry>,
    store: WorkflowStore,
    events: Arc<EventLog>,
    pause_requests: Arc<Mutex<HashSet<String>>>,
}

impl Sequencer {
    /// Creates a sequencer with its own store and event log.
    pub fn new(client: Arc<dyn GenerationClient>, registry: Arc<AgentRegistry>) -> Self {
        Self {
            client,
            registry,
            store: WorkflowStore::new(),
            events: Arc::new(EventLog::new()),
            pause_requests: Arc::new(Mutex::new(HashSet::new())),
        }
    }

    /// Uses an existing store.
    pub fn with_store(mut self, store: WorkflowStore) -> Self {
        self.store = store;
        self
    }

    /// Uses an existing event log.
    pub fn with_events(mut self, events: Arc<EventLog>) -> Self {
        self.events = events;
        self
    }

    pub fn store(&self) -> &WorkflowStore {
        &self.store
    }

    pub fn events(&self) -> &Arc<EventLog> {
        &self.events
    }

    pub fn registry(&self) -> &AgentRegistry {
        &self.registry
    }

    /// Validates the template, then creates a draft execution and adds it
    /// to the store.
    pub fn create(
        &self,
        template: &WorkflowTemplate,
        patient: &PatientData,
    ) -> Result<WorkflowExecution, WorkflowError> {
        let mut template = template.clone();
        validate_template(&mut template, &self.registry)?;

        let execution = WorkflowExecution::new(&template, patient);
        info!(
            "Created execution {} ({} steps) for {}",
            execution.id,
            execution.steps.len(),
            execution.patient_name
        );
        self.store.insert(execution.clone());
        Ok(execution)
    }

    /// Creates an execution and runs it.
    pub async fn execute(
        &self,
        template: &WorkflowTemplate,
        patient: &PatientData,
    ) -> Result<ExecutionOutcome, WorkflowError> {
        let execution = self.create(template, patient)?;
        self.start(&execution.id).await
    }

    /// Starts a draft execution from its first step.
    pub async fn start(&self, id: &str) -> Result<ExecutionOutcome, WorkflowError> {
        self.transition(id, ExecutionStatus::Draft, "start", |e| {
            e.set_status(ExecutionStatus::Running);
            e.next_step = 0;
        })?;

        info!("Starting execution {}", id);
        self.drive(id, 0).await
    }

    /// Requests a pause. Honoured before the next step starts.
    pub fn pause(&self, id: &str) -> Result<(), WorkflowError> {
        let execution = self.get(id)?;
        if execution.status != ExecutionStatus::Running {
            return Err(invalid_transition(&execution, "pause"));
        }

        info!("Pause requested for execution {}", id);
        self.pause_requests
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(id.to_string());
        Ok(())
    }

    /// Continues a paused execution from its recorded next step.
    pub async fn resume(&self, id: &str) -> Result<ExecutionOutcome, WorkflowError> {
        let execution = self.transition(id, ExecutionStatus::Paused, "resume", |e| {
            let next = e.next_step;
            if let Some(step) = e.steps.get_mut(next) {
                step.status = StepStatus::Pending;
            }
            e.set_status(ExecutionStatus::Running);
        })?;

        info!("Resuming execution {} at step {}", id, execution.next_step + 1);
        self.drive(id, execution.next_step).await
    }

    /// Restarts a failed execution from the step that failed.
    ///
    /// Earlier completed steps keep their results; the failed step runs
    /// again with the payload and continuation token it originally saw.
    pub async fn retry(&self, id: &str) -> Result<ExecutionOutcome, WorkflowError> {
        let execution = self.transition(id, ExecutionStatus::Error, "retry", |e| {
            let failed = e
                .steps
                .iter()
                .position(|s| s.status == StepStatus::Error)
                .unwrap_or(e.next_step);
            if let Some(step) = e.steps.get_mut(failed) {
                step.reset();
            }
            e.next_step = failed;
            e.set_status(ExecutionStatus::Running);
        })?;

        info!("Retrying execution {} from step {}", id, execution.next_step + 1);
        self.drive(id, execution.next_step).await
    }

    fn get(&self, id: &str) -> Result<WorkflowExecution, WorkflowError> {
        self.store
            .get(id)
            .ok_or_else(|| WorkflowError::NotFound(id.to_string()))
    }

    /// Applies `apply` if the execution is in `expected` status. The check
    /// and the write share one store lock.
    fn transition<F>(
        &self,
        id: &str,
        expected: ExecutionStatus,
        action: &'static str,
        apply: F,
    ) -> Result<WorkflowExecution, WorkflowError>
    where
        F: FnOnce(&mut WorkflowExecution),
    {
        self.store.try_update(id, |execution| {
            if execution.status != expected {
                return Err(invalid_transition(execution, action));
            }
            apply(execution);
            Ok(())
        })
    }

    fn take_pause_request(&self, id: &str) -> bool {
        self.pause_requests
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(id)
    }

    /// Runs steps `from..` of a running execution.
    async fn drive(&self, id: &str, from: usize) -> Result<ExecutionOutcome, WorkflowError> {
        let mut snapshot = self.get(id)?;
        let total = snapshot.steps.len();

        for index in from..total {
            if self.take_pause_request(id) {
                snapshot = self.store.update(id, |e| {
                    e.steps[index].status = StepStatus::Paused;
                    e.next_step = index;
                    e.set_status(ExecutionStatus::Paused);
                })?;
                info!("Execution {} paused before step {}", id, index + 1);
                self.events.record(ExecutionRecord::execution(
                    id,
                    ExecutionStatus::Paused.as_str(),
                    RecordOutcome::None,
                ));
                return Ok(ExecutionOutcome::Paused {
                    execution: snapshot,
                    next_step: index,
                });
            }

            let role_name = snapshot.steps[index].role.clone();
            let role = self.registry.resolve(&role_name);

            info!(
                "[{}/{}] Running step '{}' ({})",
                index + 1,
                total,
                snapshot.steps[index].name,
                role_name
            );

            let started_at = Utc::now();
            snapshot = self.store.update(id, |e| {
                e.steps[index].status = StepStatus::Running;
                e.steps[index].started_at = Some(started_at);
                e.next_step = index;
            })?;

            let attempt = execute_step(
                self.client.as_ref(),
                &role,
                &snapshot.payload,
                snapshot.continuation.as_ref(),
            )
            .await;
            let duration_ms = attempt.duration_ms;

            match attempt.result {
                Ok(output) => {
                    let result = output.result_value();
                    snapshot = self.store.update(id, |e| {
                        output.parse.apply_to(&mut e.payload);
                        let step = &mut e.steps[index];
                        step.status = StepStatus::Completed;
                        step.result = Some(result.clone());
                        step.duration_ms = Some(duration_ms);
                        step.continuation = Some(output.continuation.clone());
                        e.continuation = Some(output.continuation.clone());
                        e.next_step = index + 1;
                    })?;

                    info!(
                        "Step '{}' completed in {} ms ({}%)",
                        role_name, duration_ms, snapshot.progress
                    );
                    self.events.record(ExecutionRecord::step(
                        id,
                        index,
                        StepStatus::Completed.as_str(),
                        RecordOutcome::Result(result),
                    ));
                }
                Err(err) => {
                    let message = err.to_string();
                    snapshot = self.store.update(id, |e| {
                        let step = &mut e.steps[index];
                        step.status = StepStatus::Error;
                        step.error = Some(message.clone());
                        step.duration_ms = Some(duration_ms);
                        e.next_step = index;
                        e.set_status(ExecutionStatus::Error);
                    })?;

                    error!("Step '{}' failed ({}): {}", role_name, err.kind(), message);
                    self.events.record(ExecutionRecord::step(
                        id,
                        index,
                        StepStatus::Error.as_str(),
                        RecordOutcome::Error(message.clone()),
                    ));
                    self.events.record(ExecutionRecord::execution(
                        id,
                        ExecutionStatus::Error.as_str(),
                        RecordOutcome::Error(message.clone()),
                    ));
                    self.take_pause_request(id);

                    return Ok(ExecutionOutcome::Failed {
                        execution: snapshot,
                        failure: StepFailure {
                            step_index: index,
                            role: role_name,
                            message,
                        },
                    });
                }
            }
        }

        if self.take_pause_request(id) {
            warn!("Pause request for {} arrived after the last step; ignoring", id);
        }

        snapshot = self.store.update(id, |e| {
            e.next_step = total;
            e.set_status(ExecutionStatus::Completed);
        })?;

        info!("Execution {} completed ({}%)", id, snapshot.progress);
        self.events.record(ExecutionRecord::execution(
            id,
            ExecutionStatus::Completed.as_str(),
            RecordOutcome::Result(snapshot.payload.clone()),
        ));

        Ok(ExecutionOutcome::Completed(snapshot))
    }
}

fn invalid_transition(execution: &WorkflowExecution, action: &'static str) -> WorkflowError {
    WorkflowError::InvalidTransition {
        id: execution.id.clone(),
        status: execution.status.to_string(),
        action,
    }
}
