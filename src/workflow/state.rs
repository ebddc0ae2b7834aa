//! Workflow State Store
//!
//! Authoritative in-memory collection of workflow executions for the
//! lifetime of the process. Every mutation is applied to a copy of the
//! record, progress is recomputed on the copy, and the whole record then
//! replaces the stored one under a single write lock, so readers never
//! see a step transition without its matching progress value.
//!
//! The store is a cheap handle: clones share the same collection, which
//! lets independent executions update it concurrently.

use std::collections::HashMap;
use std::fs;
use std::path::Path;
use std::sync::{Arc, PoisonError, RwLock};

use log::{debug, info};

use crate::error::WorkflowError;

use super::model::WorkflowExecution;

/// Shared, thread-safe execution repository.
#[derive(Clone, Default)]
pub struct WorkflowStore {
    executions: Arc<RwLock<HashMap<String, WorkflowExecution>>>,
}

impl WorkflowStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a new execution, replacing any record with the same id.
    pub fn insert(&self, execution: WorkflowExecution) {
        debug!("Storing execution {}", execution.id);
        let mut executions = self.executions.write().unwrap_or_else(PoisonError::into_inner);
        executions.insert(execution.id.clone(), execution);
    }

    /// Returns a snapshot of one execution.
    pub fn get(&self, id: &str) -> Option<WorkflowExecution> {
        let executions = self.executions.read().unwrap_or_else(PoisonError::into_inner);
        executions.get(id).cloned()
    }

    /// Returns snapshots of all executions, oldest first.
    pub fn list(&self) -> Vec<WorkflowExecution> {
        let executions = self.executions.read().unwrap_or_else(PoisonError::into_inner);
        let mut all: Vec<WorkflowExecution> = executions.values().cloned().collect();
        all.sort_by(|a, b| a.started_at.cmp(&b.started_at).then_with(|| a.id.cmp(&b.id)));
        all
    }

    /// Replaces an existing record wholesale.
    pub fn replace(&self, execution: WorkflowExecution) -> Result<(), WorkflowError> {
        let mut executions = self.executions.write().unwrap_or_else(PoisonError::into_inner);
        match executions.get_mut(&execution.id) {
            Some(slot) => {
                *slot = execution;
                Ok(())
            }
            None => Err(WorkflowError::NotFound(execution.id)),
        }
    }

    /// Applies a point update to one execution.
    ///
    /// The closure runs on a copy; progress is recomputed before the copy
    /// replaces the stored record. Returns the updated snapshot.
    pub fn update<F>(&self, id: &str, apply: F) -> Result<WorkflowExecution, WorkflowError>
    where
        F: FnOnce(&mut WorkflowExecution),
    {
        self.try_update(id, |execution| {
            apply(execution);
            Ok(())
        })
    }

    /// Applies a point update the closure may refuse.
    ///
    /// The closure sees the current record under the write lock, so a
    /// status check inside it cannot race another writer. On error the
    /// stored record is left untouched.
    pub fn try_update<F>(&self, id: &str, apply: F) -> Result<WorkflowExecution, WorkflowError>
    where
        F: FnOnce(&mut WorkflowExecution) -> Result<(), WorkflowError>,
    {
        let mut executions = self.executions.write().unwrap_or_else(PoisonError::into_inner);
        let current = executions
            .get(id)
            .ok_or_else(|| WorkflowError::NotFound(id.to_string()))?;

        let mut next = current.clone();
        apply(&mut next)?;
        next.recompute_progress();

        executions.insert(id.to_string(), next.clone());
        Ok(next)
    }

    /// Returns the number of stored executions.
    pub fn len(&self) -> usize {
        self.executions.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    /// Returns true if no executions are stored.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Writes all executions to a JSON file.
    pub fn save_json(&self, path: impl AsRef<Path>) -> Result<(), WorkflowError> {
        let path = path.as_ref();
        let json = serde_json::to_string_pretty(&self.list()).map_err(|e| WorkflowError::Io {
            path: path.display().to_string(),
            source: std::io::Error::new(std::io::ErrorKind::InvalidData, e),
        })?;

        fs::write(path, json).map_err(|source| WorkflowError::Io {
            path: path.display().to_string(),
            source,
        })?;

        info!("Saved {} executions to {}", self.len(), path.display());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workflow::model::{ExecutionStatus, PatientData, StepStatus};
    use crate::workflow::template::WorkflowTemplate;
    use std::thread;
    use tempfile::tempdir;

    fn execution() -> WorkflowExecution {
        WorkflowExecution::new(
            &WorkflowTemplate::surgical_request(),
            &PatientData::new("Maria Santos", "Artrodese L4-L5"),
        )
    }

    #[test]
    fn test_store_insert_and_get() {
        let store = WorkflowStore::new();
        let exec = execution();
        let id = exec.id.clone();

        store.insert(exec);
        assert_eq!(store.len(), 1);
        assert_eq!(store.get(&id).unwrap().id, id);
        assert!(store.get("WF-missing").is_none());
    }

    #[test]
    fn test_update_recomputes_progress() {
        let store = WorkflowStore::new();
        let exec = execution();
        let id = exec.id.clone();
        store.insert(exec);

        let updated = store
            .update(&id, |e| {
                e.steps[0].status = StepStatus::Completed;
            })
            .unwrap();

        assert_eq!(updated.progress, 25);
        assert_eq!(store.get(&id).unwrap().progress, 25);
    }

    #[test]
    fn test_update_missing_execution() {
        let store = WorkflowStore::new();
        let result = store.update("WF-missing", |_| {});
        assert!(matches!(result, Err(WorkflowError::NotFound(_))));
    }

    #[test]
    fn test_try_update_refusal_keeps_record() {
        let store = WorkflowStore::new();
        let exec = execution();
        let id = exec.id.clone();
        store.insert(exec.clone());

        let result = store.try_update(&id, |e| {
            e.steps[0].status = StepStatus::Completed;
            Err(WorkflowError::NotFound("refused".into()))
        });

        assert!(result.is_err());
        assert_eq!(store.get(&id).unwrap(), exec);
    }

    #[test]
    fn test_try_update_check_and_write_are_atomic() {
        let store = WorkflowStore::new();
        let exec = execution();
        let id = exec.id.clone();
        store.insert(exec);

        let handles: Vec<_> = (0..16)
            .map(|_| {
                let store = store.clone();
                let id = id.clone();
                thread::spawn(move || {
                    store
                        .try_update(&id, |e| {
                            if e.status != ExecutionStatus::Draft {
                                return Err(WorkflowError::NotFound(e.id.clone()));
                            }
                            e.status = ExecutionStatus::Running;
                            Ok(())
                        })
                        .is_ok()
                })
            })
            .collect();

        let winners = handles
            .into_iter()
            .map(|handle| handle.join().unwrap())
            .filter(|won| *won)
            .count();
        assert_eq!(winners, 1);
        assert_eq!(store.get(&id).unwrap().status, ExecutionStatus::Running);
    }

    #[test]
    fn test_replace_requires_existing_record() {
        let store = WorkflowStore::new();
        let mut exec = execution();
        assert!(store.replace(exec.clone()).is_err());

        store.insert(exec.clone());
        exec.status = ExecutionStatus::Running;
        store.replace(exec.clone()).unwrap();
        assert_eq!(store.get(&exec.id).unwrap().status, ExecutionStatus::Running);
    }

    #[test]
    fn test_clones_share_state() {
        let store = WorkflowStore::new();
        let handle = store.clone();
        handle.insert(execution());
        assert_eq!(store.len(), 1);
        assert!(!store.is_empty());
    }

    #[test]
    fn test_concurrent_updates_on_distinct_executions() {
        let store = WorkflowStore::new();
        let ids: Vec<String> = (0..8)
            .map(|_| {
                let exec = execution();
                let id = exec.id.clone();
                store.insert(exec);
                id
            })
            .collect();

        let handles: Vec<_> = ids
            .iter()
            .cloned()
            .map(|id| {
                let store = store.clone();
                thread::spawn(move || {
                    for i in 0..4 {
                        store
                            .update(&id, |e| e.steps[i].status = StepStatus::Completed)
                            .unwrap();
                    }
                })
            })
            .collect();

        for handle in handles {
            handle.join().unwrap();
        }

        for id in ids {
            let exec = store.get(&id).unwrap();
            assert_eq!(exec.progress, 100);
            assert!(exec.all_completed());
        }
    }

    #[test]
    fn test_list_is_ordered() {
        let store = WorkflowStore::new();
        let first = execution();
        let second = execution();
        store.insert(second.clone());
        store.insert(first.clone());

        let listed = store.list();
        assert_eq!(listed.len(), 2);
        assert!(listed[0].started_at <= listed[1].started_at);
    }

    #[test]
    fn test_save_json() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("executions.json");

        let store = WorkflowStore::new();
        store.insert(execution());
        store.save_json(&path).unwrap();

        let content = fs::read_to_string(&path).unwrap();
        let loaded: Vec<WorkflowExecution> = serde_json::from_str(&content).unwrap();
        assert_eq!(loaded.len(), 1);
        assert_eq!(loaded[0].patient_name, "Maria Santos");
    }
}
