//! Terminal Record Log
//!
//! Every terminal step transition and every terminal execution transition
//! produces one [`ExecutionRecord`]. Records are kept in order for polling
//! consumers and broadcast to live subscribers.
//!
//! History is bounded: once the retention limit is reached the oldest
//! records are dropped. Polling cursors are absolute positions, so they
//! stay valid across drops.

use std::collections::VecDeque;
use std::sync::{Mutex, PoisonError};

use chrono::{DateTime, Utc};
use log::{debug, trace};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::broadcast;

const CHANNEL_CAPACITY: usize = 256;

/// Records kept for polling by default.
pub const DEFAULT_RETENTION: usize = 4096;

/// What a record refers to.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case", tag = "kind", content = "index")]
pub enum RecordTarget {
    Step(usize),
    Execution,
}

/// Result attached to a record.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "snake_case")]
pub enum RecordOutcome {
    Result(Value),
    Error(String),
    None,
}

/// One terminal transition.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct ExecutionRecord {
    pub execution_id: String,
    pub target: RecordTarget,
    pub status: String,
    pub outcome: RecordOutcome,
    pub timestamp: DateTime<Utc>,
}

impl ExecutionRecord {
    pub fn step(
        execution_id: impl Into<String>,
        index: usize,
        status: impl Into<String>,
        outcome: RecordOutcome,
    ) -> Self {
        Self {
            execution_id: execution_id.into(),
            target: RecordTarget::Step(index),
            status: status.into(),
            outcome,
            timestamp: Utc::now(),
        }
    }

    pub fn execution(
        execution_id: impl Into<String>,
        status: impl Into<String>,
        outcome: RecordOutcome,
    ) -> Self {
        Self {
            execution_id: execution_id.into(),
            target: RecordTarget::Execution,
            status: status.into(),
            outcome,
            timestamp: Utc::now(),
        }
    }
}

/// Retained records plus the count of records dropped before them.
#[derive(Default)]
struct History {
    records: VecDeque<ExecutionRecord>,
    dropped: usize,
}

impl History {
    fn end(&self) -> usize {
        self.dropped + self.records.len()
    }
}

/// Ordered, broadcasting record log.
pub struct EventLog {
    sender: broadcast::Sender<ExecutionRecord>,
    history: Mutex<History>,
    retention: usize,
}

impl EventLog {
    pub fn new() -> Self {
        Self::with_retention(DEFAULT_RETENTION)
    }

    /// Keeps at most `retention` records for polling (at least one).
    pub fn with_retention(retention: usize) -> Self {
        let (sender, _) = broadcast::channel(CHANNEL_CAPACITY);
        Self {
            sender,
            history: Mutex::new(History::default()),
            retention: retention.max(1),
        }
    }

    /// Appends a record and publishes it to subscribers.
    pub fn record(&self, record: ExecutionRecord) {
        trace!(
            "Record {} {:?} -> {}",
            record.execution_id,
            record.target,
            record.status
        );
        {
            let mut history = self.history.lock().unwrap_or_else(PoisonError::into_inner);
            history.records.push_back(record.clone());
            while history.records.len() > self.retention {
                history.records.pop_front();
                history.dropped += 1;
            }
        }
        // No subscribers is fine; polling still sees the record.
        let _ = self.sender.send(record);
    }

    /// Subscribes to records emitted from now on.
    pub fn subscribe(&self) -> broadcast::Receiver<ExecutionRecord> {
        self.sender.subscribe()
    }

    /// Returns every retained record.
    pub fn records(&self) -> Vec<ExecutionRecord> {
        let history = self.history.lock().unwrap_or_else(PoisonError::into_inner);
        history.records.iter().cloned().collect()
    }

    /// Returns retained records after `cursor` and the cursor to poll with
    /// next. Records dropped before the caller polled are skipped.
    pub fn records_since(&self, cursor: usize) -> (Vec<ExecutionRecord>, usize) {
        let history = self.history.lock().unwrap_or_else(PoisonError::into_inner);
        if cursor < history.dropped {
            debug!(
                "Cursor {} is behind retained history; {} records were dropped",
                cursor,
                history.dropped - cursor
            );
        }
        let start = cursor.saturating_sub(history.dropped).min(history.records.len());
        (history.records.range(start..).cloned().collect(), history.end())
    }

    /// Returns the retained records of one execution.
    pub fn records_for(&self, execution_id: &str) -> Vec<ExecutionRecord> {
        self.history
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .records
            .iter()
            .filter(|r| r.execution_id == execution_id)
            .cloned()
            .collect()
    }
}

impl Default for EventLog {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_records_are_ordered() {
        let log = EventLog::new();
        log.record(ExecutionRecord::step("WF-1", 0, "completed", RecordOutcome::Result(json!({}))));
        log.record(ExecutionRecord::execution("WF-1", "completed", RecordOutcome::None));

        let records = log.records();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].target, RecordTarget::Step(0));
        assert_eq!(records[1].target, RecordTarget::Execution);
    }

    #[test]
    fn test_records_since_cursor() {
        let log = EventLog::new();
        log.record(ExecutionRecord::step("WF-1", 0, "completed", RecordOutcome::None));

        let (first, cursor) = log.records_since(0);
        assert_eq!(first.len(), 1);
        assert_eq!(cursor, 1);

        let (empty, same) = log.records_since(cursor);
        assert!(empty.is_empty());
        assert_eq!(same, 1);

        log.record(ExecutionRecord::step("WF-1", 1, "error", RecordOutcome::Error("boom".into())));
        let (next, cursor) = log.records_since(cursor);
        assert_eq!(next.len(), 1);
        assert_eq!(next[0].outcome, RecordOutcome::Error("boom".into()));
        assert_eq!(cursor, 2);

        let (beyond, _) = log.records_since(99);
        assert!(beyond.is_empty());
    }

    #[test]
    fn test_records_for_execution() {
        let log = EventLog::new();
        log.record(ExecutionRecord::execution("WF-1", "completed", RecordOutcome::None));
        log.record(ExecutionRecord::execution("WF-2", "error", RecordOutcome::None));

        assert_eq!(log.records_for("WF-2").len(), 1);
        assert!(log.records_for("WF-3").is_empty());
    }

    #[test]
    fn test_retention_drops_oldest() {
        let log = EventLog::with_retention(2);
        for index in 0..3 {
            log.record(ExecutionRecord::step("WF-1", index, "completed", RecordOutcome::None));
        }

        let records = log.records();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].target, RecordTarget::Step(1));
        assert_eq!(records[1].target, RecordTarget::Step(2));

        let (since_start, cursor) = log.records_since(0);
        assert_eq!(since_start.len(), 2);
        assert_eq!(cursor, 3);

        let (latest, _) = log.records_since(2);
        assert_eq!(latest.len(), 1);
        assert_eq!(latest[0].target, RecordTarget::Step(2));

        log.record(ExecutionRecord::execution("WF-1", "completed", RecordOutcome::None));
        let (next, cursor) = log.records_since(cursor);
        assert_eq!(next.len(), 1);
        assert_eq!(next[0].target, RecordTarget::Execution);
        assert_eq!(cursor, 4);
        assert_eq!(log.records_for("WF-1").len(), 2);
    }

    #[tokio::test]
    async fn test_subscribers_receive_records() {
        let log = EventLog::new();
        let mut rx = log.subscribe();

        log.record(ExecutionRecord::execution("WF-1", "paused", RecordOutcome::None));

        let received = rx.recv().await.unwrap();
        assert_eq!(received.execution_id, "WF-1");
        assert_eq!(received.status, "paused");
    }

    #[test]
    fn test_record_serialization() {
        let record = ExecutionRecord::step("WF-1", 2, "completed", RecordOutcome::None);
        let value = serde_json::to_value(&record).unwrap();
        assert_eq!(value["target"], json!({"kind": "step", "index": 2}));
        assert_eq!(value["outcome"], json!("none"));
    }
}
