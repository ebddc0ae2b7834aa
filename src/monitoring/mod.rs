//! Execution Monitoring Module
//!
//! - [`events`]: Terminal record log with broadcast and polling access
//! - [`timeline`]: Step timing and Gantt chart generation

pub mod events;
pub mod timeline;

pub use events::{EventLog, ExecutionRecord, RecordOutcome, RecordTarget};
pub use timeline::{EventType, ExecutionTimeline, TimelineEvent};
