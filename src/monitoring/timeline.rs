//! Execution Timeline
//!
//! Derives step start/end times from an execution record for generating
//! execution reports and Gantt charts.

use std::collections::HashMap;

use chrono::{DateTime, Duration, Utc};

use crate::workflow::{StepStatus, WorkflowExecution};

/// Type of timeline event.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum EventType {
    /// Step started executing
    Started,
    /// Step completed successfully
    Completed,
    /// Step failed
    Failed,
}

/// A single event in the execution timeline.
#[derive(Debug, Clone)]
pub struct TimelineEvent {
    /// Role of the step
    pub step: String,
    /// Type of event
    pub event_type: EventType,
    /// When the event occurred
    pub timestamp: DateTime<Utc>,
}

/// Timeline of a workflow execution.
///
/// Events come either from live recording or from the start times and
/// durations stored on each step of a finished execution.
#[derive(Debug, Clone)]
pub struct ExecutionTimeline {
    events: Vec<TimelineEvent>,
    start_time: DateTime<Utc>,
    end_time: Option<DateTime<Utc>>,
}

impl ExecutionTimeline {
    /// Creates a new timeline starting now.
    pub fn new() -> Self {
        Self::starting_at(Utc::now())
    }

    fn starting_at(start_time: DateTime<Utc>) -> Self {
        Self {
            events: Vec::new(),
            start_time,
            end_time: None,
        }
    }

    /// Rebuilds the timeline of an execution from its steps.
    pub fn from_execution(execution: &WorkflowExecution) -> Self {
        let mut timeline = Self::starting_at(execution.started_at);
        timeline.end_time = execution.ended_at;

        for step in &execution.steps {
            let Some(started_at) = step.started_at else {
                continue;
            };
            timeline.add_event_at(step.role.clone(), EventType::Started, started_at);

            let finished = match step.status {
                StepStatus::Completed => EventType::Completed,
                StepStatus::Error => EventType::Failed,
                _ => continue,
            };
            let duration = Duration::milliseconds(step.duration_ms.unwrap_or(0) as i64);
            timeline.add_event_at(step.role.clone(), finished, started_at + duration);
        }

        timeline
    }

    /// Records an event for a step.
    pub fn add_event(&mut self, step: String, event_type: EventType) {
        self.add_event_at(step, event_type, Utc::now());
    }

    fn add_event_at(&mut self, step: String, event_type: EventType, timestamp: DateTime<Utc>) {
        self.events.push(TimelineEvent {
            step,
            event_type,
            timestamp,
        });
    }

    /// Returns all recorded events.
    pub fn get_events(&self) -> &[TimelineEvent] {
        &self.events
    }

    /// Returns the total span of the timeline in milliseconds.
    pub fn elapsed_ms(&self) -> i64 {
        let end = self
            .end_time
            .or_else(|| self.events.iter().map(|e| e.timestamp).max())
            .unwrap_or(self.start_time);
        (end - self.start_time).num_milliseconds().max(0)
    }

    fn offset_ms(&self, timestamp: DateTime<Utc>) -> i64 {
        (timestamp - self.start_time).num_milliseconds().max(0)
    }

    /// Generates an ASCII Gantt chart representation.
    ///
    /// Each step is shown as a bar indicating when it ran
    /// relative to the total execution time.
    pub fn gantt_chart(&self) -> String {
        let mut output = String::from("\nExecution Timeline:\n\n");

        let total_time = self.elapsed_ms();

        if total_time == 0 {
            return output;
        }

        // Scale to 50 characters width
        let scale = 50.0 / total_time as f64;

        let mut step_times: Vec<(String, i64, i64, bool)> = Vec::new();

        for event in &self.events {
            let elapsed = self.offset_ms(event.timestamp);

            match event.event_type {
                EventType::Started => step_times.push((event.step.clone(), elapsed, elapsed, false)),
                EventType::Completed | EventType::Failed => {
                    if let Some(times) = step_times.iter_mut().rev().find(|t| t.0 == event.step) {
                        times.2 = elapsed;
                        times.3 = event.event_type == EventType::Failed;
                    }
                }
            }
        }

        step_times.sort_by_key(|(_, start, _, _)| *start);

        for (step, start, end, failed) in step_times {
            if end < start {
                continue;
            }
            let start_pos = (start as f64 * scale) as usize;
            let duration = ((end - start) as f64 * scale).max(1.0) as usize;

            let mut bar = " ".repeat(start_pos);
            bar.push_str(&(if failed { "x" } else { "#" }).repeat(duration));

            output.push_str(&format!(
                "{:26} |{:50}| ({} ms)\n",
                truncate(&step, 26),
                bar,
                end - start
            ));
        }

        output.push_str(&format!("\nTotal: {} ms\n", total_time));
        output
    }

    /// Returns step durations in milliseconds, keyed by role.
    pub fn get_durations(&self) -> HashMap<String, i64> {
        let mut starts: HashMap<String, DateTime<Utc>> = HashMap::new();
        let mut durations: HashMap<String, i64> = HashMap::new();

        for event in &self.events {
            match event.event_type {
                EventType::Started => {
                    starts.insert(event.step.clone(), event.timestamp);
                }
                EventType::Completed | EventType::Failed => {
                    if let Some(start) = starts.get(&event.step) {
                        durations.insert(
                            event.step.clone(),
                            (event.timestamp - *start).num_milliseconds(),
                        );
                    }
                }
            }
        }

        durations
    }
}

impl Default for ExecutionTimeline {
    fn default() -> Self {
        Self::new()
    }
}

/// Pads or truncates a string to a fixed width.
fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        format!("{:width$}", s, width = max_len)
    } else {
        let head: String = s.chars().take(max_len - 3).collect();
        format!("{}...", head)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workflow::{PatientData, WorkflowTemplate};

    fn finished_execution() -> WorkflowExecution {
        let mut exec = WorkflowExecution::new(
            &WorkflowTemplate::surgical_request(),
            &PatientData::new("Maria Santos", "Artrodese L4-L5"),
        );
        let base = exec.started_at;

        for (i, step) in exec.steps.iter_mut().enumerate().take(2) {
            step.started_at = Some(base + Duration::milliseconds(100 * i as i64));
            step.duration_ms = Some(100);
            step.status = StepStatus::Completed;
        }
        exec.steps[2].started_at = Some(base + Duration::milliseconds(200));
        exec.steps[2].duration_ms = Some(40);
        exec.steps[2].status = StepStatus::Error;
        exec.ended_at = Some(base + Duration::milliseconds(240));
        exec
    }

    #[test]
    fn test_timeline_creation() {
        let timeline = ExecutionTimeline::new();
        assert!(timeline.events.is_empty());
    }

    #[test]
    fn test_from_execution_events() {
        let timeline = ExecutionTimeline::from_execution(&finished_execution());

        // Two completed steps, one failed, one never started
        assert_eq!(timeline.get_events().len(), 6);
        assert_eq!(timeline.get_events()[5].event_type, EventType::Failed);
        assert_eq!(timeline.elapsed_ms(), 240);
    }

    #[test]
    fn test_get_durations_by_role() {
        let timeline = ExecutionTimeline::from_execution(&finished_execution());
        let durations = timeline.get_durations();

        assert_eq!(durations.get("ClinicalAnalyst"), Some(&100));
        assert_eq!(durations.get("ANSSubmissionAgent"), Some(&100));
        assert_eq!(durations.get("SchedulingAgent"), Some(&40));
        assert!(!durations.contains_key("PatientCommunicationAgent"));
    }

    #[test]
    fn test_gantt_chart_generation() {
        let chart = ExecutionTimeline::from_execution(&finished_execution()).gantt_chart();

        assert!(chart.contains("ClinicalAnalyst"));
        assert!(chart.contains("SchedulingAgent"));
        assert!(chart.contains("(100 ms)"));
        assert!(chart.contains("Total: 240 ms"));
        assert!(!chart.contains("PatientCommunicationAgent"));
    }

    #[test]
    fn test_gantt_chart_empty() {
        let timeline = ExecutionTimeline::new();
        let chart = timeline.gantt_chart();
        assert!(chart.contains("Timeline"));
        assert!(!chart.contains("Total"));
    }

    #[test]
    fn test_live_events() {
        let mut timeline = ExecutionTimeline::new();
        timeline.add_event("ClinicalAnalyst".to_string(), EventType::Started);
        timeline.add_event("ClinicalAnalyst".to_string(), EventType::Completed);

        assert_eq!(timeline.get_events().len(), 2);
        assert!(timeline.get_durations().contains_key("ClinicalAnalyst"));
    }

    #[test]
    fn test_get_durations_only_started() {
        let mut timeline = ExecutionTimeline::new();
        timeline.add_event("step1".to_string(), EventType::Started);
        assert!(timeline.get_durations().is_empty());
    }

    #[test]
    fn test_truncate() {
        assert_eq!(truncate("abc", 5), "abc  ");
        assert_eq!(truncate("Comunicação Paciente", 10), "Comunic...");
    }
}
