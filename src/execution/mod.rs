//! Workflow Execution Module
//!
//! Drives workflow executions step by step and runs single-shot
//! analyses.
//!
//! # Architecture
//!
//! - [`sequencer`]: Sequential multi-agent execution with pause/resume
//! - [`step`]: Individual step invocation and output parsing
//! - [`analyzer`]: One-call structured analyses

pub mod analyzer;
pub mod sequencer;
pub mod step;

pub use analyzer::{parse_output, AnalysisKind, Analyzer};
pub use sequencer::{ExecutionOutcome, Sequencer, StepFailure};
pub use step::{execute_step, ParseOutcome, StepAttempt, StepOutput};
