//! Single-Shot Analyses
//!
//! Analysis kinds run by the [`Analyzer`](crate::execution::Analyzer):
//!
//! - [`postop`]: Post-operative report analysis and follow-up scheduling
//! - [`intake`]: Surgical request extraction from patient records
//! - [`report`]: Final medical report with procedure and material codes

pub mod intake;
pub mod postop;
pub mod report;

pub use intake::{ExtractedRequest, SurgicalRequestDraft, SurgicalRequestExtraction};
pub use postop::{
    FollowUp, FollowUpType, PostOperativeAnalysis, PostOperativeReport, Reminder,
    ReminderCategory, ScheduledFollowUp, TechnicalDetails,
};
pub use report::{MedicalReport, MedicalReportGeneration, OpmeMaterial, PhysicianData};
