//! Post-Operative Report Analysis
//!
//! Turns a free-text surgical report into a summary, recommendations,
//! structured technical details, patient reminders and a follow-up
//! schedule for the surgeon.

use chrono::{Days, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::execution::AnalysisKind;

pub const POST_OPERATIVE_MODEL: &str = "gpt-4o";

const INSTRUCTIONS: &str = "Você é um especialista em análise de relatórios cirúrgicos pós-operatórios.
Analise o relatório cirúrgico fornecido e extraia:
1. Resumo da cirurgia (máximo 300 palavras)
2. Recomendações pós-operatórias detalhadas
3. Detalhes técnicos estruturados
4. Lista de lembretes/orientações para o paciente
5. Cronograma de acompanhamento para o médico

Responda APENAS em formato JSON válido com a estrutura:
{
  \"surgery_summary\": \"...\",
  \"recommendations\": \"...\",
  \"technical_details\": {
    \"procedure_type\": \"...\", \"duration\": \"...\", \"complications\": [\"...\"],
    \"anesthesia_type\": \"...\", \"surgeon\": \"...\", \"assistant_surgeon\": \"...\",
    \"instruments_used\": [\"...\"], \"blood_loss\": \"...\", \"closure_method\": \"...\"
  },
  \"reminders\": [{\"title\": \"...\", \"description\": \"...\",
    \"category\": \"medication|activity|diet|wound_care|warning_signs\"}],
  \"follow_up_schedule\": [{\"days_after_surgery\": 7,
    \"follow_up_type\": \"phone_call|video_call|in_person|message\", \"notes\": \"...\"}]
}";

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ReminderCategory {
    Medication,
    Activity,
    Diet,
    WoundCare,
    WarningSigns,
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum FollowUpType {
    PhoneCall,
    VideoCall,
    InPerson,
    Message,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct TechnicalDetails {
    pub procedure_type: String,
    pub duration: String,
    #[serde(default)]
    pub complications: Vec<String>,
    pub anesthesia_type: String,
    pub surgeon: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assistant_surgeon: Option<String>,
    #[serde(default)]
    pub instruments_used: Vec<String>,
    pub blood_loss: String,
    pub closure_method: String,
}

/// Guidance for the patient.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Reminder {
    pub title: String,
    pub description: String,
    pub category: ReminderCategory,
}

/// Follow-up relative to the surgery date.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct FollowUp {
    pub days_after_surgery: u32,
    pub follow_up_type: FollowUpType,
    #[serde(default)]
    pub notes: String,
}

/// Follow-up pinned to a calendar date.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct ScheduledFollowUp {
    pub scheduled_date: NaiveDate,
    pub follow_up_type: FollowUpType,
    pub notes: String,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct PostOperativeReport {
    pub surgery_summary: String,
    pub recommendations: String,
    pub technical_details: TechnicalDetails,
    #[serde(default)]
    pub reminders: Vec<Reminder>,
    #[serde(default)]
    pub follow_up_schedule: Vec<FollowUp>,
}

impl PostOperativeReport {
    /// Dates every follow-up relative to the surgery date.
    pub fn schedule_follow_ups(&self, surgery_date: NaiveDate) -> Vec<ScheduledFollowUp> {
        self.follow_up_schedule
            .iter()
            .filter_map(|f| {
                surgery_date
                    .checked_add_days(Days::new(u64::from(f.days_after_surgery)))
                    .map(|scheduled_date| ScheduledFollowUp {
                        scheduled_date,
                        follow_up_type: f.follow_up_type,
                        notes: f.notes.clone(),
                    })
            })
            .collect()
    }
}

/// Post-operative analysis of one surgical report.
#[derive(Debug, Clone)]
pub struct PostOperativeAnalysis {
    pub patient_name: String,
    pub procedure: String,
}

impl PostOperativeAnalysis {
    pub fn new(patient_name: impl Into<String>, procedure: impl Into<String>) -> Self {
        Self {
            patient_name: patient_name.into(),
            procedure: procedure.into(),
        }
    }
}

impl AnalysisKind for PostOperativeAnalysis {
    type Output = PostOperativeReport;
    const NAME: &'static str = "post_operative";

    fn default_model(&self) -> &'static str {
        POST_OPERATIVE_MODEL
    }

    fn temperature(&self) -> f32 {
        0.3
    }

    fn instructions(&self) -> String {
        INSTRUCTIONS.to_string()
    }

    fn user_input(&self, source: &str) -> String {
        format!(
            "Analise este relatório cirúrgico:\n\nPaciente: {}\nProcedimento: {}\n\nRelatório:\n{}",
            self.patient_name, self.procedure, source
        )
    }
}
