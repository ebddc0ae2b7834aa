//! Surgical Request Intake
//!
//! Extracts patient and procedure fields from a free-text patient record
//! and builds a draft surgical request from them.

use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use crate::execution::AnalysisKind;

pub const INTAKE_MODEL: &str = "gpt-4o-mini";

pub const DEFAULT_PROCEDURE: &str = "Procedimento a definir";
pub const DEFAULT_INDICATION: &str = "Indicação clínica a ser avaliada";
pub const DEFAULT_URGENCY: &str = "eletiva";
pub const DRAFT_STATUS: &str = "rascunho";

const INSTRUCTIONS: &str = "Você é um assistente médico especializado em extrair informações de fichas de pacientes e criar solicitações cirúrgicas.

Analise o texto fornecido e extraia as seguintes informações em formato JSON:
{
  \"prontuario_id\": \"número do prontuário\",
  \"patient_name\": \"nome completo do paciente\",
  \"patient_email\": \"email do paciente se disponível\",
  \"patient_cpf\": \"CPF do paciente se disponível\",
  \"patient_phone\": \"telefone do paciente se disponível\",
  \"patient_health_plan\": \"convênio/plano de saúde\",
  \"procedure_name\": \"nome do procedimento cirúrgico indicado (se mencionado)\",
  \"clinical_indication\": \"indicação clínica para cirurgia baseada nas informações disponíveis\",
  \"urgency_level\": \"eletiva, urgente ou emergencia - baseado no contexto\",
  \"icd10_code\": \"código CID-10 apropriado se possível determinar\",
  \"medical_report\": \"resumo médico formatado das informações do paciente\"
}

Se alguma informação não estiver disponível, use null. Para procedure_name e clinical_indication, se não estiverem explícitos, sugira baseado no contexto médico.";

/// Accepts identifiers the model may write as bare numbers.
fn text_or_number<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<Value>::deserialize(deserializer)? {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(text)) => Ok(Some(text)),
        Some(Value::Number(number)) => Ok(Some(number.to_string())),
        Some(other) => Err(D::Error::custom(format!(
            "expected a string or number, found {}",
            other
        ))),
    }
}

/// Fields extracted from a patient record. Every field may be missing.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
#[serde(default)]
pub struct ExtractedRequest {
    #[serde(deserialize_with = "text_or_number")]
    pub prontuario_id: Option<String>,
    pub patient_name: Option<String>,
    pub patient_email: Option<String>,
    #[serde(deserialize_with = "text_or_number")]
    pub patient_cpf: Option<String>,
    #[serde(deserialize_with = "text_or_number")]
    pub patient_phone: Option<String>,
    pub patient_health_plan: Option<String>,
    pub procedure_name: Option<String>,
    pub clinical_indication: Option<String>,
    pub urgency_level: Option<String>,
    pub icd10_code: Option<String>,
    pub medical_report: Option<String>,
}

/// Draft surgical request ready for review.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct SurgicalRequestDraft {
    pub prontuario_id: Option<String>,
    pub patient_name: Option<String>,
    pub patient_email: Option<String>,
    pub patient_cpf: Option<String>,
    pub patient_phone: Option<String>,
    pub patient_health_plan: Option<String>,
    pub procedure_name: String,
    pub clinical_indication: String,
    pub urgency_level: String,
    pub icd10_code: String,
    pub medical_report: Option<String>,
    pub status: String,
}

/// Blank strings count as missing.
fn present(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

impl ExtractedRequest {
    /// True when no field carries a value.
    pub fn is_empty(&self) -> bool {
        [
            &self.prontuario_id,
            &self.patient_name,
            &self.patient_email,
            &self.patient_cpf,
            &self.patient_phone,
            &self.patient_health_plan,
            &self.procedure_name,
            &self.clinical_indication,
            &self.urgency_level,
            &self.icd10_code,
            &self.medical_report,
        ]
        .iter()
        .all(|field| field.as_deref().map_or(true, |v| v.trim().is_empty()))
    }

    /// Builds the draft, filling missing required fields with defaults.
    pub fn into_draft(self) -> SurgicalRequestDraft {
        SurgicalRequestDraft {
            prontuario_id: present(self.prontuario_id),
            patient_name: present(self.patient_name),
            patient_email: present(self.patient_email),
            patient_cpf: present(self.patient_cpf),
            patient_phone: present(self.patient_phone),
            patient_health_plan: present(self.patient_health_plan),
            procedure_name: present(self.procedure_name)
                .unwrap_or_else(|| DEFAULT_PROCEDURE.to_string()),
            clinical_indication: present(self.clinical_indication)
                .unwrap_or_else(|| DEFAULT_INDICATION.to_string()),
            urgency_level: present(self.urgency_level)
                .unwrap_or_else(|| DEFAULT_URGENCY.to_string()),
            icd10_code: present(self.icd10_code).unwrap_or_default(),
            medical_report: present(self.medical_report),
            status: DRAFT_STATUS.to_string(),
        }
    }
}

/// Intake extraction of one free-text patient record.
#[derive(Debug, Clone, Default)]
pub struct SurgicalRequestExtraction;

impl AnalysisKind for SurgicalRequestExtraction {
    type Output = ExtractedRequest;
    const NAME: &'static str = "intake";

    fn default_model(&self) -> &'static str {
        INTAKE_MODEL
    }

    fn temperature(&self) -> f32 {
        0.2
    }

    fn instructions(&self) -> String {
        INSTRUCTIONS.to_string()
    }

    fn user_input(&self, source: &str) -> String {
        source.to_string()
    }

    fn check_output(&self, output: &ExtractedRequest) -> Result<(), String> {
        if output.is_empty() {
            return Err("no patient or procedure fields were extracted".to_string());
        }
        Ok(())
    }
}
