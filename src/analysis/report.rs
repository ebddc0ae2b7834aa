//! Final Medical Report
//!
//! Assembles the formatted medical report with TUSS procedure codes,
//! ICD-10 code and OPME materials from the collected patient, procedure
//! and physician data.

use serde::{Deserialize, Serialize};

use crate::execution::AnalysisKind;

pub const MEDICAL_REPORT_MODEL: &str = "gpt-4.1";

const NOT_INFORMED: &str = "Não informado";

const INSTRUCTIONS: &str = "Você é um agente especializado em gerar relatórios médicos cirúrgicos formatados conforme padrões brasileiros.

FUNÇÃO: Você é a etapa final do processo e deve refinar e montar o que recebeu dos outros agentes, revisando e adicionando códigos como TUSS, OPME e CID-10.

FORMATO DE SAÍDA OBRIGATÓRIO:
- RELATÓRIO MÉDICO com cabeçalho do médico
- Dados do paciente (nome, convênio, carteirinha, CPF)
- Descrição clínica detalhada do caso
- CID-10 apropriado
- PROCEDIMENTOS com códigos TUSS corretos
- MATERIAL OPME (se aplicável)
- EMPRESAS fornecedoras
- Data e assinatura do médico

Retorne APENAS um JSON com a estrutura:
{
  \"medical_report\": \"texto completo do relatório formatado\",
  \"procedure_codes\": [\"código1\", \"código2\"],
  \"icd10_code\": \"M50.1\",
  \"opme_materials\": [{\"name\": \"material\", \"quantity\": 1}],
  \"opme_companies\": [\"empresa1\", \"empresa2\"],
  \"clinical_summary\": \"resumo clínico\"
}";

#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
pub struct PhysicianData {
    pub name: String,
    pub specialty: String,
    pub crm: String,
    #[serde(default)]
    pub clinic_address: Option<String>,
    #[serde(default)]
    pub clinic_phone: Option<String>,
    #[serde(default)]
    pub clinic_email: Option<String>,
}

/// Subject context of the final report.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
pub struct MedicalReportGeneration {
    pub patient_name: String,
    #[serde(default)]
    pub patient_cpf: Option<String>,
    #[serde(default)]
    pub patient_health_plan: Option<String>,
    #[serde(default)]
    pub patient_email: Option<String>,
    pub procedure_name: String,
    pub urgency_level: String,
    #[serde(default)]
    pub icd10_code: Option<String>,
    pub physician: PhysicianData,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct OpmeMaterial {
    pub name: String,
    pub quantity: u32,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct MedicalReport {
    pub medical_report: String,
    #[serde(default)]
    pub procedure_codes: Vec<String>,
    pub icd10_code: String,
    #[serde(default)]
    pub opme_materials: Vec<OpmeMaterial>,
    #[serde(default)]
    pub opme_companies: Vec<String>,
    pub clinical_summary: String,
}

fn or_not_informed(value: &Option<String>) -> &str {
    value.as_deref().unwrap_or(NOT_INFORMED)
}

impl AnalysisKind for MedicalReportGeneration {
    type Output = MedicalReport;
    const NAME: &'static str = "medical_report";

    fn default_model(&self) -> &'static str {
        MEDICAL_REPORT_MODEL
    }

    fn temperature(&self) -> f32 {
        0.2
    }

    fn instructions(&self) -> String {
        INSTRUCTIONS.to_string()
    }

    /// `source` is the clinical note.
    fn user_input(&self, source: &str) -> String {
        let doctor = &self.physician;
        format!(
            "Dados coletados:\n\n\
             DADOS DEMOGRÁFICOS E PESSOAIS:\n\
             - Paciente: {}\n\
             - CPF: {}\n\
             - Convênio: {}\n\
             - Email: {}\n\n\
             DADOS CLÍNICOS:\n{}\n\n\
             PROCEDIMENTO INDICADO:\n\
             - Procedimento: {}\n\
             - Urgência: {}\n\
             - CID-10: {}\n\n\
             DADOS DO MÉDICO:\n\
             - Dr. {}\n\
             - Especialidade: {}\n\
             - CRM: {}\n\
             - Endereço: {}\n\
             - Telefone: {}\n\
             - Email: {}",
            self.patient_name,
            or_not_informed(&self.patient_cpf),
            or_not_informed(&self.patient_health_plan),
            or_not_informed(&self.patient_email),
            source.trim(),
            self.procedure_name,
            self.urgency_level,
            self.icd10_code.as_deref().unwrap_or("A ser determinado"),
            doctor.name,
            doctor.specialty,
            doctor.crm,
            or_not_informed(&doctor.clinic_address),
            or_not_informed(&doctor.clinic_phone),
            or_not_informed(&doctor.clinic_email),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::execution::parse_output;

    fn context() -> MedicalReportGeneration {
        MedicalReportGeneration {
            patient_name: "Maria Santos".into(),
            patient_health_plan: Some("Unimed".into()),
            procedure_name: "Artrodese L4-L5".into(),
            urgency_level: "eletiva".into(),
            physician: PhysicianData {
                name: "Carlos Silva".into(),
                specialty: "Neurocirurgia".into(),
                crm: "123456-SP".into(),
                ..Default::default()
            },
            ..Default::default()
        }
    }

    #[test]
    fn test_user_input_fills_missing_fields() {
        let input = context().user_input("  Dor lombar há 2 anos.  ");
        assert!(input.contains("- Convênio: Unimed"));
        assert!(input.contains("- CPF: Não informado"));
        assert!(input.contains("- CID-10: A ser determinado"));
        assert!(input.contains("DADOS CLÍNICOS:\nDor lombar há 2 anos.\n"));
        assert!(input.contains("- Dr. Carlos Silva"));
    }

    #[test]
    fn test_parse_report() {
        let report: MedicalReport = parse_output(
            r#"{
                "medical_report": "RELATÓRIO MÉDICO...",
                "procedure_codes": ["3.07.15.05-1"],
                "icd10_code": "M48.0",
                "opme_materials": [{"name": "Parafuso pedicular", "quantity": 4}],
                "opme_companies": ["QUALIMEDIC"],
                "clinical_summary": "Estenose lombar"
            }"#,
        )
        .unwrap();

        assert_eq!(report.opme_materials[0].quantity, 4);
        assert_eq!(report.icd10_code, "M48.0");
    }

    #[test]
    fn test_missing_report_text_is_rejected() {
        let result = parse_output::<MedicalReport>(r#"{"icd10_code": "M48.0", "clinical_summary": "x"}"#);
        assert!(result.is_err());
    }
}
