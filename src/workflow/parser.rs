//! Template and Subject Loading
//!
//! Loads workflow templates and patient data from YAML files. JSON files
//! are accepted too, since JSON is a subset of YAML.

use std::fs;

use log::{debug, info};
use serde::de::DeserializeOwned;

use crate::agents::AgentRegistry;
use crate::error::WorkflowError;

use super::model::PatientData;
use super::template::WorkflowTemplate;
use super::validator::validate_template;

/// Reads and deserializes a YAML (or JSON) file.
fn read_yaml<T: DeserializeOwned>(path: &str) -> Result<T, WorkflowError> {
    let content = fs::read_to_string(path).map_err(|source| WorkflowError::Io {
        path: path.to_string(),
        source,
    })?;

    debug!("Loaded {} ({} bytes)", path, content.len());

    serde_yaml::from_str(&content).map_err(|source| WorkflowError::Yaml {
        path: path.to_string(),
        source,
    })
}

/// Loads and validates a workflow template.
///
/// # Example
///
/// ```rust,no_run
/// use surgiflow::agents::AgentRegistry;
/// use surgiflow::workflow::load_template;
///
/// fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let template = load_template("templates/ans.yaml", &AgentRegistry::builtin())?;
///     println!("Loaded {} steps", template.steps.len());
///     Ok(())
/// }
/// ```
pub fn load_template(path: &str, registry: &AgentRegistry) -> Result<WorkflowTemplate, WorkflowError> {
    info!("Loading workflow template from: {}", path);

    let mut template: WorkflowTemplate = read_yaml(path)?;
    validate_template(&mut template, registry)?;

    info!(
        "Template '{}' loaded: {} steps ({})",
        template.name,
        template.steps.len(),
        template.roles().join(" -> ")
    );
    Ok(template)
}

/// Loads patient and procedure data.
pub fn load_patient(path: &str) -> Result<PatientData, WorkflowError> {
    info!("Loading patient data from: {}", path);
    read_yaml(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn write_temp(content: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_load_template_yaml() {
        let file = write_temp(
            r#"
name: ans_only
format: ans_submission
steps:
  - role: ClinicalAnalyst
    name: Análise Clínica
  - role: ANSSubmissionAgent
"#,
        );

        let template =
            load_template(file.path().to_str().unwrap(), &AgentRegistry::builtin()).unwrap();

        assert_eq!(template.name, "ans_only");
        assert_eq!(template.roles(), vec!["ClinicalAnalyst", "ANSSubmissionAgent"]);
        assert_eq!(template.steps[1].name, "ANSSubmissionAgent");
    }

    #[test]
    fn test_load_template_invalid() {
        let file = write_temp("name: broken\nsteps: []\n");
        let result = load_template(file.path().to_str().unwrap(), &AgentRegistry::builtin());
        assert!(matches!(result, Err(WorkflowError::InvalidTemplate(_))));
    }

    #[test]
    fn test_load_template_malformed_yaml() {
        let file = write_temp("name: [unterminated");
        let result = load_template(file.path().to_str().unwrap(), &AgentRegistry::builtin());
        assert!(matches!(result, Err(WorkflowError::Yaml { .. })));
    }

    #[test]
    fn test_load_template_missing_file() {
        let result = load_template("/nonexistent/template.yaml", &AgentRegistry::builtin());
        assert!(matches!(result, Err(WorkflowError::Io { .. })));
    }

    #[test]
    fn test_load_patient_json() {
        let file = write_temp(
            r#"{
  "name": "Maria Santos",
  "procedure": "Artrodese L4-L5",
  "clinicalNotes": "Dor lombar crônica",
  "demographics": {"age": 65, "insurance": "Unimed"}
}"#,
        );

        let patient = load_patient(file.path().to_str().unwrap()).unwrap();
        assert_eq!(patient.name, "Maria Santos");
        assert_eq!(patient.demographics["insurance"], "Unimed");
    }

    #[test]
    fn test_load_patient_yaml() {
        let file = write_temp("name: João\nprocedure: Artroscopia\n");
        let patient = load_patient(file.path().to_str().unwrap()).unwrap();
        assert_eq!(patient.procedure, "Artroscopia");
        assert!(patient.clinical_notes.is_empty());
    }
}
