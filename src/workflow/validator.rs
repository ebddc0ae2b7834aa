//! Template Validation
//!
//! Checks a workflow template before any execution is created from it:
//! - The step list is not empty
//! - Every step names a role
//! - No role appears twice (each role owns one scratch slot)
//!
//! Roles without a registered profile are accepted with a warning; they
//! resolve to the registry fallback.

use std::collections::HashSet;

use log::{debug, info, warn};

use crate::agents::AgentRegistry;
use crate::error::WorkflowError;

use super::template::WorkflowTemplate;

/// Validation error types for user-friendly error messages.
#[derive(Debug, Clone, PartialEq)]
pub enum ValidationError {
    EmptyTemplate,
    EmptyTemplateName,
    EmptyRole(usize),
    DuplicateRole(String),
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EmptyTemplate => write!(f, "Template has no steps"),
            Self::EmptyTemplateName => write!(f, "Template has empty or whitespace-only name"),
            Self::EmptyRole(index) => write!(f, "Step {} has no agent role specified", index + 1),
            Self::DuplicateRole(role) => {
                write!(f, "Role '{}' appears more than once", role)
            }
        }
    }
}

/// Validates a template, filling in missing step names with the role.
pub fn validate_template(
    template: &mut WorkflowTemplate,
    registry: &AgentRegistry,
) -> Result<(), WorkflowError> {
    info!(
        "Validating template '{}' with {} steps",
        template.name,
        template.steps.len()
    );

    let mut errors = Vec::new();

    if template.name.trim().is_empty() {
        errors.push(ValidationError::EmptyTemplateName);
    }

    if template.steps.is_empty() {
        errors.push(ValidationError::EmptyTemplate);
    }

    let mut seen_roles: HashSet<String> = HashSet::new();
    for (index, step) in template.steps.iter_mut().enumerate() {
        step.role = step.role.trim().to_string();

        if step.role.is_empty() {
            errors.push(ValidationError::EmptyRole(index));
            continue;
        }

        if !seen_roles.insert(step.role.clone()) {
            errors.push(ValidationError::DuplicateRole(step.role.clone()));
        }

        if step.name.trim().is_empty() {
            debug!("Step {} has no name, using role '{}'", index + 1, step.role);
            step.name = step.role.clone();
        }

        if !registry.contains(&step.role) {
            warn!(
                "Role '{}' is not registered; it will run with the base instructions only",
                step.role
            );
        }
    }

    if !errors.is_empty() {
        let messages: Vec<String> = errors.iter().map(|e| e.to_string()).collect();
        return Err(WorkflowError::InvalidTemplate(messages.join("\n")));
    }

    info!("Template '{}' validated", template.name);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workflow::model::DocumentFormat;
    use crate::workflow::template::TemplateStep;

    fn registry() -> AgentRegistry {
        AgentRegistry::builtin()
    }

    #[test]
    fn test_builtin_template_is_valid() {
        let mut template = WorkflowTemplate::surgical_request();
        assert!(validate_template(&mut template, &registry()).is_ok());
    }

    #[test]
    fn test_empty_template() {
        let mut template = WorkflowTemplate::new("empty", DocumentFormat::MedicalReport);
        let err = validate_template(&mut template, &registry()).unwrap_err();
        assert!(err.to_string().contains("Template has no steps"));
    }

    #[test]
    fn test_empty_role() {
        let mut template = WorkflowTemplate::new("t", DocumentFormat::MedicalReport)
            .with_step("ClinicalAnalyst", "A")
            .with_step("   ", "B");

        let err = validate_template(&mut template, &registry()).unwrap_err();
        assert!(err.to_string().contains("Step 2 has no agent role"));
    }

    #[test]
    fn test_duplicate_role() {
        let mut template = WorkflowTemplate::new("t", DocumentFormat::MedicalReport)
            .with_step("ClinicalAnalyst", "A")
            .with_step("ClinicalAnalyst", "B");

        let err = validate_template(&mut template, &registry()).unwrap_err();
        assert!(err.to_string().contains("'ClinicalAnalyst' appears more than once"));
    }

    #[test]
    fn test_multiple_errors_reported_together() {
        let mut template = WorkflowTemplate {
            name: " ".to_string(),
            format: DocumentFormat::MedicalReport,
            steps: vec![TemplateStep::new("", "x")],
        };

        let err = validate_template(&mut template, &registry()).unwrap_err().to_string();
        assert!(err.contains("empty or whitespace-only name"));
        assert!(err.contains("Step 1 has no agent role"));
    }

    #[test]
    fn test_unknown_role_is_accepted() {
        let mut template = WorkflowTemplate::new("t", DocumentFormat::MedicalReport)
            .with_step("BillingAgent", "Faturamento");
        assert!(validate_template(&mut template, &registry()).is_ok());
    }

    #[test]
    fn test_missing_name_defaults_to_role() {
        let mut template = WorkflowTemplate {
            name: "t".to_string(),
            format: DocumentFormat::MedicalReport,
            steps: vec![TemplateStep {
                role: " SchedulingAgent ".to_string(),
                name: String::new(),
            }],
        };

        validate_template(&mut template, &registry()).unwrap();
        assert_eq!(template.steps[0].role, "SchedulingAgent");
        assert_eq!(template.steps[0].name, "SchedulingAgent");
    }

    #[test]
    fn test_validation_error_display() {
        assert_eq!(ValidationError::EmptyRole(0).to_string(), "Step 1 has no agent role specified");
        assert_eq!(
            ValidationError::DuplicateRole("X".into()).to_string(),
            "Role 'X' appears more than once"
        );
    }
}
