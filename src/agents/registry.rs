//! Agent Instruction Registry
//!
//! Maps an agent role name to its system instructions, callable tools,
//! model and sampling temperature. Instructions are a fixed preamble
//! followed by role-specific clauses; every role also receives the common
//! tool baseline.
//!
//! # Example YAML Format
//!
//! ```yaml
//! roles:
//!   - role: SchedulingAgent
//!     description: Coordena agendamento de salas
//!     clauses: |
//!       Considere disponibilidade de sala e equipe.
//!     temperature: 0.2
//!     tools:
//!       - name: check_availability
//!         description: Verifica disponibilidade de sala cirúrgica
//!         parameters: { type: object, properties: {} }
//! ```

use std::collections::HashMap;
use std::fs;

use log::{debug, info};
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::error::WorkflowError;
use crate::generation::ToolSchema;

/// Model used by agent roles that don't specify one.
pub const DEFAULT_AGENT_MODEL: &str = "gpt-4.1";

/// Temperature used by agent roles that don't specify one.
pub const DEFAULT_TEMPERATURE: f32 = 0.3;

pub const CLINICAL_ANALYST: &str = "ClinicalAnalyst";
pub const ANS_SUBMISSION_AGENT: &str = "ANSSubmissionAgent";
pub const SCHEDULING_AGENT: &str = "SchedulingAgent";
pub const PATIENT_COMMUNICATION_AGENT: &str = "PatientCommunicationAgent";

/// Configuration of one role as registered (clauses only, no preamble).
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct RoleProfile {
    pub role: String,

    #[serde(default)]
    pub description: String,

    /// Role-specific instruction clauses appended to the preamble
    #[serde(default)]
    pub clauses: String,

    /// Role-specific tools (the common baseline is added on resolve)
    #[serde(default)]
    pub tools: Vec<ToolSchema>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
}

impl RoleProfile {
    pub fn new(role: impl Into<String>, clauses: impl Into<String>) -> Self {
        Self {
            role: role.into(),
            description: String::new(),
            clauses: clauses.into(),
            tools: Vec::new(),
            model: None,
            temperature: None,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_tool(mut self, tool: ToolSchema) -> Self {
        self.tools.push(tool);
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }
}

/// Fully resolved role: what a generation call for this role is built from.
#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct AgentRoleDefinition {
    pub role: String,
    pub description: String,
    pub instructions: String,
    pub tools: Vec<ToolSchema>,
    pub model: String,
    pub temperature: f32,
}

#[derive(Deserialize)]
struct RoleFile {
    #[serde(default)]
    roles: Vec<RoleProfile>,
}

/// Registry of agent roles.
///
/// Lookups are pure: unknown roles resolve to the preamble plus the
/// common tools, with the default model and temperature.
#[derive(Debug, Clone)]
pub struct AgentRegistry {
    profiles: HashMap<String, RoleProfile>,
    common_tools: Vec<ToolSchema>,
    default_model: String,
    default_temperature: f32,
}

impl AgentRegistry {
    /// Creates a registry with no roles, only the common tool baseline.
    pub fn empty() -> Self {
        Self {
            profiles: HashMap::new(),
            common_tools: vec![calculate_timeline_tool()],
            default_model: DEFAULT_AGENT_MODEL.to_string(),
            default_temperature: DEFAULT_TEMPERATURE,
        }
    }

    /// Creates a registry with the four built-in surgical workflow roles.
    pub fn builtin() -> Self {
        let mut registry = Self::empty();
        for profile in builtin_profiles() {
            registry.register(profile);
        }
        registry
    }

    /// Registers a role, replacing any previous profile with the same name.
    pub fn register(&mut self, profile: RoleProfile) {
        if self.profiles.contains_key(&profile.role) {
            debug!("Replacing agent role '{}'", profile.role);
        }
        self.profiles.insert(profile.role.clone(), profile);
    }

    /// Sets the model used by roles that don't pin one.
    pub fn set_default_model(&mut self, model: impl Into<String>) {
        self.default_model = model.into();
    }

    /// Returns true if the role has a registered profile.
    pub fn contains(&self, role: &str) -> bool {
        self.profiles.contains_key(role)
    }

    /// Returns registered role names in sorted order.
    pub fn roles(&self) -> Vec<String> {
        let mut roles: Vec<String> = self.profiles.keys().cloned().collect();
        roles.sort();
        roles
    }

    /// Resolves a role name into its full definition.
    pub fn resolve(&self, role: &str) -> AgentRoleDefinition {
        let profile = self.profiles.get(role);

        let mut instructions = preamble(role);
        let mut tools = self.common_tools.clone();

        if let Some(profile) = profile {
            if !profile.clauses.trim().is_empty() {
                instructions.push_str(profile.clauses.trim());
                instructions.push('\n');
            }
            tools.extend(profile.tools.iter().cloned());
        }

        AgentRoleDefinition {
            role: role.to_string(),
            description: profile.map(|p| p.description.clone()).unwrap_or_default(),
            instructions,
            tools,
            model: profile
                .and_then(|p| p.model.clone())
                .unwrap_or_else(|| self.default_model.clone()),
            temperature: profile
                .and_then(|p| p.temperature)
                .unwrap_or(self.default_temperature),
        }
    }

    /// System instructions for a role.
    pub fn instructions(&self, role: &str) -> String {
        self.resolve(role).instructions
    }

    /// Ordered tool schemas for a role.
    pub fn tools(&self, role: &str) -> Vec<ToolSchema> {
        self.resolve(role).tools
    }

    /// Parses role profiles from YAML text.
    pub fn parse_profiles(yaml: &str, origin: &str) -> Result<Vec<RoleProfile>, WorkflowError> {
        let file: RoleFile = serde_yaml::from_str(yaml).map_err(|source| WorkflowError::Yaml {
            path: origin.to_string(),
            source,
        })?;
        Ok(file.roles)
    }

    /// Loads role profiles from a YAML file and registers them.
    ///
    /// Same-named roles replace the built-ins.
    pub fn extend_from_file(&mut self, path: &str) -> Result<usize, WorkflowError> {
        let content = fs::read_to_string(path).map_err(|source| WorkflowError::Io {
            path: path.to_string(),
            source,
        })?;

        let profiles = Self::parse_profiles(&content, path)?;
        let count = profiles.len();
        for profile in profiles {
            self.register(profile);
        }

        info!("Loaded {} agent roles from {}", count, path);
        Ok(count)
    }
}

impl Default for AgentRegistry {
    fn default() -> Self {
        Self::builtin()
    }
}

/// Fixed preamble shared by every role.
fn preamble(role: &str) -> String {
    format!(
        "Você é {role} no sistema de automação cirúrgica.\n\
         Leia input.patientData e input.template.\n\
         Grave APENAS em input.scratch.{role}.\n\
         Não altere dados de outros agentes.\n\
         Retorne o JSON COMPLETO de input.\n\
         Responda sempre em português brasileiro.\n"
    )
}

fn calculate_timeline_tool() -> ToolSchema {
    ToolSchema::function(
        "calculate_timeline",
        "Calcula timeline de procedimento cirúrgico",
        json!({
            "type": "object",
            "properties": {
                "procedure_type": { "type": "string" },
                "urgency_level": { "type": "string", "enum": ["baixa", "media", "alta", "emergencia"] },
                "estimated_duration": { "type": "number" }
            },
            "required": ["procedure_type", "urgency_level"],
            "additionalProperties": false
        }),
    )
}

fn builtin_profiles() -> Vec<RoleProfile> {
    vec![
        RoleProfile::new(
            CLINICAL_ANALYST,
            "Analise dados clínicos e gere relatório médico estruturado.\n\
             Identifique indicações cirúrgicas, contraindicações e riscos.\n\
             Formate conforme padrões ANS/CFM.",
        )
        .with_description("Analisa dados clínicos e gera relatórios médicos estruturados")
        .with_temperature(0.3)
        .with_tool(ToolSchema::function(
            "validate_clinical_criteria",
            "Valida critérios clínicos para indicação cirúrgica",
            json!({
                "type": "object",
                "properties": {
                    "symptoms": { "type": "array", "items": { "type": "string" } },
                    "exam_results": { "type": "object" },
                    "contraindications": { "type": "array", "items": { "type": "string" } }
                },
                "required": ["symptoms"],
                "additionalProperties": false
            }),
        )),
        RoleProfile::new(
            ANS_SUBMISSION_AGENT,
            "Prepare documentação para submissão ANS.\n\
             Valide campos obrigatórios, códigos TUSS, justificativas técnicas.\n\
             Gere formulários preenchidos e timeline de aprovação.",
        )
        .with_description("Prepara documentação para submissão ANS com códigos TUSS")
        .with_temperature(0.1)
        .with_tool(ToolSchema::function(
            "generate_ans_code",
            "Gera código TUSS apropriado para procedimento",
            json!({
                "type": "object",
                "properties": {
                    "procedure_name": { "type": "string" },
                    "body_region": { "type": "string" },
                    "complexity": { "type": "string", "enum": ["baixa", "media", "alta"] }
                },
                "required": ["procedure_name"],
                "additionalProperties": false
            }),
        )),
        RoleProfile::new(
            SCHEDULING_AGENT,
            "Coordene agendamento de sala cirúrgica e recursos.\n\
             Considere disponibilidade, urgência, duração estimada.\n\
             Gere eventos de calendário e notificações.",
        )
        .with_description("Coordena agendamento de salas e recursos cirúrgicos")
        .with_temperature(0.2)
        .with_tool(ToolSchema::function(
            "check_availability",
            "Verifica disponibilidade de sala cirúrgica e equipe",
            json!({
                "type": "object",
                "properties": {
                    "date": { "type": "string" },
                    "duration_minutes": { "type": "number" },
                    "room_type": { "type": "string" }
                },
                "required": ["date"],
                "additionalProperties": false
            }),
        )),
        RoleProfile::new(
            PATIENT_COMMUNICATION_AGENT,
            "Gere comunicações personalizadas para pacientes.\n\
             Inclua orientações pré/pós-operatórias, consentimentos, lembretes.\n\
             Adapte linguagem para nível de compreensão do paciente.",
        )
        .with_description("Gera comunicações personalizadas para pacientes")
        .with_temperature(0.7)
        .with_tool(ToolSchema::function(
            "generate_message",
            "Gera mensagem personalizada para o paciente",
            json!({
                "type": "object",
                "properties": {
                    "channel": { "type": "string", "enum": ["email", "sms", "whatsapp"] },
                    "purpose": { "type": "string" },
                    "reading_level": { "type": "string" }
                },
                "required": ["channel", "purpose"],
                "additionalProperties": false
            }),
        ))
        .with_tool(ToolSchema::function(
            "format_instructions",
            "Formata orientações pré e pós-operatórias",
            json!({
                "type": "object",
                "properties": {
                    "phase": { "type": "string", "enum": ["pre_operatorio", "pos_operatorio"] },
                    "items": { "type": "array", "items": { "type": "string" } }
                },
                "required": ["phase", "items"],
                "additionalProperties": false
            }),
        )),
    ]
}
