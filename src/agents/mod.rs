//! Agent Role Module
//!
//! Static configuration of the agent roles that make up a workflow:
//! instructions, tools, model and temperature per role.

pub mod registry;

pub use registry::{
    AgentRegistry, AgentRoleDefinition, RoleProfile, ANS_SUBMISSION_AGENT, CLINICAL_ANALYST,
    DEFAULT_AGENT_MODEL, DEFAULT_TEMPERATURE, PATIENT_COMMUNICATION_AGENT, SCHEDULING_AGENT,
};
