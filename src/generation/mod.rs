//! Text Generation Module
//!
//! Request/response contract of the external text-generation service and
//! the client that talks to it.
//!
//! - [`types`]: Request, response and continuation token types
//! - [`client`]: The [`GenerationClient`] seam and its HTTP implementation

pub mod client;
pub mod types;

pub use client::{
    build_agent_request, generate_for_role, GenerationClient, OpenAiClient, DEFAULT_BASE_URL,
    DEFAULT_TIMEOUT,
};
pub use types::{
    ContinuationToken, GenerationInput, GenerationRequest, GenerationResponse, InputMessage,
    MessageRole, ResponseFormat, ToolSchema, Usage,
};
