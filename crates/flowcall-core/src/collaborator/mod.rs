//! Contracts for the external services the engine delegates to.
//!
//! The engine never talks to an LLM or to n8n itself. It calls these traits,
//! and `flowcall-infrastructure` provides HTTP-backed implementations.

mod catalog;
mod deployer;
mod generator;

pub use catalog::{NodeCatalog, NodeSearch, NodeSummary};
pub use deployer::DeploymentClient;
pub use generator::{CredentialRequirement, GeneratedWorkflow, GenerationRequest, WorkflowGenerator};
