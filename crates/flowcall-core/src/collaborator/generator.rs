use crate::error::Result;
use crate::session::ConversationContext;
use crate::workflow::WorkflowGraph;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// What the generator is asked to build.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GenerationRequest {
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trigger: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub services: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schedule: Option<String>,
}

impl GenerationRequest {
    /// Builds a request from a description plus the hints gathered so far.
    pub fn from_context(description: impl Into<String>, context: &ConversationContext) -> Self {
        Self {
            description: description.into(),
            trigger: context.trigger.clone(),
            services: context.services.iter().cloned().collect(),
            schedule: context.schedule.clone(),
        }
    }
}

/// A service the user must connect before the workflow can run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CredentialRequirement {
    pub service: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl CredentialRequirement {
    pub fn new(service: impl Into<String>) -> Self {
        Self {
            service: service.into(),
            extra: Map::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeneratedWorkflow {
    pub workflow: WorkflowGraph,
    #[serde(default)]
    pub credential_requirements: Vec<CredentialRequirement>,
}

/// Turns free text into workflow graphs.
#[async_trait]
pub trait WorkflowGenerator: Send + Sync {
    async fn generate(&self, request: &GenerationRequest) -> Result<GeneratedWorkflow>;

    /// Applies a free-text modification to an existing graph.
    async fn modify(&self, workflow: &WorkflowGraph, instruction: &str) -> Result<WorkflowGraph>;
}
