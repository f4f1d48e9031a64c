//! Result payloads, serialized into `FunctionCallResponse::result`.

use crate::collaborator::CredentialRequirement;
use crate::session::{ConversationContext, SessionStatus, Specialist};
use crate::workflow::WorkflowGraph;
use serde::Serialize;

/// Reported by `getWorkflowStatus` when the caller has no session.
pub const NO_SESSION: &str = "no_session";

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateWorkflowResult {
    pub workflow_generated: bool,
    pub session_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub workflow_id: Option<String>,
    pub node_count: usize,
    pub nodes: Vec<String>,
    pub credential_requirements: Vec<CredentialRequirement>,
    pub fixes: Vec<String>,
    pub warnings: Vec<String>,
    pub message: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateWorkflowResult {
    pub workflow_updated: bool,
    pub node_count: usize,
    pub nodes: Vec<String>,
    pub fixes: Vec<String>,
    pub warnings: Vec<String>,
    pub message: String,
}

#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeployWorkflowResult {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub needs_confirmation: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ready_to_deploy: Option<bool>,
    pub deployed: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub workflow_id: Option<String>,
    pub message: String,
}

impl DeployWorkflowResult {
    pub fn needs_confirmation(node_count: usize) -> Self {
        Self {
            needs_confirmation: Some(true),
            message: format!(
                "Your workflow has {} steps. Should I go ahead and deploy it?",
                node_count
            ),
            ..Default::default()
        }
    }

    pub fn ready_to_deploy() -> Self {
        Self {
            ready_to_deploy: Some(true),
            message: "Your workflow is ready. You can run it from your dashboard.".to_string(),
            ..Default::default()
        }
    }

    /// A repeated confirmation; nothing is sent to the deployer again.
    pub fn already_deployed(workflow_id: Option<String>) -> Self {
        Self {
            ready_to_deploy: workflow_id.is_none().then_some(true),
            deployed: workflow_id.is_some(),
            workflow_id,
            message: "This workflow has already been deployed.".to_string(),
            ..Default::default()
        }
    }

    pub fn deployed(workflow_id: String) -> Self {
        Self {
            deployed: true,
            workflow_id: Some(workflow_id),
            message: "Done! Your workflow is deployed.".to_string(),
            ..Default::default()
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkflowStatusResult {
    /// A [`SessionStatus`] wire name, or [`NO_SESSION`]
    pub status: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current_workflow: Option<WorkflowGraph>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub conversation_context: Option<ConversationContext>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deployed_workflow_id: Option<String>,
}

impl WorkflowStatusResult {
    pub fn no_session() -> Self {
        Self {
            status: NO_SESSION.to_string(),
            message: "We haven't started building a workflow yet. What would you like to automate?"
                .to_string(),
            session_id: None,
            current_workflow: None,
            conversation_context: None,
            deployed_workflow_id: None,
        }
    }

    pub fn for_status(status: SessionStatus) -> Self {
        Self {
            status: status.to_string(),
            message: status.caller_message().to_string(),
            ..Self::no_session()
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchNodesResult {
    pub found: bool,
    pub count: usize,
    pub nodes: Vec<String>,
    pub message: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RouteToAgentResult {
    pub routed: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub agent: Option<Specialist>,
    pub message: String,
}
