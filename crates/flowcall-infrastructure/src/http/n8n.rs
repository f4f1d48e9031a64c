use super::{endpoint, send_json};
use async_trait::async_trait;
use flowcall_core::collaborator::DeploymentClient;
use flowcall_core::config::DeployerConfig;
use flowcall_core::error::{FlowcallError, Result};
use flowcall_core::workflow::WorkflowGraph;
use reqwest::Client;
use serde::Deserialize;
use serde_json::{Map, Value, json};

const WORKFLOWS_PATH: &str = "/api/v1/workflows";
const API_KEY_HEADER: &str = "X-N8N-API-KEY";
const DEFAULT_WORKFLOW_NAME: &str = "Voice-built workflow";

#[derive(Debug, Deserialize)]
struct CreatedWorkflow {
    id: Value,
}

/// Deploys workflows through the n8n public API.
#[derive(Clone)]
pub struct N8nDeploymentClient {
    client: Client,
    base_url: String,
    api_key: String,
}

impl N8nDeploymentClient {
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.into(),
            api_key: api_key.into(),
        }
    }

    pub fn from_config(config: &DeployerConfig) -> Self {
        Self::new(config.base_url.clone(), config.api_key.clone())
    }

    /// The create-workflow body.
    ///
    /// The API rejects read-only fields such as `active`, so only the
    /// writable ones are sent.
    pub fn payload(workflow: &WorkflowGraph) -> Result<Value> {
        let graph = serde_json::to_value(workflow)?;
        Ok(json!({
            "name": workflow.name().unwrap_or(DEFAULT_WORKFLOW_NAME),
            "nodes": graph.get("nodes").cloned().unwrap_or_else(|| json!([])),
            "connections": graph
                .get("connections")
                .cloned()
                .unwrap_or_else(|| Value::Object(Map::new())),
            "settings": graph
                .get("settings")
                .cloned()
                .unwrap_or_else(|| Value::Object(Map::new())),
        }))
    }
}

#[async_trait]
impl DeploymentClient for N8nDeploymentClient {
    async fn create_workflow(&self, workflow: &WorkflowGraph, user_id: &str) -> Result<String> {
        let url = endpoint(&self.base_url, WORKFLOWS_PATH);
        let body = Self::payload(workflow)?;

        let created: CreatedWorkflow = send_json(
            self.client
                .post(&url)
                .header(API_KEY_HEADER, &self.api_key)
                .json(&body),
            FlowcallError::Deployment,
        )
        .await?;

        let id = match created.id {
            Value::String(id) => id,
            Value::Number(id) => id.to_string(),
            other => {
                return Err(FlowcallError::deployment(format!(
                    "n8n returned an unusable workflow id: {}",
                    other
                )));
            }
        };
        tracing::info!(workflow_id = %id, user_id, "Created n8n workflow");
        Ok(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use flowcall_core::workflow::{WorkflowNode, lint};

    #[test]
    fn test_payload_drops_read_only_fields() {
        let graph = WorkflowGraph {
            nodes: vec![WorkflowNode::new("Webhook", "n8n-nodes-base.webhook")],
            ..Default::default()
        };
        let payload = N8nDeploymentClient::payload(&lint(graph).graph).unwrap();

        assert!(payload.get("active").is_none());
        assert_eq!(payload["name"], DEFAULT_WORKFLOW_NAME);
        assert_eq!(payload["settings"]["executionOrder"], "v1");
        assert_eq!(payload["connections"], json!({}));
        assert_eq!(payload["nodes"][0]["name"], "Webhook");
    }

    #[test]
    fn test_payload_keeps_generator_name() {
        let mut graph = WorkflowGraph::default();
        graph
            .extra
            .insert("name".to_string(), json!("Lead alerts"));
        let payload = N8nDeploymentClient::payload(&graph).unwrap();
        assert_eq!(payload["name"], "Lead alerts");
    }
}
