use super::{endpoint, send_json};
use async_trait::async_trait;
use flowcall_core::collaborator::{
    GeneratedWorkflow, GenerationRequest, NodeCatalog, NodeSearch, NodeSummary, WorkflowGenerator,
};
use flowcall_core::error::{FlowcallError, Result};
use flowcall_core::workflow::WorkflowGraph;
use reqwest::Client;
use serde::{Deserialize, Serialize};

const GENERATE_PATH: &str = "/api/pipecat/generate-workflow";
const MODIFY_PATH: &str = "/api/pipecat/modify-workflow";
const SEARCH_PATH: &str = "/api/pipecat/search-nodes";

/// The backend's `{ success, data, error }` response wrapper.
#[derive(Debug, Deserialize)]
struct BackendEnvelope<T> {
    #[serde(default)]
    success: bool,
    data: Option<T>,
    #[serde(default)]
    error: Option<String>,
}

impl<T> BackendEnvelope<T> {
    fn into_data(self, fail: fn(String) -> FlowcallError) -> Result<T> {
        match (self.success, self.data) {
            (true, Some(data)) => Ok(data),
            (true, None) => Err(fail("The backend returned no data".to_string())),
            (false, _) => Err(fail(
                self.error
                    .unwrap_or_else(|| "Unknown backend error".to_string()),
            )),
        }
    }
}

#[derive(Debug, Serialize)]
struct ModifyRequest<'a> {
    workflow: &'a WorkflowGraph,
    instruction: &'a str,
}

#[derive(Debug, Deserialize)]
struct ModifiedWorkflow {
    workflow: WorkflowGraph,
}

#[derive(Debug, Serialize)]
struct SearchRequest<'a> {
    query: &'a str,
    limit: usize,
}

#[derive(Debug, Deserialize)]
struct SearchResults {
    #[serde(default)]
    nodes: Vec<NodeSummary>,
    #[serde(default)]
    count: Option<usize>,
}

/// Generator backed by the workflow-generation backend.
///
/// No request timeout is set here; callers at the transport boundary own
/// request deadlines.
#[derive(Clone)]
pub struct HttpWorkflowGenerator {
    client: Client,
    base_url: String,
}

impl HttpWorkflowGenerator {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self::with_client(Client::new(), base_url)
    }

    pub fn with_client(client: Client, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into(),
        }
    }
}

#[async_trait]
impl WorkflowGenerator for HttpWorkflowGenerator {
    async fn generate(&self, request: &GenerationRequest) -> Result<GeneratedWorkflow> {
        let url = endpoint(&self.base_url, GENERATE_PATH);
        tracing::debug!(%url, services = ?request.services, "Requesting workflow generation");

        let envelope: BackendEnvelope<GeneratedWorkflow> = send_json(
            self.client.post(&url).json(request),
            FlowcallError::Generation,
        )
        .await?;
        let generated = envelope.into_data(FlowcallError::Generation)?;
        tracing::info!(nodes = generated.workflow.nodes.len(), "Workflow generated");
        Ok(generated)
    }

    async fn modify(&self, workflow: &WorkflowGraph, instruction: &str) -> Result<WorkflowGraph> {
        let url = endpoint(&self.base_url, MODIFY_PATH);
        let body = ModifyRequest {
            workflow,
            instruction,
        };

        let envelope: BackendEnvelope<ModifiedWorkflow> =
            send_json(self.client.post(&url).json(&body), FlowcallError::Generation).await?;
        Ok(envelope.into_data(FlowcallError::Generation)?.workflow)
    }
}

/// Node catalog backed by the backend's search endpoint.
#[derive(Clone)]
pub struct HttpNodeCatalog {
    client: Client,
    base_url: String,
}

impl HttpNodeCatalog {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self::with_client(Client::new(), base_url)
    }

    pub fn with_client(client: Client, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into(),
        }
    }
}

#[async_trait]
impl NodeCatalog for HttpNodeCatalog {
    async fn search(&self, query: &str, limit: usize) -> Result<NodeSearch> {
        let url = endpoint(&self.base_url, SEARCH_PATH);
        let body = SearchRequest { query, limit };

        let envelope: BackendEnvelope<SearchResults> =
            send_json(self.client.post(&url).json(&body), FlowcallError::Catalog).await?;
        let results = envelope.into_data(FlowcallError::Catalog)?;
        let total = results.count.unwrap_or(results.nodes.len()).max(results.nodes.len());
        let mut nodes = results.nodes;
        nodes.truncate(limit);
        tracing::debug!(query, total, returned = nodes.len(), "Node search finished");
        Ok(NodeSearch { nodes, total })
    }
}
