//! Function dispatcher.
//!
//! Routes a named function call from the voice/chat transport to its handler,
//! drives the session state machine, and delegates to the external
//! collaborators. Every outcome, including handler failures, comes back as a
//! [`FunctionCallResponse`]; nothing here panics past the transport boundary.

use crate::session::SessionLocks;
use flowcall_core::collaborator::{
    DeploymentClient, GenerationRequest, NodeCatalog, WorkflowGenerator,
};
use flowcall_core::config::DEFAULT_SEARCH_LIMIT;
use flowcall_core::error::{FlowcallError, Result};
use flowcall_core::function::params::{
    self, DeployWorkflowParams, GenerateWorkflowParams, RouteToAgentParams, SearchNodesParams,
    UpdateWorkflowParams,
};
use flowcall_core::function::results::{
    DeployWorkflowResult, GenerateWorkflowResult, RouteToAgentResult, SearchNodesResult,
    UpdateWorkflowResult, WorkflowStatusResult,
};
use flowcall_core::function::{FunctionCallResponse, FunctionName};
use flowcall_core::session::{Session, SessionPatch, SessionStatus, SessionStore, Specialist};
use flowcall_core::workflow::lint;
use serde_json::Value;
use std::str::FromStr;
use std::sync::Arc;

/// Returned when the transport supplies no user id.
pub const AUTHENTICATION_REQUIRED: &str = "authentication required";

const GENERATE_FIRST: &str =
    "I don't have a workflow for this conversation yet. Let's create one first.";
const NOT_YOUR_SESSION: &str = "This workflow belongs to a different account.";
const SEARCH_UNAVAILABLE: &str = "Node search is not available right now.";

/// Dispatches function calls against a session store and the collaborators.
///
/// The deployment client and node catalog are optional: running without them
/// is a valid configuration, handled distinctly from a collaborator failure.
pub struct FunctionDispatcher {
    store: Arc<dyn SessionStore>,
    locks: Arc<SessionLocks>,
    generator: Arc<dyn WorkflowGenerator>,
    deployer: Option<Arc<dyn DeploymentClient>>,
    catalog: Option<Arc<dyn NodeCatalog>>,
    search_limit: usize,
}

impl FunctionDispatcher {
    pub fn new(store: Arc<dyn SessionStore>, generator: Arc<dyn WorkflowGenerator>) -> Self {
        Self {
            store,
            locks: Arc::new(SessionLocks::new()),
            generator,
            deployer: None,
            catalog: None,
            search_limit: DEFAULT_SEARCH_LIMIT,
        }
    }

    pub fn with_deployer(mut self, deployer: Arc<dyn DeploymentClient>) -> Self {
        self.deployer = Some(deployer);
        self
    }

    pub fn with_catalog(mut self, catalog: Arc<dyn NodeCatalog>) -> Self {
        self.catalog = Some(catalog);
        self
    }

    /// Shares an existing lock table, e.g. with a [`crate::SessionSweeper`].
    pub fn with_locks(mut self, locks: Arc<SessionLocks>) -> Self {
        self.locks = locks;
        self
    }

    pub fn with_search_limit(mut self, limit: usize) -> Self {
        self.search_limit = limit.max(1);
        self
    }

    pub fn store(&self) -> &Arc<dyn SessionStore> {
        &self.store
    }

    pub fn locks(&self) -> Arc<SessionLocks> {
        Arc::clone(&self.locks)
    }

    /// Handles one function call.
    ///
    /// # Arguments
    ///
    /// * `function_name` - Wire name, camelCase or snake_case
    /// * `parameters` - Function arguments; `null` is treated as `{}`
    /// * `caller_key` - Session id or call id the call belongs to
    /// * `user_id` - Authenticated user, as supplied by the transport
    pub async fn handle(
        &self,
        function_name: &str,
        parameters: &Value,
        caller_key: &str,
        user_id: Option<&str>,
    ) -> FunctionCallResponse {
        let Some(user_id) = user_id.map(str::trim).filter(|u| !u.is_empty()) else {
            tracing::warn!(function_name, caller_key, "Rejected unauthenticated function call");
            return FunctionCallResponse::failure(AUTHENTICATION_REQUIRED);
        };

        let Ok(function) = FunctionName::from_str(function_name) else {
            tracing::warn!(function_name, caller_key, "Unknown function called");
            return FunctionCallResponse::failure(format!("Unknown function: {}", function_name));
        };

        tracing::debug!(%function, caller_key, user_id, "Dispatching function call");
        match self.dispatch(function, parameters, caller_key, user_id).await {
            Ok(result) => FunctionCallResponse::ok(result),
            Err(e) => {
                if e.is_collaborator_failure() {
                    tracing::error!(%function, caller_key, error = %e, "Function call failed");
                } else {
                    tracing::warn!(%function, caller_key, error = %e, "Function call rejected");
                }
                FunctionCallResponse::failure(e.to_string())
            }
        }
    }

    async fn dispatch(
        &self,
        function: FunctionName,
        parameters: &Value,
        caller_key: &str,
        user_id: &str,
    ) -> Result<Value> {
        let result = match function {
            FunctionName::GenerateWorkflow => {
                let params = params::parse(function, parameters)?;
                serde_json::to_value(self.generate_workflow(params, caller_key, user_id).await?)?
            }
            FunctionName::UpdateWorkflow => {
                let params = params::parse(function, parameters)?;
                serde_json::to_value(self.update_workflow(params, caller_key, user_id).await?)?
            }
            FunctionName::DeployWorkflow => {
                let params = params::parse(function, parameters)?;
                serde_json::to_value(self.deploy_workflow(params, caller_key, user_id).await?)?
            }
            FunctionName::GetWorkflowStatus => {
                serde_json::to_value(self.workflow_status(caller_key, user_id).await?)?
            }
            FunctionName::SearchNodes => {
                let params = params::parse(function, parameters)?;
                serde_json::to_value(self.search_nodes(params).await?)?
            }
            FunctionName::RouteToAgent => {
                let params = params::parse(function, parameters)?;
                serde_json::to_value(self.route_to_agent(params, caller_key, user_id).await?)?
            }
        };
        Ok(result)
    }

    // ============================================================================
    // Handlers
    // ============================================================================

    async fn generate_workflow(
        &self,
        params: GenerateWorkflowParams,
        caller_key: &str,
        user_id: &str,
    ) -> Result<GenerateWorkflowResult> {
        let (session, created) = self.store.get_or_create(caller_key, user_id).await;
        ensure_owner(&session, user_id)?;
        let session_id = session.session_id;
        let _guard = self.locks.acquire(&session_id).await;

        if !params.is_empty() && !self.store.update_context(&session_id, params).await {
            return Err(FlowcallError::SessionExpired);
        }
        let session = self.reload(&session_id).await?;
        let Some(description) = session
            .conversation_context
            .description
            .clone()
            .filter(|d| !d.trim().is_empty())
        else {
            return Err(FlowcallError::invalid_parameters(
                "Tell me what you'd like to automate and I'll build it.",
            ));
        };

        self.transition(&session, SessionStatus::Generating, SessionPatch::default())
            .await?;
        tracing::info!(
            session_id = %session_id,
            created,
            "Generating workflow"
        );

        let request = GenerationRequest::from_context(description, &session.conversation_context);
        let generated = match self.generator.generate(&request).await {
            Ok(generated) => generated,
            Err(e) => {
                self.write(&session_id, SessionPatch::status(SessionStatus::Error))
                    .await?;
                return Err(as_generation_failure(e));
            }
        };

        let report = lint(generated.workflow);
        let workflow_id = report.graph.id().map(str::to_string);
        let nodes = report.graph.node_names();
        self.write(
            &session_id,
            SessionPatch::status(SessionStatus::Ready).with_workflow(report.graph),
        )
        .await?;

        let credential_hint = if generated.credential_requirements.is_empty() {
            String::new()
        } else {
            let services: Vec<&str> = generated
                .credential_requirements
                .iter()
                .map(|c| c.service.as_str())
                .collect();
            format!(
                " You'll need to set up credentials for: {}.",
                services.join(", ")
            )
        };
        let message = format!(
            "I've created your workflow with {} steps: {}.{} Would you like me to deploy it?",
            nodes.len(),
            nodes.join(", "),
            credential_hint
        );

        Ok(GenerateWorkflowResult {
            workflow_generated: true,
            session_id,
            workflow_id,
            node_count: nodes.len(),
            nodes,
            credential_requirements: generated.credential_requirements,
            fixes: report.fixes,
            warnings: report.warnings,
            message,
        })
    }

    async fn update_workflow(
        &self,
        params: UpdateWorkflowParams,
        caller_key: &str,
        user_id: &str,
    ) -> Result<UpdateWorkflowResult> {
        let session_id = self.existing_session(caller_key, user_id).await?;
        let _guard = self.locks.acquire(&session_id).await;

        let session = self.reload(&session_id).await?;
        let workflow = session
            .current_workflow
            .ok_or_else(|| FlowcallError::invalid_parameters(GENERATE_FIRST))?;
        let Some(modification) = params.modification.filter(|m| !m.trim().is_empty()) else {
            return Err(FlowcallError::invalid_parameters(
                "What would you like me to change in the workflow?",
            ));
        };

        let modified = self
            .generator
            .modify(&workflow, &modification)
            .await
            .map_err(as_generation_failure)?;

        // Modified graphs are re-linted; the generator gives no guarantees.
        let report = lint(modified);
        let nodes = report.graph.node_names();
        self.write(&session_id, SessionPatch::default().with_workflow(report.graph))
            .await?;
        tracing::info!(session_id = %session_id, nodes = nodes.len(), "Workflow updated");

        Ok(UpdateWorkflowResult {
            workflow_updated: true,
            node_count: nodes.len(),
            message: format!(
                "I've updated your workflow. It now has {} steps: {}.",
                nodes.len(),
                nodes.join(", ")
            ),
            nodes,
            fixes: report.fixes,
            warnings: report.warnings,
        })
    }

    async fn deploy_workflow(
        &self,
        params: DeployWorkflowParams,
        caller_key: &str,
        user_id: &str,
    ) -> Result<DeployWorkflowResult> {
        let session_id = self.existing_session(caller_key, user_id).await?;
        let _guard = self.locks.acquire(&session_id).await;

        let session = self.reload(&session_id).await?;
        let Some(workflow) = session.current_workflow.as_ref() else {
            return Err(FlowcallError::invalid_parameters(GENERATE_FIRST));
        };

        if session.status == SessionStatus::Deployed {
            tracing::info!(session_id = %session_id, "Workflow already deployed");
            return Ok(DeployWorkflowResult::already_deployed(
                session.deployed_workflow_id.clone(),
            ));
        }
        if !params.confirm {
            return Ok(DeployWorkflowResult::needs_confirmation(
                workflow.nodes.len(),
            ));
        }
        if !session.status.can_transition_to(SessionStatus::Deployed) {
            return Err(FlowcallError::invalid_parameters(format!(
                "The workflow can't be deployed right now. {}",
                session.status.caller_message()
            )));
        }

        let Some(deployer) = &self.deployer else {
            self.transition(&session, SessionStatus::Deployed, SessionPatch::default())
                .await?;
            tracing::info!(
                session_id = %session_id,
                "No deployment client configured, marked deployed"
            );
            return Ok(DeployWorkflowResult::ready_to_deploy());
        };

        let report = lint(workflow.clone());
        if !report.is_clean() {
            tracing::debug!(
                session_id = %session_id,
                fixes = report.fixes.len(),
                "Stored workflow needed repairs before deployment"
            );
        }
        let deployed_id = deployer
            .create_workflow(&report.graph, user_id)
            .await
            .map_err(|e| match e {
                FlowcallError::Deployment(_) => e,
                other => FlowcallError::deployment(other.to_string()),
            })?;

        self.transition(
            &session,
            SessionStatus::Deployed,
            SessionPatch::default().with_deployed_id(deployed_id.clone()),
        )
        .await?;
        tracing::info!(session_id = %session_id, workflow_id = %deployed_id, "Workflow deployed");
        Ok(DeployWorkflowResult::deployed(deployed_id))
    }

    async fn workflow_status(
        &self,
        caller_key: &str,
        user_id: &str,
    ) -> Result<WorkflowStatusResult> {
        let Some(session) = self.store.get(caller_key).await else {
            return Ok(WorkflowStatusResult::no_session());
        };
        ensure_owner(&session, user_id)?;

        Ok(WorkflowStatusResult {
            session_id: Some(session.session_id),
            current_workflow: session.current_workflow,
            conversation_context: Some(session.conversation_context),
            deployed_workflow_id: session.deployed_workflow_id,
            ..WorkflowStatusResult::for_status(session.status)
        })
    }

    async fn search_nodes(&self, params: SearchNodesParams) -> Result<SearchNodesResult> {
        let Some(catalog) = &self.catalog else {
            return Err(FlowcallError::invalid_parameters(SEARCH_UNAVAILABLE));
        };
        let Some(query) = params
            .query
            .map(|q| q.trim().to_string())
            .filter(|q| !q.is_empty())
        else {
            return Err(FlowcallError::invalid_parameters(
                "What kind of integration should I look for?",
            ));
        };
        let limit = params.limit.unwrap_or(self.search_limit).max(1);

        let found = catalog.search(&query, limit).await.map_err(|e| match e {
            FlowcallError::Catalog(_) => e,
            other => FlowcallError::catalog(other.to_string()),
        })?;
        let nodes: Vec<String> = found.nodes.iter().take(limit).map(|n| n.spoken()).collect();
        // The catalog may match more than it returns; callers hear the full count.
        let count = found.total.max(nodes.len());

        let message = if nodes.is_empty() {
            format!(
                "I couldn't find any integrations matching '{}'. Could you try a different search term?",
                query
            )
        } else {
            let top: Vec<&str> = nodes.iter().take(3).map(String::as_str).collect();
            format!(
                "I found {} integrations for {}. Here are the top ones: {}.",
                count,
                query,
                top.join(". ")
            )
        };

        Ok(SearchNodesResult {
            found: !nodes.is_empty(),
            count,
            nodes,
            message,
        })
    }

    async fn route_to_agent(
        &self,
        params: RouteToAgentParams,
        caller_key: &str,
        user_id: &str,
    ) -> Result<RouteToAgentResult> {
        let (session, _) = self.store.get_or_create(caller_key, user_id).await;
        ensure_owner(&session, user_id)?;
        let session_id = session.session_id;
        let _guard = self.locks.acquire(&session_id).await;
        let session = self.reload(&session_id).await?;

        let requested = params
            .agent
            .as_deref()
            .map(str::trim)
            .filter(|a| !a.is_empty());
        let specialist = match requested {
            Some(agent) => Some(Specialist::from_str(agent).map_err(|_| {
                FlowcallError::invalid_parameters(format!(
                    "I can't route you to a {} specialist.",
                    agent
                ))
            })?),
            None => [
                params.message.as_deref(),
                params.reason.as_deref(),
                session.conversation_context.description.as_deref(),
            ]
            .into_iter()
            .flatten()
            .find_map(Specialist::infer),
        };

        let Some(specialist) = specialist else {
            return Ok(RouteToAgentResult {
                routed: false,
                agent: None,
                message: "Which specialist would you like to talk to: sales, support, operations or technical?"
                    .to_string(),
            });
        };

        if session.specialist == Some(specialist) {
            return Ok(RouteToAgentResult {
                routed: false,
                agent: Some(specialist),
                message: format!("You're already talking to the {} specialist.", specialist),
            });
        }

        self.write(
            &session_id,
            SessionPatch {
                specialist: Some(specialist),
                ..Default::default()
            },
        )
        .await?;
        tracing::info!(
            session_id = %session_id,
            %specialist,
            reason = params.reason.as_deref().unwrap_or(""),
            "Routed to specialist"
        );

        Ok(RouteToAgentResult {
            routed: true,
            agent: Some(specialist),
            message: specialist.greeting().to_string(),
        })
    }

    // ============================================================================
    // Helpers
    // ============================================================================

    /// Resolves an existing session owned by `user_id`, never creating one.
    async fn existing_session(&self, caller_key: &str, user_id: &str) -> Result<String> {
        let session = self
            .store
            .get(caller_key)
            .await
            .ok_or_else(|| FlowcallError::invalid_parameters(GENERATE_FIRST))?;
        ensure_owner(&session, user_id)?;
        Ok(session.session_id)
    }

    /// Re-reads a session after its lock was acquired.
    async fn reload(&self, session_id: &str) -> Result<Session> {
        self.store
            .get(session_id)
            .await
            .ok_or(FlowcallError::SessionExpired)
    }

    /// Applies `patch`, failing when the session is gone (swept or deleted).
    async fn write(&self, session_id: &str, patch: SessionPatch) -> Result<()> {
        if self.store.update(session_id, patch).await {
            Ok(())
        } else {
            tracing::warn!(session_id, "Session disappeared during a function call");
            Err(FlowcallError::SessionExpired)
        }
    }

    async fn transition(
        &self,
        session: &Session,
        next: SessionStatus,
        patch: SessionPatch,
    ) -> Result<()> {
        debug_assert!(
            session.status.can_transition_to(next),
            "illegal transition {} -> {}",
            session.status,
            next
        );
        tracing::debug!(
            session_id = %session.session_id,
            from = %session.status,
            to = %next,
            "Status transition"
        );
        self.write(
            &session.session_id,
            SessionPatch {
                status: Some(next),
                ..patch
            },
        )
        .await
    }
}

fn ensure_owner(session: &Session, user_id: &str) -> Result<()> {
    if session.is_owned_by(user_id) {
        Ok(())
    } else {
        tracing::warn!(
            session_id = %session.session_id,
            user_id,
            "Function call for a session owned by another user"
        );
        Err(FlowcallError::invalid_parameters(NOT_YOUR_SESSION))
    }
}

fn as_generation_failure(e: FlowcallError) -> FlowcallError {
    match e {
        FlowcallError::Generation(_) => e,
        other => FlowcallError::generation(other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::InMemorySessionStore;
    use async_trait::async_trait;
    use flowcall_core::collaborator::{
        CredentialRequirement, GeneratedWorkflow, NodeSearch, NodeSummary,
    };
    use flowcall_core::workflow::{WorkflowGraph, WorkflowNode};
    use serde_json::json;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    // Mock generator returning a two-node Slack workflow
    #[derive(Default)]
    struct MockGenerator {
        fail: bool,
        requests: Mutex<Vec<GenerationRequest>>,
    }

    impl MockGenerator {
        fn failing() -> Self {
            Self {
                fail: true,
                ..Default::default()
            }
        }
    }

    fn slack_workflow() -> WorkflowGraph {
        let mut graph = WorkflowGraph {
            nodes: vec![
                WorkflowNode::new("Webhook", "n8n-nodes-base.webhook"),
                WorkflowNode::new("Notify Slack", "n8n-nodes-base.slack")
                    .with_parameter("channelId", json!("alerts")),
            ],
            ..Default::default()
        };
        graph.connect("Webhook", "Notify Slack");
        graph
    }

    #[async_trait]
    impl WorkflowGenerator for MockGenerator {
        async fn generate(&self, request: &GenerationRequest) -> Result<GeneratedWorkflow> {
            self.requests.lock().unwrap().push(request.clone());
            if self.fail {
                return Err(FlowcallError::generation("backend unavailable"));
            }
            Ok(GeneratedWorkflow {
                workflow: slack_workflow(),
                credential_requirements: vec![CredentialRequirement::new("slack")],
            })
        }

        async fn modify(
            &self,
            workflow: &WorkflowGraph,
            instruction: &str,
        ) -> Result<WorkflowGraph> {
            if self.fail {
                return Err(FlowcallError::generation("backend unavailable"));
            }
            let mut modified = workflow.clone();
            modified
                .nodes
                .push(WorkflowNode::new(instruction, "n8n-nodes-base.gmail"));
            Ok(modified)
        }
    }

    #[derive(Default)]
    struct MockDeployer {
        fail: bool,
        calls: AtomicUsize,
    }

    #[async_trait]
    impl DeploymentClient for MockDeployer {
        async fn create_workflow(
            &self,
            workflow: &WorkflowGraph,
            user_id: &str,
        ) -> Result<String> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            assert_eq!(workflow.active, Some(json!(false)));
            if self.fail {
                return Err(FlowcallError::deployment("n8n rejected the workflow"));
            }
            Ok(format!("wf-{}", user_id))
        }
    }

    struct MockCatalog;

    #[async_trait]
    impl NodeCatalog for MockCatalog {
        async fn search(&self, query: &str, limit: usize) -> Result<NodeSearch> {
            let all = vec![
                NodeSummary {
                    name: "Salesforce".to_string(),
                    description: "CRM records".to_string(),
                },
                NodeSummary {
                    name: "Salesforce Trigger".to_string(),
                    description: String::new(),
                },
            ];
            let matches: Vec<NodeSummary> = all
                .into_iter()
                .filter(|n| n.name.to_lowercase().contains(&query.to_lowercase()))
                .collect();
            Ok(NodeSearch {
                total: matches.len(),
                nodes: matches.into_iter().take(limit).collect(),
            })
        }
    }

    fn dispatcher(generator: MockGenerator) -> (Arc<InMemorySessionStore>, FunctionDispatcher) {
        let store = Arc::new(InMemorySessionStore::new());
        let dispatcher = FunctionDispatcher::new(store.clone(), Arc::new(generator));
        (store, dispatcher)
    }

    async fn generate(dispatcher: &FunctionDispatcher, caller: &str) -> FunctionCallResponse {
        dispatcher
            .handle(
                "generateWorkflow",
                &json!({"description": "notify slack on new lead", "services": ["Slack"]}),
                caller,
                Some("u1"),
            )
            .await
    }

    #[tokio::test]
    async fn test_missing_user_is_rejected() {
        let (store, dispatcher) = dispatcher(MockGenerator::default());
        let response = dispatcher
            .handle("generateWorkflow", &json!({}), "c1", None)
            .await;
        assert_eq!(response.error.as_deref(), Some(AUTHENTICATION_REQUIRED));
        assert_eq!(response.result, Value::Null);
        assert!(store.is_empty().await);
    }

    #[tokio::test]
    async fn test_unknown_function_is_named() {
        let (_, dispatcher) = dispatcher(MockGenerator::default());
        let response = dispatcher
            .handle("dropDatabase", &Value::Null, "c1", Some("u1"))
            .await;
        assert!(response.error.unwrap().contains("dropDatabase"));
    }

    #[tokio::test]
    async fn test_generate_creates_session_and_lints() {
        let (store, dispatcher) = dispatcher(MockGenerator::default());
        let response = generate(&dispatcher, "c1").await;

        assert!(!response.is_error(), "{:?}", response.error);
        assert_eq!(response.result["workflowGenerated"], true);
        assert_eq!(response.result["nodeCount"], 2);
        assert!(
            response.result["message"]
                .as_str()
                .unwrap()
                .contains("credentials for: slack")
        );

        let session = store.get("c1").await.unwrap();
        assert_eq!(session.status, SessionStatus::Ready);
        let workflow = session.current_workflow.unwrap();
        assert_eq!(workflow.active, Some(json!(false)));
        assert_eq!(workflow.nodes[1].parameters["channelId"], "#alerts");
    }

    #[tokio::test]
    async fn test_generate_passes_context_hints() {
        let generator = Arc::new(MockGenerator::default());
        let store = Arc::new(InMemorySessionStore::new());
        let dispatcher = FunctionDispatcher::new(store.clone(), generator.clone());

        dispatcher
            .handle(
                "generate_workflow",
                &json!({"description": "daily report", "trigger": "schedule", "schedule": "9am"}),
                "c1",
                Some("u1"),
            )
            .await;

        let requests = generator.requests.lock().unwrap();
        assert_eq!(requests[0].description, "daily report");
        assert_eq!(requests[0].trigger.as_deref(), Some("schedule"));
        assert_eq!(requests[0].schedule.as_deref(), Some("9am"));
    }

    #[tokio::test]
    async fn test_generate_without_description_is_caller_error() {
        let (store, dispatcher) = dispatcher(MockGenerator::default());
        let response = dispatcher
            .handle("generateWorkflow", &json!({"trigger": "webhook"}), "c1", Some("u1"))
            .await;

        assert!(response.is_error());
        let session = store.get("c1").await.unwrap();
        assert_eq!(session.status, SessionStatus::Collecting);
        assert_eq!(session.conversation_context.trigger.as_deref(), Some("webhook"));
    }

    #[tokio::test]
    async fn test_generation_failure_sets_error_status() {
        let (store, dispatcher) = dispatcher(MockGenerator::failing());
        let response = generate(&dispatcher, "c1").await;

        assert_eq!(
            response.error.as_deref(),
            Some("Workflow generation failed: backend unavailable")
        );
        let session = store.get("c1").await.unwrap();
        assert_eq!(session.status, SessionStatus::Error);
        assert!(session.current_workflow.is_none());
    }

    #[tokio::test]
    async fn test_update_requires_existing_workflow() {
        let (store, dispatcher) = dispatcher(MockGenerator::default());
        let response = dispatcher
            .handle("updateWorkflow", &json!({"modification": "x"}), "c1", Some("u1"))
            .await;
        assert_eq!(response.error.as_deref(), Some(GENERATE_FIRST));
        assert!(store.is_empty().await);
    }

    #[tokio::test]
    async fn test_update_replaces_workflow_and_keeps_status() {
        let (store, dispatcher) = dispatcher(MockGenerator::default());
        generate(&dispatcher, "c1").await;

        let response = dispatcher
            .handle(
                "updateWorkflow",
                &json!({"modification": "Email Summary"}),
                "c1",
                Some("u1"),
            )
            .await;

        assert_eq!(response.result["nodeCount"], 3);
        let session = store.get("c1").await.unwrap();
        assert_eq!(session.status, SessionStatus::Ready);
        let added = session.current_workflow.unwrap();
        // Re-linted: the new Gmail node got a recipient and credentials
        assert_eq!(added.nodes[2].parameters["sendTo"], "={{ $json.email }}");
        assert!(added.nodes[2].credentials.is_some());
    }

    #[tokio::test]
    async fn test_deploy_needs_confirmation_first() {
        let deployer = Arc::new(MockDeployer::default());
        let (store, dispatcher) = dispatcher(MockGenerator::default());
        let dispatcher = dispatcher.with_deployer(deployer.clone());
        generate(&dispatcher, "c1").await;

        let response = dispatcher
            .handle("deployWorkflow", &json!({"confirm": false}), "c1", Some("u1"))
            .await;

        assert_eq!(response.result["needsConfirmation"], true);
        assert_eq!(deployer.calls.load(Ordering::SeqCst), 0);
        assert_eq!(store.get("c1").await.unwrap().status, SessionStatus::Ready);
    }

    #[tokio::test]
    async fn test_deploy_with_client_stores_external_id() {
        let deployer = Arc::new(MockDeployer::default());
        let (store, dispatcher) = dispatcher(MockGenerator::default());
        let dispatcher = dispatcher.with_deployer(deployer.clone());
        generate(&dispatcher, "c1").await;

        let response = dispatcher
            .handle("deployWorkflow", &json!({"confirm": "yes"}), "c1", Some("u1"))
            .await;

        assert_eq!(response.result["deployed"], true);
        assert_eq!(response.result["workflowId"], "wf-u1");
        let session = store.get("c1").await.unwrap();
        assert_eq!(session.status, SessionStatus::Deployed);
        assert_eq!(session.deployed_workflow_id.as_deref(), Some("wf-u1"));
    }

    #[tokio::test]
    async fn test_confirmed_deploy_is_not_repeated() {
        let deployer = Arc::new(MockDeployer::default());
        let (store, dispatcher) = dispatcher(MockGenerator::default());
        let dispatcher = dispatcher.with_deployer(deployer.clone());
        generate(&dispatcher, "c1").await;

        let first = dispatcher
            .handle("deployWorkflow", &json!({"confirm": true}), "c1", Some("u1"))
            .await;
        assert_eq!(first.result["workflowId"], "wf-u1");

        for confirm in [json!(true), json!(false)] {
            let again = dispatcher
                .handle("deployWorkflow", &json!({ "confirm": confirm }), "c1", Some("u1"))
                .await;
            assert!(!again.is_error(), "{:?}", again.error);
            assert_eq!(again.result["deployed"], true);
            assert_eq!(again.result["workflowId"], "wf-u1");
            assert!(again.result.get("needsConfirmation").is_none());
        }

        assert_eq!(deployer.calls.load(Ordering::SeqCst), 1);
        let session = store.get("c1").await.unwrap();
        assert_eq!(session.status, SessionStatus::Deployed);
        assert_eq!(session.deployed_workflow_id.as_deref(), Some("wf-u1"));
    }

    #[tokio::test]
    async fn test_session_deleted_while_waiting_for_lock() {
        let (store, dispatcher) = dispatcher(MockGenerator::default());
        generate(&dispatcher, "c1").await;
        let session_id = store.get("c1").await.unwrap().session_id;
        let dispatcher = Arc::new(dispatcher);

        let guard = dispatcher.locks().acquire(&session_id).await;
        let deploy = {
            let dispatcher = Arc::clone(&dispatcher);
            tokio::spawn(async move {
                dispatcher
                    .handle("deployWorkflow", &json!({"confirm": true}), "c1", Some("u1"))
                    .await
            })
        };
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(store.delete(&session_id).await);
        drop(guard);

        let response = deploy.await.unwrap();
        let error = response.error.unwrap();
        assert_eq!(error, FlowcallError::SessionExpired.to_string());
        assert!(!error.contains(&session_id));
    }

    #[tokio::test]
    async fn test_deploy_failure_keeps_status() {
        let deployer = Arc::new(MockDeployer {
            fail: true,
            ..Default::default()
        });
        let (store, dispatcher) = dispatcher(MockGenerator::default());
        let dispatcher = dispatcher.with_deployer(deployer.clone());
        generate(&dispatcher, "c1").await;

        let response = dispatcher
            .handle("deployWorkflow", &json!({"confirm": true}), "c1", Some("u1"))
            .await;

        assert_eq!(
            response.error.as_deref(),
            Some("Deployment failed: n8n rejected the workflow")
        );
        assert_eq!(deployer.calls.load(Ordering::SeqCst), 1);
        let session = store.get("c1").await.unwrap();
        assert_eq!(session.status, SessionStatus::Ready);
        assert!(session.deployed_workflow_id.is_none());
    }

    #[tokio::test]
    async fn test_deploy_after_failed_regeneration_is_refused() {
        let (store, dispatcher) = dispatcher(MockGenerator::default());
        generate(&dispatcher, "c1").await;
        store
            .update("c1", SessionPatch::status(SessionStatus::Generating))
            .await;
        store
            .update("c1", SessionPatch::status(SessionStatus::Error))
            .await;

        let response = dispatcher
            .handle("deployWorkflow", &json!({"confirm": true}), "c1", Some("u1"))
            .await;
        assert!(response.is_error());
        assert_eq!(store.get("c1").await.unwrap().status, SessionStatus::Error);
    }

    #[tokio::test]
    async fn test_status_without_session() {
        let (store, dispatcher) = dispatcher(MockGenerator::default());
        let response = dispatcher
            .handle("getWorkflowStatus", &Value::Null, "nobody", Some("u1"))
            .await;

        assert!(!response.is_error());
        assert_eq!(response.result["status"], "no_session");
        assert!(store.is_empty().await);
    }

    #[tokio::test]
    async fn test_status_reports_workflow_and_context() {
        let (_, dispatcher) = dispatcher(MockGenerator::default());
        generate(&dispatcher, "c1").await;

        let response = dispatcher
            .handle("getWorkflowStatus", &Value::Null, "c1", Some("u1"))
            .await;
        assert_eq!(response.result["status"], "ready");
        assert_eq!(
            response.result["conversationContext"]["services"],
            json!(["slack"])
        );
        assert_eq!(
            response.result["currentWorkflow"]["nodes"]
                .as_array()
                .unwrap()
                .len(),
            2
        );
    }

    #[tokio::test]
    async fn test_other_users_session_is_refused() {
        let (store, dispatcher) = dispatcher(MockGenerator::default());
        generate(&dispatcher, "c1").await;

        let response = dispatcher
            .handle("deployWorkflow", &json!({"confirm": true}), "c1", Some("u2"))
            .await;
        assert_eq!(response.error.as_deref(), Some(NOT_YOUR_SESSION));
        assert_eq!(store.get("c1").await.unwrap().status, SessionStatus::Ready);
    }

    #[tokio::test]
    async fn test_search_without_catalog() {
        let (_, dispatcher) = dispatcher(MockGenerator::default());
        let response = dispatcher
            .handle("searchNodes", &json!({"query": "salesforce"}), "c1", Some("u1"))
            .await;
        assert_eq!(response.error.as_deref(), Some(SEARCH_UNAVAILABLE));
    }

    #[tokio::test]
    async fn test_search_formats_results() {
        let (store, dispatcher) = dispatcher(MockGenerator::default());
        let dispatcher = dispatcher.with_catalog(Arc::new(MockCatalog));

        let response = dispatcher
            .handle("searchNodes", &json!({"query": "salesforce"}), "c1", Some("u1"))
            .await;
        assert_eq!(response.result["found"], true);
        assert_eq!(response.result["count"], 2);
        assert_eq!(
            response.result["nodes"],
            json!(["Salesforce: CRM records", "Salesforce Trigger"])
        );

        let response = dispatcher
            .handle("searchNodes", &json!({"query": "mainframe"}), "c1", Some("u1"))
            .await;
        assert_eq!(response.result["found"], false);
        assert!(store.is_empty().await);
    }

    #[tokio::test]
    async fn test_search_counts_all_catalog_matches() {
        let (_, dispatcher) = dispatcher(MockGenerator::default());
        let dispatcher = dispatcher.with_catalog(Arc::new(MockCatalog));

        let response = dispatcher
            .handle(
                "searchNodes",
                &json!({"query": "salesforce", "limit": 1}),
                "c1",
                Some("u1"),
            )
            .await;
        assert_eq!(response.result["count"], 2);
        assert_eq!(response.result["nodes"], json!(["Salesforce: CRM records"]));
        assert!(
            response.result["message"]
                .as_str()
                .unwrap()
                .starts_with("I found 2 integrations for salesforce")
        );
    }

    #[tokio::test]
    async fn test_route_infers_specialist() {
        let (store, dispatcher) = dispatcher(MockGenerator::default());
        let response = dispatcher
            .handle(
                "routeToAgent",
                &json!({"message": "I need to sync HubSpot leads into our sales pipeline"}),
                "c1",
                Some("u1"),
            )
            .await;

        assert_eq!(response.result["routed"], true);
        assert_eq!(response.result["agent"], "sales");
        let session = store.get("c1").await.unwrap();
        assert_eq!(session.specialist, Some(Specialist::Sales));
        assert_eq!(session.status, SessionStatus::Collecting);

        let again = dispatcher
            .handle("routeToAgent", &json!({"agent": "Sales"}), "c1", Some("u1"))
            .await;
        assert_eq!(again.result["routed"], false);
    }

    #[tokio::test]
    async fn test_route_rejects_unknown_agent() {
        let (_, dispatcher) = dispatcher(MockGenerator::default());
        let response = dispatcher
            .handle("routeToAgent", &json!({"agent": "finance"}), "c1", Some("u1"))
            .await;
        assert!(response.error.unwrap().contains("finance"));
    }
}
