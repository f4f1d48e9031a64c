use crate::error::Result;
use crate::workflow::WorkflowGraph;
use async_trait::async_trait;

/// Creates workflows on the target automation engine.
///
/// Optional: running without a deployment client is a valid configuration.
#[async_trait]
pub trait DeploymentClient: Send + Sync {
    /// Creates `workflow` on behalf of `user_id`, returning the engine's id.
    async fn create_workflow(&self, workflow: &WorkflowGraph, user_id: &str) -> Result<String>;
}
