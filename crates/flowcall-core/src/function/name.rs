use serde::Serialize;
use strum::{Display, EnumIter, EnumString};

/// Every function the assistant may call.
///
/// Both the camelCase wire names and the snake_case names used by some voice
/// platforms parse to the same variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, EnumIter, Serialize)]
pub enum FunctionName {
    #[strum(to_string = "generateWorkflow", serialize = "generate_workflow")]
    #[serde(rename = "generateWorkflow")]
    GenerateWorkflow,
    #[strum(to_string = "updateWorkflow", serialize = "update_workflow")]
    #[serde(rename = "updateWorkflow")]
    UpdateWorkflow,
    #[strum(to_string = "deployWorkflow", serialize = "deploy_workflow")]
    #[serde(rename = "deployWorkflow")]
    DeployWorkflow,
    #[strum(to_string = "getWorkflowStatus", serialize = "get_workflow_status")]
    #[serde(rename = "getWorkflowStatus")]
    GetWorkflowStatus,
    #[strum(to_string = "searchNodes", serialize = "search_nodes")]
    #[serde(rename = "searchNodes")]
    SearchNodes,
    #[strum(to_string = "routeToAgent", serialize = "route_to_agent")]
    #[serde(rename = "routeToAgent")]
    RouteToAgent,
}
