//! Typed parameters for each function.
//!
//! Voice platforms are loose with types, so parsing is forgiving: a missing
//! or `null` parameter object is treated as empty and `confirm` accepts
//! booleans, numbers and yes/no strings.

use super::FunctionName;
use crate::error::{FlowcallError, Result};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer};
use serde_json::Value;

pub use crate::session::ContextPatch as GenerateWorkflowParams;

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct UpdateWorkflowParams {
    #[serde(default, alias = "instruction")]
    pub modification: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct DeployWorkflowParams {
    #[serde(default, deserialize_with = "truthy")]
    pub confirm: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct SearchNodesParams {
    #[serde(default)]
    pub query: Option<String>,
    #[serde(default)]
    pub limit: Option<usize>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct RouteToAgentParams {
    #[serde(default)]
    pub agent: Option<String>,
    #[serde(default)]
    pub reason: Option<String>,
    /// What the user said, used to infer a specialist when `agent` is absent
    #[serde(default)]
    pub message: Option<String>,
}

/// Parses `parameters` for `function`, treating `null` as `{}`.
pub fn parse<T: DeserializeOwned>(function: FunctionName, parameters: &Value) -> Result<T> {
    let parameters = match parameters {
        Value::Null => Value::Object(Default::default()),
        other => other.clone(),
    };
    serde_json::from_value(parameters).map_err(|e| {
        tracing::debug!(%function, error = %e, "Rejected function parameters");
        FlowcallError::invalid_parameters(format!(
            "I couldn't understand the details for {}.",
            function
        ))
    })
}

fn truthy<'de, D>(deserializer: D) -> std::result::Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::Bool(b) => b,
        Value::Number(n) => n.as_f64().is_some_and(|v| v != 0.0),
        Value::String(s) => matches!(
            s.trim().to_lowercase().as_str(),
            "true" | "yes" | "y" | "1" | "confirm" | "confirmed"
        ),
        Value::Null | Value::Array(_) | Value::Object(_) => false,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn confirm(value: Value) -> bool {
        parse::<DeployWorkflowParams>(FunctionName::DeployWorkflow, &json!({ "confirm": value }))
            .unwrap()
            .confirm
    }

    #[test]
    fn test_confirm_is_truthy() {
        assert!(confirm(json!(true)));
        assert!(confirm(json!("yes")));
        assert!(confirm(json!(1)));
        assert!(!confirm(json!(false)));
        assert!(!confirm(json!("no")));
        assert!(!confirm(json!(0)));
        assert!(!confirm(Value::Null));
    }

    #[test]
    fn test_missing_confirm_is_false() {
        let params: DeployWorkflowParams =
            parse(FunctionName::DeployWorkflow, &Value::Null).unwrap();
        assert!(!params.confirm);
    }

    #[test]
    fn test_instruction_alias() {
        let params: UpdateWorkflowParams = parse(
            FunctionName::UpdateWorkflow,
            &json!({"instruction": "add a Slack step"}),
        )
        .unwrap();
        assert_eq!(params.modification.as_deref(), Some("add a Slack step"));
    }

    #[test]
    fn test_bad_shape_is_a_caller_error() {
        let err = parse::<GenerateWorkflowParams>(
            FunctionName::GenerateWorkflow,
            &json!({"services": "slack"}),
        )
        .unwrap_err();
        assert!(err.to_string().contains("generateWorkflow"));
    }
}
