use serde::{Deserialize, Serialize};
use serde_json::Value;

/// The JSON envelope returned to the transport for every function call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunctionCallResponse {
    pub result: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl FunctionCallResponse {
    pub fn ok(result: impl Serialize) -> Self {
        match serde_json::to_value(result) {
            Ok(result) => Self {
                result,
                error: None,
            },
            Err(e) => Self::failure(format!("Could not encode the result: {}", e)),
        }
    }

    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            result: Value::Null,
            error: Some(message.into()),
        }
    }

    pub fn is_error(&self) -> bool {
        self.error.is_some()
    }
}
