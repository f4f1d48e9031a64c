//! Inbound callback routing.
//!
//! Voice platforms post every call event to one webhook as a
//! `{ "message": { "type": ... } }` envelope. Only `function-call` messages
//! reach the dispatcher; the rest are logged and acknowledged.

use crate::function_dispatcher::FunctionDispatcher;
use flowcall_core::function::FunctionCallResponse;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};
use std::sync::Arc;

pub const MISSING_CALL_ID: &str = "The callback did not include a call id.";
pub const MALFORMED_ENVELOPE: &str = "The callback payload could not be understood.";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InboundEnvelope {
    pub message: InboundMessage,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum InboundMessage {
    FunctionCall {
        #[serde(rename = "functionCall")]
        function_call: FunctionCallPayload,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        call: Option<CallInfo>,
    },
    Transcript {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        role: Option<String>,
        #[serde(default)]
        transcript: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        call: Option<CallInfo>,
    },
    StatusUpdate {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        status: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        call: Option<CallInfo>,
    },
    EndOfCallReport {
        #[serde(
            default,
            rename = "endedReason",
            skip_serializing_if = "Option::is_none"
        )]
        ended_reason: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        call: Option<CallInfo>,
    },
    /// Any event type this router does not handle
    #[serde(other)]
    Other,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunctionCallPayload {
    pub name: String,
    #[serde(default)]
    pub parameters: Value,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CallInfo {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub metadata: Map<String, Value>,
}

impl CallInfo {
    pub fn user_id(&self) -> Option<&str> {
        self.metadata.get("userId").and_then(Value::as_str)
    }
}

impl InboundMessage {
    pub fn call(&self) -> Option<&CallInfo> {
        match self {
            InboundMessage::FunctionCall { call, .. }
            | InboundMessage::Transcript { call, .. }
            | InboundMessage::StatusUpdate { call, .. }
            | InboundMessage::EndOfCallReport { call, .. } => call.as_ref(),
            InboundMessage::Other => None,
        }
    }

    fn call_id(&self) -> Option<&str> {
        self.call()
            .and_then(|c| c.id.as_deref())
            .filter(|id| !id.trim().is_empty())
    }
}

/// What the transport should send back for one envelope.
#[derive(Debug, Clone, PartialEq)]
pub enum RouteOutcome {
    /// A function call was handled (or rejected) by the dispatcher
    Response(FunctionCallResponse),
    /// A non-function event was accepted
    Acknowledged,
}

impl RouteOutcome {
    pub fn to_json(&self) -> Value {
        match self {
            RouteOutcome::Response(response) => {
                serde_json::to_value(response).unwrap_or(Value::Null)
            }
            RouteOutcome::Acknowledged => json!({ "received": true }),
        }
    }
}

pub struct CallbackRouter {
    dispatcher: Arc<FunctionDispatcher>,
}

impl CallbackRouter {
    pub fn new(dispatcher: Arc<FunctionDispatcher>) -> Self {
        Self { dispatcher }
    }

    /// Parses and routes a raw JSON envelope.
    pub async fn route_value(&self, envelope: Value, user_id: Option<&str>) -> RouteOutcome {
        match serde_json::from_value::<InboundEnvelope>(envelope) {
            Ok(envelope) => self.route(envelope, user_id).await,
            Err(e) => {
                tracing::warn!(error = %e, "Rejected malformed callback");
                RouteOutcome::Response(FunctionCallResponse::failure(MALFORMED_ENVELOPE))
            }
        }
    }

    /// Routes one envelope.
    ///
    /// `user_id` comes from the authenticated transport. When it is absent
    /// the call metadata's `userId` is used; there is no fallback identity.
    pub async fn route(&self, envelope: InboundEnvelope, user_id: Option<&str>) -> RouteOutcome {
        let message = envelope.message;
        let call_id = message.call_id();

        match &message {
            InboundMessage::FunctionCall {
                function_call,
                call,
            } => {
                let Some(call_id) = call_id else {
                    tracing::warn!(
                        function = %function_call.name,
                        "Function call without a call id"
                    );
                    return RouteOutcome::Response(FunctionCallResponse::failure(MISSING_CALL_ID));
                };
                let user_id = user_id.or_else(|| call.as_ref().and_then(CallInfo::user_id));
                let response = self
                    .dispatcher
                    .handle(
                        &function_call.name,
                        &function_call.parameters,
                        call_id,
                        user_id,
                    )
                    .await;
                RouteOutcome::Response(response)
            }
            InboundMessage::Transcript {
                role, transcript, ..
            } => {
                tracing::debug!(
                    call_id,
                    role = role.as_deref().unwrap_or("unknown"),
                    transcript = %transcript,
                    "Transcript"
                );
                RouteOutcome::Acknowledged
            }
            InboundMessage::StatusUpdate { status, .. } => {
                tracing::info!(
                    call_id,
                    status = status.as_deref().unwrap_or("unknown"),
                    "Call status update"
                );
                RouteOutcome::Acknowledged
            }
            InboundMessage::EndOfCallReport { ended_reason, .. } => {
                // The session stays available to the UI until idle eviction.
                let session = match call_id {
                    Some(call_id) => self.dispatcher.store().get(call_id).await,
                    None => None,
                };
                tracing::info!(
                    call_id,
                    ended_reason = ended_reason.as_deref().unwrap_or("unknown"),
                    session_id = session.as_ref().map(|s| s.session_id.as_str()),
                    status = session.as_ref().map(|s| AsRef::<str>::as_ref(&s.status)),
                    "Call ended"
                );
                RouteOutcome::Acknowledged
            }
            InboundMessage::Other => {
                tracing::debug!(call_id, "Ignored callback of unhandled type");
                RouteOutcome::Acknowledged
            }
        }
    }
}
