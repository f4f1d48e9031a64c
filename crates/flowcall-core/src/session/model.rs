//! Session domain model.
//!
//! This module contains the Session entity that represents one
//! workflow-construction conversation.

use super::context::ConversationContext;
use super::specialist::Specialist;
use super::status::SessionStatus;
use crate::workflow::WorkflowGraph;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A workflow-construction conversation.
///
/// A session contains:
/// - The owner and, for voice calls, the call id it is aliased under
/// - The intent gathered so far
/// - The latest accepted workflow graph and its deployment id
/// - The construction status and timestamps
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    /// Unique session identifier (`session_<millis>_<random>`)
    pub session_id: String,
    /// External call identifier, when the session belongs to a voice call
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub call_id: Option<String>,
    /// Owner of the session
    pub user_id: String,
    pub conversation_context: ConversationContext,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_workflow: Option<WorkflowGraph>,
    /// Id assigned by the automation engine once deployment succeeds
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deployed_workflow_id: Option<String>,
    pub status: SessionStatus,
    /// Specialist persona the conversation was routed to
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub specialist: Option<Specialist>,
    pub created_at: DateTime<Utc>,
    pub last_updated: DateTime<Utc>,
}

impl Session {
    pub fn new(user_id: impl Into<String>, call_id: Option<String>) -> Self {
        let now = Utc::now();
        Self {
            session_id: generate_session_id(now),
            call_id,
            user_id: user_id.into(),
            conversation_context: ConversationContext::default(),
            current_workflow: None,
            deployed_workflow_id: None,
            status: SessionStatus::Collecting,
            specialist: None,
            created_at: now,
            last_updated: now,
        }
    }

    /// Shallow-merges `patch` and refreshes `last_updated`.
    pub fn apply(&mut self, patch: SessionPatch) {
        if let Some(call_id) = patch.call_id {
            self.call_id = Some(call_id);
        }
        if let Some(workflow) = patch.current_workflow {
            self.current_workflow = Some(workflow);
        }
        if let Some(id) = patch.deployed_workflow_id {
            self.deployed_workflow_id = Some(id);
        }
        if let Some(status) = patch.status {
            self.status = status;
        }
        if let Some(specialist) = patch.specialist {
            self.specialist = Some(specialist);
        }
        self.touch();
    }

    pub fn touch(&mut self) {
        self.last_updated = Utc::now();
    }

    pub fn is_owned_by(&self, user_id: &str) -> bool {
        self.user_id == user_id
    }
}

/// Fields to shallow-merge into a [`Session`]. Absent fields are left alone.
///
/// `current_workflow` replaces the stored graph wholesale.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SessionPatch {
    pub call_id: Option<String>,
    pub current_workflow: Option<WorkflowGraph>,
    pub deployed_workflow_id: Option<String>,
    pub status: Option<SessionStatus>,
    pub specialist: Option<Specialist>,
}

impl SessionPatch {
    pub fn status(status: SessionStatus) -> Self {
        Self {
            status: Some(status),
            ..Default::default()
        }
    }

    pub fn with_workflow(mut self, workflow: WorkflowGraph) -> Self {
        self.current_workflow = Some(workflow);
        self
    }

    pub fn with_deployed_id(mut self, id: impl Into<String>) -> Self {
        self.deployed_workflow_id = Some(id.into());
        self
    }
}

fn generate_session_id(now: DateTime<Utc>) -> String {
    let suffix = Uuid::new_v4().simple().to_string();
    format!("session_{}_{}", now.timestamp_millis(), &suffix[..12])
}
