//! Intent accumulated across conversational turns.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Partially specified intent gathered from the conversation.
///
/// Merges are additive: scalar hints are overwritten only by a new value,
/// collections only ever grow.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversationContext {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trigger: Option<String>,
    #[serde(default)]
    pub services: BTreeSet<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schedule: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub channels: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recipients: Option<Vec<String>>,
}

/// Fields to merge into a [`ConversationContext`]. Absent fields are left alone.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContextPatch {
    #[serde(default)]
    pub trigger: Option<String>,
    #[serde(default)]
    pub services: Option<Vec<String>>,
    #[serde(default)]
    pub schedule: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub channels: Option<Vec<String>>,
    #[serde(default)]
    pub recipients: Option<Vec<String>>,
}

impl ContextPatch {
    pub fn description(description: impl Into<String>) -> Self {
        Self {
            description: Some(description.into()),
            ..Default::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        self == &Self::default()
    }
}

impl ConversationContext {
    pub fn merge(&mut self, patch: ContextPatch) {
        merge_scalar(&mut self.trigger, patch.trigger);
        merge_scalar(&mut self.schedule, patch.schedule);
        merge_scalar(&mut self.description, patch.description);

        if let Some(services) = patch.services {
            self.services.extend(
                services
                    .into_iter()
                    .map(|s| s.trim().to_lowercase())
                    .filter(|s| !s.is_empty()),
            );
        }
        merge_list(&mut self.channels, patch.channels);
        merge_list(&mut self.recipients, patch.recipients);
    }
}

fn merge_scalar(slot: &mut Option<String>, value: Option<String>) {
    if let Some(value) = value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty()) {
        *slot = Some(value);
    }
}

/// Appends unseen entries, keeping first-seen order.
fn merge_list(slot: &mut Option<Vec<String>>, values: Option<Vec<String>>) {
    let Some(values) = values else {
        return;
    };
    let list = slot.get_or_insert_with(Vec::new);
    for value in values {
        let value = value.trim().to_string();
        if !value.is_empty() && !list.contains(&value) {
            list.push(value);
        }
    }
}
