use crate::error::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeSummary {
    pub name: String,
    #[serde(default)]
    pub description: String,
}

impl NodeSummary {
    /// `"name: description"`, or just the name when there is no description.
    pub fn spoken(&self) -> String {
        if self.description.trim().is_empty() {
            self.name.clone()
        } else {
            format!("{}: {}", self.name, self.description)
        }
    }
}

/// The first `limit` matches of a search, plus how many the catalog found.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NodeSearch {
    pub nodes: Vec<NodeSummary>,
    /// Total matches, which can exceed `nodes.len()`
    pub total: usize,
}

/// Searches the integrations available on the automation engine.
#[async_trait]
pub trait NodeCatalog: Send + Sync {
    async fn search(&self, query: &str, limit: usize) -> Result<NodeSearch>;
}
