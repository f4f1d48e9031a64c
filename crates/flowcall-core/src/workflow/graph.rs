//! n8n workflow graph model.
//!
//! Only the fields the linter reasons about are typed. Everything else the
//! generator emits (`typeVersion`, `pinData`, `meta`, ...) rides along in the
//! flattened `extra` maps so a graph survives a lint pass unchanged.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

/// Output slots of one source node, keyed by connection kind (`main`, ...).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NodeConnections {
    #[serde(default)]
    pub main: Vec<Vec<ConnectionTarget>>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// One edge endpoint inside an output slot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConnectionTarget {
    /// Target node *name* (names are the join key, not ids)
    pub node: String,
    #[serde(rename = "type", default = "default_connection_type")]
    pub kind: String,
    #[serde(default)]
    pub index: u32,
}

impl ConnectionTarget {
    pub fn main(node: impl Into<String>) -> Self {
        Self {
            node: node.into(),
            kind: default_connection_type(),
            index: 0,
        }
    }
}

fn default_connection_type() -> String {
    "main".to_string()
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WorkflowNode {
    #[serde(default)]
    pub id: String,
    pub name: String,
    #[serde(rename = "type")]
    pub node_type: String,
    /// Kept untyped so malformed generator output can be detected and replaced.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub position: Option<Value>,
    #[serde(default)]
    pub parameters: Map<String, Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub credentials: Option<Map<String, Value>>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl WorkflowNode {
    pub fn new(name: impl Into<String>, node_type: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            id: name.to_lowercase().replace(' ', "-"),
            name,
            node_type: node_type.into(),
            ..Default::default()
        }
    }

    pub fn with_parameter(mut self, key: &str, value: Value) -> Self {
        self.parameters.insert(key.to_string(), value);
        self
    }

    pub fn with_position(mut self, x: f64, y: f64) -> Self {
        self.position = Some(Value::from(vec![x, y]));
        self
    }

    /// Returns a string parameter, treating empty strings as absent.
    pub fn str_param(&self, key: &str) -> Option<&str> {
        self.parameters
            .get(key)
            .and_then(Value::as_str)
            .filter(|s| !s.trim().is_empty())
    }

    /// `true` when `position` is exactly two finite numbers.
    pub fn has_valid_position(&self) -> bool {
        match &self.position {
            Some(Value::Array(coords)) => {
                coords.len() == 2
                    && coords
                        .iter()
                        .all(|c| c.as_f64().is_some_and(|v| v.is_finite()))
            }
            _ => false,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WorkflowGraph {
    #[serde(default)]
    pub nodes: Vec<WorkflowNode>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub connections: Option<BTreeMap<String, NodeConnections>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub settings: Option<Map<String, Value>>,
    /// Untyped on purpose: generators have been seen emitting `"true"`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub active: Option<Value>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl WorkflowGraph {
    pub fn id(&self) -> Option<&str> {
        self.extra.get("id").and_then(Value::as_str)
    }

    pub fn name(&self) -> Option<&str> {
        self.extra.get("name").and_then(Value::as_str)
    }

    pub fn node_names(&self) -> Vec<String> {
        self.nodes.iter().map(|n| n.name.clone()).collect()
    }

    pub fn node(&self, name: &str) -> Option<&WorkflowNode> {
        self.nodes.iter().find(|n| n.name == name)
    }

    /// Adds an edge from `source` output 0 to `target`.
    pub fn connect(&mut self, source: &str, target: &str) {
        let slots = &mut self
            .connections
            .get_or_insert_with(BTreeMap::new)
            .entry(source.to_string())
            .or_default()
            .main;
        if slots.is_empty() {
            slots.push(Vec::new());
        }
        slots[0].push(ConnectionTarget::main(target));
    }

    /// Every node name referenced by any connection, sources included.
    pub fn referenced_names(&self) -> Vec<&str> {
        let Some(connections) = &self.connections else {
            return Vec::new();
        };
        connections
            .iter()
            .flat_map(|(source, outputs)| {
                std::iter::once(source.as_str()).chain(
                    outputs
                        .main
                        .iter()
                        .flatten()
                        .map(|target| target.node.as_str()),
                )
            })
            .collect()
    }
}
