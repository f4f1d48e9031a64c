//! Workflow graph domain module.
//!
//! - `graph`: the n8n node/connection model (`WorkflowGraph`)
//! - `lint`: the deterministic repair pass run before a graph is trusted
//! - `cron`: the five-field grammar used by the schedule-trigger rule

pub mod cron;
mod graph;
pub mod lint;

pub use graph::{ConnectionTarget, NodeConnections, WorkflowGraph, WorkflowNode};
pub use lint::{LintReport, lint};
