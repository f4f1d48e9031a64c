//! Deterministic repair pass for generated workflow graphs.
//!
//! The linter never fails. Anything it cannot interpret is left as it was,
//! apart from the generic position and credentials guarantees. Running it on
//! its own output produces no further fixes.

use super::cron::{DEFAULT_CRON, is_valid_cron};
use super::graph::{WorkflowGraph, WorkflowNode};
use serde::Serialize;
use serde_json::{Map, Value};
use std::collections::{BTreeMap, HashSet};

pub const SLACK_NODE: &str = "n8n-nodes-base.slack";
pub const EMAIL_SEND_NODE: &str = "n8n-nodes-base.emailSend";
pub const EMAIL_READ_NODE: &str = "n8n-nodes-base.emailReadImap";
pub const GMAIL_NODE: &str = "n8n-nodes-base.gmail";
pub const SCHEDULE_TRIGGER_NODE: &str = "n8n-nodes-base.scheduleTrigger";
pub const LEGACY_CRON_NODE: &str = "n8n-nodes-base.cron";

/// Stands in for a sender address the user still has to provide.
pub const PLACEHOLDER_FROM_EMAIL: &str = "your-email@example.com";
/// Pulls the recipient from the upstream item.
pub const UPSTREAM_EMAIL_EXPRESSION: &str = "={{ $json.email }}";

const LAYOUT_ORIGIN: (f64, f64) = (250.0, 300.0);
const LAYOUT_STEP_X: f64 = 220.0;

const SEND_NAME_HINTS: [&str; 4] = ["send", "notify", "reply", "email to"];
const SEND_PARAM_HINTS: [&str; 5] = ["toEmail", "sendTo", "subject", "text", "html"];

/// Outcome of a lint pass.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LintReport {
    pub graph: WorkflowGraph,
    /// Corrections applied autonomously
    pub fixes: Vec<String>,
    /// Things a human should review before real use
    pub warnings: Vec<String>,
}

impl LintReport {
    pub fn is_clean(&self) -> bool {
        self.fixes.is_empty() && self.warnings.is_empty()
    }
}

#[derive(Default)]
struct Findings {
    fixes: Vec<String>,
    warnings: Vec<String>,
}

impl Findings {
    fn fix(&mut self, message: String) {
        self.fixes.push(message);
    }

    fn warn(&mut self, message: String) {
        self.warnings.push(message);
    }
}

/// Lints `graph`, returning the corrected graph with its findings.
pub fn lint(mut graph: WorkflowGraph) -> LintReport {
    let mut findings = Findings::default();

    ensure_execution_order(&mut graph, &mut findings);
    ensure_inactive(&mut graph, &mut findings);

    for node in &mut graph.nodes {
        match node.node_type.as_str() {
            SLACK_NODE => lint_slack(node, &mut findings),
            EMAIL_SEND_NODE | EMAIL_READ_NODE => lint_email(node, &mut findings),
            GMAIL_NODE => lint_gmail(node, &mut findings),
            SCHEDULE_TRIGGER_NODE | LEGACY_CRON_NODE => lint_schedule(node, &mut findings),
            _ => {}
        }
    }

    for (index, node) in graph.nodes.iter_mut().enumerate() {
        ensure_position(index, node, &mut findings);
        ensure_credentials(node, &mut findings);
    }

    warn_duplicate_names(&graph, &mut findings);
    enforce_connection_integrity(&mut graph, &mut findings);

    LintReport {
        graph,
        fixes: findings.fixes,
        warnings: findings.warnings,
    }
}

fn ensure_execution_order(graph: &mut WorkflowGraph, findings: &mut Findings) {
    let settings = graph.settings.get_or_insert_with(Map::new);
    if !settings.contains_key("executionOrder") {
        settings.insert("executionOrder".to_string(), Value::from("v1"));
        findings.fix("Set settings.executionOrder to \"v1\"".to_string());
    }
}

fn ensure_inactive(graph: &mut WorkflowGraph, findings: &mut Findings) {
    if graph.active != Some(Value::Bool(false)) {
        graph.active = Some(Value::Bool(false));
        findings.fix("Set active to false; workflows are never deployed pre-activated".to_string());
    }
}

// ============================================================================
// Messaging
// ============================================================================

fn lint_slack(node: &mut WorkflowNode, findings: &mut Findings) {
    for key in ["channelId", "channel"] {
        let Some(value) = node.parameters.get_mut(key) else {
            continue;
        };
        let prefixed = match value {
            Value::String(channel) => prefix_channel(channel),
            // resource locator: {"__rl": true, "mode": "name", "value": "alerts"}
            Value::Object(locator)
                if locator.get("mode").and_then(Value::as_str) == Some("name") =>
            {
                match locator.get_mut("value") {
                    Some(Value::String(channel)) => prefix_channel(channel),
                    _ => None,
                }
            }
            _ => None,
        };
        if let Some(channel) = prefixed {
            findings.fix(format!(
                "Node '{}': prefixed Slack {} with '#' ({})",
                node.name, key, channel
            ));
        }
    }

    for (key, default) in [("resource", "message"), ("operation", "post")] {
        if node.str_param(key).is_none() {
            node.parameters.insert(key.to_string(), Value::from(default));
            findings.fix(format!(
                "Node '{}': set Slack {} to \"{}\"",
                node.name, key, default
            ));
        }
    }
}

/// Adds `#` to a bare channel name, returning the new value when changed.
fn prefix_channel(channel: &mut String) -> Option<String> {
    let trimmed = channel.trim();
    if trimmed.is_empty()
        || trimmed.starts_with('#')
        || trimmed.starts_with('@')
        || is_expression(trimmed)
    {
        return None;
    }
    *channel = format!("#{}", trimmed);
    Some(channel.clone())
}

fn is_expression(value: &str) -> bool {
    value.starts_with('=') || value.contains("{{")
}

// ============================================================================
// Mail
// ============================================================================

fn lint_email(node: &mut WorkflowNode, findings: &mut Findings) {
    if node.node_type == EMAIL_READ_NODE {
        if !intends_to_send(node) {
            return;
        }
        node.node_type = EMAIL_SEND_NODE.to_string();
        findings.fix(format!(
            "Node '{}': retyped mail reader to {} because it sends mail",
            node.name, EMAIL_SEND_NODE
        ));
    }

    match node.str_param("fromEmail") {
        None => {
            node.parameters
                .insert("fromEmail".to_string(), Value::from(PLACEHOLDER_FROM_EMAIL));
            findings.warn(format!(
                "Node '{}': no sender address, using placeholder {}; replace it before running",
                node.name, PLACEHOLDER_FROM_EMAIL
            ));
        }
        Some(PLACEHOLDER_FROM_EMAIL) => {
            findings.warn(format!(
                "Node '{}': sender address is still the placeholder {}",
                node.name, PLACEHOLDER_FROM_EMAIL
            ));
        }
        Some(_) => {}
    }

    if node.str_param("toEmail").is_none() {
        node.parameters
            .insert("toEmail".to_string(), Value::from(UPSTREAM_EMAIL_EXPRESSION));
        findings.fix(format!(
            "Node '{}': set toEmail to {}",
            node.name, UPSTREAM_EMAIL_EXPRESSION
        ));
    }
}

fn intends_to_send(node: &WorkflowNode) -> bool {
    let name = node.name.to_lowercase();
    SEND_NAME_HINTS.iter().any(|hint| name.contains(hint))
        || SEND_PARAM_HINTS
            .iter()
            .any(|key| node.parameters.contains_key(*key))
}

fn lint_gmail(node: &mut WorkflowNode, findings: &mut Findings) {
    // n8n defaults the Gmail node to message/send
    let sends = node.str_param("operation").is_none_or(|op| op == "send");
    if sends && node.str_param("sendTo").is_none() {
        node.parameters
            .insert("sendTo".to_string(), Value::from(UPSTREAM_EMAIL_EXPRESSION));
        findings.fix(format!(
            "Node '{}': set sendTo to {}",
            node.name, UPSTREAM_EMAIL_EXPRESSION
        ));
    }
}

// ============================================================================
// Schedule
// ============================================================================

fn lint_schedule(node: &mut WorkflowNode, findings: &mut Findings) {
    let name = node.name.clone();
    let repair = |slot: &mut Value, findings: &mut Findings| {
        let current = slot.as_str().unwrap_or_default().trim().to_string();
        if is_expression(&current) || is_valid_cron(&current) {
            return;
        }
        *slot = Value::from(DEFAULT_CRON);
        findings.fix(format!(
            "Node '{}': replaced invalid cron expression '{}' with '{}' (daily at 09:00)",
            name, current, DEFAULT_CRON
        ));
    };

    if let Some(slot) = node.parameters.get_mut("cronExpression") {
        repair(slot, findings);
    }

    // scheduleTrigger: rule.interval[] with field = cronExpression
    if let Some(Value::Array(intervals)) = node
        .parameters
        .get_mut("rule")
        .and_then(|rule| rule.get_mut("interval"))
    {
        for interval in intervals.iter_mut().filter_map(Value::as_object_mut) {
            if interval.get("field").and_then(Value::as_str) != Some("cronExpression") {
                continue;
            }
            let slot = interval
                .entry("expression")
                .or_insert_with(|| Value::from(""));
            repair(slot, findings);
        }
    }

    // legacy cron node: triggerTimes.item[] with mode = custom
    if let Some(Value::Array(items)) = node
        .parameters
        .get_mut("triggerTimes")
        .and_then(|times| times.get_mut("item"))
    {
        for item in items.iter_mut().filter_map(Value::as_object_mut) {
            if item.get("mode").and_then(Value::as_str) != Some("custom") {
                continue;
            }
            let slot = item
                .entry("cronExpression")
                .or_insert_with(|| Value::from(""));
            repair(slot, findings);
        }
    }
}

// ============================================================================
// Generic node guarantees
// ============================================================================

fn ensure_position(index: usize, node: &mut WorkflowNode, findings: &mut Findings) {
    if node.has_valid_position() {
        return;
    }
    let x = LAYOUT_ORIGIN.0 + LAYOUT_STEP_X * index as f64;
    let y = LAYOUT_ORIGIN.1;
    node.position = Some(Value::from(vec![x, y]));
    findings.fix(format!("Node '{}': assigned position [{}, {}]", node.name, x, y));
}

fn ensure_credentials(node: &mut WorkflowNode, findings: &mut Findings) {
    if node.credentials.is_none() {
        node.credentials = Some(Map::new());
        findings.fix(format!("Node '{}': added empty credentials", node.name));
    }
}

fn warn_duplicate_names(graph: &WorkflowGraph, findings: &mut Findings) {
    let mut seen = HashSet::new();
    for node in &graph.nodes {
        if !seen.insert(node.name.as_str()) {
            findings.warn(format!(
                "Node name '{}' is used more than once; connections to it are ambiguous",
                node.name
            ));
        }
    }
}

// ============================================================================
// Connections
// ============================================================================

fn enforce_connection_integrity(graph: &mut WorkflowGraph, findings: &mut Findings) {
    if graph.connections.is_none() {
        findings.fix("Added empty connections map".to_string());
    }
    let connections = graph.connections.get_or_insert_with(BTreeMap::new);
    let names: HashSet<&str> = graph.nodes.iter().map(|n| n.name.as_str()).collect();

    connections.retain(|source, _| {
        let known = names.contains(source.as_str());
        if !known {
            findings.warn(format!(
                "Removed connections from unknown node '{}'",
                source
            ));
        }
        known
    });

    for (source, outputs) in connections.iter_mut() {
        for slot in outputs.main.iter_mut() {
            slot.retain(|target| {
                let known = names.contains(target.node.as_str());
                if !known {
                    findings.warn(format!(
                        "Removed connection from '{}' to unknown node '{}'",
                        source, target.node
                    ));
                }
                known
            });
        }
    }
}
