//! Lint passes over graphs shaped like real generator output.

use flowcall_core::workflow::cron::DEFAULT_CRON;
use flowcall_core::workflow::{WorkflowGraph, lint};
use serde_json::json;

fn graph(value: serde_json::Value) -> WorkflowGraph {
    serde_json::from_value(value).expect("valid graph json")
}

#[test]
fn slack_channel_and_message_defaults() {
    let report = lint(graph(json!({
        "name": "Lead alerts",
        "nodes": [
            {"name": "Webhook", "type": "n8n-nodes-base.webhook", "parameters": {"path": "lead"}},
            {"name": "Slack", "type": "n8n-nodes-base.slack", "typeVersion": 2,
             "parameters": {"channelId": "alerts", "text": "New lead"}}
        ],
        "connections": {"Webhook": {"main": [[{"node": "Slack", "type": "main", "index": 0}]]}}
    })));

    let slack = report.graph.node("Slack").unwrap();
    assert_eq!(slack.parameters["channelId"], "#alerts");
    assert_eq!(slack.parameters["resource"], "message");
    assert_eq!(slack.parameters["operation"], "post");
    assert_eq!(slack.extra["typeVersion"], 2);

    let slack_fixes: Vec<_> = report
        .fixes
        .iter()
        .filter(|f| f.contains(" Slack "))
        .collect();
    assert_eq!(slack_fixes.len(), 3, "{:?}", report.fixes);
    assert_eq!(report.graph.name(), Some("Lead alerts"));
}

#[test]
fn invalid_schedule_is_reset_to_daily() {
    let report = lint(graph(json!({
        "nodes": [{
            "name": "Every hour",
            "type": "n8n-nodes-base.scheduleTrigger",
            "parameters": {"rule": {"interval": [{"field": "cronExpression", "expression": "99 * * * *"}]}}
        }]
    })));

    let node = report.graph.node("Every hour").unwrap();
    assert_eq!(
        node.parameters["rule"]["interval"][0]["expression"],
        DEFAULT_CRON
    );
    assert!(report.fixes.iter().any(|f| f.contains("99 * * * *")));
}

#[test]
fn messy_graph_reaches_a_fixed_point() {
    let first = lint(graph(json!({
        "active": "true",
        "nodes": [
            {"name": "Read Mail", "type": "n8n-nodes-base.emailReadImap",
             "parameters": {"subject": "Weekly report"}},
            {"name": "Cron", "type": "n8n-nodes-base.cron",
             "parameters": {"triggerTimes": {"item": [{"mode": "custom", "cronExpression": "nope"}]}},
             "position": [10, "x"]}
        ],
        "connections": {
            "Cron": {"main": [[{"node": "Read Mail"}, {"node": "Missing"}]]},
            "Nowhere": {"main": [[{"node": "Cron"}]]}
        }
    })));
    assert!(!first.fixes.is_empty());
    assert!(!first.warnings.is_empty());

    let second = lint(first.graph.clone());
    assert!(second.fixes.is_empty(), "{:?}", second.fixes);
    assert_eq!(second.graph, first.graph);

    for name in first.graph.referenced_names() {
        assert!(first.graph.node(name).is_some(), "{} dangles", name);
    }
}
