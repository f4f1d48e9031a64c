//! HTTP collaborators against a one-shot local server.

use flowcall_core::collaborator::{
    DeploymentClient, GenerationRequest, NodeCatalog, WorkflowGenerator,
};
use flowcall_core::error::FlowcallError;
use flowcall_core::workflow::{WorkflowGraph, WorkflowNode};
use flowcall_infrastructure::{HttpNodeCatalog, HttpWorkflowGenerator, N8nDeploymentClient};
use serde_json::{Value, json};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use tokio::task::JoinHandle;

/// Serves a single canned response and hands back the raw request it saw.
async fn serve_once(status: &'static str, body: Value) -> (String, JoinHandle<String>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let base_url = format!("http://{}", listener.local_addr().unwrap());

    let handle = tokio::spawn(async move {
        let (mut socket, _) = listener.accept().await.unwrap();
        let mut raw = Vec::new();
        let mut buf = [0u8; 4096];
        loop {
            let n = socket.read(&mut buf).await.unwrap();
            if n == 0 {
                break;
            }
            raw.extend_from_slice(&buf[..n]);
            if request_complete(&raw) {
                break;
            }
        }

        let body = body.to_string();
        let response = format!(
            "HTTP/1.1 {}\r\ncontent-type: application/json\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{}",
            status,
            body.len(),
            body
        );
        socket.write_all(response.as_bytes()).await.unwrap();
        socket.shutdown().await.ok();
        String::from_utf8_lossy(&raw).to_string()
    });

    (base_url, handle)
}

fn request_complete(raw: &[u8]) -> bool {
    let text = String::from_utf8_lossy(raw);
    let Some(header_end) = text.find("\r\n\r\n") else {
        return false;
    };
    let content_length = text[..header_end]
        .lines()
        .find_map(|line| {
            let (name, value) = line.split_once(':')?;
            name.eq_ignore_ascii_case("content-length")
                .then(|| value.trim().parse::<usize>().ok())
                .flatten()
        })
        .unwrap_or(0);
    raw.len() >= header_end + 4 + content_length
}

fn request_body(raw: &str) -> Value {
    let (_, body) = raw.split_once("\r\n\r\n").unwrap();
    serde_json::from_str(body).unwrap()
}

#[tokio::test]
async fn generator_posts_request_and_unwraps_envelope() {
    let (base_url, server) = serve_once(
        "200 OK",
        json!({
            "success": true,
            "data": {
                "workflow": {"nodes": [{"name": "Webhook", "type": "n8n-nodes-base.webhook"}]},
                "credentialRequirements": [{"service": "slack"}]
            }
        }),
    )
    .await;

    let generator = HttpWorkflowGenerator::new(format!("{}/", base_url));
    let generated = generator
        .generate(&GenerationRequest {
            description: "notify slack".to_string(),
            services: vec!["slack".to_string()],
            ..Default::default()
        })
        .await
        .unwrap();

    assert_eq!(generated.workflow.nodes[0].name, "Webhook");
    assert_eq!(generated.credential_requirements[0].service, "slack");

    let raw = server.await.unwrap();
    assert!(raw.starts_with("POST /api/pipecat/generate-workflow "));
    assert_eq!(
        request_body(&raw),
        json!({"description": "notify slack", "services": ["slack"]})
    );
}

#[tokio::test]
async fn generator_reports_backend_failure() {
    let (base_url, _server) =
        serve_once("200 OK", json!({"success": false, "error": "model overloaded"})).await;

    let err = HttpWorkflowGenerator::new(base_url)
        .modify(&WorkflowGraph::default(), "add a delay")
        .await
        .unwrap_err();

    assert!(matches!(err, FlowcallError::Generation(ref m) if m == "model overloaded"));
}

#[tokio::test]
async fn catalog_search_sends_query_and_limit() {
    let (base_url, server) = serve_once(
        "200 OK",
        json!({
            "success": true,
            "data": {"nodes": [
                {"name": "Slack", "description": "Send messages"},
                {"name": "Discord", "description": "Post to channels"}
            ], "count": 2}
        }),
    )
    .await;

    let search = HttpNodeCatalog::new(base_url)
        .search("chat", 1)
        .await
        .unwrap();
    assert_eq!(search.nodes.len(), 1);
    assert_eq!(search.nodes[0].name, "Slack");
    assert_eq!(search.total, 2);

    let raw = server.await.unwrap();
    assert_eq!(request_body(&raw), json!({"query": "chat", "limit": 1}));
}

#[tokio::test]
async fn n8n_client_sends_api_key_and_accepts_numeric_id() {
    let (base_url, server) = serve_once("200 OK", json!({"id": 42, "active": false})).await;

    let graph = WorkflowGraph {
        nodes: vec![WorkflowNode::new("Webhook", "n8n-nodes-base.webhook")],
        active: Some(json!(false)),
        ..Default::default()
    };
    let id = N8nDeploymentClient::new(base_url, "secret-key")
        .create_workflow(&graph, "u1")
        .await
        .unwrap();
    assert_eq!(id, "42");

    let raw = server.await.unwrap();
    assert!(raw.starts_with("POST /api/v1/workflows "));
    assert!(raw.to_lowercase().contains("x-n8n-api-key: secret-key"));
    assert!(request_body(&raw).get("active").is_none());
}

#[tokio::test]
async fn n8n_client_surfaces_http_errors() {
    let (base_url, _server) =
        serve_once("401 Unauthorized", json!({"message": "unauthorized"})).await;

    let err = N8nDeploymentClient::new(base_url, "wrong")
        .create_workflow(&WorkflowGraph::default(), "u1")
        .await
        .unwrap_err();

    match err {
        FlowcallError::Deployment(message) => {
            assert!(message.starts_with("401"), "{}", message);
            assert!(message.contains("unauthorized"));
        }
        other => panic!("unexpected error: {:?}", other),
    }
}
