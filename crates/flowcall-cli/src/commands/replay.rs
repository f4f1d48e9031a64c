use anyhow::{Context, Result};
use flowcall_application::{
    CallbackRouter, FunctionDispatcher, InMemorySessionStore, SessionSweeper,
};
use flowcall_core::config::EngineConfig;
use flowcall_infrastructure::{HttpNodeCatalog, HttpWorkflowGenerator, N8nDeploymentClient};
use serde_json::Value;
use std::io::{BufRead, BufReader, Write};
use std::path::Path;
use std::sync::Arc;

pub async fn run(config_path: Option<&Path>, envelopes: &Path, user: Option<&str>) -> Result<()> {
    let config = super::config_service(config_path).get_config()?;
    let (store, dispatcher) = build_engine(&config);

    let sweeper = SessionSweeper::new(
        store.clone(),
        config.session.ttl(),
        config.session.sweep_interval(),
    )
    .with_locks(dispatcher.locks())
    .start();

    let router = CallbackRouter::new(dispatcher);
    let reader: Box<dyn BufRead> = if envelopes == Path::new("-") {
        Box::new(BufReader::new(std::io::stdin()))
    } else {
        let file = std::fs::File::open(envelopes)
            .with_context(|| format!("Failed to open {}", envelopes.display()))?;
        Box::new(BufReader::new(file))
    };

    let replayed = replay(&router, reader, std::io::stdout().lock(), user).await;
    sweeper.shutdown().await;

    let count = replayed?;
    tracing::info!(envelopes = count, sessions = store.len().await, "Replay finished");
    Ok(())
}

/// Wires the dispatcher to the collaborators named in `config`.
fn build_engine(config: &EngineConfig) -> (Arc<InMemorySessionStore>, Arc<FunctionDispatcher>) {
    let store = Arc::new(InMemorySessionStore::new());
    let generator = Arc::new(HttpWorkflowGenerator::new(config.generator.base_url.clone()));

    let mut dispatcher = FunctionDispatcher::new(store.clone(), generator)
        .with_search_limit(config.catalog.search_limit);
    if config.catalog.enabled {
        dispatcher = dispatcher.with_catalog(Arc::new(HttpNodeCatalog::new(
            config.generator.base_url.clone(),
        )));
    }
    match &config.deployer {
        Some(deployer) => {
            dispatcher =
                dispatcher.with_deployer(Arc::new(N8nDeploymentClient::from_config(deployer)));
        }
        None => tracing::info!("No deployer configured; confirmed deployments stay local"),
    }

    (store, Arc::new(dispatcher))
}

/// Routes each non-blank line and writes one response per line.
async fn replay<R: BufRead, W: Write>(
    router: &CallbackRouter,
    reader: R,
    mut out: W,
    user: Option<&str>,
) -> Result<usize> {
    let mut count = 0;
    for (index, line) in reader.lines().enumerate() {
        let line = line.context("Failed to read envelope")?;
        if line.trim().is_empty() {
            continue;
        }
        let envelope = serde_json::from_str::<Value>(&line).unwrap_or_else(|e| {
            tracing::warn!(line = index + 1, error = %e, "Envelope is not JSON");
            Value::Null
        });
        let outcome = router.route_value(envelope, user).await;
        writeln!(out, "{}", outcome.to_json())?;
        count += 1;
    }
    out.flush()?;
    Ok(count)
}
