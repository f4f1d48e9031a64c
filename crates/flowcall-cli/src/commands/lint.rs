use anyhow::{Context, Result};
use flowcall_core::workflow::{LintReport, WorkflowGraph, lint};
use std::path::Path;

pub fn run(path: &Path, write: bool) -> Result<()> {
    let report = lint_file(path)?;

    for fix in &report.fixes {
        eprintln!("fixed: {}", fix);
    }
    for warning in &report.warnings {
        eprintln!("warning: {}", warning);
    }

    let rendered = serde_json::to_string_pretty(&report.graph)?;
    if write {
        if report.fixes.is_empty() {
            tracing::info!(path = %path.display(), "Graph already clean");
        } else {
            std::fs::write(path, format!("{}\n", rendered))
                .with_context(|| format!("Failed to write {}", path.display()))?;
            tracing::info!(path = %path.display(), fixes = report.fixes.len(), "Graph rewritten");
        }
    } else {
        println!("{}", rendered);
    }
    Ok(())
}

fn lint_file(path: &Path) -> Result<LintReport> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    let graph: WorkflowGraph = serde_json::from_str(&content)
        .with_context(|| format!("{} is not a workflow graph", path.display()))?;
    Ok(lint(graph))
}
