use anyhow::{Context, Result};
use flowcall_infrastructure::FlowcallPaths;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{EnvFilter, Layer};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

const DEFAULT_FILTER: &str = "flowcall=info,session_sweep=info";

fn env_filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER))
}

/// Installs the global subscriber.
///
/// Console output goes to stderr; stdout is reserved for command output.
/// The returned guard must live until exit or buffered file logs are lost.
pub fn init(log_to_file: bool) -> Result<Option<WorkerGuard>> {
    let mut guard = None;
    let file_layer = if log_to_file {
        let log_dir = FlowcallPaths::log_dir().context("Failed to resolve log directory")?;
        std::fs::create_dir_all(&log_dir)
            .with_context(|| format!("Failed to create {}", log_dir.display()))?;
        let appender = tracing_appender::rolling::daily(log_dir, "flowcall.log");
        let (writer, file_guard) = tracing_appender::non_blocking(appender);
        guard = Some(file_guard);
        Some(
            tracing_subscriber::fmt::layer()
                .with_writer(writer)
                .with_ansi(false)
                .with_filter(env_filter()),
        )
    } else {
        None
    };

    let console_layer = tracing_subscriber::fmt::layer()
        .with_writer(std::io::stderr)
        .with_filter(env_filter());

    tracing_subscriber::registry()
        .with(file_layer)
        .with(console_layer)
        .try_init()
        .context("Failed to install tracing subscriber")?;

    Ok(guard)
}
