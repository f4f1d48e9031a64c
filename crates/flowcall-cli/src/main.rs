use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

mod commands;
mod logging;

#[derive(Parser)]
#[command(name = "flowcall")]
#[command(about = "flowcall - build n8n workflows from voice function calls", long_about = None)]
struct Cli {
    /// Config file to use instead of the platform default
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Also write logs to a daily file in the log directory
    #[arg(long, global = true)]
    log_file: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Repair a workflow graph and report what changed
    Lint {
        /// Workflow JSON file
        graph: PathBuf,
        /// Overwrite the file with the repaired graph
        #[arg(long)]
        write: bool,
    },
    /// Feed recorded callback envelopes (one JSON object per line) through the engine
    Replay {
        /// JSONL file, or `-` for stdin
        envelopes: PathBuf,
        /// Authenticated user id; falls back to the call metadata
        #[arg(long)]
        user: Option<String>,
    },
    /// Print the effective configuration
    Config,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let _log_guard = logging::init(cli.log_file)?;

    match cli.command {
        Commands::Lint { graph, write } => commands::lint::run(&graph, write)?,
        Commands::Replay { envelopes, user } => {
            commands::replay::run(cli.config.as_deref(), &envelopes, user.as_deref()).await?
        }
        Commands::Config => commands::config::run(cli.config.as_deref())?,
    }

    Ok(())
}
