use anyhow::Result;
use flowcall_infrastructure::ConfigService;
use std::path::Path;

pub fn run(config_path: Option<&Path>) -> Result<()> {
    let service = super::config_service(config_path);
    let config = service.get_config()?;
    tracing::debug!(path = ?service.config_path().ok(), "Resolved config");
    print!("{}", ConfigService::to_toml(&config)?);
    Ok(())
}
