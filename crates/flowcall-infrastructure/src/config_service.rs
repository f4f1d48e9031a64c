//! Configuration service implementation.
//!
//! Loads the engine configuration from `config.toml` (see
//! [`FlowcallPaths::config_file`]) and layers `FLOWCALL_*` environment
//! variables on top.

use crate::paths::FlowcallPaths;
use flowcall_core::config::{DeployerConfig, EngineConfig};
use flowcall_core::error::{FlowcallError, Result};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::{Arc, RwLock};

pub const ENV_SESSION_TTL_SECS: &str = "FLOWCALL_SESSION_TTL_SECS";
pub const ENV_SWEEP_INTERVAL_SECS: &str = "FLOWCALL_SWEEP_INTERVAL_SECS";
pub const ENV_BACKEND_URL: &str = "FLOWCALL_BACKEND_URL";
pub const ENV_N8N_URL: &str = "FLOWCALL_N8N_URL";
pub const ENV_N8N_API_KEY: &str = "FLOWCALL_N8N_API_KEY";
pub const ENV_CATALOG_ENABLED: &str = "FLOWCALL_CATALOG_ENABLED";
pub const ENV_SEARCH_LIMIT: &str = "FLOWCALL_SEARCH_LIMIT";

/// Configuration service that loads and caches the engine configuration.
///
/// A missing file is not an error: defaults are used. A file that exists but
/// does not parse is.
#[derive(Debug, Clone)]
pub struct ConfigService {
    /// Explicit file, or `None` for the platform default location
    path: Option<PathBuf>,
    config: Arc<RwLock<Option<EngineConfig>>>,
}

impl ConfigService {
    /// Uses the platform default config location.
    pub fn new() -> Self {
        Self {
            path: None,
            config: Arc::new(RwLock::new(None)),
        }
    }

    /// Uses an explicit config file.
    pub fn with_path(path: impl Into<PathBuf>) -> Self {
        Self {
            path: Some(path.into()),
            config: Arc::new(RwLock::new(None)),
        }
    }

    pub fn config_path(&self) -> Result<PathBuf> {
        match &self.path {
            Some(path) => Ok(path.clone()),
            None => FlowcallPaths::config_file(),
        }
    }

    /// Gets the configuration, loading it on first access.
    pub fn get_config(&self) -> Result<EngineConfig> {
        {
            let cached = self.config.read().unwrap_or_else(|e| e.into_inner());
            if let Some(config) = cached.as_ref() {
                return Ok(config.clone());
            }
        }

        let mut config = Self::load_file(&self.config_path()?)?;
        apply_env_overrides(&mut config, std::env::vars())?;

        let mut cached = self.config.write().unwrap_or_else(|e| e.into_inner());
        *cached = Some(config.clone());
        Ok(config)
    }

    /// Invalidates the cache, forcing a reload on next access.
    pub fn invalidate_cache(&self) {
        let mut cached = self.config.write().unwrap_or_else(|e| e.into_inner());
        *cached = None;
    }

    /// Reads `path` without environment overrides.
    pub fn load_file(path: &Path) -> Result<EngineConfig> {
        if !path.exists() {
            tracing::debug!(path = %path.display(), "No config file, using defaults");
            return Ok(EngineConfig::default());
        }
        let content = std::fs::read_to_string(path).map_err(|e| {
            FlowcallError::config(format!("Failed to read {}: {}", path.display(), e))
        })?;
        let config: EngineConfig = toml::from_str(&content).map_err(|e| {
            FlowcallError::config(format!("Failed to parse {}: {}", path.display(), e))
        })?;
        tracing::info!(path = %path.display(), "Loaded config");
        Ok(config)
    }

    /// Renders `config` in the on-disk format.
    pub fn to_toml(config: &EngineConfig) -> Result<String> {
        Ok(toml::to_string_pretty(config)?)
    }
}

impl Default for ConfigService {
    fn default() -> Self {
        Self::new()
    }
}

/// Applies `FLOWCALL_*` overrides from `vars` onto `config`.
///
/// The n8n deployer is created from the environment only when both its URL
/// and API key are present; otherwise a single variable patches an existing
/// `[deployer]` section.
pub fn apply_env_overrides<I>(config: &mut EngineConfig, vars: I) -> Result<()>
where
    I: IntoIterator<Item = (String, String)>,
{
    let mut n8n_url = None;
    let mut n8n_api_key = None;

    for (key, value) in vars {
        let value = value.trim().to_string();
        match key.as_str() {
            ENV_SESSION_TTL_SECS => config.session.ttl_secs = parse_env(&key, &value)?,
            ENV_SWEEP_INTERVAL_SECS => {
                config.session.sweep_interval_secs = parse_env(&key, &value)?
            }
            ENV_BACKEND_URL => config.generator.base_url = value,
            ENV_N8N_URL => n8n_url = Some(value),
            ENV_N8N_API_KEY => n8n_api_key = Some(value),
            ENV_CATALOG_ENABLED => config.catalog.enabled = parse_env(&key, &value)?,
            ENV_SEARCH_LIMIT => config.catalog.search_limit = parse_env(&key, &value)?,
            _ => {}
        }
    }

    if let Some(deployer) = config.deployer.as_mut() {
        if let Some(url) = n8n_url {
            deployer.base_url = url;
        }
        if let Some(key) = n8n_api_key {
            deployer.api_key = key;
        }
    } else {
        match (n8n_url, n8n_api_key) {
            (Some(base_url), Some(api_key)) => {
                config.deployer = Some(DeployerConfig { base_url, api_key });
            }
            (None, None) => {}
            _ => tracing::warn!(
                "Both {} and {} are needed to enable deployment",
                ENV_N8N_URL,
                ENV_N8N_API_KEY
            ),
        }
    }
    Ok(())
}

fn parse_env<T: FromStr>(key: &str, value: &str) -> Result<T> {
    value
        .parse()
        .map_err(|_| FlowcallError::config(format!("{} has an invalid value: '{}'", key, value)))
}
