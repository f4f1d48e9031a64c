//! Engine configuration model.
//!
//! The on-disk format is TOML; loading and environment overrides live in
//! `flowcall-infrastructure`.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Default idle time after which a session is evicted (30 minutes).
pub const DEFAULT_SESSION_TTL_SECS: u64 = 30 * 60;
/// Default interval between eviction sweeps.
pub const DEFAULT_SWEEP_INTERVAL_SECS: u64 = 60;
/// Default number of catalog results returned by `searchNodes`.
pub const DEFAULT_SEARCH_LIMIT: usize = 5;
/// Default backend that hosts the generation and search endpoints.
pub const DEFAULT_BACKEND_URL: &str = "http://localhost:3001";

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq, Default)]
pub struct EngineConfig {
    #[serde(default)]
    pub session: SessionConfig,
    #[serde(default)]
    pub generator: GeneratorConfig,
    /// Absent means workflows are marked deployed without an external id.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deployer: Option<DeployerConfig>,
    #[serde(default)]
    pub catalog: CatalogConfig,
}

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
pub struct SessionConfig {
    #[serde(default = "default_ttl_secs")]
    pub ttl_secs: u64,
    #[serde(default = "default_sweep_interval_secs")]
    pub sweep_interval_secs: u64,
}

impl SessionConfig {
    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_secs)
    }

    pub fn sweep_interval(&self) -> Duration {
        // tokio::time::interval panics on a zero period
        Duration::from_secs(self.sweep_interval_secs.max(1))
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            ttl_secs: DEFAULT_SESSION_TTL_SECS,
            sweep_interval_secs: DEFAULT_SWEEP_INTERVAL_SECS,
        }
    }
}

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
pub struct GeneratorConfig {
    #[serde(default = "default_backend_url")]
    pub base_url: String,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            base_url: default_backend_url(),
        }
    }
}

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
pub struct DeployerConfig {
    /// Base URL of the n8n instance, e.g. `https://n8n.example.com`
    pub base_url: String,
    pub api_key: String,
}

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
pub struct CatalogConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default = "default_search_limit")]
    pub search_limit: usize,
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            search_limit: DEFAULT_SEARCH_LIMIT,
        }
    }
}

fn default_ttl_secs() -> u64 {
    DEFAULT_SESSION_TTL_SECS
}

fn default_sweep_interval_secs() -> u64 {
    DEFAULT_SWEEP_INTERVAL_SECS
}

fn default_backend_url() -> String {
    DEFAULT_BACKEND_URL.to_string()
}

fn default_search_limit() -> usize {
    DEFAULT_SEARCH_LIMIT
}

fn default_true() -> bool {
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_toml_yields_defaults() {
        let config: EngineConfig = toml::from_str("").unwrap();
        assert_eq!(config, EngineConfig::default());
        assert_eq!(config.session.ttl(), Duration::from_secs(1800));
        assert!(config.deployer.is_none());
    }

    #[test]
    fn test_partial_sections() {
        let config: EngineConfig = toml::from_str(
            r#"
            [session]
            ttl_secs = 120

            [deployer]
            base_url = "https://n8n.local"
            api_key = "secret"
            "#,
        )
        .unwrap();

        assert_eq!(config.session.ttl_secs, 120);
        assert_eq!(config.session.sweep_interval_secs, DEFAULT_SWEEP_INTERVAL_SECS);
        assert_eq!(config.deployer.unwrap().base_url, "https://n8n.local");
        assert_eq!(config.catalog.search_limit, DEFAULT_SEARCH_LIMIT);
    }

    #[test]
    fn test_zero_sweep_interval_is_clamped() {
        let session = SessionConfig {
            ttl_secs: 1,
            sweep_interval_secs: 0,
        };
        assert_eq!(session.sweep_interval(), Duration::from_secs(1));
    }
}
