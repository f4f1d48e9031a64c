//! Path management for flowcall files.
//!
//! ```text
//! ~/.config/flowcall/          # Config directory
//! └── config.toml              # Engine configuration
//!
//! ~/.local/share/flowcall/     # Data directory
//! └── logs/                    # Rolling log files
//!     └── flowcall.log.YYYY-MM-DD
//! ```

use flowcall_core::error::{FlowcallError, Result};
use std::path::PathBuf;

const APP_DIR: &str = "flowcall";
const CONFIG_FILE: &str = "config.toml";

/// Environment variable naming an explicit config file.
pub const CONFIG_PATH_ENV: &str = "FLOWCALL_CONFIG";

pub struct FlowcallPaths;

impl FlowcallPaths {
    /// Returns the flowcall configuration directory (e.g. `~/.config/flowcall/`).
    pub fn config_dir() -> Result<PathBuf> {
        dirs::config_dir()
            .map(|dir| dir.join(APP_DIR))
            .ok_or_else(|| FlowcallError::config("Cannot find the user config directory"))
    }

    /// Returns the flowcall data directory (e.g. `~/.local/share/flowcall/`).
    pub fn data_dir() -> Result<PathBuf> {
        dirs::data_local_dir()
            .map(|dir| dir.join(APP_DIR))
            .ok_or_else(|| FlowcallError::config("Cannot find the user data directory"))
    }

    /// Config file location: `$FLOWCALL_CONFIG` when set, otherwise
    /// `config.toml` inside [`Self::config_dir`].
    pub fn config_file() -> Result<PathBuf> {
        match std::env::var_os(CONFIG_PATH_ENV) {
            Some(path) if !path.is_empty() => Ok(PathBuf::from(path)),
            _ => Ok(Self::config_dir()?.join(CONFIG_FILE)),
        }
    }

    pub fn log_dir() -> Result<PathBuf> {
        Ok(Self::data_dir()?.join("logs"))
    }
}
