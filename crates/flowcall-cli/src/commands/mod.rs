pub mod config;
pub mod lint;
pub mod replay;

use flowcall_infrastructure::ConfigService;
use std::path::Path;

fn config_service(config_path: Option<&Path>) -> ConfigService {
    match config_path {
        Some(path) => ConfigService::with_path(path),
        None => ConfigService::new(),
    }
}
