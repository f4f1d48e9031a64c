//! Infrastructure layer for flowcall.
//!
//! File-backed configuration and the HTTP implementations of the
//! collaborator traits defined in `flowcall-core`.

pub mod config_service;
pub mod http;
pub mod paths;

pub use config_service::ConfigService;
pub use http::{HttpNodeCatalog, HttpWorkflowGenerator, N8nDeploymentClient};
pub use paths::FlowcallPaths;
