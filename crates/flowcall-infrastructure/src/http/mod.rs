//! HTTP-backed collaborators.
//!
//! - `backend`: the workflow-generation backend (`/api/pipecat/*`), which
//!   hosts both the generator and the node catalog
//! - `n8n`: the n8n public REST API used for deployment

mod backend;
mod n8n;

pub use backend::{HttpNodeCatalog, HttpWorkflowGenerator};
pub use n8n::N8nDeploymentClient;

use flowcall_core::error::{FlowcallError, Result};
use reqwest::RequestBuilder;
use serde::de::DeserializeOwned;

/// Sends `request` and decodes a JSON body, mapping every failure with `fail`.
pub(crate) async fn send_json<T: DeserializeOwned>(
    request: RequestBuilder,
    fail: fn(String) -> FlowcallError,
) -> Result<T> {
    match request.send().await {
        Ok(response) if response.status().is_success() => response
            .json::<T>()
            .await
            .map_err(|e| fail(format!("Unexpected response: {}", e))),
        Ok(response) => {
            let status = response.status();
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            Err(fail(format!("{} {}", status, error_text.trim())))
        }
        Err(e) => Err(fail(format!("Request failed: {}", e))),
    }
}

/// Joins a base URL and an absolute path without doubling slashes.
pub(crate) fn endpoint(base_url: &str, path: &str) -> String {
    format!("{}{}", base_url.trim_end_matches('/'), path)
}
