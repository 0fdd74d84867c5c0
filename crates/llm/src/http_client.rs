//! HTTP Client Factory
//!
//! Provides a factory function for building reqwest clients with a request timeout.

use std::time::Duration;

use crate::types::{LlmError, LlmResult};

/// Build a `reqwest::Client` with the given request timeout.
///
/// Proxy environment variables are ignored so that requests go straight to
/// the configured endpoint.
pub fn build_http_client(timeout: Duration) -> LlmResult<reqwest::Client> {
    reqwest::Client::builder()
        .no_proxy()
        .timeout(timeout)
        .build()
        .map_err(|e| LlmError::Other {
            message: format!("failed to build HTTP client: {}", e),
        })
}
