//! HTTP plumbing shared by the provider clients.

use std::time::Duration;

use super::config::LlmTimeouts;
use super::types::LlmError;

/// Build a reqwest client with the configured timeouts.
pub(crate) fn build_client(timeouts: LlmTimeouts) -> Result<reqwest::Client, LlmError> {
    reqwest::Client::builder()
        .timeout(Duration::from_secs(timeouts.request_secs))
        .connect_timeout(Duration::from_secs(timeouts.connect_secs))
        .build()
        .map_err(|e| LlmError::HttpClientBuild(e.to_string()))
}

/// Send a prepared request and return the body of a 200 reply. Any other
/// status becomes `ApiResponse` carrying the body for logging.
pub(crate) async fn send_for_text(request: reqwest::RequestBuilder) -> Result<String, LlmError> {
    let response = request
        .send()
        .await
        .map_err(|e| LlmError::ApiRequest(e.to_string()))?;

    let status = response.status().as_u16();
    let body = response
        .text()
        .await
        .map_err(|e| LlmError::ApiRequest(e.to_string()))?;
    if status != 200 {
        return Err(LlmError::ApiResponse { status, body });
    }
    Ok(body)
}
