//! HTTP client utilities.

use reqwest::Client;
use std::sync::Arc;
use std::time::Duration;

use crate::sources::SourceError;

/// Shared HTTP client with explicit timeouts
#[derive(Debug, Clone)]
pub struct HttpClient {
    client: Arc<Client>,
}

impl HttpClient {
    /// Create a client with the crate's user agent and the given timeouts
    pub fn new(request_timeout: Duration, connect_timeout: Duration) -> Result<Self, SourceError> {
        let client = Client::builder()
            .user_agent(concat!(
                env!("CARGO_PKG_NAME"),
                "/",
                env!("CARGO_PKG_VERSION")
            ))
            .timeout(request_timeout)
            .connect_timeout(connect_timeout)
            .pool_idle_timeout(Duration::from_secs(90))
            .build()
            .map_err(|e| SourceError::Transport(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client: Arc::new(client),
        })
    }

    /// GET `url` with `params` and return the body of a successful response.
    ///
    /// `endpoint` names the service in errors and logs.
    pub async fn get_text(
        &self,
        url: &str,
        params: &[(&str, String)],
        endpoint: &str,
    ) -> Result<String, SourceError> {
        tracing::debug!("GET {} ({} query parameters)", url, params.len());

        let response = self
            .client
            .get(url)
            .query(params)
            .send()
            .await
            .map_err(|e| SourceError::Transport(format!("{} request failed: {}", endpoint, e)))?;

        let status = response.status();
        if !status.is_success() {
            tracing::warn!("{} returned status {}", endpoint, status);
            return Err(SourceError::Status {
                status: status.as_u16(),
                endpoint: endpoint.to_string(),
            });
        }

        response
            .text()
            .await
            .map_err(|e| SourceError::Transport(format!("Failed to read {} response: {}", endpoint, e)))
    }
}
