use log::debug;
use reqwest::Client;
use std::time::Duration;

use crate::config::QueryConfig;
use crate::error::{PluginError, Result};

/// Overall deadline for one query, connection included.
pub const DEFAULT_DEADLINE: Duration = Duration::from_secs(20);
/// Timeout configured on the underlying HTTP client.
pub const DEFAULT_CLIENT_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Clone, Debug)]
pub struct LokiClient {
    client: Client,
    deadline: Duration,
    client_timeout: Duration,
}

impl LokiClient {
    pub fn new() -> Result<Self> {
        Self::with_timeouts(DEFAULT_DEADLINE, DEFAULT_CLIENT_TIMEOUT)
    }

    pub fn with_timeouts(deadline: Duration, client_timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(client_timeout)
            .build()
            .map_err(PluginError::Request)?;
        Ok(Self {
            client,
            deadline,
            client_timeout,
        })
    }

    /// Effective upper bound on a single query.
    pub fn timeout(&self) -> Duration {
        self.deadline.min(self.client_timeout)
    }

    /// Runs the query once and returns the raw response body.
    ///
    /// The query text travels in the body of a GET request. Basic auth is
    /// attached only when both username and password are configured. Any
    /// status of 300 or above is an error.
    pub async fn query(&self, config: &QueryConfig) -> Result<Vec<u8>> {
        let mut builder = self.client.get(&config.address).body(config.query.clone());
        if let Some((username, password)) = config.credentials() {
            builder = builder.basic_auth(username, Some(password));
        }
        let request = builder.build().map_err(PluginError::Request)?;

        debug!(
            "Sending loki query to {} (timeout {:?})",
            request.url(),
            self.timeout()
        );
        match tokio::time::timeout(self.deadline, self.send(request)).await {
            Ok(result) => result,
            Err(_) => Err(PluginError::DeadlineExceeded(self.deadline)),
        }
    }

    async fn send(&self, request: reqwest::Request) -> Result<Vec<u8>> {
        let response = self
            .client
            .execute(request)
            .await
            .map_err(|e| self.transport_error(e))?;

        let status = response.status();
        debug!("Loki responded with {}", status);
        if status.as_u16() > 299 {
            return Err(PluginError::UpstreamStatus(status.to_string()));
        }

        let body = response.bytes().await.map_err(|e| self.transport_error(e))?;
        Ok(body.to_vec())
    }

    fn transport_error(&self, err: reqwest::Error) -> PluginError {
        if err.is_timeout() {
            PluginError::DeadlineExceeded(self.client_timeout)
        } else {
            PluginError::Transport(err)
        }
    }
}
