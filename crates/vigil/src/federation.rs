//! Federation with peer instances.
//!
//! Peers serve their persisted state over plain HTTP. Each configured
//! endpoint is fetched in turn and its checks are merged into the local
//! state; the fetch itself is recorded as a synthetic check so that an
//! unreachable peer shows up in the report.

use anyhow::Result;
use tokio::time::{Instant, timeout_at};
use tracing::{info, warn};
use url::Url;

use crate::check::CheckResult;
use crate::error::FederationError;
use crate::state::State;
use crate::status::StatusCode;

/// Name of the synthetic check recording the outcome of querying `endpoint`
pub fn endpoint_check_name(endpoint: &str) -> String {
    format!("Federated endpoint {}", endpoint)
}

/// Record every endpoint as CRITICAL when no client could be built
pub fn record_unavailable(endpoints: &[String], reason: &str, state: &mut State) {
    for endpoint in endpoints {
        warn!("Federated endpoint {} not queried: {}", endpoint, reason);
        state.update(failed(endpoint, reason));
    }
}

fn failed(endpoint: &str, reason: &str) -> CheckResult {
    CheckResult::new(endpoint_check_name(endpoint), StatusCode::Critical, reason).federated()
}

/// Federation client
pub struct Federation {
    client: reqwest::Client,
}

impl Federation {
    pub fn new() -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(concat!("vigil/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self { client })
    }

    /// Query all endpoints sequentially and merge their state
    ///
    /// A failing endpoint is recorded as CRITICAL and does not stop the
    /// remaining ones.
    pub async fn merge_all(&self, deadline: Instant, endpoints: &[String], state: &mut State) {
        for endpoint in endpoints {
            info!("Querying federated endpoint {}", endpoint);

            let result = match self.merge_endpoint(deadline, endpoint, state).await {
                Ok(len) => CheckResult::new(
                    endpoint_check_name(endpoint),
                    StatusCode::Ok,
                    format!("OK: Federated endpoint returned {} bytes", len),
                )
                .federated(),
                Err(e) => {
                    warn!("Federated endpoint {} failed: {}", endpoint, e);
                    failed(endpoint, &e.to_string())
                }
            };

            state.update(result);
        }
    }

    /// Fetch one peer and merge it, returning the payload size
    async fn merge_endpoint(
        &self,
        deadline: Instant,
        endpoint: &str,
        state: &mut State,
    ) -> Result<usize, FederationError> {
        let url = Url::parse(endpoint)?;
        let bytes = timeout_at(deadline, self.fetch(url))
            .await
            .map_err(|_| FederationError::Timeout)??;

        state.merge_from_slice(&bytes)?;
        Ok(bytes.len())
    }

    async fn fetch(&self, url: Url) -> Result<Vec<u8>, FederationError> {
        let response = self.client.get(url).send().await?.error_for_status()?;
        Ok(response.bytes().await?.to_vec())
    }
}
