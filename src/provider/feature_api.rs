use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use std::collections::HashMap;
use std::time::Duration;

use super::{FeatureProvider, Period};
use crate::error::FetchError;
use crate::models::FeatureSnapshot;

// Self-hosted feature service; override with STOCKBOT_FEATURES_URL.
const DEFAULT_BASE_URL: &str = "http://localhost:8787/api/v1";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Client for the feature snapshot service.
///
/// The service computes the indicators; this client only maps its HTTP
/// responses onto the `FetchError` classification the batch layer retries
/// against. Rate limiting and retries live with the caller, not here.
#[derive(Clone)]
pub struct FeatureApiClient {
    client: Client,
    base_url: String,
}

#[derive(Debug, Deserialize)]
struct SnapshotResponse {
    symbol: String,
    as_of: DateTime<Utc>,
    features: HashMap<String, f64>,
}

impl FeatureApiClient {
    pub fn new() -> Self {
        Self::with_base_url(DEFAULT_BASE_URL)
    }

    pub fn with_base_url(base_url: impl Into<String>) -> Self {
        let mut base_url = base_url.into();
        while base_url.ends_with('/') {
            base_url.pop();
        }
        Self {
            client: Client::new(),
            base_url,
        }
    }
}

impl Default for FeatureApiClient {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl FeatureProvider for FeatureApiClient {
    async fn fetch(&self, symbol: &str, period: Period) -> Result<FeatureSnapshot, FetchError> {
        let url = format!(
            "{}/snapshot/{}?period={}",
            self.base_url,
            symbol,
            period.as_str()
        );

        let response = self
            .client
            .get(&url)
            .timeout(REQUEST_TIMEOUT)
            .send()
            .await
            .map_err(|e| FetchError::Transient(e.to_string()))?;

        match response.status() {
            StatusCode::NOT_FOUND => Err(FetchError::NotFound(symbol.to_string())),
            StatusCode::TOO_MANY_REQUESTS => {
                tracing::warn!("⚠️ feature service throttling us on {}", symbol);
                Err(FetchError::Throttled)
            }
            status if status.is_server_error() => {
                Err(FetchError::Transient(format!("server error {status}")))
            }
            status if status.is_success() => {
                let body: SnapshotResponse = response
                    .json()
                    .await
                    .map_err(|e| FetchError::Transient(format!("bad response body: {e}")))?;
                Ok(FeatureSnapshot::new(body.symbol, body.as_of, body.features))
            }
            status => Err(FetchError::Transient(format!("unexpected status {status}"))),
        }
    }
}
