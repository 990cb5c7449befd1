//! Client for the MobilityDatabase feed registry.

use reqwest::StatusCode;
use reqwest::header::{ACCEPT, AUTHORIZATION, USER_AGENT};
use serde::Deserialize;
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, warn};
use url::Url;

use crate::auth::TokenCache;
use crate::error::ApiError;

const USER_AGENT_VALUE: &str = "archived-feeds-api/1.0";

/// One archived snapshot of a feed, as returned by the registry.
///
/// Every field is optional: the registry payload is not under our control and
/// records with missing keys must still format into CSV rows.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Dataset {
    #[serde(default)]
    pub service_date_range_start: Option<String>,
    #[serde(default)]
    pub service_date_range_end: Option<String>,
    #[serde(default)]
    pub downloaded_at: Option<String>,
    #[serde(default)]
    pub hosted_url: Option<String>,
    #[serde(default)]
    pub note: Option<String>,
}

pub struct RegistryClient {
    base_url: String,
    refresh_token: Option<String>,
    token_cache: TokenCache,
}

impl RegistryClient {
    pub fn new(base_url: String, refresh_token: Option<String>, token_cache: TokenCache) -> Self {
        Self {
            base_url,
            refresh_token,
            token_cache,
        }
    }

    /// Fetches all archived datasets for a feed.
    ///
    /// An empty list is a valid answer, not an error. Failures are tagged:
    /// upstream 401 becomes [`ApiError::Auth`], upstream 404 becomes
    /// [`ApiError::Upstream404`], everything else [`ApiError::Fetch`].
    pub async fn fetch_datasets(&self, feed_id: &str) -> Result<Vec<Dataset>, ApiError> {
        let url = self.datasets_url(feed_id)?;
        debug!(feed_id, url = %url, "Fetching datasets");

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .connect_timeout(Duration::from_secs(10))
            .build()
            .map_err(fetch_error)?;

        let mut request = client
            .get(url)
            .header(ACCEPT, "application/json")
            .header(USER_AGENT, USER_AGENT_VALUE);

        if let Some(refresh_token) = &self.refresh_token {
            let token = self.token_cache.get_valid_token(refresh_token).await?;
            request = request.header(AUTHORIZATION, format!("Bearer {token}"));
        }

        let response = request.send().await.map_err(fetch_error)?;
        let status = response.status();

        match status {
            StatusCode::UNAUTHORIZED => Err(ApiError::Auth(
                "Unauthorized: failed to authenticate with MobilityDatabase; check MOBILITY_DB_REFRESH_TOKEN"
                    .to_string(),
            )),
            StatusCode::NOT_FOUND => Err(ApiError::Upstream404),
            status if !status.is_success() => {
                let body = response.text().await.unwrap_or_default();
                Err(ApiError::Fetch(format!(
                    "Failed to fetch datasets from MobilityDatabase: status {status}: {body}"
                )))
            }
            _ => {
                let body: Value = response.json().await.map_err(fetch_error)?;
                Ok(normalize_datasets(body))
            }
        }
    }

    fn datasets_url(&self, feed_id: &str) -> Result<Url, ApiError> {
        let mut url = Url::parse(&self.base_url)
            .map_err(|e| ApiError::Fetch(format!("Invalid registry base URL: {e}")))?;
        url.path_segments_mut()
            .map_err(|()| ApiError::Fetch("Invalid registry base URL".to_string()))?
            .pop_if_empty()
            .push("gtfs_feeds")
            .push(feed_id)
            .push("datasets");
        Ok(url)
    }
}

/// Normalizes the registry response shape.
///
/// The datasets endpoint has answered both with a bare array and with a
/// paginated object carrying a `results` key; anything else is treated as
/// "no datasets".
fn normalize_datasets(body: Value) -> Vec<Dataset> {
    let records = match body {
        Value::Object(mut map) => map.remove("results").unwrap_or(Value::Array(Vec::new())),
        array @ Value::Array(_) => array,
        _ => Value::Array(Vec::new()),
    };

    match records {
        Value::Array(items) => items
            .into_iter()
            .map(|item| {
                serde_json::from_value(item).unwrap_or_else(|e| {
                    warn!(error = %e, "Skipping malformed dataset record fields");
                    Dataset::default()
                })
            })
            .collect(),
        _ => Vec::new(),
    }
}

fn fetch_error(e: reqwest::Error) -> ApiError {
    ApiError::Fetch(format!(
        "Failed to fetch datasets from MobilityDatabase: {e}"
    ))
}
