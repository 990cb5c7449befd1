//! Refresh-token exchange and access-token caching for the MobilityDatabase
//! API.
//!
//! The cache holds one token per process. The mutex stays locked across a
//! refresh, so concurrent requests that find the token expired trigger a
//! single upstream exchange instead of a thundering herd.

use chrono::{DateTime, Duration as ChronoDuration, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::{debug, info};

use crate::error::ApiError;

/// Refresh the token this many seconds before it actually expires.
const EXPIRY_MARGIN_SECS: i64 = 60;

/// Fallback lifetime when the token endpoint omits `expires_in`.
const DEFAULT_EXPIRES_IN_SECS: i64 = 3600;

#[derive(Serialize)]
struct TokenRequest<'a> {
    refresh_token: &'a str,
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: Option<String>,
    expires_in: Option<i64>,
}

struct CachedToken {
    access_token: String,
    expires_at: DateTime<Utc>,
}

/// Single-slot access token cache, constructed once per process and shared
/// through the server state.
pub struct TokenCache {
    token_endpoint: String,
    state: Mutex<Option<CachedToken>>,
}

impl TokenCache {
    pub fn new(token_endpoint: String) -> Self {
        Self {
            token_endpoint,
            state: Mutex::new(None),
        }
    }

    /// Returns the cached access token while it is still fresh, exchanging
    /// the refresh token for a new one otherwise.
    pub async fn get_valid_token(&self, refresh_token: &str) -> Result<String, ApiError> {
        let mut state = self.state.lock().await;

        if let Some(cached) = state.as_ref() {
            if Utc::now() < cached.expires_at {
                debug!("Using cached access token");
                return Ok(cached.access_token.clone());
            }
        }

        let refreshed = self.refresh(refresh_token).await?;
        let access_token = refreshed.access_token.clone();
        *state = Some(refreshed);

        Ok(access_token)
    }

    async fn refresh(&self, refresh_token: &str) -> Result<CachedToken, ApiError> {
        if refresh_token.len() < 10 {
            return Err(ApiError::Auth("Invalid refresh token format".to_string()));
        }

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .map_err(|e| ApiError::Auth(format!("Failed to refresh access token: {e}")))?;

        let response = client
            .post(&self.token_endpoint)
            .json(&TokenRequest { refresh_token })
            .send()
            .await
            .map_err(|e| ApiError::Auth(format!("Failed to refresh access token: {e}")))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(ApiError::Auth(format!(
                "Token refresh failed with status {status}: {body}"
            )));
        }

        let data: TokenResponse = response
            .json()
            .await
            .map_err(|e| ApiError::Auth(format!("Failed to parse token response: {e}")))?;

        let access_token = data
            .access_token
            .ok_or_else(|| ApiError::Auth("No access token in response".to_string()))?;
        let expires_in = data.expires_in.unwrap_or(DEFAULT_EXPIRES_IN_SECS);

        let expires_at = Utc::now() + ChronoDuration::seconds(expires_in - EXPIRY_MARGIN_SECS);
        info!(expires_in, "Access token refreshed");

        Ok(CachedToken {
            access_token,
            expires_at,
        })
    }
}
