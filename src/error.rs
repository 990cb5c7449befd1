//! Error taxonomy for the archived-feeds service.
//!
//! Every failure is tagged at the point it happens, so the HTTP layer maps
//! variants to status codes with a plain match instead of inspecting message
//! text.

use axum::http::StatusCode;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ApiError {
    /// The feed id failed local validation; no network call was made.
    #[error("{0}")]
    Validation(String),

    /// Token exchange or upstream authentication failed.
    #[error("{0}")]
    Auth(String),

    /// The registry call failed or returned an unexpected status.
    #[error("{0}")]
    Fetch(String),

    /// The registry answered HTTP 404 for the requested feed.
    #[error("feed not found in MobilityDatabase")]
    Upstream404,
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Validation(_) => StatusCode::BAD_REQUEST,
            ApiError::Auth(_) => StatusCode::UNAUTHORIZED,
            ApiError::Fetch(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::Upstream404 => StatusCode::NOT_FOUND,
        }
    }
}
