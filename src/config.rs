//! Process configuration, read once at startup.

/// MobilityDatabase API base URL.
pub const MOBILITY_DB_API: &str = "https://api.mobilitydatabase.org/v1";

/// MobilityDatabase token endpoint.
pub const TOKEN_ENDPOINT: &str = "https://api.mobilitydatabase.org/v1/tokens";

#[derive(Debug, Clone)]
pub struct Config {
    /// Refresh token for the registry. When absent, registry calls are made
    /// without an `Authorization` header and may be rejected upstream.
    pub refresh_token: Option<String>,
    pub api_base: String,
    pub token_endpoint: String,
}

impl Config {
    /// Builds the config from the environment (`.env` is loaded by the
    /// binary before this runs).
    pub fn from_env() -> Self {
        let refresh_token = std::env::var("MOBILITY_DB_REFRESH_TOKEN")
            .ok()
            .filter(|t| !t.is_empty());

        Self {
            refresh_token,
            api_base: MOBILITY_DB_API.to_string(),
            token_endpoint: TOKEN_ENDPOINT.to_string(),
        }
    }
}
