//! HTTP surface: the four archived-feeds endpoints.

use axum::extract::{Query, State};
use axum::http::{HeaderValue, StatusCode, header};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use serde_json::json;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{error, info};

use crate::error::ApiError;
use crate::format::{format_archived_feeds, validate_feed_id};
use crate::registry::RegistryClient;

#[derive(Clone)]
pub struct AppState {
    pub registry: Arc<RegistryClient>,
}

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(index_handler))
        .route("/generate", get(generate_handler))
        .route("/download", get(download_handler))
        .route("/archived_feeds.txt", get(archived_feeds_txt_handler))
        .with_state(state)
}

struct FeedQuery {
    feed_id: Option<String>,
    filter_null_dates: bool,
}

fn parse_query(params: &HashMap<String, String>) -> FeedQuery {
    FeedQuery {
        feed_id: params.get("feed_id").cloned(),
        filter_null_dates: params
            .get("filter_null_dates")
            .is_some_and(|v| v.eq_ignore_ascii_case("true")),
    }
}

async fn index_handler() -> Json<serde_json::Value> {
    Json(json!({
        "message": "GTFS Archive Feed Generator",
        "endpoint": "/generate",
    }))
}

async fn generate_handler(
    State(state): State<AppState>,
    Query(params): Query<HashMap<String, String>>,
) -> Response {
    let query = parse_query(&params);

    if let Err(err) = validate_feed_id(query.feed_id.as_deref()) {
        return validation_response(&err, query.feed_id.as_deref());
    }
    let feed_id = query.feed_id.as_deref().unwrap_or_default();

    match state.registry.fetch_datasets(feed_id).await {
        Ok(datasets) if datasets.is_empty() => empty_result_response(feed_id),
        Ok(datasets) => {
            let content = format_archived_feeds(&datasets, query.filter_null_dates);
            info!(feed_id, datasets = datasets.len(), "Archived feeds generated");
            Json(json!({
                "content": content,
                // Mirrors the legacy API: dataset count with the header excluded.
                "count": datasets.len() - 1,
                "feed_id": feed_id,
            }))
            .into_response()
        }
        Err(err) => failure_response(&err, feed_id, "Failed to generate archived feeds"),
    }
}

async fn download_handler(
    State(state): State<AppState>,
    Query(params): Query<HashMap<String, String>>,
) -> Response {
    let query = parse_query(&params);

    if let Err(err) = validate_feed_id(query.feed_id.as_deref()) {
        return validation_response(&err, query.feed_id.as_deref());
    }
    let feed_id = query.feed_id.as_deref().unwrap_or_default();

    match state.registry.fetch_datasets(feed_id).await {
        Ok(datasets) if datasets.is_empty() => empty_result_response(feed_id),
        Ok(datasets) => {
            let content = format_archived_feeds(&datasets, query.filter_null_dates);
            info!(feed_id, datasets = datasets.len(), "Archived feeds download served");
            csv_attachment_response(content)
        }
        Err(err) => failure_response(&err, feed_id, "Failed to download archived feeds"),
    }
}

/// Compatibility route for clients that build the URL with path joining,
/// which drops query strings. Same behavior as `/download`.
async fn archived_feeds_txt_handler(
    state: State<AppState>,
    params: Query<HashMap<String, String>>,
) -> Response {
    download_handler(state, params).await
}

fn csv_attachment_response(content: String) -> Response {
    let mut response = (StatusCode::OK, content).into_response();
    let headers = response.headers_mut();
    headers.insert(header::CONTENT_TYPE, HeaderValue::from_static("text/csv"));
    headers.insert(
        header::CONTENT_DISPOSITION,
        HeaderValue::from_static("attachment; filename=\"archived_feeds.txt\""),
    );
    headers.insert(header::CACHE_CONTROL, HeaderValue::from_static("no-cache"));
    response
}

fn validation_response(err: &ApiError, feed_id: Option<&str>) -> Response {
    (
        err.status(),
        Json(json!({
            "error": err.to_string(),
            "feed_id": feed_id,
        })),
    )
        .into_response()
}

fn empty_result_response(feed_id: &str) -> Response {
    (
        StatusCode::NOT_FOUND,
        Json(json!({
            "error": "No datasets found for this feed ID",
            "feed_id": feed_id,
            "hint": "Verify the feed ID exists at https://mobilitydatabase.org",
        })),
    )
        .into_response()
}

fn failure_response(err: &ApiError, feed_id: &str, message: &str) -> Response {
    let error_text = match err {
        ApiError::Upstream404 => format!("Feed ID {feed_id} not found in MobilityDatabase"),
        other => other.to_string(),
    };
    error!(feed_id, status = %err.status(), error = %error_text, "Request failed");

    (
        err.status(),
        Json(json!({
            "error": error_text,
            "message": message,
            "feed_id": feed_id,
        })),
    )
        .into_response()
}
