use std::collections::HashMap;
use std::sync::Arc;

use axum::extract::{Path, State};
use axum::routing::{get, post};
use axum::{Json, Router};
use quire_core::fetch::parse_http_url;
use quire_core::{
    DiscoveredFeed, DiscoveryCache, DiscoveryConfig, ExtractedArticle, ExtractorRegistry, FeedItem, Fetcher,
    ItemStore, SyncResult, discover_feeds, fetch_and_extract, sync_items, unread_counts,
};
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::error::ApiError;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn ItemStore>,
    pub fetcher: Arc<dyn Fetcher>,
    pub registry: Arc<ExtractorRegistry>,
    pub discovery: Arc<DiscoveryConfig>,
    pub cache: Arc<DiscoveryCache>,
}

impl AppState {
    pub fn new(store: Arc<dyn ItemStore>, fetcher: Arc<dyn Fetcher>, discovery: DiscoveryConfig) -> Self {
        Self {
            store,
            fetcher,
            registry: Arc::new(ExtractorRegistry::builtin()),
            cache: Arc::new(DiscoveryCache::new(discovery.cache_ttl)),
            discovery: Arc::new(discovery),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct DiscoverRequest {
    pub query: String,
}

#[derive(Debug, Deserialize)]
pub struct ExtractRequest {
    pub url: String,
}

#[derive(Debug, Deserialize)]
pub struct SyncRequest {
    #[serde(alias = "userId")]
    pub user_id: String,
    #[serde(default)]
    pub items: Vec<FeedItem>,
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    status: &'static str,
    version: &'static str,
    #[serde(with = "time::serde::rfc3339")]
    time: OffsetDateTime,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/api/discover", post(discover))
        .route("/api/extract", post(extract))
        .route("/api/feeds/{feed_id}/sync", post(sync_feed))
        .route("/api/users/{user_id}/unread", get(unread))
        .with_state(state)
}

async fn health() -> Json<HealthResponse> {
    Json(HealthResponse { status: "ok", version: env!("CARGO_PKG_VERSION"), time: OffsetDateTime::now_utc() })
}

async fn discover(
    State(state): State<AppState>, Json(req): Json<DiscoverRequest>,
) -> Result<Json<Vec<DiscoveredFeed>>, ApiError> {
    let query = req.query.trim();
    if query.is_empty() {
        return Err(ApiError::BadRequest("query must not be empty".to_string()));
    }

    let feeds = discover_feeds(query, state.fetcher.as_ref(), &state.discovery, Some(&state.cache)).await?;
    Ok(Json(feeds))
}

async fn extract(
    State(state): State<AppState>, Json(req): Json<ExtractRequest>,
) -> Result<Json<ExtractedArticle>, ApiError> {
    let url = parse_http_url(req.url.trim())?;
    let article = fetch_and_extract(&url, state.fetcher.as_ref(), &state.discovery.fetch, &state.registry).await?;
    Ok(Json(article))
}

async fn sync_feed(
    State(state): State<AppState>, Path(feed_id): Path<String>, Json(req): Json<SyncRequest>,
) -> Result<Json<SyncResult>, ApiError> {
    if req.user_id.trim().is_empty() {
        return Err(ApiError::BadRequest("user_id must not be empty".to_string()));
    }

    let result = sync_items(state.store.as_ref(), &req.user_id, &feed_id, &req.items).await;
    tracing::info!(
        feed_id = %feed_id,
        added = result.added,
        existing = result.existing,
        errors = result.errors.len(),
        "synced feed"
    );
    Ok(Json(result))
}

async fn unread(
    State(state): State<AppState>, Path(user_id): Path<String>,
) -> Result<Json<HashMap<String, u64>>, ApiError> {
    let counts = unread_counts(state.store.as_ref(), &user_id).await?;
    Ok(Json(counts))
}
