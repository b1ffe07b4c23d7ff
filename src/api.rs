// src/api.rs
use axum::{
    extract::{Path, Query, State},
    http::{HeaderName, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tower_http::cors::CorsLayer;

use crate::cache::{Aggregator, EntryState};
use crate::config::TrendsConfig;
use crate::error::ValidationError;
use crate::model::SourceId;
use crate::query::QueryService;
use crate::resilience::Resilience;
use crate::sources::build_adapters;

/// Diagnostic header carrying the cache state behind a `/trends` response.
pub const TRENDS_STATE_HEADER: HeaderName = HeaderName::from_static("x-trends-state");

#[derive(Clone)]
pub struct AppState {
    query: QueryService,
}

impl AppState {
    pub fn new(query: QueryService) -> Self {
        Self { query }
    }

    /// Wire adapters, resilience and cache from configuration.
    pub fn from_config(cfg: &TrendsConfig) -> anyhow::Result<Self> {
        let adapters = build_adapters(cfg)?;
        let resilience = Resilience::new(adapters, cfg);
        let aggregator = Aggregator::new(resilience, cfg.service.ttl);
        Ok(Self::new(QueryService::new(aggregator)))
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(|| async { "OK" }))
        .route("/sources", get(list_sources))
        .route("/trends/{source}", get(trends))
        .layer(CorsLayer::very_permissive())
        .with_state(state)
}

#[derive(Debug, Default, Deserialize)]
struct TrendsParams {
    #[serde(default)]
    q: Option<String>,
    #[serde(default)]
    refresh: Option<String>,
}

impl TrendsParams {
    fn force_refresh(&self) -> bool {
        matches!(
            self.refresh.as_deref().map(str::trim),
            Some("1" | "true" | "yes")
        )
    }
}

async fn trends(
    State(state): State<AppState>,
    Path(source): Path<String>,
    Query(params): Query<TrendsParams>,
) -> Result<Response, ApiError> {
    let result = state
        .query
        .query_with(&source, params.q.as_deref(), params.force_refresh())
        .await?;
    let header = HeaderValue::from_static(result.state.as_str());
    Ok(([(TRENDS_STATE_HEADER, header)], Json(result.items)).into_response())
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct SourceStatus {
    id: SourceId,
    state: EntryState,
    fetched_at: Option<DateTime<Utc>>,
    items: usize,
}

async fn list_sources(State(state): State<AppState>) -> Json<Vec<SourceStatus>> {
    let out = state
        .query
        .aggregator()
        .entries()
        .into_iter()
        .map(|e| SourceStatus {
            id: e.source_id,
            state: e.state,
            fetched_at: e.fetched_at,
            items: e.items.len(),
        })
        .collect();
    Json(out)
}

#[derive(Debug)]
pub struct ApiError(ValidationError);

impl From<ValidationError> for ApiError {
    fn from(e: ValidationError) -> Self {
        Self(e)
    }
}

#[derive(Serialize)]
struct ErrorBody {
    message: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            message: self.0.to_string(),
        };
        (StatusCode::BAD_REQUEST, Json(body)).into_response()
    }
}
