// src/lib.rs
// Public library surface for the binary and integration tests.

pub mod api;
pub mod cache;
pub mod config;
pub mod error;
pub mod fallback;
pub mod metrics;
pub mod model;
pub mod normalize;
pub mod query;
pub mod resilience;
pub mod sources;

pub use crate::api::router;
pub use crate::cache::{Aggregator, CacheEntry, EntryState};
pub use crate::model::{SourceId, TrendItem};
pub use crate::query::{QueryResult, QueryService};

use axum::Router;
use tracing::info;

use crate::api::AppState;
use crate::config::TrendsConfig;
use crate::metrics::Metrics;

/// Build the full in-process app from the default configuration: trends
/// routes plus `/metrics`.
pub async fn app() -> anyhow::Result<Router> {
    let cfg = TrendsConfig::load_default()?;
    app_with(&cfg)
}

pub fn app_with(cfg: &TrendsConfig) -> anyhow::Result<Router> {
    let metrics = Metrics::init(cfg.service.ttl)?;
    let state = AppState::from_config(cfg)?;
    info!(
        region = %cfg.service.region,
        ttl_secs = cfg.service.ttl.map_or(0, |t| t.as_secs()),
        browser = cfg.service.webdriver_url.is_some(),
        "trend engine ready"
    );
    Ok(router(state).merge(metrics.router()))
}
