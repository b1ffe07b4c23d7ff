// src/resilience.rs
//! Timeout, one immediate retry, then bundled fallback data.
//!
//! Every `FetchError`/`ExtractionError` is absorbed here; callers always get
//! displayable items back.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use metrics::{counter, histogram};
use tracing::{debug, info, warn};

use crate::config::TrendsConfig;
use crate::error::{ExtractionError, FetchCause, FetchError};
use crate::fallback;
use crate::model::{SourceId, TrendItem};
use crate::normalize::{normalize_batch, Normalized};
use crate::sources::types::SourceAdapter;

/// Attempts per invocation: the first call plus one immediate retry.
const MAX_ATTEMPTS: u32 = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Fresh,
    Fallback,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    pub items: Vec<TrendItem>,
    pub outcome: Outcome,
}

struct Route {
    adapter: Arc<dyn SourceAdapter>,
    timeout: Duration,
}

pub struct Resilience {
    routes: HashMap<SourceId, Route>,
}

impl Resilience {
    /// Per-source timeouts come from configuration.
    pub fn new(adapters: Vec<Arc<dyn SourceAdapter>>, cfg: &TrendsConfig) -> Self {
        let routes = adapters
            .into_iter()
            .map(|adapter| {
                let id = adapter.source_id();
                let timeout = cfg.source(id).timeout;
                (id, Route { adapter, timeout })
            })
            .collect();
        Self { routes }
    }

    /// Same timeout for every adapter.
    pub fn with_timeout(adapters: Vec<Arc<dyn SourceAdapter>>, timeout: Duration) -> Self {
        let routes = adapters
            .into_iter()
            .map(|adapter| (adapter.source_id(), Route { adapter, timeout }))
            .collect();
        Self { routes }
    }

    pub async fn invoke(&self, source: SourceId) -> Invocation {
        let Some(route) = self.routes.get(&source) else {
            warn!(target: "trends", source = %source, "no adapter registered; serving fallback");
            return fallback_for(source);
        };

        for attempt in 1..=MAX_ATTEMPTS {
            if attempt > 1 {
                counter!("trends_retry_total", "source" => source.as_str()).increment(1);
            }
            let started = Instant::now();
            let result = attempt_once(source, route).await;
            histogram!("trends_fetch_ms", "source" => source.as_str())
                .record(started.elapsed().as_millis() as f64);

            match result {
                Ok(n) => {
                    counter!("trends_fetch_total", "source" => source.as_str(), "outcome" => "ok")
                        .increment(1);
                    info!(
                        target: "trends",
                        source = %source,
                        attempt,
                        items = n.items.len(),
                        dropped = n.dropped,
                        "refreshed"
                    );
                    return Invocation {
                        items: n.items,
                        outcome: Outcome::Fresh,
                    };
                }
                Err(e) => {
                    counter!(
                        "trends_fetch_total",
                        "source" => source.as_str(),
                        "outcome" => "error"
                    )
                    .increment(1);
                    warn!(
                        target: "trends",
                        source = %e.source_id,
                        attempt,
                        timeout = e.is_timeout(),
                        error = %e.cause,
                        "fetch attempt failed"
                    );
                }
            }
        }

        warn!(target: "trends", source = %source, "retries exhausted; serving fallback");
        fallback_for(source)
    }
}

async fn attempt_once(source: SourceId, route: &Route) -> Result<Normalized, FetchError> {
    // Dropping the adapter future on timeout releases any browser session it holds.
    let records = match tokio::time::timeout(route.timeout, route.adapter.fetch()).await {
        Ok(res) => res?,
        Err(_) => return Err(FetchError::new(source, FetchCause::Timeout(route.timeout))),
    };

    let n = normalize_batch(source, &records);
    if n.dropped > 0 {
        debug!(
            target: "trends",
            source = %source,
            dropped = n.dropped,
            "normalizer omitted records"
        );
        counter!("trends_normalize_dropped_total", "source" => source.as_str())
            .increment(n.dropped as u64);
    }
    if n.items.is_empty() {
        return Err(FetchError::new(source, ExtractionError::Empty));
    }
    Ok(n)
}

fn fallback_for(source: SourceId) -> Invocation {
    counter!("trends_fallback_total", "source" => source.as_str()).increment(1);
    Invocation {
        items: fallback::sample(source),
        outcome: Outcome::Fallback,
    }
}
