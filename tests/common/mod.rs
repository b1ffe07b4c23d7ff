// tests/common/mod.rs
//
// Stub adapters shared by the integration tests. No network is touched.
#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use trend_pulse::api::{self, AppState};
use trend_pulse::cache::Aggregator;
use trend_pulse::error::{FetchCause, FetchError};
use trend_pulse::model::SourceId;
use trend_pulse::query::QueryService;
use trend_pulse::resilience::Resilience;
use trend_pulse::sources::types::{ChartTrack, PageViews, RawRecord, SourceAdapter};

pub enum Behaviour {
    /// Always return these records.
    Records(Vec<RawRecord>),
    /// Fail every call with a 403.
    Fail,
    /// Fail the first `n` calls, then return the records.
    FailFirst(usize, Vec<RawRecord>),
}

/// Counts invocations; optionally sleeps before answering so concurrent
/// callers overlap.
pub struct StubAdapter {
    pub source: SourceId,
    pub calls: AtomicUsize,
    pub delay: Duration,
    pub behaviour: Behaviour,
}

impl StubAdapter {
    pub fn new(source: SourceId, behaviour: Behaviour) -> Arc<Self> {
        Self::with_delay(source, behaviour, Duration::ZERO)
    }

    pub fn with_delay(source: SourceId, behaviour: Behaviour, delay: Duration) -> Arc<Self> {
        Arc::new(Self {
            source,
            calls: AtomicUsize::new(0),
            delay,
            behaviour,
        })
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SourceAdapter for StubAdapter {
    async fn fetch(&self) -> Result<Vec<RawRecord>, FetchError> {
        let n = self.calls.fetch_add(1, Ordering::SeqCst);
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        match &self.behaviour {
            Behaviour::Records(r) => Ok(r.clone()),
            Behaviour::FailFirst(k, r) if n >= *k => Ok(r.clone()),
            Behaviour::Fail | Behaviour::FailFirst(..) => {
                Err(FetchError::new(self.source, FetchCause::Status(403)))
            }
        }
    }

    fn source_id(&self) -> SourceId {
        self.source
    }
}

pub fn wiki_records(titles: &[&str]) -> Vec<RawRecord> {
    titles
        .iter()
        .enumerate()
        .map(|(i, t)| {
            RawRecord::Wikipedia(PageViews {
                article: t.to_string(),
                views: 100_000 - i as u64 * 1000,
                rank: i as u32 + 1,
            })
        })
        .collect()
}

pub fn chart_records(rows: &[(&str, &str)]) -> Vec<RawRecord> {
    rows.iter()
        .enumerate()
        .map(|(i, (song, artist))| {
            RawRecord::Spotify(ChartTrack {
                rank: Some(i as u32 + 1),
                song: song.to_string(),
                artist: artist.to_string(),
                streams: Some(format!("{}", 1_000_000 - i * 1000)),
            })
        })
        .collect()
}

pub fn aggregator(adapters: Vec<Arc<dyn SourceAdapter>>) -> Aggregator {
    Aggregator::new(
        Resilience::with_timeout(adapters, Duration::from_secs(5)),
        None,
    )
}

pub fn query_service(adapters: Vec<Arc<dyn SourceAdapter>>) -> QueryService {
    QueryService::new(aggregator(adapters))
}

/// Every source stubbed to fail, except the ones given.
pub fn adapters_with(overrides: Vec<Arc<dyn SourceAdapter>>) -> Vec<Arc<dyn SourceAdapter>> {
    let mut out = overrides;
    for id in SourceId::ALL {
        if !out.iter().any(|a| a.source_id() == id) {
            out.push(StubAdapter::new(id, Behaviour::Fail));
        }
    }
    out
}

pub fn test_router(adapters: Vec<Arc<dyn SourceAdapter>>) -> axum::Router {
    api::router(AppState::new(query_service(adapters)))
}
