// src/sources/mod.rs
//! Source adapters: an ordered chain of extraction strategies plus one
//! source-specific extractor.

pub mod browser;
pub mod providers;
pub mod strategy;
pub mod types;

use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use tracing::{debug, warn};

use crate::config::{SourceCfg, StrategyKind, TrendsConfig};
use crate::error::{ExtractionError, FetchCause, FetchError};
use crate::model::{SourceId, MAX_ITEMS};
use crate::sources::browser::BrowserStrategy;
use crate::sources::providers::{extractor_for, Extractor};
use crate::sources::strategy::{ApiStrategy, MarkupStrategy};
use crate::sources::types::{ExtractionStrategy, RawRecord, SourceAdapter, Target};

/// The three shared strategy instances. Adapters hold `Arc`s into this set.
#[derive(Clone)]
pub struct Strategies {
    api: Arc<ApiStrategy>,
    markup: Arc<MarkupStrategy>,
    browser: Arc<BrowserStrategy>,
}

impl Strategies {
    pub fn from_config(cfg: &TrendsConfig) -> Result<Self> {
        let svc = &cfg.service;
        Ok(Self {
            api: Arc::new(ApiStrategy::new()?),
            markup: Arc::new(MarkupStrategy::new(&svc.user_agent)?),
            browser: Arc::new(BrowserStrategy::new(
                svc.webdriver_url.clone(),
                svc.browser_wait,
                &svc.user_agent,
            )?),
        })
    }

    pub fn get(&self, kind: StrategyKind) -> Arc<dyn ExtractionStrategy> {
        match kind {
            StrategyKind::Api => self.api.clone(),
            StrategyKind::Markup => self.markup.clone(),
            StrategyKind::Browser => self.browser.clone(),
        }
    }
}

/// Adapter pinned to a strategy chain; later strategies are tried only when
/// earlier ones fail within the same attempt.
pub struct StrategyAdapter {
    source: SourceId,
    cfg: SourceCfg,
    chain: Vec<Arc<dyn ExtractionStrategy>>,
    extractor: Extractor,
}

impl StrategyAdapter {
    pub fn new(
        source: SourceId,
        cfg: SourceCfg,
        chain: Vec<Arc<dyn ExtractionStrategy>>,
        extractor: Extractor,
    ) -> Self {
        Self {
            source,
            cfg,
            chain,
            extractor,
        }
    }

    async fn attempt(
        &self,
        strategy: &dyn ExtractionStrategy,
    ) -> Result<Vec<RawRecord>, FetchCause> {
        let target = Target {
            url: self.cfg.url_for(strategy.kind(), chrono::Utc::now()),
            wait_selector: self.cfg.wait_selector.clone(),
        };
        let doc = strategy.retrieve(&target).await?;
        let mut records = (self.extractor)(&doc, &self.cfg)?;
        if records.is_empty() {
            return Err(ExtractionError::Empty.into());
        }
        // Filtering happened in the extractor; cap valid records only.
        records.truncate(MAX_ITEMS);
        Ok(records)
    }
}

#[async_trait]
impl SourceAdapter for StrategyAdapter {
    async fn fetch(&self) -> Result<Vec<RawRecord>, FetchError> {
        // First real failure; an unavailable strategy later in the chain
        // must not hide a 403 from an earlier one.
        let mut reported: Option<FetchCause> = None;
        for strategy in &self.chain {
            match self.attempt(strategy.as_ref()).await {
                Ok(records) => {
                    debug!(
                        target: "trends",
                        source = %self.source,
                        strategy = ?strategy.kind(),
                        records = records.len(),
                        "strategy succeeded"
                    );
                    return Ok(records);
                }
                Err(cause) => {
                    warn!(
                        target: "trends",
                        source = %self.source,
                        strategy = ?strategy.kind(),
                        error = %cause,
                        "strategy failed"
                    );
                    if reported
                        .as_ref()
                        .map_or(true, |r| matches!(r, FetchCause::Unavailable(_)))
                    {
                        reported = Some(cause);
                    }
                }
            }
        }
        Err(FetchError::new(
            self.source,
            reported.unwrap_or(FetchCause::Unavailable("no extraction strategy configured")),
        ))
    }

    fn source_id(&self) -> SourceId {
        self.source
    }
}

/// Build the adapter for every source from configuration.
pub fn build_adapters(cfg: &TrendsConfig) -> Result<Vec<Arc<dyn SourceAdapter>>> {
    let strategies = Strategies::from_config(cfg)?;
    Ok(SourceId::ALL
        .into_iter()
        .map(|id| {
            let sc = cfg.source(id);
            let chain = sc.strategies.iter().map(|k| strategies.get(*k)).collect();
            let adapter = StrategyAdapter::new(id, sc, chain, extractor_for(id));
            Arc::new(adapter) as Arc<dyn SourceAdapter>
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sources::types::Document;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    struct Canned {
        kind: StrategyKind,
        body: Option<&'static str>,
        calls: AtomicUsize,
    }

    #[async_trait]
    impl ExtractionStrategy for Canned {
        async fn retrieve(&self, target: &Target) -> Result<Document, FetchCause> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            match self.body {
                Some(b) => Ok(Document {
                    url: target.url.clone(),
                    body: b.to_string(),
                    kind: self.kind,
                }),
                None => Err(FetchCause::Status(403)),
            }
        }

        fn kind(&self) -> StrategyKind {
            self.kind
        }
    }

    const CHART: &str = r#"<table class="chart-table"><tbody>
        <tr><td class="chart-table-position">1</td>
            <td class="chart-table-track"><strong>A</strong><span>by X</span></td></tr>
    </tbody></table>"#;

    #[tokio::test]
    async fn falls_through_chain_until_a_strategy_yields_records() {
        let blocked = Arc::new(Canned {
            kind: StrategyKind::Markup,
            body: None,
            calls: AtomicUsize::new(0),
        });
        let rendered = Arc::new(Canned {
            kind: StrategyKind::Browser,
            body: Some(CHART),
            calls: AtomicUsize::new(0),
        });
        let cfg = TrendsConfig::default().source(SourceId::Spotify);
        let adapter = StrategyAdapter::new(
            SourceId::Spotify,
            cfg,
            vec![blocked.clone(), rendered.clone()],
            extractor_for(SourceId::Spotify),
        );
        let out = adapter.fetch().await.unwrap();
        assert_eq!(out.len(), 1);
        assert_eq!(blocked.calls.load(Ordering::SeqCst), 1);
        assert_eq!(rendered.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn empty_extraction_is_an_error_tagged_with_source() {
        let empty = Arc::new(Canned {
            kind: StrategyKind::Markup,
            body: Some("<html><body>redesigned</body></html>"),
            calls: AtomicUsize::new(0),
        });
        let cfg = TrendsConfig::default().source(SourceId::Netflix);
        let adapter = StrategyAdapter::new(
            SourceId::Netflix,
            cfg,
            vec![empty],
            extractor_for(SourceId::Netflix),
        );
        let err = adapter.fetch().await.unwrap_err();
        assert_eq!(err.source_id, SourceId::Netflix);
        assert!(matches!(err.cause, FetchCause::Extraction(ExtractionError::Empty)));
    }

    #[tokio::test]
    async fn blocked_markup_is_reported_over_missing_webdriver() {
        let blocked: Arc<dyn ExtractionStrategy> = Arc::new(Canned {
            kind: StrategyKind::Markup,
            body: None,
            calls: AtomicUsize::new(0),
        });
        let no_driver: Arc<dyn ExtractionStrategy> =
            Arc::new(BrowserStrategy::new(None, Duration::from_secs(1), "ua").unwrap());
        let cfg = TrendsConfig::default().source(SourceId::Twitter);
        let adapter = StrategyAdapter::new(
            SourceId::Twitter,
            cfg,
            vec![blocked, no_driver],
            extractor_for(SourceId::Twitter),
        );
        let err = adapter.fetch().await.unwrap_err();
        assert!(matches!(err.cause, FetchCause::Status(403)), "got {:?}", err.cause);
    }

    #[test]
    fn default_youtube_chain_starts_without_a_browser() {
        let cfg = TrendsConfig::default();
        assert_eq!(cfg.service.webdriver_url, None);
        assert_eq!(
            cfg.source(SourceId::Youtube).strategies,
            vec![StrategyKind::Markup, StrategyKind::Browser]
        );
    }

    #[test]
    fn every_source_gets_an_adapter() {
        let adapters = build_adapters(&TrendsConfig::default()).unwrap();
        let ids: Vec<_> = adapters.iter().map(|a| a.source_id()).collect();
        assert_eq!(ids, SourceId::ALL.to_vec());
    }
}
