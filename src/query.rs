// src/query.rs
//! Query boundary: validates the source id, delegates to the cache, filters.

use crate::cache::{Aggregator, EntryState};
use crate::error::ValidationError;
use crate::model::{SourceId, TrendItem};

#[derive(Debug, Clone, PartialEq)]
pub struct QueryResult {
    pub source_id: SourceId,
    pub items: Vec<TrendItem>,
    pub state: EntryState,
}

#[derive(Clone)]
pub struct QueryService {
    aggregator: Aggregator,
}

impl QueryService {
    pub fn new(aggregator: Aggregator) -> Self {
        Self { aggregator }
    }

    pub fn aggregator(&self) -> &Aggregator {
        &self.aggregator
    }

    pub async fn query(
        &self,
        source_id: &str,
        search_text: Option<&str>,
    ) -> Result<QueryResult, ValidationError> {
        self.query_with(source_id, search_text, false).await
    }

    /// Like [`query`](Self::query), optionally forcing a refetch first.
    pub async fn query_with(
        &self,
        source_id: &str,
        search_text: Option<&str>,
        force_refresh: bool,
    ) -> Result<QueryResult, ValidationError> {
        let source: SourceId = source_id.parse()?;
        let snapshot = self.aggregator.get_trends(source, force_refresh).await;
        let items = match search_text {
            Some(text) => filter_items(&snapshot.items, text),
            None => snapshot.items,
        };
        Ok(QueryResult {
            source_id: source,
            items,
            state: snapshot.state,
        })
    }
}

/// Order-preserving, case-insensitive selection on primary and secondary text.
/// Blank search text selects everything.
pub fn filter_items(items: &[TrendItem], search_text: &str) -> Vec<TrendItem> {
    let needle = search_text.trim().to_lowercase();
    items
        .iter()
        .filter(|item| needle.is_empty() || item.matches(&needle))
        .cloned()
        .collect()
}
