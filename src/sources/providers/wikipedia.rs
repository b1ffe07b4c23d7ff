// src/sources/providers/wikipedia.rs
//! Most-viewed articles from the Wikimedia pageviews "top" endpoint.

use serde::Deserialize;
use serde_json::Value;

use crate::config::SourceCfg;
use crate::error::ExtractionError;
use crate::sources::types::{Document, PageViews, RawRecord};

const NAMESPACES: &[&str] = &[
    "Special:",
    "Wikipedia:",
    "Portal:",
    "File:",
    "Help:",
    "Talk:",
    "Template:",
    "Category:",
    "User:",
];

#[derive(Debug, Deserialize)]
struct Article {
    article: String,
    views: u64,
    rank: u32,
}

/// Navigation and meta pages that top every day's list.
pub fn is_sentinel(title: &str) -> bool {
    let t = title.trim();
    t.is_empty()
        || t == "-"
        || t == "Main_Page"
        || t.eq_ignore_ascii_case("undefined")
        || NAMESPACES.iter().any(|ns| t.starts_with(ns))
}

pub fn extract(doc: &Document, cfg: &SourceCfg) -> Result<Vec<RawRecord>, ExtractionError> {
    let root: Value =
        serde_json::from_str(&doc.body).map_err(|e| ExtractionError::Malformed(e.to_string()))?;
    let articles = root
        .pointer("/items/0/articles")
        .and_then(Value::as_array)
        .ok_or(ExtractionError::MissingField("items[0].articles"))?;

    let out = articles
        .iter()
        .filter_map(|a| Article::deserialize(a).ok())
        .filter(|a| !is_sentinel(&a.article))
        .filter(|a| a.views >= cfg.min_popularity)
        .map(|a| {
            RawRecord::Wikipedia(PageViews {
                article: a.article,
                views: a.views,
                rank: a.rank,
            })
        })
        .collect();
    Ok(out)
}
