// src/sources/providers/google.rs
//! Daily search trends from the Google Trends RSS feed.

use quick_xml::de::from_str;
use serde::Deserialize;
use time::{
    format_description::well_known::{Rfc2822, Rfc3339},
    OffsetDateTime, UtcOffset,
};

use crate::config::SourceCfg;
use crate::error::ExtractionError;
use crate::normalize::clean_text;
use crate::sources::types::{Document, RawRecord, RelatedArticle, SearchTrend};

#[derive(Debug, Deserialize)]
struct Rss {
    channel: Channel,
}

#[derive(Debug, Deserialize)]
struct Channel {
    #[serde(rename = "item", default)]
    item: Vec<Item>,
}

#[derive(Debug, Deserialize)]
struct Item {
    title: Option<String>,
    #[serde(rename = "ht:approx_traffic", alias = "approx_traffic")]
    approx_traffic: Option<String>,
    #[serde(rename = "ht:picture", alias = "picture")]
    picture: Option<String>,
    #[serde(rename = "pubDate")]
    pub_date: Option<String>,
    #[serde(rename = "ht:news_item", alias = "news_item", default)]
    news_item: Vec<NewsItem>,
}

#[derive(Debug, Deserialize)]
struct NewsItem {
    #[serde(rename = "ht:news_item_title", alias = "news_item_title")]
    title: Option<String>,
    #[serde(rename = "ht:news_item_url", alias = "news_item_url")]
    url: Option<String>,
    #[serde(rename = "ht:news_item_source", alias = "news_item_source")]
    source: Option<String>,
}

fn rfc2822_to_rfc3339(ts: &str) -> Option<String> {
    OffsetDateTime::parse(ts.trim(), &Rfc2822)
        .ok()
        .map(|dt| dt.to_offset(UtcOffset::UTC))
        .and_then(|dt| dt.format(&Rfc3339).ok())
}

pub fn extract(doc: &Document, _cfg: &SourceCfg) -> Result<Vec<RawRecord>, ExtractionError> {
    let xml_clean = scrub_html_entities_for_xml(&doc.body);
    let rss: Rss = from_str(&xml_clean).map_err(|e| ExtractionError::Malformed(e.to_string()))?;

    let out = rss
        .channel
        .item
        .into_iter()
        .filter_map(|it| {
            let title = clean_text(it.title.as_deref().unwrap_or_default());
            if title.is_empty() {
                return None;
            }
            let articles = it
                .news_item
                .into_iter()
                .filter_map(|n| {
                    let title = clean_text(n.title.as_deref().unwrap_or_default());
                    (!title.is_empty()).then_some(RelatedArticle {
                        title,
                        url: n.url.map(|u| u.trim().to_string()),
                        source: n.source,
                    })
                })
                .take(3)
                .collect();
            Some(RawRecord::Google(SearchTrend {
                title,
                traffic: it.approx_traffic,
                picture: it.picture.map(|p| p.trim().to_string()),
                articles,
                published: it.pub_date.as_deref().and_then(rfc2822_to_rfc3339),
            }))
        })
        .collect();

    Ok(out)
}

// The feed embeds HTML entities that a strict XML parser rejects.
fn scrub_html_entities_for_xml(s: &str) -> String {
    s.replace("&nbsp;", " ")
        .replace("&ndash;", "-")
        .replace("&mdash;", "-")
        .replace("&ldquo;", "\"")
        .replace("&rdquo;", "\"")
        .replace("&lsquo;", "'")
        .replace("&rsquo;", "'")
}
