// src/sources/providers/reddit.rs
//! r/popular, either from the JSON listing or from a browser-rendered page.

use once_cell::sync::Lazy;
use scraper::{Html, Selector};
use serde::Deserialize;
use serde_json::Value;

use crate::config::{SourceCfg, StrategyKind};
use crate::error::ExtractionError;
use crate::normalize::clean_text;
use crate::sources::types::{Document, RawRecord, RedditPost};

static POST: Lazy<Selector> = Lazy::new(|| Selector::parse("shreddit-post").unwrap());

#[derive(Debug, Deserialize)]
struct Post {
    title: String,
    subreddit: Option<String>,
    ups: Option<i64>,
    num_comments: Option<u64>,
    permalink: Option<String>,
    thumbnail: Option<String>,
    #[serde(default)]
    stickied: bool,
    #[serde(default)]
    over_18: bool,
    #[serde(default)]
    promoted: Option<bool>,
}

impl Post {
    fn is_content(&self) -> bool {
        !self.stickied && !self.over_18 && !self.promoted.unwrap_or(false)
    }
}

pub fn extract(doc: &Document, cfg: &SourceCfg) -> Result<Vec<RawRecord>, ExtractionError> {
    let posts = match doc.kind {
        StrategyKind::Api => from_listing(&doc.body)?,
        StrategyKind::Markup | StrategyKind::Browser => from_markup(&doc.body),
    };
    let min = i64::try_from(cfg.min_popularity).unwrap_or(i64::MAX);
    Ok(posts
        .into_iter()
        .filter(|p| p.ups.unwrap_or(0) >= min)
        .map(RawRecord::Reddit)
        .collect())
}

fn from_listing(body: &str) -> Result<Vec<RedditPost>, ExtractionError> {
    let root: Value =
        serde_json::from_str(body).map_err(|e| ExtractionError::Malformed(e.to_string()))?;
    let children = root
        .pointer("/data/children")
        .and_then(Value::as_array)
        .ok_or(ExtractionError::MissingField("data.children"))?;

    Ok(children
        .iter()
        .filter_map(|c| c.get("data"))
        .filter_map(|d| Post::deserialize(d).ok())
        .filter(Post::is_content)
        .map(|p| RedditPost {
            title: p.title,
            subreddit: p.subreddit,
            ups: p.ups,
            num_comments: p.num_comments,
            permalink: p.permalink,
            thumbnail: p.thumbnail.filter(|t| t.starts_with("http")),
        })
        .collect())
}

fn from_markup(body: &str) -> Vec<RedditPost> {
    let document = Html::parse_document(body);
    document
        .select(&POST)
        .filter_map(|el| {
            let v = el.value();
            if v.attr("nsfw").is_some() || v.attr("is-promoted").is_some() {
                return None;
            }
            let title = clean_text(v.attr("post-title")?);
            if title.is_empty() {
                return None;
            }
            Some(RedditPost {
                title,
                subreddit: v
                    .attr("subreddit-prefixed-name")
                    .or_else(|| v.attr("subreddit-name"))
                    .map(|s| s.trim_start_matches("r/").to_string()),
                ups: v.attr("score").and_then(|s| s.trim().parse().ok()),
                num_comments: v.attr("comment-count").and_then(|s| s.trim().parse().ok()),
                permalink: v.attr("permalink").map(str::to_string),
                thumbnail: None,
            })
        })
        .collect()
}
