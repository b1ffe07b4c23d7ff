// src/sources/types.rs
use async_trait::async_trait;

use crate::config::StrategyKind;
use crate::error::{FetchCause, FetchError};
use crate::model::SourceId;

/// Body returned by an extraction strategy, before any source-specific parsing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Document {
    /// Final URL the body was read from; relative links resolve against it.
    pub url: String,
    pub body: String,
    /// Which strategy produced the body (JSON for `Api`, markup otherwise).
    pub kind: StrategyKind,
}

/// What a strategy should retrieve.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Target {
    pub url: String,
    /// Element a scripted browser waits for before reading the page.
    pub wait_selector: Option<String>,
}

#[async_trait]
pub trait ExtractionStrategy: Send + Sync {
    async fn retrieve(&self, target: &Target) -> Result<Document, FetchCause>;
    fn kind(&self) -> StrategyKind;
}

#[async_trait]
pub trait SourceAdapter: Send + Sync {
    async fn fetch(&self) -> Result<Vec<RawRecord>, FetchError>;
    fn source_id(&self) -> SourceId;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelatedArticle {
    pub title: String,
    pub url: Option<String>,
    pub source: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchTrend {
    pub title: String,
    pub traffic: Option<String>,
    pub picture: Option<String>,
    pub articles: Vec<RelatedArticle>,
    /// RFC 3339, when the feed carried a parseable date.
    pub published: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrendingVideo {
    pub title: String,
    pub video_id: Option<String>,
    pub channel: Option<String>,
    pub views: Option<String>,
    pub published: Option<String>,
    pub thumbnail: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Hashtag {
    pub name: String,
    pub rank: u32,
    pub tweet_count: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageViews {
    pub article: String,
    pub views: u64,
    pub rank: u32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RedditPost {
    pub title: String,
    pub subreddit: Option<String>,
    pub ups: Option<i64>,
    pub num_comments: Option<u64>,
    pub permalink: Option<String>,
    pub thumbnail: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChartTrack {
    pub rank: Option<u32>,
    pub song: String,
    pub artist: String,
    pub streams: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TopTitle {
    pub rank: Option<u32>,
    pub title: String,
    pub poster: Option<String>,
}

/// Raw, source-specific shape of one trending entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RawRecord {
    Google(SearchTrend),
    Youtube(TrendingVideo),
    Twitter(Hashtag),
    Wikipedia(PageViews),
    Reddit(RedditPost),
    Spotify(ChartTrack),
    Netflix(TopTitle),
}

impl RawRecord {
    pub fn source_id(&self) -> SourceId {
        match self {
            RawRecord::Google(_) => SourceId::Google,
            RawRecord::Youtube(_) => SourceId::Youtube,
            RawRecord::Twitter(_) => SourceId::Twitter,
            RawRecord::Wikipedia(_) => SourceId::Wikipedia,
            RawRecord::Reddit(_) => SourceId::Reddit,
            RawRecord::Spotify(_) => SourceId::Spotify,
            RawRecord::Netflix(_) => SourceId::Netflix,
        }
    }
}
