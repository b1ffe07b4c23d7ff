//! Source identifiers and the normalized `TrendItem` envelope shared by every
//! layer of the engine.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

/// Hard cap on items kept per source per fetch.
pub const MAX_ITEMS: usize = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceId {
    Google,
    Youtube,
    Twitter,
    Wikipedia,
    Reddit,
    Spotify,
    Netflix,
}

impl SourceId {
    pub const COUNT: usize = 7;

    pub const ALL: [SourceId; SourceId::COUNT] = [
        SourceId::Google,
        SourceId::Youtube,
        SourceId::Twitter,
        SourceId::Wikipedia,
        SourceId::Reddit,
        SourceId::Spotify,
        SourceId::Netflix,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            SourceId::Google => "google",
            SourceId::Youtube => "youtube",
            SourceId::Twitter => "twitter",
            SourceId::Wikipedia => "wikipedia",
            SourceId::Reddit => "reddit",
            SourceId::Spotify => "spotify",
            SourceId::Netflix => "netflix",
        }
    }

    /// Sources whose upstream list is an explicit ranking.
    pub fn is_ranked(self) -> bool {
        matches!(
            self,
            SourceId::Twitter | SourceId::Wikipedia | SourceId::Spotify | SourceId::Netflix
        )
    }
}

impl fmt::Display for SourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SourceId {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        SourceId::ALL
            .into_iter()
            .find(|id| id.as_str() == s)
            .ok_or_else(|| ValidationError::UnknownSource(s.to_string()))
    }
}

/// One trending entry, source-agnostic.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrendItem {
    pub source_id: SourceId,
    pub rank: Option<u32>,
    pub primary_text: String,
    pub secondary_text: Option<String>,
    pub metric_value: Option<String>,
    pub media_url: Option<String>,
    pub target_url: String,
    #[serde(default)]
    pub extra: BTreeMap<String, String>,
}

impl TrendItem {
    /// Case-insensitive match against the headline and the secondary line.
    pub fn matches(&self, needle_lower: &str) -> bool {
        self.primary_text.to_lowercase().contains(needle_lower)
            || self
                .secondary_text
                .as_deref()
                .is_some_and(|s| s.to_lowercase().contains(needle_lower))
    }
}
