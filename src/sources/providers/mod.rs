// src/sources/providers/mod.rs
//! One extractor per source: turns a retrieved `Document` into raw records.
//! Extractors skip unusable elements and filter sentinels; they never truncate.

pub mod google;
pub mod netflix;
pub mod reddit;
pub mod spotify;
pub mod twitter;
pub mod wikipedia;
pub mod youtube;

use crate::config::SourceCfg;
use crate::error::ExtractionError;
use crate::model::SourceId;
use crate::sources::types::{Document, RawRecord};

pub type Extractor = fn(&Document, &SourceCfg) -> Result<Vec<RawRecord>, ExtractionError>;

pub fn extractor_for(id: SourceId) -> Extractor {
    match id {
        SourceId::Google => google::extract,
        SourceId::Youtube => youtube::extract,
        SourceId::Twitter => twitter::extract,
        SourceId::Wikipedia => wikipedia::extract,
        SourceId::Reddit => reddit::extract,
        SourceId::Spotify => spotify::extract,
        SourceId::Netflix => netflix::extract,
    }
}
