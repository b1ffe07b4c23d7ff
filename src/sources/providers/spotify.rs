// src/sources/providers/spotify.rs
//! Regional daily chart table.

use once_cell::sync::Lazy;
use scraper::{ElementRef, Html, Selector};

use crate::config::SourceCfg;
use crate::error::ExtractionError;
use crate::normalize::clean_text;
use crate::sources::types::{ChartTrack, Document, RawRecord};

static ROW: Lazy<Selector> = Lazy::new(|| Selector::parse(".chart-table tbody tr").unwrap());
static POSITION: Lazy<Selector> =
    Lazy::new(|| Selector::parse(".chart-table-position").unwrap());
static SONG: Lazy<Selector> = Lazy::new(|| Selector::parse(".chart-table-track strong").unwrap());
static ARTIST: Lazy<Selector> = Lazy::new(|| Selector::parse(".chart-table-track span").unwrap());
static STREAMS: Lazy<Selector> = Lazy::new(|| Selector::parse(".chart-table-streams").unwrap());

fn text_of(row: ElementRef<'_>, sel: &Selector) -> Option<String> {
    row.select(sel)
        .next()
        .map(|e| clean_text(&e.text().collect::<String>()))
        .filter(|t| !t.is_empty())
}

pub fn extract(doc: &Document, _cfg: &SourceCfg) -> Result<Vec<RawRecord>, ExtractionError> {
    let document = Html::parse_document(&doc.body);

    let out = document
        .select(&ROW)
        .filter_map(|row| {
            let song = text_of(row, &SONG)?;
            let artist = text_of(row, &ARTIST)?;
            let artist = artist
                .strip_prefix("by ")
                .map(str::trim)
                .unwrap_or(&artist)
                .to_string();
            if artist.is_empty() {
                return None;
            }
            Some(RawRecord::Spotify(ChartTrack {
                rank: text_of(row, &POSITION).and_then(|p| p.parse().ok()),
                song,
                artist,
                streams: text_of(row, &STREAMS),
            }))
        })
        .collect();
    Ok(out)
}
