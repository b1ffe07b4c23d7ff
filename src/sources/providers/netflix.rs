// src/sources/providers/netflix.rs
//! Netflix top 10 as tracked by FlixPatrol.

use once_cell::sync::Lazy;
use scraper::{Html, Selector};
use url::Url;

use crate::config::SourceCfg;
use crate::error::ExtractionError;
use crate::normalize::clean_text;
use crate::sources::types::{Document, RawRecord, TopTitle};

static ROW: Lazy<Selector> = Lazy::new(|| Selector::parse(".table-body .row").unwrap());
static POSITION: Lazy<Selector> =
    Lazy::new(|| Selector::parse(".table-td:first-child").unwrap());
static TITLE: Lazy<Selector> = Lazy::new(|| Selector::parse(".table-td .title").unwrap());
static POSTER: Lazy<Selector> = Lazy::new(|| Selector::parse(".table-td img").unwrap());

pub fn extract(doc: &Document, _cfg: &SourceCfg) -> Result<Vec<RawRecord>, ExtractionError> {
    let document = Html::parse_document(&doc.body);
    let base = Url::parse(&doc.url).ok();

    let out = document
        .select(&ROW)
        .filter_map(|row| {
            let title = row
                .select(&TITLE)
                .next()
                .map(|e| clean_text(&e.text().collect::<String>()))
                .filter(|t| !t.is_empty())?;
            let rank = row
                .select(&POSITION)
                .next()
                .map(|e| clean_text(&e.text().collect::<String>()))
                .and_then(|p| p.trim_end_matches('.').parse().ok());
            let poster = row
                .select(&POSTER)
                .next()
                .and_then(|img| img.value().attr("data-src").or(img.value().attr("src")))
                .and_then(|src| match &base {
                    Some(b) => b.join(src.trim()).ok().map(|u| u.to_string()),
                    None => Some(src.trim().to_string()),
                });
            Some(RawRecord::Netflix(TopTitle {
                rank,
                title,
                poster,
            }))
        })
        .collect();
    Ok(out)
}
