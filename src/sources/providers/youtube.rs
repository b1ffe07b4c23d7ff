// src/sources/providers/youtube.rs
//! Trending videos from the YouTube trending page.
//!
//! The server-rendered page carries its data in an inline `ytInitialData`
//! object; a browser-rendered page has `ytd-video-renderer` elements instead.

use std::collections::HashSet;

use once_cell::sync::Lazy;
use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use serde_json::{Deserializer, Value};
use url::Url;

use crate::config::{SourceCfg, StrategyKind};
use crate::error::ExtractionError;
use crate::normalize::clean_text;
use crate::sources::types::{Document, RawRecord, TrendingVideo};

static VIDEO: Lazy<Selector> = Lazy::new(|| Selector::parse("ytd-video-renderer").unwrap());
static TITLE: Lazy<Selector> = Lazy::new(|| Selector::parse("a#video-title").unwrap());
static CHANNEL: Lazy<Selector> =
    Lazy::new(|| Selector::parse("ytd-channel-name a, #channel-name a").unwrap());
static META: Lazy<Selector> = Lazy::new(|| Selector::parse("#metadata-line span").unwrap());
static THUMB: Lazy<Selector> = Lazy::new(|| Selector::parse("img").unwrap());
static INITIAL_DATA: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"ytInitialData"?\]?\s*=\s*\{"#).unwrap());

pub fn extract(doc: &Document, _cfg: &SourceCfg) -> Result<Vec<RawRecord>, ExtractionError> {
    match doc.kind {
        StrategyKind::Browser => Ok(from_rendered(doc)),
        _ => from_initial_data(&doc.body),
    }
}

fn from_initial_data(body: &str) -> Result<Vec<RawRecord>, ExtractionError> {
    let start = INITIAL_DATA
        .find(body)
        .ok_or(ExtractionError::MissingField("ytInitialData"))?
        .end()
        - 1;
    // The object is followed by `;</script>` and the rest of the page.
    let data: Value = Deserializer::from_str(&body[start..])
        .into_iter::<Value>()
        .next()
        .ok_or(ExtractionError::MissingField("ytInitialData"))?
        .map_err(|e| ExtractionError::Malformed(e.to_string()))?;

    let mut renderers = Vec::new();
    collect_renderers(&data, &mut renderers);

    let mut seen = HashSet::new();
    Ok(renderers
        .into_iter()
        .filter_map(video_from_renderer)
        .filter(|v| v.video_id.as_ref().map_or(true, |id| seen.insert(id.clone())))
        .map(RawRecord::Youtube)
        .collect())
}

fn collect_renderers<'a>(v: &'a Value, out: &mut Vec<&'a Value>) {
    match v {
        Value::Object(map) => {
            if let Some(r) = map.get("videoRenderer") {
                out.push(r);
                return;
            }
            for child in map.values() {
                collect_renderers(child, out);
            }
        }
        Value::Array(items) => {
            for child in items {
                collect_renderers(child, out);
            }
        }
        _ => {}
    }
}

/// `{"simpleText": ..}` or `{"runs": [{"text": ..}, ..]}`.
fn text_field(v: &Value, key: &str) -> Option<String> {
    let field = v.get(key)?;
    let raw = match field.get("simpleText").and_then(Value::as_str) {
        Some(s) => s.to_string(),
        None => field
            .get("runs")?
            .as_array()?
            .iter()
            .filter_map(|r| r.get("text").and_then(Value::as_str))
            .collect(),
    };
    Some(clean_text(&raw)).filter(|s| !s.is_empty())
}

fn video_from_renderer(r: &Value) -> Option<TrendingVideo> {
    let title = text_field(r, "title")?;
    let thumbnail = r
        .pointer("/thumbnail/thumbnails")
        .and_then(Value::as_array)
        .and_then(|t| t.last())
        .and_then(|t| t.get("url"))
        .and_then(Value::as_str)
        .filter(|u| u.starts_with("http"))
        .map(str::to_string);

    Some(TrendingVideo {
        title,
        video_id: r
            .get("videoId")
            .and_then(Value::as_str)
            .filter(|id| !id.is_empty())
            .map(str::to_string),
        channel: text_field(r, "ownerText").or_else(|| text_field(r, "longBylineText")),
        views: text_field(r, "viewCountText"),
        published: text_field(r, "publishedTimeText"),
        thumbnail,
    })
}

fn from_rendered(doc: &Document) -> Vec<RawRecord> {
    let document = Html::parse_document(&doc.body);
    let base = Url::parse(&doc.url).ok();

    document
        .select(&VIDEO)
        .filter_map(|el| parse_video(el, base.as_ref()))
        .map(RawRecord::Youtube)
        .collect()
}

fn parse_video(el: ElementRef<'_>, base: Option<&Url>) -> Option<TrendingVideo> {
    let link = el.select(&TITLE).next()?;
    let title = link
        .value()
        .attr("title")
        .map(clean_text)
        .filter(|t| !t.is_empty())
        .unwrap_or_else(|| clean_text(&link.text().collect::<String>()));
    if title.is_empty() {
        return None;
    }

    let video_id = link
        .value()
        .attr("href")
        .and_then(|href| video_id_from_href(href, base));

    let channel = el
        .select(&CHANNEL)
        .next()
        .map(|c| clean_text(&c.text().collect::<String>()))
        .filter(|c| !c.is_empty());

    let mut meta = el
        .select(&META)
        .map(|s| clean_text(&s.text().collect::<String>()))
        .filter(|s| !s.is_empty());
    let views = meta.next();
    let published = meta.next();

    let thumbnail = el
        .select(&THUMB)
        .filter_map(|img| img.value().attr("src"))
        .find(|src| src.starts_with("http"))
        .map(str::to_string);

    Some(TrendingVideo {
        title,
        video_id,
        channel,
        views,
        published,
        thumbnail,
    })
}

fn video_id_from_href(href: &str, base: Option<&Url>) -> Option<String> {
    let fallback = Url::parse("https://www.youtube.com/").ok()?;
    let url = base.unwrap_or(&fallback).join(href).ok()?;
    url.query_pairs()
        .find(|(k, _)| k == "v")
        .map(|(_, v)| v.into_owned())
        .filter(|v| !v.is_empty())
}
