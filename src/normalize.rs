// src/normalize.rs
//! Table-driven mapping from `RawRecord` to `TrendItem`.
//!
//! Pure and total: the same record always yields the same item, and a record
//! without a usable headline is omitted (and counted) rather than failing.

use std::collections::BTreeMap;

use once_cell::sync::OnceCell;
use regex::Regex;

use crate::model::{SourceId, TrendItem, MAX_ITEMS};
use crate::sources::types::RawRecord;

/// Output of normalizing one fetch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Normalized {
    pub items: Vec<TrendItem>,
    /// Records omitted for lacking a headline, a valid target URL, or for
    /// belonging to another source.
    pub dropped: usize,
}

/// Normalize scraped text: decode entities, strip tags, fold quotes and whitespace.
pub fn clean_text(s: &str) -> String {
    // 1) HTML entity decode
    let mut out = html_escape::decode_html_entities(s).to_string();

    // 2) Strip HTML tags
    static RE_TAGS: OnceCell<Regex> = OnceCell::new();
    let re_tags = RE_TAGS.get_or_init(|| Regex::new(r"(?is)</?[^>]+>").unwrap());
    out = re_tags.replace_all(&out, "").to_string();

    // 3) Normalize “ ” ‘ ’ « » to ASCII quotes
    out = out
        .replace(['\u{201C}', '\u{201D}', '\u{00AB}', '\u{00BB}'], "\"")
        .replace(['\u{2018}', '\u{2019}'], "'");

    // 4) Collapse whitespace (incl. nbsp)
    static RE_WS: OnceCell<Regex> = OnceCell::new();
    let re_ws = RE_WS.get_or_init(|| Regex::new(r"[\s\u{00A0}]+").unwrap());
    out = re_ws.replace_all(&out, " ").to_string();

    out.trim().to_string()
}

/// Integer-looking metrics are regrouped with `,` separators; anything else is
/// kept verbatim (trimmed). Empty input yields `None`.
pub fn format_metric(raw: &str) -> Option<String> {
    let t = clean_text(raw);
    if t.is_empty() {
        return None;
    }
    let digits: String = t
        .chars()
        .filter(|c| !matches!(c, ',' | '_' | ' ' | '\u{202F}'))
        .collect();
    if !digits.is_empty() && digits.chars().all(|c| c.is_ascii_digit()) {
        if let Ok(n) = digits.parse::<u64>() {
            return Some(group_thousands(n));
        }
    }
    Some(t)
}

pub fn group_thousands(n: u64) -> String {
    let s = n.to_string();
    let mut out = String::with_capacity(s.len() + s.len() / 3);
    for (i, ch) in s.chars().enumerate() {
        if i > 0 && (s.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out
}

fn encode(s: &str) -> String {
    urlencoding::encode(s).into_owned()
}

fn absolute_url(s: String) -> Option<String> {
    match url::Url::parse(&s) {
        Ok(u) if matches!(u.scheme(), "http" | "https") && u.has_host() => Some(s),
        _ => None,
    }
}

fn non_empty(s: Option<&str>) -> Option<String> {
    s.map(clean_text).filter(|t| !t.is_empty())
}

fn headline(s: &str) -> Option<String> {
    non_empty(Some(s))
}

/// Map one raw record. Returns `None` when the record has no usable headline.
pub fn normalize(record: &RawRecord) -> Option<TrendItem> {
    let source_id = record.source_id();
    let mut extra = BTreeMap::new();

    let (rank, primary, secondary, metric, media, target) = match record {
        RawRecord::Google(t) => {
            let title = headline(&t.title)?;
            for (i, a) in t.articles.iter().take(3).enumerate() {
                let n = i + 1;
                if let Some(v) = non_empty(Some(&a.title)) {
                    extra.insert(format!("article_{n}_title"), v);
                }
                if let Some(v) = a.url.clone().and_then(absolute_url) {
                    extra.insert(format!("article_{n}_url"), v);
                }
                if let Some(v) = non_empty(a.source.as_deref()) {
                    extra.insert(format!("article_{n}_source"), v);
                }
            }
            if let Some(p) = &t.published {
                extra.insert("published".into(), p.clone());
            }
            let target = format!("https://www.google.com/search?q={}", encode(&title));
            (
                None,
                title,
                non_empty(t.traffic.as_deref()),
                None,
                t.picture.clone(),
                target,
            )
        }
        RawRecord::Youtube(v) => {
            let title = headline(&v.title)?;
            let video_id = non_empty(v.video_id.as_deref());
            let target = match &video_id {
                Some(id) => format!("https://www.youtube.com/watch?v={}", encode(id)),
                None => format!(
                    "https://www.youtube.com/results?search_query={}",
                    encode(&title)
                ),
            };
            if let Some(id) = video_id {
                extra.insert("video_id".into(), id);
            }
            if let Some(p) = non_empty(v.published.as_deref()) {
                extra.insert("published".into(), p);
            }
            (
                None,
                title,
                non_empty(v.channel.as_deref()),
                v.views.as_deref().and_then(format_metric),
                v.thumbnail.clone(),
                target,
            )
        }
        RawRecord::Twitter(h) => {
            let name = headline(&h.name)?;
            let target = format!("https://twitter.com/search?q={}", encode(&name));
            (
                Some(h.rank),
                name,
                None,
                h.tweet_count.as_deref().and_then(format_metric),
                None,
                target,
            )
        }
        RawRecord::Wikipedia(p) => {
            let raw_title = p.article.trim();
            let title = headline(&raw_title.replace('_', " "))?;
            let target = format!("https://en.wikipedia.org/wiki/{}", encode(raw_title));
            (
                Some(p.rank),
                title,
                None,
                Some(group_thousands(p.views)),
                None,
                target,
            )
        }
        RawRecord::Reddit(p) => {
            let title = headline(&p.title)?;
            let subreddit = non_empty(p.subreddit.as_deref())
                .map(|s| s.trim_start_matches("r/").to_string())
                .map(|s| format!("r/{s}"));
            let target = match p.permalink.as_deref().filter(|l| !l.trim().is_empty()) {
                Some(link) => format!("https://www.reddit.com{}", encode_path(link)),
                None => format!("https://www.reddit.com/search/?q={}", encode(&title)),
            };
            if let Some(c) = p.num_comments {
                extra.insert("comments".into(), group_thousands(c));
            }
            let metric = p.ups.map(|u| {
                if u < 0 {
                    format!("-{}", group_thousands(u.unsigned_abs()))
                } else {
                    group_thousands(u as u64)
                }
            });
            (None, title, subreddit, metric, p.thumbnail.clone(), target)
        }
        RawRecord::Spotify(t) => {
            let song = headline(&t.song)?;
            let artist = non_empty(Some(&t.artist));
            let query = match &artist {
                Some(a) => format!("{song} {a}"),
                None => song.clone(),
            };
            let target = format!("https://open.spotify.com/search/{}", encode(&query));
            (
                t.rank,
                song,
                artist,
                t.streams.as_deref().and_then(format_metric),
                None,
                target,
            )
        }
        RawRecord::Netflix(t) => {
            let title = headline(&t.title)?;
            let target = format!("https://www.netflix.com/search?q={}", encode(&title));
            (t.rank, title, None, None, t.poster.clone(), target)
        }
    };

    Some(TrendItem {
        source_id,
        rank: rank.filter(|r| *r > 0),
        primary_text: primary,
        secondary_text: secondary,
        metric_value: metric,
        media_url: media.and_then(absolute_url),
        target_url: absolute_url(target)?,
        extra,
    })
}

/// Normalize a whole fetch: drop unusable records, cap at `MAX_ITEMS`, and
/// re-derive ranks from the final order for ranked sources.
pub fn normalize_batch(source: SourceId, records: &[RawRecord]) -> Normalized {
    let mut dropped = 0usize;
    let mut items = Vec::with_capacity(records.len().min(MAX_ITEMS));

    for rec in records {
        if items.len() == MAX_ITEMS {
            break;
        }
        if rec.source_id() != source {
            dropped += 1;
            continue;
        }
        match normalize(rec) {
            Some(item) => items.push(item),
            None => dropped += 1,
        }
    }

    let ranked = source.is_ranked();
    for (i, item) in items.iter_mut().enumerate() {
        item.rank = ranked.then_some(i as u32 + 1);
    }

    Normalized { items, dropped }
}

/// Percent-encode each path segment, keeping the separators.
fn encode_path(path: &str) -> String {
    let trimmed = path.trim();
    let encoded = trimmed
        .split('/')
        .map(encode)
        .collect::<Vec<_>>()
        .join("/");
    if encoded.starts_with('/') {
        encoded
    } else {
        format!("/{encoded}")
    }
}
