// src/sources/providers/twitter.rs
//! Hashtag trends scraped from trends24's latest hourly card.

use once_cell::sync::Lazy;
use scraper::{Html, Selector};

use crate::config::SourceCfg;
use crate::error::ExtractionError;
use crate::normalize::clean_text;
use crate::sources::types::{Document, Hashtag, RawRecord};

static CARD_LIST: Lazy<Selector> = Lazy::new(|| Selector::parse(".trend-card__list").unwrap());
static ENTRY: Lazy<Selector> = Lazy::new(|| Selector::parse("li").unwrap());
static NAME_LINK: Lazy<Selector> = Lazy::new(|| Selector::parse(".trend-name a").unwrap());
static NAME: Lazy<Selector> = Lazy::new(|| Selector::parse(".trend-name").unwrap());
static COUNT: Lazy<Selector> = Lazy::new(|| Selector::parse(".tweet-count").unwrap());

pub fn extract(doc: &Document, _cfg: &SourceCfg) -> Result<Vec<RawRecord>, ExtractionError> {
    let document = Html::parse_document(&doc.body);

    // Cards are ordered newest first; older cards repeat the same hashtags.
    let Some(latest) = document.select(&CARD_LIST).next() else {
        return Ok(Vec::new());
    };

    let mut out = Vec::new();
    for li in latest.select(&ENTRY) {
        // The name span may also wrap the count; prefer the link text.
        let Some(name_el) = li
            .select(&NAME_LINK)
            .next()
            .or_else(|| li.select(&NAME).next())
        else {
            continue;
        };
        let name = clean_text(&name_el.text().collect::<String>());
        if name.is_empty() {
            continue;
        }
        let tweet_count = li.select(&COUNT).next().and_then(|c| {
            c.value()
                .attr("data-count")
                .map(str::to_string)
                .or_else(|| Some(clean_text(&c.text().collect::<String>())))
                .filter(|s| !s.is_empty())
        });
        out.push(RawRecord::Twitter(Hashtag {
            name,
            rank: out.len() as u32 + 1,
            tweet_count,
        }));
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{StrategyKind, TrendsConfig};
    use crate::model::SourceId;

    #[test]
    fn takes_only_latest_card_and_skips_blank_names() {
        let html = r#"<div class="trend-card"><ol class="trend-card__list">
              <li><span class="trend-name"><a href="/x">#Diwali</a></span><span class="tweet-count" data-count="120000">120K</span></li>
              <li><span class="trend-name"> </span></li>
              <li><span class="trend-name"><a href="/y">Virat Kohli</a></span></li>
            </ol></div>
            <div class="trend-card"><ol class="trend-card__list"><li><span class="trend-name">#Old</span></li></ol></div>"#;
        let doc = Document {
            url: "https://trends24.in/india/".into(),
            body: html.into(),
            kind: StrategyKind::Markup,
        };
        let cfg = TrendsConfig::default().source(SourceId::Twitter);
        let out = extract(&doc, &cfg).unwrap();
        let names: Vec<_> = out
            .iter()
            .map(|r| match r {
                RawRecord::Twitter(h) => (h.name.as_str(), h.rank, h.tweet_count.clone()),
                _ => unreachable!(),
            })
            .collect();
        assert_eq!(
            names,
            vec![
                ("#Diwali", 1, Some("120000".to_string())),
                ("Virat Kohli", 2, None),
            ]
        );
    }
}
