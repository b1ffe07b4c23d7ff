// src/config.rs
//! Service and per-source configuration, loaded from TOML with env overrides.

use anyhow::{anyhow, Context, Result};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::model::SourceId;

pub const DEFAULT_TRENDS_CONFIG_PATH: &str = "config/trends.toml";

pub const ENV_TRENDS_CONFIG_PATH: &str = "TRENDS_CONFIG_PATH";
pub const ENV_TTL_SECS: &str = "TRENDS_TTL_SECS";
pub const ENV_WEBDRIVER_URL: &str = "TRENDS_WEBDRIVER_URL";
pub const ENV_REGION: &str = "TRENDS_REGION";

const MIN_TIMEOUT_SECS: u64 = 10;
const MAX_TIMEOUT_SECS: u64 = 30;

pub const DEFAULT_USER_AGENT: &str =
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0 Safari/537.36";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StrategyKind {
    Api,
    Markup,
    Browser,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ServiceCfg {
    /// `None` keeps results until an explicit refresh.
    pub ttl: Option<Duration>,
    /// Two-letter region code, e.g. `IN`.
    pub region: String,
    /// Country slug used by sites that key on names, e.g. `india`.
    pub region_name: String,
    pub webdriver_url: Option<String>,
    pub browser_wait: Duration,
    pub user_agent: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SourceCfg {
    /// May contain `{date}`, replaced with yesterday's `YYYY/MM/DD` (UTC).
    pub url: String,
    pub strategies: Vec<StrategyKind>,
    pub timeout: Duration,
    pub wait_selector: Option<String>,
    pub min_popularity: u64,
    /// Human-facing page for the browser strategy when `url` is a machine endpoint.
    pub browser_url: Option<String>,
}

impl SourceCfg {
    pub fn resolved_url(&self, now: chrono::DateTime<chrono::Utc>) -> String {
        expand_date(&self.url, now)
    }

    /// URL a given strategy should load.
    pub fn url_for(&self, kind: StrategyKind, now: chrono::DateTime<chrono::Utc>) -> String {
        match (kind, self.browser_url.as_deref()) {
            (StrategyKind::Browser, Some(page)) => expand_date(page, now),
            _ => self.resolved_url(now),
        }
    }
}

fn expand_date(url: &str, now: chrono::DateTime<chrono::Utc>) -> String {
    if !url.contains("{date}") {
        return url.to_string();
    }
    let yesterday = now - chrono::Duration::days(1);
    url.replace("{date}", &yesterday.format("%Y/%m/%d").to_string())
}

#[derive(Debug, Clone, PartialEq)]
pub struct TrendsConfig {
    pub service: ServiceCfg,
    sources: BTreeMap<SourceId, SourceCfg>,
}

// --- file schema ---

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawConfig {
    #[serde(default)]
    service: RawService,
    #[serde(default)]
    sources: BTreeMap<String, RawSource>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawService {
    ttl_secs: Option<u64>,
    region: Option<String>,
    region_name: Option<String>,
    webdriver_url: Option<String>,
    browser_wait_secs: Option<u64>,
    user_agent: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawSource {
    url: Option<String>,
    strategies: Option<Vec<StrategyKind>>,
    timeout_secs: Option<u64>,
    wait_selector: Option<String>,
    min_popularity: Option<u64>,
    browser_url: Option<String>,
}

impl Default for TrendsConfig {
    fn default() -> Self {
        let service = service_from_raw(RawService::default());
        let sources = SourceId::ALL
            .into_iter()
            .map(|id| (id, default_source(id, &service)))
            .collect();
        Self { service, sources }
    }
}

impl TrendsConfig {
    /// Resolved settings for one source. Every source always has an entry.
    pub fn source(&self, id: SourceId) -> SourceCfg {
        self.sources
            .get(&id)
            .cloned()
            .unwrap_or_else(|| default_source(id, &self.service))
    }

    pub fn from_toml_str(s: &str) -> Result<Self> {
        let raw: RawConfig = toml::from_str(s).context("parsing trends config toml")?;
        Self::resolve(raw)
    }

    /// Load from an explicit path.
    pub fn load_from(path: &Path) -> Result<Self> {
        Self::from_toml_str(&read_config(path)?)
    }

    /// Load using env var + fallbacks, then apply env overrides:
    /// 1) $TRENDS_CONFIG_PATH
    /// 2) config/trends.toml
    /// 3) built-in defaults
    pub fn load_default() -> Result<Self> {
        let content = if let Ok(p) = std::env::var(ENV_TRENDS_CONFIG_PATH) {
            let pb = PathBuf::from(p);
            if !pb.exists() {
                return Err(anyhow!("TRENDS_CONFIG_PATH points to non-existent path"));
            }
            Some(read_config(&pb)?)
        } else {
            let default_p = PathBuf::from(DEFAULT_TRENDS_CONFIG_PATH);
            if default_p.exists() {
                Some(read_config(&default_p)?)
            } else {
                None
            }
        };

        let mut raw: RawConfig = match content {
            Some(s) => toml::from_str(&s).context("parsing trends config toml")?,
            None => RawConfig::default(),
        };
        apply_env(&mut raw.service);
        Self::resolve(raw)
    }

    fn resolve(raw: RawConfig) -> Result<Self> {
        let service = service_from_raw(raw.service);

        let mut sources: BTreeMap<SourceId, SourceCfg> = SourceId::ALL
            .into_iter()
            .map(|id| (id, default_source(id, &service)))
            .collect();

        for (key, over) in raw.sources {
            let id: SourceId = key
                .parse()
                .map_err(|e| anyhow!("invalid [sources.{key}] section: {e}"))?;
            let entry = sources
                .entry(id)
                .or_insert_with(|| default_source(id, &service));
            if let Some(url) = over.url {
                entry.url = url;
            }
            if let Some(strategies) = over.strategies {
                if strategies.is_empty() {
                    return Err(anyhow!("[sources.{key}] strategies must not be empty"));
                }
                entry.strategies = strategies;
            }
            if let Some(secs) = over.timeout_secs {
                entry.timeout = clamp_timeout(secs);
            }
            if over.wait_selector.is_some() {
                entry.wait_selector = over.wait_selector;
            }
            if let Some(min) = over.min_popularity {
                entry.min_popularity = min;
            }
            if over.browser_url.is_some() {
                entry.browser_url = over.browser_url;
            }
        }

        Ok(Self { service, sources })
    }
}

fn read_config(path: &Path) -> Result<String> {
    fs::read_to_string(path)
        .with_context(|| format!("reading trends config from {}", path.display()))
}

// Env wins over the file; applied before source URLs are derived from the region.
fn apply_env(rs: &mut RawService) {
    if let Some(secs) = std::env::var(ENV_TTL_SECS)
        .ok()
        .and_then(|v| v.trim().parse::<u64>().ok())
    {
        rs.ttl_secs = Some(secs);
    }
    if let Ok(url) = std::env::var(ENV_WEBDRIVER_URL) {
        rs.webdriver_url = Some(url);
    }
    if let Ok(region) = std::env::var(ENV_REGION) {
        rs.region = Some(region);
    }
}

fn service_from_raw(rs: RawService) -> ServiceCfg {
    ServiceCfg {
        ttl: ttl_from_secs(rs.ttl_secs.unwrap_or(0)),
        region: rs
            .region
            .map(|r| r.trim().to_ascii_uppercase())
            .filter(|r| !r.is_empty())
            .unwrap_or_else(|| "IN".into()),
        region_name: rs
            .region_name
            .map(|r| r.trim().to_ascii_lowercase())
            .filter(|r| !r.is_empty())
            .unwrap_or_else(|| "india".into()),
        webdriver_url: rs
            .webdriver_url
            .map(|u| u.trim().to_string())
            .filter(|u| !u.is_empty()),
        browser_wait: Duration::from_secs(rs.browser_wait_secs.unwrap_or(12).clamp(1, 15)),
        user_agent: rs.user_agent.unwrap_or_else(|| DEFAULT_USER_AGENT.into()),
    }
}

fn ttl_from_secs(secs: u64) -> Option<Duration> {
    (secs > 0).then(|| Duration::from_secs(secs))
}

fn clamp_timeout(secs: u64) -> Duration {
    Duration::from_secs(secs.clamp(MIN_TIMEOUT_SECS, MAX_TIMEOUT_SECS))
}

fn default_source(id: SourceId, service: &ServiceCfg) -> SourceCfg {
    use StrategyKind::*;
    let region = &service.region;
    let region_lower = region.to_ascii_lowercase();
    let name = &service.region_name;

    let (url, strategies, wait_selector) = match id {
        SourceId::Google => (
            format!("https://trends.google.com/trending/rss?geo={region}"),
            vec![Markup],
            None,
        ),
        SourceId::Youtube => (
            format!("https://www.youtube.com/feed/trending?gl={region}"),
            vec![Markup, Browser],
            Some("ytd-video-renderer".to_string()),
        ),
        SourceId::Twitter => (
            format!("https://trends24.in/{name}/"),
            vec![Markup, Browser],
            Some(".trend-card__list".to_string()),
        ),
        SourceId::Wikipedia => (
            "https://wikimedia.org/api/rest_v1/metrics/pageviews/top/en.wikipedia/all-access/{date}"
                .to_string(),
            vec![Api],
            None,
        ),
        SourceId::Reddit => (
            "https://www.reddit.com/r/popular.json?limit=25".to_string(),
            vec![Api, Browser],
            Some("shreddit-post".to_string()),
        ),
        SourceId::Spotify => (
            format!("https://spotifycharts.com/regional/{region_lower}/daily/latest"),
            vec![Markup],
            None,
        ),
        SourceId::Netflix => (
            format!("https://flixpatrol.com/top10/netflix/{name}/"),
            vec![Markup],
            None,
        ),
    };

    let timeout = if strategies.contains(&Browser) {
        clamp_timeout(30)
    } else {
        clamp_timeout(15)
    };

    let browser_url = match id {
        SourceId::Reddit => Some("https://www.reddit.com/r/popular/".to_string()),
        _ => None,
    };

    SourceCfg {
        url,
        strategies,
        timeout,
        wait_selector,
        min_popularity: 0,
        browser_url,
    }
}
