// src/sources/strategy.rs
//! Plain HTTP strategies: a JSON API call and a browser-disguised page fetch.

use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::header::{self, HeaderMap, HeaderValue};

use crate::config::StrategyKind;
use crate::error::FetchCause;
use crate::sources::types::{Document, ExtractionStrategy, Target};

const API_USER_AGENT: &str = "trend-pulse/0.1 (trend aggregation service)";

/// GET against a documented JSON endpoint.
pub struct ApiStrategy {
    client: reqwest::Client,
}

impl ApiStrategy {
    pub fn new() -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(API_USER_AGENT)
            .connect_timeout(Duration::from_secs(4))
            .build()
            .context("building api http client")?;
        Ok(Self { client })
    }
}

#[async_trait]
impl ExtractionStrategy for ApiStrategy {
    async fn retrieve(&self, target: &Target) -> Result<Document, FetchCause> {
        let req = self
            .client
            .get(&target.url)
            .header(header::ACCEPT, "application/json");
        get_document(req, StrategyKind::Api).await
    }

    fn kind(&self) -> StrategyKind {
        StrategyKind::Api
    }
}

/// GET of a rendered-on-server page with a browser-like header set.
/// Most targets reject default client identifiers outright.
pub struct MarkupStrategy {
    client: reqwest::Client,
}

impl MarkupStrategy {
    pub fn new(user_agent: &str) -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::ACCEPT,
            HeaderValue::from_static(
                "text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8",
            ),
        );
        headers.insert(
            header::ACCEPT_LANGUAGE,
            HeaderValue::from_static("en-US,en;q=0.9"),
        );
        headers.insert(header::CACHE_CONTROL, HeaderValue::from_static("no-cache"));

        let client = reqwest::Client::builder()
            .user_agent(user_agent)
            .default_headers(headers)
            .connect_timeout(Duration::from_secs(4))
            .build()
            .context("building markup http client")?;
        Ok(Self { client })
    }
}

#[async_trait]
impl ExtractionStrategy for MarkupStrategy {
    async fn retrieve(&self, target: &Target) -> Result<Document, FetchCause> {
        get_document(self.client.get(&target.url), StrategyKind::Markup).await
    }

    fn kind(&self) -> StrategyKind {
        StrategyKind::Markup
    }
}

async fn get_document(
    req: reqwest::RequestBuilder,
    kind: StrategyKind,
) -> Result<Document, FetchCause> {
    let resp = req.send().await?;
    let status = resp.status();
    if !status.is_success() {
        return Err(FetchCause::Status(status.as_u16()));
    }
    let url = resp.url().to_string();
    let body = resp.text().await?;
    Ok(Document { url, body, kind })
}
