// src/sources/browser.rs
//! Scripted-browser strategy speaking the W3C WebDriver protocol to an external
//! driver (chromedriver, geckodriver, selenium). Expensive: reserve it for sources
//! that reject plain HTTP clients.
//!
//! A session is torn down on every exit path. `retrieve` closes it explicitly; if
//! the future is dropped mid-flight (outer timeout) the `Drop` impl schedules the
//! DELETE on the runtime. Creation runs on its own task, which closes the session
//! itself when nobody is left to receive it.

use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Method;
use serde_json::{json, Value};
use tokio::sync::oneshot;
use tokio::time::Instant;
use tracing::{debug, warn};

use crate::config::StrategyKind;
use crate::error::FetchCause;
use crate::sources::types::{Document, ExtractionStrategy, Target};

const POLL_INTERVAL: Duration = Duration::from_millis(250);

pub struct BrowserStrategy {
    client: reqwest::Client,
    endpoint: Option<String>,
    wait: Duration,
    user_agent: String,
}

impl BrowserStrategy {
    /// `endpoint` is the WebDriver base URL, e.g. `http://localhost:4444`.
    /// Without one the strategy reports itself unavailable.
    pub fn new(endpoint: Option<String>, wait: Duration, user_agent: &str) -> Result<Self> {
        let client = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(4))
            .build()
            .context("building webdriver http client")?;
        Ok(Self {
            client,
            endpoint: endpoint.map(|e| e.trim_end_matches('/').to_string()),
            wait,
            user_agent: user_agent.to_string(),
        })
    }

    async fn drive(&self, session: &Session, target: &Target) -> Result<Document, FetchCause> {
        session
            .command(Method::POST, "url", Some(json!({ "url": target.url })))
            .await?;

        if let Some(selector) = target.wait_selector.as_deref() {
            self.wait_for(session, selector).await?;
        }

        let source = session.command(Method::GET, "source", None).await?;
        let body = source
            .as_str()
            .ok_or_else(|| FetchCause::Browser("page source was not a string".into()))?
            .to_string();

        Ok(Document {
            url: target.url.clone(),
            body,
            kind: StrategyKind::Browser,
        })
    }

    async fn wait_for(&self, session: &Session, selector: &str) -> Result<(), FetchCause> {
        let deadline = Instant::now() + self.wait;
        let query = json!({ "using": "css selector", "value": selector });
        loop {
            match session.send(Method::POST, "element", Some(&query)).await {
                Ok(_) => return Ok(()),
                Err(e) if e.error == "no such element" => {}
                Err(e) => return Err(e.into()),
            }
            if Instant::now() >= deadline {
                debug!(target: "trends", selector, "wait for element expired");
                return Err(FetchCause::Timeout(self.wait));
            }
            tokio::time::sleep(POLL_INTERVAL).await;
        }
    }
}

#[async_trait]
impl ExtractionStrategy for BrowserStrategy {
    async fn retrieve(&self, target: &Target) -> Result<Document, FetchCause> {
        let Some(endpoint) = self.endpoint.as_deref() else {
            return Err(FetchCause::Unavailable("no webdriver endpoint configured"));
        };

        let session = Session::open(self.client.clone(), endpoint, &self.user_agent).await?;
        let result = self.drive(&session, target).await;
        session.close().await;
        result
    }

    fn kind(&self) -> StrategyKind {
        StrategyKind::Browser
    }
}

/// Error payload of a failed WebDriver command.
#[derive(Debug)]
struct WireError {
    status: u16,
    error: String,
    message: String,
}

impl From<WireError> for FetchCause {
    fn from(e: WireError) -> Self {
        FetchCause::Browser(format!("{} {}: {}", e.status, e.error, e.message))
    }
}

struct Session {
    client: reqwest::Client,
    /// `{endpoint}/session/{id}`
    base: String,
    closed: bool,
}

impl Session {
    /// Session creation runs on its own task so that a session the driver
    /// finishes starting after the caller has gone away is still deleted.
    async fn open(
        client: reqwest::Client,
        endpoint: &str,
        user_agent: &str,
    ) -> Result<Self, FetchCause> {
        let (tx, rx) = oneshot::channel();
        let endpoint = endpoint.to_string();
        let user_agent = user_agent.to_string();
        tokio::spawn(async move {
            let opened = Self::create(client, &endpoint, &user_agent).await;
            if let Err(Ok(orphan)) = tx.send(opened) {
                debug!(
                    target: "trends",
                    session = %orphan.base,
                    "caller gone, closing new session"
                );
                orphan.close().await;
            }
        });
        rx.await
            .map_err(|_| FetchCause::Browser("session setup task ended early".into()))?
    }

    async fn create(
        client: reqwest::Client,
        endpoint: &str,
        user_agent: &str,
    ) -> Result<Self, FetchCause> {
        let caps = json!({
            "capabilities": {
                "alwaysMatch": {
                    "browserName": "chrome",
                    "goog:chromeOptions": {
                        "args": [
                            "--headless=new",
                            "--disable-gpu",
                            "--no-sandbox",
                            format!("--user-agent={user_agent}"),
                        ]
                    }
                }
            }
        });
        let value = send(client.post(format!("{endpoint}/session")).json(&caps)).await?;
        let id = value
            .get("sessionId")
            .and_then(Value::as_str)
            .ok_or_else(|| FetchCause::Browser("new session response had no sessionId".into()))?;

        debug!(target: "trends", session = id, "browser session opened");
        Ok(Self {
            base: format!("{endpoint}/session/{id}"),
            client,
            closed: false,
        })
    }

    async fn command(
        &self,
        method: Method,
        path: &str,
        body: Option<Value>,
    ) -> Result<Value, FetchCause> {
        Ok(self.send(method, path, body.as_ref()).await?)
    }

    async fn send(
        &self,
        method: Method,
        path: &str,
        body: Option<&Value>,
    ) -> Result<Value, WireError> {
        let mut req = self.client.request(method, format!("{}/{}", self.base, path));
        if let Some(b) = body {
            req = req.json(b);
        }
        send(req).await
    }

    async fn close(mut self) {
        match self.client.delete(&self.base).send().await {
            Ok(_) => debug!(target: "trends", session = %self.base, "browser session closed"),
            Err(e) => warn!(
                target: "trends",
                session = %self.base,
                error = %e,
                "browser session close failed"
            ),
        }
        self.closed = true;
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        if self.closed {
            return;
        }
        let client = self.client.clone();
        let url = self.base.clone();
        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                handle.spawn(async move {
                    if let Err(e) = client.delete(&url).send().await {
                        warn!(
                            target: "trends",
                            session = %url,
                            error = %e,
                            "deferred session close failed"
                        );
                    }
                });
            }
            Err(_) => warn!(target: "trends", session = %url, "browser session leaked: no runtime"),
        }
    }
}

async fn send(req: reqwest::RequestBuilder) -> Result<Value, WireError> {
    let transport = |e: reqwest::Error| WireError {
        status: 0,
        error: "transport".into(),
        message: e.to_string(),
    };

    let resp = req.send().await.map_err(transport)?;
    let status = resp.status();
    let mut payload: Value = resp.json().await.map_err(transport)?;

    if !status.is_success() {
        let field = |name: &str| {
            payload
                .pointer(&format!("/value/{name}"))
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string()
        };
        return Err(WireError {
            status: status.as_u16(),
            error: field("error"),
            message: field("message"),
        });
    }

    Ok(payload
        .get_mut("value")
        .map(Value::take)
        .unwrap_or(Value::Null))
}
