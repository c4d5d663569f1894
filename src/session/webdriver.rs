//! thirtyfour-backed [`BrowserSession`] implementation.
//!
//! Wraps an already-authenticated [`WebDriver`]. Login and anti-bot
//! setup happen before this type ever sees the session.

use super::{BrowserSession, Element, ElementHandle, SessionResult};
use crate::error::SessionError;
use async_trait::async_trait;
use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;
use thirtyfour::error::WebDriverError;
use thirtyfour::{By, Key, WebDriver, WebElement};

/// Attributes captured into every element snapshot.
const SNAPSHOT_ATTRS: [&str; 8] = [
    "src",
    "data-src",
    "data-video-url",
    "data-url",
    "href",
    "class",
    "style",
    "id",
];

pub struct WebDriverSession {
    driver: WebDriver,
    handles: Mutex<HashMap<String, WebElement>>,
    next_handle: AtomicU64,
}

impl WebDriverSession {
    pub fn new(driver: WebDriver) -> Self {
        Self {
            driver,
            handles: Mutex::new(HashMap::new()),
            next_handle: AtomicU64::new(0),
        }
    }

    /// Hand the wrapped driver back, e.g. to quit it cleanly.
    pub fn into_inner(self) -> WebDriver {
        self.driver
    }

    fn store(&self, element: WebElement) -> ElementHandle {
        let id = self.next_handle.fetch_add(1, Ordering::Relaxed);
        let key = format!("el-{id}");
        self.handles
            .lock()
            .expect("handle map poisoned")
            .insert(key.clone(), element);
        ElementHandle(key)
    }

    fn live(&self, handle: &ElementHandle) -> SessionResult<WebElement> {
        self.handles
            .lock()
            .expect("handle map poisoned")
            .get(&handle.0)
            .cloned()
            .ok_or_else(|| SessionError::Other(format!("stale element handle {}", handle.0)))
    }

    async fn snapshot(&self, element: WebElement) -> SessionResult<Element> {
        let tag = element.tag_name().await.map_err(map_err)?;
        // Script bodies are not "rendered text"; read them via innerHTML.
        let text = if tag.eq_ignore_ascii_case("script") {
            element
                .attr("innerHTML")
                .await
                .map_err(map_err)?
                .unwrap_or_default()
        } else {
            element.text().await.map_err(map_err)?
        };
        let rect = element.rect().await.map_err(map_err)?;
        let displayed = element.is_displayed().await.map_err(map_err)?;

        let mut attrs = BTreeMap::new();
        for name in SNAPSHOT_ATTRS {
            if let Some(value) = element.attr(name).await.map_err(map_err)? {
                attrs.insert(name.to_string(), value);
            }
        }

        Ok(Element {
            handle: self.store(element),
            tag,
            text,
            y: rect.y,
            displayed,
            attrs,
        })
    }

    async fn snapshot_all(&self, elements: Vec<WebElement>) -> SessionResult<Vec<Element>> {
        let mut out = Vec::with_capacity(elements.len());
        for element in elements {
            match self.snapshot(element).await {
                Ok(snap) => out.push(snap),
                // A node detached mid-snapshot is not worth failing the
                // whole query over.
                Err(SessionError::Lost(msg)) => return Err(SessionError::Lost(msg)),
                Err(_) => continue,
            }
        }
        Ok(out)
    }
}

#[async_trait]
impl BrowserSession for WebDriverSession {
    async fn navigate(&self, url: &str) -> SessionResult<()> {
        self.driver.goto(url).await.map_err(map_err)
    }

    async fn current_url(&self) -> SessionResult<String> {
        Ok(self.driver.current_url().await.map_err(map_err)?.to_string())
    }

    async fn page_source(&self) -> SessionResult<String> {
        self.driver.source().await.map_err(map_err)
    }

    async fn query(&self, selector: &str) -> SessionResult<Vec<Element>> {
        let found = self
            .driver
            .find_all(By::Css(selector))
            .await
            .map_err(map_err)?;
        self.snapshot_all(found).await
    }

    async fn query_within(
        &self,
        root: &ElementHandle,
        selector: &str,
    ) -> SessionResult<Vec<Element>> {
        let root = self.live(root)?;
        let found = root.find_all(By::Css(selector)).await.map_err(map_err)?;
        self.snapshot_all(found).await
    }

    async fn click(&self, el: &ElementHandle) -> SessionResult<()> {
        let element = self.live(el)?;
        let arg = element
            .to_json()
            .map_err(|e| SessionError::Script(e.to_string()))?;
        self.driver
            .execute("arguments[0].click();", vec![arg])
            .await
            .map_err(map_err)?;
        Ok(())
    }

    async fn execute(&self, script: &str) -> SessionResult<serde_json::Value> {
        let ret = self
            .driver
            .execute(script, Vec::new())
            .await
            .map_err(|e| match map_err(e) {
                SessionError::Other(msg) => SessionError::Script(msg),
                fatal => fatal,
            })?;
        Ok(ret.json().clone())
    }

    async fn clear_cookies(&self) -> SessionResult<()> {
        self.driver.delete_all_cookies().await.map_err(map_err)
    }

    async fn clear_storage(&self) -> SessionResult<()> {
        self.execute("window.localStorage.clear(); window.sessionStorage.clear();")
            .await
            .map(|_| ())
    }

    async fn dismiss_overlay(&self) -> SessionResult<()> {
        let body = self.driver.find(By::Css("body")).await.map_err(map_err)?;
        body.send_keys(Key::Escape).await.map_err(map_err)
    }
}

/// Classify driver failures: a dead or unreachable session is fatal,
/// everything else stays strategy-local.
fn map_err(e: WebDriverError) -> SessionError {
    let msg = e.to_string();
    let lower = msg.to_ascii_lowercase();
    if lower.contains("invalid session")
        || lower.contains("session not created")
        || lower.contains("session deleted")
        || lower.contains("connection refused")
        || lower.contains("connection reset")
    {
        SessionError::Lost(msg)
    } else if lower.contains("timed out") || lower.contains("timeout") {
        SessionError::Timeout(msg)
    } else {
        SessionError::Other(msg)
    }
}
