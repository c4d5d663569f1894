//! The browser collaborator seam.
//!
//! The engine never talks to a WebDriver directly: strategies and the
//! isolator work against [`BrowserSession`], which any authenticated,
//! ready browser can implement. [`webdriver::WebDriverSession`] is the
//! thirtyfour-backed production implementation; tests use a scripted
//! mock.

pub mod webdriver;

#[cfg(test)]
pub(crate) mod mock;

use crate::error::SessionError;
use async_trait::async_trait;
use std::collections::BTreeMap;

pub type SessionResult<T> = std::result::Result<T, SessionError>;

/// Opaque reference to a live DOM element, valid for follow-up calls
/// (click, scoped query) against the same session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ElementHandle(pub String);

/// Eager snapshot of a queried element.
///
/// Strategies mostly read attributes and positions, so sessions capture
/// those up front instead of handing out chatty live handles.
#[derive(Debug, Clone)]
pub struct Element {
    pub handle: ElementHandle,
    pub tag: String,
    /// Rendered text content (for `<script>` tags: the script body).
    pub text: String,
    /// Vertical page position of the element's top edge.
    pub y: f64,
    pub displayed: bool,
    pub attrs: BTreeMap<String, String>,
}

impl Element {
    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attrs.get(name).map(String::as_str)
    }

    /// First attribute out of `names` that is present and non-empty.
    pub fn first_attr(&self, names: &[&str]) -> Option<&str> {
        names
            .iter()
            .filter_map(|n| self.attr(n))
            .find(|v| !v.is_empty())
    }
}

/// A ready, authenticated browser session.
///
/// Implementations must map a dead/unreachable browser to
/// [`SessionError::Lost`]; every other failure is non-fatal and the
/// engine degrades it to "no candidate" for the calling strategy.
#[async_trait]
pub trait BrowserSession: Send + Sync {
    async fn navigate(&self, url: &str) -> SessionResult<()>;

    async fn current_url(&self) -> SessionResult<String>;

    async fn page_source(&self) -> SessionResult<String>;

    /// All elements matching a CSS selector, as snapshots.
    async fn query(&self, selector: &str) -> SessionResult<Vec<Element>>;

    /// Elements matching `selector` inside the subtree rooted at `root`.
    async fn query_within(
        &self,
        root: &ElementHandle,
        selector: &str,
    ) -> SessionResult<Vec<Element>>;

    /// Script-level click, bypassing cursor interception by overlays.
    async fn click(&self, el: &ElementHandle) -> SessionResult<()>;

    /// Execute a script in page context and return its JSON result.
    async fn execute(&self, script: &str) -> SessionResult<serde_json::Value>;

    async fn clear_cookies(&self) -> SessionResult<()>;

    async fn clear_storage(&self) -> SessionResult<()>;

    /// Escape-equivalent dismissal of whatever overlay has focus.
    async fn dismiss_overlay(&self) -> SessionResult<()>;
}
