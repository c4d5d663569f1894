//! Scripted in-memory [`BrowserSession`] for tests.
//!
//! CSS matching is declarative rather than simulated: each mock element
//! lists the selector strings it answers to, which keeps page fixtures
//! short and makes strategy/selector coupling explicit in the tests.

use super::{BrowserSession, Element, ElementHandle, SessionResult};
use crate::error::SessionError;
use async_trait::async_trait;
use std::collections::{BTreeMap, HashMap};
use std::sync::Mutex;

#[derive(Debug, Clone)]
pub struct MockElement {
    pub selectors: Vec<String>,
    pub element: Element,
    /// Scoped children: (selector they answer to, child element).
    pub children: Vec<(String, Element)>,
}

impl MockElement {
    pub fn new(tag: &str, handle: &str) -> Self {
        Self {
            selectors: Vec::new(),
            element: Element {
                handle: ElementHandle(handle.to_string()),
                tag: tag.to_string(),
                text: String::new(),
                y: 400.0,
                displayed: true,
                attrs: BTreeMap::new(),
            },
            children: Vec::new(),
        }
    }

    pub fn selector(mut self, s: &str) -> Self {
        self.selectors.push(s.to_string());
        self
    }

    pub fn attr(mut self, name: &str, value: &str) -> Self {
        self.element
            .attrs
            .insert(name.to_string(), value.to_string());
        self
    }

    pub fn text(mut self, t: &str) -> Self {
        self.element.text = t.to_string();
        self
    }

    pub fn y(mut self, y: f64) -> Self {
        self.element.y = y;
        self
    }

    pub fn hidden(mut self) -> Self {
        self.element.displayed = false;
        self
    }

    pub fn child(mut self, selector: &str, element: Element) -> Self {
        self.children.push((selector.to_string(), element));
        self
    }
}

/// Convenience for building bare child elements.
pub fn el_with_attr(tag: &str, handle: &str, name: &str, value: &str) -> Element {
    MockElement::new(tag, handle).attr(name, value).element
}

#[derive(Debug, Clone, Default)]
pub struct MockPage {
    pub source: String,
    pub elements: Vec<MockElement>,
}

impl MockPage {
    pub fn with_source(source: &str) -> Self {
        Self {
            source: source.to_string(),
            elements: Vec::new(),
        }
    }

    pub fn element(mut self, e: MockElement) -> Self {
        self.elements.push(e);
        self
    }
}

/// What clicking a given element handle does to the page.
#[derive(Debug, Clone)]
pub enum ClickEffect {
    /// Full-page navigation to another registered page.
    Navigate(String),
    /// New elements appear in place (modal, lazily-loaded iframe).
    Reveal(Vec<MockElement>),
    Nothing,
}

#[derive(Default)]
struct State {
    current_url: String,
    pages: HashMap<String, MockPage>,
    clicks: HashMap<String, ClickEffect>,
    lost: bool,
    pub cookies_cleared: usize,
    pub storage_cleared: usize,
    pub escapes: usize,
    pub scripts: Vec<String>,
    pub clicked: Vec<String>,
}

pub struct MockSession {
    state: Mutex<State>,
}

impl MockSession {
    pub fn new(start_url: &str, page: MockPage) -> Self {
        let mut pages = HashMap::new();
        pages.insert(start_url.to_string(), page);
        Self {
            state: Mutex::new(State {
                current_url: start_url.to_string(),
                pages,
                ..State::default()
            }),
        }
    }

    pub fn add_page(&self, url: &str, page: MockPage) {
        self.state
            .lock()
            .unwrap()
            .pages
            .insert(url.to_string(), page);
    }

    pub fn on_click(&self, handle: &str, effect: ClickEffect) {
        self.state
            .lock()
            .unwrap()
            .clicks
            .insert(handle.to_string(), effect);
    }

    /// Make every subsequent call fail with [`SessionError::Lost`].
    pub fn kill(&self) {
        self.state.lock().unwrap().lost = true;
    }

    pub fn cookies_cleared(&self) -> usize {
        self.state.lock().unwrap().cookies_cleared
    }

    pub fn storage_cleared(&self) -> usize {
        self.state.lock().unwrap().storage_cleared
    }

    pub fn escapes(&self) -> usize {
        self.state.lock().unwrap().escapes
    }

    pub fn clicked(&self) -> Vec<String> {
        self.state.lock().unwrap().clicked.clone()
    }

    fn check_alive(state: &State) -> SessionResult<()> {
        if state.lost {
            Err(SessionError::Lost("mock session killed".into()))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl BrowserSession for MockSession {
    async fn navigate(&self, url: &str) -> SessionResult<()> {
        let mut state = self.state.lock().unwrap();
        Self::check_alive(&state)?;
        if !state.pages.contains_key(url) {
            return Err(SessionError::Other(format!("no mock page for {url}")));
        }
        state.current_url = url.to_string();
        Ok(())
    }

    async fn current_url(&self) -> SessionResult<String> {
        let state = self.state.lock().unwrap();
        Self::check_alive(&state)?;
        Ok(state.current_url.clone())
    }

    async fn page_source(&self) -> SessionResult<String> {
        let state = self.state.lock().unwrap();
        Self::check_alive(&state)?;
        Ok(state
            .pages
            .get(&state.current_url)
            .map(|p| p.source.clone())
            .unwrap_or_default())
    }

    async fn query(&self, selector: &str) -> SessionResult<Vec<Element>> {
        let state = self.state.lock().unwrap();
        Self::check_alive(&state)?;
        let Some(page) = state.pages.get(&state.current_url) else {
            return Ok(vec![]);
        };
        Ok(page
            .elements
            .iter()
            .filter(|e| e.selectors.iter().any(|s| s == selector))
            .map(|e| e.element.clone())
            .collect())
    }

    async fn query_within(
        &self,
        root: &ElementHandle,
        selector: &str,
    ) -> SessionResult<Vec<Element>> {
        let state = self.state.lock().unwrap();
        Self::check_alive(&state)?;
        let Some(page) = state.pages.get(&state.current_url) else {
            return Ok(vec![]);
        };
        Ok(page
            .elements
            .iter()
            .filter(|e| e.element.handle == *root)
            .flat_map(|e| e.children.iter())
            .filter(|(s, _)| s == selector)
            .map(|(_, child)| child.clone())
            .collect())
    }

    async fn click(&self, el: &ElementHandle) -> SessionResult<()> {
        let mut state = self.state.lock().unwrap();
        Self::check_alive(&state)?;
        state.clicked.push(el.0.clone());
        match state.clicks.get(&el.0).cloned() {
            Some(ClickEffect::Navigate(url)) => {
                state.current_url = url;
            }
            Some(ClickEffect::Reveal(extra)) => {
                let current = state.current_url.clone();
                if let Some(page) = state.pages.get_mut(&current) {
                    page.elements.extend(extra);
                }
            }
            Some(ClickEffect::Nothing) | None => {}
        }
        Ok(())
    }

    async fn execute(&self, script: &str) -> SessionResult<serde_json::Value> {
        let mut state = self.state.lock().unwrap();
        Self::check_alive(&state)?;
        state.scripts.push(script.to_string());
        Ok(serde_json::Value::Null)
    }

    async fn clear_cookies(&self) -> SessionResult<()> {
        let mut state = self.state.lock().unwrap();
        Self::check_alive(&state)?;
        state.cookies_cleared += 1;
        Ok(())
    }

    async fn clear_storage(&self) -> SessionResult<()> {
        let mut state = self.state.lock().unwrap();
        Self::check_alive(&state)?;
        state.storage_cleared += 1;
        Ok(())
    }

    async fn dismiss_overlay(&self) -> SessionResult<()> {
        let mut state = self.state.lock().unwrap();
        Self::check_alive(&state)?;
        state.escapes += 1;
        Ok(())
    }
}
