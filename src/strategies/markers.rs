//! Strategy 4: platform-specific markers that carry no player URL.
//!
//! Wistia in particular leaves two breadcrumbs on pages where no iframe
//! ever materializes: share links with a `wvideo=` query parameter, and
//! lazy-init `wistia_async_<id>` class markers. Both yield an id from
//! which the embed URL is synthesized.

use super::{non_fatal, Detection, Strategy};
use crate::canon;
use crate::error::Result;
use crate::session::BrowserSession;
use crate::types::{LessonContext, Platform, ResolveConfig};
use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;

const WVIDEO_LINKS: &str = "a[href*='wvideo=']";

const WISTIA_MARKERS: &str = "div[class*='wistia_embed'], div[class*='wistia_async_']";

static WISTIA_ASYNC_CLASS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"wistia_async_([A-Za-z0-9]+)").unwrap());

pub struct Markers;

#[async_trait]
impl Strategy for Markers {
    fn name(&self) -> &'static str {
        "markers"
    }

    async fn detect(
        &self,
        session: &dyn BrowserSession,
        _ctx: &LessonContext,
        _config: &ResolveConfig,
    ) -> Result<Detection> {
        if let Some(links) = non_fatal(session.query(WVIDEO_LINKS).await)? {
            for link in links {
                let Some(href) = link.attr("href") else {
                    continue;
                };
                if let Some(id) = canon::wvideo_param(href) {
                    return Ok(Detection::Candidate(canon::canonical_url(
                        Platform::Wistia,
                        &id,
                    )));
                }
            }
        }

        if let Some(markers) = non_fatal(session.query(WISTIA_MARKERS).await)? {
            for marker in markers {
                let Some(class) = marker.attr("class") else {
                    continue;
                };
                if let Some(caps) = WISTIA_ASYNC_CLASS.captures(class) {
                    return Ok(Detection::Candidate(canon::canonical_url(
                        Platform::Wistia,
                        &caps[1],
                    )));
                }
            }
        }

        Ok(Detection::None)
    }
}
