//! Strategy 3: passive iframe/video scan inside the lesson content.
//!
//! No interaction; just read whatever embeds already sit in the content
//! region. Scoping to known content containers (with a page-wide,
//! position-filtered fallback) keeps header and sidebar players out.

use super::{non_fatal, Detection, Strategy};
use crate::canon;
use crate::error::Result;
use crate::session::{BrowserSession, Element};
use crate::types::{LessonContext, ResolveConfig};
use async_trait::async_trait;

pub(crate) const CONTENT_CONTAINERS: [&str; 7] = [
    "main",
    "article",
    "[role='main']",
    "[class*='lesson']",
    "[class*='content']",
    "[class*='post']",
    "[class*='module']",
];

const EMBED_SELECTORS: [&str; 3] = ["iframe", "video", "embed"];

const EMBED_URL_ATTRS: [&str; 2] = ["src", "data-src"];

pub struct Frames;

#[async_trait]
impl Strategy for Frames {
    fn name(&self) -> &'static str {
        "frames"
    }

    async fn detect(
        &self,
        session: &dyn BrowserSession,
        _ctx: &LessonContext,
        config: &ResolveConfig,
    ) -> Result<Detection> {
        for container in CONTENT_CONTAINERS {
            let Some(roots) = non_fatal(session.query(container).await)? else {
                continue;
            };
            for root in roots {
                for selector in EMBED_SELECTORS {
                    let Some(found) =
                        non_fatal(session.query_within(&root.handle, selector).await)?
                    else {
                        continue;
                    };
                    if let Some(url) = found.iter().find_map(embed_url) {
                        return Ok(Detection::Candidate(url));
                    }
                }
            }
        }

        // No recognizable content container; fall back to a page-wide scan
        // with the header band filtered out by position.
        for selector in EMBED_SELECTORS {
            let Some(found) = non_fatal(session.query(selector).await)? else {
                continue;
            };
            if let Some(url) = found
                .iter()
                .filter(|el| el.y >= config.content_min_y)
                .find_map(embed_url)
            {
                return Ok(Detection::Candidate(url));
            }
        }

        Ok(Detection::None)
    }
}

fn embed_url(el: &Element) -> Option<String> {
    el.first_attr(&EMBED_URL_ATTRS)
        .filter(|u| canon::is_video_url(u))
        .map(str::to_string)
}
