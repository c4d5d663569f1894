//! Strategy 2: safe thumbnail interaction.
//!
//! Some classroom formats only load the player after the thumbnail is
//! clicked, either inline or inside a modal. Clicking is done at script
//! level (overlays intercept cursor clicks), scoped to the lesson-content
//! region, followed by bounded progressive polling for whatever the click
//! produced: a new iframe/video, a modal surface, or a full navigation.

use super::{non_fatal, Detection, Strategy};
use crate::canon;
use crate::error::Result;
use crate::session::{BrowserSession, Element};
use crate::types::{LessonContext, ResolveConfig};
use async_trait::async_trait;
use tokio::time::sleep;

pub(crate) const THUMBNAIL_SELECTORS: [&str; 4] = [
    "[class*='VideoThumbnailWrapper']",
    "div[class*='VideoThumbnail']",
    "div[style*='cursor: zoom-in']",
    "[data-testid*='video-thumbnail']",
];

pub(crate) const MODAL_SELECTORS: [&str; 6] = [
    "[role='dialog']",
    "[aria-modal='true']",
    "[class*='Modal']",
    "[class*='modal']",
    ".ReactModal__Content",
    "[class*='Lightbox']",
];

/// Elements scanned inside a detected modal, and page-wide after a click.
pub(crate) const MEDIA_SELECTORS: [&str; 4] = ["iframe", "video", "embed", "[data-video-url]"];

const MEDIA_URL_ATTRS: [&str; 4] = ["src", "data-src", "data-video-url", "data-url"];

/// Neutralize Wistia's click-for-sound backdrop so it cannot swallow the
/// next interaction.
const OVERLAY_DISMISS_SCRIPT: &str = "document.querySelectorAll('[data-handle*=\"click-for-sound\"]')\
     .forEach(function (el) { el.style.pointerEvents = 'none'; el.style.opacity = '0'; });";

pub struct Thumbnail;

#[async_trait]
impl Strategy for Thumbnail {
    fn name(&self) -> &'static str {
        "thumbnail"
    }

    async fn detect(
        &self,
        session: &dyn BrowserSession,
        _ctx: &LessonContext,
        config: &ResolveConfig,
    ) -> Result<Detection> {
        let Some(original_url) = non_fatal(session.current_url().await)? else {
            return Ok(Detection::None);
        };

        let Some(thumb) = find_thumbnail(session, config).await? else {
            return Ok(Detection::None);
        };

        if non_fatal(session.click(&thumb.handle).await)?.is_none() {
            return Ok(Detection::None);
        }

        for wait in &config.wait_tiers {
            sleep(*wait).await;

            // Navigation beats everything: the pipeline has to decide
            // whether the landing page is worth a hop.
            if let Some(url) = non_fatal(session.current_url().await)? {
                if url != original_url {
                    return Ok(Detection::Navigated(url));
                }
            }

            let _ = non_fatal(session.execute(OVERLAY_DISMISS_SCRIPT).await)?;

            // A modal narrows the scan to its own subtree; leftovers
            // elsewhere on the page cannot leak in.
            if let Some(modal) = find_modal(session).await? {
                if let Some(url) = scan_within(session, &modal).await? {
                    return Ok(Detection::Candidate(url));
                }
                continue;
            }

            if let Some(url) = scan_page(session, config).await? {
                return Ok(Detection::Candidate(url));
            }
        }

        Ok(Detection::None)
    }
}

/// A clickable element is only trusted as a video thumbnail when it sits
/// in the content region and carries a video hint: a duration overlay
/// ("3:15") or a video-ish class name.
fn looks_like_video_container(el: &Element) -> bool {
    let duration_hint = el.text.contains(':') && el.text.chars().any(|c| c.is_ascii_digit());
    let class_hint = el
        .attr("class")
        .map(|c| {
            let lower = c.to_ascii_lowercase();
            lower.contains("video") || lower.contains("thumbnail")
        })
        .unwrap_or(false);
    duration_hint || class_hint
}

async fn find_thumbnail(
    session: &dyn BrowserSession,
    config: &ResolveConfig,
) -> Result<Option<Element>> {
    for selector in THUMBNAIL_SELECTORS {
        let Some(found) = non_fatal(session.query(selector).await)? else {
            continue;
        };
        for el in found {
            if !el.displayed || el.y < config.content_min_y {
                continue;
            }
            if looks_like_video_container(&el) {
                return Ok(Some(el));
            }
        }
    }
    Ok(None)
}

async fn find_modal(session: &dyn BrowserSession) -> Result<Option<Element>> {
    for selector in MODAL_SELECTORS {
        let Some(found) = non_fatal(session.query(selector).await)? else {
            continue;
        };
        if let Some(modal) = found.into_iter().find(|m| m.displayed) {
            return Ok(Some(modal));
        }
    }
    Ok(None)
}

/// Scan only inside the modal subtree for a playable URL.
async fn scan_within(session: &dyn BrowserSession, modal: &Element) -> Result<Option<String>> {
    for selector in MEDIA_SELECTORS {
        let Some(found) = non_fatal(session.query_within(&modal.handle, selector).await)? else {
            continue;
        };
        for el in found {
            if let Some(url) = media_url(&el) {
                return Ok(Some(url));
            }
        }
    }
    Ok(None)
}

/// Scan the whole page for an iframe/video the click just loaded,
/// position-filtered so header leftovers stay out.
async fn scan_page(
    session: &dyn BrowserSession,
    config: &ResolveConfig,
) -> Result<Option<String>> {
    for selector in MEDIA_SELECTORS {
        let Some(found) = non_fatal(session.query(selector).await)? else {
            continue;
        };
        for el in found {
            if el.y < config.content_min_y {
                continue;
            }
            if let Some(url) = media_url(&el) {
                return Ok(Some(url));
            }
        }
    }
    Ok(None)
}

fn media_url(el: &Element) -> Option<String> {
    el.first_attr(&MEDIA_URL_ATTRS)
        .filter(|u| canon::is_video_url(u))
        .map(str::to_string)
}
