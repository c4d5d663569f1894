//! Strategy 5: last-resort scan of the raw page source.
//!
//! Parses the full HTML once and looks for embed elements the live DOM
//! queries missed (server-rendered markup behind hydration errors, script
//! bodies, comments), then sweeps the raw text for any video-shaped URL.
//! Runs last: broadest reach, least precision.

use super::{non_fatal, Detection, Strategy};
use crate::canon;
use crate::error::Result;
use crate::session::BrowserSession;
use crate::types::{LessonContext, ResolveConfig};
use async_trait::async_trait;
use scraper::{Html, Selector};

pub struct Legacy;

#[async_trait]
impl Strategy for Legacy {
    fn name(&self) -> &'static str {
        "legacy"
    }

    async fn detect(
        &self,
        session: &dyn BrowserSession,
        _ctx: &LessonContext,
        _config: &ResolveConfig,
    ) -> Result<Detection> {
        let Some(source) = non_fatal(session.page_source().await)? else {
            return Ok(Detection::None);
        };

        Ok(match scan_source(&source) {
            Some(url) => Detection::Candidate(url),
            None => Detection::None,
        })
    }
}

pub(crate) fn scan_source(source: &str) -> Option<String> {
    let document = Html::parse_document(source);
    // Static selector strings; parse cannot fail.
    let embeds = Selector::parse("iframe, video, embed").ok()?;

    for el in document.select(&embeds) {
        for attr in ["src", "data-src"] {
            if let Some(url) = el.value().attr(attr) {
                if canon::is_video_url(url) {
                    return Some(url.to_string());
                }
            }
        }
    }

    canon::find_video_urls(source).into_iter().next()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn finds_iframe_src_in_markup() {
        let html = r#"<html><body>
            <iframe src="https://player.vimeo.com/video/123456"></iframe>
        </body></html>"#;
        assert_eq!(
            scan_source(html).as_deref(),
            Some("https://player.vimeo.com/video/123456")
        );
    }

    #[test]
    fn finds_lazy_data_src() {
        let html = r#"<video data-src="https://cdn.example.com/media/clip.mp4"></video>"#;
        assert_eq!(
            scan_source(html).as_deref(),
            Some("https://cdn.example.com/media/clip.mp4")
        );
    }

    #[test]
    fn falls_back_to_raw_text_sweep() {
        let html = r#"<script>var player = {"url": "https://youtu.be/dQw4w9WgXcQ"};</script>"#;
        assert_eq!(
            scan_source(html).as_deref(),
            Some("https://youtu.be/dQw4w9WgXcQ")
        );
    }

    #[test]
    fn ignores_thumbnail_urls() {
        let html = r#"<img src="https://img.youtube.com/vi/dQw4w9WgXcQ/hqdefault.jpg">"#;
        assert_eq!(scan_source(html), None);
    }
}
