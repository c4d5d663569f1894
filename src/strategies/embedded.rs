//! Strategy 1: the client-side hydration payload.
//!
//! The platform ships every lesson page with a `__NEXT_DATA__` JSON blob
//! that usually carries the real playable URL before any player has
//! loaded. This is the most reliable source when present, so it runs
//! first. Field nesting varies between classroom formats, so explicit
//! known paths are tried before a recursive sweep.

use super::{non_fatal, Detection, Strategy};
use crate::canon;
use crate::error::Result;
use crate::session::BrowserSession;
use crate::types::{LessonContext, ResolveConfig};
use async_trait::async_trait;
use serde_json::Value;

pub(crate) const HYDRATION_SELECTOR: &str = "script#__NEXT_DATA__";

/// Known lesson-level fields, most trustworthy first. `videoLinksData`
/// is the field that in practice holds true playable URLs, as opposed to
/// the generic link fields around it.
const LESSON_FIELDS: [&[&str]; 3] = [
    &["video", "video_url"],
    &["metadata", "videoLinksData"],
    &["metadata", "videoLink"],
];

const MODULE_FIELDS: [&str; 3] = ["videoLink", "videoUrl", "video_url"];

pub struct Embedded;

#[async_trait]
impl Strategy for Embedded {
    fn name(&self) -> &'static str {
        "embedded"
    }

    async fn detect(
        &self,
        session: &dyn BrowserSession,
        _ctx: &LessonContext,
        _config: &ResolveConfig,
    ) -> Result<Detection> {
        let Some(scripts) = non_fatal(session.query(HYDRATION_SELECTOR).await)? else {
            return Ok(Detection::None);
        };
        let Some(script) = scripts.first() else {
            return Ok(Detection::None);
        };
        let Ok(data) = serde_json::from_str::<Value>(&script.text) else {
            return Ok(Detection::None);
        };

        Ok(match find_in_hydration(&data) {
            Some(url) => Detection::Candidate(url),
            None => Detection::None,
        })
    }
}

fn find_in_hydration(data: &Value) -> Option<String> {
    let page_props = &data["props"]["pageProps"];

    let lesson = &page_props["lesson"];
    if !lesson.is_null() {
        for path in LESSON_FIELDS {
            if let Some(url) = url_at(lesson, path) {
                return Some(url);
            }
        }
        if let Some(url) = first_video_in(lesson) {
            return Some(url);
        }
        if let Some(url) = wvideo_in(lesson) {
            return Some(url);
        }
        return None;
    }

    // Some classroom formats expose video data only on the module tree:
    // pageProps.course.children[].course.metadata.
    let selected = page_props["selectedModule"]
        .as_str()
        .or_else(|| page_props["selectedLesson"].as_str());
    let children = page_props["course"]["children"].as_array()?;

    let module_url = |child: &Value| -> Option<String> {
        let metadata = &child["course"]["metadata"];
        for field in MODULE_FIELDS {
            if let Some(url) = url_at(metadata, &[field]) {
                return Some(url);
            }
        }
        first_video_in(metadata)
    };

    if let Some(id) = selected {
        for child in children {
            if child["course"]["id"].as_str() == Some(id) {
                if let Some(url) = module_url(child) {
                    return Some(url);
                }
            }
        }
    }
    children.iter().find_map(module_url)
}

/// Read a nested field and pull the first video URL out of it, whether it
/// is a bare URL string, a JSON-encoded list, or a nested object.
fn url_at(value: &Value, path: &[&str]) -> Option<String> {
    let mut cursor = value;
    for key in path {
        cursor = &cursor[*key];
    }
    match cursor {
        Value::String(s) => {
            // videoLinksData arrives as a JSON-encoded string.
            if let Ok(inner) = serde_json::from_str::<Value>(s) {
                if inner.is_object() || inner.is_array() {
                    return first_video_in(&inner);
                }
            }
            if canon::is_video_url(s) {
                Some(s.clone())
            } else {
                canon::find_video_urls(s).into_iter().next()
            }
        }
        Value::Null => None,
        other => first_video_in(other),
    }
}

/// Recursive sweep: any string value anywhere in the subtree that looks
/// like a playable video URL (thumbnails filtered out).
fn first_video_in(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => {
            if canon::is_video_url(s) {
                Some(s.clone())
            } else {
                None
            }
        }
        Value::Array(items) => items.iter().find_map(first_video_in),
        Value::Object(map) => map.values().find_map(first_video_in),
        _ => None,
    }
}

/// Platform-internal share links sometimes smuggle the Wistia id in a
/// `wvideo=` query parameter instead of exposing a player URL.
fn wvideo_in(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => {
            if s.contains("wvideo=") && s.contains("skool.com") {
                // The link usually sits inside prose, not as a bare URL.
                canon::wvideo_in_text(s)
                    .map(|id| canon::canonical_url(crate::types::Platform::Wistia, &id))
            } else {
                None
            }
        }
        Value::Array(items) => items.iter().find_map(wvideo_in),
        Value::Object(map) => map.values().find_map(wvideo_in),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn lesson_video_url_wins() {
        let data = json!({"props": {"pageProps": {"lesson": {
            "video": {"video_url": "https://youtu.be/dQw4w9WgXcQ",
                      "original_thumbnail_url": "https://img.youtube.com/vi/dQw4w9WgXcQ/hq.jpg"},
            "metadata": {"videoLink": "https://vimeo.com/111111"}
        }}}});
        assert_eq!(
            find_in_hydration(&data).as_deref(),
            Some("https://youtu.be/dQw4w9WgXcQ")
        );
    }

    #[test]
    fn video_links_data_beats_generic_link_fields() {
        let encoded = r#"[{"url": "https://www.loom.com/share/abc123XYZ", "kind": "video"}]"#;
        let data = json!({"props": {"pageProps": {"lesson": {
            "metadata": {
                "videoLinksData": encoded,
                "videoLink": "https://vimeo.com/222222"
            }
        }}}});
        assert_eq!(
            find_in_hydration(&data).as_deref(),
            Some("https://www.loom.com/share/abc123XYZ")
        );
    }

    #[test]
    fn recursive_sweep_skips_thumbnails() {
        let data = json!({"props": {"pageProps": {"lesson": {
            "blocks": [
                {"image": "https://assets.example.com/cover.png"},
                {"deep": {"media": "https://vimeo.com/333333"}}
            ]
        }}}});
        assert_eq!(
            find_in_hydration(&data).as_deref(),
            Some("https://vimeo.com/333333")
        );
    }

    #[test]
    fn wvideo_link_synthesizes_wistia_embed() {
        let data = json!({"props": {"pageProps": {"lesson": {
            "body": "see https://www.skool.com/x/lesson-1?wvideo=abc123 for the recording"
        }}}});
        assert_eq!(
            find_in_hydration(&data).as_deref(),
            Some("https://fast.wistia.net/embed/iframe/abc123")
        );
    }

    #[test]
    fn module_metadata_fallback_prefers_selected() {
        let data = json!({"props": {"pageProps": {
            "selectedModule": "m2",
            "course": {"children": [
                {"course": {"id": "m1", "metadata": {"videoLink": "https://vimeo.com/111111"}}},
                {"course": {"id": "m2", "metadata": {"videoLink": "https://vimeo.com/222222"}}}
            ]}
        }}});
        assert_eq!(
            find_in_hydration(&data).as_deref(),
            Some("https://vimeo.com/222222")
        );
    }

    #[test]
    fn empty_hydration_yields_nothing() {
        let data = json!({"props": {"pageProps": {}}});
        assert_eq!(find_in_hydration(&data), None);
    }
}
