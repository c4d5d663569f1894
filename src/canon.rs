//! Platform URL canonicalization.
//!
//! Every strategy funnels raw URLs through here so that the same video is
//! recognized no matter which URL shape it was observed under (watch page,
//! embed iframe, short link, privacy-enhanced host, ...).

use crate::types::{Platform, VideoCandidate};
use once_cell::sync::Lazy;
use regex::Regex;
use url::Url;

static YOUTUBE_ID: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)(?:youtube\.com/watch\?v=|youtu\.be/|youtube\.com/embed/|youtube\.com/v/|youtube-nocookie\.com/(?:embed/)?)([A-Za-z0-9_-]{11})",
    )
    .unwrap()
});

static VIMEO_ID: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)vimeo\.com/(?:video/|embed/)?(\d+)").unwrap());

static LOOM_ID: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)loom\.com/(?:share|embed)/([A-Za-z0-9_-]+)").unwrap());

static WISTIA_ID: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)(?:fast\.wistia\.net/embed/iframe/|wistia\.com/(?:medias|embed)/)([A-Za-z0-9]+)",
    )
    .unwrap()
});

static URL_IN_TEXT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"https?://[^\s"'<>\\]+"#).unwrap());

const VIDEO_EXTENSIONS: [&str; 7] = [".mp4", ".webm", ".mov", ".m3u8", ".avi", ".wmv", ".mkv"];
const IMAGE_EXTENSIONS: [&str; 6] = [".jpg", ".jpeg", ".png", ".gif", ".webp", ".svg"];

/// Detect the hosting platform from a raw URL.
pub fn detect(url: &str) -> Platform {
    let lower = url.to_ascii_lowercase();
    if lower.contains("youtube.com") || lower.contains("youtu.be") || lower.contains("youtube-nocookie.com") {
        Platform::YouTube
    } else if lower.contains("vimeo.com") {
        Platform::Vimeo
    } else if lower.contains("loom.com") {
        Platform::Loom
    } else if lower.contains("wistia.com") || lower.contains("wistia.net") {
        Platform::Wistia
    } else if path_of(&lower)
        .map(|p| VIDEO_EXTENSIONS.iter().any(|ext| p.ends_with(ext)))
        .unwrap_or(false)
    {
        Platform::Direct
    } else {
        Platform::Unknown
    }
}

/// Derive the platform-specific normalized id from a raw URL.
///
/// Deterministic: the same raw URL always yields the same id. Returns
/// `None` when no id can be derived (the validator treats that as
/// malformed).
pub fn normalized_id(url: &str, platform: Platform) -> Option<String> {
    let stripped = strip_query(url);
    let capture = |re: &Regex| {
        re.captures(url)
            .or_else(|| re.captures(&stripped))
            .map(|c| c[1].to_string())
    };
    match platform {
        Platform::YouTube => capture(&YOUTUBE_ID),
        Platform::Vimeo => capture(&VIMEO_ID),
        Platform::Loom => capture(&LOOM_ID),
        Platform::Wistia => capture(&WISTIA_ID),
        Platform::Direct => path_of(url).map(|p| p.to_ascii_lowercase()),
        Platform::Unknown => None,
    }
}

/// Build the canonical, shareable URL for a `(platform, id)` pair.
///
/// YouTube gets the watch form (not embed); Wistia keeps the
/// `fast.wistia.net` embed form because media pages are routinely gated.
pub fn canonical_url(platform: Platform, id: &str) -> String {
    match platform {
        Platform::YouTube => format!("https://www.youtube.com/watch?v={id}"),
        Platform::Vimeo => format!("https://vimeo.com/{id}"),
        Platform::Loom => format!("https://www.loom.com/share/{id}"),
        Platform::Wistia => format!("https://fast.wistia.net/embed/iframe/{id}"),
        Platform::Direct | Platform::Unknown => id.to_string(),
    }
}

/// Canonicalize any recognized raw URL. Idempotent: applying this to its
/// own output returns the same string.
pub fn canonicalize(url: &str) -> Option<String> {
    let platform = detect(url);
    match platform {
        Platform::Unknown => None,
        Platform::Direct => Some(ensure_scheme(url)),
        _ => normalized_id(url, platform).map(|id| canonical_url(platform, &id)),
    }
}

/// True when a URL has an image/thumbnail shape: image file extension,
/// an image-resize query parameter, or a Wistia `deliveries` asset.
pub fn looks_like_image(url: &str) -> bool {
    let lower = url.to_ascii_lowercase();
    if let Some(path) = path_of(&lower) {
        if IMAGE_EXTENSIONS.iter().any(|ext| path.ends_with(ext)) {
            return true;
        }
    }
    if let Ok(parsed) = Url::parse(&lower) {
        for (k, _) in parsed.query_pairs() {
            if k.starts_with("image_") || k == "crop" || k == "resize" {
                return true;
            }
        }
    } else if lower.contains("image_crop") || lower.contains("image_resize") {
        return true;
    }
    lower.contains("wistia") && lower.contains("deliveries")
}

/// Assemble a full candidate from a strategy's raw URL, or `None` when
/// the URL belongs to no recognized platform.
pub fn candidate_from_raw(raw_url: &str, source_strategy: &'static str) -> Option<VideoCandidate> {
    let platform = detect(raw_url);
    if platform == Platform::Unknown {
        return None;
    }
    let id = normalized_id(raw_url, platform)?;
    let canonical = match platform {
        Platform::Direct => ensure_scheme(raw_url),
        _ => canonical_url(platform, &id),
    };
    Some(VideoCandidate {
        platform,
        raw_url: raw_url.to_string(),
        normalized_id: id,
        canonical_url: canonical,
        source_strategy,
    })
}

/// True when `url` points at a recognized platform and is not an
/// image/thumbnail shape. The cheap strategy-intrinsic filter.
pub fn is_video_url(url: &str) -> bool {
    detect(url) != Platform::Unknown && !looks_like_image(url)
}

/// All video-shaped URLs embedded in free text, in order of appearance.
/// Thumbnails and other image assets are filtered out.
pub fn find_video_urls(text: &str) -> Vec<String> {
    URL_IN_TEXT
        .find_iter(text)
        .map(|m| m.as_str().trim_end_matches(['.', ',', ')', ';']).to_string())
        .filter(|u| is_video_url(u))
        .collect()
}

/// First `wvideo=` id carried by any URL embedded in free text.
pub fn wvideo_in_text(text: &str) -> Option<String> {
    URL_IN_TEXT
        .find_iter(text)
        .map(|m| m.as_str().trim_end_matches(['.', ',', ')', ';']))
        .find_map(wvideo_param)
}

/// Extract the value of a `wvideo=`-shaped query parameter, validating it
/// is a plain alphanumeric Wistia id.
pub fn wvideo_param(url: &str) -> Option<String> {
    let parsed = Url::parse(url).ok()?;
    let id = parsed
        .query_pairs()
        .find(|(k, _)| k == "wvideo")
        .map(|(_, v)| v.into_owned())?;
    if !id.is_empty() && id.chars().all(|c| c.is_ascii_alphanumeric()) {
        Some(id)
    } else {
        None
    }
}

fn strip_query(url: &str) -> String {
    url.split(['?', '#']).next().unwrap_or(url).to_string()
}

fn path_of(url: &str) -> Option<String> {
    if let Ok(parsed) = Url::parse(url) {
        return Some(parsed.path().to_string());
    }
    // Scheme-relative or bare host forms still carry a usable path.
    Some(strip_query(url))
}

fn ensure_scheme(url: &str) -> String {
    if url.starts_with("http://") || url.starts_with("https://") {
        url.to_string()
    } else {
        format!("https://{url}")
    }
}
