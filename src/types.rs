use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// Video hosting platform recognized by the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    YouTube,
    Vimeo,
    Loom,
    Wistia,
    /// Directly hosted media file (.mp4, .webm, ...).
    Direct,
    Unknown,
}

impl Platform {
    pub fn name(&self) -> &'static str {
        match self {
            Self::YouTube => "youtube",
            Self::Vimeo => "vimeo",
            Self::Loom => "loom",
            Self::Wistia => "wistia",
            Self::Direct => "direct",
            Self::Unknown => "unknown",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().as_str() {
            "youtube" => Some(Self::YouTube),
            "vimeo" => Some(Self::Vimeo),
            "loom" => Some(Self::Loom),
            "wistia" => Some(Self::Wistia),
            "direct" => Some(Self::Direct),
            _ => None,
        }
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Stable identity of a video: two candidates with the same key are the
/// same video no matter which URL shape they were observed under.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct VideoKey {
    pub platform: Platform,
    pub id: String,
}

impl VideoKey {
    pub fn new(platform: Platform, id: impl Into<String>) -> Self {
        Self {
            platform,
            id: id.into(),
        }
    }
}

impl fmt::Display for VideoKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.platform, self.id)
    }
}

/// One unit of work: a single lesson visit. Created by the caller,
/// immutable for the duration of that lesson's resolution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LessonContext {
    pub lesson_url: String,
    pub lesson_title: String,
    /// Run-scoped session identifier supplied by the caller.
    pub session_id: String,
}

impl LessonContext {
    pub fn new(
        lesson_url: impl Into<String>,
        lesson_title: impl Into<String>,
        session_id: impl Into<String>,
    ) -> Self {
        Self {
            lesson_url: lesson_url.into(),
            lesson_title: lesson_title.into(),
            session_id: session_id.into(),
        }
    }
}

/// Lightweight reference to a lesson, kept by the run registry long after
/// the lesson's own context has been dropped.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LessonRef {
    pub lesson_url: String,
    pub lesson_title: String,
}

impl From<&LessonContext> for LessonRef {
    fn from(ctx: &LessonContext) -> Self {
        Self {
            lesson_url: ctx.lesson_url.clone(),
            lesson_title: ctx.lesson_title.clone(),
        }
    }
}

/// An unvalidated video reference produced by one strategy.
///
/// Candidates are transient: only the first validator-accepted candidate
/// per lesson survives, as a [`ResolvedVideo`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VideoCandidate {
    pub platform: Platform,
    pub raw_url: String,
    pub normalized_id: String,
    pub canonical_url: String,
    pub source_strategy: &'static str,
}

impl VideoCandidate {
    pub fn key(&self) -> VideoKey {
        VideoKey::new(self.platform, self.normalized_id.clone())
    }
}

/// The accepted result for a lesson.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolvedVideo {
    pub platform: Platform,
    pub canonical_url: String,
}

/// Terminal outcome of resolving one lesson. `NotFound` is a normal,
/// expected outcome, not an error.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum Resolution {
    Resolved(ResolvedVideo),
    NotFound,
}

impl Resolution {
    pub fn is_resolved(&self) -> bool {
        matches!(self, Self::Resolved(_))
    }
}

/// Why the validator refused a candidate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RejectReason {
    /// Platform unrecognized or no id could be derived.
    Malformed,
    /// Key is on the run's blacklist.
    Blacklisted,
    /// Key was already claimed by a different lesson this run.
    DuplicateCrossLesson { first_lesson: LessonRef },
    /// URL has an image/thumbnail shape.
    Thumbnail,
}

impl RejectReason {
    /// Data-quality rejections get logged distinctly from plain misses.
    pub fn is_data_quality(&self) -> bool {
        matches!(self, Self::Blacklisted | Self::DuplicateCrossLesson { .. })
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Malformed => "malformed",
            Self::Blacklisted => "blacklisted",
            Self::DuplicateCrossLesson { .. } => "duplicate_cross_lesson",
            Self::Thumbnail => "thumbnail",
        }
    }
}

/// Validator verdict for one candidate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verdict {
    Accepted(ResolvedVideo),
    Rejected(RejectReason),
}

/// Tunable knobs for the resolution engine.
///
/// Defaults mirror what works against the live platform; tests inject
/// near-zero waits instead.
#[derive(Debug, Clone)]
pub struct ResolveConfig {
    /// Progressive waits after a thumbnail click before re-scanning.
    pub wait_tiers: Vec<Duration>,
    /// Total pipeline attempts per lesson (first run + retries).
    pub attempts: usize,
    /// Base delay between pipeline attempts (jitter is added on top).
    pub backoff: Duration,
    /// Elements above this page-y coordinate are treated as header or
    /// navigation chrome and never clicked or scanned.
    pub content_min_y: f64,
}

impl Default for ResolveConfig {
    fn default() -> Self {
        Self {
            wait_tiers: vec![
                Duration::from_secs(2),
                Duration::from_secs(3),
                Duration::from_secs(5),
            ],
            attempts: 2,
            backoff: Duration::from_millis(1500),
            content_min_y: 200.0,
        }
    }
}

impl ResolveConfig {
    /// Config with zero-length waits, for tests.
    pub fn instant() -> Self {
        Self {
            wait_tiers: vec![Duration::ZERO; 3],
            backoff: Duration::ZERO,
            ..Self::default()
        }
    }
}

/// JSON envelope used by the CLI for every command result.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    pub ok: bool,
    pub data: Option<T>,
    pub error: Option<String>,
}

impl<T> ApiResponse<T> {
    pub fn ok(data: T) -> Self {
        Self {
            ok: true,
            data: Some(data),
            error: None,
        }
    }
    pub fn err(msg: impl Into<String>) -> Self {
        Self {
            ok: false,
            data: None,
            error: Some(msg.into()),
        }
    }
}
