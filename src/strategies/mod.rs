//! The ordered detection pipeline.
//!
//! Strategies are tried in a fixed priority order (empirical reliability,
//! not code organization) and the pipeline short-circuits on the first
//! candidate the validator accepts. Strategies only *detect*; acceptance
//! is always the validator's call.

mod embedded;
mod frames;
mod legacy;
mod markers;
mod thumbnail;


pub use embedded::Embedded;
pub use frames::Frames;
pub use legacy::Legacy;
pub use markers::Markers;
pub use thumbnail::Thumbnail;

use crate::error::{Result, SessionError};
use crate::log::RunLogger;
use crate::registry::RunRegistry;
use crate::session::{BrowserSession, SessionResult};
use crate::types::{LessonContext, ResolveConfig, ResolvedVideo, Verdict};
use crate::{canon, validator};
use async_trait::async_trait;

/// What one strategy observed on the current page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Detection {
    /// A raw video URL worth validating.
    Candidate(String),
    /// Nothing usable on this page.
    None,
    /// The page navigated away underneath us (thumbnail click). The
    /// pipeline decides whether that is a hop or an abort.
    Navigated(String),
}

/// One self-contained detection technique.
#[async_trait]
pub trait Strategy: Send + Sync {
    fn name(&self) -> &'static str;

    async fn detect(
        &self,
        session: &dyn BrowserSession,
        ctx: &LessonContext,
        config: &ResolveConfig,
    ) -> Result<Detection>;
}

/// Absorb non-fatal session failures into "nothing found"; only a lost
/// session escapes a strategy.
pub(crate) fn non_fatal<T>(res: SessionResult<T>) -> Result<Option<T>> {
    match res {
        Ok(v) => Ok(Some(v)),
        Err(SessionError::Lost(msg)) => Err(SessionError::Lost(msg).into()),
        Err(_) => Ok(None),
    }
}

/// Outcome of one full pipeline pass over a lesson page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PipelineOutcome {
    Accepted(ResolvedVideo),
    /// No strategy produced an acceptable candidate.
    NoCandidate,
    /// A click navigated to an unrelated page; resolution of this lesson
    /// is aborted rather than guessed at.
    Aborted { url: String },
}

pub struct Pipeline {
    config: ResolveConfig,
}

impl Pipeline {
    pub fn new(config: ResolveConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ResolveConfig {
        &self.config
    }

    /// Run the full strategy chain against the current page.
    ///
    /// If the thumbnail strategy reports a navigation to a page that
    /// still looks lesson-related, strategies 1-3 are re-run once against
    /// the new page (one extra hop only).
    pub async fn run(
        &self,
        session: &dyn BrowserSession,
        ctx: &LessonContext,
        registry: &mut RunRegistry,
        logger: Option<&RunLogger>,
    ) -> Result<PipelineOutcome> {
        let embedded = Embedded;
        let thumbnail = Thumbnail;
        let frames = Frames;
        let markers = Markers;
        let legacy = Legacy;
        let chain: [&dyn Strategy; 5] = [&embedded, &thumbnail, &frames, &markers, &legacy];

        match self
            .run_chain(&chain, session, ctx, registry, logger)
            .await?
        {
            ChainOutcome::Accepted(v) => Ok(PipelineOutcome::Accepted(v)),
            ChainOutcome::NoCandidate => Ok(PipelineOutcome::NoCandidate),
            ChainOutcome::Navigated(url) => {
                if !is_lesson_related(&ctx.lesson_url, &url) {
                    if let Some(log) = logger {
                        let _ = log.warn(
                            "unexpected_navigation",
                            Some(&ctx.lesson_title),
                            Some(&url),
                        );
                    }
                    return Ok(PipelineOutcome::Aborted { url });
                }
                // One hop: the new page is now the current page.
                let rerun: [&dyn Strategy; 3] = [&embedded, &thumbnail, &frames];
                match self
                    .run_chain(&rerun, session, ctx, registry, logger)
                    .await?
                {
                    ChainOutcome::Accepted(v) => Ok(PipelineOutcome::Accepted(v)),
                    ChainOutcome::NoCandidate => Ok(PipelineOutcome::NoCandidate),
                    // A second navigation is never followed.
                    ChainOutcome::Navigated(url) => Ok(PipelineOutcome::Aborted { url }),
                }
            }
        }
    }

    async fn run_chain(
        &self,
        chain: &[&dyn Strategy],
        session: &dyn BrowserSession,
        ctx: &LessonContext,
        registry: &mut RunRegistry,
        logger: Option<&RunLogger>,
    ) -> Result<ChainOutcome> {
        for strategy in chain {
            match strategy.detect(session, ctx, &self.config).await? {
                Detection::None => {
                    if let Some(log) = logger {
                        let _ = log.attempt(strategy.name(), ctx, None, "none", None);
                    }
                }
                Detection::Navigated(url) => return Ok(ChainOutcome::Navigated(url)),
                Detection::Candidate(raw) => {
                    let Some(candidate) = canon::candidate_from_raw(&raw, strategy.name()) else {
                        if let Some(log) = logger {
                            let _ = log.attempt(
                                strategy.name(),
                                ctx,
                                Some(&raw),
                                "rejected",
                                Some("unrecognized"),
                            );
                        }
                        continue;
                    };
                    match validator::validate(&candidate, ctx, registry) {
                        Verdict::Accepted(video) => {
                            if let Some(log) = logger {
                                let _ = log.attempt(
                                    strategy.name(),
                                    ctx,
                                    Some(&video.canonical_url),
                                    "accepted",
                                    None,
                                );
                            }
                            return Ok(ChainOutcome::Accepted(video));
                        }
                        Verdict::Rejected(reason) => {
                            if let Some(log) = logger {
                                let status = if reason.is_data_quality() {
                                    "rejected_data_quality"
                                } else {
                                    "rejected"
                                };
                                let _ = log.attempt(
                                    strategy.name(),
                                    ctx,
                                    Some(&raw),
                                    status,
                                    Some(reason.label()),
                                );
                            }
                        }
                    }
                }
            }
        }
        Ok(ChainOutcome::NoCandidate)
    }
}

enum ChainOutcome {
    Accepted(ResolvedVideo),
    NoCandidate,
    Navigated(String),
}

/// Heuristic from the field: after a thumbnail click, a same-lesson or
/// deeper lesson page is worth one hop; anything else is bleed-through.
pub(crate) fn is_lesson_related(original: &str, landed: &str) -> bool {
    if landed.starts_with(original) || original.starts_with(landed) {
        return true;
    }
    const LESSON_MARKERS: [&str; 5] = ["classroom", "lesson", "day-", "video", "watch"];
    LESSON_MARKERS.iter().any(|m| landed.contains(m))
}
