//! The single acceptance gate for video candidates.
//!
//! Every strategy's output passes through [`validate`]; no strategy gets
//! to accept its own candidate. Centralizing the checks here is what makes
//! the cross-lesson duplicate guarantees hold regardless of which strategy
//! produced a URL.

use crate::canon;
use crate::registry::RunRegistry;
use crate::types::{
    LessonContext, Platform, RejectReason, ResolvedVideo, Verdict, VideoCandidate,
};

/// Validate one candidate against the run's registry.
///
/// Checks, in order: well-formed, not blacklisted, not claimed by a
/// different lesson this run, not image/thumbnail-shaped. On acceptance
/// the key is claimed for `ctx` and the canonicalized result is returned.
///
/// A cross-lesson duplicate additionally blacklists the key and flags the
/// earlier lesson for reprocessing: stale cached URLs resurface on later
/// lessons, so the earlier acceptance is no longer trustworthy either.
pub fn validate(
    candidate: &VideoCandidate,
    ctx: &LessonContext,
    registry: &mut RunRegistry,
) -> Verdict {
    if candidate.platform == Platform::Unknown || candidate.normalized_id.is_empty() {
        return Verdict::Rejected(RejectReason::Malformed);
    }

    let key = candidate.key();

    if registry.is_blacklisted(&key) {
        return Verdict::Rejected(RejectReason::Blacklisted);
    }

    if let Some(first) = registry.claimed_by(&key) {
        if first.lesson_url != ctx.lesson_url {
            let first = first.clone();
            registry.blacklist(key);
            registry.flag_for_reprocess(first.clone());
            return Verdict::Rejected(RejectReason::DuplicateCrossLesson {
                first_lesson: first,
            });
        }
    }

    // Strategies pre-filter image shapes, but the gate re-checks: a
    // thumbnail URL must never be accepted no matter where it came from.
    if canon::looks_like_image(&candidate.raw_url) || canon::looks_like_image(&candidate.canonical_url)
    {
        return Verdict::Rejected(RejectReason::Thumbnail);
    }

    registry.claim(key, ctx.into());
    Verdict::Accepted(ResolvedVideo {
        platform: candidate.platform,
        canonical_url: candidate.canonical_url.clone(),
    })
}
