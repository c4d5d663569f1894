//! Run-scoped video bookkeeping: the blacklist and the seen-video registry.
//!
//! Owned by the run orchestrator and passed `&mut` into the validator, so
//! the "known-bad ids" set is an explicit, testable dependency instead of
//! process-wide state. Mutated only by the validator, from the single
//! processing thread; a parallel caller must wrap it in a mutex.

use crate::types::{LessonRef, Platform, VideoKey};
use std::collections::{HashMap, HashSet};

#[derive(Debug, Default)]
pub struct RunRegistry {
    blacklist: HashSet<VideoKey>,
    seen: HashMap<VideoKey, LessonRef>,
    reprocess: Vec<LessonRef>,
}

impl RunRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pre-seed the blacklist with ids already known to be stale or
    /// cached bleed-through before the run starts.
    pub fn with_blacklisted<I>(ids: I) -> Self
    where
        I: IntoIterator<Item = (Platform, String)>,
    {
        let mut reg = Self::new();
        for (platform, id) in ids {
            reg.blacklist.insert(VideoKey::new(platform, id));
        }
        reg
    }

    pub fn is_blacklisted(&self, key: &VideoKey) -> bool {
        self.blacklist.contains(key)
    }

    /// Blacklist a key. Monotone: keys are never removed during a run.
    pub fn blacklist(&mut self, key: VideoKey) {
        self.blacklist.insert(key);
    }

    /// The lesson that first claimed this key in the current run, if any.
    pub fn claimed_by(&self, key: &VideoKey) -> Option<&LessonRef> {
        self.seen.get(key)
    }

    /// Record that `lesson` claimed `key`. First claim wins; re-claiming
    /// from the same lesson is a no-op.
    pub fn claim(&mut self, key: VideoKey, lesson: LessonRef) {
        self.seen.entry(key).or_insert(lesson);
    }

    /// Flag a previously-accepted lesson whose video turned out to be
    /// bleed-through. The caller decides whether to re-crawl.
    pub fn flag_for_reprocess(&mut self, lesson: LessonRef) {
        if !self.reprocess.contains(&lesson) {
            self.reprocess.push(lesson);
        }
    }

    /// Drain the reprocess flags accumulated so far.
    pub fn take_reprocess(&mut self) -> Vec<LessonRef> {
        std::mem::take(&mut self.reprocess)
    }

    pub fn unique_videos(&self) -> usize {
        self.seen.len()
    }
}
