//! The retry coordinator: ties the pipeline, the isolator and the run
//! registry together into the one call a scraping loop makes per lesson.

use crate::error::Result;
use crate::isolate;
use crate::log::RunLogger;
use crate::registry::RunRegistry;
use crate::session::BrowserSession;
use crate::strategies::{Pipeline, PipelineOutcome};
use crate::types::{LessonContext, Resolution, ResolveConfig};
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use tokio::time::sleep;

pub struct Resolver<S: BrowserSession> {
    session: S,
    pipeline: Pipeline,
    logger: Option<RunLogger>,
}

impl<S: BrowserSession> Resolver<S> {
    pub fn new(session: S, config: ResolveConfig) -> Self {
        Self {
            session,
            pipeline: Pipeline::new(config),
            logger: None,
        }
    }

    pub fn with_logger(mut self, logger: RunLogger) -> Self {
        self.logger = Some(logger);
        self
    }

    pub fn session(&self) -> &S {
        &self.session
    }

    /// Hand the session back, e.g. to shut the browser down cleanly.
    pub fn into_session(self) -> S {
        self.session
    }

    /// Resolve one lesson's video against the page the session is
    /// currently on.
    ///
    /// Runs up to `config.attempts` full pipeline passes; between passes
    /// the browser state is scrubbed and a jittered backoff elapses so a
    /// slow player gets a second chance on clean state. An unrelated
    /// navigation aborts immediately: retrying from the wrong page would
    /// only harvest someone else's video. `NotFound` is a normal outcome.
    pub async fn resolve(
        &self,
        ctx: &LessonContext,
        registry: &mut RunRegistry,
    ) -> Result<Resolution> {
        let config = self.pipeline.config();
        let logger = self.logger.as_ref();

        for attempt in 1..=config.attempts.max(1) {
            match self
                .pipeline
                .run(&self.session, ctx, registry, logger)
                .await?
            {
                PipelineOutcome::Accepted(video) => {
                    return Ok(Resolution::Resolved(video));
                }
                PipelineOutcome::Aborted { url } => {
                    if let Some(log) = logger {
                        let _ = log.warn("resolution_aborted", Some(&ctx.lesson_title), Some(&url));
                    }
                    return Ok(Resolution::NotFound);
                }
                PipelineOutcome::NoCandidate => {
                    if attempt == config.attempts.max(1) {
                        break;
                    }
                    if let Some(log) = logger {
                        let _ = log.warn("retrying_after_isolation", Some(&ctx.lesson_title), None);
                    }
                    isolate::isolate(&self.session, logger).await?;
                    let backoff = config.backoff
                        + Duration::from_millis(jitter_ms(config.backoff.as_millis() as u64));
                    sleep(backoff).await;
                }
            }
        }

        Ok(Resolution::NotFound)
    }
}

fn jitter_ms(range: u64) -> u64 {
    if range == 0 {
        return 0;
    }
    let now = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or(Duration::from_nanos(0));
    let nanos = now.subsec_nanos() as u64;
    let micros = (now.as_micros() & 0xFFFF) as u64;
    (nanos ^ (micros << 5)) % range
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::mock::{MockElement, MockPage, MockSession};
    use crate::types::Platform;

    fn ctx(url: &str, title: &str) -> LessonContext {
        LessonContext::new(url, title, "run-1")
    }

    fn hydration_page(video_url: &str) -> MockPage {
        let json = format!(
            r#"{{"props":{{"pageProps":{{"lesson":{{"video":{{"video_url":"{video_url}"}}}}}}}}}}"#
        );
        MockPage::default().element(
            MockElement::new("script", "nd")
                .selector("script#__NEXT_DATA__")
                .text(&json),
        )
    }

    #[tokio::test]
    async fn first_attempt_success_skips_isolation() {
        let session = MockSession::new(
            "https://www.skool.com/g/classroom/a",
            hydration_page("https://youtu.be/dQw4w9WgXcQ"),
        );
        let resolver = Resolver::new(session, ResolveConfig::instant());
        let mut registry = RunRegistry::new();

        let resolution = resolver
            .resolve(&ctx("https://www.skool.com/g/classroom/a", "A"), &mut registry)
            .await
            .unwrap();

        match resolution {
            Resolution::Resolved(v) => assert_eq!(v.platform, Platform::YouTube),
            Resolution::NotFound => panic!("expected a resolved video"),
        }
        assert_eq!(resolver.session().cookies_cleared(), 0);
    }

    #[tokio::test]
    async fn empty_lesson_retries_once_with_isolation() {
        let session = MockSession::new("https://www.skool.com/g/classroom/b", MockPage::default());
        let resolver = Resolver::new(session, ResolveConfig::instant());
        let mut registry = RunRegistry::new();

        let resolution = resolver
            .resolve(&ctx("https://www.skool.com/g/classroom/b", "B"), &mut registry)
            .await
            .unwrap();

        assert_eq!(resolution, Resolution::NotFound);
        // One isolation pass between the two attempts, none after the last.
        // Taking the session back out keeps its counters intact.
        let session = resolver.into_session();
        assert_eq!(session.cookies_cleared(), 1);
        assert_eq!(session.storage_cleared(), 1);
    }

    #[tokio::test]
    async fn unrelated_navigation_skips_the_retry() {
        use crate::session::mock::ClickEffect;

        let page = MockPage::default().element(
            MockElement::new("div", "thumb")
                .selector("[class*='VideoThumbnailWrapper']")
                .attr("class", "VideoThumbnailWrapper")
                .text("3:15"),
        );
        let session = MockSession::new("https://www.skool.com/g/classroom/c", page);
        session.on_click(
            "thumb",
            ClickEffect::Navigate("https://www.skool.com/g/about".to_string()),
        );
        let resolver = Resolver::new(session, ResolveConfig::instant());
        let mut registry = RunRegistry::new();

        let resolution = resolver
            .resolve(&ctx("https://www.skool.com/g/classroom/c", "C"), &mut registry)
            .await
            .unwrap();

        assert_eq!(resolution, Resolution::NotFound);
        assert_eq!(resolver.session().cookies_cleared(), 0);
    }

    #[tokio::test]
    async fn lost_session_propagates() {
        let session = MockSession::new("https://www.skool.com/g/classroom/d", MockPage::default());
        session.kill();
        let resolver = Resolver::new(session, ResolveConfig::instant());
        let mut registry = RunRegistry::new();

        assert!(resolver
            .resolve(&ctx("https://www.skool.com/g/classroom/d", "D"), &mut registry)
            .await
            .is_err());
    }

    #[test]
    fn jitter_stays_in_range() {
        for _ in 0..64 {
            assert!(jitter_ms(120) < 120);
        }
        assert_eq!(jitter_ms(0), 0);
    }
}
