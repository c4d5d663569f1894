//! Run-state isolation between lessons and between retry attempts.
//!
//! The platform caches the last played video aggressively (cookies,
//! web storage, leftover modals), which is how one lesson's player bleeds
//! into the next. Each step here is best-effort and idempotent: a step
//! that fails is logged and skipped, and only a lost session aborts.

use crate::error::{Result, SessionError};
use crate::log::RunLogger;
use crate::session::BrowserSession;

const MODAL_CLOSE_CONTROLS: [&str; 4] = [
    "[aria-label='Close']",
    "[aria-label='close']",
    "button[class*='close']",
    "[class*='CloseButton']",
];

/// Undo the pointer-events/opacity overrides the thumbnail strategy may
/// have injected into sound overlays on the previous page.
const RESET_OVERLAY_SCRIPT: &str = "document.querySelectorAll('[data-handle*=\"click-for-sound\"]')\
     .forEach(function (el) { el.style.pointerEvents = ''; el.style.opacity = ''; });";

/// Scrub per-lesson browser state: cookies, web storage, open modals,
/// injected style overrides.
pub async fn isolate(session: &dyn BrowserSession, logger: Option<&RunLogger>) -> Result<()> {
    step(session.clear_cookies().await, "clear_cookies", logger)?;
    step(session.clear_storage().await, "clear_storage", logger)?;
    close_modals(session, logger).await?;
    step(
        session.execute(RESET_OVERLAY_SCRIPT).await.map(|_| ()),
        "reset_overlays",
        logger,
    )?;
    Ok(())
}

async fn close_modals(session: &dyn BrowserSession, logger: Option<&RunLogger>) -> Result<()> {
    for selector in MODAL_CLOSE_CONTROLS {
        match session.query(selector).await {
            Ok(controls) => {
                for control in controls.iter().filter(|c| c.displayed) {
                    step(session.click(&control.handle).await, "close_modal", logger)?;
                }
            }
            Err(e) if e.is_fatal() => return Err(e.into()),
            Err(e) => log_skip(logger, "close_modal", &e),
        }
    }
    // Escape catches whatever has focus but no close control.
    step(session.dismiss_overlay().await, "dismiss_overlay", logger)
}

fn step(
    res: std::result::Result<(), SessionError>,
    name: &str,
    logger: Option<&RunLogger>,
) -> Result<()> {
    match res {
        Ok(()) => Ok(()),
        Err(e) if e.is_fatal() => Err(e.into()),
        Err(e) => {
            log_skip(logger, name, &e);
            Ok(())
        }
    }
}

fn log_skip(logger: Option<&RunLogger>, name: &str, err: &SessionError) {
    if let Some(log) = logger {
        let _ = log.warn("isolation_step_skipped", Some(name), Some(&err.to_string()));
    }
}
