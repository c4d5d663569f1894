use thiserror::Error;

pub type Result<T> = std::result::Result<T, ResolveError>;

/// Errors a browser session collaborator can report.
///
/// Only [`SessionError::Lost`] is fatal to a run; every other variant is
/// strategy-local and degrades to "no candidate" for that strategy.
#[derive(Debug, Error)]
pub enum SessionError {
    /// The browser session is dead. Fatal; never retried locally.
    #[error("browser session lost: {0}")]
    Lost(String),

    /// A bounded wait elapsed without the expected condition.
    #[error("wait timed out: {0}")]
    Timeout(String),

    /// Injected script failed to execute.
    #[error("script execution failed: {0}")]
    Script(String),

    #[error("{0}")]
    Other(String),
}

impl SessionError {
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::Lost(_))
    }
}

/// Errors surfaced by the resolution engine itself.
///
/// Expected "no candidate" outcomes are values, not errors: strategies
/// return an absent value and the resolver returns `Resolution::NotFound`.
#[derive(Debug, Error)]
pub enum ResolveError {
    /// Fatal session failure, propagated from the browser collaborator.
    #[error(transparent)]
    Session(#[from] SessionError),

    #[error("{0}")]
    Other(String),
}

impl From<std::io::Error> for ResolveError {
    fn from(e: std::io::Error) -> Self {
        ResolveError::Other(e.to_string())
    }
}

impl From<serde_json::Error> for ResolveError {
    fn from(e: serde_json::Error) -> Self {
        ResolveError::Other(e.to_string())
    }
}
