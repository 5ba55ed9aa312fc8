use std::time::Duration;

use thiserror::Error;

use crate::cancel::Cancelled;

pub type BrowserResult<T> = Result<T, BrowserError>;

#[derive(Debug, Error)]
pub enum BrowserError {
    #[error("chromium launch failed: {0}")]
    Launch(String),
    #[error("cdp error: {0}")]
    Cdp(#[from] chromiumoxide::error::CdpError),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("timed out after {timeout:?} waiting for any visible selector: {selectors:?}")]
    Timeout {
        selectors: Vec<String>,
        timeout: Duration,
    },
    #[error("no element found for selectors: {selectors:?}")]
    NotFound { selectors: Vec<String> },
    #[error("giving up on selectors {selectors:?} after {attempts} attempt(s): {source}")]
    Exhausted {
        selectors: Vec<String>,
        attempts: usize,
        #[source]
        source: Box<BrowserError>,
    },
    #[error("driver page not initialized: call open first")]
    NotOpened,
    #[error("next media navigation is disabled")]
    NavigationDisabled,
    #[error(transparent)]
    Cancelled(#[from] Cancelled),
    #[error("configuration error: {0}")]
    Configuration(String),
    #[error("unexpected error: {0}")]
    Unexpected(String),
}

impl BrowserError {
    /// Errors a retry loop may reasonably try again.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            BrowserError::Timeout { .. }
                | BrowserError::NotFound { .. }
                | BrowserError::Cdp(_)
                | BrowserError::Unexpected(_)
        )
    }

    pub fn is_cancelled(&self) -> bool {
        match self {
            BrowserError::Cancelled(_) => true,
            BrowserError::Exhausted { source, .. } => source.is_cancelled(),
            _ => false,
        }
    }
}

impl From<tokio::task::JoinError> for BrowserError {
    fn from(err: tokio::task::JoinError) -> Self {
        BrowserError::Unexpected(err.to_string())
    }
}
