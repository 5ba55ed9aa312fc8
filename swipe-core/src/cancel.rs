use std::fmt;
use std::time::Duration;

use thiserror::Error;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CancelCause {
    Cancelled,
    DeadlineExceeded,
}

impl fmt::Display for CancelCause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            CancelCause::Cancelled => "cancelled",
            CancelCause::DeadlineExceeded => "deadline exceeded",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("operation aborted: {cause}")]
pub struct Cancelled {
    pub cause: CancelCause,
}

impl Cancelled {
    pub fn cancelled() -> Self {
        Self {
            cause: CancelCause::Cancelled,
        }
    }

    pub fn deadline_exceeded() -> Self {
        Self {
            cause: CancelCause::DeadlineExceeded,
        }
    }
}

/// Cooperative cancellation shared by every blocking operation of a run.
///
/// A signal fires either when its token is cancelled (explicitly or through a
/// parent) or when its optional deadline passes. Sleeps go through
/// [`CancelSignal::sleep`] so they return as soon as the signal fires.
#[derive(Debug, Clone, Default)]
pub struct CancelSignal {
    token: CancellationToken,
    deadline: Option<Instant>,
}

impl CancelSignal {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_timeout(timeout: Duration) -> Self {
        Self {
            token: CancellationToken::new(),
            deadline: Some(Instant::now() + timeout),
        }
    }

    pub fn child(&self) -> Self {
        Self {
            token: self.token.child_token(),
            deadline: self.deadline,
        }
    }

    /// Derives a child whose deadline is the earlier of the parent's and `timeout` from now.
    pub fn child_with_timeout(&self, timeout: Duration) -> Self {
        let candidate = Instant::now() + timeout;
        let deadline = match self.deadline {
            Some(existing) if existing < candidate => existing,
            _ => candidate,
        };
        Self {
            token: self.token.child_token(),
            deadline: Some(deadline),
        }
    }

    pub fn cancel(&self) {
        self.token.cancel();
    }

    pub fn token(&self) -> &CancellationToken {
        &self.token
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    pub fn check(&self) -> Result<(), Cancelled> {
        if self.token.is_cancelled() {
            return Err(Cancelled::cancelled());
        }
        match self.deadline {
            Some(deadline) if Instant::now() >= deadline => Err(Cancelled::deadline_exceeded()),
            _ => Ok(()),
        }
    }

    pub fn is_fired(&self) -> bool {
        self.check().is_err()
    }

    /// Sleeps for `duration` unless the signal fires first.
    pub async fn sleep(&self, duration: Duration) -> Result<(), Cancelled> {
        self.check()?;
        if duration.is_zero() {
            return Ok(());
        }
        let wake = Instant::now() + duration;
        match self.deadline {
            Some(deadline) if deadline <= wake => {
                tokio::select! {
                    biased;
                    _ = self.token.cancelled() => Err(Cancelled::cancelled()),
                    _ = tokio::time::sleep_until(deadline) => Err(Cancelled::deadline_exceeded()),
                }
            }
            _ => {
                tokio::select! {
                    biased;
                    _ = self.token.cancelled() => Err(Cancelled::cancelled()),
                    _ = tokio::time::sleep_until(wake) => Ok(()),
                }
            }
        }
    }
}
