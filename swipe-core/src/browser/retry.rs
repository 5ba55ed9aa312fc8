use std::future::Future;
use std::time::Duration;

use crate::cancel::CancelSignal;
use crate::config::RetrySection;

use super::error::{BrowserError, BrowserResult};

#[derive(Debug, Clone)]
pub struct RetryPolicy {
    max_attempts: usize,
    delay: Duration,
}

#[derive(Debug, Clone)]
pub struct RetryOutcome<T> {
    pub result: T,
    pub attempts: usize,
}

/// Final failure of a retried operation together with how many attempts ran.
#[derive(Debug)]
pub struct RetryFailure {
    pub error: BrowserError,
    pub attempts: usize,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            delay: Duration::from_millis(250),
        }
    }
}

impl RetryPolicy {
    pub fn new(config: &RetrySection) -> Self {
        Self {
            max_attempts: config.max_attempts.max(1),
            delay: Duration::from_millis(config.delay_ms),
        }
    }

    pub fn with_attempts(max_attempts: usize, delay: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            delay,
        }
    }

    pub fn max_attempts(&self) -> usize {
        self.max_attempts
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }

    /// Runs `operation` up to `max_attempts` times, invoking it exactly once per attempt.
    ///
    /// Cancellation is checked before every attempt and during every delay and
    /// is returned untouched. Non-transient errors stop the loop immediately.
    pub async fn run<F, Fut, T>(
        &self,
        cancel: &CancelSignal,
        mut operation: F,
    ) -> Result<RetryOutcome<T>, RetryFailure>
    where
        F: FnMut(usize) -> Fut,
        Fut: Future<Output = BrowserResult<T>>,
    {
        let mut attempt = 0usize;
        loop {
            if let Err(cancelled) = cancel.check() {
                return Err(RetryFailure {
                    error: cancelled.into(),
                    attempts: attempt,
                });
            }
            let error = match operation(attempt).await {
                Ok(result) => {
                    return Ok(RetryOutcome {
                        result,
                        attempts: attempt + 1,
                    });
                }
                Err(error) => error,
            };
            attempt += 1;
            if error.is_cancelled() || !error.is_transient() || attempt >= self.max_attempts {
                return Err(RetryFailure { error, attempts: attempt });
            }
            if let Err(cancelled) = cancel.sleep(self.delay).await {
                return Err(RetryFailure {
                    error: cancelled.into(),
                    attempts: attempt,
                });
            }
        }
    }
}
