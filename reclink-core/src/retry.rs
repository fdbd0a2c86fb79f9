use std::fmt::Display;
use std::future::Future;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::warn;

/// How a cancellable, retried operation ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome<T> {
    Completed(T),
    /// Superseded by a newer operation. Not a failure.
    Cancelled,
    /// Every allowed attempt failed.
    GaveUp,
}

/// Retry after a fixed delay, optionally capped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub delay: Duration,
    /// None = retry until it succeeds or is cancelled.
    pub max_attempts: Option<u32>,
}

impl RetryPolicy {
    pub fn fixed(delay: Duration) -> Self {
        Self {
            delay,
            max_attempts: None,
        }
    }

    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = Some(max_attempts.max(1));
        self
    }

    /// Run `f` until it succeeds, the attempt cap is hit, or `cancel` fires.
    ///
    /// Cancellation is checked while the request is in flight, while waiting
    /// out the delay, and once more after a success, so a cancelled call
    /// never reports a result.
    pub async fn run<F, Fut, T, E>(
        &self,
        label: &str,
        cancel: &CancellationToken,
        mut f: F,
    ) -> Outcome<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: Display,
    {
        let mut attempt: u32 = 0;
        loop {
            attempt += 1;
            let result = tokio::select! {
                biased;
                _ = cancel.cancelled() => return Outcome::Cancelled,
                result = f() => result,
            };
            match result {
                Ok(value) => {
                    if cancel.is_cancelled() {
                        return Outcome::Cancelled;
                    }
                    return Outcome::Completed(value);
                }
                Err(e) => {
                    if self.max_attempts.is_some_and(|max| attempt >= max) {
                        warn!("{} failed after {} attempts: {}", label, attempt, e);
                        return Outcome::GaveUp;
                    }
                    warn!(
                        attempt,
                        "{} failed, retrying in {:?}: {}", label, self.delay, e
                    );
                    tokio::select! {
                        biased;
                        _ = cancel.cancelled() => return Outcome::Cancelled,
                        _ = tokio::time::sleep(self.delay) => {}
                    }
                }
            }
        }
    }
}
