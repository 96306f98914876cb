//! Bounded polling with exponential backoff
use std::{future::Future, time::Duration};

use backon::{BackoffBuilder, ExponentialBuilder};
use thiserror::Error;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

/// Outcome of one probe in [`poll_until`]
#[derive(Debug)]
pub enum Attempt<T, P, E> {
    /// The awaited state was reached
    Ready(T),
    /// Not there yet; carries what was observed
    Pending(P),
    /// Polling cannot succeed anymore
    Failed(E),
}

/// Why [`poll_until`] gave up
#[derive(Error, Debug)]
pub enum RetryError<P, E> {
    /// The deadline passed while the probe was still pending
    #[error("timed out after {elapsed:?}")]
    TimedOut {
        /// The last pending observation
        last: P,
        /// Time spent polling
        elapsed: Duration,
    },
    /// The probe failed
    #[error("probe failed")]
    Failed(E),
    /// Polling was cancelled
    #[error("cancelled")]
    Cancelled,
}

const MAX_DELAY: Duration = Duration::from_secs(10);

/// How long and how often to poll
#[derive(Clone, Debug)]
pub struct RetryPolicy {
    timeout: Duration,
    backoff: ExponentialBuilder,
}

impl RetryPolicy {
    /// Poll for at most `timeout`, backing off from 500ms up to 10s between probes
    pub fn new(timeout: Duration) -> Self {
        Self {
            timeout,
            backoff: ExponentialBuilder::default()
                .with_min_delay(Duration::from_millis(500))
                .with_max_delay(MAX_DELAY)
                .with_factor(2.0)
                .without_max_times(),
        }
    }

    /// Use a different backoff between probes
    #[must_use]
    pub fn with_backoff(mut self, backoff: ExponentialBuilder) -> Self {
        self.backoff = backoff;
        self
    }

    /// The total time budget
    pub fn timeout(&self) -> Duration {
        self.timeout
    }
}

/// Run `probe` until it is ready, fails, the policy deadline passes, or `cancel` fires
///
/// The first probe runs immediately. Sleeps never extend past the deadline,
/// and one last probe is made when the deadline is reached.
pub async fn poll_until<T, P, E, F, Fut>(
    policy: &RetryPolicy,
    cancel: &CancellationToken,
    mut probe: F,
) -> Result<T, RetryError<P, E>>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Attempt<T, P, E>>,
{
    let start = Instant::now();
    // timeouts past the end of the clock never expire
    let deadline = start.checked_add(policy.timeout);
    let mut backoff = policy.backoff.build();
    loop {
        if cancel.is_cancelled() {
            return Err(RetryError::Cancelled);
        }
        let last = match probe().await {
            Attempt::Ready(ready) => return Ok(ready),
            Attempt::Failed(err) => return Err(RetryError::Failed(err)),
            Attempt::Pending(last) => last,
        };
        let now = Instant::now();
        let delay = match deadline {
            Some(deadline) if now >= deadline => {
                return Err(RetryError::TimedOut {
                    last,
                    elapsed: now - start,
                });
            }
            Some(deadline) => {
                let remaining = deadline - now;
                backoff.next().map_or(remaining, |d| d.min(remaining))
            }
            None => backoff.next().unwrap_or(MAX_DELAY),
        };
        tracing::trace!(?delay, "probe pending, backing off");
        tokio::select! {
            _ = cancel.cancelled() => return Err(RetryError::Cancelled),
            _ = tokio::time::sleep(delay) => {}
        }
    }
}
