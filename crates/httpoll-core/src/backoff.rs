//! Retry backoff policies.
//!
//! Retry timing is injected into the retriever rather than inlined in its
//! loop, so tests can collapse the wait to zero and alternative policies
//! can be substituted per source.

use std::time::Duration;

/// Decides how long to wait after a failed fetch attempt.
///
/// `attempt` is zero-based: the delay returned for attempt `n` is slept
/// between attempt `n` and attempt `n + 1`. No delay is ever requested
/// after the final attempt.
pub trait BackoffPolicy: Send + Sync {
    fn delay(&self, attempt: u32) -> Duration;
}

/// Fixed-delay backoff: the same interval between every pair of attempts.
///
/// Deliberately not exponential; the wire contract calls for a constant
/// one-second pause between retries.
#[derive(Debug, Clone, Copy)]
pub struct FixedDelay {
    interval: Duration,
}

impl FixedDelay {
    pub const fn new(interval: Duration) -> Self {
        Self { interval }
    }
}

impl Default for FixedDelay {
    fn default() -> Self {
        Self::new(Duration::from_secs(1))
    }
}

impl BackoffPolicy for FixedDelay {
    fn delay(&self, _attempt: u32) -> Duration {
        self.interval
    }
}
