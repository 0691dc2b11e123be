//! Bounded polling combinator.

use std::future::Future;
use std::time::Duration;

use tracing::trace;

/// Maximum attempts and the fixed delay before each one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub delay: Duration,
}

impl RetryPolicy {
    pub const fn new(max_attempts: u32, delay: Duration) -> Self {
        Self {
            max_attempts,
            delay,
        }
    }
}

/// Poll `attempt` until it yields `Some`, fails, or the policy is exhausted.
///
/// Each attempt is preceded by `policy.delay`. The closure receives the
/// 1-based attempt number. Returns `Ok(None)` after `max_attempts` misses;
/// an `Err` from any attempt is returned immediately.
pub async fn poll_until<T, E, F, Fut>(policy: RetryPolicy, mut attempt: F) -> Result<Option<T>, E>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<Option<T>, E>>,
{
    for n in 1..=policy.max_attempts {
        tokio::time::sleep(policy.delay).await;
        if let Some(found) = attempt(n).await? {
            trace!(attempt = n, "Poll succeeded");
            return Ok(Some(found));
        }
        trace!(attempt = n, max = policy.max_attempts, "Poll missed");
    }
    Ok(None)
}
