//! Reconnect policy: caller veto plus minimum spacing between attempts.

use std::time::Duration;

use async_trait::async_trait;

/// Reconnect attempts are never spaced closer than this.
pub const MIN_RETRY_SPACING: Duration = Duration::from_millis(1000);

/// Caller hook consulted before every reconnect attempt.
///
/// Only `Ok(false)` stops the reconnect sequence and closes the channel.
/// `Err` (and a panic) is logged and treated as "keep retrying".
///
/// Plain closures work directly:
///
/// ```rust
/// # use scl_client::RetryPolicy;
/// fn at_most_five() -> impl RetryPolicy {
///     |attempt: u32| attempt <= 5
/// }
/// ```
#[async_trait]
pub trait RetryPolicy: Send + Sync {
    /// `attempt` is 1-based and restarts after every successful reconnect.
    async fn should_retry(&self, attempt: u32) -> anyhow::Result<bool>;
}

#[async_trait]
impl<F> RetryPolicy for F
where
    F: Fn(u32) -> bool + Send + Sync,
{
    async fn should_retry(&self, attempt: u32) -> anyhow::Result<bool> {
        Ok(self(attempt))
    }
}

/// Minimum spacing between the starts of two reconnect attempts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReconnectPacing {
    min_spacing: Duration,
}

impl Default for ReconnectPacing {
    fn default() -> Self {
        Self {
            min_spacing: MIN_RETRY_SPACING,
        }
    }
}

impl ReconnectPacing {
    /// Spacing below [`MIN_RETRY_SPACING`] is raised to it.
    pub fn new(min_spacing: Duration) -> Self {
        Self {
            min_spacing: min_spacing.max(MIN_RETRY_SPACING),
        }
    }

    pub fn min_spacing(&self) -> Duration {
        self.min_spacing
    }

    /// How much longer to wait, given how long ago the attempt started.
    pub fn remaining(&self, elapsed: Duration) -> Option<Duration> {
        self.min_spacing
            .checked_sub(elapsed)
            .filter(|d| !d.is_zero())
    }
}
