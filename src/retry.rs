//! Bounded exponential backoff for rate-limited upstream calls.

use core::time::Duration;

/// Default number of retries after the first attempt.
pub const DEFAULT_MAX_RETRIES: u32 = 5;

/// Default delay before the first retry.
pub const DEFAULT_BASE_DELAY: Duration = Duration::from_secs(3);

/// Default growth factor between consecutive delays.
pub const DEFAULT_MULTIPLIER: u32 = 2;

/// How many times to retry a transient failure and how long to wait.
///
/// The wait before retry `n` (zero-based) is `base_delay × multiplierⁿ`, so
/// the defaults wait 3 s, 6 s, 12 s, 24 s, 48 s.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RetryPolicy {
    /// Retries after the first attempt; `0` disables retrying.
    pub max_retries: u32,
    /// Delay before the first retry.
    pub base_delay: Duration,
    /// Factor applied to the delay after each retry.
    pub multiplier: u32,
}

impl Default for RetryPolicy {
    #[inline]
    fn default() -> Self {
        Self {
            max_retries: DEFAULT_MAX_RETRIES,
            base_delay: DEFAULT_BASE_DELAY,
            multiplier: DEFAULT_MULTIPLIER,
        }
    }
}

impl RetryPolicy {
    /// A policy that never retries.
    pub const NONE: Self = Self {
        max_retries: 0,
        base_delay: Duration::ZERO,
        multiplier: 1,
    };

    /// Same retry count with no waiting; meant for tests and mocks.
    #[inline]
    #[must_use]
    pub const fn immediate(max_retries: u32) -> Self {
        Self {
            max_retries,
            base_delay: Duration::ZERO,
            multiplier: DEFAULT_MULTIPLIER,
        }
    }

    /// Delay before retry number `retry` (zero-based). Saturates instead
    /// of overflowing.
    #[inline]
    #[must_use]
    pub fn delay_for(&self, retry: u32) -> Duration {
        let factor = self.multiplier.saturating_pow(retry);
        self.base_delay.saturating_mul(factor)
    }

    /// Whether another attempt is allowed after `retries_done` retries.
    #[inline]
    #[must_use]
    pub const fn should_retry(&self, retries_done: u32) -> bool {
        retries_done < self.max_retries
    }
}

/// Whether an HTTP status signals a transient quota or capacity problem.
#[inline]
#[must_use]
pub const fn is_retryable_status(status: u16) -> bool {
    matches!(status, 429 | 503)
}

/// Whether an error body reports an overloaded model.
#[inline]
#[must_use]
pub fn is_overloaded_message(body: &str) -> bool {
    body.to_ascii_lowercase().contains("overloaded")
}
