//! Exponential backoff schedule.
//!
//! Delays are computed with integer arithmetic so the schedule is exact:
//! the delay before attempt `i + 1` is `base * 2^(i - 1)`.

use std::time::Duration;

use kinder_core::{Defaults, SectionConfig};

/// Attempt budget and base delay for one retried operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, including the first (at least 1)
    pub max_attempts: u32,

    /// Delay before the second attempt; doubles after each failure
    pub base_delay: Duration,
}

impl RetryPolicy {
    /// Create a policy. A zero attempt budget is clamped to one.
    pub fn new(max_attempts: u32, base_delay: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            base_delay,
        }
    }

    /// A single attempt with no retries.
    pub fn no_retry() -> Self {
        Self::new(1, Duration::ZERO)
    }

    /// Effective policy for a configured section.
    pub fn for_section(section: &SectionConfig, defaults: &Defaults) -> Self {
        Self::new(
            section.effective_max_attempts(defaults),
            section.effective_base_delay(defaults),
        )
    }

    /// Delay to wait after failed attempt `attempt` (1-indexed).
    pub fn delay_after(&self, attempt: u32) -> Duration {
        calculate_backoff(attempt, self.base_delay)
    }

    /// The delays between attempts, in order (`max_attempts - 1` of them).
    pub fn schedule(&self) -> ExponentialBackoff {
        ExponentialBackoff::new(*self)
    }

    /// Wall-clock spent sleeping if every attempt fails.
    pub fn total_delay(&self) -> Duration {
        self.schedule()
            .fold(Duration::ZERO, |acc, d| acc.saturating_add(d))
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(
            kinder_core::config::DEFAULT_MAX_ATTEMPTS,
            kinder_core::config::DEFAULT_BASE_DELAY,
        )
    }
}

/// `base * 2^(attempt - 1)`, saturating; zero for attempt 0.
pub fn calculate_backoff(attempt: u32, base: Duration) -> Duration {
    if attempt == 0 {
        return Duration::ZERO;
    }

    match 2u32.checked_pow(attempt - 1) {
        Some(factor) => base.saturating_mul(factor),
        None if base.is_zero() => Duration::ZERO,
        None => Duration::MAX,
    }
}

/// Iterator over the delays of a [`RetryPolicy`].
#[derive(Debug, Clone)]
pub struct ExponentialBackoff {
    policy: RetryPolicy,
    attempt: u32,
}

impl ExponentialBackoff {
    fn new(policy: RetryPolicy) -> Self {
        Self { policy, attempt: 1 }
    }
}

impl Iterator for ExponentialBackoff {
    type Item = Duration;

    fn next(&mut self) -> Option<Duration> {
        if self.attempt >= self.policy.max_attempts {
            return None;
        }
        let delay = self.policy.delay_after(self.attempt);
        self.attempt += 1;
        Some(delay)
    }
}
