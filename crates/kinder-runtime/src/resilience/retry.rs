//! Retry with exponential backoff.
//!
//! One shared executor for every retried read. Attempts are strictly
//! sequential: attempt `k + 1` starts only after attempt `k` failed and its
//! backoff delay elapsed. After the last attempt the final error is handed
//! back unchanged.
//!
//! # Lifecycle
//! ```text
//! Pending → Retrying(1) → Retrying(2) → … → Succeeded | Exhausted
//! ```
//!
//! Callers must only retry idempotent operations.

use std::fmt;
use std::future::Future;

use super::backoff::RetryPolicy;

/// Where a retried operation is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchState {
    /// Not started
    Pending,

    /// Attempt `attempt` is in flight (or backing off after failing)
    Retrying { attempt: u32 },

    /// Terminal: an attempt succeeded
    Succeeded { attempts: u32 },

    /// Terminal: every attempt failed
    Exhausted { attempts: u32 },
}

impl FetchState {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            FetchState::Succeeded { .. } | FetchState::Exhausted { .. }
        )
    }

    /// Attempts started so far.
    pub fn attempts(&self) -> u32 {
        match *self {
            FetchState::Pending => 0,
            FetchState::Retrying { attempt } => attempt,
            FetchState::Succeeded { attempts } | FetchState::Exhausted { attempts } => attempts,
        }
    }

    fn begin_attempt(self) -> Self {
        match self {
            FetchState::Pending => FetchState::Retrying { attempt: 1 },
            FetchState::Retrying { attempt } => FetchState::Retrying {
                attempt: attempt + 1,
            },
            terminal => terminal,
        }
    }

    fn succeed(self) -> Self {
        FetchState::Succeeded {
            attempts: self.attempts(),
        }
    }

    fn fail(self, max_attempts: u32) -> Self {
        match self {
            FetchState::Retrying { attempt } if attempt >= max_attempts => {
                FetchState::Exhausted { attempts: attempt }
            }
            other => other,
        }
    }
}

/// Result of a retried operation plus how it got there.
#[derive(Debug)]
pub struct RetryReport<T, E> {
    /// Success value, or the error from the final attempt
    pub result: Result<T, E>,

    /// Terminal state (`Succeeded` or `Exhausted`)
    pub state: FetchState,
}

impl<T, E> RetryReport<T, E> {
    /// Attempts made.
    pub fn attempts(&self) -> u32 {
        self.state.attempts()
    }
}

/// Run `operation` until it succeeds or `policy.max_attempts` is reached.
///
/// Returns the last error unchanged on exhaustion.
pub async fn retry_with_backoff<T, E, F, Fut>(policy: &RetryPolicy, operation: F) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: fmt::Display,
{
    run_with_retries("operation", policy, operation).await.result
}

/// Like [`retry_with_backoff`], also reporting attempts and terminal state.
///
/// `name` only labels log events.
pub async fn run_with_retries<T, E, F, Fut>(
    name: &str,
    policy: &RetryPolicy,
    mut operation: F,
) -> RetryReport<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: fmt::Display,
{
    let mut state = FetchState::Pending;

    loop {
        state = state.begin_attempt();
        let attempt = state.attempts();

        match operation().await {
            Ok(value) => {
                if attempt > 1 {
                    tracing::debug!(section = name, attempts = attempt, "Fetch recovered after retry");
                }
                return RetryReport {
                    result: Ok(value),
                    state: state.succeed(),
                };
            }
            Err(error) => {
                state = state.fail(policy.max_attempts);
                if state.is_terminal() {
                    tracing::debug!(
                        section = name,
                        attempts = attempt,
                        error = %error,
                        "Retries exhausted"
                    );
                    return RetryReport {
                        result: Err(error),
                        state,
                    };
                }

                let delay = policy.delay_after(attempt);
                tracing::debug!(
                    section = name,
                    attempt,
                    delay = ?delay,
                    error = %error,
                    "Fetch attempt failed, backing off"
                );
                tokio::time::sleep(delay).await;
            }
        }
    }
}
