//! Resilience patterns for kinder-runtime.
//!
//! This module provides:
//! - Exponential backoff schedule (exact, no jitter)
//! - Retry executor with an explicit per-operation lifecycle
//!
//! Every retried read in the workspace goes through [`retry_with_backoff`]
//! or [`run_with_retries`]; there are no per-call-site retry loops.

mod backoff;
mod retry;

pub use backoff::{calculate_backoff, ExponentialBackoff, RetryPolicy};
pub use retry::{retry_with_backoff, run_with_retries, FetchState, RetryReport};
