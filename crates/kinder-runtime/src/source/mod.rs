//! Data source abstractions for kinder-runtime.
//!
//! A [`DataSource`] answers one question: "give me the recent (or upcoming)
//! records of collection X, at most N of them". The aggregator treats it as
//! a stateless, idempotent read dependency and retries it freely.
//!
//! Implementations:
//! - [`InMemorySource`]: fixture data, with an injectable clock
//! - [`FlakySource`]: wraps another source and fails a scripted number of
//!   calls per collection (outage drills, tests)
//! - `RestSource` (feature `rest`): PostgREST-style hosted database, keyed
//!   by a [`BackendKey`]

use async_trait::async_trait;
use std::time::Duration;
use thiserror::Error;

use kinder_core::{Collection, Record};

mod flaky;
mod key;
mod memory;

#[cfg(feature = "rest")]
mod rest;

pub use flaky::FlakySource;
pub use key::{BackendKey, KeyOrigin, KINDER_API_KEY_ENV};
pub use memory::InMemorySource;

#[cfg(feature = "rest")]
pub use rest::{RestSource, KINDER_API_URL_ENV};

/// Errors from data sources.
#[derive(Error, Debug)]
pub enum SourceError {
    #[error("HTTP request failed: {0}")]
    Http(String),

    #[error("Backend error: {status} - {message}")]
    Backend { status: u16, message: String },

    #[error("Failed to decode rows: {0}")]
    Decode(String),

    #[error("Failed to read fixtures: {0}")]
    Io(#[from] std::io::Error),

    #[error("Timeout after {0:?}")]
    Timeout(Duration),

    #[error("Deadline of {0:?} elapsed")]
    DeadlineElapsed(Duration),

    #[error("Collection unavailable: {0}")]
    Unavailable(String),

    #[error("Source not configured: {0}")]
    NotConfigured(String),
}

impl From<serde_json::Error> for SourceError {
    fn from(e: serde_json::Error) -> Self {
        SourceError::Decode(e.to_string())
    }
}

/// Read access to the content backend.
///
/// # Contract
/// - `fetch` MUST be an idempotent read: the aggregator may call it several
///   times for one request
/// - Records come back already ordered and truncated to `limit`
#[async_trait]
pub trait DataSource: Send + Sync {
    /// Fetch the recent/upcoming records of `collection`.
    async fn fetch(&self, collection: Collection, limit: usize) -> Result<Vec<Record>, SourceError>;

    /// Source name for logs.
    fn name(&self) -> &str;
}
