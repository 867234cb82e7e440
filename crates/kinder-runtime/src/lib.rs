//! # kinder-runtime
//!
//! Resilient composite reads for the kindergarten site.
//!
//! A page such as the homepage is built from several independent reads
//! against the content backend. This crate runs them concurrently, retries
//! each one with exponential backoff, and degrades a section to an empty
//! list (plus a logged [`FailureReport`](kinder_core::FailureReport)) when
//! its retries run out. One slow or broken collection never blanks the page.
//!
//! ## Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use kinder_runtime::{HomepageService, InMemorySource};
//!
//! let source = Arc::new(InMemorySource::from_json_file("fixtures.json")?);
//! let view = HomepageService::new(source).load().await?;
//! for news in &view.news {
//!     println!("{}", news.title);
//! }
//! ```

pub mod aggregator;
pub mod homepage;
pub mod resilience;
pub mod sink;
pub mod source;
pub mod task;

pub use aggregator::{Aggregator, AggregatorBuilder};
pub use homepage::HomepageService;
pub use resilience::{
    calculate_backoff, retry_with_backoff, run_with_retries, ExponentialBackoff, FetchState,
    RetryPolicy, RetryReport,
};
pub use sink::{FailureSink, MemorySink, TracingSink};
pub use source::{
    BackendKey, DataSource, FlakySource, InMemorySource, KeyOrigin, SourceError,
    KINDER_API_KEY_ENV,
};
pub use task::{FetchFuture, FetchPlan, FetchPlanBuilder, FetchTask, PlanError};

#[cfg(feature = "rest")]
pub use source::{RestSource, KINDER_API_URL_ENV};
