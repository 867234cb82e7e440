//! # kinder-core
//!
//! Deterministic building blocks for the kindergarten site's composite views.
//!
//! This crate holds everything that does not need an async runtime:
//! - Typed records for each content collection (news, events, notices, ...)
//! - Collection read semantics ("recent", "upcoming", "active")
//! - [`CompositeResult`], the fully keyed, partial-failure-tolerant view
//! - [`HomepageView`], the typed form handed to the renderer
//! - [`AggregationConfig`], which sections to fetch and how hard to retry
//!
//! ## Key Guarantees
//!
//! 1. **Fully keyed**: a composite result has an entry for every requested
//!    section; failed sections are empty, never absent
//! 2. **Deterministic**: section order is sorted (BTreeMap), not hash order
//! 3. **Validated config**: duplicate or malformed sections are rejected
//!    at load time
//!
//! ## Example
//!
//! ```rust,ignore
//! use kinder_core::{AggregationConfig, HomepageView};
//!
//! let config = AggregationConfig::from_file("homepage.yaml")?;
//! // ... run the aggregation with kinder-runtime ...
//! let view = HomepageView::from_composite(result);
//! if view.is_degraded() {
//!     for failure in &view.failures {
//!         eprintln!("{}", failure);
//!     }
//! }
//! ```

pub mod composite;
pub mod config;
pub mod records;
pub mod types;
pub mod view;

// Re-export main types at crate root
pub use composite::{CompositeResult, FailureReport, FetchOutcome};
pub use config::{
    is_valid_section_name, AggregationConfig, ConfigError, Defaults, SectionConfig,
};
pub use records::{Download, Event, GalleryItem, News, Notice, NoticePriority, Record, Teacher};
pub use types::{Collection, UnknownCollection};
pub use view::HomepageView;
