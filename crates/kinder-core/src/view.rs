//! Typed homepage view handed to the rendering layer.

use serde::Serialize;

use crate::composite::{CompositeResult, FailureReport};
use crate::records::{Download, Event, GalleryItem, News, Notice, Record, Teacher};

/// Everything the homepage renders, one typed list per block.
///
/// Blocks whose section failed are empty; `failures` says why.
#[derive(Debug, Clone, Default, Serialize)]
pub struct HomepageView {
    pub news: Vec<News>,
    pub events: Vec<Event>,
    pub notices: Vec<Notice>,
    pub teachers: Vec<Teacher>,
    pub gallery: Vec<GalleryItem>,
    pub downloads: Vec<Download>,
    pub failures: Vec<FailureReport>,
}

impl HomepageView {
    /// Partition a composite result's records into typed blocks.
    ///
    /// Section order within each block is preserved. Blocks are keyed by
    /// collection, so each collection should come from one section;
    /// [`AggregationConfig::validate`](crate::AggregationConfig::validate)
    /// enforces this.
    pub fn from_composite(result: CompositeResult<Record>) -> Self {
        let (sections, failures) = result.into_parts();
        let mut view = HomepageView {
            failures,
            ..Default::default()
        };

        for record in sections.into_values().flatten() {
            match record {
                Record::News(r) => view.news.push(r),
                Record::Event(r) => view.events.push(r),
                Record::Notice(r) => view.notices.push(r),
                Record::Teacher(r) => view.teachers.push(r),
                Record::GalleryItem(r) => view.gallery.push(r),
                Record::Download(r) => view.downloads.push(r),
            }
        }

        view
    }

    /// Whether any block fell back to empty.
    pub fn is_degraded(&self) -> bool {
        !self.failures.is_empty()
    }

    /// Whether the named section fell back to empty.
    pub fn section_failed(&self, section: &str) -> bool {
        self.failures.iter().any(|f| f.section == section)
    }
}
