//! In-memory data source backed by fixture documents.
//!
//! Fixtures are a JSON object keyed by collection name, each holding raw rows
//! in the same shape the hosted database returns:
//!
//! ```json
//! {
//!   "news":     [ { "id": "n1", "title": "…", "published_at": "2026-04-02T09:00:00Z" } ],
//!   "teachers": [ { "id": "t1", "name": "…", "position": "…" } ]
//! }
//! ```

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use kinder_core::{Collection, Record};

use super::{DataSource, SourceError};

/// Fixture-backed source. Applies the same ordering and filtering the
/// backend would (see [`Collection::select`]).
#[derive(Debug, Clone, Default)]
pub struct InMemorySource {
    records: BTreeMap<Collection, Vec<Record>>,

    /// Fixed "now"; `None` uses the wall clock
    clock: Option<DateTime<Utc>>,
}

impl InMemorySource {
    /// Create an empty source.
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a fixture document.
    pub fn from_json(json: &str) -> Result<Self, SourceError> {
        let document: serde_json::Map<String, serde_json::Value> = serde_json::from_str(json)?;
        let mut source = Self::new();

        for (key, rows) in document {
            let collection: Collection = key
                .parse()
                .map_err(|e: kinder_core::UnknownCollection| SourceError::Decode(e.to_string()))?;
            let rows: Vec<serde_json::Value> = serde_json::from_value(rows)?;
            let records = collection.decode_rows(rows)?;
            source.insert(collection, records);
        }

        Ok(source)
    }

    /// Parse a fixture file.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, SourceError> {
        let contents = fs::read_to_string(path)?;
        Self::from_json(&contents)
    }

    /// Pin the clock used for "upcoming"/"active" filtering.
    pub fn with_clock(mut self, now: DateTime<Utc>) -> Self {
        self.clock = Some(now);
        self
    }

    /// Add records to a collection.
    pub fn insert(&mut self, collection: Collection, records: Vec<Record>) {
        self.records.entry(collection).or_default().extend(records);
    }

    /// Number of stored records in a collection (before filtering).
    pub fn count(&self, collection: Collection) -> usize {
        self.records.get(&collection).map_or(0, Vec::len)
    }

    fn now(&self) -> DateTime<Utc> {
        self.clock.unwrap_or_else(Utc::now)
    }
}

#[async_trait]
impl DataSource for InMemorySource {
    async fn fetch(&self, collection: Collection, limit: usize) -> Result<Vec<Record>, SourceError> {
        let records = self
            .records
            .get(&collection)
            .map(|rows| collection.select(rows, self.now(), limit))
            .unwrap_or_default();
        Ok(records)
    }

    fn name(&self) -> &str {
        "memory"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    const FIXTURES: &str = r#"{
        "news": [
            { "id": "n1", "title": "Welcome back", "published_at": "2026-09-01T08:00:00Z" },
            { "id": "n2", "title": "Harvest fair", "published_at": "2026-09-20T08:00:00Z" }
        ],
        "events": [
            { "id": "e1", "title": "Summer picnic", "starts_at": "2026-07-01T10:00:00Z" },
            { "id": "e2", "title": "Lantern walk", "starts_at": "2026-11-11T17:00:00Z" }
        ],
        "teachers": [
            { "id": "t2", "name": "Mr. Osei", "position": "Music", "display_order": 2 },
            { "id": "t1", "name": "Ms. Park", "position": "Lead teacher", "display_order": 1 }
        ]
    }"#;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 10, 1, 0, 0, 0).unwrap()
    }

    #[tokio::test]
    async fn test_fetch_applies_collection_semantics() {
        let source = InMemorySource::from_json(FIXTURES).unwrap().with_clock(now());

        let news = source.fetch(Collection::News, 1).await.unwrap();
        assert_eq!(news.len(), 1);
        assert_eq!(news[0].id(), "n2");

        let events = source.fetch(Collection::Events, 10).await.unwrap();
        let ids: Vec<_> = events.iter().map(Record::id).collect();
        assert_eq!(ids, vec!["e2"]);

        let teachers = source.fetch(Collection::Teachers, 10).await.unwrap();
        assert_eq!(teachers[0].title(), "Ms. Park");
    }

    #[tokio::test]
    async fn test_missing_collection_is_empty() {
        let source = InMemorySource::from_json(FIXTURES).unwrap();
        let downloads = source.fetch(Collection::Downloads, 5).await.unwrap();
        assert!(downloads.is_empty());
        assert_eq!(source.count(Collection::Downloads), 0);
        assert_eq!(source.count(Collection::News), 2);
    }

    #[test]
    fn test_unknown_collection_key_fails() {
        let result = InMemorySource::from_json(r#"{ "lunch_menu": [] }"#);
        assert!(matches!(result, Err(SourceError::Decode(_))));
    }

    #[test]
    fn test_malformed_row_fails() {
        let result = InMemorySource::from_json(r#"{ "news": [ { "id": "n1" } ] }"#);
        assert!(matches!(result, Err(SourceError::Decode(_))));
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let result = InMemorySource::from_json_file("/nonexistent/kinder-fixtures.json");
        assert!(matches!(result, Err(SourceError::Io(_))));
    }
}
