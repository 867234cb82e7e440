//! Composite read views assembled from independent section fetches.
//!
//! A [`CompositeResult`] always carries one entry per requested section. A
//! section whose fetch was exhausted is stored as an empty sequence and its
//! [`FailureReport`] is kept alongside, so renderers only ever deal with
//! empty lists, never missing keys.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Diagnostic entry for a section that fell back to empty.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FailureReport {
    /// Section that failed
    pub section: String,

    /// Rendered error from the final attempt
    pub error: String,

    /// Attempts made before giving up
    pub attempts: u32,

    /// When the section was given up on
    pub at: DateTime<Utc>,
}

impl FailureReport {
    /// Create a report stamped with the current time.
    pub fn new(section: impl Into<String>, error: &dyn fmt::Display, attempts: u32) -> Self {
        Self {
            section: section.into(),
            error: error.to_string(),
            attempts,
            at: Utc::now(),
        }
    }
}

impl fmt::Display for FailureReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} failed after {} attempt(s) at {}: {}",
            self.section,
            self.attempts,
            self.at.to_rfc3339(),
            self.error
        )
    }
}

/// Terminal result of one section fetch.
#[derive(Debug, Clone, PartialEq)]
pub enum FetchOutcome<R> {
    /// The fetch succeeded on attempt `attempts`
    Succeeded { records: Vec<R>, attempts: u32 },

    /// Every attempt failed
    Exhausted(FailureReport),
}

impl<R> FetchOutcome<R> {
    /// Records to render; empty when exhausted.
    pub fn into_records(self) -> Vec<R> {
        match self {
            FetchOutcome::Succeeded { records, .. } => records,
            FetchOutcome::Exhausted(_) => Vec::new(),
        }
    }

    pub fn is_exhausted(&self) -> bool {
        matches!(self, FetchOutcome::Exhausted(_))
    }

    /// Number of attempts the fetch took.
    pub fn attempts(&self) -> u32 {
        match self {
            FetchOutcome::Succeeded { attempts, .. } => *attempts,
            FetchOutcome::Exhausted(report) => report.attempts,
        }
    }

    pub fn failure(&self) -> Option<&FailureReport> {
        match self {
            FetchOutcome::Exhausted(report) => Some(report),
            FetchOutcome::Succeeded { .. } => None,
        }
    }
}

/// Fully keyed mapping from section name to its records.
#[derive(Debug, Clone, Serialize)]
pub struct CompositeResult<R> {
    sections: BTreeMap<String, Vec<R>>,
    failures: Vec<FailureReport>,
}

impl<R> CompositeResult<R> {
    /// Create an empty result.
    pub fn new() -> Self {
        Self {
            sections: BTreeMap::new(),
            failures: Vec::new(),
        }
    }

    /// Store a section's outcome. Exhausted outcomes become an empty entry.
    pub fn insert(&mut self, section: impl Into<String>, outcome: FetchOutcome<R>) {
        let section = section.into();
        match outcome {
            FetchOutcome::Succeeded { records, .. } => {
                self.sections.insert(section, records);
            }
            FetchOutcome::Exhausted(report) => {
                self.sections.insert(section, Vec::new());
                self.failures.push(report);
            }
        }
    }

    /// Records for a section. Unknown sections read as empty.
    pub fn section(&self, name: &str) -> &[R] {
        self.sections.get(name).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Whether `name` was part of the request.
    pub fn contains(&self, name: &str) -> bool {
        self.sections.contains_key(name)
    }

    /// Number of sections (equals the number requested).
    pub fn len(&self) -> usize {
        self.sections.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sections.is_empty()
    }

    /// Section names in sorted order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.sections.keys().map(String::as_str)
    }

    /// Iterate `(section, records)` pairs in sorted order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &[R])> {
        self.sections.iter().map(|(k, v)| (k.as_str(), v.as_slice()))
    }

    /// Reports for every section that fell back to empty.
    pub fn failures(&self) -> &[FailureReport] {
        &self.failures
    }

    /// Whether any section fell back to empty.
    pub fn is_degraded(&self) -> bool {
        !self.failures.is_empty()
    }

    /// Consume into the raw mapping and failure list.
    pub fn into_parts(self) -> (BTreeMap<String, Vec<R>>, Vec<FailureReport>) {
        (self.sections, self.failures)
    }
}

impl<R> Default for CompositeResult<R> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exhausted_section_is_present_and_empty() {
        let mut result: CompositeResult<u32> = CompositeResult::new();
        result.insert(
            "news",
            FetchOutcome::Exhausted(FailureReport::new("news", &"connection reset", 3)),
        );
        result.insert(
            "events",
            FetchOutcome::Succeeded {
                records: vec![1, 2],
                attempts: 2,
            },
        );

        assert_eq!(result.len(), 2);
        assert!(result.contains("news"));
        assert!(result.section("news").is_empty());
        assert_eq!(result.section("events"), &[1, 2]);
        assert!(result.is_degraded());
        assert_eq!(result.failures()[0].section, "news");
        assert_eq!(result.failures()[0].attempts, 3);
    }

    #[test]
    fn test_unknown_section_reads_empty() {
        let result: CompositeResult<u32> = CompositeResult::new();
        assert!(result.section("gallery").is_empty());
        assert!(!result.contains("gallery"));
        assert!(!result.is_degraded());
    }

    #[test]
    fn test_outcome_accessors() {
        let ok: FetchOutcome<u32> = FetchOutcome::Succeeded {
            records: vec![7],
            attempts: 1,
        };
        assert_eq!(ok.attempts(), 1);
        assert!(ok.failure().is_none());
        assert_eq!(ok.into_records(), vec![7]);

        let failed: FetchOutcome<u32> =
            FetchOutcome::Exhausted(FailureReport::new("notices", &"timeout", 3));
        assert!(failed.is_exhausted());
        assert_eq!(failed.attempts(), 3);
        assert!(failed.into_records().is_empty());
    }

    #[test]
    fn test_serializes_sections_and_failures() {
        let mut result: CompositeResult<String> = CompositeResult::new();
        result.insert(
            "teachers",
            FetchOutcome::Succeeded {
                records: vec!["Ms. Park".to_string()],
                attempts: 1,
            },
        );
        result.insert(
            "news",
            FetchOutcome::Exhausted(FailureReport::new("news", &"503", 2)),
        );

        let value = serde_json::to_value(&result).unwrap();
        assert_eq!(value["sections"]["teachers"][0], "Ms. Park");
        assert_eq!(value["sections"]["news"], serde_json::json!([]));
        assert_eq!(value["failures"][0]["error"], "503");
    }
}
