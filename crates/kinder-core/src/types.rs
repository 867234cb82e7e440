//! Collections and their read semantics.

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

use crate::records::{Download, Event, GalleryItem, News, Notice, Record, Teacher};

/// A content collection in the hosted database.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Collection {
    News,
    Events,
    Notices,
    Teachers,
    Gallery,
    Downloads,
}

/// Unknown collection name.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Unknown collection: '{0}'")]
pub struct UnknownCollection(pub String);

impl Collection {
    /// Every collection, in navigation order.
    pub const ALL: [Collection; 6] = [
        Collection::News,
        Collection::Events,
        Collection::Notices,
        Collection::Teachers,
        Collection::Gallery,
        Collection::Downloads,
    ];

    /// Name used in config files and the CLI.
    pub fn as_str(self) -> &'static str {
        match self {
            Collection::News => "news",
            Collection::Events => "events",
            Collection::Notices => "notices",
            Collection::Teachers => "teachers",
            Collection::Gallery => "gallery",
            Collection::Downloads => "downloads",
        }
    }

    /// Backend table holding this collection.
    pub fn table(self) -> &'static str {
        match self {
            Collection::News => "news",
            Collection::Events => "events",
            Collection::Notices => "notices",
            Collection::Teachers => "teachers",
            Collection::Gallery => "gallery_items",
            Collection::Downloads => "downloads",
        }
    }

    /// Decode raw backend rows into typed records of this collection.
    pub fn decode_rows(self, rows: Vec<serde_json::Value>) -> Result<Vec<Record>, serde_json::Error> {
        rows.into_iter().map(|row| self.decode_row(row)).collect()
    }

    fn decode_row(self, row: serde_json::Value) -> Result<Record, serde_json::Error> {
        Ok(match self {
            Collection::News => Record::News(serde_json::from_value::<News>(row)?),
            Collection::Events => Record::Event(serde_json::from_value::<Event>(row)?),
            Collection::Notices => Record::Notice(serde_json::from_value::<Notice>(row)?),
            Collection::Teachers => Record::Teacher(serde_json::from_value::<Teacher>(row)?),
            Collection::Gallery => Record::GalleryItem(serde_json::from_value::<GalleryItem>(row)?),
            Collection::Downloads => Record::Download(serde_json::from_value::<Download>(row)?),
        })
    }

    /// Pick the "recent" (or "upcoming") records of this collection.
    ///
    /// Records of other collections are ignored. Ordering:
    /// - news, gallery, downloads: newest first
    /// - events: upcoming only, soonest first
    /// - notices: unexpired only, newest first
    /// - teachers: `display_order`, then name
    pub fn select(self, records: &[Record], now: DateTime<Utc>, limit: usize) -> Vec<Record> {
        let mut selected: Vec<Record> = records
            .iter()
            .filter(|r| self.admits(r, now))
            .cloned()
            .collect();
        selected.sort_by(compare_within_collection);
        selected.truncate(limit);
        selected
    }

    fn admits(self, record: &Record, now: DateTime<Utc>) -> bool {
        match (self, record) {
            (Collection::News, Record::News(_)) => true,
            (Collection::Events, Record::Event(e)) => e.starts_at >= now,
            (Collection::Notices, Record::Notice(n)) => n.is_active(now),
            (Collection::Teachers, Record::Teacher(_)) => true,
            (Collection::Gallery, Record::GalleryItem(_)) => true,
            (Collection::Downloads, Record::Download(_)) => true,
            _ => false,
        }
    }

    /// PostgREST query parameters expressing [`Collection::select`] server-side.
    pub fn query_params(self, now: DateTime<Utc>, limit: usize) -> Vec<(String, String)> {
        let ts = now.to_rfc3339_opts(SecondsFormat::Secs, true);
        let mut params = vec![("select".to_string(), "*".to_string())];

        match self {
            Collection::News => {
                params.push(("order".into(), "published_at.desc".into()));
            }
            Collection::Events => {
                params.push(("starts_at".into(), format!("gte.{}", ts)));
                params.push(("order".into(), "starts_at.asc".into()));
            }
            Collection::Notices => {
                params.push(("or".into(), format!("(expires_at.is.null,expires_at.gt.{})", ts)));
                params.push(("order".into(), "published_at.desc".into()));
            }
            Collection::Teachers => {
                params.push(("order".into(), "display_order.asc,name.asc".into()));
            }
            Collection::Gallery => {
                params.push(("order".into(), "created_at.desc".into()));
            }
            Collection::Downloads => {
                params.push(("order".into(), "uploaded_at.desc".into()));
            }
        }

        params.push(("limit".into(), limit.to_string()));
        params
    }
}

fn compare_within_collection(a: &Record, b: &Record) -> Ordering {
    match (a, b) {
        (Record::News(a), Record::News(b)) => b.published_at.cmp(&a.published_at),
        (Record::Event(a), Record::Event(b)) => a.starts_at.cmp(&b.starts_at),
        (Record::Notice(a), Record::Notice(b)) => b.published_at.cmp(&a.published_at),
        (Record::Teacher(a), Record::Teacher(b)) => a
            .display_order
            .cmp(&b.display_order)
            .then_with(|| a.name.cmp(&b.name)),
        (Record::GalleryItem(a), Record::GalleryItem(b)) => b.created_at.cmp(&a.created_at),
        (Record::Download(a), Record::Download(b)) => b.uploaded_at.cmp(&a.uploaded_at),
        _ => Ordering::Equal,
    }
}

impl fmt::Display for Collection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Collection {
    type Err = UnknownCollection;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Collection::ALL
            .into_iter()
            .find(|c| c.as_str() == s)
            .ok_or_else(|| UnknownCollection(s.to_string()))
    }
}
