//! Domain records served by the content backend.
//!
//! Each collection in the hosted database maps to one struct here. Required
//! columns are plain fields; nullable columns are `Option`s with
//! `#[serde(default)]` so rows with missing keys still decode.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A news article.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct News {
    pub id: String,

    pub title: String,

    /// Teaser shown on listing pages
    #[serde(default)]
    pub summary: Option<String>,

    /// Full article body (markdown)
    #[serde(default)]
    pub body: Option<String>,

    #[serde(default)]
    pub image_url: Option<String>,

    #[serde(default)]
    pub author: Option<String>,

    pub published_at: DateTime<Utc>,
}

/// A scheduled event (open day, festival, parent meeting).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Event {
    pub id: String,

    pub title: String,

    #[serde(default)]
    pub description: Option<String>,

    #[serde(default)]
    pub location: Option<String>,

    pub starts_at: DateTime<Utc>,

    #[serde(default)]
    pub ends_at: Option<DateTime<Utc>>,
}

/// How prominently a notice is displayed.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Default)]
#[serde(rename_all = "snake_case")]
pub enum NoticePriority {
    #[default]
    Normal,
    Important,
    Urgent,
}

/// A notice to parents (closures, deadlines, health advisories).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Notice {
    pub id: String,

    pub title: String,

    pub body: String,

    #[serde(default)]
    pub priority: NoticePriority,

    pub published_at: DateTime<Utc>,

    /// Notices disappear from the site once this passes
    #[serde(default)]
    pub expires_at: Option<DateTime<Utc>>,
}

impl Notice {
    /// Whether the notice should still be shown at `now`.
    pub fn is_active(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.map_or(true, |expires| expires > now)
    }
}

/// A member of staff.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Teacher {
    pub id: String,

    pub name: String,

    /// Role shown under the name (e.g., "Lead teacher, Sunflower class")
    pub position: String,

    #[serde(default)]
    pub bio: Option<String>,

    #[serde(default)]
    pub photo_url: Option<String>,

    #[serde(default)]
    pub email: Option<String>,

    /// Sort key on the teachers page; lower comes first
    #[serde(default)]
    pub display_order: i32,
}

/// A photo in the gallery.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GalleryItem {
    pub id: String,

    pub title: String,

    pub image_url: String,

    #[serde(default)]
    pub album: Option<String>,

    pub created_at: DateTime<Utc>,
}

/// A downloadable document (forms, menus, calendars).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Download {
    pub id: String,

    pub title: String,

    pub file_url: String,

    #[serde(default)]
    pub category: Option<String>,

    pub uploaded_at: DateTime<Utc>,
}

/// Any record the data source can return.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Record {
    News(News),
    Event(Event),
    Notice(Notice),
    Teacher(Teacher),
    GalleryItem(GalleryItem),
    Download(Download),
}

impl Record {
    /// Identifier of the underlying row.
    pub fn id(&self) -> &str {
        match self {
            Record::News(r) => &r.id,
            Record::Event(r) => &r.id,
            Record::Notice(r) => &r.id,
            Record::Teacher(r) => &r.id,
            Record::GalleryItem(r) => &r.id,
            Record::Download(r) => &r.id,
        }
    }

    /// Display title (teachers use their name).
    pub fn title(&self) -> &str {
        match self {
            Record::News(r) => &r.title,
            Record::Event(r) => &r.title,
            Record::Notice(r) => &r.title,
            Record::Teacher(r) => &r.name,
            Record::GalleryItem(r) => &r.title,
            Record::Download(r) => &r.title,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_optional_columns_default() {
        let json = r#"{
            "id": "n1",
            "title": "Spring festival recap",
            "published_at": "2026-04-02T09:00:00Z"
        }"#;
        let news: News = serde_json::from_str(json).unwrap();
        assert_eq!(news.title, "Spring festival recap");
        assert!(news.summary.is_none());
        assert!(news.image_url.is_none());
    }

    #[test]
    fn test_missing_required_column_fails() {
        let json = r#"{ "id": "t1", "name": "Ms. Park" }"#;
        let result: Result<Teacher, _> = serde_json::from_str(json);
        assert!(result.is_err());
    }

    #[test]
    fn test_notice_priority_defaults_to_normal() {
        let json = r#"{
            "id": "x",
            "title": "Closed Monday",
            "body": "Public holiday",
            "published_at": "2026-05-01T00:00:00Z"
        }"#;
        let notice: Notice = serde_json::from_str(json).unwrap();
        assert_eq!(notice.priority, NoticePriority::Normal);
    }

    #[test]
    fn test_notice_expiry() {
        let now = Utc.with_ymd_and_hms(2026, 5, 10, 0, 0, 0).unwrap();
        let mut notice = Notice {
            id: "x".into(),
            title: "Flu season".into(),
            body: "Keep sick children home".into(),
            priority: NoticePriority::Important,
            published_at: Utc.with_ymd_and_hms(2026, 5, 1, 0, 0, 0).unwrap(),
            expires_at: None,
        };
        assert!(notice.is_active(now));

        notice.expires_at = Some(Utc.with_ymd_and_hms(2026, 5, 9, 0, 0, 0).unwrap());
        assert!(!notice.is_active(now));
    }

    #[test]
    fn test_record_is_tagged_by_kind() {
        let record = Record::Teacher(Teacher {
            id: "t1".into(),
            name: "Ms. Park".into(),
            position: "Lead teacher".into(),
            bio: None,
            photo_url: None,
            email: None,
            display_order: 1,
        });
        let value = serde_json::to_value(&record).unwrap();
        assert_eq!(value["kind"], "teacher");
        assert_eq!(record.title(), "Ms. Park");
        assert_eq!(record.id(), "t1");
    }
}
