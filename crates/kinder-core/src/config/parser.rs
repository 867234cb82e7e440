//! Aggregation config parsing from YAML/JSON.

use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

use super::schema::validate_config_schema;
use crate::types::Collection;

/// Attempts per section when a config does not say otherwise.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;

/// First backoff delay when a config does not say otherwise.
pub const DEFAULT_BASE_DELAY: Duration = Duration::from_millis(500);

lazy_static! {
    static ref SECTION_NAME: Regex = Regex::new(r"^[a-z][a-z0-9_-]*$").unwrap();
}

/// Whether `name` is a valid section name (lowercase slug).
pub fn is_valid_section_name(name: &str) -> bool {
    SECTION_NAME.is_match(name)
}

/// Errors that can occur when loading configs.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse YAML: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("Failed to parse JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Schema validation failed: {}", .0.join("; "))]
    Schema(Vec<String>),

    #[error("Config validation failed: {0}")]
    Validation(String),
}

/// Retry settings shared by every section unless overridden.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Defaults {
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    #[serde(default = "default_base_delay", with = "humantime_duration")]
    pub base_delay: Duration,

    /// Upper bound on one section's whole retry envelope
    #[serde(
        default,
        with = "humantime_duration_opt",
        skip_serializing_if = "Option::is_none"
    )]
    pub deadline: Option<Duration>,
}

fn default_max_attempts() -> u32 {
    DEFAULT_MAX_ATTEMPTS
}

fn default_base_delay() -> Duration {
    DEFAULT_BASE_DELAY
}

impl Default for Defaults {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            base_delay: DEFAULT_BASE_DELAY,
            deadline: None,
        }
    }
}

/// One section of a composite view.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SectionConfig {
    /// Key in the composite result
    pub name: String,

    /// Collection to read from
    pub collection: Collection,

    /// Maximum records to fetch
    pub limit: usize,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_attempts: Option<u32>,

    #[serde(
        default,
        with = "humantime_duration_opt",
        skip_serializing_if = "Option::is_none"
    )]
    pub base_delay: Option<Duration>,
}

impl SectionConfig {
    /// Create a section using the config defaults for retries.
    pub fn new(name: impl Into<String>, collection: Collection, limit: usize) -> Self {
        Self {
            name: name.into(),
            collection,
            limit,
            max_attempts: None,
            base_delay: None,
        }
    }

    /// Effective attempt budget given the config defaults.
    pub fn effective_max_attempts(&self, defaults: &Defaults) -> u32 {
        self.max_attempts.unwrap_or(defaults.max_attempts)
    }

    /// Effective base delay given the config defaults.
    pub fn effective_base_delay(&self, defaults: &Defaults) -> Duration {
        self.base_delay.unwrap_or(defaults.base_delay)
    }
}

/// Sections fetched together to build one page view.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AggregationConfig {
    #[serde(default)]
    pub defaults: Defaults,

    pub sections: Vec<SectionConfig>,
}

impl AggregationConfig {
    /// The homepage: latest news, upcoming events, active notices, staff.
    pub fn homepage() -> Self {
        Self {
            defaults: Defaults::default(),
            sections: vec![
                SectionConfig::new("news", Collection::News, 3),
                SectionConfig::new("events", Collection::Events, 3),
                SectionConfig::new("notices", Collection::Notices, 5),
                SectionConfig::new("teachers", Collection::Teachers, 4),
            ],
        }
    }

    /// Parse a config from YAML string.
    pub fn from_yaml(yaml: &str) -> Result<Self, ConfigError> {
        let value: serde_json::Value = serde_yaml::from_str(yaml)?;
        Self::from_value(value)
    }

    /// Parse a config from JSON string.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let value: serde_json::Value = serde_json::from_str(json)?;
        Self::from_value(value)
    }

    /// Parse a config file, choosing the format by extension (`.json` or YAML).
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path)?;
        let config = match path.extension().and_then(|e| e.to_str()) {
            Some("json") => Self::from_json(&contents)?,
            _ => Self::from_yaml(&contents)?,
        };
        tracing::debug!(
            path = %path.display(),
            sections = config.sections.len(),
            "Loaded aggregation config"
        );
        Ok(config)
    }

    fn from_value(value: serde_json::Value) -> Result<Self, ConfigError> {
        validate_config_schema(&value).map_err(ConfigError::Schema)?;
        let config: AggregationConfig = serde_json::from_value(value)?;
        config.validate()?;
        Ok(config)
    }

    /// Semantic checks the schema cannot express.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.sections.is_empty() {
            return Err(ConfigError::Validation("no sections configured".to_string()));
        }

        if self.defaults.max_attempts == 0 {
            return Err(ConfigError::Validation(
                "defaults.max_attempts must be at least 1".to_string(),
            ));
        }

        let mut seen = HashSet::new();
        let mut readers: HashMap<Collection, &str> = HashMap::new();
        for section in &self.sections {
            if !is_valid_section_name(&section.name) {
                return Err(ConfigError::Validation(format!(
                    "Invalid section name: '{}'",
                    section.name
                )));
            }
            if !seen.insert(section.name.as_str()) {
                return Err(ConfigError::Validation(format!(
                    "Duplicate section name: {}",
                    section.name
                )));
            }
            // Views group records by collection, so one reader per collection
            if let Some(first) = readers.insert(section.collection, section.name.as_str()) {
                return Err(ConfigError::Validation(format!(
                    "Sections '{}' and '{}' both read collection {}",
                    first, section.name, section.collection
                )));
            }
            if section.limit == 0 {
                return Err(ConfigError::Validation(format!(
                    "Section '{}' has limit 0",
                    section.name
                )));
            }
            if section.max_attempts == Some(0) {
                return Err(ConfigError::Validation(format!(
                    "Section '{}' has max_attempts 0",
                    section.name
                )));
            }
        }

        Ok(())
    }

    /// Look up a section by name.
    pub fn section(&self, name: &str) -> Option<&SectionConfig> {
        self.sections.iter().find(|s| s.name == name)
    }
}

impl Default for AggregationConfig {
    fn default() -> Self {
        Self::homepage()
    }
}

mod humantime_duration {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&humantime::format_duration(*duration).to_string())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let text = String::deserialize(deserializer)?;
        humantime::parse_duration(&text).map_err(serde::de::Error::custom)
    }
}

mod humantime_duration_opt {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Option<Duration>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match duration {
            Some(d) => serializer.serialize_str(&humantime::format_duration(*d).to_string()),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<Duration>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let text = Option::<String>::deserialize(deserializer)?;
        text.map(|t| humantime::parse_duration(&t).map_err(serde::de::Error::custom))
            .transpose()
    }
}
