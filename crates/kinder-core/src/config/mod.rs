//! Aggregation config parsing and validation.
//!
//! A config lists the sections of a composite page view and the retry
//! budget each one gets. Documents are validated against JSON Schema first,
//! then checked semantically (unique names, non-zero budgets).

mod parser;
mod schema;

pub use parser::{
    is_valid_section_name, AggregationConfig, ConfigError, Defaults, SectionConfig,
    DEFAULT_BASE_DELAY, DEFAULT_MAX_ATTEMPTS,
};
pub use schema::{validate_config_schema, SchemaError};
