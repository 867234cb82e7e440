//! Hosted database source (PostgREST-style HTTP API).
//!
//! Reads go to `GET {base_url}/rest/v1/{table}` with the ordering and
//! filtering from [`Collection::query_params`]. The service key is sent as
//! both the `apikey` header and a bearer token.

use async_trait::async_trait;
use chrono::Utc;
use serde_json::Value as JsonValue;
use std::time::Duration;

use kinder_core::{Collection, Record};

use super::key::BackendKey;
use super::{DataSource, SourceError};

/// Environment variable holding the backend base URL.
pub const KINDER_API_URL_ENV: &str = "KINDER_API_URL";

const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Source backed by the hosted database's REST endpoint.
#[derive(Debug)]
pub struct RestSource {
    base_url: String,
    key: BackendKey,
    client: reqwest::Client,
}

impl RestSource {
    /// Create from a JSON source config:
    ///
    /// ```json
    /// { "base_url": "https://db.example.com", "api_key": "..." }
    /// ```
    ///
    /// `base_url` falls back to `KINDER_API_URL`, `api_key` to `KINDER_API_KEY`.
    pub fn from_config(config: &JsonValue) -> Result<Self, SourceError> {
        let base_url = match config["base_url"].as_str() {
            Some(url) => url.to_string(),
            None => std::env::var(KINDER_API_URL_ENV).map_err(|_| {
                SourceError::NotConfigured(format!(
                    "backend URL missing: set 'base_url' in config or {}",
                    KINDER_API_URL_ENV
                ))
            })?,
        };
        let key = BackendKey::load(config)?;

        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| SourceError::NotConfigured(format!("HTTP client: {}", e)))?;

        tracing::debug!(base_url = %base_url, key = %key.origin(), "Configured REST source");

        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            key,
            client,
        })
    }

    fn endpoint(&self, collection: Collection) -> String {
        format!("{}/rest/v1/{}", self.base_url, collection.table())
    }
}

#[async_trait]
impl DataSource for RestSource {
    async fn fetch(&self, collection: Collection, limit: usize) -> Result<Vec<Record>, SourceError> {
        let params = collection.query_params(Utc::now(), limit);

        let response = self
            .client
            .get(self.endpoint(collection))
            .query(&params)
            .header("apikey", self.key.expose())
            .bearer_auth(self.key.expose())
            .header("accept", "application/json")
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    SourceError::Timeout(REQUEST_TIMEOUT)
                } else {
                    SourceError::Http(e.to_string())
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(SourceError::Backend {
                status: status.as_u16(),
                message,
            });
        }

        let rows: Vec<JsonValue> = response
            .json()
            .await
            .map_err(|e| SourceError::Decode(e.to_string()))?;

        Ok(collection.decode_rows(rows)?)
    }

    fn name(&self) -> &str {
        "rest"
    }
}
