//! The hosted database's service key.
//!
//! The key is read once, from the source config or `KINDER_API_KEY`, and
//! only leaves its [`SecretString`] when a request header is built.

use secrecy::{ExposeSecret, SecretString};
use serde_json::Value as JsonValue;
use std::fmt;

use super::SourceError;

/// Environment variable holding the backend service key.
pub const KINDER_API_KEY_ENV: &str = "KINDER_API_KEY";

/// Config key holding the backend service key.
const CONFIG_KEY: &str = "api_key";

/// Where the key came from. Logged instead of the key itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyOrigin {
    Config,
    Environment,
}

impl fmt::Display for KeyOrigin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KeyOrigin::Config => f.write_str("config"),
            KeyOrigin::Environment => f.write_str(KINDER_API_KEY_ENV),
        }
    }
}

/// Service key for the hosted database. Never printed.
pub struct BackendKey {
    secret: SecretString,
    origin: KeyOrigin,
}

impl BackendKey {
    /// Read `api_key` from `config`, else `KINDER_API_KEY`.
    ///
    /// An empty key counts as missing.
    pub fn load(config: &JsonValue) -> Result<Self, SourceError> {
        Self::load_from(config, KINDER_API_KEY_ENV)
    }

    fn load_from(config: &JsonValue, env_var: &str) -> Result<Self, SourceError> {
        let (value, origin) = match config[CONFIG_KEY].as_str() {
            Some(value) => (value.to_string(), KeyOrigin::Config),
            None => match std::env::var(env_var) {
                Ok(value) => (value, KeyOrigin::Environment),
                Err(_) => {
                    return Err(SourceError::NotConfigured(format!(
                        "backend key missing: set '{}' in config or {}",
                        CONFIG_KEY, env_var
                    )))
                }
            },
        };

        if value.trim().is_empty() {
            return Err(SourceError::NotConfigured(format!(
                "backend key from {} is empty",
                origin
            )));
        }

        Ok(Self {
            secret: SecretString::from(value),
            origin,
        })
    }

    /// The raw key, for the `apikey` and `Authorization` headers.
    pub fn expose(&self) -> &str {
        self.secret.expose_secret()
    }

    pub fn origin(&self) -> KeyOrigin {
        self.origin
    }
}

impl fmt::Debug for BackendKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "BackendKey({}, [REDACTED])", self.origin)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_key_from_config_is_redacted() {
        let key = BackendKey::load(&json!({ "api_key": "service-role-key" })).unwrap();
        assert_eq!(key.origin(), KeyOrigin::Config);
        assert_eq!(key.expose(), "service-role-key");
        assert!(!format!("{:?}", key).contains("service-role-key"));
    }

    #[test]
    fn test_key_falls_back_to_environment() {
        std::env::set_var("KINDER_TEST_KEY_FALLBACK", "from-env");
        let key = BackendKey::load_from(&json!({ "base_url": "https://db" }), "KINDER_TEST_KEY_FALLBACK")
            .unwrap();
        assert_eq!(key.origin(), KeyOrigin::Environment);
        assert_eq!(key.expose(), "from-env");
    }

    #[test]
    fn test_config_wins_over_environment() {
        std::env::set_var("KINDER_TEST_KEY_PRECEDENCE", "from-env");
        let key = BackendKey::load_from(&json!({ "api_key": "from-config" }), "KINDER_TEST_KEY_PRECEDENCE")
            .unwrap();
        assert_eq!(key.expose(), "from-config");
    }

    #[test]
    fn test_missing_or_blank_key_is_not_configured() {
        let missing = BackendKey::load_from(&json!({}), "KINDER_TEST_KEY_UNSET");
        assert!(matches!(missing, Err(SourceError::NotConfigured(_))));

        let blank = BackendKey::load(&json!({ "api_key": "  " }));
        assert!(matches!(blank, Err(SourceError::NotConfigured(_))));
    }
}
