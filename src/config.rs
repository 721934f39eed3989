//! Connection settings for direct seeding

use crate::error::ConfigError;
use std::fmt;

pub const URL_VAR: &str = "SUPABASE_URL";
pub const KEY_VAR: &str = "SUPABASE_SERVICE_ROLE_KEY";

/// Where direct upserts go and how they authenticate
#[derive(Clone, PartialEq, Eq)]
pub struct ConnectionConfig {
    pub base_url: String,
    pub service_key: String,
}

impl ConnectionConfig {
    /// Read the connection from the environment, after loading `.env` if
    /// one exists
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let required = |var: &'static str| {
            lookup(var)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
                .ok_or(ConfigError::Missing(var))
        };

        Ok(ConnectionConfig {
            base_url: required(URL_VAR)?,
            service_key: required(KEY_VAR)?,
        })
    }
}

impl fmt::Debug for ConnectionConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionConfig")
            .field("base_url", &self.base_url)
            .field("service_key", &"<redacted>")
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |var| vars.get(var).cloned()
    }

    #[test]
    fn test_reads_both_vars() {
        let config = ConnectionConfig::from_lookup(lookup(&[
            (URL_VAR, "https://abc.supabase.co"),
            (KEY_VAR, "service-key"),
        ]))
        .unwrap();
        assert_eq!(config.base_url, "https://abc.supabase.co");
        assert_eq!(config.service_key, "service-key");
    }

    #[test]
    fn test_missing_or_empty_is_an_error() {
        let err = ConnectionConfig::from_lookup(lookup(&[(KEY_VAR, "k")])).unwrap_err();
        assert!(matches!(err, ConfigError::Missing(URL_VAR)));

        let err = ConnectionConfig::from_lookup(lookup(&[(URL_VAR, "https://x"), (KEY_VAR, "  ")]))
            .unwrap_err();
        assert!(matches!(err, ConfigError::Missing(KEY_VAR)));
    }

    #[test]
    fn test_debug_hides_key() {
        let config = ConnectionConfig {
            base_url: "https://x".to_string(),
            service_key: "top-secret".to_string(),
        };
        let shown = format!("{:?}", config);
        assert!(shown.contains("https://x"));
        assert!(!shown.contains("top-secret"));
    }
}
