//! Configuration module for the Cloudify datasource.
//!
//! Loads configuration from environment variables with sensible defaults.
//! The same struct deserializes from a datasource JSON object.

use std::env;
use std::time::Duration;

use serde::Deserialize;

use crate::client::RetryPolicy;

/// Datasource configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DatasourceConfig {
    /// Datasource name (default: "cloudify")
    pub name: String,
    /// Backend base URLs, used round-robin
    pub urls: Vec<String>,
    /// Pre-computed `Authorization` header value, e.g. `Basic dXNlcjpwYXNz`
    pub basic_auth: Option<String>,
    /// Route dashboard id namespacing stored dashboards
    pub dashboard_id: Option<String>,
    /// Path to the SQLite key-value store (default: "cloudify.db")
    pub db_path: String,
    /// Give up after this many attempts; `None` retries forever
    pub max_retries: Option<u32>,
    /// Per-request HTTP timeout in seconds (default: 30)
    pub request_timeout_secs: u64,
}

impl Default for DatasourceConfig {
    fn default() -> Self {
        Self {
            name: "cloudify".to_string(),
            urls: vec!["http://localhost:8086/db/cloudify".to_string()],
            basic_auth: None,
            dashboard_id: None,
            db_path: "cloudify.db".to_string(),
            max_retries: None,
            request_timeout_secs: 30,
        }
    }
}

impl DatasourceConfig {
    /// Load configuration from environment variables.
    ///
    /// Environment variables:
    /// - `CLOUDIFY_URLS`: comma-separated backend URLs
    /// - `CLOUDIFY_NAME`: datasource name
    /// - `CLOUDIFY_BASIC_AUTH`: `Authorization` header value
    /// - `CLOUDIFY_DASHBOARD_ID`: dashboard id from the active route
    /// - `CLOUDIFY_DB_PATH`: key-value store path (default: "cloudify.db")
    /// - `CLOUDIFY_MAX_RETRIES`: attempt cap (unset: unbounded)
    /// - `CLOUDIFY_REQUEST_TIMEOUT_SECS`: HTTP timeout (default: 30)
    pub fn load() -> Self {
        let mut cfg = Self::default();

        if let Ok(urls) = env::var("CLOUDIFY_URLS") {
            let urls = parse_url_list(&urls);
            if !urls.is_empty() {
                cfg.urls = urls;
            }
        }

        if let Ok(name) = env::var("CLOUDIFY_NAME") {
            cfg.name = name;
        }

        if let Ok(auth) = env::var("CLOUDIFY_BASIC_AUTH") {
            if !auth.is_empty() {
                cfg.basic_auth = Some(auth);
            }
        }

        if let Ok(id) = env::var("CLOUDIFY_DASHBOARD_ID") {
            if !id.is_empty() {
                cfg.dashboard_id = Some(id);
            }
        }

        if let Ok(db_path) = env::var("CLOUDIFY_DB_PATH") {
            cfg.db_path = db_path;
        }

        if let Ok(retries) = env::var("CLOUDIFY_MAX_RETRIES") {
            if let Ok(retries) = retries.parse() {
                cfg.max_retries = Some(retries);
            }
        }

        if let Ok(timeout) = env::var("CLOUDIFY_REQUEST_TIMEOUT_SECS") {
            if let Ok(timeout) = timeout.parse() {
                cfg.request_timeout_secs = timeout;
            }
        }

        cfg
    }

    /// Retry policy derived from `max_retries`.
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_attempts: self.max_retries,
            ..RetryPolicy::default()
        }
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

fn parse_url_list(s: &str) -> Vec<String> {
    s.split(',')
        .map(|u| u.trim().trim_end_matches('/'))
        .filter(|u| !u.is_empty())
        .map(String::from)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let cfg = DatasourceConfig::default();
        assert_eq!(cfg.name, "cloudify");
        assert_eq!(cfg.urls.len(), 1);
        assert_eq!(cfg.db_path, "cloudify.db");
        assert!(cfg.retry_policy().max_attempts.is_none());
    }

    #[test]
    fn test_parse_url_list() {
        let urls = parse_url_list(" http://a:8086/ , ,http://b:8086");
        assert_eq!(urls, vec!["http://a:8086", "http://b:8086"]);
    }

    #[test]
    fn test_deserialize_datasource_object() {
        let cfg: DatasourceConfig = serde_json::from_str(
            r#"{"name": "metrics", "urls": ["http://a", "http://b"], "max_retries": 3}"#,
        )
        .unwrap();
        assert_eq!(cfg.name, "metrics");
        assert_eq!(cfg.urls, vec!["http://a", "http://b"]);
        assert_eq!(cfg.retry_policy().max_attempts, Some(3));
        assert_eq!(cfg.request_timeout_secs, 30);
    }
}
