//! Session configuration.

use std::{collections::HashMap, time::Duration};

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{LivyError, protocol::CreateSessionRequest};

/// Session kind requested when none is configured.
pub const DEFAULT_KIND: &str = "spark";

/// Proxy user requested when none is configured.
pub const DEFAULT_PROXY_USER: &str = "hadoop";

/// Fixed wait between two status polls.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(15);

/// Everything needed to open one interactive session.
///
/// `conf` holds Spark/Hadoop/YARN properties and is passed through to the
/// service untouched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionConfig {
    /// Base URL of the Livy server, e.g. `http://cluster:8998`.
    pub endpoint: String,

    /// Session kind (`spark`, `pyspark`, `sparkr`, `sql`).
    #[serde(default = "default_kind")]
    pub kind: String,

    /// User the session is started as.
    #[serde(default = "default_proxy_user")]
    pub proxy_user: String,

    /// Properties attached to the session.
    #[serde(default)]
    pub conf: HashMap<String, Value>,

    /// Libraries added to the session, in order.
    #[serde(default)]
    pub jars: Vec<String>,

    /// Wait between two status polls, in whole seconds on the wire.
    #[serde(default = "default_poll_interval", with = "duration_secs")]
    pub poll_interval: Duration,
}

fn default_kind() -> String {
    DEFAULT_KIND.to_owned()
}

fn default_proxy_user() -> String {
    DEFAULT_PROXY_USER.to_owned()
}

const fn default_poll_interval() -> Duration {
    DEFAULT_POLL_INTERVAL
}

impl SessionConfig {
    /// Create a configuration with defaults for everything but the endpoint.
    #[must_use]
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            kind: default_kind(),
            proxy_user: default_proxy_user(),
            conf: HashMap::new(),
            jars: Vec::new(),
            poll_interval: DEFAULT_POLL_INTERVAL,
        }
    }

    /// Set the session kind.
    #[must_use]
    pub fn with_kind(mut self, kind: impl Into<String>) -> Self {
        self.kind = kind.into();
        self
    }

    /// Set the proxy user.
    #[must_use]
    pub fn with_proxy_user(mut self, proxy_user: impl Into<String>) -> Self {
        self.proxy_user = proxy_user.into();
        self
    }

    /// Replace the session properties.
    #[must_use]
    pub fn with_conf(mut self, conf: HashMap<String, Value>) -> Self {
        self.conf = conf;
        self
    }

    /// Replace the jar list.
    #[must_use]
    pub fn with_jars<I>(mut self, jars: I) -> Self
    where
        I: IntoIterator,
        I::Item: Into<String>,
    {
        self.jars = jars.into_iter().map(Into::into).collect();
        self
    }

    /// Set the poll interval.
    #[must_use]
    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }

    /// Get a session property by key.
    #[must_use]
    pub fn get_conf(&self, key: &str) -> Option<&Value> {
        self.conf.get(key)
    }

    /// Set a session property.
    pub fn set_conf(&mut self, key: impl Into<String>, value: Value) {
        self.conf.insert(key.into(), value);
    }

    /// Append a jar.
    pub fn add_jar(&mut self, jar: impl Into<String>) {
        self.jars.push(jar.into());
    }

    /// Check that the configuration can be used to open a session.
    ///
    /// # Errors
    /// Returns error if the endpoint is empty.
    pub fn validate(&self) -> Result<(), LivyError> {
        if self.base_url().is_empty() {
            return Err(LivyError::Config("endpoint must not be empty".to_string()));
        }
        Ok(())
    }

    /// Body of the session creation request.
    #[must_use]
    pub fn create_request(&self) -> CreateSessionRequest<'_> {
        CreateSessionRequest {
            kind: &self.kind,
            proxy_user: &self.proxy_user,
            jars: &self.jars,
            conf: &self.conf,
        }
    }

    /// `{endpoint}/sessions`
    #[must_use]
    pub fn sessions_url(&self) -> String {
        format!("{}/sessions", self.base_url())
    }

    /// `{endpoint}/sessions/{session_id}`
    #[must_use]
    pub fn session_url(&self, session_id: &str) -> String {
        format!("{}/sessions/{session_id}", self.base_url())
    }

    /// `{endpoint}/sessions/{session_id}/statements`
    #[must_use]
    pub fn statements_url(&self, session_id: &str) -> String {
        format!("{}/sessions/{session_id}/statements", self.base_url())
    }

    /// `{endpoint}/sessions/{session_id}/statements/{statement_id}`
    #[must_use]
    pub fn statement_url(&self, session_id: &str, statement_id: &str) -> String {
        format!(
            "{}/sessions/{session_id}/statements/{statement_id}",
            self.base_url()
        )
    }

    fn base_url(&self) -> &str {
        self.endpoint.trim().trim_end_matches('/')
    }
}

mod duration_secs {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(duration.as_secs())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        u64::deserialize(deserializer).map(Duration::from_secs)
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_defaults_from_minimal_json() {
        let config: SessionConfig =
            serde_json::from_value(json!({"endpoint": "http://livy:8998"})).unwrap();

        assert_eq!(config, SessionConfig::new("http://livy:8998"));
        assert_eq!(config.kind, "spark");
        assert_eq!(config.proxy_user, "hadoop");
        assert_eq!(config.poll_interval, Duration::from_secs(15));
        assert!(config.conf.is_empty());
        assert!(config.jars.is_empty());
    }

    #[test]
    fn test_full_json() {
        let config: SessionConfig = serde_json::from_value(json!({
            "endpoint": "http://livy:8998",
            "kind": "pyspark",
            "proxyUser": "etl",
            "conf": {"spark.executor.cores": 4},
            "jars": ["a.jar", "b.jar"],
            "pollInterval": 2
        }))
        .unwrap();

        assert_eq!(config.kind, "pyspark");
        assert_eq!(config.proxy_user, "etl");
        assert_eq!(config.get_conf("spark.executor.cores"), Some(&json!(4)));
        assert_eq!(config.jars, vec!["a.jar", "b.jar"]);
        assert_eq!(config.poll_interval, Duration::from_secs(2));
    }

    #[test]
    fn test_urls_ignore_trailing_slash() {
        let config = SessionConfig::new("http://livy:8998/");

        assert_eq!(config.sessions_url(), "http://livy:8998/sessions");
        assert_eq!(config.session_url("7"), "http://livy:8998/sessions/7");
        assert_eq!(
            config.statements_url("7"),
            "http://livy:8998/sessions/7/statements"
        );
        assert_eq!(
            config.statement_url("7", "3"),
            "http://livy:8998/sessions/7/statements/3"
        );
    }

    #[test]
    fn test_validate_rejects_blank_endpoint() {
        assert!(matches!(
            SessionConfig::new("  ").validate(),
            Err(LivyError::Config(_))
        ));
        assert!(SessionConfig::new("http://livy:8998").validate().is_ok());
    }

    #[test]
    fn test_builder_and_mutators() {
        let mut config = SessionConfig::new("http://livy:8998")
            .with_kind("sql")
            .with_proxy_user("analyst")
            .with_jars(["one.jar"])
            .with_poll_interval(Duration::from_secs(1));
        config.add_jar("two.jar");
        config.set_conf("spark.app.name", json!("report"));

        assert_eq!(config.kind, "sql");
        assert_eq!(config.proxy_user, "analyst");
        assert_eq!(config.jars, vec!["one.jar", "two.jar"]);
        assert_eq!(config.get_conf("spark.app.name"), Some(&json!("report")));
        assert_eq!(config.poll_interval, Duration::from_secs(1));
    }
}
