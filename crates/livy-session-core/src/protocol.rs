//! Wire protocol for the Livy REST API.

use std::{collections::HashMap, fmt};

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

/// Status returned when a session or statement is created.
pub const STATUS_CREATED: u16 = 201;

/// Status returned when a session is deleted.
pub const STATUS_OK: u16 = 200;

/// Output status of a statement that ran to completion.
pub const OUTPUT_OK: &str = "ok";

/// Key of the plain-text payload in a statement's output data.
pub const TEXT_PLAIN: &str = "text/plain";

/// Remote session state.
///
/// Only `Idle`, `Starting` and `NotStarted` are meaningful while a session
/// is being initialized; everything else ends initialization.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(from = "String")]
pub enum SessionState {
    NotStarted,
    Starting,
    Idle,
    Busy,
    ShuttingDown,
    Error,
    Dead,
    Killed,
    Success,
    Recovering,
    /// State not known to this client.
    Unknown(String),
}

impl SessionState {
    /// Wire name of the state.
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::NotStarted => "not_started",
            Self::Starting => "starting",
            Self::Idle => "idle",
            Self::Busy => "busy",
            Self::ShuttingDown => "shutting_down",
            Self::Error => "error",
            Self::Dead => "dead",
            Self::Killed => "killed",
            Self::Success => "success",
            Self::Recovering => "recovering",
            Self::Unknown(s) => s,
        }
    }

    /// Whether the session is still coming up.
    #[must_use]
    pub const fn is_starting(&self) -> bool {
        matches!(self, Self::NotStarted | Self::Starting)
    }
}

impl From<String> for SessionState {
    fn from(s: String) -> Self {
        match s.as_str() {
            "not_started" => Self::NotStarted,
            "starting" => Self::Starting,
            "idle" => Self::Idle,
            "busy" => Self::Busy,
            "shutting_down" => Self::ShuttingDown,
            "error" => Self::Error,
            "dead" => Self::Dead,
            "killed" => Self::Killed,
            "success" => Self::Success,
            "recovering" => Self::Recovering,
            _ => Self::Unknown(s),
        }
    }
}

impl From<&str> for SessionState {
    fn from(s: &str) -> Self {
        Self::from(s.to_owned())
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Remote statement state.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(from = "String")]
pub enum StatementState {
    Waiting,
    Running,
    Available,
    Error,
    Cancelling,
    Cancelled,
    /// State not known to this client.
    Unknown(String),
}

impl StatementState {
    /// Wire name of the state.
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::Waiting => "waiting",
            Self::Running => "running",
            Self::Available => "available",
            Self::Error => "error",
            Self::Cancelling => "cancelling",
            Self::Cancelled => "cancelled",
            Self::Unknown(s) => s,
        }
    }

    /// Whether the statement is still executing.
    #[must_use]
    pub const fn is_executing(&self) -> bool {
        matches!(self, Self::Waiting | Self::Running)
    }
}

impl From<String> for StatementState {
    fn from(s: String) -> Self {
        match s.as_str() {
            "waiting" => Self::Waiting,
            "running" => Self::Running,
            "available" => Self::Available,
            "error" => Self::Error,
            "cancelling" => Self::Cancelling,
            "cancelled" => Self::Cancelled,
            _ => Self::Unknown(s),
        }
    }
}

impl From<&str> for StatementState {
    fn from(s: &str) -> Self {
        Self::from(s.to_owned())
    }
}

impl fmt::Display for StatementState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Body of `POST /sessions`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateSessionRequest<'a> {
    pub kind: &'a str,
    pub proxy_user: &'a str,
    pub jars: &'a [String],
    pub conf: &'a HashMap<String, Value>,
}

/// Body of `POST /sessions/{id}/statements`.
#[derive(Debug, Clone, Serialize)]
pub struct StatementRequest<'a> {
    pub code: &'a str,
}

/// Response to a creation request. Only the assigned id is used.
#[derive(Debug, Clone, Deserialize)]
pub struct Created {
    #[serde(deserialize_with = "deserialize_id")]
    pub id: String,
}

/// Response of `GET /sessions/{id}`.
#[derive(Debug, Clone, Deserialize)]
pub struct SessionInfo {
    pub state: SessionState,
}

/// Response of `GET /sessions/{id}/statements/{statement_id}`.
#[derive(Debug, Clone, Deserialize)]
pub struct StatementInfo {
    pub state: StatementState,
    #[serde(default)]
    pub output: Option<StatementOutput>,
}

/// Execution result attached to an available statement.
#[derive(Debug, Clone, Deserialize)]
pub struct StatementOutput {
    pub status: String,
    #[serde(default)]
    pub data: Map<String, Value>,
    #[serde(default)]
    pub ename: Option<String>,
    #[serde(default)]
    pub evalue: Option<String>,
}

impl StatementOutput {
    /// Whether the code ran without raising.
    #[must_use]
    pub fn is_ok(&self) -> bool {
        self.status == OUTPUT_OK
    }

    /// The `text/plain` payload, if present and a string.
    #[must_use]
    pub fn plain_text(&self) -> Option<&str> {
        self.data.get(TEXT_PLAIN).and_then(Value::as_str)
    }

    /// Human-readable description of a failed execution.
    #[must_use]
    pub fn failure_reason(&self) -> String {
        match (&self.ename, &self.evalue) {
            (Some(name), Some(value)) => format!("{name}: {value}"),
            (Some(name), None) => name.clone(),
            (None, Some(value)) => value.clone(),
            (None, None) => format!("output status '{}'", self.status),
        }
    }
}

/// Accept ids sent either as JSON numbers or strings.
fn deserialize_id<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    match Value::deserialize(deserializer)? {
        Value::String(s) => Ok(s),
        Value::Number(n) => Ok(n.to_string()),
        other => Err(serde::de::Error::custom(format!(
            "expected a string or number id, got {other}"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_numeric_and_string_ids() {
        let numeric: Created = serde_json::from_value(json!({"id": 0, "state": "starting"})).unwrap();
        assert_eq!(numeric.id, "0");

        let string: Created = serde_json::from_value(json!({"id": "abc"})).unwrap();
        assert_eq!(string.id, "abc");
    }

    #[test]
    fn test_missing_id_is_rejected() {
        assert!(serde_json::from_value::<Created>(json!({"state": "starting"})).is_err());
        assert!(serde_json::from_value::<Created>(json!({"id": null})).is_err());
    }

    #[test]
    fn test_session_state_parsing() {
        let info: SessionInfo = serde_json::from_value(json!({"id": 3, "state": "not_started"})).unwrap();
        assert_eq!(info.state, SessionState::NotStarted);
        assert!(info.state.is_starting());

        assert_eq!(SessionState::from("shutting_down"), SessionState::ShuttingDown);
        assert_eq!(
            SessionState::from("exploded"),
            SessionState::Unknown("exploded".to_string())
        );
        assert_eq!(SessionState::from("exploded").to_string(), "exploded");
        assert!(!SessionState::Idle.is_starting());
    }

    #[test]
    fn test_statement_info_with_output() {
        let info: StatementInfo = serde_json::from_value(json!({
            "id": 5,
            "code": "1+1",
            "state": "available",
            "output": {
                "status": "ok",
                "execution_count": 5,
                "data": {"text/plain": "res0: Int = 2"}
            }
        }))
        .unwrap();

        assert_eq!(info.state, StatementState::Available);
        let output = info.output.unwrap();
        assert!(output.is_ok());
        assert_eq!(output.plain_text(), Some("res0: Int = 2"));
    }

    #[test]
    fn test_failure_reason_prefers_ename_and_evalue() {
        let output: StatementOutput = serde_json::from_value(json!({
            "status": "error",
            "ename": "NameError",
            "evalue": "name 'x' is not defined",
            "traceback": []
        }))
        .unwrap();

        assert!(!output.is_ok());
        assert_eq!(output.failure_reason(), "NameError: name 'x' is not defined");

        let bare: StatementOutput = serde_json::from_value(json!({"status": "aborted"})).unwrap();
        assert_eq!(bare.failure_reason(), "output status 'aborted'");
    }

    #[test]
    fn test_create_request_uses_camel_case() {
        let jars = vec!["hdfs:///libs/a.jar".to_string()];
        let conf = HashMap::from([("spark.executor.memory".to_string(), json!("2g"))]);
        let body = serde_json::to_value(CreateSessionRequest {
            kind: "spark",
            proxy_user: "hadoop",
            jars: &jars,
            conf: &conf,
        })
        .unwrap();

        assert_eq!(
            body,
            json!({
                "kind": "spark",
                "proxyUser": "hadoop",
                "jars": ["hdfs:///libs/a.jar"],
                "conf": {"spark.executor.memory": "2g"}
            })
        );
    }
}
