//! Error taxonomy for the session lifecycle.

use thiserror::Error;

use crate::{protocol::SessionState, traits::TransportError};

/// Error raised by any session or statement operation.
///
/// The first five variants follow the remote phase that failed. Every error
/// is returned to the caller as soon as it is observed.
#[derive(Debug, Error)]
pub enum LivyError {
    #[error("Livy error: session creation failed with status code {status}")]
    SessionCreation { status: u16 },
    /// `state` is `None` when the status poll was rejected or its body
    /// carried no state.
    #[error(
        "Livy error: session {session_id} failed to initialize (status code {status}, state: {})",
        .state.as_ref().map_or("none", SessionState::as_str)
    )]
    SessionInitialization {
        session_id: String,
        status: u16,
        state: Option<SessionState>,
    },
    #[error("Livy error: session status query failed with status code {status}")]
    SessionQuery { status: u16 },
    #[error("Livy error: session removal failed with status code {status}")]
    SessionRemoval { status: u16 },
    #[error("Livy error: statement submission failed with status code {status}")]
    StatementSubmission { status: u16 },
    #[error("Livy error: statement {statement_id} execution failed: {reason}")]
    StatementExecution {
        statement_id: String,
        reason: String,
    },
    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),
    #[error("Malformed response: {0}")]
    Decode(#[from] serde_json::Error),
    #[error("Invalid configuration: {0}")]
    Config(String),
}

impl LivyError {
    /// Build a statement execution error.
    #[must_use]
    pub fn statement_failed(statement_id: &str, reason: impl Into<String>) -> Self {
        Self::StatementExecution {
            statement_id: statement_id.to_owned(),
            reason: reason.into(),
        }
    }
}
