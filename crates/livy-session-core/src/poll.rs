//! Fixed-interval polling of remote operations.
//!
//! Session startup and statement execution are both asynchronous on the
//! service side. Each is observed through a pure step function that maps the
//! latest reported state to a [`PollOutcome`], and [`drive`] repeats
//! fetch-then-step with a fixed wait until the outcome is terminal.
//! There is no backoff and no attempt limit.

use std::{future::Future, time::Duration};

use crate::{
    LivyError,
    protocol::{STATUS_OK, SessionInfo, SessionState, StatementInfo, StatementState},
    traits::{HttpResponse, Sleeper},
};

/// Result of inspecting one reported state.
#[derive(Debug)]
pub enum PollOutcome<T> {
    /// Still in progress; wait and poll again.
    Continue,
    /// Finished successfully.
    Done(T),
    /// Finished with a terminal failure.
    Failed(LivyError),
}

impl<T> PollOutcome<T> {
    /// Whether no further polling is needed.
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        !matches!(self, Self::Continue)
    }
}

/// Step for a session being initialized, given one status poll response.
///
/// `idle` yields the session id, `starting`/`not_started` continue. A
/// rejected poll, a body without a state and any other state are terminal
/// initialization failures.
#[must_use]
pub fn session_step(session_id: &str, response: &HttpResponse) -> PollOutcome<String> {
    let state = if response.status == STATUS_OK {
        response.json::<SessionInfo>().ok().map(|info| info.state)
    } else {
        None
    };

    match state {
        Some(state) if state.is_starting() => PollOutcome::Continue,
        Some(SessionState::Idle) => PollOutcome::Done(session_id.to_owned()),
        state => PollOutcome::Failed(LivyError::SessionInitialization {
            session_id: session_id.to_owned(),
            status: response.status,
            state,
        }),
    }
}

/// Step for a submitted statement, given one status poll response.
///
/// `waiting`/`running` continue. `available` with an `ok` output yields the
/// `text/plain` payload unchanged. A rejected poll, `error`, a non-ok output
/// and any state this client does not know are terminal failures.
#[must_use]
pub fn statement_step(statement_id: &str, response: &HttpResponse) -> PollOutcome<String> {
    if response.status != STATUS_OK {
        return PollOutcome::Failed(LivyError::statement_failed(
            statement_id,
            format!("status poll failed with status code {}", response.status),
        ));
    }
    match response.json::<StatementInfo>() {
        Ok(info) => statement_outcome(statement_id, info),
        Err(e) => PollOutcome::Failed(e.into()),
    }
}

fn statement_outcome(statement_id: &str, info: StatementInfo) -> PollOutcome<String> {
    match info.state {
        state if state.is_executing() => PollOutcome::Continue,
        StatementState::Available => match info.output {
            Some(output) if output.is_ok() => match output.plain_text() {
                Some(text) => PollOutcome::Done(text.to_owned()),
                None => PollOutcome::Failed(LivyError::statement_failed(
                    statement_id,
                    "missing text/plain output",
                )),
            },
            Some(output) => PollOutcome::Failed(LivyError::statement_failed(
                statement_id,
                output.failure_reason(),
            )),
            None => PollOutcome::Failed(LivyError::statement_failed(
                statement_id,
                "statement is available but reported no output",
            )),
        },
        StatementState::Error => {
            let reason = info.output.map_or_else(
                || "statement reached state 'error'".to_string(),
                |output| output.failure_reason(),
            );
            PollOutcome::Failed(LivyError::statement_failed(statement_id, reason))
        }
        state => PollOutcome::Failed(LivyError::statement_failed(
            statement_id,
            format!("unexpected statement state '{state}'"),
        )),
    }
}

/// Run `poll` until it reports a terminal outcome, sleeping `interval`
/// between attempts.
///
/// # Errors
/// Returns the failure reported by `poll`, or any error it raises while
/// fetching.
pub async fn drive<T, S, F, Fut>(sleeper: &S, interval: Duration, mut poll: F) -> Result<T, LivyError>
where
    S: Sleeper + ?Sized,
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<PollOutcome<T>, LivyError>>,
{
    let mut attempt: u64 = 0;
    loop {
        attempt += 1;
        match poll().await? {
            PollOutcome::Done(value) => return Ok(value),
            PollOutcome::Failed(e) => return Err(e),
            PollOutcome::Continue => {
                tracing::trace!(attempt, ?interval, "Remote operation in progress");
                sleeper.sleep(interval).await;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::VecDeque;

    use serde_json::json;
    use tokio_test::{assert_err, assert_ok};

    use super::*;
    use crate::mock::RecordingSleeper;

    fn session(state: &str) -> HttpResponse {
        HttpResponse::new(200, json!({"id": 0, "state": state}))
    }

    fn statement(body: serde_json::Value) -> HttpResponse {
        HttpResponse::new(200, body)
    }

    #[test]
    fn test_session_in_progress_states_continue() {
        for state in ["starting", "not_started"] {
            assert!(matches!(
                session_step("0", &session(state)),
                PollOutcome::Continue
            ));
        }
    }

    #[test]
    fn test_session_idle_is_done() {
        match session_step("42", &session("idle")) {
            PollOutcome::Done(id) => assert_eq!(id, "42"),
            other => panic!("unexpected outcome: {other:?}"),
        }
    }

    #[test]
    fn test_session_other_states_fail() {
        for state in ["error", "dead", "killed", "busy", "shutting_down", "success", "bogus"] {
            match session_step("1", &session(state)) {
                PollOutcome::Failed(LivyError::SessionInitialization {
                    session_id,
                    status,
                    state: seen,
                }) => {
                    assert_eq!(session_id, "1");
                    assert_eq!(status, 200);
                    assert_eq!(seen, Some(SessionState::from(state)));
                }
                other => panic!("state {state}: unexpected outcome {other:?}"),
            }
        }
    }

    #[test]
    fn test_session_rejected_poll_fails_with_status() {
        let response = HttpResponse::new(404, json!({"msg": "Session '0' not found."}));
        match session_step("0", &response) {
            PollOutcome::Failed(e @ LivyError::SessionInitialization { status: 404, state: None, .. }) => {
                assert!(e.to_string().contains("status code 404"));
            }
            other => panic!("unexpected outcome: {other:?}"),
        }
    }

    #[test]
    fn test_session_body_without_state_fails() {
        let response = HttpResponse::new(200, json!({"id": 0}));
        assert!(matches!(
            session_step("0", &response),
            PollOutcome::Failed(LivyError::SessionInitialization { status: 200, state: None, .. })
        ));
    }

    #[test]
    fn test_statement_in_progress_states_continue() {
        for state in ["waiting", "running"] {
            let outcome = statement_step("5", &statement(json!({"state": state})));
            assert!(matches!(outcome, PollOutcome::Continue));
            assert!(!outcome.is_terminal());
        }
    }

    #[test]
    fn test_statement_ok_returns_text_unchanged() {
        let text = "  res0: Int = 2\n";
        let outcome = statement_step(
            "5",
            &statement(json!({
                "state": "available",
                "output": {"status": "ok", "data": {"text/plain": text}}
            })),
        );
        match outcome {
            PollOutcome::Done(out) => assert_eq!(out, text),
            other => panic!("unexpected outcome: {other:?}"),
        }
    }

    #[test]
    fn test_statement_failures() {
        let cases = [
            json!({"state": "error"}),
            json!({"state": "available", "output": {"status": "error", "ename": "E", "evalue": "v"}}),
            json!({"state": "available"}),
            json!({"state": "available", "output": {"status": "ok", "data": {}}}),
            json!({"state": "cancelled"}),
            json!({"state": "something_new"}),
        ];
        for body in cases {
            match statement_step("9", &statement(body.clone())) {
                PollOutcome::Failed(LivyError::StatementExecution { statement_id, .. }) => {
                    assert_eq!(statement_id, "9");
                }
                other => panic!("{body}: unexpected outcome {other:?}"),
            }
        }
    }

    #[test]
    fn test_statement_rejected_poll_carries_status() {
        let response = HttpResponse::new(500, json!({"msg": "internal"}));
        match statement_step("4", &response) {
            PollOutcome::Failed(e @ LivyError::StatementExecution { .. }) => {
                assert!(e.to_string().contains("status code 500"));
            }
            other => panic!("unexpected outcome: {other:?}"),
        }
    }

    #[test]
    fn test_statement_body_without_state_is_malformed() {
        assert!(matches!(
            statement_step("4", &statement(json!({"id": 4}))),
            PollOutcome::Failed(LivyError::Decode(_))
        ));
    }

    #[test]
    fn test_statement_error_reason_from_output() {
        let outcome = statement_step(
            "2",
            &statement(json!({
                "state": "available",
                "output": {"status": "error", "ename": "NameError", "evalue": "x"}
            })),
        );
        match outcome {
            PollOutcome::Failed(e) => assert!(e.to_string().contains("NameError: x")),
            other => panic!("unexpected outcome: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_drive_sleeps_between_polls() {
        let sleeper = RecordingSleeper::new();
        let mut outcomes: VecDeque<PollOutcome<u32>> =
            VecDeque::from([PollOutcome::Continue, PollOutcome::Continue, PollOutcome::Done(7)]);

        let value = assert_ok!(
            drive(&sleeper, Duration::from_secs(15), || {
                let next = outcomes.pop_front().unwrap();
                async move { Ok::<_, LivyError>(next) }
            })
            .await
        );

        assert_eq!(value, 7);
        assert_eq!(sleeper.naps(), vec![Duration::from_secs(15); 2]);
    }

    #[tokio::test]
    async fn test_drive_stops_on_failure_without_sleeping() {
        let sleeper = RecordingSleeper::new();

        let err = assert_err!(
            drive::<(), _, _, _>(&sleeper, Duration::from_secs(1), || async {
                Ok::<_, LivyError>(PollOutcome::Failed(LivyError::Config("boom".into())))
            })
            .await
        );

        assert!(matches!(err, LivyError::Config(_)));
        assert!(sleeper.naps().is_empty());
    }
}
