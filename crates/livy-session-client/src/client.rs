//! Livy interactive session client.

use livy_session_core::{
    LivyError, SessionConfig, SessionState,
    poll::{self, PollOutcome},
    protocol::{Created, STATUS_CREATED, STATUS_OK, SessionInfo, StatementRequest},
    traits::{HttpRequest, Sleeper, TokioSleeper, Transport},
};

/// Client owning exactly one remote interactive session.
///
/// Construction creates the session and waits until it is idle, so a
/// client value always refers to a ready session. Statements are executed
/// one at a time: [`LivyClient::submit_statement`] returns only once the
/// statement has finished.
#[derive(Debug)]
pub struct LivyClient<T, S = TokioSleeper>
where
    T: Transport,
    S: Sleeper,
{
    transport: T,
    sleeper: S,
    config: SessionConfig,
    session_id: String,
}

impl<T> LivyClient<T, TokioSleeper>
where
    T: Transport,
{
    /// Create a session and wait until it is ready.
    ///
    /// # Errors
    /// Returns `SessionCreation` if the service rejects the request,
    /// `SessionInitialization` if the session ends up in a failed state, or
    /// a transport/decode error.
    pub async fn connect(transport: T, config: SessionConfig) -> Result<Self, LivyError> {
        Self::connect_with_sleeper(transport, TokioSleeper, config).await
    }
}

impl<T, S> LivyClient<T, S>
where
    T: Transport,
    S: Sleeper,
{
    /// Create a session using `sleeper` to wait between polls.
    ///
    /// # Errors
    /// Same as [`LivyClient::connect`], plus `Config` for an empty endpoint.
    pub async fn connect_with_sleeper(
        transport: T,
        sleeper: S,
        config: SessionConfig,
    ) -> Result<Self, LivyError> {
        config.validate()?;
        let session_id = create_session(&transport, &sleeper, &config).await?;
        Ok(Self {
            transport,
            sleeper,
            config,
            session_id,
        })
    }

    /// Identifier assigned to the session by the service.
    #[must_use]
    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    /// Configuration the session was created with.
    #[must_use]
    pub const fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// Current state of the session as reported by the service.
    ///
    /// # Errors
    /// Returns `SessionQuery` with the status code unless the service answers
    /// 200, or a transport/decode error.
    pub async fn session_state(&self) -> Result<SessionState, LivyError> {
        let response = self
            .transport
            .send(HttpRequest::get(self.config.session_url(&self.session_id)))
            .await?;
        if response.status != STATUS_OK {
            return Err(LivyError::SessionQuery {
                status: response.status,
            });
        }
        Ok(response.json::<SessionInfo>()?.state)
    }

    /// Kill the session.
    ///
    /// Calling this again, or after the service dropped the session, is
    /// expected to fail.
    ///
    /// # Errors
    /// Returns `SessionRemoval` with the status code unless the service
    /// answers 200.
    pub async fn remove_session(&self) -> Result<(), LivyError> {
        delete_session(&self.transport, &self.config, &self.session_id).await
    }

    /// Run `code` in the session and return its plain-text output.
    ///
    /// `code` may span several lines. The call waits until the statement
    /// has finished.
    ///
    /// # Errors
    /// Returns `StatementSubmission` with the status code unless the service
    /// answers 201, `StatementExecution` if the statement fails, or a
    /// transport/decode error.
    pub async fn submit_statement(&self, code: &str) -> Result<String, LivyError> {
        let body = serde_json::to_value(StatementRequest { code })?;
        let response = self
            .transport
            .send(HttpRequest::post(
                self.config.statements_url(&self.session_id),
                body,
            ))
            .await?;

        if response.status != STATUS_CREATED {
            return Err(LivyError::StatementSubmission {
                status: response.status,
            });
        }

        let statement_id = response.json::<Created>()?.id;
        tracing::debug!(session_id = %self.session_id, %statement_id, "Statement submitted");
        self.get_output(&statement_id).await
    }

    /// Wait for a submitted statement to finish and return its output.
    ///
    /// # Errors
    /// Returns `StatementExecution` if the statement fails or ends in a
    /// state this client does not know, or a transport/decode error.
    pub async fn get_output(&self, statement_id: &str) -> Result<String, LivyError> {
        let url = self.config.statement_url(&self.session_id, statement_id);
        let url = url.as_str();
        let transport = &self.transport;
        poll::drive(&self.sleeper, self.config.poll_interval, move || async move {
            let response = transport.send(HttpRequest::get(url)).await?;
            tracing::debug!(%statement_id, status = response.status, "Polled statement");
            Ok::<_, LivyError>(poll::statement_step(statement_id, &response))
        })
        .await
    }
}

/// Create the session and poll until it is idle.
async fn create_session<T, S>(
    transport: &T,
    sleeper: &S,
    config: &SessionConfig,
) -> Result<String, LivyError>
where
    T: Transport,
    S: Sleeper,
{
    let body = serde_json::to_value(config.create_request())?;
    let response = transport
        .send(HttpRequest::post(config.sessions_url(), body))
        .await?;

    if response.status != STATUS_CREATED {
        tracing::warn!(status = response.status, "Session creation rejected");
        return Err(LivyError::SessionCreation {
            status: response.status,
        });
    }

    let session_id = response.json::<Created>()?.id;
    tracing::debug!(%session_id, kind = %config.kind, "Session created, waiting for idle");

    let url = config.session_url(&session_id);
    let (url, id) = (url.as_str(), session_id.as_str());
    let ready = poll::drive(sleeper, config.poll_interval, move || async move {
        let response = transport.send(HttpRequest::get(url)).await?;
        tracing::debug!(session_id = %id, status = response.status, "Polled session");
        let outcome = poll::session_step(id, &response);
        if let PollOutcome::Failed(e) = &outcome {
            tracing::warn!(session_id = %id, "{e}");
        }
        Ok::<_, LivyError>(outcome)
    })
    .await?;

    tracing::info!(session_id = %ready, "Session ready");
    Ok(ready)
}

/// Kill a session by id.
///
/// Used by [`LivyClient::remove_session`], and by callers cleaning up a
/// session that was created but never became ready (see
/// [`LivyError::SessionInitialization`]).
///
/// # Errors
/// Returns `SessionRemoval` with the status code unless the service answers
/// 200, or a transport error.
pub async fn delete_session<T>(
    transport: &T,
    config: &SessionConfig,
    session_id: &str,
) -> Result<(), LivyError>
where
    T: Transport + ?Sized,
{
    let response = transport
        .send(HttpRequest::delete(config.session_url(session_id)))
        .await?;

    if response.status != STATUS_OK {
        tracing::warn!(
            %session_id,
            status = response.status,
            "Session removal rejected"
        );
        return Err(LivyError::SessionRemoval {
            status: response.status,
        });
    }

    tracing::info!(%session_id, "Session removed");
    Ok(())
}
