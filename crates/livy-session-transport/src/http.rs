//! reqwest-backed transport.

use std::time::Duration;

use async_trait::async_trait;
use livy_session_core::traits::{HttpRequest, HttpResponse, Method, Transport, TransportError};
use reqwest::header::{CONTENT_TYPE, HeaderValue};
use serde_json::Value;

const APPLICATION_JSON: &str = "application/json";

/// Transport that talks to the service over HTTP.
///
/// Connections are reused across requests by the underlying client.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    http: reqwest::Client,
    timeout: Option<Duration>,
}

impl HttpTransport {
    /// Create a transport without a request timeout.
    ///
    /// # Errors
    /// Returns error if the HTTP client cannot be built.
    pub fn new() -> Result<Self, TransportError> {
        Self::build(None)
    }

    /// Create a transport that aborts any single request after `timeout`.
    ///
    /// # Errors
    /// Returns error if the HTTP client cannot be built.
    pub fn with_timeout(timeout: Duration) -> Result<Self, TransportError> {
        Self::build(Some(timeout))
    }

    fn build(timeout: Option<Duration>) -> Result<Self, TransportError> {
        let mut builder = reqwest::Client::builder();
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        let http = builder
            .build()
            .map_err(|e| TransportError::Build(e.to_string()))?;
        Ok(Self { http, timeout })
    }

    /// Per-request timeout, if any.
    #[must_use]
    pub const fn timeout(&self) -> Option<Duration> {
        self.timeout
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, TransportError> {
        let HttpRequest { method, url, body } = request;

        let mut builder = match method {
            Method::Get => self.http.get(&url),
            Method::Post => self.http.post(&url),
            Method::Delete => self.http.delete(&url),
        }
        .header(CONTENT_TYPE, HeaderValue::from_static(APPLICATION_JSON));
        if let Some(body) = &body {
            builder = builder.json(body);
        }

        tracing::debug!(%method, %url, "Sending Livy request");
        let response = builder.send().await.map_err(|e| match self.timeout {
            Some(timeout) if e.is_timeout() => TransportError::Timeout(timeout),
            _ => TransportError::Request(format!("{method} {url}: {e}")),
        })?;

        let status = response.status().as_u16();
        let text = response
            .text()
            .await
            .map_err(|e| TransportError::Body(e.to_string()))?;
        tracing::debug!(%method, %url, status, "Received Livy response");

        Ok(HttpResponse::new(status, parse_body(&text)))
    }
}

/// Decode a response body, keeping non-JSON text as a JSON string.
fn parse_body(text: &str) -> Value {
    if text.trim().is_empty() {
        return Value::Null;
    }
    serde_json::from_str(text).unwrap_or_else(|_| Value::String(text.to_owned()))
}
