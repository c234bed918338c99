//! In-memory test doubles (feature `mock`).
//!
//! Useful for exercising a client without a Livy server or real waits.

use std::{
    collections::VecDeque,
    sync::{Mutex, PoisonError},
    time::Duration,
};

use async_trait::async_trait;
use serde_json::Value;

use crate::traits::{HttpRequest, HttpResponse, Sleeper, Transport, TransportError};

/// Transport that replays scripted responses in order and records every
/// request it receives.
#[derive(Debug, Default)]
pub struct MockTransport {
    responses: Mutex<VecDeque<HttpResponse>>,
    requests: Mutex<Vec<HttpRequest>>,
}

impl MockTransport {
    /// Create a transport with no scripted responses.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a transport replaying `responses`.
    #[must_use]
    pub fn with_responses<I>(responses: I) -> Self
    where
        I: IntoIterator<Item = (u16, Value)>,
    {
        let transport = Self::new();
        for (status, body) in responses {
            transport.push_response(status, body);
        }
        transport
    }

    /// Queue one more response.
    pub fn push_response(&self, status: u16, body: Value) {
        self.responses
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push_back(HttpResponse::new(status, body));
    }

    /// Requests received so far, oldest first.
    #[must_use]
    pub fn requests(&self) -> Vec<HttpRequest> {
        self.requests
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Number of scripted responses not yet consumed.
    #[must_use]
    pub fn remaining(&self) -> usize {
        self.responses
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, TransportError> {
        let url = request.url.clone();
        let method = request.method;
        self.requests
            .lock()
            .map_err(|e| TransportError::Request(e.to_string()))?
            .push(request);

        self.responses
            .lock()
            .map_err(|e| TransportError::Request(e.to_string()))?
            .pop_front()
            .ok_or_else(|| TransportError::Request(format!("no scripted response for {method} {url}")))
    }
}

/// Sleeper that returns immediately and records every requested wait.
#[derive(Debug, Default)]
pub struct RecordingSleeper {
    naps: Mutex<Vec<Duration>>,
}

impl RecordingSleeper {
    /// Create a sleeper with an empty record.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Waits requested so far.
    #[must_use]
    pub fn naps(&self) -> Vec<Duration> {
        self.naps
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

#[async_trait]
impl Sleeper for RecordingSleeper {
    async fn sleep(&self, duration: Duration) {
        self.naps
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(duration);
    }
}
