//! Scripted in-memory transport for unit tests.

use crate::error::TransportError;
use crate::request::HttpRequest;
use crate::response::HttpResponse;
use crate::transport::Transport;
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::Duration;

/// What the transport does for one attempt.
#[derive(Debug, Clone)]
pub(crate) enum Step {
    /// Reply with a status and body.
    Respond(u16, &'static str),
    /// Reply with a fully built response.
    Reply(HttpResponse),
    /// Never complete.
    Hang,
    /// Fail immediately with a connection error.
    Fail,
}

/// Plays back steps in order, one per attempt; repeats `fallback` once the
/// script runs out.
pub(crate) struct ScriptedTransport {
    steps: Mutex<VecDeque<Step>>,
    fallback: Step,
    seen: Mutex<Vec<HttpRequest>>,
}

impl ScriptedTransport {
    pub(crate) fn new(steps: Vec<Step>) -> Self {
        Self {
            steps: Mutex::new(steps.into()),
            fallback: Step::Fail,
            seen: Mutex::new(Vec::new()),
        }
    }

    pub(crate) fn always(step: Step) -> Self {
        Self {
            steps: Mutex::new(VecDeque::new()),
            fallback: step,
            seen: Mutex::new(Vec::new()),
        }
    }

    pub(crate) fn calls(&self) -> usize {
        self.seen.lock().unwrap().len()
    }

    pub(crate) fn requests(&self) -> Vec<HttpRequest> {
        self.seen.lock().unwrap().clone()
    }

    pub(crate) fn seen_urls(&self) -> Vec<String> {
        self.requests()
            .iter()
            .map(|r| r.url().map(ToString::to_string).unwrap_or_default())
            .collect()
    }
}

#[async_trait]
impl Transport for ScriptedTransport {
    async fn send(
        &self,
        request: &HttpRequest,
        _timeout: Duration,
    ) -> Result<HttpResponse, TransportError> {
        self.seen.lock().unwrap().push(request.clone());
        let step = self
            .steps
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| self.fallback.clone());

        match step {
            Step::Respond(status, body) => Ok(HttpResponse::new(status).with_body(body)),
            Step::Reply(response) => Ok(response),
            Step::Hang => std::future::pending().await,
            Step::Fail => Err(TransportError::Connection("connection refused".to_string())),
        }
    }
}
