//! Sequential execution of configured calls.

use crate::error::{CallError, HttpError};
use crate::merge::MergeSession;
use crate::request::{HttpRequest, RequestTemplate};
use crate::response::{header_map, Response};
use crate::retry::{RetryExecutor, RetryPolicy};
use crate::transport::Transport;
use bytes::Bytes;
use reqwest::Method;
use std::collections::HashMap;
use url::Url;

/// One configured HTTP call.
#[derive(Debug, Clone, PartialEq)]
pub struct CallSpec {
    /// HTTP method.
    pub method: Method,
    /// Target URL.
    pub url: Url,
    /// Fields to keep from the response body. Takes precedence over
    /// `blacklist` when non-empty.
    pub whitelist: Vec<String>,
    /// Fields to drop from the response body.
    pub blacklist: Vec<String>,
}

impl CallSpec {
    /// A call that merges every field of its response.
    pub fn new(method: Method, url: Url) -> Self {
        Self {
            method,
            url,
            whitelist: Vec::new(),
            blacklist: Vec::new(),
        }
    }

    /// Keep only these fields.
    pub fn with_whitelist<S: Into<String>>(mut self, fields: impl IntoIterator<Item = S>) -> Self {
        self.whitelist = fields.into_iter().map(Into::into).collect();
        self
    }

    /// Drop these fields.
    pub fn with_blacklist<S: Into<String>>(mut self, fields: impl IntoIterator<Item = S>) -> Self {
        self.blacklist = fields.into_iter().map(Into::into).collect();
        self
    }

    fn merge_into(&self, session: &mut MergeSession, body: &[u8]) {
        if self.whitelist.is_empty() {
            session.merge_excluding(self.blacklist.as_slice(), body);
        } else {
            session.merge_selecting(self.whitelist.as_slice(), body);
        }
    }
}

/// Run `calls` in order and merge their bodies.
///
/// The first call whose attempts are exhausted aborts the sequence with a
/// 408 response. Headers and cookies are only reported when exactly one call
/// is configured.
pub async fn run<T>(
    calls: &[CallSpec],
    template: &RequestTemplate,
    policy: RetryPolicy,
    transport: &T,
) -> Result<Response, CallError>
where
    T: Transport + ?Sized,
{
    let single = calls.len() == 1;
    let mut request = HttpRequest::new();
    let mut session = MergeSession::new();
    let mut status_code = 0;
    let mut headers = HashMap::new();
    let mut cookies = HashMap::new();

    for (index, call) in calls.iter().enumerate() {
        request.apply(template);
        request.set_method(call.method.clone());
        request.set_url(call.url.clone());
        request.finalize();

        tracing::debug!("Calling {} {} ({}/{})", call.method, call.url, index + 1, calls.len());

        let mut executor = RetryExecutor::new(policy);
        let mut response = match executor.execute(transport, &request).await {
            Ok(response) => response,
            Err(exhausted) => {
                tracing::warn!(
                    url = %call.url,
                    attempts = exhausted.attempts,
                    skipped = calls.len() - index - 1,
                    "call timed out, aborting sequence"
                );
                return Err(CallError::new(HttpError::TimeoutExhausted {
                    url: call.url.to_string(),
                    attempts: exhausted.attempts,
                    last_error: exhausted.last_error,
                }));
            }
        };

        if single {
            headers = header_map(response.headers());
            cookies = header_map(response.cookies());
        }

        call.merge_into(&mut session, response.body());
        status_code = response.status();

        request.reset();
        response.reset();
    }

    Ok(Response {
        status_code,
        headers,
        cookies,
        body: Bytes::from(session.snapshot()),
    })
}
