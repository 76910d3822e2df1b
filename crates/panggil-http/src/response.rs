//! HTTP response types.

use bytes::Bytes;
use serde::de::DeserializeOwned;
use std::collections::HashMap;

/// A response as received from the transport for one call.
#[derive(Debug, Clone, Default)]
pub struct HttpResponse {
    status: u16,
    headers: Vec<(String, String)>,
    cookies: Vec<(String, String)>,
    body: Bytes,
}

impl HttpResponse {
    /// Create a response with the given status and nothing else.
    pub fn new(status: u16) -> Self {
        Self {
            status,
            ..Self::default()
        }
    }

    /// Add a header.
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    /// Add a cookie.
    pub fn with_cookie(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.cookies.push((name.into(), value.into()));
        self
    }

    /// Set the body.
    pub fn with_body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = body.into();
        self
    }

    /// Status code, `0` for an empty response.
    pub fn status(&self) -> u16 {
        self.status
    }

    /// Raw body.
    pub fn body(&self) -> &[u8] {
        &self.body
    }

    /// Headers in received order.
    pub fn headers(&self) -> impl Iterator<Item = (&str, &str)> {
        self.headers.iter().map(|(n, v)| (n.as_str(), v.as_str()))
    }

    /// Cookies in received order.
    pub fn cookies(&self) -> impl Iterator<Item = (&str, &str)> {
        self.cookies.iter().map(|(n, v)| (n.as_str(), v.as_str()))
    }

    /// Clear everything received.
    pub fn reset(&mut self) {
        self.status = 0;
        self.headers.clear();
        self.cookies.clear();
        self.body = Bytes::new();
    }
}

/// The unified result of a call sequence.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Response {
    /// Status code of the last call.
    pub status_code: u16,
    /// Response headers; only populated for single-call sequences.
    pub headers: HashMap<String, String>,
    /// Response cookies; only populated for single-call sequences.
    pub cookies: HashMap<String, String>,
    /// The merged JSON document.
    pub body: Bytes,
}

impl Response {
    /// A response carrying only a status code.
    pub fn with_status(status_code: u16) -> Self {
        Self {
            status_code,
            ..Self::default()
        }
    }

    /// Whether the status code is 2xx.
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status_code)
    }

    /// Deserialize the merged body.
    pub fn json<T: DeserializeOwned>(&self) -> Result<T, ResponseError> {
        serde_json::from_slice(&self.body).map_err(|e| ResponseError::Parse {
            status: self.status_code,
            body: String::from_utf8_lossy(&self.body).to_string(),
            source: e,
        })
    }
}

/// Flatten headers into a map; the last value for a repeated name wins.
pub(crate) fn header_map<'a>(pairs: impl Iterator<Item = (&'a str, &'a str)>) -> HashMap<String, String> {
    pairs
        .map(|(name, value)| (name.to_string(), value.to_string()))
        .collect()
}

/// Extract `name=value` from a `Set-Cookie` header value.
pub fn parse_set_cookie(header: &str) -> Option<(String, String)> {
    let pair = header.split(';').next()?;
    let (name, value) = pair.split_once('=')?;
    let name = name.trim();
    if name.is_empty() {
        return None;
    }
    Some((name.to_string(), value.trim().trim_matches('"').to_string()))
}

/// Response parsing errors.
#[derive(Debug, thiserror::Error)]
pub enum ResponseError {
    #[error("failed to parse JSON (status {status}): {source}")]
    Parse {
        status: u16,
        body: String,
        #[source]
        source: serde_json::Error,
    },
}
