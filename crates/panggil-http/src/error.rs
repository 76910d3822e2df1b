//! Error types.

use crate::response::Response;
use std::time::Duration;
use thiserror::Error;

/// Invalid client configuration, reported by `ClientBuilder::build`.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("no HTTP calls configured")]
    NoCalls,

    #[error("timeout must be greater than zero")]
    ZeroTimeout,

    #[error("retry interval and attempts must be greater than zero (interval {interval:?}, attempts {attempts})")]
    InvalidRetry { interval: Duration, attempts: u32 },

    #[error("invalid URL {url:?}: {source}")]
    InvalidUrl {
        url: String,
        #[source]
        source: url::ParseError,
    },

    #[error("invalid header {name:?}")]
    InvalidHeader { name: String },

    #[error("invalid cookie {name:?}")]
    InvalidCookie { name: String },

    #[error("failed to encode JSON body: {0}")]
    JsonBody(#[source] serde_json::Error),

    #[error("file part {key:?} has no content")]
    EmptyFile { key: String },

    #[error("invalid value for {var}: {message}")]
    InvalidEnv { var: String, message: String },

    #[error("failed to parse configuration: {0}")]
    Parse(#[from] serde_yaml::Error),

    #[error("failed to build HTTP client: {0}")]
    ClientBuild(#[source] reqwest::Error),
}

/// Errors from a single transport attempt.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("attempt timed out after {0:?}")]
    Timeout(Duration),

    #[error("connection failed: {0}")]
    Connection(String),

    #[error("request failed: {0}")]
    Request(#[source] reqwest::Error),

    #[error("request has no URL")]
    MissingUrl,
}

/// Run-level HTTP errors.
#[derive(Debug, Error)]
pub enum HttpError {
    /// Every configured attempt failed. Connection, DNS and timeout failures
    /// are all reported this way.
    #[error("request timeout: {url} failed after {attempts} attempt(s)")]
    TimeoutExhausted {
        url: String,
        attempts: u32,
        #[source]
        last_error: TransportError,
    },
}

impl HttpError {
    /// The HTTP status reported alongside this error.
    pub fn status_code(&self) -> u16 {
        match self {
            HttpError::TimeoutExhausted { .. } => 408,
        }
    }
}

/// A failed call sequence, carrying the response reported to the caller.
#[derive(Debug, Error)]
#[error("{error}")]
pub struct CallError {
    /// Best-available response; status 408 on timeout.
    pub response: Response,
    /// What went wrong.
    #[source]
    pub error: HttpError,
}

impl CallError {
    /// Create a call error whose response carries the error's status code.
    pub fn new(error: HttpError) -> Self {
        Self {
            response: Response::with_status(error.status_code()),
            error,
        }
    }

    /// Status code of the reported response.
    pub fn status_code(&self) -> u16 {
        self.response.status_code
    }
}
