//! Transport capability and its reqwest implementation.

use crate::error::{ConfigError, TransportError};
use crate::request::{FormPart, HttpRequest, RequestBody};
use crate::response::{parse_set_cookie, HttpResponse};
use async_trait::async_trait;
use reqwest::header::SET_COOKIE;
use reqwest::multipart::{Form, Part};
use reqwest::{Client, ClientBuilder};
use std::time::Duration;

/// Executes a single HTTP attempt.
///
/// Implementations must not mutate the request; retries resend the same
/// descriptor.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Send `request`, giving up after `timeout`.
    async fn send(
        &self,
        request: &HttpRequest,
        timeout: Duration,
    ) -> Result<HttpResponse, TransportError>;
}

/// Transport-level client settings.
#[derive(Debug, Clone)]
pub struct TransportConfig {
    /// Connection timeout.
    pub connect_timeout: Duration,
    /// User agent string.
    pub user_agent: String,
    /// Maximum idle connections per host.
    pub pool_max_idle_per_host: usize,
    /// Enable gzip decompression.
    pub gzip: bool,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(10),
            user_agent: default_user_agent(),
            pool_max_idle_per_host: 10,
            gzip: true,
        }
    }
}

/// `panggil-http/<version>`.
pub fn default_user_agent() -> String {
    format!("panggil-http/{}", env!("CARGO_PKG_VERSION"))
}

/// Build a configured reqwest client.
pub fn build_client(config: &TransportConfig) -> Result<Client, ConfigError> {
    ClientBuilder::new()
        .connect_timeout(config.connect_timeout)
        .user_agent(&config.user_agent)
        .pool_max_idle_per_host(config.pool_max_idle_per_host)
        .gzip(config.gzip)
        .build()
        .map_err(ConfigError::ClientBuild)
}

/// Transport backed by a shared reqwest client.
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    inner: Client,
}

impl ReqwestTransport {
    /// Create a transport with default settings.
    pub fn new() -> Result<Self, ConfigError> {
        Self::with_config(&TransportConfig::default())
    }

    /// Create a transport with custom settings.
    pub fn with_config(config: &TransportConfig) -> Result<Self, ConfigError> {
        let inner = build_client(config)?;
        Ok(Self { inner })
    }

    /// Wrap an existing reqwest client.
    pub fn from_client(inner: Client) -> Self {
        Self { inner }
    }

    /// Get the inner reqwest client.
    pub fn inner(&self) -> &Client {
        &self.inner
    }
}

fn classify(e: reqwest::Error, timeout: Duration) -> TransportError {
    if e.is_timeout() {
        TransportError::Timeout(timeout)
    } else if e.is_connect() {
        TransportError::Connection(e.to_string())
    } else {
        TransportError::Request(e)
    }
}

/// Encode staged form parts into a fresh multipart form.
fn multipart_form(parts: &[FormPart]) -> Form {
    parts.iter().fold(Form::new(), |form, part| match part {
        FormPart::Text { name, value } => form.text(name.clone(), value.clone()),
        FormPart::File {
            name,
            filename,
            content,
        } => form.part(
            name.clone(),
            Part::bytes(content.to_vec()).file_name(filename.clone()),
        ),
    })
}

#[async_trait]
impl Transport for ReqwestTransport {
    async fn send(
        &self,
        request: &HttpRequest,
        timeout: Duration,
    ) -> Result<HttpResponse, TransportError> {
        let url = request.url().ok_or(TransportError::MissingUrl)?;

        let mut builder = self
            .inner
            .request(request.method().clone(), url.clone())
            .headers(request.headers().clone())
            .timeout(timeout);

        builder = match request.body() {
            RequestBody::Empty => builder,
            RequestBody::Json(bytes) => builder.body(bytes.clone()),
            RequestBody::Multipart(parts) => builder.multipart(multipart_form(parts)),
        };

        tracing::debug!("Sending {} request to: {}", request.method(), url);
        let response = builder.send().await.map_err(|e| classify(e, timeout))?;

        let mut received = HttpResponse::new(response.status().as_u16());
        for (name, value) in response.headers() {
            let Ok(value) = value.to_str() else { continue };
            if *name == SET_COOKIE {
                if let Some((cookie, cookie_value)) = parse_set_cookie(value) {
                    received = received.with_cookie(cookie, cookie_value);
                }
            }
            received = received.with_header(name.as_str(), value);
        }

        let body = response.bytes().await.map_err(|e| classify(e, timeout))?;
        tracing::debug!("Response: {} {} ({} bytes)", received.status(), url, body.len());

        Ok(received.with_body(body))
    }
}
