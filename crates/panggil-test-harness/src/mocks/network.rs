//! HTTP mocking on top of wiremock.

use serde::Serialize;
use std::time::Duration;
use wiremock::matchers::{body_json, header, method, path};
use wiremock::{Mock, MockServer, Request, ResponseTemplate};

/// Mock server with shortcuts for the endpoints panggil tests need.
pub struct TestHttpServer {
    server: MockServer,
}

impl TestHttpServer {
    /// Start a new mock server.
    pub async fn start() -> Self {
        Self {
            server: MockServer::start().await,
        }
    }

    /// Base URL of the server.
    pub fn url(&self) -> String {
        self.server.uri()
    }

    /// URL for `path` on this server.
    pub fn url_for(&self, path: &str) -> String {
        format!("{}{}", self.server.uri(), path)
    }

    pub fn inner(&self) -> &MockServer {
        &self.server
    }

    /// Serve `response` as JSON for GET requests to `endpoint`.
    pub async fn get_json<T: Serialize>(&self, endpoint: &str, response: &T) {
        Mock::given(method("GET"))
            .and(path(endpoint))
            .respond_with(ResponseTemplate::new(200).set_body_json(response))
            .mount(&self.server)
            .await;
    }

    /// Serve a raw body for GET requests to `endpoint`.
    ///
    /// Useful when the exact bytes matter, such as integer versus float
    /// literals.
    pub async fn get_raw(&self, endpoint: &str, body: &str) {
        Mock::given(method("GET"))
            .and(path(endpoint))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_raw(body.as_bytes().to_vec(), "application/json"),
            )
            .mount(&self.server)
            .await;
    }

    /// Serve `response` for any method on `endpoint`.
    pub async fn respond(&self, endpoint: &str, response: ResponseTemplate) {
        Mock::given(path(endpoint))
            .respond_with(response)
            .mount(&self.server)
            .await;
    }

    /// Serve `response` after `latency`.
    pub async fn with_latency<T: Serialize>(&self, endpoint: &str, response: &T, latency: Duration) {
        self.respond(
            endpoint,
            ResponseTemplate::new(200)
                .set_body_json(response)
                .set_delay(latency),
        )
        .await;
    }

    /// Serve `responses` in order, one per request; later requests fall
    /// through to other mocks.
    pub async fn sequence(&self, endpoint: &str, responses: Vec<ResponseTemplate>) {
        for (i, response) in responses.into_iter().enumerate() {
            let priority = u8::try_from(i + 1).unwrap_or(u8::MAX);
            Mock::given(path(endpoint))
                .respond_with(response)
                .up_to_n_times(1)
                .with_priority(priority)
                .mount(&self.server)
                .await;
        }
    }

    /// Assert that `endpoint` was hit exactly `times` times.
    pub async fn verify_received(&self, endpoint: &str, times: usize) {
        let count = self
            .received_requests()
            .await
            .iter()
            .filter(|r| r.url.path() == endpoint)
            .count();
        assert_eq!(
            count, times,
            "expected {} requests to {}, got {}",
            times, endpoint, count
        );
    }

    /// Every request received so far.
    pub async fn received_requests(&self) -> Vec<Request> {
        self.server.received_requests().await.unwrap_or_default()
    }

    /// Drop all mocks and recorded requests.
    pub async fn reset(&self) {
        self.server.reset().await;
    }
}

/// Read a header of a received request as text.
pub fn header_value<'a>(request: &'a Request, name: &str) -> Option<&'a str> {
    request.headers.get(name).and_then(|v| v.to_str().ok())
}

/// Builder for mocks that match on method, path, headers and JSON body.
pub struct MockBuilder {
    method: &'static str,
    path: String,
    headers: Vec<(String, String)>,
    body: Option<serde_json::Value>,
}

impl MockBuilder {
    fn new(method: &'static str, path: &str) -> Self {
        Self {
            method,
            path: path.into(),
            headers: Vec::new(),
            body: None,
        }
    }

    pub fn get(path: &str) -> Self {
        Self::new("GET", path)
    }

    pub fn post(path: &str) -> Self {
        Self::new("POST", path)
    }

    pub fn put(path: &str) -> Self {
        Self::new("PUT", path)
    }

    pub fn patch(path: &str) -> Self {
        Self::new("PATCH", path)
    }

    pub fn delete(path: &str) -> Self {
        Self::new("DELETE", path)
    }

    pub fn with_header(mut self, name: &str, value: &str) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    pub fn with_json_body(mut self, body: serde_json::Value) -> Self {
        self.body = Some(body);
        self
    }

    pub fn respond_with(self, response: ResponseTemplate) -> MockSetup {
        MockSetup {
            builder: self,
            response,
        }
    }

    pub fn respond_json<T: Serialize>(self, status: u16, body: &T) -> MockSetup {
        self.respond_with(ResponseTemplate::new(status).set_body_json(body))
    }
}

/// A configured mock, ready to mount.
pub struct MockSetup {
    builder: MockBuilder,
    response: ResponseTemplate,
}

impl MockSetup {
    pub async fn mount(self, server: &TestHttpServer) {
        let mut mock = Mock::given(method(self.builder.method)).and(path(self.builder.path.as_str()));

        for (name, value) in &self.builder.headers {
            mock = mock.and(header(name.as_str(), value.as_str()));
        }

        if let Some(body) = &self.builder.body {
            mock = mock.and(body_json(body));
        }

        mock.respond_with(self.response).mount(server.inner()).await;
    }
}

/// Common response templates.
pub mod responses {
    use super::*;

    pub fn ok() -> ResponseTemplate {
        ResponseTemplate::new(200)
    }

    pub fn created() -> ResponseTemplate {
        ResponseTemplate::new(201)
    }

    pub fn no_content() -> ResponseTemplate {
        ResponseTemplate::new(204)
    }

    pub fn not_found() -> ResponseTemplate {
        ResponseTemplate::new(404).set_body_json(serde_json::json!({ "error": "Not found" }))
    }

    pub fn server_error() -> ResponseTemplate {
        ResponseTemplate::new(500)
            .set_body_json(serde_json::json!({ "error": "Internal server error" }))
    }

    /// A 200 JSON response that sets a cookie.
    pub fn with_cookie<T: Serialize>(body: &T, name: &str, value: &str) -> ResponseTemplate {
        ResponseTemplate::new(200)
            .set_body_json(body)
            .insert_header("set-cookie", format!("{}={}; Path=/; HttpOnly", name, value))
    }

    /// A response that arrives after `delay`.
    pub fn timeout(delay: Duration) -> ResponseTemplate {
        ResponseTemplate::new(200).set_delay(delay)
    }
}
