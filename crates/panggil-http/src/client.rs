//! Fluent client builder.

use crate::config::ClientConfig;
use crate::error::{CallError, ConfigError};
use crate::orchestrator::{self, CallSpec};
use crate::request::{FormPart, RequestBody, RequestTemplate};
use crate::response::Response;
use crate::retry::RetryPolicy;
use crate::transport::{ReqwestTransport, Transport};
use bytes::Bytes;
use reqwest::header::{HeaderName, HeaderValue};
use reqwest::Method;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use url::Url;

#[derive(Debug, Clone)]
struct PendingCall {
    method: Method,
    url: String,
    whitelist: Vec<String>,
    blacklist: Vec<String>,
}

/// Collects calls and request settings; nothing is validated until
/// [`ClientBuilder::build`].
pub struct ClientBuilder {
    calls: Vec<PendingCall>,
    headers: Vec<(String, String)>,
    cookies: Vec<(String, String)>,
    body: RequestBody,
    deferred: Option<ConfigError>,
    config: ClientConfig,
    policy: RetryPolicy,
    transport: Option<Arc<dyn Transport>>,
}

impl ClientBuilder {
    /// Create a builder with default settings.
    pub fn new() -> Self {
        let config = ClientConfig::default();
        Self {
            calls: Vec::new(),
            headers: Vec::new(),
            cookies: Vec::new(),
            body: RequestBody::Empty,
            deferred: None,
            policy: config.retry_policy(),
            config,
            transport: None,
        }
    }

    /// Apply a configuration, replacing the retry policy and transport
    /// settings.
    pub fn config(mut self, config: ClientConfig) -> Self {
        self.policy = config.retry_policy();
        self.config = config;
        self
    }

    /// Add a GET call.
    ///
    /// A non-empty `whitelist` keeps only those fields of the response body;
    /// otherwise every field except those in `blacklist` is merged.
    pub fn get(mut self, url: impl Into<String>, whitelist: &[&str], blacklist: &[&str]) -> Self {
        self.calls.push(PendingCall {
            method: Method::GET,
            url: url.into(),
            whitelist: whitelist.iter().map(|f| f.to_string()).collect(),
            blacklist: blacklist.iter().map(|f| f.to_string()).collect(),
        });
        self
    }

    /// Add a POST call.
    pub fn post(self, url: impl Into<String>) -> Self {
        self.call(Method::POST, url)
    }

    /// Add a PUT call.
    pub fn put(self, url: impl Into<String>) -> Self {
        self.call(Method::PUT, url)
    }

    /// Add a PATCH call.
    pub fn patch(self, url: impl Into<String>) -> Self {
        self.call(Method::PATCH, url)
    }

    /// Add a DELETE call.
    pub fn delete(self, url: impl Into<String>) -> Self {
        self.call(Method::DELETE, url)
    }

    /// Add a call with any method; its whole body is merged.
    pub fn call(mut self, method: Method, url: impl Into<String>) -> Self {
        self.calls.push(PendingCall {
            method,
            url: url.into(),
            whitelist: Vec::new(),
            blacklist: Vec::new(),
        });
        self
    }

    /// Set a header sent with every call.
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    /// Set several headers.
    pub fn headers<K, V>(mut self, headers: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        self.headers
            .extend(headers.into_iter().map(|(k, v)| (k.into(), v.into())));
        self
    }

    /// Send a cookie with every call.
    pub fn cookie(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.cookies.push((name.into(), value.into()));
        self
    }

    /// Send several cookies.
    pub fn cookies<K, V>(mut self, cookies: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        self.cookies
            .extend(cookies.into_iter().map(|(k, v)| (k.into(), v.into())));
        self
    }

    /// Per-attempt timeout. Defaults to one second.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.policy.timeout = timeout;
        self
    }

    /// Retry failed attempts: wait `interval` between attempts and make at
    /// most `attempts` attempts in total.
    pub fn fail_retry(mut self, interval: Duration, attempts: u32) -> Self {
        self.policy.interval = interval;
        self.policy.max_attempts = attempts;
        self
    }

    /// Send `payload` as a JSON body.
    pub fn send_json<T: Serialize + ?Sized>(mut self, payload: &T) -> Self {
        match serde_json::to_vec(payload) {
            Ok(bytes) => self.body = RequestBody::Json(Bytes::from(bytes)),
            Err(e) => self.defer(ConfigError::JsonBody(e)),
        }
        self
    }

    /// Add multipart/form-data text fields.
    pub fn send_form_data<K, V>(mut self, fields: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        for (name, value) in fields {
            self.body.push_part(FormPart::Text {
                name: name.into(),
                value: value.into(),
            });
        }
        self
    }

    /// Add a file to the multipart/form-data body.
    pub fn send_file(
        mut self,
        key: impl Into<String>,
        filename: impl Into<String>,
        content: impl Into<Bytes>,
    ) -> Self {
        let key = key.into();
        let content = content.into();
        if content.is_empty() {
            self.defer(ConfigError::EmptyFile { key });
            return self;
        }
        self.body.push_part(FormPart::File {
            name: key,
            filename: filename.into(),
            content,
        });
        self
    }

    /// Use a custom transport instead of the reqwest one.
    pub fn transport(mut self, transport: impl Transport + 'static) -> Self {
        self.transport = Some(Arc::new(transport));
        self
    }

    /// Use a shared transport.
    pub fn shared_transport(mut self, transport: Arc<dyn Transport>) -> Self {
        self.transport = Some(transport);
        self
    }

    fn defer(&mut self, error: ConfigError) {
        if self.deferred.is_none() {
            self.deferred = Some(error);
        }
    }

    /// Validate everything and produce a client.
    pub fn build(self) -> Result<Client, ConfigError> {
        if let Some(error) = self.deferred {
            return Err(error);
        }
        if self.calls.is_empty() {
            return Err(ConfigError::NoCalls);
        }
        self.policy.validate()?;

        let calls = self
            .calls
            .into_iter()
            .map(|call| {
                let url = Url::parse(&call.url).map_err(|source| ConfigError::InvalidUrl {
                    url: call.url.clone(),
                    source,
                })?;
                Ok(CallSpec {
                    method: call.method,
                    url,
                    whitelist: call.whitelist,
                    blacklist: call.blacklist,
                })
            })
            .collect::<Result<Vec<_>, ConfigError>>()?;

        let mut template = RequestTemplate::new();
        for (name, value) in &self.headers {
            let header_name = HeaderName::from_bytes(name.as_bytes())
                .map_err(|_| ConfigError::InvalidHeader { name: name.clone() })?;
            let header_value = HeaderValue::from_str(value)
                .map_err(|_| ConfigError::InvalidHeader { name: name.clone() })?;
            template.insert_header(header_name, header_value);
        }
        for (name, value) in self.cookies {
            if !valid_cookie(&name, &value) {
                return Err(ConfigError::InvalidCookie { name });
            }
            template.add_cookie(name, value);
        }
        template.set_body(self.body);

        let transport: Arc<dyn Transport> = match self.transport {
            Some(transport) => transport,
            None => Arc::new(ReqwestTransport::with_config(&self.config.transport_config())?),
        };

        tracing::debug!(
            calls = calls.len(),
            timeout = ?self.policy.timeout,
            max_attempts = self.policy.max_attempts,
            "client built"
        );

        Ok(Client {
            calls,
            template,
            policy: self.policy,
            transport,
        })
    }
}

impl Default for ClientBuilder {
    fn default() -> Self {
        Self::new()
    }
}

fn valid_cookie(name: &str, value: &str) -> bool {
    let forbidden = |c: char| c == ';' || c == ',' || c.is_control();
    !name.is_empty()
        && !name.contains(|c: char| forbidden(c) || c == '=' || c.is_whitespace())
        && !value.contains(forbidden)
}

/// A validated call sequence, ready to send once.
pub struct Client {
    calls: Vec<CallSpec>,
    template: RequestTemplate,
    policy: RetryPolicy,
    transport: Arc<dyn Transport>,
}

impl Client {
    /// Start building a client.
    pub fn builder() -> ClientBuilder {
        ClientBuilder::new()
    }

    /// The configured calls, in execution order.
    pub fn calls(&self) -> &[CallSpec] {
        &self.calls
    }

    /// The retry policy applied to every call.
    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// Headers, cookies and body shared by every call.
    pub fn template(&self) -> &RequestTemplate {
        &self.template
    }

    /// Run every call in order and return the merged response.
    ///
    /// On timeout the error carries a 408 response and the remaining calls
    /// are skipped.
    pub async fn send(self) -> Result<Response, CallError> {
        orchestrator::run(&self.calls, &self.template, self.policy, self.transport.as_ref()).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{ScriptedTransport, Step};
    use reqwest::header::{CONTENT_TYPE, COOKIE};
    use std::collections::HashMap;
    use tokio_test::assert_ok;

    fn scripted(steps: Vec<Step>) -> ScriptedTransport {
        ScriptedTransport::new(steps)
    }

    #[test]
    fn test_build_requires_a_call() {
        let result = Client::builder().transport(scripted(vec![])).build();
        assert!(matches!(result, Err(ConfigError::NoCalls)));
    }

    #[test]
    fn test_build_rejects_invalid_timeout() {
        let result = Client::builder()
            .get("http://localhost/a", &[], &[])
            .timeout(Duration::ZERO)
            .transport(scripted(vec![]))
            .build();
        assert!(matches!(result, Err(ConfigError::ZeroTimeout)));
    }

    #[test]
    fn test_build_rejects_invalid_retry() {
        let result = Client::builder()
            .get("http://localhost/a", &[], &[])
            .fail_retry(Duration::from_millis(100), 0)
            .transport(scripted(vec![]))
            .build();
        assert!(matches!(result, Err(ConfigError::InvalidRetry { attempts: 0, .. })));

        let result = Client::builder()
            .get("http://localhost/a", &[], &[])
            .fail_retry(Duration::ZERO, 3)
            .transport(scripted(vec![]))
            .build();
        assert!(matches!(result, Err(ConfigError::InvalidRetry { .. })));
    }

    #[test]
    fn test_build_rejects_invalid_url() {
        let result = Client::builder()
            .get("not a url", &[], &[])
            .transport(scripted(vec![]))
            .build();
        assert!(matches!(result, Err(ConfigError::InvalidUrl { ref url, .. }) if url == "not a url"));
    }

    #[test]
    fn test_build_rejects_invalid_header_and_cookie() {
        let result = Client::builder()
            .get("http://localhost/a", &[], &[])
            .header("bad header", "value")
            .transport(scripted(vec![]))
            .build();
        assert!(matches!(result, Err(ConfigError::InvalidHeader { .. })));

        let result = Client::builder()
            .get("http://localhost/a", &[], &[])
            .cookie("session", "a;b")
            .transport(scripted(vec![]))
            .build();
        assert!(matches!(result, Err(ConfigError::InvalidCookie { ref name }) if name == "session"));
    }

    #[test]
    fn test_build_rejects_empty_file() {
        let result = Client::builder()
            .post("http://localhost/upload")
            .send_file("image", "person.jpg", Vec::new())
            .transport(scripted(vec![]))
            .build();
        assert!(matches!(result, Err(ConfigError::EmptyFile { ref key }) if key == "image"));
    }

    #[test]
    fn test_builder_records_calls_in_order() {
        let client = assert_ok!(Client::builder()
            .get("http://localhost/hotel-destination", &[], &[])
            .get("http://localhost/destinations", &["flights", "informations"], &[])
            .post("http://localhost/bookings")
            .put("http://localhost/bookings/1")
            .patch("http://localhost/bookings/1")
            .delete("http://localhost/bookings/1")
            .transport(scripted(vec![]))
            .build());

        let methods: Vec<_> = client.calls().iter().map(|c| c.method.clone()).collect();
        assert_eq!(
            methods,
            vec![Method::GET, Method::GET, Method::POST, Method::PUT, Method::PATCH, Method::DELETE]
        );
        assert_eq!(client.calls()[1].whitelist, vec!["flights", "informations"]);
        assert!(client.calls()[2].whitelist.is_empty());
    }

    #[test]
    fn test_config_sets_policy_and_overrides_apply_after() {
        let config = ClientConfig {
            timeout_ms: 2_000,
            retry_attempts: 4,
            ..ClientConfig::default()
        };
        let client = Client::builder()
            .config(config)
            .fail_retry(Duration::from_millis(50), 2)
            .get("http://localhost/a", &[], &[])
            .transport(scripted(vec![]))
            .build()
            .unwrap();

        assert_eq!(client.policy().timeout, Duration::from_secs(2));
        assert_eq!(client.policy().interval, Duration::from_millis(50));
        assert_eq!(client.policy().max_attempts, 2);
    }

    #[test]
    fn test_form_data_and_file_share_one_multipart_body() {
        let client = Client::builder()
            .post("http://localhost/upload")
            .send_form_data([("username", "administrator")])
            .send_file("image", "person.jpg", &b"\xff\xd8\xff"[..])
            .transport(scripted(vec![]))
            .build()
            .unwrap();

        match client.template().body() {
            RequestBody::Multipart(parts) => {
                assert_eq!(parts.len(), 2);
                assert!(matches!(&parts[1], FormPart::File { filename, .. } if filename == "person.jpg"));
            }
            other => panic!("expected multipart body, got {:?}", other),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_send_json_posts_encoded_body() {
        let transport = Arc::new(scripted(vec![Step::Respond(200, r#"{"token":"abc"}"#)]));
        let mut payload = HashMap::new();
        payload.insert("username", "administrator");

        let response = Client::builder()
            .post("http://localhost/login")
            .send_json(&payload)
            .header("X-Request-Id", "42")
            .cookie("lang", "id")
            .shared_transport(transport.clone())
            .build()
            .unwrap()
            .send()
            .await
            .unwrap();

        assert_eq!(response.status_code, 200);
        assert_eq!(response.body, Bytes::from_static(br#"{"token":"abc"}"#));

        let request = &transport.requests()[0];
        assert_eq!(request.method(), &Method::POST);
        assert_eq!(request.headers().get(CONTENT_TYPE).unwrap(), "application/json");
        assert_eq!(request.headers().get("x-request-id").unwrap(), "42");
        assert_eq!(request.headers().get(COOKIE).unwrap(), "lang=id");
        assert_eq!(
            request.body(),
            &RequestBody::Json(Bytes::from_static(br#"{"username":"administrator"}"#))
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_send_reports_timeout_as_408() {
        let client = Client::builder()
            .get("http://localhost/slow", &[], &[])
            .transport(ScriptedTransport::always(Step::Hang))
            .build()
            .unwrap();

        let error = client.send().await.unwrap_err();

        assert_eq!(error.status_code(), 408);
        assert_eq!(error.response.status_code, 408);
    }
}
