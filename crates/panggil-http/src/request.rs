//! HTTP request descriptor and staged request state.

use bytes::Bytes;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, CONTENT_TYPE, COOKIE};
use reqwest::Method;
use url::Url;

/// Common HTTP headers.
pub mod headers {
    pub const CONTENT_TYPE_JSON: &str = "application/json";
    pub const CONTENT_TYPE_MULTIPART: &str = "multipart/form-data";
}

/// One part of a multipart/form-data body.
#[derive(Debug, Clone, PartialEq)]
pub enum FormPart {
    /// A plain text field.
    Text { name: String, value: String },
    /// A file upload.
    File {
        name: String,
        filename: String,
        content: Bytes,
    },
}

/// A staged outgoing body.
///
/// Bodies are kept as owned, cloneable data so a retried attempt always
/// starts from the same bytes.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum RequestBody {
    #[default]
    Empty,
    /// Pre-encoded JSON.
    Json(Bytes),
    /// Form fields and files, encoded by the transport on every attempt.
    Multipart(Vec<FormPart>),
}

impl RequestBody {
    /// Whether a body was staged.
    pub fn is_empty(&self) -> bool {
        matches!(self, RequestBody::Empty)
    }

    /// Append a multipart part, converting an empty body into a form.
    ///
    /// A JSON body is replaced.
    pub(crate) fn push_part(&mut self, part: FormPart) {
        match self {
            RequestBody::Multipart(parts) => parts.push(part),
            _ => *self = RequestBody::Multipart(vec![part]),
        }
    }
}

/// Request state shared by every call in a sequence.
#[derive(Debug, Clone, Default)]
pub struct RequestTemplate {
    headers: HeaderMap,
    cookies: Vec<(String, String)>,
    body: RequestBody,
}

impl RequestTemplate {
    /// Create an empty template.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a header, replacing any previous value.
    pub fn insert_header(&mut self, name: HeaderName, value: HeaderValue) {
        self.headers.insert(name, value);
    }

    /// Add a cookie sent with every call.
    pub fn add_cookie(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        self.cookies.retain(|(existing, _)| *existing != name);
        self.cookies.push((name, value.into()));
    }

    /// Stage an outgoing body.
    pub fn set_body(&mut self, body: RequestBody) {
        self.body = body;
    }

    /// Configured headers.
    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// Configured cookies.
    pub fn cookies(&self) -> &[(String, String)] {
        &self.cookies
    }

    /// Staged body.
    pub fn body(&self) -> &RequestBody {
        &self.body
    }

    /// Render the cookies as a single `Cookie` header value.
    pub fn cookie_header(&self) -> Option<String> {
        if self.cookies.is_empty() {
            return None;
        }
        Some(
            self.cookies
                .iter()
                .map(|(name, value)| format!("{}={}", name, value))
                .collect::<Vec<_>>()
                .join("; "),
        )
    }
}

/// The request descriptor handed to a transport.
///
/// One descriptor is reused across every call of a sequence and reset
/// between calls.
#[derive(Debug, Clone)]
pub struct HttpRequest {
    method: Method,
    url: Option<Url>,
    headers: HeaderMap,
    body: RequestBody,
}

impl HttpRequest {
    /// Create an empty GET descriptor.
    pub fn new() -> Self {
        Self {
            method: Method::GET,
            url: None,
            headers: HeaderMap::new(),
            body: RequestBody::Empty,
        }
    }

    /// Set the HTTP method.
    pub fn set_method(&mut self, method: Method) {
        self.method = method;
    }

    /// Set the target URL.
    pub fn set_url(&mut self, url: Url) {
        self.url = Some(url);
    }

    /// Copy headers, cookies and body from the shared template.
    pub fn apply(&mut self, template: &RequestTemplate) {
        for (name, value) in template.headers() {
            self.headers.insert(name.clone(), value.clone());
        }
        if let Some(cookies) = template.cookie_header() {
            if let Ok(value) = HeaderValue::try_from(cookies) {
                self.headers.insert(COOKIE, value);
            }
        }
        self.body = template.body().clone();
    }

    /// Settle body-dependent headers before dispatch.
    ///
    /// JSON bodies get `application/json` unless a content type was set
    /// explicitly. Multipart content types carry a boundary and are set by
    /// the transport when the form is encoded.
    pub fn finalize(&mut self) {
        match &self.body {
            RequestBody::Json(_) if !self.headers.contains_key(CONTENT_TYPE) => {
                self.headers.insert(
                    CONTENT_TYPE,
                    HeaderValue::from_static(headers::CONTENT_TYPE_JSON),
                );
            }
            RequestBody::Multipart(_) => {
                self.headers.remove(CONTENT_TYPE);
            }
            _ => {}
        }
    }

    /// Clear everything set for the previous target.
    pub fn reset(&mut self) {
        self.method = Method::GET;
        self.url = None;
        self.headers.clear();
        self.body = RequestBody::Empty;
    }

    /// HTTP method.
    pub fn method(&self) -> &Method {
        &self.method
    }

    /// Target URL, if set.
    pub fn url(&self) -> Option<&Url> {
        self.url.as_ref()
    }

    /// Request headers.
    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// Request body.
    pub fn body(&self) -> &RequestBody {
        &self.body
    }
}

impl Default for HttpRequest {
    fn default() -> Self {
        Self::new()
    }
}
