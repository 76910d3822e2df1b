//! Fluent HTTP client that chains calls and merges their JSON bodies.
//!
//! ```no_run
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! use panggil_http::Client;
//!
//! let response = Client::builder()
//!     .get("http://localhost:8080/hotel-destination", &[], &[])
//!     .get("http://localhost:8080/destinations", &["flights", "informations"], &[])
//!     .build()?
//!     .send()
//!     .await?;
//!
//! println!("{}", String::from_utf8_lossy(&response.body));
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod config;
pub mod error;
pub mod merge;
pub mod orchestrator;
pub mod request;
pub mod response;
pub mod retry;
pub mod transport;
pub mod value;

#[cfg(test)]
mod testing;

pub use client::{Client, ClientBuilder};
pub use config::ClientConfig;
pub use error::{CallError, ConfigError, HttpError, TransportError};
pub use merge::MergeSession;
pub use orchestrator::CallSpec;
pub use request::{headers, FormPart, HttpRequest, RequestBody, RequestTemplate};
pub use response::{parse_set_cookie, HttpResponse, Response, ResponseError};
pub use retry::{RetryExecutor, RetryExhausted, RetryPolicy, RetryState};
pub use transport::{ReqwestTransport, Transport, TransportConfig};
pub use value::{Kind, Map, Value};

pub use reqwest::Method;
