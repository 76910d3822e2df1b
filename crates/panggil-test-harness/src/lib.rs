//! Shared test utilities for panggil crates.
//!
//! Provides tracing setup, wiremock-based HTTP servers, and the JSON
//! fixtures used across the workspace tests.

pub mod fixtures;
pub mod mocks;

use once_cell::sync::Lazy;
use tracing_subscriber::EnvFilter;

/// Install a test-friendly tracing subscriber once per process.
pub fn init() {
    static INIT: Lazy<()> = Lazy::new(|| {
        let filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new("warn,panggil_http=debug"));

        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_test_writer()
            .with_file(true)
            .with_line_number(true)
            .try_init()
            .ok();
    });

    Lazy::force(&INIT);
}
