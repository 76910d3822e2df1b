//! Timeout-bounded retry of a single HTTP call.

use crate::error::{ConfigError, TransportError};
use crate::request::HttpRequest;
use crate::response::HttpResponse;
use crate::transport::Transport;
use std::time::Duration;

/// Default per-attempt timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(1);
/// Default delay between attempts.
pub const DEFAULT_INTERVAL: Duration = Duration::from_millis(500);
/// Default number of attempts (no retry).
pub const DEFAULT_MAX_ATTEMPTS: u32 = 1;

/// How a call is attempted and retried.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Upper bound for each attempt.
    pub timeout: Duration,
    /// Pause between a failed attempt and the next one.
    pub interval: Duration,
    /// Total number of attempts, including the first.
    pub max_attempts: u32,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            timeout: DEFAULT_TIMEOUT,
            interval: DEFAULT_INTERVAL,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
        }
    }
}

impl RetryPolicy {
    /// Reject zero timeouts, intervals and attempt counts.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.timeout.is_zero() {
            return Err(ConfigError::ZeroTimeout);
        }
        if self.interval.is_zero() || self.max_attempts == 0 {
            return Err(ConfigError::InvalidRetry {
                interval: self.interval,
                attempts: self.max_attempts,
            });
        }
        Ok(())
    }
}

/// Where an executor is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryState {
    Attempting,
    Succeeded,
    ExhaustedFailure,
}

/// Every attempt failed.
#[derive(Debug)]
pub struct RetryExhausted {
    /// Attempts made.
    pub attempts: u32,
    /// Failure of the final attempt.
    pub last_error: TransportError,
    /// Best-available response; empty when no attempt produced one.
    pub response: HttpResponse,
}

/// Drives the attempts of one call.
#[derive(Debug)]
pub struct RetryExecutor {
    policy: RetryPolicy,
    attempts: u32,
    state: RetryState,
}

impl RetryExecutor {
    /// Create an executor in the `Attempting` state.
    pub fn new(policy: RetryPolicy) -> Self {
        Self {
            policy,
            attempts: 0,
            state: RetryState::Attempting,
        }
    }

    /// The policy in use.
    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// Attempts made so far.
    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    /// Current state.
    pub fn state(&self) -> RetryState {
        self.state
    }

    /// Send `request` until it completes or the attempts run out.
    ///
    /// Any response counts as completion, whatever its status code. Timeouts
    /// and transport errors are retried after `interval`, resending the same
    /// descriptor.
    pub async fn execute<T>(
        &mut self,
        transport: &T,
        request: &HttpRequest,
    ) -> Result<HttpResponse, RetryExhausted>
    where
        T: Transport + ?Sized,
    {
        let max_attempts = self.policy.max_attempts.max(1);
        let timeout = self.policy.timeout;

        loop {
            self.attempts += 1;

            let error = match tokio::time::timeout(timeout, transport.send(request, timeout)).await {
                Ok(Ok(response)) => {
                    tracing::debug!(
                        attempt = self.attempts,
                        status = response.status(),
                        "attempt succeeded"
                    );
                    self.state = RetryState::Succeeded;
                    return Ok(response);
                }
                Ok(Err(e)) => e,
                Err(_) => TransportError::Timeout(timeout),
            };

            if self.attempts >= max_attempts {
                tracing::debug!(attempts = self.attempts, error = %error, "attempts exhausted");
                self.state = RetryState::ExhaustedFailure;
                return Err(RetryExhausted {
                    attempts: self.attempts,
                    last_error: error,
                    response: HttpResponse::default(),
                });
            }

            tracing::warn!(
                attempt = self.attempts,
                max_attempts,
                error = %error,
                "attempt failed, retrying in {:?}",
                self.policy.interval
            );
            tokio::time::sleep(self.policy.interval).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{Step, ScriptedTransport};
    use tokio::time::Instant;

    fn request() -> HttpRequest {
        let mut request = HttpRequest::new();
        request.set_url(url::Url::parse("http://localhost/hotels").unwrap());
        request
    }

    fn policy(max_attempts: u32) -> RetryPolicy {
        RetryPolicy {
            timeout: Duration::from_secs(1),
            interval: Duration::from_millis(500),
            max_attempts,
        }
    }

    #[test]
    fn test_default_policy() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.timeout, Duration::from_secs(1));
        assert_eq!(policy.interval, Duration::from_millis(500));
        assert_eq!(policy.max_attempts, 1);
        assert!(policy.validate().is_ok());
    }

    #[test]
    fn test_policy_validation() {
        let zero_timeout = RetryPolicy {
            timeout: Duration::ZERO,
            ..RetryPolicy::default()
        };
        assert!(matches!(zero_timeout.validate(), Err(ConfigError::ZeroTimeout)));

        let zero_attempts = RetryPolicy {
            max_attempts: 0,
            ..RetryPolicy::default()
        };
        assert!(matches!(
            zero_attempts.validate(),
            Err(ConfigError::InvalidRetry { attempts: 0, .. })
        ));

        let zero_interval = RetryPolicy {
            interval: Duration::ZERO,
            ..RetryPolicy::default()
        };
        assert!(zero_interval.validate().is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn test_success_on_first_attempt() {
        let transport = ScriptedTransport::new(vec![Step::Respond(200, r#"{"ok":true}"#)]);
        let mut executor = RetryExecutor::new(policy(3));

        let response = executor.execute(&transport, &request()).await.unwrap();

        assert_eq!(response.status(), 200);
        assert_eq!(executor.attempts(), 1);
        assert_eq!(executor.state(), RetryState::Succeeded);
        assert_eq!(transport.calls(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_server_error_is_not_retried() {
        let transport = ScriptedTransport::new(vec![Step::Respond(500, "{}")]);
        let mut executor = RetryExecutor::new(policy(3));

        let response = executor.execute(&transport, &request()).await.unwrap();

        assert_eq!(response.status(), 500);
        assert_eq!(transport.calls(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_always_hanging_transport_exhausts_attempts() {
        let transport = ScriptedTransport::always(Step::Hang);
        let mut executor = RetryExecutor::new(policy(3));
        let started = Instant::now();

        let error = executor.execute(&transport, &request()).await.unwrap_err();

        assert_eq!(error.attempts, 3);
        assert_eq!(transport.calls(), 3);
        assert!(matches!(error.last_error, TransportError::Timeout(_)));
        assert_eq!(error.response.status(), 0);
        assert_eq!(executor.state(), RetryState::ExhaustedFailure);
        // three timeouts and two pauses between them
        let elapsed = started.elapsed();
        assert!(elapsed >= Duration::from_millis(4000), "elapsed {:?}", elapsed);
        assert!(elapsed < Duration::from_millis(4100), "elapsed {:?}", elapsed);
    }

    #[tokio::test(start_paused = true)]
    async fn test_default_policy_makes_single_attempt() {
        let transport = ScriptedTransport::always(Step::Hang);
        let mut executor = RetryExecutor::new(RetryPolicy::default());
        let started = Instant::now();

        let error = executor.execute(&transport, &request()).await.unwrap_err();

        assert_eq!(error.attempts, 1);
        let elapsed = started.elapsed();
        assert!(elapsed >= Duration::from_secs(1));
        assert!(elapsed < Duration::from_millis(1100));
    }

    #[tokio::test(start_paused = true)]
    async fn test_recovers_after_failures() {
        let transport = ScriptedTransport::new(vec![
            Step::Fail,
            Step::Hang,
            Step::Respond(201, r#"{"id":1}"#),
        ]);
        let mut executor = RetryExecutor::new(policy(3));

        let response = executor.execute(&transport, &request()).await.unwrap();

        assert_eq!(response.status(), 201);
        assert_eq!(response.body(), br#"{"id":1}"#);
        assert_eq!(executor.attempts(), 3);
        assert_eq!(executor.state(), RetryState::Succeeded);
    }

    #[tokio::test(start_paused = true)]
    async fn test_transport_error_is_reported_as_last_error() {
        let transport = ScriptedTransport::always(Step::Fail);
        let mut executor = RetryExecutor::new(policy(2));

        let error = executor.execute(&transport, &request()).await.unwrap_err();

        assert_eq!(error.attempts, 2);
        assert!(matches!(error.last_error, TransportError::Connection(_)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_retries_resend_same_request() {
        let transport = ScriptedTransport::new(vec![Step::Fail, Step::Respond(200, "{}")]);
        let mut executor = RetryExecutor::new(policy(2));

        executor.execute(&transport, &request()).await.unwrap();

        let urls = transport.seen_urls();
        assert_eq!(urls.len(), 2);
        assert_eq!(urls[0], urls[1]);
    }
}
