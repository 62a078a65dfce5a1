//! Retry logic for segment requests
//!
//! Transient failures wait out a backoff delay before the next attempt;
//! permanent failures still consume the retry budget but retry immediately.

use backoff::{backoff::Backoff, ExponentialBackoff};
use std::future::Future;
use std::time::Duration;

/// Default number of retries after the first attempt
pub const DEFAULT_MAX_RETRIES: u32 = 3;

/// Default delay before retrying a transient failure
pub const DEFAULT_RETRY_DELAY_MS: u64 = 2000;

/// Errors that know whether they are worth a delayed retry
pub trait Retryable {
    fn is_transient(&self) -> bool;
}

impl Retryable for crate::http::error::TransportError {
    fn is_transient(&self) -> bool {
        self.kind.is_transient()
    }
}

/// Retry policy configuration
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    /// Maximum number of retries after the first attempt
    pub max_retries: u32,
    /// Delay before retrying a transient failure (in milliseconds)
    pub retry_delay_ms: u64,
    /// Growth factor applied to the delay after each retry; 1.0 keeps it fixed
    pub multiplier: f64,
    /// Upper bound for a grown delay (in milliseconds)
    pub max_delay_ms: u64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: DEFAULT_MAX_RETRIES,
            retry_delay_ms: DEFAULT_RETRY_DELAY_MS,
            multiplier: 1.0,
            max_delay_ms: 30_000,
        }
    }
}

impl RetryPolicy {
    /// Create a new retry policy with custom retry budget
    pub fn new(max_retries: u32) -> Self {
        Self {
            max_retries,
            ..Default::default()
        }
    }

    /// Set the base delay
    pub fn with_delay_ms(mut self, millis: u64) -> Self {
        self.retry_delay_ms = millis;
        self.max_delay_ms = self.max_delay_ms.max(millis);
        self
    }

    /// Grow the delay exponentially instead of keeping it fixed
    pub fn with_multiplier(mut self, multiplier: f64) -> Self {
        self.multiplier = multiplier.max(1.0);
        self
    }

    /// Create the backoff schedule; jitter is always off so delays are reproducible
    pub fn create_backoff(&self) -> ExponentialBackoff {
        ExponentialBackoff {
            initial_interval: Duration::from_millis(self.retry_delay_ms),
            current_interval: Duration::from_millis(self.retry_delay_ms),
            max_interval: Duration::from_millis(self.max_delay_ms.max(self.retry_delay_ms)),
            multiplier: self.multiplier,
            randomization_factor: 0.0,
            max_elapsed_time: None, // the retry budget bounds attempts instead
            ..Default::default()
        }
    }
}

/// Decision on whether to retry a request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryDecision {
    /// Retry the request after the specified delay (zero for permanent failures)
    Retry { delay: Duration },
    /// Budget exhausted
    NoRetry,
}

/// Tracks retries for one segment
#[derive(Debug)]
pub struct RetryHandler {
    policy: RetryPolicy,
    retries: u32,
    backoff: ExponentialBackoff,
}

impl RetryHandler {
    pub fn new(policy: RetryPolicy) -> Self {
        let backoff = policy.create_backoff();
        Self {
            policy,
            retries: 0,
            backoff,
        }
    }

    /// Decide what to do after a failed attempt
    pub fn should_retry(&mut self, transient: bool) -> RetryDecision {
        if self.retries >= self.policy.max_retries {
            return RetryDecision::NoRetry;
        }
        self.retries += 1;

        let delay = if transient {
            self.backoff
                .next_backoff()
                .unwrap_or(Duration::from_millis(self.policy.max_delay_ms))
        } else {
            Duration::ZERO
        };
        RetryDecision::Retry { delay }
    }

    /// Retries performed so far
    pub fn retries(&self) -> u32 {
        self.retries
    }
}

/// What happened across all attempts of one request
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RetryReport {
    /// Total attempts, including the first
    pub attempts: u32,
    /// Delays actually waited, in order
    pub delays: Vec<Duration>,
}

/// Execute a request with retry logic.
///
/// `request_fn` receives the zero-based attempt number.
pub async fn execute_with_retry<F, Fut, T, E>(
    mut request_fn: F,
    policy: &RetryPolicy,
) -> (Result<T, E>, RetryReport)
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: Retryable + std::fmt::Display,
{
    let mut handler = RetryHandler::new(policy.clone());
    let mut report = RetryReport::default();

    loop {
        let attempt = report.attempts;
        report.attempts += 1;

        match request_fn(attempt).await {
            Ok(value) => return (Ok(value), report),
            Err(error) => match handler.should_retry(error.is_transient()) {
                RetryDecision::Retry { delay } => {
                    tracing::warn!(
                        attempt = report.attempts,
                        delay_ms = delay.as_millis() as u64,
                        transient = error.is_transient(),
                        "request failed, retrying: {}",
                        error
                    );
                    if !delay.is_zero() {
                        tokio::time::sleep(delay).await;
                        report.delays.push(delay);
                    }
                }
                RetryDecision::NoRetry => {
                    tracing::error!(
                        attempts = report.attempts,
                        "request failed, retry budget exhausted: {}",
                        error
                    );
                    return (Err(error), report);
                }
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::error::{TransportError, TransportErrorKind};
    use std::cell::Cell;

    fn transient() -> TransportError {
        TransportError::new(TransportErrorKind::Timeout, "timed out")
    }

    fn permanent() -> TransportError {
        TransportError::new(TransportErrorKind::Status, "bad request")
    }

    #[test]
    fn test_default_retry_policy() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.max_retries, 3);
        assert_eq!(policy.retry_delay_ms, 2000);
        assert_eq!(policy.multiplier, 1.0);
    }

    #[test]
    fn test_retry_handler_budget() {
        let mut handler = RetryHandler::new(RetryPolicy::new(2));
        assert!(matches!(handler.should_retry(true), RetryDecision::Retry { .. }));
        assert!(matches!(handler.should_retry(false), RetryDecision::Retry { .. }));
        assert_eq!(handler.retries(), 2);
        assert_eq!(handler.should_retry(true), RetryDecision::NoRetry);
    }

    #[test]
    fn test_fixed_delay_for_transient_zero_for_permanent() {
        let mut handler = RetryHandler::new(RetryPolicy::default());
        assert_eq!(
            handler.should_retry(true),
            RetryDecision::Retry { delay: Duration::from_millis(2000) }
        );
        assert_eq!(
            handler.should_retry(false),
            RetryDecision::Retry { delay: Duration::ZERO }
        );
        assert_eq!(
            handler.should_retry(true),
            RetryDecision::Retry { delay: Duration::from_millis(2000) }
        );
    }

    #[test]
    fn test_exponential_growth() {
        let policy = RetryPolicy::default().with_delay_ms(100).with_multiplier(2.0);
        let mut handler = RetryHandler::new(policy);
        let mut delays = Vec::new();
        while let RetryDecision::Retry { delay } = handler.should_retry(true) {
            delays.push(delay.as_millis());
        }
        assert_eq!(delays, vec![100, 200, 400]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_execute_with_retry_recovers() {
        let calls = Cell::new(0u32);
        let (result, report) = execute_with_retry(
            |_| {
                calls.set(calls.get() + 1);
                let n = calls.get();
                async move {
                    if n < 3 {
                        Err(transient())
                    } else {
                        Ok("done")
                    }
                }
            },
            &RetryPolicy::default(),
        )
        .await;

        assert_eq!(result.unwrap(), "done");
        assert_eq!(report.attempts, 3);
        assert_eq!(report.delays, vec![Duration::from_millis(2000); 2]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_permanent_failures_skip_delay() {
        let (result, report) = execute_with_retry(
            |_| async { Err::<(), _>(permanent()) },
            &RetryPolicy::new(2),
        )
        .await;

        assert!(result.is_err());
        assert_eq!(report.attempts, 3);
        assert!(report.delays.is_empty());
    }
}
