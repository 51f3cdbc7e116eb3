//! # HTTP Retry Wrapper
//!
//! A composable, cancellation-aware retry loop around a single outbound HTTP
//! request. The wrapper is deliberately independent of any client framework:
//! it takes the raw attempt as a closure and is parameterized by a
//! classification predicate, a backoff schedule, and an attempt cap.

use std::future::Future;
use std::time::Duration;

use reqwest::{Response, StatusCode};
use thiserror::Error;
use tokio_util::sync::CancellationToken;

/// A single attempt that did not produce an HTTP response.
#[derive(Debug, Error)]
pub enum AttemptFault {
    /// Response headers did not arrive within the configured timeout.
    #[error("request timed out before response headers arrived")]
    HeaderTimeout,
    /// The transport layer failed (DNS, connect, TLS, reset).
    #[error(transparent)]
    Transport(#[from] reqwest::Error),
}

/// Errors surfaced by [`retry_request`] and [`super::client::ApiClient`].
#[derive(Debug, Error)]
pub enum RetrieveError {
    /// The caller's cancellation signal fired. Treated as a clean exit by
    /// callers, never as a failure.
    #[error("request cancelled")]
    Cancelled,
    /// Every attempt faulted before a response arrived.
    #[error("retries exhausted after {attempts} attempts: {fault}")]
    RetriesExhausted {
        /// Total attempts made, including the first.
        attempts: u32,
        /// The fault of the final attempt.
        fault: AttemptFault,
    },
    /// The base URL or joined path is not a valid absolute URL.
    #[error("invalid url: {0}")]
    InvalidUrl(#[from] url::ParseError),
}

/// Attempt cap and backoff schedule for [`retry_request`].
#[derive(Clone, Copy)]
pub struct RetryPolicy {
    /// Number of retries allowed after the first attempt.
    pub max_retries: u32,
    /// Delay before the given retry (1-based).
    pub backoff: fn(u32) -> Duration,
}

impl RetryPolicy {
    /// Doubling backoff: retry `n` waits `2^n` seconds.
    pub fn exponential(max_retries: u32) -> Self {
        Self {
            max_retries,
            backoff: |retry| Duration::from_secs(2u64.saturating_pow(retry)),
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::exponential(6)
    }
}

/// Default transient classification: any attempt fault (network error or
/// header timeout), any 5xx, 408, and explicitly 404 and 429.
pub fn transient_by_default(outcome: &Result<Response, AttemptFault>) -> bool {
    match outcome {
        Err(_) => true,
        Ok(response) => {
            let status = response.status();
            status.is_server_error()
                || status == StatusCode::REQUEST_TIMEOUT
                || status == StatusCode::NOT_FOUND
                || status == StatusCode::TOO_MANY_REQUESTS
        }
    }
}

/// Runs `op` until it produces a non-transient outcome or the attempt cap is
/// reached, sleeping per the policy's backoff schedule between attempts.
///
/// Attempts for one logical request are strictly serialized. Both the
/// in-flight attempt and the backoff sleep observe `cancel`.
///
/// The final outcome of an exhausted request keeps its shape: an HTTP
/// response is handed back for the caller to classify (a liveness probe must
/// see a persistent 429 to call the endpoint up), while an attempt fault
/// becomes [`RetrieveError::RetriesExhausted`].
pub async fn retry_request<F, Fut, C>(
    policy: RetryPolicy,
    classify: C,
    cancel: &CancellationToken,
    mut op: F,
) -> Result<Response, RetrieveError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<Response, AttemptFault>>,
    C: Fn(&Result<Response, AttemptFault>) -> bool,
{
    let mut retries = 0u32;
    loop {
        let outcome = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(RetrieveError::Cancelled),
            outcome = op() => outcome,
        };

        if retries < policy.max_retries && classify(&outcome) {
            retries += 1;
            let delay = (policy.backoff)(retries);
            let cause = match &outcome {
                Ok(response) => format!("status {}", response.status()),
                Err(fault) => fault.to_string(),
            };
            log::warn!(
                "Retry {retries}/{} triggered by {cause}. Retrying in {} seconds.",
                policy.max_retries,
                delay.as_secs()
            );
            tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(RetrieveError::Cancelled),
                _ = tokio::time::sleep(delay) => {}
            }
            continue;
        }

        return match outcome {
            Ok(response) => Ok(response),
            Err(fault) => Err(RetrieveError::RetriesExhausted {
                attempts: retries + 1,
                fault,
            }),
        };
    }
}
