//! # Streaming HTTP Client
//!
//! A thin, asynchronous API client wrapper around `reqwest` for endpoints
//! that keep the response body open indefinitely. It handles base URLs,
//! bearer authentication, and bounded-backoff retries around header
//! acquisition via the composable [`super::retry`] wrapper.

use std::time::Duration;

use reqwest::header::AUTHORIZATION;
use reqwest::Response;
use tokio_util::sync::CancellationToken;
use url::Url;

use super::retry::{retry_request, transient_by_default, AttemptFault, RetrieveError, RetryPolicy};

/// A flexible asynchronous HTTP client for streaming endpoints.
///
/// Built on `reqwest`, it handles base URLs, authentication tokens, and
/// automatic retries. The configured timeout bounds header acquisition only,
/// never the lifetime of an already-open response body.
pub struct ApiClient {
    /// The underlying connection-pooling client.
    inner: reqwest::Client,
    /// The base URL to which all relative paths are joined.
    base_url: Url,
    /// An optional Bearer token used for authorization.
    auth_token: Option<String>,
    /// How long to wait for response headers on each attempt.
    header_timeout: Duration,
    /// Attempt cap and backoff schedule applied per outbound request.
    policy: RetryPolicy,
}

impl ApiClient {
    /// Creates a new `ApiClient` instance with a retry policy.
    ///
    /// # Arguments
    /// * `base_url` - The absolute base URL for the API (e.g., "https://api.example.com/").
    /// * `auth_token` - An optional string for the Authorization header.
    /// * `header_timeout` - Per-attempt bound on response header acquisition.
    /// * `policy` - Retry cap and backoff schedule.
    pub fn new(
        base_url: &str,
        auth_token: Option<String>,
        header_timeout: Duration,
        policy: RetryPolicy,
    ) -> Result<Self, RetrieveError> {
        let url = Url::parse(base_url)?;
        Ok(Self {
            inner: reqwest::Client::new(),
            base_url: url,
            auth_token,
            header_timeout,
            policy,
        })
    }

    /// Performs a retried GET whose future resolves once response headers
    /// arrive; the body is left unread for the caller to stream.
    ///
    /// Non-2xx responses are returned, not raised; callers classify them.
    /// After exhaustion a final HTTP response is likewise returned, while a
    /// final network fault or header timeout propagates as an error.
    pub async fn get_streaming(
        &self,
        path: &str,
        cancel: &CancellationToken,
    ) -> Result<Response, RetrieveError> {
        let full_url = self.base_url.join(path)?;

        retry_request(self.policy, transient_by_default, cancel, || {
            let mut request = self.inner.get(full_url.clone());
            if let Some(token) = &self.auth_token {
                request = request.header(AUTHORIZATION, format!("Bearer {token}"));
            }
            let timeout = self.header_timeout;
            async move {
                match tokio::time::timeout(timeout, request.send()).await {
                    Ok(Ok(response)) => Ok(response),
                    Ok(Err(e)) => Err(AttemptFault::Transport(e)),
                    Err(_) => Err(AttemptFault::HeaderTimeout),
                }
            }
        })
        .await
    }
}
