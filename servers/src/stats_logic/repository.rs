use async_trait::async_trait;
use futures_util::TryStreamExt;
use thiserror::Error;
use tokio::io::AsyncBufReadExt;
use tokio_util::io::StreamReader;
use tokio_util::sync::CancellationToken;

use lib_common::retrieve::{ApiClient, RetrieveError, RetryPolicy};

use crate::stats_logic::config::Config;
use crate::stats_logic::model::StreamEnvelope;
use crate::stats_logic::store::RecordStore;

/// Fixed path of the sampled stream on the feed host.
const SAMPLE_STREAM_PATH: &str = "/2/tweets/sample/stream";

#[derive(Debug, Error)]
pub enum FeedError {
    /// The process-wide shutdown signal fired. A clean exit for every
    /// caller, never logged at error level.
    #[error("operation cancelled")]
    Cancelled,
    #[error(transparent)]
    Retrieve(RetrieveError),
    /// The stream opened with a non-success status.
    #[error("stream responded with status {0}")]
    UnexpectedStatus(reqwest::StatusCode),
    #[error("failed to read stream body: {0}")]
    Stream(#[from] std::io::Error),
    /// A line of the stream body was not a valid record. Fatal to the
    /// current stream invocation; never skipped.
    #[error("failed to decode stream line: {0}")]
    Decode(#[from] serde_json::Error),
}

impl From<RetrieveError> for FeedError {
    fn from(e: RetrieveError) -> Self {
        match e {
            RetrieveError::Cancelled => FeedError::Cancelled,
            other => FeedError::Retrieve(other),
        }
    }
}

/// Read access to the sampled feed and the records ingested from it.
#[async_trait]
pub trait SampleStream: Send + Sync {
    /// Probes the streaming endpoint with a header-only request and reports
    /// whether it is reachable under our access control.
    async fn check_status(&self, cancel: &CancellationToken) -> Result<bool, FeedError>;

    /// Opens the stream and appends decoded records until end-of-stream or
    /// cancellation.
    async fn sample_stream(&self, cancel: &CancellationToken) -> Result<(), FeedError>;

    /// Number of records ingested so far.
    async fn record_count(&self) -> usize;
}

/// `200` and `429` mean the endpoint is there and our credential is known;
/// everything else counts as down.
fn is_acceptable_status(status: u16) -> bool {
    matches!(status, 200 | 429)
}

/// Owns the connection to the streaming endpoint and the append-only record
/// store filled from it.
pub struct FeedRepository {
    client: ApiClient,
    pub(crate) store: RecordStore,
}

impl FeedRepository {
    pub fn new(config: &Config) -> Result<Self, FeedError> {
        let auth_token = if config.api_token.is_empty() {
            None
        } else {
            Some(config.api_token.clone())
        };
        let client = ApiClient::new(
            &config.feed_base_url,
            auth_token,
            config.timeout,
            RetryPolicy::default(),
        )?;
        Ok(Self {
            client,
            store: RecordStore::new(),
        })
    }

    /// Record count and the text of every record at the time of the call.
    pub async fn snapshot(&self) -> (usize, Vec<String>) {
        self.store.snapshot_texts().await
    }
}

#[async_trait]
impl SampleStream for FeedRepository {
    async fn check_status(&self, cancel: &CancellationToken) -> Result<bool, FeedError> {
        let response = self.client.get_streaming(SAMPLE_STREAM_PATH, cancel).await?;
        let status = response.status();

        let is_up = is_acceptable_status(status.as_u16());
        if is_up {
            log::info!("Feed API is UP.");
        } else {
            log::error!("Feed API is DOWN ({status}).");
        }
        Ok(is_up)
    }

    async fn sample_stream(&self, cancel: &CancellationToken) -> Result<(), FeedError> {
        log::info!("Sample stream starting.");

        let response = self.client.get_streaming(SAMPLE_STREAM_PATH, cancel).await?;
        let status = response.status();
        if !status.is_success() {
            return Err(FeedError::UnexpectedStatus(status));
        }

        match response.headers().get("x-rate-limit-remaining") {
            Some(remaining) => log::info!(
                "Sample stream headers succeeded. RateLimitRemaining: {}.",
                remaining.to_str().unwrap_or("?")
            ),
            None => log::info!("Sample stream headers succeeded."),
        }

        let body = response.bytes_stream().map_err(std::io::Error::other);
        let mut lines = StreamReader::new(body).lines();

        loop {
            let line = tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(FeedError::Cancelled),
                line = lines.next_line() => line?,
            };
            let Some(line) = line else {
                break; // end of stream
            };
            if line.trim().is_empty() {
                continue;
            }
            log::trace!("Record line read from stream: {line}");
            let envelope: StreamEnvelope = serde_json::from_str(&line)?;
            self.store.append(envelope.data).await;
        }

        log::info!("Sample stream ended.");
        Ok(())
    }

    async fn record_count(&self) -> usize {
        self.store.len().await
    }
}
