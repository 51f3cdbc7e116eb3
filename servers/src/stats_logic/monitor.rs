use std::sync::Arc;

use anyhow::Result;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::stats_logic::queue::{BackgroundTaskQueue, WorkItem};
use crate::stats_logic::repository::{FeedError, SampleStream};

/// Verifies feed liveness, then keeps the bounded queue supplied with the
/// long-running ingest operation until the queue reports full.
pub struct FeedMonitor {
    queue: Arc<BackgroundTaskQueue>,
    repository: Arc<dyn SampleStream>,
    /// Producer-scoped signal, linked to the process-wide shutdown token.
    /// Cancelled early when the liveness check fails.
    scope: CancellationToken,
}

impl FeedMonitor {
    pub fn new(
        queue: Arc<BackgroundTaskQueue>,
        repository: Arc<dyn SampleStream>,
        shutdown: CancellationToken,
    ) -> Self {
        Self {
            queue,
            repository,
            scope: shutdown.child_token(),
        }
    }

    /// Checks the feed status and, when reachable, produces ingest work
    /// items until the queue reports full or shutdown is requested.
    ///
    /// When the feed is down the monitor cancels its own scope and never
    /// enqueues anything; the process idles instead of retrying liveness.
    pub async fn start(&self) {
        let is_up = match self.repository.check_status(&self.scope).await {
            Ok(is_up) => is_up,
            Err(FeedError::Cancelled) => return,
            Err(e) => {
                log::error!("Feed status check failed: {e}.");
                false
            }
        };

        if !is_up {
            log::error!("Unable to reach the data provider stream.");
            self.scope.cancel();
            return;
        }

        log::info!("Feed monitor is starting.");
        self.produce().await;
    }

    async fn produce(&self) {
        let mut queue_full = false;
        while !self.scope.is_cancelled() && !queue_full {
            let repository = Arc::clone(&self.repository);
            let item: WorkItem = Box::new(move |stop| Box::pin(ingest_forever(repository, stop)));

            queue_full = self.queue.enqueue(item);
            if !queue_full {
                log::info!("Queued a new ingest operation. Queue items: {}.", self.queue.len());
            } else {
                log::info!("Queue full.");
            }
        }
    }
}

/// The long-running operation offered to the queue: reads the sampled stream
/// until shutdown, reconnecting on clean end-of-stream.
///
/// Decode and transport failures are deliberately not caught here; they
/// terminate the work item and surface in the worker.
async fn ingest_forever(
    repository: Arc<dyn SampleStream>,
    stop: CancellationToken,
) -> Result<()> {
    let correlation_id = Uuid::new_v4();
    log::info!("Queued work item {correlation_id} is starting.");

    while !stop.is_cancelled() {
        match repository.sample_stream(&stop).await {
            Ok(()) => {
                log::info!(
                    "Ingested records so far: {}.",
                    repository.record_count().await
                );
            }
            Err(FeedError::Cancelled) => break,
            Err(e) => return Err(e.into()),
        }
    }

    log::info!("Queued work item {correlation_id} is done.");
    Ok(())
}
