use std::sync::Arc;

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::stats_logic::queue::BackgroundTaskQueue;
use crate::stats_logic::repository::FeedError;

/// Consumes queued work items, isolating failures per item.
pub struct QueuedWorker {
    queue: Arc<BackgroundTaskQueue>,
    /// How many dequeued items may run concurrently before the worker waits
    /// for the whole batch. One (the default) executes every item to
    /// completion before the next dequeue.
    batch_size: usize,
}

impl QueuedWorker {
    pub fn new(queue: Arc<BackgroundTaskQueue>, batch_size: usize) -> Self {
        Self {
            queue,
            batch_size: batch_size.max(1),
        }
    }

    /// Dequeues and executes work items until shutdown. Failed items are
    /// logged and never resurrected; cancellation outcomes stay silent. On
    /// shutdown the in-flight items observe their propagated tokens and the
    /// call returns once they finish.
    pub async fn run(&self, shutdown: CancellationToken) {
        let mut batch: Vec<JoinHandle<anyhow::Result<()>>> = Vec::new();

        loop {
            let Some(item) = self.queue.dequeue(&shutdown).await else {
                break; // shutdown requested
            };

            batch.push(tokio::spawn(item(shutdown.child_token())));

            if batch.len() >= self.batch_size {
                drain(&mut batch).await;
            }
        }

        log::info!("Queued worker is stopping.");
        drain(&mut batch).await;
    }
}

async fn drain(batch: &mut Vec<JoinHandle<anyhow::Result<()>>>) {
    for handle in batch.drain(..) {
        match handle.await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => {
                // Expected shutdown path for items that surface cancellation.
                if matches!(e.downcast_ref::<FeedError>(), Some(FeedError::Cancelled)) {
                    continue;
                }
                log::error!("Error occurred executing task work item: {e:#}.");
            }
            Err(e) => log::error!("Task work item aborted: {e}."),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stats_logic::queue::WorkItem;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::time::Duration;

    fn flag_item(flag: Arc<AtomicBool>) -> WorkItem {
        Box::new(move |_cancel| {
            Box::pin(async move {
                flag.store(true, Ordering::SeqCst);
                Ok(())
            })
        })
    }

    async fn wait_for(flag: &AtomicBool) {
        tokio::time::timeout(Duration::from_secs(5), async {
            while !flag.load(Ordering::SeqCst) {
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .expect("flag never set");
    }

    #[tokio::test]
    async fn executes_items_in_submission_order() {
        let queue = Arc::new(BackgroundTaskQueue::new(3));
        let log = Arc::new(tokio::sync::Mutex::new(Vec::new()));
        let done = Arc::new(AtomicBool::new(false));

        for tag in [1usize, 2] {
            let log = Arc::clone(&log);
            let item: WorkItem = Box::new(move |_cancel| {
                Box::pin(async move {
                    // The first item dawdles; sequential execution still
                    // finishes it before the second starts.
                    if tag == 1 {
                        tokio::time::sleep(Duration::from_millis(20)).await;
                    }
                    log.lock().await.push(tag);
                    Ok(())
                })
            });
            assert!(!queue.enqueue(item));
        }
        assert!(!queue.enqueue(flag_item(Arc::clone(&done))));

        let shutdown = CancellationToken::new();
        let worker = QueuedWorker::new(Arc::clone(&queue), 1);
        let handle = {
            let shutdown = shutdown.clone();
            tokio::spawn(async move { worker.run(shutdown).await })
        };

        wait_for(&done).await;
        shutdown.cancel();
        handle.await.unwrap();

        assert_eq!(*log.lock().await, vec![1, 2]);
    }

    #[tokio::test]
    async fn continues_past_a_failing_item() {
        let queue = Arc::new(BackgroundTaskQueue::new(2));
        let done = Arc::new(AtomicBool::new(false));

        let failing: WorkItem =
            Box::new(|_cancel| Box::pin(async { Err(anyhow::anyhow!("boom")) }));
        assert!(!queue.enqueue(failing));
        assert!(!queue.enqueue(flag_item(Arc::clone(&done))));

        let shutdown = CancellationToken::new();
        let worker = QueuedWorker::new(Arc::clone(&queue), 1);
        let handle = {
            let shutdown = shutdown.clone();
            tokio::spawn(async move { worker.run(shutdown).await })
        };

        // The item after the failure still runs.
        wait_for(&done).await;
        shutdown.cancel();
        handle.await.unwrap();
    }

    #[tokio::test]
    async fn propagates_shutdown_to_the_in_flight_item() {
        let queue = Arc::new(BackgroundTaskQueue::new(1));
        let started = Arc::new(AtomicBool::new(false));
        let observed_cancel = Arc::new(AtomicBool::new(false));

        let item: WorkItem = {
            let started = Arc::clone(&started);
            let observed_cancel = Arc::clone(&observed_cancel);
            Box::new(move |cancel| {
                Box::pin(async move {
                    started.store(true, Ordering::SeqCst);
                    cancel.cancelled().await;
                    observed_cancel.store(true, Ordering::SeqCst);
                    Ok(())
                })
            })
        };
        assert!(!queue.enqueue(item));

        let shutdown = CancellationToken::new();
        let worker = QueuedWorker::new(Arc::clone(&queue), 1);
        let handle = {
            let shutdown = shutdown.clone();
            tokio::spawn(async move { worker.run(shutdown).await })
        };

        wait_for(&started).await;
        shutdown.cancel();

        // run() returns only after the in-flight item saw the signal.
        tokio::time::timeout(Duration::from_secs(5), handle)
            .await
            .expect("worker did not stop")
            .unwrap();
        assert!(observed_cancel.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn batched_worker_runs_items_concurrently() {
        let queue = Arc::new(BackgroundTaskQueue::new(2));
        let rendezvous = Arc::new(tokio::sync::Barrier::new(2));
        let met = Arc::new(AtomicBool::new(false));

        // Each item waits at the barrier; only concurrent execution of both
        // lets either finish.
        for _ in 0..2 {
            let rendezvous = Arc::clone(&rendezvous);
            let met = Arc::clone(&met);
            let item: WorkItem = Box::new(move |_cancel| {
                Box::pin(async move {
                    rendezvous.wait().await;
                    met.store(true, Ordering::SeqCst);
                    Ok(())
                })
            });
            assert!(!queue.enqueue(item));
        }

        let shutdown = CancellationToken::new();
        let worker = QueuedWorker::new(Arc::clone(&queue), 2);
        let handle = {
            let shutdown = shutdown.clone();
            tokio::spawn(async move { worker.run(shutdown).await })
        };

        wait_for(&met).await;
        shutdown.cancel();
        handle.await.unwrap();
    }

    #[tokio::test]
    async fn swallowed_cancellation_stays_silent() {
        let queue = Arc::new(BackgroundTaskQueue::new(1));
        let done = Arc::new(AtomicBool::new(false));

        let item: WorkItem = {
            let done = Arc::clone(&done);
            Box::new(move |_cancel| {
                Box::pin(async move {
                    done.store(true, Ordering::SeqCst);
                    Err(FeedError::Cancelled.into())
                })
            })
        };
        assert!(!queue.enqueue(item));

        let shutdown = CancellationToken::new();
        let worker = QueuedWorker::new(Arc::clone(&queue), 1);
        let handle = {
            let shutdown = shutdown.clone();
            tokio::spawn(async move { worker.run(shutdown).await })
        };

        // The loop keeps going after a cancellation outcome.
        wait_for(&done).await;
        shutdown.cancel();
        handle.await.unwrap();
    }
}
