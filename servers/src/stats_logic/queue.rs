use anyhow::Result;
use futures_util::future::BoxFuture;
use tokio::sync::mpsc;
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;

/// A deferred operation: a function of a cancellation signal to completion.
/// Created by the monitor, held by the queue, executed once by the worker.
pub type WorkItem = Box<dyn FnOnce(CancellationToken) -> BoxFuture<'static, Result<()>> + Send>;

/// Fixed-capacity FIFO buffer of deferred work items.
///
/// No priority, no deduplication; the held item count never exceeds the
/// capacity set at construction.
pub struct BackgroundTaskQueue {
    tx: mpsc::Sender<WorkItem>,
    rx: Mutex<mpsc::Receiver<WorkItem>>,
}

impl BackgroundTaskQueue {
    pub fn new(capacity: usize) -> Self {
        let (tx, rx) = mpsc::channel(capacity);
        Self {
            tx,
            rx: Mutex::new(rx),
        }
    }

    /// Offers `item` without blocking. Returns `true` when the queue had no
    /// room and the item was rejected; callers treat that as the signal to
    /// stop producing.
    pub fn enqueue(&self, item: WorkItem) -> bool {
        self.tx.try_send(item).is_err()
    }

    /// Waits until an item is available or `cancel` fires. A cancelled wait
    /// returns `None` and consumes nothing.
    pub async fn dequeue(&self, cancel: &CancellationToken) -> Option<WorkItem> {
        let mut rx = self.rx.lock().await;
        tokio::select! {
            biased;
            _ = cancel.cancelled() => None,
            item = rx.recv() => item,
        }
    }

    /// Number of items currently held.
    pub fn len(&self) -> usize {
        self.tx.max_capacity() - self.tx.capacity()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
