use std::sync::Arc;

use anyhow::Result;
use tokio::signal;
use tokio_util::sync::CancellationToken;

mod stats_logic;
use stats_logic::monitor::FeedMonitor;
use stats_logic::queue::BackgroundTaskQueue;
use stats_logic::repository::{FeedRepository, SampleStream};
use stats_logic::worker::QueuedWorker;
use stats_logic::{config, downstream, logger};

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    let config = config::load_config();
    logger::setup_logging(&config.log_dir, &config.log_level)?;

    let shutdown = CancellationToken::new();

    // Explicit construction: every component receives its dependencies here.
    let repository = Arc::new(FeedRepository::new(&config)?);
    let queue = Arc::new(BackgroundTaskQueue::new(config.queue_capacity));
    let worker = QueuedWorker::new(Arc::clone(&queue), config.async_batch_size);
    let monitor = FeedMonitor::new(
        Arc::clone(&queue),
        Arc::clone(&repository) as Arc<dyn SampleStream>,
        shutdown.clone(),
    );

    let worker_handle = {
        let shutdown = shutdown.clone();
        tokio::spawn(async move { worker.run(shutdown).await })
    };

    let downstream_handle = tokio::spawn(downstream::run(
        config.clone(),
        Arc::clone(&repository),
        shutdown.clone(),
    ));

    let monitor_handle = tokio::spawn(async move { monitor.start().await });

    // Wait for shutdown signal
    tokio::select! {
        _ = signal::ctrl_c() => {
            log::info!("Ctrl-C received, initiating shutdown.");
        }
        _ = async {
            #[cfg(unix)]
            {
                let mut term_signal = signal::unix::signal(signal::unix::SignalKind::terminate()).unwrap();
                term_signal.recv().await;
                log::info!("SIGTERM received, initiating shutdown.");
            }
            #[cfg(not(unix))]
            {
                // On non-unix platforms, just wait forever.
                std::future::pending::<()>().await;
            }
        } => {}
    }

    // Propagate shutdown to all components
    shutdown.cancel();

    // Wait for components to shut down
    let _ = tokio::try_join!(worker_handle, monitor_handle, downstream_handle);

    log::info!("Shutdown complete.");
    Ok(())
}
