//! Background workers draining the mention queue.
//!
//! Each worker blocks on the queue and processes one mention at a time, as
//! soon as it is available. On shutdown the queue is closed to new mentions
//! and the workers finish whatever was already accepted before exiting.

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{info, warn};

use crate::processor::MentionProcessor;
use crate::queue::MentionReceiver;

/// Spawn `concurrency` workers sharing `receiver`.
pub fn spawn_workers(
    concurrency: usize,
    receiver: MentionReceiver,
    processor: MentionProcessor,
    shutdown: watch::Receiver<bool>,
) -> Vec<JoinHandle<()>> {
    (0..concurrency.max(1))
        .map(|worker_id| {
            tokio::spawn(run_worker(
                worker_id,
                receiver.clone(),
                processor.clone(),
                shutdown.clone(),
            ))
        })
        .collect()
}

/// Run one worker until shutdown is signalled or the queue closes.
pub async fn run_worker(
    worker_id: usize,
    receiver: MentionReceiver,
    processor: MentionProcessor,
    mut shutdown: watch::Receiver<bool>,
) {
    info!(worker_id = worker_id, "mention_worker_started");

    let mut processed: u64 = 0;

    while !*shutdown.borrow() {
        tokio::select! {
            changed = shutdown.changed() => {
                if changed.is_err() {
                    warn!(worker_id = worker_id, "shutdown_sender_dropped");
                }
                break;
            }
            request = receiver.recv() => {
                match request {
                    Some(request) => {
                        let outcome = processor.process(&request).await;
                        processed += 1;
                        info!(
                            worker_id = worker_id,
                            source = %request.source,
                            target = %request.target,
                            outcome = outcome.as_str(),
                            verified = outcome.is_verified(),
                            "mention_job_completed"
                        );
                    }
                    None => {
                        info!(worker_id = worker_id, "mention_queue_closed");
                        break;
                    }
                }
            }
        }
    }

    // Finish mentions accepted before the queue was closed.
    receiver.close().await;
    while let Some(request) = receiver.try_recv().await {
        let outcome = processor.process(&request).await;
        processed += 1;
        info!(
            worker_id = worker_id,
            source = %request.source,
            target = %request.target,
            outcome = outcome.as_str(),
            verified = outcome.is_verified(),
            "mention_job_drained"
        );
    }

    info!(worker_id = worker_id, processed = processed, "mention_worker_stopped");
}
