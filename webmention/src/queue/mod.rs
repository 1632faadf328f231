//! Bounded in-process mention queue.
//!
//! ```text
//! Receiver endpoint → MentionQueue (FIFO, bounded) → MentionReceiver → workers
//! ```
//!
//! Any number of request handlers enqueue through cloned [`MentionQueue`]
//! handles. One or more workers share the [`MentionReceiver`]; each request
//! is handed to exactly one of them.

pub mod types;

pub use types::{MentionRequest, VerifiedMention};

use std::sync::Arc;

use tokio::sync::mpsc::{self, error::TrySendError};
use tokio::sync::Mutex;
use tracing::debug;

use crate::config::QueueFullPolicy;
use crate::error::{Result, WebmentionError};

/// Producer half of the mention queue.
#[derive(Clone)]
pub struct MentionQueue {
    sender: mpsc::Sender<MentionRequest>,
    policy: QueueFullPolicy,
}

/// Consumer half of the mention queue, shareable between workers.
#[derive(Clone)]
pub struct MentionReceiver {
    inner: Arc<Mutex<mpsc::Receiver<MentionRequest>>>,
}

/// Create a queue holding at most `capacity` pending mentions.
pub fn channel(capacity: usize, policy: QueueFullPolicy) -> (MentionQueue, MentionReceiver) {
    let (sender, receiver) = mpsc::channel(capacity.max(1));
    (
        MentionQueue { sender, policy },
        MentionReceiver {
            inner: Arc::new(Mutex::new(receiver)),
        },
    )
}

impl MentionQueue {
    /// Enqueue a mention according to the configured full-queue policy.
    ///
    /// With [`QueueFullPolicy::Block`] this waits for a free slot; with
    /// [`QueueFullPolicy::Reject`] a full queue yields [`WebmentionError::QueueFull`].
    pub async fn enqueue(&self, request: MentionRequest) -> Result<()> {
        match self.policy {
            QueueFullPolicy::Block => self
                .sender
                .send(request)
                .await
                .map_err(|_| WebmentionError::QueueClosed),
            QueueFullPolicy::Reject => self.sender.try_send(request).map_err(|e| match e {
                TrySendError::Full(_) => WebmentionError::QueueFull,
                TrySendError::Closed(_) => WebmentionError::QueueClosed,
            }),
        }?;

        debug!(queued = self.len(), "mention_queued");
        Ok(())
    }

    /// Number of mentions waiting for a worker.
    pub fn len(&self) -> usize {
        self.sender.max_capacity() - self.sender.capacity()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn capacity(&self) -> usize {
        self.sender.max_capacity()
    }

    pub fn policy(&self) -> QueueFullPolicy {
        self.policy
    }

    pub fn is_closed(&self) -> bool {
        self.sender.is_closed()
    }
}

impl MentionReceiver {
    /// Wait for the next mention. `None` once the queue is closed and empty.
    pub async fn recv(&self) -> Option<MentionRequest> {
        self.inner.lock().await.recv().await
    }

    /// Stop accepting new mentions. Already queued ones stay receivable.
    pub async fn close(&self) {
        self.inner.lock().await.close();
    }

    /// Take one already queued mention without waiting for new ones.
    pub async fn try_recv(&self) -> Option<MentionRequest> {
        self.inner.lock().await.try_recv().ok()
    }
}
