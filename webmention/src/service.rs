//! The `Webmention` service: one object owning the HTTP client, the mention
//! queue, the background workers and the application handler.

use std::sync::Arc;

use axum::Router;
use reqwest::Client;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{error, info};
use url::Url;

use crate::config::Config;
use crate::consumer::spawn_workers;
use crate::discover::discover_endpoint;
use crate::error::Result;
use crate::handler::MentionHandler;
use crate::http::{build_client, FetchOptions};
use crate::processor::MentionProcessor;
use crate::queue::{self, MentionQueue};
use crate::send::{send_notification, SendOutcome};
use crate::web::{self, AppState};

/// Sends webmentions and receives them with background verification.
///
/// Must be created inside a Tokio runtime; the verification workers start
/// immediately.
pub struct Webmention {
    config: Arc<Config>,
    client: Client,
    options: FetchOptions,
    queue: MentionQueue,
    shutdown: watch::Sender<bool>,
    workers: Vec<JoinHandle<()>>,
}

impl Webmention {
    /// Create the service with `handler` receiving verified mentions.
    pub fn new<H>(config: Config, handler: H) -> Result<Self>
    where
        H: MentionHandler + 'static,
    {
        Self::with_handler(config, Arc::new(handler))
    }

    pub fn with_handler(config: Config, handler: Arc<dyn MentionHandler>) -> Result<Self> {
        let client = build_client()?;
        let options = FetchOptions::from_config(&config);
        let (queue, receiver) = queue::channel(config.queue_capacity, config.queue_full_policy);
        let (shutdown, shutdown_rx) = watch::channel(false);

        let processor = MentionProcessor::new(client.clone(), options.clone(), handler);
        let workers = spawn_workers(
            config.worker_concurrency,
            receiver,
            processor,
            shutdown_rx,
        );

        info!(
            queue_capacity = queue.capacity(),
            queue_full_policy = ?queue.policy(),
            workers = workers.len(),
            timeout_ms = config.request_timeout_ms,
            "webmention_service_started"
        );

        Ok(Self {
            config: Arc::new(config),
            client,
            options,
            queue,
            shutdown,
            workers,
        })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Handle for enqueueing mentions directly, bypassing HTTP.
    pub fn queue(&self) -> &MentionQueue {
        &self.queue
    }

    /// Router serving the receiver endpoint and `/health`.
    pub fn router(&self) -> Router {
        web::router(AppState::new(self.queue.clone()), &self.config.webmention_path)
    }

    /// Discover the webmention endpoint advertised by `target`.
    pub async fn discover_endpoint(&self, target: &Url) -> Result<Option<Url>> {
        discover_endpoint(&self.client, target, &self.options).await
    }

    /// Notify `target` that `source` mentions it.
    pub async fn send_notification(&self, target: &Url, source: &Url) -> Result<SendOutcome> {
        send_notification(&self.client, target, source, &self.options).await
    }

    /// Stop accepting mentions, finish the queued ones and stop the workers.
    pub async fn shutdown(self) {
        info!(queued = self.queue.len(), "webmention_service_stopping");

        // Workers close the queue themselves once they leave their receive loop.
        if self.shutdown.send(true).is_err() {
            info!("mention_workers_already_stopped");
        }

        for worker in self.workers {
            if let Err(e) = worker.await {
                error!(error = %e, "mention_worker_panicked");
            }
        }

        info!("webmention_service_stopped");
    }
}
