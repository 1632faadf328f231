//! Error types shared by discovery, delivery, the receiver and the processor.

use thiserror::Error;

/// Result alias used throughout the library.
pub type Result<T> = std::result::Result<T, WebmentionError>;

/// Inbound request validation failures, surfaced to the caller as 400.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Missing required parameter: {0}")]
    MissingParameter(&'static str),

    #[error("Invalid URL for {param}: {reason}")]
    InvalidUrl { param: &'static str, reason: String },
}

/// Errors produced while talking to remote sites or the mention queue.
#[derive(Debug, Error)]
pub enum WebmentionError {
    /// Transport failure fetching a remote resource.
    #[error("Failed to fetch {url}: {reason}")]
    Fetch { url: String, reason: String },

    /// Remote resource answered with a non-2xx status.
    #[error("Fetching {url} returned status {status}")]
    FetchStatus { url: String, status: u16 },

    /// Unreadable body or unparseable URL found in page content.
    #[error("Failed to parse {context}: {reason}")]
    Parse { context: String, reason: String },

    /// Posting the notification to the discovered endpoint failed.
    #[error("Delivery to {endpoint} failed: {reason}")]
    Delivery {
        endpoint: String,
        status: Option<u16>,
        reason: String,
    },

    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// The queue is at capacity and the reject policy is active.
    #[error("Mention queue is full")]
    QueueFull,

    /// The queue no longer accepts mentions (shutting down).
    #[error("Mention queue is closed")]
    QueueClosed,

    #[error("Failed to build HTTP client: {0}")]
    Client(#[source] reqwest::Error),
}

impl WebmentionError {
    /// True for errors raised while fetching a remote resource.
    pub fn is_fetch(&self) -> bool {
        matches!(
            self,
            WebmentionError::Fetch { .. } | WebmentionError::FetchStatus { .. }
        )
    }
}
