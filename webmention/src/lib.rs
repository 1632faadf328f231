//! Webmention - asynchronous sending and receiving of webmentions.
//!
//! The library covers both sides of the protocol:
//! - Sending: discover a target's endpoint and post a `source`/`target` pair
//! - Receiving: a thin HTTP endpoint that validates and enqueues mentions,
//!   plus background workers that verify each source and hand the result to
//!   an application [`MentionHandler`]
//!
//! Two binaries are built on top of it:
//! - `webmention-receiver`: the receiving endpoint with its workers
//! - `webmention-send`: command-line discovery and sending
//!
//! ## Architecture
//!
//! ```text
//! POST /webmention → Receiver → MentionQueue → Workers → fetch source → verify → MentionHandler
//! ```

pub mod config;
pub mod consumer;
pub mod discover;
pub mod error;
pub mod handler;
pub mod html;
pub mod http;
pub mod link;
pub mod processor;
pub mod queue;
pub mod send;
pub mod service;
pub mod util;
pub mod web;

#[cfg(test)]
mod test_support;

// Re-export commonly used types
pub use config::{Config, QueueFullPolicy};
pub use discover::discover_endpoint;
pub use error::{ValidationError, WebmentionError};
pub use handler::{LoggingHandler, MentionHandler};
pub use html::Mf2Document;
pub use processor::ProcessOutcome;
pub use queue::{MentionQueue, MentionRequest, VerifiedMention};
pub use send::{send_notification, SendOutcome};
pub use service::Webmention;
pub use web::AppState;
