//! Configuration module for environment variable parsing.
//!
//! Every setting has a default, so an empty environment yields a working
//! receiver on port 8080.

use std::env;
use std::str::FromStr;
use std::time::Duration;

use tracing::warn;

/// Default capacity of the in-process mention queue.
pub const DEFAULT_QUEUE_CAPACITY: usize = 100;

/// What the receiver does when the mention queue is full.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum QueueFullPolicy {
    /// Hold the inbound request until a slot frees up.
    #[default]
    Block,
    /// Answer 503 with `Retry-After` straight away.
    Reject,
}

impl FromStr for QueueFullPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "block" => Ok(QueueFullPolicy::Block),
            "reject" => Ok(QueueFullPolicy::Reject),
            other => Err(format!("unknown queue full policy: {other}")),
        }
    }
}

/// Application configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    /// Port for the receiver to listen on
    pub port: u16,

    /// Path the receiver endpoint is mounted at
    pub webmention_path: String,

    /// Maximum number of accepted mentions waiting for verification
    pub queue_capacity: usize,

    /// Number of background verification workers
    pub worker_concurrency: usize,

    /// Behaviour of the receiver when the queue is full
    pub queue_full_policy: QueueFullPolicy,

    /// HTTP request timeout in milliseconds
    pub request_timeout_ms: u64,

    /// Largest response body read from a remote page
    pub max_body_bytes: usize,

    /// Optional pool of user agents to rotate through
    pub user_agent_pool: Option<Vec<String>>,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            port: 8080,
            webmention_path: "/webmention".to_string(),
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
            worker_concurrency: 1,
            queue_full_policy: QueueFullPolicy::Block,
            request_timeout_ms: 8000,
            max_body_bytes: 5 * 1024 * 1024,
            user_agent_pool: None,
        }
    }
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Self {
        let defaults = Config::default();

        Config {
            port: parse_var("PORT", defaults.port),

            webmention_path: env::var("WEBMENTION_PATH")
                .ok()
                .map(|p| normalize_path(&p))
                .unwrap_or(defaults.webmention_path),

            queue_capacity: parse_var("QUEUE_CAPACITY", defaults.queue_capacity).max(1),

            worker_concurrency: parse_var("WORKER_CONCURRENCY", defaults.worker_concurrency)
                .max(1),

            queue_full_policy: parse_var("QUEUE_FULL_POLICY", defaults.queue_full_policy),

            request_timeout_ms: parse_var("REQUEST_TIMEOUT_MS", defaults.request_timeout_ms),

            max_body_bytes: parse_var("MAX_BODY_BYTES", defaults.max_body_bytes),

            user_agent_pool: parse_csv("USER_AGENT_POOL"),
        }
    }

    /// Timeout applied to every outbound request.
    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }
}

/// Parse an environment variable, falling back to `default` when unset or invalid.
fn parse_var<T: FromStr>(name: &str, default: T) -> T {
    let raw = match env::var(name) {
        Ok(v) => v,
        Err(_) => return default,
    };

    match raw.trim().parse() {
        Ok(value) => value,
        Err(_) => {
            warn!(env_var = name, value = %raw, "Invalid value, using default");
            default
        }
    }
}

/// Parse a comma-separated list of strings.
fn parse_csv(name: &str) -> Option<Vec<String>> {
    env::var(name).ok().map(|raw| {
        raw.split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect()
    })
}

fn normalize_path(raw: &str) -> String {
    let trimmed = raw.trim();
    if trimmed.starts_with('/') {
        trimmed.to_string()
    } else {
        format!("/{trimmed}")
    }
}
