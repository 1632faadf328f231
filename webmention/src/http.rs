//! Outbound HTTP helpers shared by discovery, delivery and verification.

use std::time::Duration;

use reqwest::header::{HeaderMap, LINK};
use reqwest::{Client, RequestBuilder, Response};
use tracing::{debug, error};
use url::Url;

use crate::config::Config;
use crate::error::{Result, WebmentionError};
use crate::util::user_agent::{build_headers, pick_user_agent};

/// Per-request settings derived from [`Config`].
#[derive(Debug, Clone)]
pub struct FetchOptions {
    pub timeout: Duration,
    pub max_body_bytes: usize,
    pub user_agent_pool: Option<Vec<String>>,
}

impl FetchOptions {
    pub fn from_config(config: &Config) -> Self {
        Self {
            timeout: config.request_timeout(),
            max_body_bytes: config.max_body_bytes,
            user_agent_pool: config.user_agent_pool.clone(),
        }
    }

    /// Attach the timeout and standard headers to a request.
    pub fn apply(&self, mut request: RequestBuilder) -> RequestBuilder {
        let user_agent = pick_user_agent(self.user_agent_pool.as_deref());
        for (key, value) in build_headers(&user_agent) {
            request = request.header(key.as_str(), value.as_str());
        }
        request.timeout(self.timeout)
    }
}

impl Default for FetchOptions {
    fn default() -> Self {
        Self::from_config(&Config::default())
    }
}

/// Build the shared HTTP client.
pub fn build_client() -> Result<Client> {
    Client::builder()
        .pool_max_idle_per_host(16)
        .build()
        .map_err(WebmentionError::Client)
}

/// GET `url`, failing on transport errors and non-2xx statuses.
pub async fn get(client: &Client, url: &Url, options: &FetchOptions) -> Result<Response> {
    debug!(
        url = %url,
        timeout_seconds = options.timeout.as_secs_f64(),
        "http_fetch_starting"
    );

    let response = options
        .apply(client.get(url.clone()))
        .send()
        .await
        .map_err(|e| {
            let reason = if e.is_timeout() {
                format!("timed out after {:.1}s", options.timeout.as_secs_f64())
            } else {
                e.to_string()
            };
            error!(url = %url, error = %reason, "http_fetch_failed");
            WebmentionError::Fetch {
                url: url.to_string(),
                reason,
            }
        })?;

    let status = response.status();
    debug!(url = %url, status_code = status.as_u16(), "http_fetch_complete");

    if !status.is_success() {
        return Err(WebmentionError::FetchStatus {
            url: url.to_string(),
            status: status.as_u16(),
        });
    }

    Ok(response)
}

/// Read a response body as text, refusing bodies larger than `limit` bytes.
pub async fn read_body(mut response: Response, limit: usize) -> Result<String> {
    let url = response.url().to_string();
    let mut body = Vec::new();

    loop {
        let chunk = response
            .chunk()
            .await
            .map_err(|e| WebmentionError::Fetch {
                url: url.clone(),
                reason: e.to_string(),
            })?;

        let Some(chunk) = chunk else {
            break;
        };

        if body.len() + chunk.len() > limit {
            return Err(WebmentionError::Parse {
                context: format!("body of {url}"),
                reason: format!("exceeds {limit} bytes"),
            });
        }
        body.extend_from_slice(&chunk);
    }

    Ok(String::from_utf8_lossy(&body).into_owned())
}

/// All `Link` header values of a response, in order.
pub fn link_header_values(headers: &HeaderMap) -> Vec<String> {
    headers
        .get_all(LINK)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .map(str::to_string)
        .collect()
}
