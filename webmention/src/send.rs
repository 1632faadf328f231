//! Sending webmentions.

use reqwest::header::CONTENT_TYPE;
use reqwest::Client;
use tracing::{error, info, warn};
use url::{form_urlencoded, Url};

use crate::discover::discover_endpoint;
use crate::error::{Result, WebmentionError};
use crate::http::FetchOptions;

/// Successful outcomes of [`send_notification`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SendOutcome {
    /// The target does not advertise an endpoint; nothing was sent.
    NoEndpoint,
    /// The endpoint accepted the notification.
    Delivered { endpoint: Url, status: u16 },
}

/// Form body for a notification: `source=...&target=...`.
pub fn notification_body(source: &Url, target: &Url) -> String {
    form_urlencoded::Serializer::new(String::new())
        .append_pair("source", source.as_str())
        .append_pair("target", target.as_str())
        .finish()
}

/// Notify `target` that `source` links to it.
///
/// Discovery errors are returned without sending. A target without an
/// endpoint completes successfully with [`SendOutcome::NoEndpoint`]. Any
/// non-2xx answer from the endpoint is a [`WebmentionError::Delivery`]; no
/// retry is attempted.
pub async fn send_notification(
    client: &Client,
    target: &Url,
    source: &Url,
    options: &FetchOptions,
) -> Result<SendOutcome> {
    let endpoint = match discover_endpoint(client, target, options).await {
        Ok(Some(endpoint)) => endpoint,
        Ok(None) => {
            warn!(source = %source, target = %target, "no_webmention_endpoint_found");
            return Ok(SendOutcome::NoEndpoint);
        }
        Err(e) => {
            error!(target = %target, error = %e, "error_retrieving_webmention_endpoint");
            return Err(e);
        }
    };

    let request = options
        .apply(client.post(endpoint.clone()))
        .header(CONTENT_TYPE, "application/x-www-form-urlencoded")
        .body(notification_body(source, target));

    match request.send().await {
        Ok(response) if response.status().is_success() => {
            let status = response.status().as_u16();
            info!(
                source = %source,
                target = %target,
                endpoint = %endpoint,
                status_code = status,
                "webmention_sent"
            );
            Ok(SendOutcome::Delivered { endpoint, status })
        }
        Ok(response) => {
            let status = response.status();
            error!(
                source = %source,
                target = %target,
                endpoint = %endpoint,
                status_code = status.as_u16(),
                "webmention_delivery_rejected"
            );
            Err(WebmentionError::Delivery {
                endpoint: endpoint.to_string(),
                status: Some(status.as_u16()),
                reason: format!("endpoint answered {status}"),
            })
        }
        Err(e) => {
            error!(
                source = %source,
                target = %target,
                endpoint = %endpoint,
                error = %e,
                "webmention_delivery_failed"
            );
            Err(WebmentionError::Delivery {
                endpoint: endpoint.to_string(),
                status: None,
                reason: e.to_string(),
            })
        }
    }
}
