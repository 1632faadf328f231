//! Webmention receiver endpoint handlers.
//!
//! These handlers are designed to be extremely fast - they only:
//! 1. Validate `source` and `target`
//! 2. Enqueue the mention
//! 3. Return 202 Accepted
//!
//! Fetching and verifying the source happens in the background workers.

use axum::{
    body::Bytes,
    extract::{RawQuery, State},
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};
use url::form_urlencoded;

use crate::error::WebmentionError;
use crate::queue::{MentionQueue, MentionRequest};

/// Seconds a client is asked to wait after a full-queue rejection.
const RETRY_AFTER_SECS: u64 = 30;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub queue: MentionQueue,
}

impl AppState {
    pub fn new(queue: MentionQueue) -> Self {
        Self { queue }
    }
}

// =============================================================================
// Health Check
// =============================================================================

/// Health check response.
#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub queued: usize,
    pub capacity: usize,
    pub accepting: bool,
}

/// Health check endpoint.
pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    let accepting = !state.queue.is_closed();
    Json(HealthResponse {
        status: if accepting { "ok" } else { "shutting_down" }.to_string(),
        queued: state.queue.len(),
        capacity: state.queue.capacity(),
        accepting,
    })
}

// =============================================================================
// Webmention Receiver
// =============================================================================

/// `source` and `target` of an inbound webmention.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct WebmentionForm {
    pub source: Option<String>,
    pub target: Option<String>,
}

impl WebmentionForm {
    /// Collect the fields from a urlencoded body and the query string.
    ///
    /// The body only counts when it is declared as
    /// `application/x-www-form-urlencoded`. Body values take precedence over
    /// query values, and the first occurrence of a repeated field wins.
    pub fn from_request(content_type: Option<&str>, body: &[u8], query: Option<&str>) -> Self {
        let mut form = WebmentionForm::default();

        let is_form = content_type
            .and_then(|ct| ct.split(';').next())
            .is_some_and(|mime| {
                mime.trim()
                    .eq_ignore_ascii_case("application/x-www-form-urlencoded")
            });
        if is_form {
            form.fill_from(body);
        }
        if let Some(query) = query {
            form.fill_from(query.as_bytes());
        }

        form
    }

    fn fill_from(&mut self, input: &[u8]) {
        for (key, value) in form_urlencoded::parse(input) {
            let slot = match key.as_ref() {
                "source" => &mut self.source,
                "target" => &mut self.target,
                _ => continue,
            };
            if slot.is_none() {
                *slot = Some(value.into_owned());
            }
        }
    }
}

/// Webmention receiver endpoint.
///
/// Answers 400 for missing or unparseable URLs, 503 when the queue refuses
/// the mention, and 202 once it is queued.
pub async fn receive_webmention(
    State(state): State<AppState>,
    headers: HeaderMap,
    RawQuery(query): RawQuery,
    body: Bytes,
) -> Response {
    let content_type = headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok());
    let form = WebmentionForm::from_request(content_type, &body, query.as_deref());

    let request = match MentionRequest::from_form(form.source.as_deref(), form.target.as_deref())
    {
        Ok(request) => request,
        Err(e) => {
            warn!(
                source = ?form.source,
                target = ?form.target,
                error = %e,
                "invalid_webmention_received"
            );
            return (StatusCode::BAD_REQUEST, format!("Bad Request: {e}")).into_response();
        }
    };

    let source = request.source.to_string();
    let target = request.target.to_string();

    match state.queue.enqueue(request).await {
        Ok(()) => {
            info!(
                source = %source,
                target = %target,
                queued = state.queue.len(),
                "webmention_enqueued"
            );
            (StatusCode::ACCEPTED, "Accepted").into_response()
        }
        Err(WebmentionError::QueueFull) => {
            warn!(
                source = %source,
                target = %target,
                capacity = state.queue.capacity(),
                "webmention_queue_full"
            );
            (
                StatusCode::SERVICE_UNAVAILABLE,
                [(header::RETRY_AFTER, RETRY_AFTER_SECS.to_string())],
                "Service Unavailable: mention queue is full",
            )
                .into_response()
        }
        Err(e) => {
            error!(source = %source, target = %target, error = %e, "webmention_enqueue_failed");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                "Service Unavailable: not accepting mentions",
            )
                .into_response()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::QueueFullPolicy;
    use crate::queue::channel;
    use url::Url;

    const FORM: &str = "application/x-www-form-urlencoded";

    fn form_headers() -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(header::CONTENT_TYPE, FORM.parse().unwrap());
        headers
    }

    async fn post(state: AppState, source: &str, target: &str) -> Response {
        let body = form_urlencoded::Serializer::new(String::new())
            .append_pair("source", source)
            .append_pair("target", target)
            .finish();
        receive_webmention(State(state), form_headers(), RawQuery(None), Bytes::from(body)).await
    }

    #[tokio::test]
    async fn test_accepts_valid_mention() {
        let (queue, receiver) = channel(10, QueueFullPolicy::Block);
        let state = AppState::new(queue.clone());

        let response = post(state, "https://a.example/post", "https://b.example/article").await;

        assert_eq!(response.status(), StatusCode::ACCEPTED);
        assert_eq!(queue.len(), 1);
        let queued = receiver.recv().await.unwrap();
        assert_eq!(queued.source, Url::parse("https://a.example/post").unwrap());
        assert_eq!(queued.target, Url::parse("https://b.example/article").unwrap());
    }

    #[tokio::test]
    async fn test_empty_target_is_bad_request() {
        let (queue, _receiver) = channel(10, QueueFullPolicy::Block);
        let state = AppState::new(queue.clone());

        let response = post(state, "https://a.example/post", "").await;

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(queue.len(), 0);
    }

    #[tokio::test]
    async fn test_missing_source_is_bad_request() {
        let (queue, _receiver) = channel(10, QueueFullPolicy::Block);
        let state = AppState::new(queue.clone());

        let response = receive_webmention(
            State(state),
            form_headers(),
            RawQuery(None),
            Bytes::from_static(b"target=https%3A%2F%2Fb.example%2Farticle"),
        )
        .await;

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert!(queue.is_empty());
    }

    #[tokio::test]
    async fn test_unparseable_url_is_bad_request() {
        let (queue, _receiver) = channel(10, QueueFullPolicy::Block);
        let state = AppState::new(queue.clone());

        let response = post(state, "not a url", "https://b.example/article").await;

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert!(queue.is_empty());
    }

    #[tokio::test]
    async fn test_full_queue_with_reject_policy() {
        let (queue, _receiver) = channel(1, QueueFullPolicy::Reject);
        let state = AppState::new(queue.clone());

        let first = post(state.clone(), "https://a.example/1", "https://b.example/article").await;
        assert_eq!(first.status(), StatusCode::ACCEPTED);

        let second = post(state, "https://a.example/2", "https://b.example/article").await;
        assert_eq!(second.status(), StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(
            second.headers()[header::RETRY_AFTER].to_str().unwrap(),
            RETRY_AFTER_SECS.to_string()
        );
        assert_eq!(queue.len(), 1);
    }

    #[tokio::test]
    async fn test_closed_queue_is_unavailable() {
        let (queue, receiver) = channel(4, QueueFullPolicy::Block);
        receiver.close().await;
        let state = AppState::new(queue);

        let response = post(state, "https://a.example/post", "https://b.example/article").await;
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    }

    #[test]
    fn test_form_reads_body_then_query() {
        let form = WebmentionForm::from_request(
            Some("application/x-www-form-urlencoded; charset=UTF-8"),
            b"source=https%3A%2F%2Fa.example%2Fpost",
            Some("source=https://ignored.example/&target=https://b.example/article"),
        );
        assert_eq!(form.source.as_deref(), Some("https://a.example/post"));
        assert_eq!(form.target.as_deref(), Some("https://b.example/article"));
    }

    #[test]
    fn test_form_ignores_body_of_other_content_types() {
        let form = WebmentionForm::from_request(
            Some("application/json"),
            b"source=https%3A%2F%2Fa.example%2Fpost",
            None,
        );
        assert_eq!(form, WebmentionForm::default());

        let form = WebmentionForm::from_request(None, b"", None);
        assert_eq!(form, WebmentionForm::default());
    }

    #[test]
    fn test_form_first_value_wins() {
        let form = WebmentionForm::from_request(
            Some(FORM),
            b"source=https%3A%2F%2Fa.example%2Fpost&source=x&target=",
            None,
        );
        assert_eq!(form.source.as_deref(), Some("https://a.example/post"));
        assert_eq!(form.target.as_deref(), Some(""));
    }

    #[tokio::test]
    async fn test_health_reports_queue() {
        let (queue, _receiver) = channel(5, QueueFullPolicy::Block);
        let state = AppState::new(queue);

        let Json(health) = health(State(state)).await;
        assert_eq!(health.status, "ok");
        assert_eq!(health.queued, 0);
        assert_eq!(health.capacity, 5);
        assert!(health.accepting);
    }
}
