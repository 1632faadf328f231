//! Web server module for receiving webmentions.
//!
//! This module provides a thin, fast receiver that:
//! - Validates inbound `source`/`target` pairs
//! - Immediately enqueues them for verification
//! - Returns 202 Accepted without waiting on the source
//!
//! All fetching and verification happens in the background workers.

pub mod handlers;

use axum::{
    routing::{get, post},
    Router,
};
use tower_http::trace::TraceLayer;

pub use handlers::{health, receive_webmention, AppState, HealthResponse, WebmentionForm};

/// Build the receiver router with the endpoint mounted at `path`.
pub fn router(state: AppState, path: &str) -> Router {
    Router::new()
        .route("/health", get(health))
        .route(path, post(receive_webmention))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::StatusCode;

    use crate::config::QueueFullPolicy;
    use crate::queue::channel;
    use crate::test_support::{serve, url_for};

    #[tokio::test]
    async fn test_router_accepts_form_posts() {
        let (queue, receiver) = channel(10, QueueFullPolicy::Block);
        let addr = serve(router(AppState::new(queue.clone()), "/webmention")).await;
        let client = reqwest::Client::new();

        let response = client
            .post(url_for(addr, "/webmention"))
            .header("Content-Type", "application/x-www-form-urlencoded")
            .body("source=https%3A%2F%2Fa.example%2Fpost&target=https%3A%2F%2Fb.example%2Farticle")
            .send()
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::ACCEPTED);
        let queued = receiver.recv().await.unwrap();
        assert_eq!(queued.source.as_str(), "https://a.example/post");
        assert_eq!(queued.target.as_str(), "https://b.example/article");
    }

    #[tokio::test]
    async fn test_router_rejects_empty_target_with_plain_text() {
        let (queue, _receiver) = channel(10, QueueFullPolicy::Block);
        let addr = serve(router(AppState::new(queue.clone()), "/webmention")).await;
        let client = reqwest::Client::new();

        let response = client
            .post(url_for(addr, "/webmention"))
            .header("Content-Type", "application/x-www-form-urlencoded")
            .body("source=https%3A%2F%2Fa.example%2Fpost&target=")
            .send()
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert!(response
            .headers()
            .get("content-type")
            .and_then(|v| v.to_str().ok())
            .is_some_and(|ct| ct.starts_with("text/plain")));
        assert!(queue.is_empty());
    }

    #[tokio::test]
    async fn test_router_bare_post_is_bad_request() {
        let (queue, _receiver) = channel(10, QueueFullPolicy::Block);
        let addr = serve(router(AppState::new(queue.clone()), "/webmention")).await;

        let response = reqwest::Client::new()
            .post(url_for(addr, "/webmention"))
            .send()
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert!(response.text().await.unwrap().starts_with("Bad Request"));
        assert!(queue.is_empty());
    }

    #[tokio::test]
    async fn test_router_accepts_query_string_fields() {
        let (queue, receiver) = channel(10, QueueFullPolicy::Block);
        let addr = serve(router(AppState::new(queue.clone()), "/webmention")).await;

        let response = reqwest::Client::new()
            .post(url_for(
                addr,
                "/webmention?source=https%3A%2F%2Fa.example%2Fpost&target=https%3A%2F%2Fb.example%2Farticle",
            ))
            .send()
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::ACCEPTED);
        let queued = receiver.recv().await.unwrap();
        assert_eq!(queued.source.as_str(), "https://a.example/post");
        assert_eq!(queued.target.as_str(), "https://b.example/article");
    }

    #[tokio::test]
    async fn test_router_repeated_source_with_empty_target_is_bad_request() {
        let (queue, _receiver) = channel(10, QueueFullPolicy::Block);
        let addr = serve(router(AppState::new(queue.clone()), "/webmention")).await;

        let response = reqwest::Client::new()
            .post(url_for(addr, "/webmention"))
            .header("Content-Type", "application/x-www-form-urlencoded")
            .body("source=https%3A%2F%2Fa.example%2Fpost&source=x&target=")
            .send()
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert!(queue.is_empty());
    }

    #[tokio::test]
    async fn test_router_health() {
        let (queue, _receiver) = channel(7, QueueFullPolicy::Block);
        let addr = serve(router(AppState::new(queue), "/webmention")).await;

        let health: HealthResponse = reqwest::get(url_for(addr, "/health"))
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        assert_eq!(health.capacity, 7);
    }
}
