//! Webmention endpoint discovery.
//!
//! The target is fetched once. `Link` headers are consulted first, in header
//! order; only when none qualifies is the body parsed for `rel="webmention"`
//! markup. Finding nothing is a normal outcome, not an error.

use reqwest::Client;
use scraper::Html;
use tracing::{error, info, warn};
use url::Url;

use crate::error::Result;
use crate::html::microformats;
use crate::http::{self, FetchOptions};
use crate::link::{parse_link_headers, LinkRelation};

/// Relation type advertising a webmention endpoint.
pub const WEBMENTION_REL: &str = "webmention";

/// Pre-standard relation still published by older sites.
const LEGACY_RELS: &[&str] = &["http://webmention.org", "http://webmention.org/"];

/// Discover the webmention endpoint of `target`.
///
/// Returns `Ok(None)` when the target does not advertise one.
pub async fn discover_endpoint(
    client: &Client,
    target: &Url,
    options: &FetchOptions,
) -> Result<Option<Url>> {
    let response = http::get(client, target, options).await.map_err(|e| {
        error!(target = %target, error = %e, "endpoint_discovery_fetch_failed");
        e
    })?;

    let links = parse_link_headers(http::link_header_values(response.headers()));
    if let Some(endpoint) = endpoint_from_links(&links, target) {
        info!(target = %target, endpoint = %endpoint, source = "link_header", "endpoint_discovered");
        return Ok(Some(endpoint));
    }

    let body = http::read_body(response, options.max_body_bytes).await?;
    let endpoint = endpoint_from_html(&body, target);

    match &endpoint {
        Some(endpoint) => {
            info!(target = %target, endpoint = %endpoint, source = "html", "endpoint_discovered")
        }
        None => info!(target = %target, "endpoint_not_advertised"),
    }

    Ok(endpoint)
}

fn is_endpoint_relation(link: &LinkRelation) -> bool {
    link.has_rel(WEBMENTION_REL) || LEGACY_RELS.iter().any(|rel| link.has_rel(rel))
}

/// First qualifying `Link` relation, resolved against the target.
pub fn endpoint_from_links(links: &[LinkRelation], target: &Url) -> Option<Url> {
    links
        .iter()
        .filter(|link| is_endpoint_relation(link))
        .find_map(|link| match target.join(&link.url) {
            Ok(endpoint) => Some(endpoint),
            Err(e) => {
                warn!(link = %link.url, error = %e, "error_parsing_webmention_link");
                None
            }
        })
}

/// First parseable `rel="webmention"` URL in the document.
pub fn endpoint_from_html(body: &str, target: &Url) -> Option<Url> {
    let mf2 = {
        let document = Html::parse_document(body);
        microformats::parse_document(&document, target)
    };

    mf2.rels
        .get(WEBMENTION_REL)
        .into_iter()
        .flatten()
        .find_map(|candidate| match Url::parse(candidate) {
            Ok(endpoint) => Some(endpoint),
            Err(e) => {
                warn!(link = %candidate, error = %e, "error_parsing_webmention_link");
                None
            }
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::response::{AppendHeaders, Html as HtmlBody};
    use axum::{http::StatusCode, routing::get, Router};
    use reqwest::header::LINK;

    use crate::error::WebmentionError;
    use crate::link::parse_link_header;
    use crate::test_support::{serve, url_for};

    fn target() -> Url {
        Url::parse("https://b.example/article").unwrap()
    }

    #[test]
    fn test_endpoint_from_links_first_match_wins() {
        let links = parse_link_header(
            r#"<https://b.example/feed>; rel=alternate, <https://one.example/wm>; rel="webmention", <https://two.example/wm>; rel=webmention"#,
        );
        assert_eq!(
            endpoint_from_links(&links, &target()),
            Some(Url::parse("https://one.example/wm").unwrap())
        );
    }

    #[test]
    fn test_endpoint_from_links_legacy_rel() {
        let links = parse_link_header(r#"<https://b.example/legacy>; rel="http://webmention.org""#);
        assert_eq!(
            endpoint_from_links(&links, &target()),
            Some(Url::parse("https://b.example/legacy").unwrap())
        );
    }

    #[test]
    fn test_endpoint_from_links_relative() {
        let links = parse_link_header(r#"</webmention?x=1>; rel=webmention"#);
        assert_eq!(
            endpoint_from_links(&links, &target()),
            Some(Url::parse("https://b.example/webmention?x=1").unwrap())
        );
    }

    #[test]
    fn test_endpoint_from_links_none() {
        let links = parse_link_header(r#"<https://b.example/feed>; rel=alternate"#);
        assert_eq!(endpoint_from_links(&links, &target()), None);
    }

    #[test]
    fn test_endpoint_from_html_link_element() {
        let body = r#"<html><head><link rel="webmention" href="/wm"></head></html>"#;
        assert_eq!(
            endpoint_from_html(body, &target()),
            Some(Url::parse("https://b.example/wm").unwrap())
        );
    }

    #[test]
    fn test_endpoint_from_html_skips_unparseable() {
        let body = r#"
            <a rel="webmention" href="http://[bad">broken</a>
            <a rel="webmention" href="https://b.example/good">good</a>
        "#;
        assert_eq!(
            endpoint_from_html(body, &target()),
            Some(Url::parse("https://b.example/good").unwrap())
        );
    }

    #[test]
    fn test_endpoint_from_html_none() {
        assert_eq!(endpoint_from_html("<p>plain page</p>", &target()), None);
    }

    #[tokio::test]
    async fn test_discover_prefers_link_header() {
        let app = Router::new().route(
            "/article",
            get(|| async {
                (
                    AppendHeaders([
                        (LINK, "<https://cdn.example/style.css>; rel=preload"),
                        (LINK, r#"<https://example.com/wm>; rel="webmention""#),
                    ]),
                    HtmlBody(r#"<link rel="webmention" href="/from-html">"#),
                )
            }),
        );
        let addr = serve(app).await;
        let client = http::build_client().unwrap();

        let endpoint = discover_endpoint(&client, &url_for(addr, "/article"), &FetchOptions::default())
            .await
            .unwrap();
        assert_eq!(endpoint, Some(Url::parse("https://example.com/wm").unwrap()));
    }

    #[tokio::test]
    async fn test_discover_falls_back_to_html() {
        let app = Router::new().route(
            "/article",
            get(|| async { HtmlBody(r#"<head><link rel="webmention" href="/wm"></head>"#) }),
        );
        let addr = serve(app).await;
        let client = http::build_client().unwrap();

        let endpoint = discover_endpoint(&client, &url_for(addr, "/article"), &FetchOptions::default())
            .await
            .unwrap();
        assert_eq!(endpoint, Some(url_for(addr, "/wm")));
    }

    #[tokio::test]
    async fn test_discover_absent_is_not_an_error() {
        let app = Router::new().route("/article", get(|| async { HtmlBody("<p>no endpoint</p>") }));
        let addr = serve(app).await;
        let client = http::build_client().unwrap();

        let endpoint = discover_endpoint(&client, &url_for(addr, "/article"), &FetchOptions::default())
            .await
            .unwrap();
        assert_eq!(endpoint, None);
    }

    #[tokio::test]
    async fn test_discover_propagates_fetch_error() {
        let app = Router::new().route("/article", get(|| async { StatusCode::NOT_FOUND }));
        let addr = serve(app).await;
        let client = http::build_client().unwrap();

        let err = discover_endpoint(&client, &url_for(addr, "/article"), &FetchOptions::default())
            .await
            .unwrap_err();
        assert!(matches!(err, WebmentionError::FetchStatus { status: 404, .. }));
    }
}
