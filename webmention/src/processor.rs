//! Mention verification - the core of the receiving side.
//!
//! For each accepted mention the source is fetched again and checked for a
//! link to the target. Only verified mentions reach the application handler;
//! everything else is logged and dropped. No step is retried.

use std::sync::Arc;

use reqwest::Client;
use scraper::Html;
use tracing::{error, info, warn};
use url::Url;

use crate::handler::MentionHandler;
use crate::html::{contains_link, microformats, Mf2Document};
use crate::http::{self, FetchOptions};
use crate::link::parse_link_headers;
use crate::queue::{MentionRequest, VerifiedMention};

/// Terminal state of one processed mention.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcessOutcome {
    /// The source links to the target; the handler got its microformats.
    VerifiedWithData,
    /// No anchor, but the source exposes `Link` headers; handler got no data.
    VerifiedWithoutData,
    /// The source could not be fetched.
    DroppedFetch,
    /// The source body could not be read or parsed.
    DroppedParse,
    /// Neither an anchor nor `Link` headers; the handler was not called.
    Unverifiable,
}

impl ProcessOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProcessOutcome::VerifiedWithData => "verified_with_data",
            ProcessOutcome::VerifiedWithoutData => "verified_without_data",
            ProcessOutcome::DroppedFetch => "dropped_fetch",
            ProcessOutcome::DroppedParse => "dropped_parse",
            ProcessOutcome::Unverifiable => "unverifiable",
        }
    }

    pub fn is_verified(&self) -> bool {
        matches!(
            self,
            ProcessOutcome::VerifiedWithData | ProcessOutcome::VerifiedWithoutData
        )
    }
}

/// Verifies queued mentions and hands them to the application.
#[derive(Clone)]
pub struct MentionProcessor {
    client: Client,
    options: FetchOptions,
    handler: Arc<dyn MentionHandler>,
}

impl MentionProcessor {
    pub fn new(client: Client, options: FetchOptions, handler: Arc<dyn MentionHandler>) -> Self {
        Self {
            client,
            options,
            handler,
        }
    }

    /// Process a single mention.
    ///
    /// This function:
    /// 1. Fetches the source
    /// 2. Searches its markup for an anchor pointing at the target
    /// 3. On a match, extracts microformats and calls the handler with them
    /// 4. Otherwise calls the handler without data if the source sent `Link` headers
    /// 5. Otherwise drops the mention as unverifiable
    pub async fn process(&self, request: &MentionRequest) -> ProcessOutcome {
        let source = &request.source;
        let target = &request.target;

        info!(source = %source, target = %target, "mention_processing_started");

        let response = match http::get(&self.client, source, &self.options).await {
            Ok(response) => response,
            Err(e) => {
                error!(source = %source, target = %target, error = %e, "error_getting_source");
                return ProcessOutcome::DroppedFetch;
            }
        };

        let link_count = parse_link_headers(http::link_header_values(response.headers())).len();

        let body = match http::read_body(response, self.options.max_body_bytes).await {
            Ok(body) => body,
            Err(e) => {
                error!(source = %source, target = %target, error = %e, "error_reading_source");
                return if e.is_fetch() {
                    ProcessOutcome::DroppedFetch
                } else {
                    ProcessOutcome::DroppedParse
                };
            }
        };

        let (data, outcome) = match verify(&body, source, target) {
            Some(data) => (Some(data), ProcessOutcome::VerifiedWithData),
            None if link_count > 0 => (None, ProcessOutcome::VerifiedWithoutData),
            None => {
                warn!(source = %source, target = %target, "no_links_found_on_source");
                return ProcessOutcome::Unverifiable;
            }
        };

        let mention = VerifiedMention {
            source: source.clone(),
            target: target.clone(),
            data,
        };

        match self.handler.handle(mention).await {
            Ok(()) => info!(
                source = %source,
                target = %target,
                outcome = outcome.as_str(),
                "webmention_processed"
            ),
            Err(e) => error!(
                source = %source,
                target = %target,
                outcome = outcome.as_str(),
                error = %e,
                "error_processing_webmention"
            ),
        }

        outcome
    }
}

/// Microformats of the source if it links to the target.
///
/// Kept synchronous: the parsed document is not `Send` and must not live
/// across an await point.
fn verify(body: &str, source: &Url, target: &Url) -> Option<Mf2Document> {
    let document = Html::parse_document(body);
    if !contains_link(&document, source, target) {
        return None;
    }
    Some(microformats::parse_document(&document, source))
}
