//! Mention types flowing through the queue.

use serde::Serialize;
use url::Url;

use crate::error::ValidationError;
use crate::html::Mf2Document;

/// An accepted but not yet verified webmention.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MentionRequest {
    pub source: Url,
    pub target: Url,
}

impl MentionRequest {
    pub fn new(source: Url, target: Url) -> Self {
        Self { source, target }
    }

    /// Validate raw inbound form values.
    ///
    /// Both must be present, non-empty and parse as absolute URLs.
    pub fn from_form(
        source: Option<&str>,
        target: Option<&str>,
    ) -> Result<Self, ValidationError> {
        let source = required("source", source)?;
        let target = required("target", target)?;

        Ok(Self {
            source: parse_url("source", source)?,
            target: parse_url("target", target)?,
        })
    }
}

fn required<'a>(param: &'static str, value: Option<&'a str>) -> Result<&'a str, ValidationError> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .ok_or(ValidationError::MissingParameter(param))
}

fn parse_url(param: &'static str, value: &str) -> Result<Url, ValidationError> {
    Url::parse(value).map_err(|e| ValidationError::InvalidUrl {
        param,
        reason: e.to_string(),
    })
}

/// A mention whose source was fetched and found to reference the target.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VerifiedMention {
    pub source: Url,
    pub target: Url,
    /// Microformats of the source page; present only when an anchor to the
    /// target was found in its markup.
    pub data: Option<Mf2Document>,
}
