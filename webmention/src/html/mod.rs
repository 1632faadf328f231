//! HTML inspection: source-link verification and microformats-2 extraction.

pub mod anchor;
pub mod microformats;

pub use anchor::{contains_link, get_attr};
pub use microformats::{
    parse_document, parse_html, EmbeddedHtml, Mf2Document, Mf2Item, PropertyValue, RelUrl,
};
