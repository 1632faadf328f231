//! Microformats-2 extraction on top of a `scraper` document.
//!
//! Covers what webmention needs: `rels` and `rel-urls` for endpoint
//! discovery, and `h-*` items (explicit `p-`, `u-`, `dt-`, `e-` properties,
//! nested children, implied `name`/`photo`/`url`) handed to the application
//! as structured data. Output follows the canonical mf2 JSON shape.

use std::collections::BTreeMap;

use scraper::node::Element;
use scraper::{ElementRef, Html, Selector};
use serde::{Deserialize, Serialize};
use tracing::debug;
use url::Url;

use super::anchor::get_attr;

/// Nested `h-*` roots deeper than this are treated as plain markup.
const MAX_ITEM_DEPTH: usize = 32;

/// Parsed microformats of one document.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Mf2Document {
    pub items: Vec<Mf2Item>,
    pub rels: BTreeMap<String, Vec<String>>,
    #[serde(rename = "rel-urls")]
    pub rel_urls: BTreeMap<String, RelUrl>,
}

/// One `h-*` item.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Mf2Item {
    #[serde(rename = "type")]
    pub kind: Vec<String>,
    pub properties: BTreeMap<String, Vec<PropertyValue>>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<Mf2Item>,
    /// Set when the item is itself a property value of its parent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
}

impl Mf2Item {
    /// First plain-text value of a property.
    pub fn first_text(&self, name: &str) -> Option<&str> {
        self.properties
            .get(name)?
            .iter()
            .find_map(|v| match v {
                PropertyValue::Text(text) => Some(text.as_str()),
                _ => None,
            })
    }

    pub fn has_type(&self, kind: &str) -> bool {
        self.kind.iter().any(|k| k == kind)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PropertyValue {
    Text(String),
    Html(EmbeddedHtml),
    Item(Box<Mf2Item>),
}

/// Value of an `e-*` property.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmbeddedHtml {
    pub html: String,
    pub value: String,
}

/// Details of one URL found in `rel` markup.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RelUrl {
    pub rels: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub media: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hreflang: Option<String>,
    #[serde(default, rename = "type", skip_serializing_if = "Option::is_none")]
    pub media_type: Option<String>,
}

/// Parse an HTML string.
pub fn parse_html(html: &str, base: &Url) -> Mf2Document {
    parse_document(&Html::parse_document(html), base)
}

/// Extract microformats from a parsed document, resolving URLs against
/// `base` (or the document's own `<base href>` when present).
pub fn parse_document(document: &Html, base: &Url) -> Mf2Document {
    let base = document_base(document, base);

    let mut parsed = Mf2Document::default();
    collect_rels(document, &base, &mut parsed);
    parsed.items = find_items(document.root_element(), &base, 0);

    debug!(
        base = %base,
        items = parsed.items.len(),
        rels = parsed.rels.len(),
        "mf2_parsed"
    );

    parsed
}

fn document_base(document: &Html, base: &Url) -> Url {
    let selector = Selector::parse("base[href]").expect("Invalid selector");

    document
        .select(&selector)
        .next()
        .and_then(|el| el.value().attr("href"))
        .and_then(|href| base.join(href.trim()).ok())
        .unwrap_or_else(|| base.clone())
}

/// Resolve `href` against `base`, keeping the raw string when it cannot be parsed.
fn resolve(base: &Url, href: &str) -> String {
    base.join(href.trim())
        .map(|u| u.to_string())
        .unwrap_or_else(|_| href.to_string())
}

fn collect_rels(document: &Html, base: &Url, parsed: &mut Mf2Document) {
    let selector =
        Selector::parse("a[rel][href], area[rel][href], link[rel][href]").expect("Invalid selector");

    for el in document.select(&selector) {
        let element = el.value();
        let (Some(rel), Some(href)) = (element.attr("rel"), element.attr("href")) else {
            continue;
        };

        let rels: Vec<String> = rel
            .split_whitespace()
            .map(|r| r.to_ascii_lowercase())
            .collect();
        if rels.is_empty() {
            continue;
        }

        let url = resolve(base, href);

        for rel in &rels {
            let urls = parsed.rels.entry(rel.clone()).or_default();
            if !urls.contains(&url) {
                urls.push(url.clone());
            }
        }

        let entry = parsed.rel_urls.entry(url).or_default();
        for rel in rels {
            if !entry.rels.contains(&rel) {
                entry.rels.push(rel);
            }
        }
        if entry.text.is_none() {
            let text = text_content(el);
            if !text.is_empty() {
                entry.text = Some(text);
            }
        }
        fill(&mut entry.title, element.attr("title"));
        fill(&mut entry.media, element.attr("media"));
        fill(&mut entry.hreflang, element.attr("hreflang"));
        fill(&mut entry.media_type, element.attr("type"));
    }
}

fn fill(slot: &mut Option<String>, value: Option<&str>) {
    if slot.is_none() {
        *slot = value.map(str::to_string);
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Prefix {
    P,
    U,
    Dt,
    E,
}

#[derive(Debug, Default)]
struct Classes {
    roots: Vec<String>,
    properties: Vec<(Prefix, String)>,
}

fn classify(element: &Element) -> Classes {
    let mut classes = Classes::default();

    for class in element.classes() {
        if let Some(name) = class.strip_prefix("h-") {
            if is_valid_name(name) {
                classes.roots.push(class.to_string());
            }
            continue;
        }

        let property = [
            ("p-", Prefix::P),
            ("u-", Prefix::U),
            ("dt-", Prefix::Dt),
            ("e-", Prefix::E),
        ]
        .into_iter()
        .find_map(|(p, prefix)| class.strip_prefix(p).map(|name| (prefix, name)));

        if let Some((prefix, name)) = property {
            if is_valid_name(name) {
                classes.properties.push((prefix, name.to_string()));
            }
        }
    }

    classes.roots.sort();
    classes.roots.dedup();
    classes
}

fn is_valid_name(name: &str) -> bool {
    !name.is_empty()
        && !name.starts_with('-')
        && !name.ends_with('-')
        && name.chars().any(|c| c.is_ascii_lowercase())
        && name
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-')
}

fn push_children<'a>(stack: &mut Vec<ElementRef<'a>>, el: ElementRef<'a>) {
    let mut child = el.last_child();
    while let Some(node) = child {
        if let Some(child_el) = ElementRef::wrap(node) {
            stack.push(child_el);
        }
        child = node.prev_sibling();
    }
}

/// Top-level items below (and including) `scope`.
fn find_items(scope: ElementRef<'_>, base: &Url, depth: usize) -> Vec<Mf2Item> {
    let mut items = Vec::new();
    let mut stack = vec![scope];

    while let Some(el) = stack.pop() {
        let classes = classify(el.value());
        if !classes.roots.is_empty() {
            items.push(parse_item(el, classes.roots, base, depth));
            continue;
        }
        push_children(&mut stack, el);
    }

    items
}

fn parse_item(root: ElementRef<'_>, kind: Vec<String>, base: &Url, depth: usize) -> Mf2Item {
    let mut item = Mf2Item {
        kind,
        ..Default::default()
    };
    let mut has_p_or_e = false;
    let mut has_u = false;
    let mut has_nested = false;

    let mut stack = Vec::new();
    push_children(&mut stack, root);

    while let Some(el) = stack.pop() {
        let classes = classify(el.value());

        if !classes.roots.is_empty() && depth + 1 < MAX_ITEM_DEPTH {
            has_nested = true;
            let nested = parse_item(el, classes.roots, base, depth + 1);

            if classes.properties.is_empty() {
                item.children.push(nested);
                continue;
            }

            for (prefix, name) in &classes.properties {
                let implied_value = match prefix {
                    Prefix::U => {
                        has_u = true;
                        nested.first_text("url")
                    }
                    Prefix::P | Prefix::E => {
                        has_p_or_e = true;
                        nested.first_text("name")
                    }
                    Prefix::Dt => nested.first_text("name"),
                };
                let mut embedded = nested.clone();
                embedded.value = Some(
                    implied_value
                        .map(str::to_string)
                        .unwrap_or_else(|| text_content(el)),
                );
                push_property(&mut item, name, PropertyValue::Item(Box::new(embedded)));
            }
            continue;
        }

        for (prefix, name) in &classes.properties {
            let value = match prefix {
                Prefix::P => {
                    has_p_or_e = true;
                    PropertyValue::Text(p_value(el))
                }
                Prefix::U => {
                    has_u = true;
                    PropertyValue::Text(u_value(el, base))
                }
                Prefix::Dt => PropertyValue::Text(dt_value(el)),
                Prefix::E => {
                    has_p_or_e = true;
                    PropertyValue::Html(EmbeddedHtml {
                        html: el.inner_html().trim().to_string(),
                        value: text_content(el),
                    })
                }
            };
            push_property(&mut item, name, value);
        }

        push_children(&mut stack, el);
    }

    if !has_nested {
        if !has_p_or_e && !item.properties.contains_key("name") {
            let name = implied_name(root);
            if !name.is_empty() {
                push_property(&mut item, "name", PropertyValue::Text(name));
            }
        }
        if !has_u && !item.properties.contains_key("photo") {
            if let Some(photo) = implied_photo(root, base) {
                push_property(&mut item, "photo", PropertyValue::Text(photo));
            }
        }
        if !has_u && !item.properties.contains_key("url") {
            if let Some(url) = implied_url(root, base) {
                push_property(&mut item, "url", PropertyValue::Text(url));
            }
        }
    }

    item
}

fn push_property(item: &mut Mf2Item, name: &str, value: PropertyValue) {
    item.properties
        .entry(name.to_string())
        .or_default()
        .push(value);
}

fn text_content(el: ElementRef<'_>) -> String {
    el.text().collect::<String>().trim().to_string()
}

fn attr_or_text(el: ElementRef<'_>, attr: Option<&str>) -> String {
    attr.map(|v| v.trim().to_string())
        .unwrap_or_else(|| text_content(el))
}

fn p_value(el: ElementRef<'_>) -> String {
    let element = el.value();
    let attr = match element.name() {
        "img" | "area" => get_attr(element, "alt"),
        "abbr" | "link" => get_attr(element, "title"),
        "data" | "input" => get_attr(element, "value"),
        _ => None,
    };
    attr_or_text(el, attr)
}

fn u_value(el: ElementRef<'_>, base: &Url) -> String {
    let element = el.value();
    let link = match element.name() {
        "a" | "area" | "link" => get_attr(element, "href"),
        "img" | "audio" | "source" | "iframe" => get_attr(element, "src"),
        "video" => get_attr(element, "src").or_else(|| get_attr(element, "poster")),
        "object" => get_attr(element, "data"),
        _ => None,
    };
    if let Some(link) = link {
        return resolve(base, link);
    }

    let attr = match element.name() {
        "abbr" => get_attr(element, "title"),
        "data" | "input" => get_attr(element, "value"),
        _ => None,
    };
    attr_or_text(el, attr)
}

fn dt_value(el: ElementRef<'_>) -> String {
    let element = el.value();
    let attr = match element.name() {
        "time" | "ins" | "del" => get_attr(element, "datetime"),
        "abbr" => get_attr(element, "title"),
        "data" | "input" => get_attr(element, "value"),
        _ => None,
    };
    attr_or_text(el, attr)
}

/// Child elements of `el` with the given tag name.
fn child_elements<'a>(el: ElementRef<'a>, tag: &'a str) -> impl Iterator<Item = ElementRef<'a>> {
    el.children()
        .filter_map(ElementRef::wrap)
        .filter(move |child| child.value().name() == tag)
}

fn implied_name(root: ElementRef<'_>) -> String {
    let element = root.value();
    let attr = match element.name() {
        "img" | "area" => get_attr(element, "alt"),
        "abbr" => get_attr(element, "title"),
        _ => None,
    };
    attr_or_text(root, attr)
}

fn implied_photo(root: ElementRef<'_>, base: &Url) -> Option<String> {
    let element = root.value();
    let direct = match element.name() {
        "img" => get_attr(element, "src"),
        "object" => get_attr(element, "data"),
        _ => None,
    };
    if let Some(src) = direct {
        return Some(resolve(base, src));
    }

    let images: Vec<ElementRef<'_>> = child_elements(root, "img").collect();
    match images.as_slice() {
        [only] => get_attr(only.value(), "src").map(|src| resolve(base, src)),
        _ => None,
    }
}

fn implied_url(root: ElementRef<'_>, base: &Url) -> Option<String> {
    let element = root.value();
    if matches!(element.name(), "a" | "area") {
        return get_attr(element, "href").map(|href| resolve(base, href));
    }

    let anchors: Vec<ElementRef<'_>> = child_elements(root, "a").collect();
    match anchors.as_slice() {
        [only] => get_attr(only.value(), "href").map(|href| resolve(base, href)),
        _ => None,
    }
}
