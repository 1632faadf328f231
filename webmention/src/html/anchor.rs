//! Source-link verification: does a document link to the target?

use scraper::node::Element;
use scraper::Html;
use tracing::debug;
use url::Url;

/// Look up an attribute by name, ignoring ASCII case.
pub fn get_attr<'a>(element: &'a Element, name: &str) -> Option<&'a str> {
    element
        .attrs()
        .find(|(key, _)| key.eq_ignore_ascii_case(name))
        .map(|(_, value)| value)
}

/// Search `document` depth-first for an `<a>` whose href equals `target`.
///
/// Each href is parsed against `base` and compared with the target by its
/// serialized form. The walk keeps its own stack, so deeply nested markup
/// cannot exhaust the call stack.
pub fn contains_link(document: &Html, base: &Url, target: &Url) -> bool {
    let mut stack = vec![document.tree.root()];

    while let Some(node) = stack.pop() {
        if let Some(element) = node.value().as_element() {
            if element.name().eq_ignore_ascii_case("a") {
                if let Some(href) = get_attr(element, "href").filter(|h| !h.is_empty()) {
                    match base.join(href) {
                        Ok(resolved) if resolved.as_str() == target.as_str() => {
                            debug!(href = href, target = %target, "source_link_found");
                            return true;
                        }
                        Ok(_) => {}
                        Err(e) => debug!(href = href, error = %e, "source_link_unparseable"),
                    }
                }
            }
        }

        // Push children last-to-first so they pop in document order.
        let mut child = node.last_child();
        while let Some(c) = child {
            stack.push(c);
            child = c.prev_sibling();
        }
    }

    false
}
