//! HTTP `Link` header parsing (RFC 8288).
//!
//! A header value holds comma-separated entries of the form
//! `<url>; name="value"; name=token`. Several `Link` headers may be present
//! on one response; their entries are concatenated in header order.

use std::collections::HashMap;

use tracing::debug;

/// One link relation taken from a `Link` header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkRelation {
    /// The link target exactly as written between the angle brackets
    pub url: String,
    /// Parameters keyed by lower-cased name. `rel` is split on whitespace.
    pub params: HashMap<String, Vec<String>>,
}

impl LinkRelation {
    /// Relation types carried by the `rel` parameter, in order.
    pub fn rels(&self) -> impl Iterator<Item = &str> {
        self.params
            .get("rel")
            .into_iter()
            .flatten()
            .map(String::as_str)
    }

    /// Relation types compare case-insensitively.
    pub fn has_rel(&self, rel: &str) -> bool {
        self.rels().any(|r| r.eq_ignore_ascii_case(rel))
    }
}

/// Parse every value of a response's `Link` headers.
pub fn parse_link_headers<I, S>(values: I) -> Vec<LinkRelation>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    values
        .into_iter()
        .flat_map(|v| parse_link_header(v.as_ref()))
        .collect()
}

/// Parse a single `Link` header value. Malformed entries are skipped.
pub fn parse_link_header(value: &str) -> Vec<LinkRelation> {
    let mut links = Vec::new();
    let mut rest = value;

    loop {
        rest = rest.trim_start_matches(|c: char| c == ',' || c.is_whitespace());
        if rest.is_empty() {
            break;
        }

        let Some(opened) = rest.strip_prefix('<') else {
            debug!(entry = %rest, "link_header_entry_malformed");
            match rest.find(',') {
                Some(i) => {
                    rest = &rest[i + 1..];
                    continue;
                }
                None => break,
            }
        };

        let Some(close) = opened.find('>') else {
            debug!(entry = %rest, "link_header_unterminated_url");
            break;
        };

        let url = opened[..close].trim().to_string();
        rest = &opened[close + 1..];

        let mut params: HashMap<String, Vec<String>> = HashMap::new();
        loop {
            rest = rest.trim_start();
            let Some(after) = rest.strip_prefix(';') else {
                break;
            };
            rest = after.trim_start();

            let name_end = rest
                .find(|c: char| c == '=' || c == ';' || c == ',' || c.is_whitespace())
                .unwrap_or(rest.len());
            let name = rest[..name_end].to_ascii_lowercase();
            rest = rest[name_end..].trim_start();

            let value = match rest.strip_prefix('=') {
                Some(after_eq) => {
                    let (value, remaining) = parse_param_value(after_eq.trim_start());
                    rest = remaining;
                    value
                }
                None => String::new(),
            };

            if name.is_empty() {
                continue;
            }

            let entry = params.entry(name.clone()).or_default();
            if name == "rel" {
                entry.extend(value.split_whitespace().map(str::to_string));
            } else {
                entry.push(value);
            }
        }

        links.push(LinkRelation { url, params });
    }

    links
}

/// Parse a quoted-string or token, returning the value and the unparsed tail.
fn parse_param_value(input: &str) -> (String, &str) {
    if let Some(quoted) = input.strip_prefix('"') {
        let mut value = String::new();
        let mut escaped = false;
        for (i, c) in quoted.char_indices() {
            if escaped {
                value.push(c);
                escaped = false;
            } else if c == '\\' {
                escaped = true;
            } else if c == '"' {
                return (value, &quoted[i + 1..]);
            } else {
                value.push(c);
            }
        }
        return (value, "");
    }

    let end = input
        .find(|c: char| c == ';' || c == ',')
        .unwrap_or(input.len());
    (input[..end].trim().to_string(), &input[end..])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_quoted_rel() {
        let links = parse_link_header(r#"<https://example.com/wm>; rel="webmention""#);
        assert_eq!(links.len(), 1);
        assert_eq!(links[0].url, "https://example.com/wm");
        assert!(links[0].has_rel("webmention"));
    }

    #[test]
    fn test_multiple_entries_keep_order() {
        let links = parse_link_header(
            r#"<https://example.com/style.css>; rel=stylesheet, <https://example.com/wm>; rel="webmention""#,
        );
        assert_eq!(links.len(), 2);
        assert_eq!(links[0].url, "https://example.com/style.css");
        assert_eq!(links[1].url, "https://example.com/wm");
    }

    #[test]
    fn test_multiple_rel_tokens() {
        let links = parse_link_header(r#"</wm>; rel="nofollow webmention""#);
        let rels: Vec<&str> = links[0].rels().collect();
        assert_eq!(rels, vec!["nofollow", "webmention"]);
    }

    #[test]
    fn test_param_names_are_case_insensitive() {
        let links = parse_link_header(r#"<https://example.com/wm>; REL="WebMention"; title="x""#);
        assert!(links[0].has_rel("webmention"));
        assert_eq!(links[0].params.get("title"), Some(&vec!["x".to_string()]));
    }

    #[test]
    fn test_comma_inside_quotes() {
        let links = parse_link_header(r#"<https://a.example/>; title="a, b"; rel=next"#);
        assert_eq!(links.len(), 1);
        assert_eq!(links[0].params.get("title"), Some(&vec!["a, b".to_string()]));
        assert!(links[0].has_rel("next"));
    }

    #[test]
    fn test_escaped_quote() {
        let links = parse_link_header(r#"<https://a.example/>; title="say \"hi\"""#);
        assert_eq!(
            links[0].params.get("title"),
            Some(&vec![r#"say "hi""#.to_string()])
        );
    }

    #[test]
    fn test_malformed_entry_skipped() {
        let links = parse_link_header(r#"garbage; rel=x, <https://a.example/wm>; rel=webmention"#);
        assert_eq!(links.len(), 1);
        assert_eq!(links[0].url, "https://a.example/wm");
    }

    #[test]
    fn test_empty_header() {
        assert!(parse_link_header("").is_empty());
        assert!(parse_link_header(" , ").is_empty());
    }

    #[test]
    fn test_parse_many_headers() {
        let links = parse_link_headers(vec![
            r#"<https://a.example/one>; rel=prev"#,
            r#"<https://a.example/two>; rel=webmention"#,
        ]);
        assert_eq!(links.len(), 2);
        assert_eq!(links[1].url, "https://a.example/two");
    }
}
