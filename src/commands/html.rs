//! Minimal HTML handling for fetched pages and search results

use regex::Regex;
use serde::Serialize;
use std::sync::LazyLock;

static HIDDEN_BLOCKS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?is)<(script|style|noscript|template)\b[^>]*>.*?</(script|style|noscript|template)\s*>")
        .unwrap()
});
static HEAD: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?is)<head\b[^>]*>.*?</head\s*>").unwrap());
static COMMENTS: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?s)<!--.*?-->").unwrap());
static TAGS: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?s)<[^>]*>").unwrap());
static BLANK_RUNS: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[ \t\r\f]*\n\s*").unwrap());
static SPACES: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[ \t\r\f]+").unwrap());
static ANCHORS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<a\b([^>]*)>(.*?)</a\s*>").unwrap());
static CLASS_ATTR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"(?i)\bclass\s*=\s*"([^"]*)""#).unwrap());
static HREF_ATTR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"(?i)\bhref\s*=\s*"([^"]*)""#).unwrap());

/// Visible text of a page: body only, scripts and styles removed, tags
/// stripped, whitespace collapsed.
pub fn page_text(html: &str) -> String {
    let without_head = HEAD.replace_all(html, " ");
    let without_hidden = HIDDEN_BLOCKS.replace_all(&without_head, " ");
    let without_comments = COMMENTS.replace_all(&without_hidden, " ");
    inline_text(&without_comments)
}

/// Strip tags and decode entities in a fragment.
fn inline_text(fragment: &str) -> String {
    let text = TAGS.replace_all(fragment, " ");
    let text = decode_entities(&text);
    let text = SPACES.replace_all(&text, " ");
    let text = BLANK_RUNS.replace_all(&text, "\n");
    text.trim().to_string()
}

/// Decode the handful of entities that matter for readable text.
pub fn decode_entities(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut rest = text;

    while let Some((before, after)) = rest.split_once('&') {
        out.push_str(before);
        let decoded = after
            .split_once(';')
            .filter(|(name, _)| name.len() < 10)
            .and_then(|(name, tail)| decode_entity(name).map(|c| (c, tail)));

        match decoded {
            Some((c, tail)) => {
                out.push(c);
                rest = tail;
            }
            None => {
                out.push('&');
                rest = after;
            }
        }
    }

    out.push_str(rest);
    out
}

fn decode_entity(entity: &str) -> Option<char> {
    match entity {
        "amp" => Some('&'),
        "lt" => Some('<'),
        "gt" => Some('>'),
        "quot" => Some('"'),
        "apos" => Some('\''),
        "nbsp" => Some(' '),
        _ => {
            let code = entity.strip_prefix('#')?;
            let value = match code.strip_prefix(['x', 'X']) {
                Some(hex) => u32::from_str_radix(hex, 16).ok()?,
                None => code.parse().ok()?,
            };
            char::from_u32(value)
        }
    }
}

/// One organic search result
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SearchResult {
    pub title: String,
    pub url: String,
    pub description: String,
}

/// Parse a `DuckDuckGo` HTML results page.
///
/// Result links carry the class `result__a`, snippets `result__snippet`. A
/// snippet belongs to the result link before it. Redirect links are
/// unwrapped to their target.
pub fn parse_search_results(html: &str) -> Vec<SearchResult> {
    let mut results: Vec<SearchResult> = Vec::new();

    for anchor in ANCHORS.captures_iter(html) {
        let attrs = &anchor[1];
        let Some(class) = CLASS_ATTR.captures(attrs) else {
            continue;
        };
        let classes: Vec<&str> = class[1].split_whitespace().collect();

        if classes.contains(&"result__a") {
            let href = HREF_ATTR
                .captures(attrs)
                .map(|c| decode_entities(&c[1]))
                .unwrap_or_default();
            results.push(SearchResult {
                title: inline_text(&anchor[2]),
                url: unwrap_redirect(&href),
                description: String::new(),
            });
        } else if classes.contains(&"result__snippet") {
            if let Some(last) = results.last_mut() {
                last.description = inline_text(&anchor[2]);
            }
        }
    }

    results
}

fn unwrap_redirect(href: &str) -> String {
    let absolute = if href.starts_with("//") {
        format!("https:{href}")
    } else {
        href.to_string()
    };

    reqwest::Url::parse(&absolute)
        .ok()
        .and_then(|url| {
            url.query_pairs()
                .find(|(key, _)| key == "uddg")
                .map(|(_, target)| target.into_owned())
        })
        .unwrap_or(absolute)
}
