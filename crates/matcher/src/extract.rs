//! Visible-text extraction from HTML pages.
//!
//! Regex-based. Malformed markup yields noisier text, never an error.

use once_cell::sync::Lazy;
use regex::{Captures, Regex};

static COMMENT: Lazy<Regex> = Lazy::new(|| compile(r"(?s)<!--.*?-->"));
static NON_VISIBLE: Lazy<Regex> = Lazy::new(|| {
    compile(
        r"(?is)<script\b[^>]*>.*?</script\s*>|<style\b[^>]*>.*?</style\s*>|<noscript\b[^>]*>.*?</noscript\s*>|<template\b[^>]*>.*?</template\s*>",
    )
});
static TITLE: Lazy<Regex> = Lazy::new(|| compile(r"(?is)<title\b[^>]*>(.*?)</title\s*>"));
static META: Lazy<Regex> = Lazy::new(|| compile(r"(?is)<meta\b[^>]*>"));
static ATTR: Lazy<Regex> = Lazy::new(|| {
    compile(r#"(?is)\b([a-z:\-]+)\s*=\s*(?:"([^"]*)"|'([^']*)'|([^\s"'>]+))"#)
});
static HEAD: Lazy<Regex> = Lazy::new(|| compile(r"(?is)<head\b[^>]*>.*?</head\s*>"));
static BODY: Lazy<Regex> = Lazy::new(|| compile(r"(?is)<body\b[^>]*>(.*)</body\s*>"));
static TAG: Lazy<Regex> = Lazy::new(|| compile(r"(?s)<[^>]*>"));
static ENTITY: Lazy<Regex> = Lazy::new(|| compile(r"&(#[xX][0-9a-fA-F]{1,6}|#[0-9]{1,7}|[a-zA-Z]{2,8});"));

fn compile(pattern: &str) -> Regex {
    match Regex::new(pattern) {
        Ok(re) => re,
        // Patterns are literals; a failure here is a programming error.
        Err(err) => panic!("invalid extraction pattern {pattern:?}: {err}"),
    }
}

/// Text pulled out of one HTML page.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PageText {
    pub title: String,
    pub description: String,
    pub body: String,
}

impl PageText {
    /// Title, description and body joined by single spaces.
    pub fn combined(&self) -> String {
        [&self.title, &self.description, &self.body]
            .into_iter()
            .filter(|part| !part.is_empty())
            .map(String::as_str)
            .collect::<Vec<_>>()
            .join(" ")
    }

    pub fn is_empty(&self) -> bool {
        self.title.is_empty() && self.description.is_empty() && self.body.is_empty()
    }
}

/// Extract the title, meta description and visible body text of `html`.
pub fn extract_page_text(html: &str) -> PageText {
    let cleaned = COMMENT.replace_all(html, " ");
    let cleaned = NON_VISIBLE.replace_all(&cleaned, " ");

    let title = TITLE
        .captures(&cleaned)
        .and_then(|c| c.get(1))
        .map(|m| clean_text(m.as_str()))
        .unwrap_or_default();

    let description = META
        .find_iter(&cleaned)
        .find_map(|tag| meta_description(tag.as_str()))
        .map(|d| clean_text(&d))
        .unwrap_or_default();

    let body_html = match BODY.captures(&cleaned).and_then(|c| c.get(1)) {
        Some(body) => body.as_str().to_string(),
        None => HEAD.replace_all(&cleaned, " ").into_owned(),
    };
    let body = clean_text(&body_html);

    PageText {
        title,
        description,
        body,
    }
}

/// `content` of a `<meta name="description">` or `og:description` tag.
fn meta_description(tag: &str) -> Option<String> {
    let mut is_description = false;
    let mut content = None;
    for caps in ATTR.captures_iter(tag) {
        let name = caps.get(1).map(|m| m.as_str().to_ascii_lowercase());
        let value = caps
            .get(2)
            .or_else(|| caps.get(3))
            .or_else(|| caps.get(4))
            .map(|m| m.as_str())
            .unwrap_or_default();
        match name.as_deref() {
            Some("name") | Some("property") => {
                let value = value.to_ascii_lowercase();
                if value == "description" || value == "og:description" {
                    is_description = true;
                }
            }
            Some("content") => content = Some(value.to_string()),
            _ => {}
        }
    }
    if is_description {
        content.filter(|c| !c.trim().is_empty())
    } else {
        None
    }
}

fn clean_text(fragment: &str) -> String {
    let stripped = TAG.replace_all(fragment, " ");
    let decoded = decode_entities(&stripped);
    collapse_whitespace(&decoded)
}

/// Decode the common named entities and all numeric ones. Unknown named
/// entities are left as written.
pub fn decode_entities(text: &str) -> String {
    ENTITY
        .replace_all(text, |caps: &Captures<'_>| {
            let entity = &caps[1];
            let decoded = if let Some(hex) = entity
                .strip_prefix("#x")
                .or_else(|| entity.strip_prefix("#X"))
            {
                u32::from_str_radix(hex, 16).ok().and_then(char::from_u32)
            } else if let Some(dec) = entity.strip_prefix('#') {
                dec.parse::<u32>().ok().and_then(char::from_u32)
            } else {
                named_entity(entity)
            };
            match decoded {
                Some(c) => c.to_string(),
                None => caps[0].to_string(),
            }
        })
        .into_owned()
}

fn named_entity(name: &str) -> Option<char> {
    Some(match name {
        "amp" => '&',
        "lt" => '<',
        "gt" => '>',
        "quot" => '"',
        "apos" => '\'',
        "nbsp" => ' ',
        "copy" => '©',
        "reg" => '®',
        "trade" => '™',
        "euro" => '€',
        "pound" => '£',
        "mdash" => '—',
        "ndash" => '–',
        "hellip" => '…',
        _ => return None,
    })
}

pub fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// First `max_chars` characters of `text`, never splitting a code point.
pub fn truncate_chars(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}
