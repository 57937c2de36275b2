//! Login form extraction from the identity provider page.
//!
//! Only what the credential exchange needs: the first `<form>`, its `action`,
//! and the name/value pair of every named `<input>` inside it. Markup inside
//! HTML comments is ignored, and a `>` within a quoted attribute value does
//! not end the tag.

use regex::{Captures, Regex};
use std::sync::LazyLock;

use crate::domain::ports::{LoginForm, LoginFormParser};

static COMMENT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)<!--.*?-->").expect("comment regex"));

static FORM_OPEN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?is)<form\b((?:[^>"']|"[^"]*"|'[^']*')*)>"#).expect("form regex")
});

static FORM_CLOSE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)</form\s*>").expect("form close regex"));

static INPUT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?is)<input\b((?:[^>"']|"[^"]*"|'[^']*')*)>"#).expect("input regex")
});

static ATTRIBUTE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?s)([^\s"'<>/=]+)(?:\s*=\s*(?:"([^"]*)"|'([^']*)'|([^\s"'=<>`]+)))?"#)
        .expect("attribute regex")
});

static ENTITY: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"&(#[xX][0-9a-fA-F]+|#[0-9]+|[a-zA-Z]+);").expect("entity regex"));

/// Regex-based [`LoginFormParser`] for server-rendered login pages.
#[derive(Debug, Clone, Copy, Default)]
pub struct HtmlFormParser;

impl LoginFormParser for HtmlFormParser {
    fn parse(&self, html: &str) -> Option<LoginForm> {
        let uncommented = COMMENT.replace_all(html, "");
        let html: &str = &uncommented;
        let open = FORM_OPEN.captures(html)?;
        let form_attrs = attributes(open.get(1).map_or("", |m| m.as_str()));
        let action = attribute(&form_attrs, "action").filter(|action| !action.is_empty())?;

        let body_start = open.get(0)?.end();
        let body_end = FORM_CLOSE
            .find_at(html, body_start)
            .map_or(html.len(), |m| m.start());
        let body = &html[body_start..body_end];

        let fields = INPUT
            .captures_iter(body)
            .filter_map(|input| {
                let attrs = attributes(input.get(1).map_or("", |m| m.as_str()));
                let name = attribute(&attrs, "name").filter(|name| !name.is_empty())?;
                let value = attribute(&attrs, "value").unwrap_or_default();
                Some((name, value))
            })
            .collect();

        Some(LoginForm { action, fields })
    }
}

/// Attributes of a tag as (lowercased name, decoded value); bare attributes get "".
fn attributes(raw: &str) -> Vec<(String, String)> {
    ATTRIBUTE
        .captures_iter(raw)
        .map(|caps| {
            let name = caps[1].to_ascii_lowercase();
            let value = caps
                .get(2)
                .or_else(|| caps.get(3))
                .or_else(|| caps.get(4))
                .map_or_else(String::new, |m| decode_entities(m.as_str()));
            (name, value)
        })
        .collect()
}

fn attribute(attrs: &[(String, String)], name: &str) -> Option<String> {
    attrs
        .iter()
        .find(|(attr, _)| attr == name)
        .map(|(_, value)| value.clone())
}

/// Decode the character references that show up in attribute values.
pub fn decode_entities(value: &str) -> String {
    if !value.contains('&') {
        return value.to_string();
    }
    ENTITY
        .replace_all(value, |caps: &Captures| {
            let entity = &caps[1];
            let decoded = if let Some(hex) = entity
                .strip_prefix("#x")
                .or_else(|| entity.strip_prefix("#X"))
            {
                u32::from_str_radix(hex, 16).ok().and_then(char::from_u32)
            } else if let Some(dec) = entity.strip_prefix('#') {
                dec.parse::<u32>().ok().and_then(char::from_u32)
            } else {
                match entity {
                    "amp" => Some('&'),
                    "lt" => Some('<'),
                    "gt" => Some('>'),
                    "quot" => Some('"'),
                    "apos" => Some('\''),
                    "nbsp" => Some('\u{a0}'),
                    _ => None,
                }
            };
            decoded.map_or_else(|| caps[0].to_string(), String::from)
        })
        .into_owned()
}
