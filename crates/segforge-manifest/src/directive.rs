//! Recognition of the `#` directive lines that matter for reconstruction.
//!
//! Only three tags are interpreted; every other `#` line is a comment.

use serde::Serialize;

/// Encryption declared by an `#EXT-X-KEY` directive.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Encryption {
    /// Value of the `METHOD` attribute (e.g. `AES-128`, `SAMPLE-AES`).
    pub method: String,
    /// Value of the `URI` attribute, unquoted.
    pub uri: Option<String>,
}

/// A directive the parser acts on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Directive {
    /// `#EXT-X-KEY`; `None` when the method is `NONE` or missing.
    Key(Option<Encryption>),
    /// `#EXT-X-STREAM-INF`.
    StreamInf,
    /// `#EXT-X-ENDLIST`.
    EndList,
}

impl Directive {
    /// Parse the text after the leading `#`.
    pub fn parse(tag: &str) -> Option<Self> {
        let (name, value) = match tag.split_once(':') {
            Some((name, value)) => (name.trim(), value),
            None => (tag.trim(), ""),
        };

        match name {
            "EXT-X-KEY" => Some(Self::Key(parse_key(value))),
            "EXT-X-STREAM-INF" => Some(Self::StreamInf),
            "EXT-X-ENDLIST" => Some(Self::EndList),
            _ => None,
        }
    }
}

fn parse_key(attributes: &str) -> Option<Encryption> {
    let mut method = None;
    let mut uri = None;

    for (key, value) in attribute_list(attributes) {
        match key.as_str() {
            "METHOD" => method = Some(value),
            "URI" => uri = Some(value),
            _ => {}
        }
    }

    let method = method?;
    if method.eq_ignore_ascii_case("NONE") {
        return None;
    }
    Some(Encryption { method, uri })
}

/// Split an HLS attribute list (`A=1,B="x,y"`) into unquoted key/value pairs.
fn attribute_list(input: &str) -> Vec<(String, String)> {
    let mut pairs = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;

    for c in input.chars() {
        match c {
            '"' => {
                in_quotes = !in_quotes;
                current.push(c);
            }
            ',' if !in_quotes => {
                pairs.extend(split_pair(&current));
                current.clear();
            }
            _ => current.push(c),
        }
    }
    pairs.extend(split_pair(&current));
    pairs
}

fn split_pair(raw: &str) -> Option<(String, String)> {
    let (key, value) = raw.split_once('=')?;
    let value = value.trim();
    let value = value
        .strip_prefix('"')
        .and_then(|v| v.strip_suffix('"'))
        .unwrap_or(value);
    Some((key.trim().to_ascii_uppercase(), value.to_string()))
}
