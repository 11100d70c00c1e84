//! Tag filter lists for AWS integrations: `name:value` tokens joined by `,`.
//!
//! A half containing `:`, `,`, space or a quote is wrapped in `"`; a half that
//! itself holds `"` is wrapped in `'`. A half holding both quote kinds has no
//! escape and is emitted as is.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Tag {
    pub name: String,
    pub value: String,
}

impl Tag {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self { Self { name: name.into(), value: value.into() } }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TagError {
    #[error("unterminated quote in tag list at {0}")]
    UnterminatedQuote(usize),
    #[error("missing ':' in tag at {0}")]
    MissingSeparator(usize),
    #[error("unexpected character {1:?} after quoted tag at {0}")]
    TrailingCharacter(usize, char),
}

const SPECIAL: &[char] = &[':', ',', ' ', '\'', '"'];

pub fn escape(s: &str) -> String {
    if !s.contains(SPECIAL) {
        return s.to_string();
    }
    if !s.contains('"') {
        return format!("\"{}\"", s);
    }
    if !s.contains('\'') {
        return format!("'{}'", s);
    }
    s.to_string()
}

pub fn encode(tags: &[Tag]) -> String {
    tags.iter().map(|t| format!("{}:{}", escape(&t.name), escape(&t.value))).collect::<Vec<_>>().join(",")
}

/// Inverse of [`encode`] for every list whose halves are escapable.
pub fn decode(s: &str) -> Result<Vec<Tag>, TagError> {
    let mut out = Vec::new();
    if s.is_empty() {
        return Ok(out);
    }
    let chars: Vec<char> = s.chars().collect();
    let mut pos = 0;
    loop {
        let start = pos;
        let (name, next) = read_half(&chars, pos, ':')?;
        if next >= chars.len() || chars[next] != ':' {
            return Err(TagError::MissingSeparator(start));
        }
        let (value, next) = read_half(&chars, next + 1, ',')?;
        out.push(Tag { name, value });
        if next >= chars.len() {
            return Ok(out);
        }
        pos = next + 1;
    }
}

/// Reads one half starting at `pos`; returns it with the index of the delimiter or end.
fn read_half(chars: &[char], pos: usize, delim: char) -> Result<(String, usize), TagError> {
    match chars.get(pos) {
        Some(&q) if q == '"' || q == '\'' => {
            let close = chars[pos + 1..].iter().position(|&c| c == q).ok_or(TagError::UnterminatedQuote(pos))?;
            let end = pos + 1 + close;
            let text: String = chars[pos + 1..end].iter().collect();
            let next = end + 1;
            match chars.get(next) {
                None => Ok((text, next)),
                Some(&c) if c == delim => Ok((text, next)),
                Some(&c) => Err(TagError::TrailingCharacter(next, c)),
            }
        }
        _ => {
            let len = chars[pos..].iter().position(|&c| c == delim || c == ',').unwrap_or(chars.len() - pos);
            Ok((chars[pos..pos + len].iter().collect(), pos + len))
        }
    }
}
