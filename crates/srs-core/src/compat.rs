//! Compat document encoding
//!
//! The compat document is JSON. Decoding is "extended": `//` and `#` line
//! comments, `/* */` block comments and trailing commas are accepted on top of
//! strict JSON. Extensions are blanked out with spaces before `serde_json`
//! sees the text, so reported line numbers and byte columns match the input.

use serde::Serialize;

use crate::rule::RuleSetCompat;

/// Error type for compat decoding.
#[derive(Debug, thiserror::Error)]
pub enum DecodeError {
    #[error("rule-set source is not valid UTF-8: {0}")]
    Utf8(#[from] std::str::Utf8Error),
    #[error("unterminated block comment starting at byte {0}")]
    UnterminatedComment(usize),
    #[error("malformed rule-set source: {0}")]
    Json(#[from] serde_json::Error),
}

/// Decode a compat document from extended JSON.
pub fn decode_compat(data: &[u8]) -> Result<RuleSetCompat, DecodeError> {
    let text = std::str::from_utf8(data)?;
    let strict = strip_extensions(text)?;
    Ok(serde_json::from_str(&strict)?)
}

/// Encode a compat document as canonical JSON (4-space indent, schema field order).
pub fn encode_compat(compat: &RuleSetCompat) -> Result<Vec<u8>, serde_json::Error> {
    let mut buf = Vec::new();
    let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
    let mut serializer = serde_json::Serializer::with_formatter(&mut buf, formatter);
    compat.serialize(&mut serializer)?;
    Ok(buf)
}

/// Replace comments and trailing commas with whitespace.
fn strip_extensions(text: &str) -> Result<String, DecodeError> {
    let without_comments = blank_comments(text)?;
    Ok(blank_trailing_commas(&without_comments))
}

fn blank_comments(text: &str) -> Result<String, DecodeError> {
    let bytes = text.as_bytes();
    let mut out = String::with_capacity(text.len());
    let mut chars = text.char_indices().peekable();
    let mut in_string = false;

    while let Some((pos, c)) = chars.next() {
        if in_string {
            out.push(c);
            match c {
                '\\' => {
                    if let Some((_, escaped)) = chars.next() {
                        out.push(escaped);
                    }
                }
                '"' => in_string = false,
                _ => {}
            }
            continue;
        }

        match c {
            '"' => {
                in_string = true;
                out.push(c);
            }
            '/' if bytes.get(pos + 1) == Some(&b'/') => {
                blank_line(&mut chars, &mut out);
            }
            '#' => {
                blank_line(&mut chars, &mut out);
            }
            '/' if bytes.get(pos + 1) == Some(&b'*') => {
                // Skip the opening '*' so "/*/" does not close itself.
                chars.next();
                out.push_str("  ");
                let mut prev = '\0';
                let mut closed = false;
                for (_, inner) in chars.by_ref() {
                    if inner == '\n' {
                        out.push('\n');
                    } else {
                        blank_char(&mut out, inner);
                    }
                    if prev == '*' && inner == '/' {
                        closed = true;
                        break;
                    }
                    prev = inner;
                }
                if !closed {
                    return Err(DecodeError::UnterminatedComment(pos));
                }
            }
            _ => out.push(c),
        }
    }

    Ok(out)
}

fn blank_line<I>(chars: &mut std::iter::Peekable<I>, out: &mut String)
where
    I: Iterator<Item = (usize, char)>,
{
    out.push(' ');
    while let Some(&(_, c)) = chars.peek() {
        if c == '\n' {
            break;
        }
        blank_char(out, c);
        chars.next();
    }
}

/// Columns are byte offsets, so a blanked char keeps its UTF-8 width.
fn blank_char(out: &mut String, c: char) {
    out.extend(std::iter::repeat(' ').take(c.len_utf8()));
}

fn blank_trailing_commas(text: &str) -> String {
    let chars: Vec<char> = text.chars().collect();
    let mut out = String::with_capacity(text.len());
    let mut in_string = false;
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];
        if in_string {
            out.push(c);
            if c == '\\' {
                if let Some(&escaped) = chars.get(i + 1) {
                    out.push(escaped);
                    i += 1;
                }
            } else if c == '"' {
                in_string = false;
            }
            i += 1;
            continue;
        }

        match c {
            '"' => {
                in_string = true;
                out.push(c);
            }
            ',' => {
                let next = chars[i + 1..].iter().find(|ch| !ch.is_whitespace());
                if matches!(next, Some('}') | Some(']')) {
                    out.push(' ');
                } else {
                    out.push(c);
                }
            }
            _ => out.push(c),
        }
        i += 1;
    }

    out
}
