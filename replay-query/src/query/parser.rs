//! Query text parser
//!
//! Splits one query block into its four clauses:
//!
//! ```text
//! IF <condition>
//! FOR LAST <number> (SECONDS|ENTRIES)
//! THEN PRINT("<message>")
//! EVERY <number> SECONDS
//! ```
//!
//! Keywords are case-insensitive and must be preceded by whitespace. The PRINT
//! message is scanned as a quoted string, so keywords inside it never end a
//! clause early.

use super::window::{Window, WindowKind};
use super::DIAGNOSTIC_PREFIX;
use crate::types::{QueryParseError, Seconds};
use serde::{Deserialize, Serialize};

type ParseResult<T> = std::result::Result<T, QueryParseError>;

/// The clauses of one parsed query, before condition compilation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryDefinition {
    /// Condition text exactly as written (no axis swap)
    pub condition: String,
    pub window: Window,
    pub message: String,
    /// Minimum seconds between emissions (SECONDS windows only)
    pub delay: Seconds,
}

/// Parse one query block
pub fn parse_query(text: &str) -> ParseResult<QueryDefinition> {
    let text = text.trim();

    if !starts_with_keyword(text, "if") {
        return Err(QueryParseError::MissingIf);
    }
    let for_at = find_keyword(text, 2, "for").ok_or(QueryParseError::MissingFor)?;
    let condition = text[2..for_at].trim().to_string();

    let then_at = find_keyword(text, for_at, "then").ok_or(QueryParseError::MissingThen)?;
    let window = parse_window(&text[for_at..then_at])?;

    let (message, every_at) = parse_print(text, then_at)?;
    let delay = parse_every(&text[every_at..])?;

    if message.trim_start().starts_with(DIAGNOSTIC_PREFIX) {
        return Err(QueryParseError::ReservedMessage);
    }

    Ok(QueryDefinition {
        condition,
        window,
        message,
        delay,
    })
}

/// `FOR LAST <number> <kind>`
fn parse_window(clause: &str) -> ParseResult<Window> {
    let rest = strip_keyword(clause.trim(), "for")
        .and_then(|rest| strip_keyword(rest, "last"))
        .ok_or(QueryParseError::MalformedFor)?;

    let lower = rest.to_ascii_lowercase();
    let kind_at = [("entries", WindowKind::Entries), ("seconds", WindowKind::Seconds)]
        .into_iter()
        .filter_map(|(word, kind)| lower.find(word).map(|at| (at, word, kind)))
        .min_by_key(|(at, _, _)| *at);
    let (at, word, kind) = kind_at.ok_or(QueryParseError::MissingWindowKind)?;
    if !lower[at + word.len()..].trim().is_empty() {
        return Err(QueryParseError::MissingWindowKind);
    }

    let value = rest[..at].trim();
    let threshold =
        parse_number(value).ok_or_else(|| QueryParseError::InvalidThreshold(value.to_string()))?;

    Ok(Window { kind, threshold })
}

/// `THEN PRINT("<message>")`, returning the message and the offset of EVERY
fn parse_print(text: &str, then_at: usize) -> ParseResult<(String, usize)> {
    let missing = |from: usize| {
        if find_keyword(text, from, "every").is_none() {
            QueryParseError::MissingEvery
        } else {
            QueryParseError::MissingPrint
        }
    };

    let instruction = text[then_at + "then".len()..].trim_start();
    let instruction_at = text.len() - instruction.len();
    let message_at = match print_prefix_len(instruction) {
        Some(len) => instruction_at + len,
        None => return Err(missing(then_at)),
    };

    // The message ends at the first `")` that is followed by the EVERY keyword
    let mut last_close = None;
    for (offset, _) in text[message_at..].match_indices("\")") {
        let close_at = message_at + offset;
        let after = close_at + 2;
        if let Some(every_at) = find_keyword(text, after, "every") {
            if text[after..every_at].trim().is_empty() {
                return Ok((text[message_at..close_at].to_string(), every_at));
            }
        }
        last_close = Some(after);
    }

    Err(missing(last_close.unwrap_or(then_at)))
}

/// Length of `print` `(` `"` (whitespace allowed between them), if present
fn print_prefix_len(instruction: &str) -> Option<usize> {
    let bytes = instruction.as_bytes();
    if bytes.len() < 5 || !bytes[..5].eq_ignore_ascii_case(b"print") {
        return None;
    }
    let mut pos = skip_whitespace(bytes, 5);
    if bytes.get(pos) != Some(&b'(') {
        return None;
    }
    pos = skip_whitespace(bytes, pos + 1);
    if bytes.get(pos) != Some(&b'"') {
        return None;
    }
    Some(pos + 1)
}

/// `EVERY <number> SECONDS`
fn parse_every(clause: &str) -> ParseResult<Seconds> {
    let rest = strip_keyword(clause, "every").ok_or(QueryParseError::MalformedEvery)?;
    let suffix = "seconds";
    if rest.len() < suffix.len() || !rest.as_bytes()[rest.len() - suffix.len()..].eq_ignore_ascii_case(suffix.as_bytes()) {
        return Err(QueryParseError::MalformedEvery);
    }
    let value = &rest[..rest.len() - suffix.len()];
    if !value.is_empty() && !value.ends_with(|c: char| c.is_whitespace()) {
        return Err(QueryParseError::MalformedEvery);
    }
    let value = value.trim();
    parse_number(value).ok_or_else(|| QueryParseError::InvalidDelay(value.to_string()))
}

/// Plain non-negative decimal literal: `2`, `0.5`, `.5`, `10.`
fn parse_number(value: &str) -> Option<f64> {
    let digits = value.chars().filter(char::is_ascii_digit).count();
    let dots = value.chars().filter(|c| *c == '.').count();
    if digits == 0 || dots > 1 || digits + dots != value.len() {
        return None;
    }
    value.parse().ok()
}

fn skip_whitespace(bytes: &[u8], mut pos: usize) -> usize {
    while pos < bytes.len() && bytes[pos].is_ascii_whitespace() {
        pos += 1;
    }
    pos
}

fn is_keyword_at(bytes: &[u8], at: usize, keyword: &str) -> bool {
    let end = at + keyword.len();
    end < bytes.len()
        && bytes[at..end].eq_ignore_ascii_case(keyword.as_bytes())
        && bytes[end].is_ascii_whitespace()
}

fn starts_with_keyword(text: &str, keyword: &str) -> bool {
    is_keyword_at(text.as_bytes(), 0, keyword)
}

/// Offset of the first `keyword` at or after `from` that is preceded and
/// followed by whitespace
fn find_keyword(text: &str, from: usize, keyword: &str) -> Option<usize> {
    let bytes = text.as_bytes();
    (from.max(1)..bytes.len()).find(|&at| bytes[at - 1].is_ascii_whitespace() && is_keyword_at(bytes, at, keyword))
}

/// Remove a leading keyword and the whitespace after it
fn strip_keyword<'a>(text: &'a str, keyword: &str) -> Option<&'a str> {
    if starts_with_keyword(text, keyword) {
        Some(text[keyword.len()..].trim_start())
    } else {
        None
    }
}
