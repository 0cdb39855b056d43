//! Tokenization of condition text
//!
//! The lexer never fails outright: anything it cannot classify becomes a
//! [`TokenKind::Invalid`] token carrying the error, so callers can still see
//! which operands a broken condition references.

use super::operand::Operand;
use crate::types::EvaluationError;
use std::ops::Range;

#[derive(Debug, Clone, PartialEq)]
pub enum TokenKind {
    // Literals and names
    Number(f64),
    True,
    False,
    Operand(Operand),
    /// A name outside the operand vocabulary
    Name(String),

    // Punctuation
    LeftParen,
    RightParen,

    // Arithmetic operators
    Plus,
    Minus,
    Star,
    Slash,
    DoubleSlash,
    Percent,
    Power,

    // Comparison operators
    Less,
    Greater,
    LessEqual,
    GreaterEqual,
    Equal,
    NotEqual,

    // Boolean connectives
    And,
    Or,
    Not,

    Invalid(EvaluationError),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    /// Byte range of the token in the source text
    pub span: Range<usize>,
}

fn is_name_start(c: u8) -> bool {
    c.is_ascii_alphabetic() || c == b'_'
}

fn is_name_char(c: u8) -> bool {
    c.is_ascii_alphanumeric() || c == b'_' || c == b'.'
}

/// Split condition text into tokens
pub fn tokenize(text: &str) -> Vec<Token> {
    let bytes = text.as_bytes();
    let mut tokens = Vec::new();
    let mut pos = 0;

    while pos < bytes.len() {
        let c = bytes[pos];
        if c.is_ascii_whitespace() {
            pos += 1;
            continue;
        }

        let start = pos;
        let kind = if is_name_start(c) {
            while pos < bytes.len() && is_name_char(bytes[pos]) {
                pos += 1;
            }
            word_kind(&text[start..pos])
        } else if c.is_ascii_digit() || (c == b'.' && bytes.get(pos + 1).is_some_and(u8::is_ascii_digit)) {
            pos = number_end(bytes, pos);
            let literal = &text[start..pos];
            match literal.parse::<f64>() {
                Ok(value) if value.is_finite() => TokenKind::Number(value),
                _ => TokenKind::Invalid(EvaluationError::InvalidNumber(literal.to_string())),
            }
        } else {
            let next = bytes.get(pos + 1).copied();
            let (kind, len) = match (c, next) {
                (b'*', Some(b'*')) => (TokenKind::Power, 2),
                (b'/', Some(b'/')) => (TokenKind::DoubleSlash, 2),
                (b'<', Some(b'=')) => (TokenKind::LessEqual, 2),
                (b'>', Some(b'=')) => (TokenKind::GreaterEqual, 2),
                (b'=', Some(b'=')) => (TokenKind::Equal, 2),
                (b'!', Some(b'=')) => (TokenKind::NotEqual, 2),
                (b'(', _) => (TokenKind::LeftParen, 1),
                (b')', _) => (TokenKind::RightParen, 1),
                (b'+', _) => (TokenKind::Plus, 1),
                (b'-', _) => (TokenKind::Minus, 1),
                (b'*', _) => (TokenKind::Star, 1),
                (b'/', _) => (TokenKind::Slash, 1),
                (b'%', _) => (TokenKind::Percent, 1),
                (b'<', _) => (TokenKind::Less, 1),
                (b'>', _) => (TokenKind::Greater, 1),
                _ => {
                    // Step over a whole UTF-8 character
                    let ch = text[pos..].chars().next().unwrap_or('\u{FFFD}');
                    (
                        TokenKind::Invalid(EvaluationError::UnexpectedCharacter(ch, pos)),
                        ch.len_utf8(),
                    )
                }
            };
            pos += len;
            kind
        };

        tokens.push(Token { kind, span: start..pos });
    }

    tokens
}

fn word_kind(word: &str) -> TokenKind {
    match word {
        "and" => TokenKind::And,
        "or" => TokenKind::Or,
        "not" => TokenKind::Not,
        "true" => TokenKind::True,
        "false" => TokenKind::False,
        _ => match word.parse::<Operand>() {
            Ok(operand) => TokenKind::Operand(operand),
            Err(()) => TokenKind::Name(word.to_string()),
        },
    }
}

/// End offset of a decimal literal starting at `pos` (digits, one fraction, optional exponent)
fn number_end(bytes: &[u8], mut pos: usize) -> usize {
    while pos < bytes.len() && (bytes[pos].is_ascii_digit() || bytes[pos] == b'.') {
        pos += 1;
    }
    if pos < bytes.len() && (bytes[pos] == b'e' || bytes[pos] == b'E') {
        let mut exp = pos + 1;
        if exp < bytes.len() && (bytes[exp] == b'+' || bytes[exp] == b'-') {
            exp += 1;
        }
        if exp < bytes.len() && bytes[exp].is_ascii_digit() {
            pos = exp;
            while pos < bytes.len() && bytes[pos].is_ascii_digit() {
                pos += 1;
            }
        }
    }
    // Trailing name characters make the whole run an invalid literal
    while pos < bytes.len() && is_name_char(bytes[pos]) {
        pos += 1;
    }
    pos
}
