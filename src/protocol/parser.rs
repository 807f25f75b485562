//! Line Protocol Parser
//!
//! This module turns raw bytes from a socket into [`Command`]s.
//!
//! Parsing happens in two steps:
//!
//! 1. **Framing**: [`LineParser::parse`] looks for a complete line in a buffer
//!    and reports how many bytes it spans. It returns:
//!    - `Ok(Some((line, consumed)))` - a full line, `consumed` includes the terminator
//!    - `Ok(None)` - no newline yet, read more data
//!    - `Err(ParseError)` - the pending line is longer than allowed
//! 2. **Classification**: [`parse_line`] splits one line on whitespace and
//!    matches it against the `get` / `set` / `q` grammar. Classification never
//!    fails; anything unrecognized becomes [`Command::Invalid`].

use crate::protocol::types::Command;
use thiserror::Error;

/// Maximum length of one request line, terminator excluded.
pub const MAX_LINE_LENGTH: usize = 4096;

/// Errors that can occur while framing lines.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ParseError {
    /// No newline within the allowed line length
    #[error("line too long: {size} bytes without a newline (max: {max})")]
    LineTooLong { size: usize, max: usize },
}

/// Result type for parsing operations.
pub type ParseResult<T> = Result<T, ParseError>;

/// Splits a byte stream into lines.
///
/// # Example
///
/// ```
/// use slotkv::protocol::LineParser;
///
/// let parser = LineParser::new();
/// let (line, consumed) = parser.parse(b"get 0\r\nset").unwrap().unwrap();
/// assert_eq!(line, b"get 0");
/// assert_eq!(consumed, 7);
/// ```
#[derive(Debug, Clone, Copy)]
pub struct LineParser {
    max_line_length: usize,
}

impl Default for LineParser {
    fn default() -> Self {
        Self::new()
    }
}

impl LineParser {
    /// Creates a parser with the default line limit.
    pub fn new() -> Self {
        Self::with_max_line_length(MAX_LINE_LENGTH)
    }

    /// Creates a parser that rejects lines longer than `max_line_length`.
    pub fn with_max_line_length(max_line_length: usize) -> Self {
        Self { max_line_length }
    }

    /// Returns the configured line limit.
    pub fn max_line_length(&self) -> usize {
        self.max_line_length
    }

    /// Attempts to frame one line from the start of `buf`.
    ///
    /// The returned line has its terminator stripped.
    pub fn parse<'a>(&self, buf: &'a [u8]) -> ParseResult<Option<(&'a [u8], usize)>> {
        match buf.iter().position(|&b| b == b'\n') {
            Some(pos) => {
                let line = strip_line_terminator(&buf[..=pos]);
                if line.len() > self.max_line_length {
                    return Err(ParseError::LineTooLong {
                        size: line.len(),
                        max: self.max_line_length,
                    });
                }
                Ok(Some((line, pos + 1)))
            }
            // +1 leaves room for a trailing '\r' that may still be followed by '\n'
            None if buf.len() > self.max_line_length + 1 => Err(ParseError::LineTooLong {
                size: buf.len(),
                max: self.max_line_length,
            }),
            None => Ok(None),
        }
    }
}

/// Removes one trailing `\n` and, before it, one `\r`.
pub fn strip_line_terminator(line: &[u8]) -> &[u8] {
    let line = line.strip_suffix(b"\n").unwrap_or(line);
    line.strip_suffix(b"\r").unwrap_or(line)
}

/// Classifies one line (terminator already stripped).
///
/// # Example
///
/// ```
/// use slotkv::protocol::{parse_line, Command};
///
/// assert_eq!(parse_line("get 3"), Command::Get { index: 3 });
/// assert_eq!(parse_line("Q"), Command::Quit);
/// assert!(matches!(parse_line("GET 3"), Command::Invalid { .. }));
/// ```
pub fn parse_line(line: &str) -> Command {
    if line == "q" || line == "Q" {
        return Command::Quit;
    }

    let invalid = || Command::Invalid {
        raw: line.to_string(),
    };

    let mut tokens = line.split_whitespace();

    match tokens.next() {
        Some("get") => {
            let index = match tokens.next().and_then(parse_index) {
                Some(index) => index,
                None => return invalid(),
            };
            if tokens.next().is_some() {
                return invalid();
            }
            Command::Get { index }
        }
        Some("set") => {
            let index = match tokens.next().and_then(parse_index) {
                Some(index) => index,
                None => return invalid(),
            };
            // Only the first token after the index is the value
            match tokens.next() {
                Some(value) => Command::Set {
                    index,
                    value: value.to_string(),
                },
                None => invalid(),
            }
        }
        _ => invalid(),
    }
}

/// Classifies a raw line that may not be valid UTF-8.
pub fn parse_command(line: &[u8]) -> Command {
    match std::str::from_utf8(line) {
        Ok(line) => parse_line(line),
        Err(_) => Command::Invalid {
            raw: String::from_utf8_lossy(line).into_owned(),
        },
    }
}

/// Parses a slot index: ASCII digits only, no sign, no wrapping on overflow.
fn parse_index(token: &str) -> Option<usize> {
    if token.is_empty() || !token.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    token.parse().ok()
}
