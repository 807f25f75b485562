//! Line Protocol Data Types
//!
//! This module defines what travels over the wire: the commands a client
//! sends and the replies the server answers with.
//!
//! ## Protocol Format
//!
//! Requests are single ASCII lines terminated by `\n` (an optional `\r`
//! before it is tolerated). Tokens are separated by whitespace.
//!
//! ```text
//! get <index>
//! set <index> <value>
//! q | Q
//! ```
//!
//! Replies are fixed strings, except the reply to `get`, which is the raw
//! slot content with no framing at all.

use bytes::Bytes;
use std::fmt;

/// Sent once when a client connects.
pub const GREETING: &[u8] = b"Connected..\n";

/// Reply to anything that is not a well-formed command.
pub const INVALID_COMMAND: &[u8] = b"Comando no valido\n";

/// Reply to a successful `set`.
pub const SET_OK: &[u8] = b"Successful change!\n";

/// Reply when an index does not address a slot.
pub const OUT_OF_RANGE: &[u8] = b"Index out of range\n";

/// Reply when a `set` value does not fit in a slot.
pub const VALUE_TOO_LONG: &[u8] = b"Value too long\n";

/// Reply when a `set` value contains bytes a slot cannot hold.
pub const INVALID_VALUE: &[u8] = b"Invalid value\n";

/// A request parsed from one line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// `get <index>`
    Get { index: usize },

    /// `set <index> <value>`
    Set { index: usize, value: String },

    /// A line that matched neither grammar. Keeps the offending line for logging.
    Invalid { raw: String },

    /// The line was exactly `q` or `Q`
    Quit,
}

impl Command {
    /// Short name used in logs.
    pub fn name(&self) -> &'static str {
        match self {
            Command::Get { .. } => "get",
            Command::Set { .. } => "set",
            Command::Invalid { .. } => "invalid",
            Command::Quit => "quit",
        }
    }
}

/// What the server sends back after a command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reply {
    /// Raw slot content
    Value(Bytes),

    /// The `set` went through
    Changed,

    /// The line was not a command
    InvalidCommand,

    /// The index does not address a slot
    OutOfRange,

    /// The value is longer than a slot allows
    ValueTooLong,

    /// The value contains bytes a slot cannot hold
    InvalidValue,

    /// The session ends; the connection echoes the quit line and closes
    Quit,
}

impl Reply {
    /// Serializes the reply to the bytes written on the wire.
    ///
    /// `Quit` serializes to nothing: the connection writes back the client's
    /// own bytes instead.
    pub fn serialize(&self) -> Bytes {
        match self {
            Reply::Value(v) => v.clone(),
            Reply::Changed => Bytes::from_static(SET_OK),
            Reply::InvalidCommand => Bytes::from_static(INVALID_COMMAND),
            Reply::OutOfRange => Bytes::from_static(OUT_OF_RANGE),
            Reply::ValueTooLong => Bytes::from_static(VALUE_TOO_LONG),
            Reply::InvalidValue => Bytes::from_static(INVALID_VALUE),
            Reply::Quit => Bytes::new(),
        }
    }

    /// Returns true for replies reporting a protocol error.
    pub fn is_error(&self) -> bool {
        matches!(
            self,
            Reply::InvalidCommand | Reply::OutOfRange | Reply::ValueTooLong | Reply::InvalidValue
        )
    }
}

impl fmt::Display for Reply {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Reply::Value(v) => write!(f, "{}", String::from_utf8_lossy(v)),
            Reply::Quit => write!(f, "<quit>"),
            other => write!(f, "{}", String::from_utf8_lossy(&other.serialize()).trim_end()),
        }
    }
}
