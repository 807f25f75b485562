//! Line Protocol Implementation
//!
//! This module implements the newline-delimited text protocol spoken by
//! slotkv clients.
//!
//! ## Modules
//!
//! - `types`: `Command`, `Reply` and the fixed wire messages
//! - `parser`: line framing and command classification
//!
//! ## Example
//!
//! ```
//! use slotkv::protocol::{parse_command, Command, LineParser, Reply};
//!
//! // Framing and parsing incoming data
//! let data = b"set 2 Gato\n";
//! let (line, consumed) = LineParser::new().parse(data).unwrap().unwrap();
//! assert_eq!(consumed, data.len());
//! assert_eq!(
//!     parse_command(line),
//!     Command::Set { index: 2, value: "Gato".to_string() }
//! );
//!
//! // Creating responses
//! let bytes = Reply::Changed.serialize();
//! assert_eq!(&bytes[..], b"Successful change!\n");
//! ```

pub mod parser;
pub mod types;

// Re-export commonly used types for convenience
pub use parser::{
    parse_command, parse_line, strip_line_terminator, LineParser, ParseError, ParseResult,
    MAX_LINE_LENGTH,
};
pub use types::{Command, Reply, GREETING};
