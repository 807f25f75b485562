//! Server configuration
//!
//! The server is configured from the command line only:
//!
//! ```text
//! slotkv <PORT> [--host HOST] [--idle-timeout SECS] [--max-line-length BYTES]
//! ```

use crate::connection::ConnectionOptions;
use crate::protocol::MAX_LINE_LENGTH;
use std::time::Duration;
use thiserror::Error;

/// Host the server binds to when none is given (all interfaces).
pub const DEFAULT_HOST: &str = "0.0.0.0";

/// Errors from command-line parsing.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("no port provided")]
    MissingPort,

    #[error("invalid port number: {0:?} (expected 1-65535)")]
    InvalidPort(String),

    #[error("{0} requires a value")]
    MissingValue(&'static str),

    #[error("invalid value for {flag}: {value:?}")]
    InvalidValue { flag: &'static str, value: String },

    #[error("unknown argument: {0}")]
    UnknownArgument(String),
}

/// Server configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Host to bind to
    pub host: String,
    /// Port to listen on
    pub port: u16,
    /// Idle read timeout per connection (None = disabled)
    pub idle_timeout: Option<Duration>,
    /// Longest accepted request line
    pub max_line_length: usize,
}

/// What the command line asks the server binary to do.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Invocation {
    Serve(Config),
    Help,
    Version,
}

impl Config {
    /// Creates a configuration with defaults for everything but the port.
    pub fn new(port: u16) -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            port,
            idle_timeout: None,
            max_line_length: MAX_LINE_LENGTH,
        }
    }

    /// Parses command-line arguments, program name excluded.
    pub fn from_args<I>(args: I) -> Result<Invocation, ConfigError>
    where
        I: IntoIterator,
        I::Item: Into<String>,
    {
        let mut args = args.into_iter().map(Into::<String>::into);
        let mut port = None;
        let mut host = DEFAULT_HOST.to_string();
        let mut idle_timeout = None;
        let mut max_line_length = MAX_LINE_LENGTH;

        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--host" | "-h" => {
                    host = args.next().ok_or(ConfigError::MissingValue("--host"))?;
                }
                "--idle-timeout" | "-t" => {
                    let value = args.next().ok_or(ConfigError::MissingValue("--idle-timeout"))?;
                    let secs: u64 = value.parse().map_err(|_| ConfigError::InvalidValue {
                        flag: "--idle-timeout",
                        value: value.clone(),
                    })?;
                    idle_timeout = (secs > 0).then(|| Duration::from_secs(secs));
                }
                "--max-line-length" => {
                    let value = args
                        .next()
                        .ok_or(ConfigError::MissingValue("--max-line-length"))?;
                    max_line_length = match value.parse::<usize>() {
                        Ok(n) if n > 0 => n,
                        _ => {
                            return Err(ConfigError::InvalidValue {
                                flag: "--max-line-length",
                                value,
                            })
                        }
                    };
                }
                "--help" => return Ok(Invocation::Help),
                "--version" | "-v" => return Ok(Invocation::Version),
                other if other.starts_with('-') => {
                    return Err(ConfigError::UnknownArgument(other.to_string()))
                }
                other if port.is_none() => port = Some(parse_port(other)?),
                other => return Err(ConfigError::UnknownArgument(other.to_string())),
            }
        }

        let port = port.ok_or(ConfigError::MissingPort)?;
        Ok(Invocation::Serve(Config {
            host,
            port,
            idle_timeout,
            max_line_length,
        }))
    }

    /// Returns the bind address as a string
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Per-connection limits derived from this configuration.
    pub fn connection_options(&self) -> ConnectionOptions {
        ConnectionOptions {
            idle_timeout: self.idle_timeout,
            max_line_length: self.max_line_length,
        }
    }
}

/// Parses a listening port: a positive integer that fits in 16 bits.
pub fn parse_port(value: &str) -> Result<u16, ConfigError> {
    match value.parse::<u16>() {
        Ok(port) if port > 0 => Ok(port),
        _ => Err(ConfigError::InvalidPort(value.to_string())),
    }
}
