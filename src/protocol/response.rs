//! Reply definitions
//!
//! Represents reply lines sent to clients.

use crate::error::{LedgerError, Result};

/// A single reply line
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reply {
    /// `+OK`
    Ok,

    /// `+<value>`
    Value(Vec<u8>),

    /// `-<message>`
    Error(String),
}

impl Reply {
    /// Create an ERROR reply
    pub fn error(message: impl Into<String>) -> Self {
        Reply::Error(message.into())
    }

    pub fn key_not_found() -> Self {
        Reply::error("Key not found")
    }

    pub fn missing_arguments() -> Self {
        Reply::error("Missing arguments")
    }

    pub fn unsupported(verb: &[u8]) -> Self {
        Reply::Error(format!(
            "unsupport command '{}'",
            String::from_utf8_lossy(verb)
        ))
    }

    /// Line bytes without the terminator
    pub fn encode(&self) -> Vec<u8> {
        match self {
            Reply::Ok => b"+OK".to_vec(),
            Reply::Value(value) => {
                let mut line = Vec::with_capacity(1 + value.len());
                line.push(b'+');
                line.extend_from_slice(value);
                line
            }
            Reply::Error(message) => {
                let mut line = Vec::with_capacity(1 + message.len());
                line.push(b'-');
                line.extend_from_slice(message.as_bytes());
                line
            }
        }
    }

    /// Parse a reply line (terminator already stripped)
    ///
    /// `+OK` is ambiguous with a stored value of `OK`; it decodes as `Ok`.
    pub fn decode(line: &[u8]) -> Result<Self> {
        match line.split_first() {
            Some((b'+', rest)) if rest == b"OK" => Ok(Reply::Ok),
            Some((b'+', rest)) => Ok(Reply::Value(rest.to_vec())),
            Some((b'-', rest)) => Ok(Reply::Error(String::from_utf8_lossy(rest).into_owned())),
            _ => Err(LedgerError::Protocol(format!(
                "unrecognized reply line: {:?}",
                String::from_utf8_lossy(line)
            ))),
        }
    }
}
