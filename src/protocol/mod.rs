//! Protocol Module
//!
//! Line-based request/reply protocol spoken by the server.
//!
//! ## Request Format
//! ```text
//! *<N>\r\n
//! $<len>\r\n        (length marker, ignored)
//! <argument>\r\n
//! ... N marker/argument pairs ...
//! ```
//! Argument 0 is the verb, matched case-insensitively.
//!
//! ### Verbs
//! - `SET key value` → `+OK`
//! - `GET key`       → `+<value>` or `-Key not found`
//! - anything else   → `-unsupport command '<verb>'`
//!
//! ## Reply Format
//! One line per reply, `+` for success and `-` for failure. The replies of a
//! request are joined with `\r\n` and terminated with a trailing `\r\n`.
//!
//! Arguments are delimited by line breaks, so keys and values cannot contain
//! `\n`.

mod command;
mod response;
mod codec;

pub use command::Command;
pub use response::Reply;
pub use codec::{
    encode_replies, encode_request, read_reply, read_request, write_replies, write_request,
    MAX_ARGUMENTS, MAX_LINE_LENGTH,
};
