//! Protocol codec
//!
//! Framing of requests and replies on a byte stream.

use std::io::{BufRead, ErrorKind, Read, Write};

use crate::error::{LedgerError, Result};

use super::Reply;

/// Maximum number of arguments in one request
pub const MAX_ARGUMENTS: usize = 1024;

/// Maximum line length, terminator excluded (16 MB)
pub const MAX_LINE_LENGTH: usize = 16 * 1024 * 1024;

const LINE_END: &[u8] = b"\r\n";

// =============================================================================
// Requests
// =============================================================================

/// Read one request and return its arguments
///
/// Returns `Ok(None)` when the stream ends before a new request starts.
/// Malformed framing is a `Protocol` error; a stream ending mid-request is an
/// `UnexpectedEof` I/O error.
pub fn read_request<R: BufRead>(reader: &mut R) -> Result<Option<Vec<Vec<u8>>>> {
    let line = match read_line(reader)? {
        Some(line) => line,
        None => return Ok(None),
    };

    let count = parse_count(&line)?;

    let mut args = Vec::with_capacity(count);
    for i in 0..count * 2 {
        let line = read_line(reader)?.ok_or_else(|| {
            std::io::Error::new(ErrorKind::UnexpectedEof, "stream ended inside a request")
        })?;
        // Even lines are length markers
        if i % 2 == 1 {
            args.push(line);
        }
    }

    Ok(Some(args))
}

fn parse_count(line: &[u8]) -> Result<usize> {
    let digits = match line.split_first() {
        Some((b'*', digits)) => digits,
        _ => {
            return Err(LedgerError::Protocol(format!(
                "unknown request: {:?}",
                String::from_utf8_lossy(line)
            )))
        }
    };

    let count: usize = std::str::from_utf8(digits)
        .ok()
        .and_then(|s| s.parse().ok())
        .ok_or_else(|| {
            LedgerError::Protocol(format!(
                "invalid argument count: {:?}",
                String::from_utf8_lossy(digits)
            ))
        })?;

    if count == 0 || count > MAX_ARGUMENTS {
        return Err(LedgerError::Protocol(format!(
            "argument count {} out of range 1..={}",
            count, MAX_ARGUMENTS
        )));
    }

    Ok(count)
}

/// Encode arguments as a request
pub fn encode_request(args: &[&[u8]]) -> Vec<u8> {
    let mut message = Vec::new();
    message.extend_from_slice(format!("*{}", args.len()).as_bytes());
    message.extend_from_slice(LINE_END);
    for arg in args {
        message.extend_from_slice(format!("${}", arg.len()).as_bytes());
        message.extend_from_slice(LINE_END);
        message.extend_from_slice(arg);
        message.extend_from_slice(LINE_END);
    }
    message
}

/// Write a request to a stream
pub fn write_request<W: Write>(writer: &mut W, args: &[&[u8]]) -> Result<()> {
    writer.write_all(&encode_request(args))?;
    writer.flush()?;
    Ok(())
}

// =============================================================================
// Replies
// =============================================================================

/// Join reply lines with `\r\n` and terminate with a trailing `\r\n`
pub fn encode_replies(replies: &[Reply]) -> Vec<u8> {
    let lines: Vec<Vec<u8>> = replies.iter().map(Reply::encode).collect();
    let mut message = lines.join(LINE_END);
    message.extend_from_slice(LINE_END);
    message
}

/// Write the replies of one request to a stream
pub fn write_replies<W: Write>(writer: &mut W, replies: &[Reply]) -> Result<()> {
    writer.write_all(&encode_replies(replies))?;
    writer.flush()?;
    Ok(())
}

/// Read a single reply line
pub fn read_reply<R: BufRead>(reader: &mut R) -> Result<Reply> {
    let line = read_line(reader)?.ok_or_else(|| {
        std::io::Error::new(ErrorKind::UnexpectedEof, "stream ended before a reply")
    })?;
    Reply::decode(&line)
}

// =============================================================================
// Lines
// =============================================================================

/// Read a line, stripping `\n` and a preceding `\r`
///
/// Returns `Ok(None)` at end of stream. A final line without terminator is
/// returned as is.
fn read_line<R: BufRead>(reader: &mut R) -> Result<Option<Vec<u8>>> {
    let limit = (MAX_LINE_LENGTH + LINE_END.len()) as u64;
    let mut line = Vec::new();
    let read = reader.by_ref().take(limit).read_until(b'\n', &mut line)?;

    if read == 0 {
        return Ok(None);
    }

    if line.last() == Some(&b'\n') {
        line.pop();
        if line.last() == Some(&b'\r') {
            line.pop();
        }
    } else if read as u64 == limit {
        return Err(LedgerError::Protocol(format!(
            "line exceeds {} bytes",
            MAX_LINE_LENGTH
        )));
    }

    if line.len() > MAX_LINE_LENGTH {
        return Err(LedgerError::Protocol(format!(
            "line exceeds {} bytes",
            MAX_LINE_LENGTH
        )));
    }

    Ok(Some(line))
}
