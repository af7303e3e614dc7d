//! Command definitions
//!
//! Represents commands from clients.

/// A parsed command
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Store a value under a key
    Set { key: Vec<u8>, value: Vec<u8> },

    /// Fetch the value stored under a key
    Get { key: Vec<u8> },

    /// A known verb without enough arguments
    MissingArguments { verb: Vec<u8> },

    /// An unknown verb
    Unsupported { verb: Vec<u8> },
}

impl Command {
    /// Interpret the arguments of one request
    ///
    /// Arguments past the ones a verb needs are ignored.
    pub fn parse(args: Vec<Vec<u8>>) -> Self {
        let mut args = args.into_iter();
        let verb = args.next().unwrap_or_default();

        if verb.eq_ignore_ascii_case(b"SET") {
            match (args.next(), args.next()) {
                (Some(key), Some(value)) => Command::Set { key, value },
                _ => Command::MissingArguments { verb },
            }
        } else if verb.eq_ignore_ascii_case(b"GET") {
            match args.next() {
                Some(key) => Command::Get { key },
                None => Command::MissingArguments { verb },
            }
        } else {
            Command::Unsupported { verb }
        }
    }
}
