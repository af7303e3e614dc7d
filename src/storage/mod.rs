//! Storage Module
//!
//! The single append-only data file backing the store.
//!
//! ## Responsibilities
//! - Write the header on creation, validate it on open
//! - Own the append cursor
//! - Positioned reads and writes (no shared seek position)
//! - Sequential replay of every record for index rebuilding
//! - Cut off a torn trailing record left by an interrupted append
//!
//! ## Positioned I/O
//! Reads take `&self` and never move a shared cursor, so any number of
//! readers can use the file while the engine holds a read lock. The only
//! in-place write is the tombstone rewrite of a metadata block.

mod log_file;
mod replay;

pub use log_file::LogFile;
pub use replay::{Replay, ReplayEntry};
