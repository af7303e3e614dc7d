//! Index Module
//!
//! In-memory map from key to the most recent metadata block for that key.
//!
//! ## Responsibilities
//! - O(1) lookup of a key's record location
//! - Keep exactly one entry per key, live or tombstoned
//! - Rebuild from the data file on open (last block per key wins)
//!
//! ## Data Structure Choice
//! `HashMap<Vec<u8>, Metadata>`: no ordering is needed because GetAll makes
//! no ordering promise. The map holds no locks of its own; the engine
//! serializes mutation.

mod builder;
mod table;

pub use builder::{IndexBuilder, ReplayStats};
pub use table::KeyIndex;
