//! # LedgerKV
//!
//! A minimal persistent key-value store with:
//! - A single append-only data file with a fixed binary record format
//! - An in-memory index rebuilt by replaying the file on open
//! - In-place tombstones instead of delete records
//! - Single-writer/multi-reader concurrency model
//! - A line-based TCP protocol
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                      TCP Server                              │
//! │        (Acceptor + Connection Threads, Line Protocol)        │
//! └─────────────────────┬───────────────────────────────────────┘
//!                       │
//! ┌─────────────────────▼───────────────────────────────────────┐
//! │                       Engine                                 │
//! │            (Single Writer / Multi Reader)                    │
//! └─────────────────────┬───────────────────────────────────────┘
//!                       │
//!          ┌────────────┴────────────┐
//!          │                         │
//!          ▼                         ▼
//!   ┌─────────────┐          ┌─────────────┐
//!   │  Log File   │          │  Key Index  │
//!   │  (Append)   │◄─replay──│  (HashMap)  │
//!   └──────┬──────┘          └─────────────┘
//!          │
//!          ▼
//!   ┌─────────────┐
//!   │Record Codec │
//!   └─────────────┘
//! ```
//!
//! ## Known Limitations
//! Superseded and deleted records are never reclaimed: there is no
//! compaction, so the data file only grows. Opening a file replays all of it.

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod config;
pub mod clock;

pub mod record;
pub mod storage;
pub mod index;
pub mod network;
pub mod protocol;
pub mod engine;

// =============================================================================
// Public API Re-exports
// =============================================================================

pub use error::{LedgerError, Result};
pub use config::{Config, SyncStrategy};
pub use engine::Engine;

// =============================================================================
// Version Info
// =============================================================================

/// Current version of LedgerKV
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
