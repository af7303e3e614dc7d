//! Engine Module
//!
//! The core storage engine that coordinates all components.
//!
//! ## Responsibilities
//! - Open (or create) the data file and rebuild the index by replay
//! - Put / Get / Delete / GetAll on top of the log file and index
//! - Serialize mutations, let reads run concurrently
//! - Route parsed protocol commands

use std::path::Path;
use std::sync::Arc;

use parking_lot::RwLock;

use crate::clock::{Clock, SystemClock};
use crate::config::Config;
use crate::error::{LedgerError, Result};
use crate::index::{IndexBuilder, KeyIndex, ReplayStats};
use crate::protocol::{Command, Reply};
use crate::record::{encode_record, Metadata};
use crate::storage::LogFile;

/// Log file and index, always changed together
struct EngineState {
    log: LogFile,
    index: KeyIndex,
}

/// The main storage engine
///
/// ## Concurrency Model: Single-Writer / Multiple-Reader (SWMR)
///
/// - **Writes** (put/delete): take the state write lock
///   - Only ONE mutation at a time
///   - Append (or tombstone rewrite) happens before the index update
///
/// - **Reads** (get/get_all): take the state read lock
///   - Positioned reads, no shared file cursor
///   - Always see the latest completed write
pub struct Engine {
    state: RwLock<EngineState>,

    /// Source of created/deleted timestamps
    clock: Arc<dyn Clock>,

    /// What replay found when the engine was opened
    replay_stats: ReplayStats,
}

impl Engine {
    /// Open or create a data file with default settings
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let config = Config::builder().data_path(path.as_ref()).build();
        Self::open_with(&config, Arc::new(SystemClock))
    }

    /// Open or create the data file named by `config`
    ///
    /// On startup:
    /// 1. Create the file with a header, or validate an existing header
    /// 2. Replay every record into the index
    /// 3. Cut a torn trailing record, if any
    /// 4. Ready to serve requests
    pub fn open_with(config: &Config, clock: Arc<dyn Clock>) -> Result<Self> {
        let mut log = LogFile::open(&config.data_path, config.sync_strategy)?;
        let (index, replay_stats) = IndexBuilder::rebuild(&mut log)?;

        tracing::info!(
            "Opened {}: {} records replayed, {} live keys, cursor at {}",
            config.data_path.display(),
            replay_stats.blocks_replayed,
            index.live_count(),
            log.cursor()
        );

        Ok(Self {
            state: RwLock::new(EngineState { log, index }),
            clock,
            replay_stats,
        })
    }

    /// Execute a command and return its reply
    ///
    /// `KeyNotFound` becomes a negative reply; any other error is returned.
    pub fn execute(&self, command: Command) -> Result<Reply> {
        match command {
            Command::Set { key, value } => {
                self.put(&key, &value)?;
                Ok(Reply::Ok)
            }
            Command::Get { key } => match self.get(&key) {
                Ok(value) => Ok(Reply::Value(value)),
                Err(LedgerError::KeyNotFound) => Ok(Reply::key_not_found()),
                Err(e) => Err(e),
            },
            Command::MissingArguments { .. } => Ok(Reply::missing_arguments()),
            Command::Unsupported { verb } => Ok(Reply::unsupported(&verb)),
        }
    }

    /// Store `value` under `key`, making the key live
    ///
    /// Steps:
    /// 1. Acquire write lock
    /// 2. Append metadata + key + value at the cursor in one write
    /// 3. Point the index at the new block
    pub fn put(&self, key: &[u8], value: &[u8]) -> Result<()> {
        let mut state = self.state.write();

        let meta = Metadata::new(state.log.cursor(), key, value, self.clock.now())?;
        let record = encode_record(&meta, key, value);
        state.log.append(&record)?;

        state.index.insert(key.to_vec(), meta);

        tracing::trace!("put {} bytes at offset {}", record.len(), meta.offset);
        Ok(())
    }

    /// Get the value stored under `key`
    pub fn get(&self, key: &[u8]) -> Result<Vec<u8>> {
        let state = self.state.read();

        let meta = state.index.live(key).ok_or(LedgerError::KeyNotFound)?;
        state
            .log
            .read_at(meta.value_offset(), meta.value_size as usize)
    }

    /// Tombstone `key`
    ///
    /// Only the metadata block is rewritten, in place at its own offset.
    /// Deleting an absent or already deleted key is `KeyNotFound`.
    pub fn delete(&self, key: &[u8]) -> Result<()> {
        let mut state = self.state.write();

        let mut meta = *state.index.live(key).ok_or(LedgerError::KeyNotFound)?;
        // deleted == 0 means live on disk
        meta.deleted = self.clock.now().max(1);
        state.log.overwrite(meta.offset, &meta.encode())?;

        if let Some(entry) = state.index.get_mut(key) {
            *entry = meta;
        }

        tracing::trace!("deleted block at offset {}", meta.offset);
        Ok(())
    }

    /// Every live value, in unspecified order
    ///
    /// Tombstoned keys are skipped, as `get` would report them missing.
    pub fn get_all(&self) -> Result<Vec<Vec<u8>>> {
        let state = self.state.read();

        state
            .index
            .live_entries()
            .map(|(_, meta)| {
                state
                    .log
                    .read_at(meta.value_offset(), meta.value_size as usize)
            })
            .collect()
    }

    /// Whether `key` is currently retrievable
    pub fn contains(&self, key: &[u8]) -> bool {
        self.state.read().index.live(key).is_some()
    }

    /// Number of live keys
    pub fn len(&self) -> usize {
        self.state.read().index.live_count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Force pending writes to disk
    pub fn sync(&self) -> Result<()> {
        self.state.write().log.sync()
    }

    /// Close the engine, syncing and releasing the data file
    pub fn close(self) -> Result<()> {
        let state = self.state.into_inner();
        state.log.close()
    }

    // =========================================================================
    // Accessors (for testing and debugging)
    // =========================================================================

    /// Next append offset in the data file
    pub fn cursor(&self) -> u64 {
        self.state.read().log.cursor()
    }

    /// Path of the data file
    pub fn path(&self) -> std::path::PathBuf {
        self.state.read().log.path().to_path_buf()
    }

    /// What replay found when the engine was opened
    pub fn replay_stats(&self) -> ReplayStats {
        self.replay_stats
    }
}
