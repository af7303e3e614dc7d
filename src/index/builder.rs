//! Index Builder
//!
//! Rebuilds the key index by replaying the data file.

use crate::error::Result;
use crate::storage::LogFile;

use super::KeyIndex;

/// Outcome of a replay
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReplayStats {
    /// Complete records read
    pub blocks_replayed: u64,

    /// Records read that were tombstoned
    pub tombstones: u64,

    /// Bytes of a torn trailing record cut from the file
    pub truncated_bytes: u64,
}

/// Replays a log file into a fresh [`KeyIndex`]
pub struct IndexBuilder;

impl IndexBuilder {
    /// Rebuild the index from every record in `log`
    ///
    /// Later records shadow earlier ones for the same key, tombstones
    /// included. A torn trailing record is cut off and the log cursor moved
    /// to the end of the last complete record.
    pub fn rebuild(log: &mut LogFile) -> Result<(KeyIndex, ReplayStats)> {
        let mut index = KeyIndex::new();
        let mut stats = ReplayStats::default();

        let (last_complete, torn) = {
            let mut replay = log.replay()?;
            for entry in replay.by_ref() {
                let entry = entry?;
                stats.blocks_replayed += 1;
                if entry.meta.is_deleted() {
                    stats.tombstones += 1;
                }
                index.insert(entry.key, entry.meta);
            }
            (replay.position(), replay.torn_bytes())
        };

        if torn > 0 {
            tracing::warn!(
                "Cutting {} bytes of torn record at offset {} in {}",
                torn,
                last_complete,
                log.path().display()
            );
            log.truncate(last_complete)?;
            stats.truncated_bytes = torn;
        }

        tracing::debug!(
            "Replayed {} records ({} tombstones), {} keys indexed",
            stats.blocks_replayed,
            stats.tombstones,
            index.len()
        );

        Ok((index, stats))
    }
}
