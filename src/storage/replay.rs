//! Log Replay
//!
//! Sequential iteration over every record in the data file.

use std::fs::File;
use std::io::{BufReader, Read, Seek, SeekFrom};

use crate::error::{LedgerError, Result};
use crate::record::{Metadata, HEADER_SIZE, METADATA_SIZE};

/// One decoded record: its metadata block and key (the value is skipped)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReplayEntry {
    pub meta: Metadata,
    pub key: Vec<u8>,
}

/// Iterator over records in file order
///
/// Stops cleanly at end-of-file. A trailing record that does not fit in the
/// file (torn append) also ends iteration; `position()` then points at its
/// start and `torn_bytes()` reports how much of it is on disk.
pub struct Replay<'a> {
    reader: BufReader<&'a File>,
    /// Offset just past the last complete record
    position: u64,
    /// File length at the time replay started
    end: u64,
    finished: bool,
}

impl<'a> Replay<'a> {
    pub(super) fn new(file: &'a File, end: u64) -> Result<Self> {
        let mut reader = BufReader::new(file);
        reader.seek(SeekFrom::Start(HEADER_SIZE))?;
        Ok(Self {
            reader,
            position: HEADER_SIZE,
            end,
            finished: false,
        })
    }

    /// Offset just past the last complete record read so far
    pub fn position(&self) -> u64 {
        self.position
    }

    /// Bytes after the last complete record
    pub fn torn_bytes(&self) -> u64 {
        self.end - self.position
    }

    fn fail(&mut self, err: LedgerError) -> Option<Result<ReplayEntry>> {
        self.finished = true;
        Some(Err(err))
    }
}

impl<'a> Iterator for Replay<'a> {
    type Item = Result<ReplayEntry>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.finished {
            return None;
        }

        let remaining = self.end - self.position;
        if remaining < METADATA_SIZE {
            self.finished = true;
            return None;
        }

        let mut block = [0u8; METADATA_SIZE as usize];
        if let Err(e) = self.reader.read_exact(&mut block) {
            return self.fail(e.into());
        }

        let meta = match Metadata::decode(&block) {
            Ok(meta) => meta,
            Err(e) => return self.fail(e),
        };

        if meta.offset != self.position {
            return self.fail(LedgerError::Corruption(format!(
                "metadata block at offset {} records offset {}",
                self.position, meta.offset
            )));
        }

        // Payload runs past end-of-file: torn append
        if meta.record_len() > remaining {
            self.finished = true;
            return None;
        }

        let mut key = vec![0u8; meta.key_size as usize];
        if let Err(e) = self.reader.read_exact(&mut key) {
            return self.fail(e.into());
        }
        if let Err(e) = self.reader.seek_relative(meta.value_size as i64) {
            return self.fail(e.into());
        }

        self.position += meta.record_len();

        Some(Ok(ReplayEntry { meta, key }))
    }
}
