//! Log File
//!
//! Owns the data file handle, the append cursor and the sync policy.

use std::fs::{File, OpenOptions};
use std::io::{self, ErrorKind};
use std::path::{Path, PathBuf};

use crate::config::SyncStrategy;
use crate::error::{LedgerError, Result};
use crate::record::{Header, HEADER_SIZE};

use super::replay::Replay;

/// Append-only data file
pub struct LogFile {
    /// Location of the data file
    path: PathBuf,
    /// Open handle (read + write)
    file: File,
    /// Next append offset
    cursor: u64,
    /// When to fsync
    sync_strategy: SyncStrategy,
    /// Mutations since the last fsync
    unsynced_writes: usize,
}

impl LogFile {
    /// Open the data file at `path`, creating it if it does not exist
    ///
    /// A new file gets its header and a cursor just past it. An existing
    /// file has its header validated; the cursor is left at end-of-file until
    /// replay decides where the last complete record ends.
    pub fn open(path: &Path, sync_strategy: SyncStrategy) -> Result<Self> {
        let created = OpenOptions::new()
            .read(true)
            .write(true)
            .create_new(true)
            .open(path);

        match created {
            Ok(file) => Self::initialize(path, file, sync_strategy),
            Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                Self::open_existing(path, sync_strategy)
            }
            Err(e) => Err(e.into()),
        }
    }

    fn initialize(path: &Path, file: File, sync_strategy: SyncStrategy) -> Result<Self> {
        write_all_at(&file, &Header::default().encode(), 0)?;
        file.sync_all()?;

        tracing::info!("Created data file {}", path.display());

        Ok(Self {
            path: path.to_path_buf(),
            file,
            cursor: HEADER_SIZE,
            sync_strategy,
            unsynced_writes: 0,
        })
    }

    fn open_existing(path: &Path, sync_strategy: SyncStrategy) -> Result<Self> {
        let file = OpenOptions::new().read(true).write(true).open(path)?;
        let file_len = file.metadata()?.len();

        if file_len < HEADER_SIZE {
            return Err(LedgerError::Corruption(format!(
                "missing file header in {}",
                path.display()
            )));
        }

        let mut header = [0u8; HEADER_SIZE as usize];
        read_exact_at(&file, &mut header, 0)?;
        Header::decode(&header)?.validate()?;

        Ok(Self {
            path: path.to_path_buf(),
            file,
            cursor: file_len,
            sync_strategy,
            unsynced_writes: 0,
        })
    }

    /// Append `bytes` at the cursor and return the advanced cursor
    ///
    /// The cursor only moves once the whole write succeeded. A failed write
    /// is cut back to the cursor so no partial record outlives it.
    pub fn append(&mut self, bytes: &[u8]) -> Result<u64> {
        self.append_with(bytes, write_all_at)
    }

    fn append_with<W>(&mut self, bytes: &[u8], write: W) -> Result<u64>
    where
        W: FnOnce(&File, &[u8], u64) -> io::Result<()>,
    {
        if let Err(e) = write(&self.file, bytes, self.cursor) {
            if let Err(trunc) = self.file.set_len(self.cursor) {
                tracing::error!(
                    "Failed to cut partial append at {} in {}: {}",
                    self.cursor,
                    self.path.display(),
                    trunc
                );
            }
            return Err(e.into());
        }
        self.cursor += bytes.len() as u64;
        self.after_write()?;
        Ok(self.cursor)
    }

    /// Rewrite already-appended bytes in place
    pub fn overwrite(&mut self, offset: u64, bytes: &[u8]) -> Result<()> {
        let end = offset + bytes.len() as u64;
        if offset < HEADER_SIZE || end > self.cursor {
            return Err(LedgerError::Storage(format!(
                "overwrite of [{}, {}) outside written region [{}, {})",
                offset, end, HEADER_SIZE, self.cursor
            )));
        }

        write_all_at(&self.file, bytes, offset)?;
        self.after_write()
    }

    /// Read exactly `len` bytes starting at `offset`
    pub fn read_at(&self, offset: u64, len: usize) -> Result<Vec<u8>> {
        let mut buf = vec![0u8; len];
        read_exact_at(&self.file, &mut buf, offset)?;
        Ok(buf)
    }

    /// Sequential reader over every record after the header
    pub fn replay(&self) -> Result<Replay<'_>> {
        Replay::new(&self.file, self.cursor)
    }

    /// Drop everything from `len` onwards and move the cursor there
    pub fn truncate(&mut self, len: u64) -> Result<()> {
        if len < HEADER_SIZE || len > self.cursor {
            return Err(LedgerError::Storage(format!(
                "cannot truncate to {} (header {}, cursor {})",
                len, HEADER_SIZE, self.cursor
            )));
        }

        self.file.set_len(len)?;
        self.file.sync_all()?;
        self.cursor = len;
        Ok(())
    }

    /// Force file data to disk
    pub fn sync(&mut self) -> Result<()> {
        self.file.sync_data()?;
        self.unsynced_writes = 0;
        Ok(())
    }

    /// Sync and release the handle
    pub fn close(self) -> Result<()> {
        self.file.sync_all()?;
        tracing::debug!("Closed data file {}", self.path.display());
        Ok(())
    }

    /// Next append offset
    pub fn cursor(&self) -> u64 {
        self.cursor
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn after_write(&mut self) -> Result<()> {
        self.unsynced_writes += 1;
        let due = match self.sync_strategy {
            SyncStrategy::EveryWrite => true,
            SyncStrategy::EveryNWrites { count } => self.unsynced_writes >= count,
        };
        if due {
            self.sync()?;
        }
        Ok(())
    }
}

// =============================================================================
// Positioned I/O
// =============================================================================

#[cfg(unix)]
fn read_exact_at(file: &File, buf: &mut [u8], offset: u64) -> io::Result<()> {
    std::os::unix::fs::FileExt::read_exact_at(file, buf, offset)
}

#[cfg(unix)]
fn write_all_at(file: &File, buf: &[u8], offset: u64) -> io::Result<()> {
    std::os::unix::fs::FileExt::write_all_at(file, buf, offset)
}

#[cfg(windows)]
fn read_exact_at(file: &File, mut buf: &mut [u8], mut offset: u64) -> io::Result<()> {
    use std::os::windows::fs::FileExt;

    while !buf.is_empty() {
        match file.seek_read(buf, offset) {
            Ok(0) => {
                return Err(io::Error::new(
                    ErrorKind::UnexpectedEof,
                    "failed to fill whole buffer",
                ))
            }
            Ok(n) => {
                buf = &mut buf[n..];
                offset += n as u64;
            }
            Err(e) if e.kind() == ErrorKind::Interrupted => {}
            Err(e) => return Err(e),
        }
    }
    Ok(())
}

#[cfg(windows)]
fn write_all_at(file: &File, mut buf: &[u8], mut offset: u64) -> io::Result<()> {
    use std::os::windows::fs::FileExt;

    while !buf.is_empty() {
        match file.seek_write(buf, offset) {
            Ok(0) => {
                return Err(io::Error::new(
                    ErrorKind::WriteZero,
                    "failed to write whole buffer",
                ))
            }
            Ok(n) => {
                buf = &buf[n..];
                offset += n as u64;
            }
            Err(e) if e.kind() == ErrorKind::Interrupted => {}
            Err(e) => return Err(e),
        }
    }
    Ok(())
}
