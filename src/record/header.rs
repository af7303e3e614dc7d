//! File header
//!
//! Written once when the data file is created, checked once on open.

use crate::error::{LedgerError, Result};

/// Current on-disk format version
pub const FORMAT_VERSION: u8 = 1;

/// Header size: Version (1) = 1 byte
pub const HEADER_SIZE: u64 = 1;

/// Data file header
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Header {
    pub version: u8,
}

impl Default for Header {
    fn default() -> Self {
        Self {
            version: FORMAT_VERSION,
        }
    }
}

impl Header {
    pub fn encode(&self) -> [u8; HEADER_SIZE as usize] {
        [self.version]
    }

    /// Decode a header without checking the version
    pub fn decode(bytes: &[u8]) -> Result<Self> {
        match bytes.first() {
            Some(&version) => Ok(Self { version }),
            None => Err(LedgerError::Corruption("missing file header".to_string())),
        }
    }

    /// Fail with `InvalidFormat` unless this is the supported version
    pub fn validate(&self) -> Result<()> {
        if self.version != FORMAT_VERSION {
            return Err(LedgerError::InvalidFormat {
                found: self.version,
                expected: FORMAT_VERSION,
            });
        }
        Ok(())
    }
}
