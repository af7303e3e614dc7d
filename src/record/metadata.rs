//! Metadata block
//!
//! Fixed-size descriptor written in front of every key/value pair.

use bytes::{Buf, BufMut, Bytes, BytesMut};

use crate::error::{LedgerError, Result};

/// Metadata size: Offset (8) + KeySize (4) + ValueSize (4) + Created (8) + Deleted (8) = 32 bytes
pub const METADATA_SIZE: u64 = 32;

/// Describes one key/value pair in the log
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Metadata {
    /// Absolute file offset of this block
    pub offset: u64,
    /// Length of the key that follows the block
    pub key_size: u32,
    /// Length of the value that follows the key
    pub value_size: u32,
    /// Unix timestamp of the put
    pub created: i64,
    /// Unix timestamp of the delete, 0 while live
    pub deleted: i64,
}

impl Metadata {
    /// Describe a new live record at `offset`
    pub fn new(offset: u64, key: &[u8], value: &[u8], created: i64) -> Result<Self> {
        Ok(Self {
            offset,
            key_size: size_field(key.len())?,
            value_size: size_field(value.len())?,
            created,
            deleted: 0,
        })
    }

    /// Whether this block is a tombstone
    pub fn is_deleted(&self) -> bool {
        self.deleted != 0
    }

    /// Key plus value length
    pub fn payload_len(&self) -> u64 {
        self.key_size as u64 + self.value_size as u64
    }

    /// Total bytes this record occupies in the log
    pub fn record_len(&self) -> u64 {
        METADATA_SIZE + self.payload_len()
    }

    /// File offset of the key bytes
    pub fn key_offset(&self) -> u64 {
        self.offset + METADATA_SIZE
    }

    /// File offset of the value bytes
    pub fn value_offset(&self) -> u64 {
        self.key_offset() + self.key_size as u64
    }

    pub fn encode_into<B: BufMut>(&self, buf: &mut B) {
        buf.put_i64_le(self.offset as i64);
        buf.put_u32_le(self.key_size);
        buf.put_u32_le(self.value_size);
        buf.put_i64_le(self.created);
        buf.put_i64_le(self.deleted);
    }

    pub fn encode(&self) -> [u8; METADATA_SIZE as usize] {
        let mut out = [0u8; METADATA_SIZE as usize];
        let mut slot = &mut out[..];
        self.encode_into(&mut slot);
        out
    }

    /// Decode a block from the first `METADATA_SIZE` bytes of `bytes`
    pub fn decode(bytes: &[u8]) -> Result<Self> {
        if bytes.len() < METADATA_SIZE as usize {
            return Err(LedgerError::Corruption(format!(
                "truncated metadata block: expected {} bytes, got {}",
                METADATA_SIZE,
                bytes.len()
            )));
        }

        let mut buf = &bytes[..METADATA_SIZE as usize];
        let offset = buf.get_i64_le();
        if offset < 0 {
            return Err(LedgerError::Corruption(format!(
                "negative record offset {}",
                offset
            )));
        }

        Ok(Self {
            offset: offset as u64,
            key_size: buf.get_u32_le(),
            value_size: buf.get_u32_le(),
            created: buf.get_i64_le(),
            deleted: buf.get_i64_le(),
        })
    }
}

/// Serialize metadata, key and value into one contiguous record
pub fn encode_record(meta: &Metadata, key: &[u8], value: &[u8]) -> Bytes {
    let mut buf = BytesMut::with_capacity(meta.record_len() as usize);
    meta.encode_into(&mut buf);
    buf.put_slice(key);
    buf.put_slice(value);
    buf.freeze()
}

fn size_field(len: usize) -> Result<u32> {
    u32::try_from(len).map_err(|_| LedgerError::RecordTooLarge { len })
}
