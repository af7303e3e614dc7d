//! Tests for the record codec
//!
//! These tests verify:
//! - Header encoding and version validation
//! - Metadata block layout and size
//! - Record assembly (metadata + key + value)
//! - Truncated input detection

use ledgerkv::record::{encode_record, Header, Metadata, FORMAT_VERSION, HEADER_SIZE, METADATA_SIZE};
use ledgerkv::LedgerError;

// =============================================================================
// Header Tests
// =============================================================================

#[test]
fn test_default_header_is_current_version() {
    let header = Header::default();

    assert_eq!(header.version, FORMAT_VERSION);
    assert_eq!(header.encode(), [FORMAT_VERSION]);
    assert_eq!(HEADER_SIZE, 1);
}

#[test]
fn test_header_decode_and_validate() {
    let header = Header::decode(&[FORMAT_VERSION]).unwrap();
    header.validate().unwrap();
}

#[test]
fn test_header_version_mismatch() {
    let header = Header::decode(&[FORMAT_VERSION + 1]).unwrap();

    match header.validate() {
        Err(LedgerError::InvalidFormat { found, expected }) => {
            assert_eq!(found, FORMAT_VERSION + 1);
            assert_eq!(expected, FORMAT_VERSION);
        }
        other => panic!("Expected InvalidFormat, got {:?}", other),
    }
}

#[test]
fn test_header_decode_empty() {
    assert!(matches!(Header::decode(&[]), Err(LedgerError::Corruption(_))));
}

// =============================================================================
// Metadata Tests
// =============================================================================

#[test]
fn test_metadata_new_is_live() {
    let meta = Metadata::new(1, b"key1", b"value1", 1653439942).unwrap();

    assert_eq!(meta.offset, 1);
    assert_eq!(meta.key_size, 4);
    assert_eq!(meta.value_size, 6);
    assert_eq!(meta.created, 1653439942);
    assert_eq!(meta.deleted, 0);
    assert!(!meta.is_deleted());
}

#[test]
fn test_metadata_offsets() {
    let meta = Metadata::new(100, b"key", b"value", 0).unwrap();

    assert_eq!(meta.key_offset(), 100 + METADATA_SIZE);
    assert_eq!(meta.value_offset(), 100 + METADATA_SIZE + 3);
    assert_eq!(meta.payload_len(), 8);
    assert_eq!(meta.record_len(), METADATA_SIZE + 8);
}

#[test]
fn test_metadata_encoded_size() {
    let meta = Metadata::new(1, b"k", b"v", 0).unwrap();
    assert_eq!(meta.encode().len() as u64, METADATA_SIZE);
}

#[test]
fn test_tombstone_survives_decode() {
    let mut meta = Metadata::new(57, b"key", b"value", 10).unwrap();
    meta.deleted = 20;

    let decoded = Metadata::decode(&meta.encode()).unwrap();

    assert_eq!(decoded, meta);
    assert!(decoded.is_deleted());
}

#[test]
fn test_metadata_decode_truncated() {
    let meta = Metadata::new(1, b"key", b"value", 10).unwrap();
    let bytes = meta.encode();

    let result = Metadata::decode(&bytes[..METADATA_SIZE as usize - 1]);

    assert!(matches!(result, Err(LedgerError::Corruption(_))));
}

#[test]
fn test_metadata_decode_ignores_trailing_bytes() {
    let meta = Metadata::new(1, b"key", b"value", 10).unwrap();
    let mut bytes = meta.encode().to_vec();
    bytes.extend_from_slice(b"keyvalue");

    assert_eq!(Metadata::decode(&bytes).unwrap(), meta);
}

// =============================================================================
// Record Tests
// =============================================================================

#[test]
fn test_encode_record_layout() {
    let meta = Metadata::new(1, b"key1", b"value1", 1653439942).unwrap();
    let record = encode_record(&meta, b"key1", b"value1");

    assert_eq!(record.len() as u64, meta.record_len());
    assert_eq!(&record[..METADATA_SIZE as usize], &meta.encode()[..]);
    assert_eq!(&record[METADATA_SIZE as usize..METADATA_SIZE as usize + 4], b"key1");
    assert_eq!(&record[METADATA_SIZE as usize + 4..], b"value1");
}

#[test]
fn test_encode_record_empty_key_and_value() {
    let meta = Metadata::new(1, b"", b"", 0).unwrap();
    let record = encode_record(&meta, b"", b"");

    assert_eq!(record.len() as u64, METADATA_SIZE);
    assert_eq!(meta.payload_len(), 0);
}
