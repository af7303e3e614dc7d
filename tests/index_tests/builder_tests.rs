//! Tests for the key index and its rebuild from the log
//!
//! These tests verify:
//! - Last block per key wins, tombstones included
//! - Live filtering
//! - Torn tail is cut and reported
//! - Replay statistics

use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::PathBuf;

use ledgerkv::config::SyncStrategy;
use ledgerkv::index::{IndexBuilder, KeyIndex, ReplayStats};
use ledgerkv::record::{encode_record, Metadata, HEADER_SIZE};
use ledgerkv::storage::LogFile;
use tempfile::TempDir;

// =============================================================================
// Helper Functions
// =============================================================================

fn setup_temp_log() -> (TempDir, PathBuf) {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("index.db");
    (temp_dir, path)
}

fn put(log: &mut LogFile, key: &[u8], value: &[u8]) -> Metadata {
    let meta = Metadata::new(log.cursor(), key, value, 100).unwrap();
    log.append(&encode_record(&meta, key, value)).unwrap();
    meta
}

fn tombstone(log: &mut LogFile, meta: &Metadata) -> Metadata {
    let mut dead = *meta;
    dead.deleted = 200;
    log.overwrite(dead.offset, &dead.encode()).unwrap();
    dead
}

fn reopen(path: &PathBuf) -> LogFile {
    LogFile::open(path, SyncStrategy::EveryWrite).unwrap()
}

// =============================================================================
// KeyIndex Tests
// =============================================================================

#[test]
fn test_key_index_insert_shadows() {
    let mut index = KeyIndex::new();
    let first = Metadata::new(1, b"k", b"v1", 0).unwrap();
    let second = Metadata::new(36, b"k", b"v2", 0).unwrap();

    assert!(index.insert(b"k".to_vec(), first).is_none());
    assert_eq!(index.insert(b"k".to_vec(), second), Some(first));

    assert_eq!(index.len(), 1);
    assert_eq!(index.get(b"k"), Some(&second));
}

#[test]
fn test_key_index_live_filters_tombstones() {
    let mut index = KeyIndex::new();
    let live = Metadata::new(1, b"a", b"1", 0).unwrap();
    let mut dead = Metadata::new(35, b"b", b"2", 0).unwrap();
    dead.deleted = 5;

    index.insert(b"a".to_vec(), live);
    index.insert(b"b".to_vec(), dead);

    assert_eq!(index.live(b"a"), Some(&live));
    assert!(index.live(b"b").is_none());
    assert!(index.get(b"b").is_some());
    assert_eq!(index.len(), 2);
    assert_eq!(index.live_count(), 1);

    let live_keys: Vec<&[u8]> = index.live_entries().map(|(k, _)| k).collect();
    assert_eq!(live_keys, vec![&b"a"[..]]);
}

#[test]
fn test_key_index_get_mut() {
    let mut index = KeyIndex::new();
    index.insert(b"k".to_vec(), Metadata::new(1, b"k", b"v", 0).unwrap());

    index.get_mut(b"k").unwrap().deleted = 9;

    assert!(index.get(b"k").unwrap().is_deleted());
    assert!(index.get_mut(b"missing").is_none());
}

// =============================================================================
// Rebuild Tests
// =============================================================================

#[test]
fn test_rebuild_empty_log() {
    let (_temp, path) = setup_temp_log();
    let mut log = reopen(&path);

    let (index, stats) = IndexBuilder::rebuild(&mut log).unwrap();

    assert!(index.is_empty());
    assert_eq!(stats, ReplayStats::default());
    assert_eq!(log.cursor(), HEADER_SIZE);
}

#[test]
fn test_rebuild_last_block_wins() {
    let (_temp, path) = setup_temp_log();
    let mut log = reopen(&path);
    put(&mut log, b"key", b"old");
    let latest = put(&mut log, b"key", b"new");
    let other = put(&mut log, b"other", b"value");
    log.close().unwrap();

    let mut log = reopen(&path);
    let (index, stats) = IndexBuilder::rebuild(&mut log).unwrap();

    assert_eq!(index.len(), 2);
    assert_eq!(index.get(b"key"), Some(&latest));
    assert_eq!(index.get(b"other"), Some(&other));
    assert_eq!(stats.blocks_replayed, 3);
    assert_eq!(stats.tombstones, 0);
}

#[test]
fn test_rebuild_tombstone_after_live_block_hides_key() {
    let (_temp, path) = setup_temp_log();
    let mut log = reopen(&path);
    put(&mut log, b"key", b"v1");
    let second = put(&mut log, b"key", b"v2");
    tombstone(&mut log, &second);
    log.close().unwrap();

    let mut log = reopen(&path);
    let (index, stats) = IndexBuilder::rebuild(&mut log).unwrap();

    assert!(index.live(b"key").is_none());
    assert!(index.get(b"key").unwrap().is_deleted());
    assert_eq!(stats.tombstones, 1);
}

#[test]
fn test_rebuild_put_after_tombstone_is_live() {
    let (_temp, path) = setup_temp_log();
    let mut log = reopen(&path);
    let first = put(&mut log, b"key", b"v1");
    tombstone(&mut log, &first);
    let revived = put(&mut log, b"key", b"v2");
    log.close().unwrap();

    let mut log = reopen(&path);
    let (index, _) = IndexBuilder::rebuild(&mut log).unwrap();

    assert_eq!(index.live(b"key"), Some(&revived));
}

#[test]
fn test_rebuild_sets_cursor_after_last_record() {
    let (_temp, path) = setup_temp_log();
    let mut log = reopen(&path);
    put(&mut log, b"a", b"1");
    put(&mut log, b"b", b"22");
    let end = log.cursor();
    log.close().unwrap();

    let mut log = reopen(&path);
    IndexBuilder::rebuild(&mut log).unwrap();

    assert_eq!(log.cursor(), end);
}

#[test]
fn test_rebuild_cuts_torn_tail() {
    let (_temp, path) = setup_temp_log();
    let mut log = reopen(&path);
    let kept = put(&mut log, b"kept", b"value");
    let end = log.cursor();
    log.close().unwrap();

    let mut file = OpenOptions::new().append(true).open(&path).unwrap();
    file.write_all(&[0x11; 10]).unwrap();
    drop(file);

    let mut log = reopen(&path);
    let (index, stats) = IndexBuilder::rebuild(&mut log).unwrap();

    assert_eq!(index.get(b"kept"), Some(&kept));
    assert_eq!(stats.truncated_bytes, 10);
    assert_eq!(log.cursor(), end);
    assert_eq!(fs::metadata(&path).unwrap().len(), end);
}
