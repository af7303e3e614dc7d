//! Key index
//!
//! HashMap-based key directory.

use std::collections::HashMap;

use crate::record::Metadata;

/// Key → latest metadata block
#[derive(Debug, Default, Clone)]
pub struct KeyIndex {
    entries: HashMap<Vec<u8>, Metadata>,
}

impl KeyIndex {
    /// Create an empty index
    pub fn new() -> Self {
        Self::default()
    }

    /// Point `key` at `meta`, returning the entry it shadows
    pub fn insert(&mut self, key: Vec<u8>, meta: Metadata) -> Option<Metadata> {
        self.entries.insert(key, meta)
    }

    /// Latest block for `key`, tombstoned or not
    pub fn get(&self, key: &[u8]) -> Option<&Metadata> {
        self.entries.get(key)
    }

    pub fn get_mut(&mut self, key: &[u8]) -> Option<&mut Metadata> {
        self.entries.get_mut(key)
    }

    /// Latest block for `key` if it is live
    pub fn live(&self, key: &[u8]) -> Option<&Metadata> {
        self.entries.get(key).filter(|meta| !meta.is_deleted())
    }

    /// All entries, including tombstones, in unspecified order
    pub fn iter(&self) -> impl Iterator<Item = (&[u8], &Metadata)> {
        self.entries.iter().map(|(key, meta)| (key.as_slice(), meta))
    }

    /// Live entries in unspecified order
    pub fn live_entries(&self) -> impl Iterator<Item = (&[u8], &Metadata)> {
        self.iter().filter(|(_, meta)| !meta.is_deleted())
    }

    /// Number of keys ever written (tombstones included)
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Number of retrievable keys
    pub fn live_count(&self) -> usize {
        self.entries.values().filter(|meta| !meta.is_deleted()).count()
    }
}
