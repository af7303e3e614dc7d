//! Record Codec Module
//!
//! Fixed-width binary encoding of the file header and of the metadata block
//! that precedes every key/value pair in the log.
//!
//! All integers are little-endian and written field by field, so the layout
//! does not depend on how the structs are laid out in memory.
//!
//! ## File Format
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │ Header (1 byte)                                                     │
//! │   Version: u8                                                       │
//! ├─────────────────────────────────────────────────────────────────────┤
//! │ Record                                                              │
//! │ ┌───────────────────────────────────────────────┬───────┬─────────┐ │
//! │ │ Metadata (32)                                 │  Key  │  Value  │ │
//! │ │ Offset: i64 | KeySize: u32 | ValueSize: u32 | │       │         │ │
//! │ │ Created: i64 | Deleted: i64                   │       │         │ │
//! │ └───────────────────────────────────────────────┴───────┴─────────┘ │
//! │ ... repeated for each put ...                                       │
//! └─────────────────────────────────────────────────────────────────────┘
//! ```

mod header;
mod metadata;

pub use header::{Header, FORMAT_VERSION, HEADER_SIZE};
pub use metadata::{encode_record, Metadata, METADATA_SIZE};
