//! Staging-area entry types
//!
//! The index file itself (load/save) lives in `areas::index`; this module
//! holds the entry model shared with the tree builder.

pub mod entry_mode;
pub mod index_entry;
