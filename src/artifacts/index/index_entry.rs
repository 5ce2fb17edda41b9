//! Index entry representation
//!
//! Each entry tracks one file: its path, content digest, and the stat
//! metadata (mode, size, mtime) used to detect working-tree drift.

use crate::artifacts::index::entry_mode::EntryMode;
use crate::artifacts::objects::object_id::ObjectId;
use derive_new::new;
use std::path::{Path, PathBuf};

/// One tracked file in the staging area.
#[derive(Debug, Clone, Default, new)]
pub struct IndexEntry {
    /// File path relative to the repository root
    pub name: PathBuf,
    /// Digest of the file's blob object
    pub oid: ObjectId,
    /// Stat metadata captured when the file was staged
    pub metadata: EntryMetadata,
}

impl IndexEntry {
    pub fn basename(&self) -> anyhow::Result<&str> {
        self.name
            .file_name()
            .and_then(|name| name.to_str())
            .ok_or_else(|| anyhow::anyhow!("invalid file name: {:?}", self.name))
    }

    /// Ancestor directories from outermost to innermost, excluding the
    /// repository root itself. Empty for top-level entries and the empty
    /// path.
    pub fn parent_dirs(&self) -> Vec<&Path> {
        let mut dirs = Vec::new();
        let mut parent = self.name.parent();

        while let Some(new_parent) = parent {
            dirs.push(new_parent);
            parent = new_parent.parent();
        }
        dirs.reverse();

        if dirs.is_empty() {
            return dirs;
        }
        dirs[1..].to_vec()
    }
}

impl PartialEq for IndexEntry {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
    }
}

impl Eq for IndexEntry {}

impl PartialOrd for IndexEntry {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for IndexEntry {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.name.cmp(&other.name)
    }
}

/// Stat metadata stored per index entry.
#[derive(Debug, Clone, Default, new)]
pub struct EntryMetadata {
    pub mode: EntryMode,
    pub size: u64,
    /// Modification time, unix seconds
    pub mtime: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(path: &str) -> IndexEntry {
        IndexEntry::new(PathBuf::from(path), ObjectId::zero(), Default::default())
    }

    #[test]
    fn parent_dirs_excludes_root_and_orders_outermost_first() {
        let nested = entry("a/b/c.txt");
        assert_eq!(
            nested.parent_dirs(),
            vec![Path::new("a"), Path::new("a/b")]
        );
    }

    #[test]
    fn top_level_entry_has_no_parent_dirs() {
        let top_level = entry("c.txt");
        assert!(top_level.parent_dirs().is_empty());
    }

    #[test]
    fn empty_path_has_no_parent_dirs() {
        let unnamed = entry("");
        assert!(unnamed.parent_dirs().is_empty());
    }
}
