//! Staging area
//!
//! The index is an ordered map from path to (digest, mode, size, mtime),
//! persisted as one NUL-separated record per line:
//!
//! ```text
//! <path>\0<digest>\0<mode>\0<size>\0<mtime>\n
//! ```
//!
//! Paths sort ascending, so trees built from the index come out canonical
//! without extra work. Saves go through a temp file and a rename.

use crate::artifacts::index::entry_mode::EntryMode;
use crate::artifacts::index::index_entry::{EntryMetadata, IndexEntry};
use crate::artifacts::objects::object_id::ObjectId;
use anyhow::Context;
use fake::rand;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

#[derive(Debug)]
pub struct Index {
    path: Box<Path>,
    entries: BTreeMap<PathBuf, IndexEntry>,
}

impl Index {
    /// Load the index file, or start empty when none exists yet.
    pub fn load(path: Box<Path>) -> anyhow::Result<Self> {
        let mut entries = BTreeMap::new();

        if path.exists() {
            let content = std::fs::read_to_string(&path)
                .with_context(|| format!("failed to read index file at {:?}", path))?;

            for line in content.lines() {
                let entry = Self::parse_record(line)
                    .with_context(|| format!("malformed index record: {line:?}"))?;
                entries.insert(entry.name.clone(), entry);
            }
        }

        Ok(Index { path, entries })
    }

    /// Re-read the index file, discarding in-memory state.
    pub fn rehydrate(&mut self) -> anyhow::Result<()> {
        *self = Self::load(self.path.clone())?;
        Ok(())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn parse_record(line: &str) -> anyhow::Result<IndexEntry> {
        let fields: Vec<&str> = line.split('\0').collect();
        let [name, oid, mode, size, mtime] = fields.as_slice() else {
            anyhow::bail!("expected 5 fields, got {}", fields.len());
        };

        Ok(IndexEntry::new(
            PathBuf::from(name),
            ObjectId::try_parse(oid.to_string())?,
            EntryMetadata::new(
                EntryMode::from_octal_str(mode)?,
                size.parse().context("non-numeric size field")?,
                mtime.parse().context("non-numeric mtime field")?,
            ),
        ))
    }

    /// Stage an entry, replacing any previous entry at the same path.
    pub fn add(&mut self, entry: IndexEntry) {
        self.entries.insert(entry.name.clone(), entry);
    }

    pub fn remove(&mut self, path: &Path) -> Option<IndexEntry> {
        self.entries.remove(path)
    }

    pub fn get(&self, path: &Path) -> Option<&IndexEntry> {
        self.entries.get(path)
    }

    /// Entries in ascending path order.
    pub fn entries(&self) -> impl Iterator<Item = &IndexEntry> {
        self.entries.values()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn save(&self) -> anyhow::Result<()> {
        let mut content = String::new();
        for entry in self.entries.values() {
            let name = entry
                .name
                .to_str()
                .with_context(|| format!("non-UTF-8 path in index: {:?}", entry.name))?;
            content.push_str(&format!(
                "{name}\0{}\0{}\0{}\0{}\n",
                entry.oid, entry.metadata.mode, entry.metadata.size, entry.metadata.mtime
            ));
        }

        let index_dir = self
            .path
            .parent()
            .with_context(|| format!("invalid index path {:?}", self.path))?;
        let temp_path = index_dir.join(format!("tmp-index-{}", rand::random::<u32>()));

        std::fs::write(&temp_path, content)
            .with_context(|| format!("failed to write index file at {:?}", temp_path))?;
        std::fs::rename(&temp_path, &self.path)
            .with_context(|| format!("failed to replace index file at {:?}", self.path))?;

        Ok(())
    }
}
