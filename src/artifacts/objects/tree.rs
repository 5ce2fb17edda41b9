//! Tree object
//!
//! Trees are directory snapshots: named entries referencing blobs (files)
//! and other trees (subdirectories).
//!
//! ## Format
//!
//! On disk: `tree <size>\0<entries>`
//! Each entry: `<octal-mode> <name>\0<20-byte-sha1>`, entries in strictly
//! ascending name order so that identical directories hash identically
//! regardless of insertion order.
//!
//! ## Building
//!
//! `Tree::build` turns a flat path map into a node tree with owned child
//! references; `traverse` visits children before parents so every subtree
//! is stored (and therefore addressable) before the entry referencing it
//! is serialized. File/directory name collisions are rejected while the
//! node tree is assembled, before any object is written.

use crate::artifacts::index::entry_mode::EntryMode;
use crate::artifacts::index::index_entry::IndexEntry;
use crate::artifacts::objects::object::Unpackable;
use crate::artifacts::objects::object::{Object, Packable};
use crate::artifacts::objects::object_id::ObjectId;
use crate::artifacts::objects::object_type::ObjectType;
use crate::errors::TreeBuildError;
use anyhow::Context;
use bytes::Bytes;
use derive_new::new;
use std::collections::BTreeMap;
use std::io::{BufRead, Write};

/// One line of a parsed tree: mode plus referenced digest.
#[derive(Debug, Clone, PartialEq, new)]
pub struct TreeEntry {
    pub oid: ObjectId,
    pub mode: EntryMode,
}

impl TreeEntry {
    pub fn is_tree(&self) -> bool {
        self.mode.is_tree()
    }
}

/// Node of a tree being assembled from index entries.
///
/// Directory keys carry a trailing `/` in the parent map so files and
/// directories with related names stay distinct and name-sorted.
#[derive(Debug, Clone)]
enum TreeNode {
    File(IndexEntry),
    Directory(Tree),
}

impl TreeNode {
    fn mode(&self) -> EntryMode {
        match self {
            TreeNode::File(entry) => entry.metadata.mode,
            TreeNode::Directory(_) => EntryMode::Directory,
        }
    }

    fn oid(&self) -> anyhow::Result<ObjectId> {
        match self {
            TreeNode::File(entry) => Ok(entry.oid.clone()),
            TreeNode::Directory(tree) => tree.object_id(),
        }
    }
}

/// A directory snapshot.
///
/// Two entry maps exist: `readable_entries` for trees loaded from the
/// database, `writeable_entries` for trees being assembled from the index.
/// A parsed tree re-serializes as empty; parsed trees are read, not stored.
#[derive(Debug, Clone, Default)]
pub struct Tree {
    /// Entries loaded from the database (read mode)
    readable_entries: BTreeMap<String, TreeEntry>,
    /// Entries being assembled (write mode)
    writeable_entries: BTreeMap<String, TreeNode>,
}

impl Tree {
    /// Build a tree graph from flat index entries.
    ///
    /// An empty iterator yields a valid empty root tree.
    pub fn build<'e>(
        entries: impl Iterator<Item = &'e IndexEntry>,
    ) -> Result<Self, TreeBuildError> {
        let mut root = Self::default();

        for entry in entries {
            let parents = entry.parent_dirs();
            root.add_entry(parents, entry)?;
        }

        Ok(root)
    }

    /// Visit every directory node depth-first, children before parents.
    ///
    /// Storing trees in this order guarantees child digests exist before
    /// the parent entry referencing them is serialized.
    pub fn traverse<F>(&self, func: &F) -> anyhow::Result<()>
    where
        F: Fn(&Tree) -> anyhow::Result<()>,
    {
        for node in self.writeable_entries.values() {
            if let TreeNode::Directory(tree) = node {
                tree.traverse(func)?;
            }
        }
        func(self)?;

        Ok(())
    }

    fn add_entry(
        &mut self,
        parents: Vec<&std::path::Path>,
        entry: &IndexEntry,
    ) -> Result<(), TreeBuildError> {
        if parents.is_empty() {
            let name = entry
                .basename()
                .map_err(|_| TreeBuildError::InvalidPath(entry.name.display().to_string()))?
                .to_string();

            if self.writeable_entries.contains_key(&format!("{name}/")) {
                return Err(TreeBuildError::PathCollision(name));
            }
            self.writeable_entries
                .insert(name, TreeNode::File(entry.clone()));
        } else {
            let dir = parents[0]
                .file_name()
                .and_then(|s| s.to_str())
                .ok_or_else(|| TreeBuildError::InvalidPath(entry.name.display().to_string()))?;

            // a bare key at this level is a file staged under the same name
            if self.writeable_entries.contains_key(dir) {
                return Err(TreeBuildError::PathCollision(dir.to_string()));
            }

            let node = self
                .writeable_entries
                .entry(format!("{dir}/"))
                .or_insert_with(|| TreeNode::Directory(Tree::default()));
            match node {
                TreeNode::Directory(tree) => tree.add_entry(parents[1..].to_vec(), entry)?,
                TreeNode::File(_) => unreachable!("directory keys always end in '/'"),
            }
        }

        Ok(())
    }

    pub fn entries(&self) -> impl Iterator<Item = (&String, &TreeEntry)> {
        self.readable_entries.iter()
    }

    pub fn into_entries(self) -> impl Iterator<Item = (String, TreeEntry)> {
        self.readable_entries.into_iter()
    }
}

impl Packable for Tree {
    fn serialize(&self) -> anyhow::Result<Bytes> {
        let mut content_bytes = Vec::new();
        for (name, node) in &self.writeable_entries {
            let name = name.trim_end_matches('/');

            let header = format!("{} {}", node.mode(), name);
            content_bytes.write_all(header.as_bytes())?;
            content_bytes.push(0);
            node.oid()?.write_h40_to(&mut content_bytes)?;
        }

        let mut tree_bytes = Vec::new();
        let header = format!("{} {}\0", self.object_type().as_str(), content_bytes.len());
        tree_bytes.write_all(header.as_bytes())?;
        tree_bytes.write_all(&content_bytes)?;

        Ok(Bytes::from(tree_bytes))
    }
}

impl Unpackable for Tree {
    fn deserialize(reader: impl BufRead) -> anyhow::Result<Self> {
        let mut entries = BTreeMap::new();
        let mut reader = reader;

        let mut mode_bytes = Vec::new();
        let mut name_bytes = Vec::new();

        loop {
            mode_bytes.clear();
            let n = reader.read_until(b' ', &mut mode_bytes)?;
            if n == 0 {
                break; // clean EOF: no more entries
            }
            if mode_bytes.last() != Some(&b' ') {
                anyhow::bail!("unexpected EOF in tree entry mode");
            }
            mode_bytes.pop();

            let mode_str = std::str::from_utf8(&mode_bytes)?;
            let mode = EntryMode::from_octal_str(mode_str)?;

            name_bytes.clear();
            let n = reader.read_until(b'\0', &mut name_bytes)?;
            if n == 0 || name_bytes.last() != Some(&b'\0') {
                anyhow::bail!("unexpected EOF in tree entry name");
            }
            name_bytes.pop();
            let name = std::str::from_utf8(&name_bytes)?.to_owned();

            let oid = ObjectId::read_h40_from(&mut reader)
                .context("unexpected EOF in tree entry object id")?;

            entries.insert(name, TreeEntry::new(oid, mode));
        }

        Ok(Tree {
            readable_entries: entries,
            writeable_entries: Default::default(),
        })
    }
}

impl Object for Tree {
    fn object_type(&self) -> ObjectType {
        ObjectType::Tree
    }

    fn display(&self) -> String {
        self.readable_entries
            .iter()
            .map(|(name, entry)| {
                let object_type = if entry.is_tree() {
                    ObjectType::Tree
                } else {
                    ObjectType::Blob
                };
                format!("{} {} {}\t{}", entry.mode, object_type, entry.oid, name)
            })
            .collect::<Vec<String>>()
            .join("\n")
    }
}
