//! References (branches and HEAD)
//!
//! A reference is a named pointer to a commit. Ref files under `.grit` hold
//! either a 40-character digest (direct) or `ref: <path>` (symbolic); HEAD
//! is normally symbolic and names the checked-out branch under `refs/heads/`.

use crate::artifacts::branch::branch_name::{BranchName, SymRefName};
use crate::artifacts::objects::object_id::ObjectId;
use anyhow::Context;
use derive_new::new;
use file_guard::Lock;
use std::io::Write;
use std::ops::DerefMut;
use std::path::Path;
use walkdir::WalkDir;

#[derive(Debug, new)]
pub struct Refs {
    /// Repository metadata directory (`.grit`)
    path: Box<Path>,
}

const SYMREF_REGEX: &str = r"^ref: (.+)$";

pub const HEAD_REF_NAME: &str = "HEAD";

#[derive(Debug, Clone)]
enum SymRefOrOid {
    SymRef { sym_ref_name: SymRefName },
    Oid(ObjectId),
}

impl SymRefOrOid {
    fn read_symref_or_oid(path: &Path) -> anyhow::Result<Option<SymRefOrOid>> {
        if !path.exists() {
            return Ok(None);
        }

        let content = std::fs::read_to_string(path)?;
        let content = content.trim();

        if content.is_empty() {
            return Ok(None);
        }

        let symref_match = regex::Regex::new(SYMREF_REGEX)?.captures(content);
        if let Some(symref_match) = symref_match {
            Ok(Some(SymRefOrOid::SymRef {
                sym_ref_name: SymRefName::new(symref_match[1].to_string()),
            }))
        } else {
            Ok(Some(SymRefOrOid::Oid(ObjectId::try_parse(
                content.to_string(),
            )?)))
        }
    }
}

impl Refs {
    pub fn is_current_branch(&self, branch_name: &BranchName) -> anyhow::Result<bool> {
        let current_ref = self.current_ref(None)?;

        Ok(branch_name == &BranchName::try_parse_sym_ref_name(&current_ref)?)
    }

    pub fn read_oid(&self, sym_ref_name: &SymRefName) -> anyhow::Result<Option<ObjectId>> {
        self.read_ref(BranchName::try_parse_sym_ref_name(sym_ref_name)?)
    }

    /// Resolve the final symbolic reference in the chain starting at
    /// `source` (HEAD when none is given).
    pub fn current_ref(&self, source: Option<SymRefName>) -> anyhow::Result<SymRefName> {
        let source = source.unwrap_or_else(|| SymRefName::new(HEAD_REF_NAME.to_string()));

        let ref_content =
            SymRefOrOid::read_symref_or_oid(self.path.join(source.as_ref_path()).as_path())?;

        match ref_content {
            Some(SymRefOrOid::SymRef { sym_ref_name }) => Ok(self.current_ref(Some(sym_ref_name))?),
            Some(_) | None => Ok(source),
        }
    }

    /// Follow symbolic indirection until a digest is found.
    fn read_symref(&self, path: &Path) -> anyhow::Result<Option<ObjectId>> {
        let ref_content = SymRefOrOid::read_symref_or_oid(path)?;

        match ref_content {
            Some(SymRefOrOid::SymRef { sym_ref_name }) => {
                self.read_symref(self.path.join(sym_ref_name.as_ref_path()).as_path())
            }
            Some(SymRefOrOid::Oid(oid)) => Ok(Some(oid)),
            None => Ok(None),
        }
    }

    /// Advance the ref at `path` (or the end of its symbolic chain) to a new
    /// digest, under an exclusive file lock.
    fn update_symref(&self, path: &Path, oid: ObjectId) -> anyhow::Result<()> {
        let mut ref_file = std::fs::OpenOptions::new()
            .read(true)
            .write(true)
            .open(path)
            .with_context(|| format!("failed to open ref file at {:?}", path))?;
        let mut lock = file_guard::lock(&mut ref_file, Lock::Exclusive, 0, 1)?;

        let ref_content = SymRefOrOid::read_symref_or_oid(path)?;

        match ref_content {
            Some(SymRefOrOid::SymRef { sym_ref_name }) => {
                let target_path = self.path.join(sym_ref_name.as_ref_path());
                self.update_symref(target_path.as_path(), oid)
            }
            Some(SymRefOrOid::Oid(_)) | None => {
                lock.deref_mut().write_all(oid.as_ref().as_bytes())?;
                Ok(())
            }
        }
    }

    pub fn set_head(&self, revision: &str, raw_ref: String) -> anyhow::Result<()> {
        let revision_path = self.heads_path().join(revision).into_boxed_path();

        if revision_path.exists() {
            self.update_ref_file(self.head_path(), format!("ref: refs/heads/{}", revision))
        } else {
            self.update_ref_file(self.head_path(), raw_ref)
        }
    }

    pub fn update_head(&self, oid: ObjectId) -> anyhow::Result<()> {
        self.update_symref(self.head_path().as_ref(), oid)
    }

    pub fn read_head(&self) -> anyhow::Result<Option<ObjectId>> {
        self.read_symref(&self.head_path())
    }

    pub fn update_ref_file(&self, path: Box<Path>, raw_ref: String) -> anyhow::Result<()> {
        std::fs::create_dir_all(path.parent().with_context(|| {
            format!(
                "failed to create parent directories for ref file at {:?}",
                path
            )
        })?)?;

        let mut ref_file = std::fs::OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .open(path.clone())
            .with_context(|| format!("failed to open ref file at {:?}", path))?;
        let mut lock = file_guard::lock(&mut ref_file, Lock::Exclusive, 0, 1)?;
        lock.deref_mut().write_all(raw_ref.as_bytes())?;

        Ok(())
    }

    pub fn read_ref(&self, branch_name: BranchName) -> anyhow::Result<Option<ObjectId>> {
        let ref_path = self.find_path_to_branch(branch_name)?;
        self.read_symref(&ref_path)
    }

    fn find_path_to_branch(&self, branch_name: BranchName) -> anyhow::Result<Box<Path>> {
        // a branch ref may live directly in .grit, .grit/refs or .grit/refs/heads
        [self.path.clone(), self.refs_path(), self.heads_path()]
            .iter()
            .map(|base_path| base_path.join(branch_name.as_ref()).into_boxed_path())
            .find(|path| path.exists())
            .ok_or_else(|| anyhow::anyhow!("branch {} not found", branch_name))
    }

    pub fn create_branch(&self, name: BranchName, source_oid: ObjectId) -> anyhow::Result<()> {
        let branch_path = self.heads_path().join(name.as_ref()).into_boxed_path();

        if branch_path.exists() && !name.is_default_branch() {
            anyhow::bail!("branch {} already exists", name);
        }

        self.update_ref_file(branch_path, source_oid.as_ref().into())
    }

    pub fn delete_branch(&self, name: &BranchName) -> anyhow::Result<ObjectId> {
        let branch_path = self.heads_path().join(name.as_ref()).into_boxed_path();

        let oid = self.read_symref(branch_path.as_ref())?;
        match oid {
            Some(oid) => {
                std::fs::remove_file(branch_path.as_ref()).with_context(|| {
                    format!("failed to delete branch file at {:?}", branch_path)
                })?;
                self.prune_branch_empty_parent_dirs(branch_path.as_ref())?;

                Ok(oid)
            }
            None => anyhow::bail!("branch {} does not exist", name),
        }
    }

    pub fn list_branches(&self) -> anyhow::Result<Vec<SymRefName>> {
        Ok(WalkDir::new(self.heads_path())
            .into_iter()
            .filter_map(|entry| entry.ok())
            .filter_map(|entry| {
                if entry.path().is_file() {
                    let relative_path = entry.path().strip_prefix(self.path.as_ref()).ok()?;
                    Some(SymRefName::new(relative_path.to_string_lossy().to_string()))
                } else {
                    None
                }
            })
            .collect::<Vec<_>>())
    }

    fn prune_branch_empty_parent_dirs(&self, path: &Path) -> anyhow::Result<()> {
        if let Some(parent) = path.parent()
            && parent != self.heads_path().as_ref()
            && parent.read_dir()?.next().is_none()
        {
            std::fs::remove_dir(parent).with_context(|| {
                format!("failed to remove empty branch directory at {:?}", parent)
            })?;
            self.prune_branch_empty_parent_dirs(parent)?;
        }

        Ok(())
    }

    pub fn head_path(&self) -> Box<Path> {
        self.path.join(HEAD_REF_NAME).into_boxed_path()
    }

    pub fn refs_path(&self) -> Box<Path> {
        self.path.join("refs").into_boxed_path()
    }

    pub fn heads_path(&self) -> Box<Path> {
        self.refs_path().join("heads").into_boxed_path()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_fs::TempDir;
    use pretty_assertions::assert_eq;

    fn refs() -> (TempDir, Refs) {
        let temp = TempDir::new().unwrap();
        let refs = Refs::new(temp.path().to_path_buf().into_boxed_path());
        std::fs::create_dir_all(refs.heads_path()).unwrap();
        (temp, refs)
    }

    fn oid(fill: char) -> ObjectId {
        ObjectId::try_parse(fill.to_string().repeat(40)).unwrap()
    }

    #[test]
    fn head_resolves_through_symbolic_indirection() {
        let (_temp, refs) = refs();

        refs.update_ref_file(refs.head_path(), "ref: refs/heads/main".to_string())
            .unwrap();
        refs.create_branch(BranchName::try_parse("main".to_string()).unwrap(), oid('a'))
            .unwrap();

        assert_eq!(refs.read_head().unwrap(), Some(oid('a')));
        assert_eq!(
            refs.current_ref(None).unwrap().as_ref_path(),
            "refs/heads/main"
        );
    }

    #[test]
    fn update_head_writes_through_to_the_branch_file() {
        let (_temp, refs) = refs();

        refs.update_ref_file(refs.head_path(), "ref: refs/heads/main".to_string())
            .unwrap();
        refs.create_branch(BranchName::try_parse("main".to_string()).unwrap(), oid('a'))
            .unwrap();

        refs.update_head(oid('b')).unwrap();

        let branch = BranchName::try_parse("main".to_string()).unwrap();
        assert_eq!(refs.read_ref(branch).unwrap(), Some(oid('b')));
    }

    #[test]
    fn missing_head_reads_as_none() {
        let (_temp, refs) = refs();
        assert_eq!(refs.read_head().unwrap(), None);
    }

    #[test]
    fn duplicate_branch_creation_is_rejected() {
        let (_temp, refs) = refs();
        let name = BranchName::try_parse("topic".to_string()).unwrap();

        refs.create_branch(name.clone(), oid('a')).unwrap();
        assert!(refs.create_branch(name, oid('b')).is_err());
    }

    #[test]
    fn deleted_branch_returns_its_tip() {
        let (_temp, refs) = refs();
        let name = BranchName::try_parse("feature/gone".to_string()).unwrap();

        refs.create_branch(name.clone(), oid('c')).unwrap();
        assert_eq!(refs.delete_branch(&name).unwrap(), oid('c'));
        assert!(refs.delete_branch(&name).is_err());

        // the now-empty feature/ directory is pruned as well
        assert!(!refs.heads_path().join("feature").exists());
    }

    #[test]
    fn branches_are_listed_relative_to_the_metadata_root() {
        let (_temp, refs) = refs();

        for name in ["main", "feature/one"] {
            refs.create_branch(BranchName::try_parse(name.to_string()).unwrap(), oid('a'))
                .unwrap();
        }

        let mut listed: Vec<String> = refs
            .list_branches()
            .unwrap()
            .into_iter()
            .map(|sym_ref| sym_ref.as_ref_path().to_string())
            .collect();
        listed.sort();

        assert_eq!(listed, vec!["refs/heads/feature/one", "refs/heads/main"]);
    }
}
