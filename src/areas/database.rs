use crate::artifacts::objects::blob::Blob;
use crate::artifacts::objects::commit::Commit;
use crate::artifacts::objects::object::{Object, ObjectBox, Unpackable};
use crate::artifacts::objects::object_id::ObjectId;
use crate::artifacts::objects::object_type::ObjectType;
use crate::artifacts::objects::tree::Tree;
use crate::errors::StoreError;
use anyhow::Context;
use bytes::Bytes;
use fake::rand;
use std::collections::BTreeSet;
use std::io::{BufRead, Cursor, Read, Write};
use std::path::{Path, PathBuf};

/// Content-addressable object store rooted at `.grit/objects`.
///
/// Objects are zlib-compressed files fanned out by the first two digest
/// characters. Writes go through a temp file and a rename, so a reader never
/// observes a half-written object.
#[derive(Debug)]
pub struct Database {
    path: Box<Path>,
}

impl Database {
    pub fn new(path: Box<Path>) -> Self {
        Database { path }
    }

    pub fn objects_path(&self) -> &Path {
        &self.path
    }

    /// Store an object and return its digest.
    ///
    /// Idempotent: storing identical content any number of times leaves one
    /// object file and always yields the same digest.
    pub fn store(&self, object: &impl Object) -> anyhow::Result<ObjectId> {
        let object_id = object.object_id()?;
        let object_path = self.path.join(object_id.to_path());
        let object_content = object.serialize()?;

        // write the object to disk unless it already exists
        if !object_path.exists() {
            std::fs::create_dir_all(
                object_path
                    .parent()
                    .context(format!("Invalid object path {}", object_path.display()))?,
            )
            .context(format!(
                "Unable to create object directory {}",
                object_path.display()
            ))?;

            self.write_object(object_path, object_content)?;
        }

        Ok(object_id)
    }

    pub fn contains(&self, object_id: &ObjectId) -> bool {
        self.path.join(object_id.to_path()).exists()
    }

    /// Load an object's kind and body, with the store header stripped.
    ///
    /// Distinguishes an absent object (`NotFound`) from one whose file is
    /// present but unreadable or inconsistent (`Corrupt`).
    pub fn load_raw(&self, object_id: &ObjectId) -> Result<(ObjectType, Bytes), StoreError> {
        let object_path = self.path.join(object_id.to_path());
        if !object_path.exists() {
            return Err(StoreError::NotFound(object_id.clone()));
        }

        let compressed = std::fs::read(&object_path)?;
        let decompressed =
            Self::decompress(compressed.into()).map_err(|err| StoreError::Corrupt {
                oid: object_id.clone(),
                reason: format!("zlib stream is undecodable: {err}"),
            })?;

        let header_end = decompressed
            .iter()
            .position(|&b| b == b'\0')
            .ok_or_else(|| StoreError::Corrupt {
                oid: object_id.clone(),
                reason: "missing header terminator".to_string(),
            })?;
        let header =
            std::str::from_utf8(&decompressed[..header_end]).map_err(|_| StoreError::Corrupt {
                oid: object_id.clone(),
                reason: "header is not valid UTF-8".to_string(),
            })?;

        let (kind, declared_size) =
            header.split_once(' ').ok_or_else(|| StoreError::Corrupt {
                oid: object_id.clone(),
                reason: format!("malformed header {header:?}"),
            })?;
        let object_type = ObjectType::try_from(kind).map_err(|_| StoreError::Corrupt {
            oid: object_id.clone(),
            reason: format!("unknown object kind {kind:?}"),
        })?;
        let declared_size: usize =
            declared_size.parse().map_err(|_| StoreError::Corrupt {
                oid: object_id.clone(),
                reason: format!("non-numeric size in header {header:?}"),
            })?;

        let body = decompressed.slice(header_end + 1..);
        if body.len() != declared_size {
            return Err(StoreError::Corrupt {
                oid: object_id.clone(),
                reason: format!(
                    "declared size {declared_size} but body is {} bytes",
                    body.len()
                ),
            });
        }

        Ok((object_type, body))
    }

    pub fn parse_object(&self, object_id: &ObjectId) -> anyhow::Result<ObjectBox> {
        let (object_type, object_reader) = self.parse_object_as_bytes(object_id)?;

        match object_type {
            ObjectType::Blob => Ok(ObjectBox::Blob(Box::new(Blob::deserialize(object_reader)?))),
            ObjectType::Tree => Ok(ObjectBox::Tree(Box::new(Tree::deserialize(object_reader)?))),
            ObjectType::Commit => Ok(ObjectBox::Commit(Box::new(Commit::deserialize(
                object_reader,
            )?))),
        }
    }

    pub fn parse_object_as_blob(&self, object_id: &ObjectId) -> anyhow::Result<Option<Blob>> {
        let (object_type, object_reader) = self.parse_object_as_bytes(object_id)?;

        match object_type {
            ObjectType::Blob => Ok(Some(Blob::deserialize(object_reader)?)),
            _ => Ok(None),
        }
    }

    pub fn parse_object_as_tree(&self, object_id: &ObjectId) -> anyhow::Result<Option<Tree>> {
        let (object_type, object_reader) = self.parse_object_as_bytes(object_id)?;

        match object_type {
            ObjectType::Tree => Ok(Some(Tree::deserialize(object_reader)?)),
            _ => Ok(None),
        }
    }

    pub fn parse_object_as_commit(&self, object_id: &ObjectId) -> anyhow::Result<Option<Commit>> {
        let (object_type, object_reader) = self.parse_object_as_bytes(object_id)?;

        match object_type {
            ObjectType::Commit => Ok(Some(Commit::deserialize(object_reader)?)),
            _ => Ok(None),
        }
    }

    fn parse_object_as_bytes(
        &self,
        object_id: &ObjectId,
    ) -> anyhow::Result<(ObjectType, impl BufRead)> {
        let (object_type, body) = self
            .load_raw(object_id)
            .with_context(|| format!("Unable to load object {object_id}"))?;

        Ok((object_type, Cursor::new(body)))
    }

    /// Every object reachable from `start` by following commit parents,
    /// commit trees, and tree entries. Blobs are leaves.
    ///
    /// Iterative with a visited set, so shared subtrees are loaded once and
    /// deep histories do not recurse. With `tolerate_missing`, digests that
    /// name no local object are skipped instead of failing the walk; this is
    /// how remote heads we have never fetched are handled during push
    /// negotiation.
    pub fn reachable_objects(
        &self,
        start: &ObjectId,
        tolerate_missing: bool,
    ) -> anyhow::Result<BTreeSet<ObjectId>> {
        let mut visited = BTreeSet::new();
        let mut pending = vec![start.clone()];

        while let Some(object_id) = pending.pop() {
            if visited.contains(&object_id) {
                continue;
            }

            match self.load_raw(&object_id) {
                Err(StoreError::NotFound(_)) if tolerate_missing => continue,
                Err(err) => {
                    return Err(err)
                        .with_context(|| format!("Unable to traverse object {object_id}"));
                }
                Ok((object_type, body)) => {
                    visited.insert(object_id);

                    match object_type {
                        ObjectType::Commit => {
                            let commit = Commit::deserialize(Cursor::new(body))?;
                            pending.push(commit.tree_oid().clone());
                            pending.extend(commit.parents().iter().cloned());
                        }
                        ObjectType::Tree => {
                            let tree = Tree::deserialize(Cursor::new(body))?;
                            pending.extend(tree.entries().map(|(_, entry)| entry.oid.clone()));
                        }
                        ObjectType::Blob => {}
                    }
                }
            }
        }

        Ok(visited)
    }

    /// Objects reachable from `local` but not from any of the `remote` heads,
    /// in ascending digest order.
    ///
    /// Zero digests among the remote heads mean "ref absent on the remote"
    /// and subtract nothing. Remote heads we do not have locally are walked
    /// tolerantly: whatever part of their history we do hold still counts as
    /// known to the remote.
    pub fn objects_to_send(
        &self,
        local: &ObjectId,
        remotes: &[ObjectId],
    ) -> anyhow::Result<Vec<ObjectId>> {
        let mut wanted = self.reachable_objects(local, false)?;

        for remote in remotes {
            if remote.is_zero() {
                continue;
            }
            for known in self.reachable_objects(remote, true)? {
                wanted.remove(&known);
            }
        }

        Ok(wanted.into_iter().collect())
    }

    fn write_object(&self, object_path: PathBuf, object_content: Bytes) -> anyhow::Result<()> {
        let object_dir = object_path
            .parent()
            .context(format!("Invalid object path {}", object_path.display()))?;
        let temp_object_path = object_dir.join(Self::generate_temp_name());

        let object_content = Self::compress(object_content)?;

        let mut file = std::fs::OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(true)
            .open(&temp_object_path)
            .context(format!(
                "Unable to open object file {}",
                temp_object_path.display()
            ))?;

        file.write_all(&object_content).context(format!(
            "Unable to write object file {}",
            temp_object_path.display()
        ))?;

        // rename the temp file to the object file to make it atomic
        std::fs::rename(&temp_object_path, &object_path).context(format!(
            "Unable to rename object file to {}",
            object_path.display()
        ))?;

        Ok(())
    }

    fn compress(data: Bytes) -> anyhow::Result<Bytes> {
        let mut encoder =
            flate2::write::ZlibEncoder::new(Vec::new(), flate2::Compression::default());
        encoder
            .write_all(&data)
            .context("Unable to compress object content")?;

        encoder
            .finish()
            .map(|compressed_content| compressed_content.into())
            .context("Unable to finish compressing object content")
    }

    fn decompress(data: Bytes) -> anyhow::Result<Bytes> {
        let mut decoder = flate2::read::ZlibDecoder::new(&*data);
        let mut decompressed_content = Vec::new();
        decoder
            .read_to_end(&mut decompressed_content)
            .context("Unable to decompress object content")?;

        Ok(decompressed_content.into())
    }

    fn generate_temp_name() -> String {
        format!("tmp-obj-{}", rand::random::<u32>())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::artifacts::index::entry_mode::EntryMode;
    use crate::artifacts::index::index_entry::{EntryMetadata, IndexEntry};
    use crate::artifacts::objects::commit::Author;
    use assert_fs::TempDir;
    use pretty_assertions::assert_eq;

    fn database() -> (TempDir, Database) {
        let temp = TempDir::new().unwrap();
        let db = Database::new(temp.path().join("objects").into());
        std::fs::create_dir_all(db.objects_path()).unwrap();
        (temp, db)
    }

    fn author() -> Author {
        Author::new_with_timestamp(
            "Test".to_string(),
            "test@example.com".to_string(),
            chrono::DateTime::parse_from_rfc3339("2024-01-01T00:00:00+00:00").unwrap(),
        )
    }

    fn store_blob(db: &Database, content: &str) -> ObjectId {
        db.store(&Blob::new(content.to_string())).unwrap()
    }

    fn store_snapshot(db: &Database, files: &[(&str, &str)], parents: Vec<ObjectId>) -> ObjectId {
        let entries: Vec<IndexEntry> = files
            .iter()
            .map(|(path, content)| {
                let blob_oid = store_blob(db, content);
                IndexEntry::new(
                    PathBuf::from(path),
                    blob_oid,
                    EntryMetadata::new(EntryMode::Regular, content.len() as u64, 0),
                )
            })
            .collect();

        let tree = Tree::build(entries.iter()).unwrap();
        tree.traverse(&|subtree| {
            db.store(subtree)?;
            Ok(())
        })
        .unwrap();
        let tree_oid = tree.object_id().unwrap();

        db.store(&Commit::new(parents, tree_oid, author(), "snap".to_string()))
            .unwrap()
    }

    #[test]
    fn store_and_load_round_trip() {
        let (_temp, db) = database();

        let oid = store_blob(&db, "hello database");
        let (object_type, body) = db.load_raw(&oid).unwrap();

        assert_eq!(object_type, ObjectType::Blob);
        assert_eq!(&body[..], b"hello database");
    }

    #[test]
    fn storing_twice_is_idempotent() {
        let (_temp, db) = database();

        let first = store_blob(&db, "same bytes");
        let second = store_blob(&db, "same bytes");

        assert_eq!(first, second);
        assert!(db.contains(&first));
    }

    #[test]
    fn missing_object_is_not_found() {
        let (_temp, db) = database();
        let absent =
            ObjectId::try_parse("da39a3ee5e6b4b0d3255bfef95601890afd80709".to_string()).unwrap();

        assert!(!db.contains(&absent));
        assert!(matches!(
            db.load_raw(&absent),
            Err(StoreError::NotFound(_))
        ));
    }

    #[test]
    fn size_mismatch_is_corrupt() {
        let (_temp, db) = database();

        let oid = store_blob(&db, "honest content");
        let object_path = db.objects_path().join(oid.to_path());
        let forged = Database::compress(Bytes::from_static(b"blob 99\0honest content")).unwrap();
        std::fs::write(&object_path, &forged).unwrap();

        assert!(matches!(
            db.load_raw(&oid),
            Err(StoreError::Corrupt { .. })
        ));
    }

    #[test]
    fn reachability_covers_commit_tree_and_blobs() {
        let (_temp, db) = database();

        let commit_oid = store_snapshot(&db, &[("a.txt", "alpha"), ("dir/b.txt", "beta")], vec![]);
        let reachable = db.reachable_objects(&commit_oid, false).unwrap();

        // commit + root tree + "dir" subtree + 2 blobs
        assert_eq!(reachable.len(), 5);
        assert!(reachable.contains(&commit_oid));
    }

    #[test]
    fn reachability_follows_parents() {
        let (_temp, db) = database();

        let first = store_snapshot(&db, &[("a.txt", "one")], vec![]);
        let second = store_snapshot(&db, &[("a.txt", "two")], vec![first.clone()]);

        let reachable = db.reachable_objects(&second, false).unwrap();
        assert!(reachable.contains(&first));
        assert!(reachable.contains(&second));
    }

    #[test]
    fn missing_objects_fail_strict_walks_but_not_tolerant_ones() {
        let (_temp, db) = database();

        let first = store_snapshot(&db, &[("a.txt", "one")], vec![]);
        let second = store_snapshot(&db, &[("a.txt", "two")], vec![first.clone()]);

        // drop the parent commit from the store
        std::fs::remove_file(db.objects_path().join(first.to_path())).unwrap();

        assert!(db.reachable_objects(&second, false).is_err());

        let tolerant = db.reachable_objects(&second, true).unwrap();
        assert!(!tolerant.contains(&first));
        assert!(tolerant.contains(&second));
    }

    #[test]
    fn nothing_to_send_when_remote_matches_local() {
        let (_temp, db) = database();

        let head = store_snapshot(&db, &[("a.txt", "one")], vec![]);
        let to_send = db.objects_to_send(&head, &[head.clone()]).unwrap();

        assert!(to_send.is_empty());
    }

    #[test]
    fn absent_remote_ref_subtracts_nothing() {
        let (_temp, db) = database();

        let head = store_snapshot(&db, &[("a.txt", "one")], vec![]);
        let to_send = db.objects_to_send(&head, &[ObjectId::zero()]).unwrap();

        // commit + tree + blob, everything we have
        assert_eq!(to_send.len(), 3);
        assert!(to_send.windows(2).all(|pair| pair[0] < pair[1]));
    }

    #[test]
    fn only_new_history_is_sent() {
        let (_temp, db) = database();

        let first = store_snapshot(&db, &[("a.txt", "one")], vec![]);
        let second = store_snapshot(&db, &[("a.txt", "two"), ("b.txt", "new")], vec![first.clone()]);

        let to_send = db.objects_to_send(&second, &[first.clone()]).unwrap();

        assert!(!to_send.contains(&first));
        assert!(to_send.contains(&second));
        // second commit, its tree, and the two changed/new blobs
        assert_eq!(to_send.len(), 4);
    }
}
