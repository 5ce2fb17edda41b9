use crate::areas::repository::Repository;
use crate::artifacts::index::index_entry::IndexEntry;
use std::path::Path;

impl Repository {
    /// Stage the given paths, expanding directories to the files they hold.
    pub async fn add(&mut self, paths: &[String]) -> anyhow::Result<()> {
        let index = self.index();
        let mut index = index.lock().await;

        index.rehydrate()?;

        let paths = paths
            .iter()
            .map(|path| {
                let absolute_path = Path::new(path).canonicalize()?;
                self.workspace().list_files(Some(absolute_path))
            })
            .collect::<Result<Vec<_>, _>>()?
            .into_iter()
            .flatten();

        for path in paths {
            let blob = self.workspace().parse_blob(&path)?;
            let stat = self.workspace().stat_file(&path)?;

            let blob_id = self.database().store(&blob)?;
            index.add(IndexEntry::new(path, blob_id, stat));
        }

        index.save()?;

        Ok(())
    }
}
