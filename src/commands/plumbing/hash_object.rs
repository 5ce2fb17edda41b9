use crate::areas::repository::Repository;
use crate::artifacts::objects::blob::Blob;
use crate::artifacts::objects::object::Object;
use std::io::Write;

impl Repository {
    /// Hash a file as a blob; with `write`, persist it to the object store.
    pub fn hash_object(&mut self, object_path: &str, write: bool) -> anyhow::Result<()> {
        let object_data = self.workspace().read_file(object_path.as_ref())?;
        let object = Blob::new(object_data);

        let object_id = object.object_id()?;

        write!(self.writer(), "{}", object_id)?;

        if !write {
            return Ok(());
        }

        self.database().store(&object)?;

        Ok(())
    }
}
