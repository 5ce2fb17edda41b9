use crate::areas::repository::Repository;
use crate::artifacts::objects::object::{Object, ObjectBox};
use crate::artifacts::objects::object_id::ObjectId;
use std::io::Write;

impl Repository {
    /// Print an object's content, or with `show_type` only its kind.
    pub fn cat_file(&mut self, object_id: &str, show_type: bool) -> anyhow::Result<()> {
        let object_id = ObjectId::try_parse(object_id.to_string())?;
        let object = self.database().parse_object(&object_id)?;

        let (object_type, rendered) = match object {
            ObjectBox::Blob(blob) => (blob.object_type(), blob.display()),
            ObjectBox::Tree(tree) => (tree.object_type(), tree.display()),
            ObjectBox::Commit(commit) => (commit.object_type(), commit.display()),
        };

        if show_type {
            write!(self.writer(), "{}", object_type)?;
        } else {
            write!(self.writer(), "{}", rendered)?;
        }

        Ok(())
    }
}
