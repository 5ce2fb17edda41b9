use crate::areas::repository::Repository;
use crate::artifacts::objects::commit::{Author, Commit};
use crate::artifacts::objects::object::Object;
use crate::artifacts::objects::tree::Tree;
use std::io::Write;

impl Repository {
    pub async fn commit(&mut self, message: &str) -> anyhow::Result<()> {
        let index = self.index();
        let mut index = index.lock().await;

        index.rehydrate()?;

        let tree = Tree::build(index.entries())?;
        let store_tree = &|tree: &Tree| {
            self.database().store(tree)?;
            Ok(())
        };
        tree.traverse(store_tree)?;
        let tree_id = tree.object_id()?;

        let parent = self.refs().read_head()?;
        let is_root = match parent {
            Some(_) => "",
            None => "(root-commit) ",
        };
        let parents = parent.into_iter().collect();

        let author = Author::load_from_env()?;
        let message = message.trim().to_string();

        let commit = Commit::new(parents, tree_id, author, message);
        let commit_id = self.database().store(&commit)?;
        self.refs().update_head(commit_id.clone())?;

        write!(
            self.writer(),
            "[{}{}] {}",
            is_root,
            commit_id.to_short_oid(),
            commit.short_message()
        )?;

        Ok(())
    }
}
