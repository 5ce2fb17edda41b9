use crate::areas::config::Config;
use crate::areas::database::Database;
use crate::areas::index::Index;
use crate::areas::refs::Refs;
use crate::areas::workspace::Workspace;
use crate::artifacts::branch::branch_name::SymRefName;
use std::cell::{Ref, RefCell, RefMut};
use std::path::Path;
use std::sync::Arc;
use tokio::sync::Mutex;

/// Repository metadata directory name.
pub const GRIT_DIR: &str = ".grit";

/// One open repository: the working tree plus everything under `.grit`.
pub struct Repository {
    path: Box<Path>,
    writer: RefCell<Box<dyn std::io::Write>>,
    index: Arc<Mutex<Index>>,
    config: Arc<Mutex<Config>>,
    database: Database,
    workspace: Workspace,
    refs: Refs,
    current_ref: RefCell<SymRefName>,
}

impl Repository {
    pub fn new(path: &str, writer: Box<dyn std::io::Write>) -> anyhow::Result<Self> {
        let path = Path::new(path).canonicalize()?;

        if !path.exists() {
            std::fs::create_dir_all(&path)?;
        }

        let index = Index::load(path.join(GRIT_DIR).join("index").into_boxed_path())?;
        let config = Config::load(path.join(GRIT_DIR).join("config").into_boxed_path())?;
        let database = Database::new(path.join(GRIT_DIR).join("objects").into_boxed_path());
        let workspace = Workspace::new(path.clone().into_boxed_path());
        let refs = Refs::new(path.join(GRIT_DIR).into_boxed_path());
        let current_ref = refs.current_ref(None)?;

        Ok(Repository {
            path: path.into_boxed_path(),
            writer: RefCell::new(writer),
            index: Arc::new(Mutex::new(index)),
            config: Arc::new(Mutex::new(config)),
            database,
            workspace,
            refs,
            current_ref: RefCell::new(current_ref),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn grit_path(&self) -> Box<Path> {
        self.path.join(GRIT_DIR).into_boxed_path()
    }

    pub fn writer(&'_ self) -> RefMut<'_, Box<dyn std::io::Write>> {
        self.writer.borrow_mut()
    }

    pub fn index(&self) -> Arc<Mutex<Index>> {
        self.index.clone()
    }

    pub fn config_store(&self) -> Arc<Mutex<Config>> {
        self.config.clone()
    }

    pub fn database(&self) -> &Database {
        &self.database
    }

    pub fn workspace(&self) -> &Workspace {
        &self.workspace
    }

    pub fn refs(&self) -> &Refs {
        &self.refs
    }

    pub fn current_ref(&self) -> Ref<'_, SymRefName> {
        self.current_ref.borrow()
    }

    pub fn set_current_ref(&self, new_ref: SymRefName) {
        *self.current_ref.borrow_mut() = new_ref;
    }
}
