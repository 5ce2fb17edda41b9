//! Tree entry modes
//!
//! Three modes exist: regular file, executable file, directory. The octal
//! rendering (`100644`, `100755`, `40000`) is what tree serialization writes.

/// Mode of a tree or index entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EntryMode {
    #[default]
    Regular,
    Executable,
    Directory,
}

impl EntryMode {
    pub fn as_u32(&self) -> u32 {
        match self {
            EntryMode::Regular => 0o100644,
            EntryMode::Executable => 0o100755,
            EntryMode::Directory => 0o40000,
        }
    }

    pub fn is_tree(&self) -> bool {
        matches!(self, EntryMode::Directory)
    }

    /// Parse the octal rendering used by tree serialization and the index
    /// file. A leading zero on the directory mode is accepted.
    pub fn from_octal_str(mode: &str) -> anyhow::Result<Self> {
        match u32::from_str_radix(mode, 8) {
            Ok(0o100644) => Ok(EntryMode::Regular),
            Ok(0o100755) => Ok(EntryMode::Executable),
            Ok(0o40000) => Ok(EntryMode::Directory),
            _ => Err(anyhow::anyhow!("invalid entry mode: {mode:?}")),
        }
    }
}

impl std::fmt::Display for EntryMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:o}", self.as_u32())
    }
}
