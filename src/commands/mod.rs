//! Command implementations
//!
//! Commands come in two layers:
//!
//! - `plumbing`: direct object-database manipulation (hash-object, cat-file)
//! - `porcelain`: user-facing version-control workflows (add, commit, push, ...)
//!
//! Every command is an `impl Repository` block writing its output through the
//! repository's writer, so tests can capture it.

pub mod plumbing;
pub mod porcelain;
