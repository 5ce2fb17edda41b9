//! Typed error surfaces for the storage, tree-building, pack and transfer
//! layers.
//!
//! Commands wrap these in `anyhow` with contextual messages; lower layers
//! return the concrete enums so callers can distinguish, e.g., a missing
//! object from a corrupt one.

use crate::artifacts::objects::object_id::ObjectId;
use thiserror::Error;

/// Failures raised by the object database.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("object store I/O failure: {0}")]
    Io(#[from] std::io::Error),

    /// No object with this digest exists in the store.
    #[error("object {0} not found")]
    NotFound(ObjectId),

    /// The object file exists but its content does not check out.
    #[error("object {oid} is corrupt: {reason}")]
    Corrupt { oid: ObjectId, reason: String },
}

/// Failures raised while assembling a tree from flat index entries.
#[derive(Debug, Error)]
pub enum TreeBuildError {
    /// The same path segment is needed as both a file and a directory.
    #[error("path collision at {0:?}: entry is both a file and a directory")]
    PathCollision(String),

    #[error("invalid entry path {0:?}")]
    InvalidPath(String),
}

/// Failures raised while encoding or decoding packs and deltas.
#[derive(Debug, Error)]
pub enum PackError {
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("pack compression failure: {0}")]
    Compression(std::io::Error),

    #[error("invalid delta: {0}")]
    InvalidDelta(String),
}

/// Failures raised by the push transport.
#[derive(Debug, Error)]
pub enum TransferError {
    /// The remote spoke something that is not the protocol we expect.
    #[error("protocol violation: {0}")]
    Protocol(String),

    /// The remote understood us and said no. Never retried.
    #[error("remote rejected update: {0}")]
    Rejected(String),

    #[error("network failure: {0}")]
    Network(#[from] reqwest::Error),

    #[error(transparent)]
    Pack(#[from] PackError),
}
