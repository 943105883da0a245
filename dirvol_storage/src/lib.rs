//! The storage API for the `dirvol` crate.
//!
//! A `dirvol` store holds a hierarchy of directories and small whole-value files addressed by store-relative [`NodePath`]s.
//! Groups are directories, datasets are directories holding a fixed set of artifact files, and a file root is a directory carrying a marker file.
//! The storage traits defined here are the only way the object layer touches persistent state, so any backend implementing them can host a `dirvol` hierarchy.
//!
//! This crate includes an in-memory store implementation.
//! The filesystem store lives in `dirvol_filesystem`.
//!
//! ## Licence
//! `dirvol_storage` is licensed under either of
//! - the Apache License, Version 2.0 <http://www.apache.org/licenses/LICENSE-2.0> or
//! - the MIT license <http://opensource.org/licenses/MIT>, at your option.
#![cfg_attr(docsrs, feature(doc_auto_cfg))]

mod node_name;
mod node_path;
mod storage_lock;
mod storage_sync;
pub mod store;

#[cfg(any(test, feature = "tests"))]
/// Store test utilities (for external store development).
pub mod store_test;

use std::sync::Arc;

use thiserror::Error;

pub use node_name::{NodeName, NodeNameError};
pub use node_path::{resolve, NodePath, NodePathError};
pub use storage_lock::{StorageLock, StorageLockGuard};

pub use self::storage_sync::{
    ListableStorageTraits, ReadableStorageTraits, ReadableWritableListableStorageTraits,
    WritableStorageTraits,
};

/// [`Arc`] wrapped readable storage.
pub type ReadableStorage = Arc<dyn ReadableStorageTraits>;

/// [`Arc`] wrapped writable storage.
pub type WritableStorage = Arc<dyn WritableStorageTraits>;

/// [`Arc`] wrapped listable storage.
pub type ListableStorage = Arc<dyn ListableStorageTraits>;

/// [`Arc`] wrapped readable, writable, and listable storage.
pub type ReadableWritableListableStorage = Arc<dyn ReadableWritableListableStorageTraits>;

/// The type for bytes used in store set and get methods.
///
/// An alias for [`bytes::Bytes`].
pub type Bytes = bytes::Bytes;

/// An alias for bytes which may or may not be available.
///
/// When a value is read from a store, it returns `MaybeBytes` which is [`None`] if the path does not hold a file.
pub type MaybeBytes = Option<Bytes>;

/// The kind of an entry in a store.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum EntryKind {
    /// A file holding a value.
    File,
    /// A directory holding other entries.
    Directory,
}

/// A direct child of a directory in a store.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct DirEntry {
    name: String,
    kind: EntryKind,
}

impl DirEntry {
    /// Create a new [`DirEntry`].
    #[must_use]
    pub fn new(name: String, kind: EntryKind) -> Self {
        Self { name, kind }
    }

    /// Returns the entry name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the entry kind.
    #[must_use]
    pub const fn kind(&self) -> EntryKind {
        self.kind
    }
}

/// The entries of a directory, sorted by name.
pub type DirEntries = Vec<DirEntry>;

/// An entry that could not be removed by [`WritableStorageTraits::erase_tree`].
#[derive(Clone, Debug)]
pub struct EraseFailure {
    path: String,
    error: Arc<std::io::Error>,
}

impl EraseFailure {
    /// Create a new [`EraseFailure`].
    #[must_use]
    pub fn new(path: String, error: std::io::Error) -> Self {
        Self {
            path,
            error: Arc::new(error),
        }
    }

    /// Returns the path of the entry that could not be removed.
    #[must_use]
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Returns the error raised when removing the entry.
    #[must_use]
    pub fn error(&self) -> &std::io::Error {
        &self.error
    }
}

/// A storage error.
#[derive(Debug, Clone, Error)]
pub enum StorageError {
    /// A write operation was attempted on a read only store.
    #[error("a write operation was attempted on a read only store")]
    ReadOnly,
    /// An exclusive create was attempted where an entry already exists.
    #[error("{0} already exists")]
    AlreadyExists(NodePath),
    /// An entry required by the operation does not exist.
    #[error("{0} not found")]
    NotFound(NodePath),
    /// The entry is locked by another handle.
    #[error("{0} is locked by another handle")]
    Locked(NodePath),
    /// An IO error.
    #[error(transparent)]
    IOError(#[from] Arc<std::io::Error>),
    /// Some entries could not be removed while erasing a tree.
    #[error("failed to erase {} entries under {path}", .failures.len())]
    IncompleteErase {
        /// The root of the erased tree.
        path: NodePath,
        /// The entries that could not be removed.
        failures: Vec<EraseFailure>,
    },
    /// An invalid node name.
    #[error(transparent)]
    InvalidNodeName(#[from] NodeNameError),
    /// An invalid node path.
    #[error(transparent)]
    InvalidNodePath(#[from] NodePathError),
    /// Any other error.
    #[error("{0}")]
    Other(String),
}

impl StorageError {
    /// Map an IO error for `path` to a storage error, converting existence errors to [`StorageError::AlreadyExists`] and [`StorageError::NotFound`].
    #[must_use]
    pub fn from_io(err: std::io::Error, path: &NodePath) -> Self {
        match err.kind() {
            std::io::ErrorKind::AlreadyExists => Self::AlreadyExists(path.clone()),
            std::io::ErrorKind::NotFound => Self::NotFound(path.clone()),
            _ => Self::IOError(Arc::new(err)),
        }
    }
}

impl From<std::io::Error> for StorageError {
    fn from(err: std::io::Error) -> Self {
        Self::IOError(Arc::new(err))
    }
}

impl From<&str> for StorageError {
    fn from(err: &str) -> Self {
        Self::Other(err.to_string())
    }
}

impl From<String> for StorageError {
    fn from(err: String) -> Self {
        Self::Other(err)
    }
}
